//! Model infrastructure module
//!
//! # Structure
//! - `types` - options and error types
//! - `traits` - the `LlmClient` capability every backend implements
//! - `adapter` - message format adapters
//! - `clients` - one HTTP client per provider
//! - `factory` - builds clients from configuration
//! - `router` - availability, default selection and fallback

pub mod adapter;
pub mod clients;
pub mod factory;
pub mod router;
pub mod traits;
pub mod types;

pub use router::LlmRouter;
pub use traits::LlmClient;
pub use types::{GenerateOptions, ModelError};
