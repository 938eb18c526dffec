//! Tool catalogue, validation and the protocol client that dispatches calls.

pub mod cache;
pub mod catalogue;
mod client;
mod error;
mod local;
pub mod validation;

pub use cache::{DiscoveryCache, ToolSnapshot};
pub use client::{ToolClient, ToolClientSettings, ToolEventStream};
pub use error::{ToolError, ToolInvokeError};
pub use local::AuthorStore;
pub use validation::{ValidationFailure, validate_input};
