//! Outbound adapters: language-model backends and JSON-RPC transports.

pub mod model;
pub mod rpc;
