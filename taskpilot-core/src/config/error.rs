use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur when loading or validating configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("configuration file not found at {path:?}")]
    NotFound { path: PathBuf },

    #[error("failed to read config from {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to parse config from {path:?}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("unknown LLM provider '{value}' (expected gemini, openai or anthropic)")]
    UnknownProvider { value: String },

    #[error("provider '{provider}' is configured more than once")]
    DuplicateProvider { provider: String },

    #[error("unknown tool server mode '{value}' (expected http or stdio)")]
    UnknownServerMode { value: String },

    #[error("tool server mode 'stdio' requires a command")]
    MissingCommand,

    #[error("'{key}' must be a positive integer, got '{value}'")]
    InvalidNumber { key: String, value: String },
}
