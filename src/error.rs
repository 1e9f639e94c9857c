//! Error types for chatspace.
//!
//! Each layer has its own enum; there is no unifying wrapper because the
//! library exposes no surface that would return one.

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// LLM provider errors.
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("Request failed: {reason}")]
    RequestFailed { reason: String },

    #[error("HTTP {status}: {message}")]
    Http { status: u16, message: String },
}

/// Local attachment loading errors.
#[derive(Debug, thiserror::Error)]
pub enum FileError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("Unsupported file type: {path}")]
    UnsupportedType { path: String },
}
