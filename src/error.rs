//! Error types for double registration, resolution and server lifecycle.

use std::path::PathBuf;

use thiserror::Error;

/// Message carried by [`DoubleError::MalformedDouble`] when a double has no
/// `request` or no `request.url`.
pub const MISSING_REQUEST: &str = "Double missing request property.";

/// Errors that can occur while registering or serving doubles.
#[derive(Debug, Error)]
pub enum DoubleError {
    /// The double (or a bulk-load input) does not have the expected shape.
    #[error("{0}")]
    MalformedDouble(String),

    /// Fixture file does not exist.
    #[error("fixture '{}' not found", path.display())]
    FixtureNotFound { path: PathBuf },

    /// Fixture file exists but is not valid structured data.
    #[error("failed to parse fixture '{}': {message}", path.display())]
    FixtureParse { path: PathBuf, message: String },

    /// Attachment file does not exist.
    #[error("attachment '{}' not found", path.display())]
    AttachmentNotFound { path: PathBuf },

    /// The listener could not bind its port.
    #[error("failed to listen on port {port}: {source}")]
    Bind {
        port: u16,
        #[source]
        source: std::io::Error,
    },

    /// Server configuration could not be read.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// Filesystem or socket error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML parsing error.
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl DoubleError {
    /// Shorthand for the "missing request" flavor of `MalformedDouble`.
    pub fn missing_request() -> Self {
        Self::MalformedDouble(MISSING_REQUEST.to_string())
    }

    /// Short machine-readable name of the error kind.
    ///
    /// Used as the `error` field of the JSON body the listener returns
    /// when a request cannot be resolved.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::MalformedDouble(_) => "MalformedDouble",
            Self::FixtureNotFound { .. } => "FixtureNotFound",
            Self::FixtureParse { .. } => "FixtureParseError",
            Self::AttachmentNotFound { .. } => "AttachmentNotFound",
            Self::Bind { .. } => "Bind",
            Self::Config(_) => "Config",
            Self::Io(_) => "Io",
            Self::Json(_) => "Json",
            Self::Yaml(_) => "Yaml",
        }
    }
}

/// Result type alias for double server operations.
pub type Result<T> = core::result::Result<T, DoubleError>;
