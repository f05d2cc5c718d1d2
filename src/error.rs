//! Error types for the Graph research collector
//!
//! One error hierarchy for the whole crate:
//! - `thiserror` for the definitions
//! - variants that tell the caller whether a failure came from the network,
//!   from the remote API, or from the data it returned
//! - nothing here is fatal; the caller decides whether to abort a run or skip a user

use std::borrow::Cow;
use thiserror::Error;

/// Result type alias for collector operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the collector
#[derive(Debug, Error)]
pub enum Error {
    // ========================================================================
    // Configuration Errors
    // ========================================================================
    #[error("Configuration error: {message}")]
    Config {
        message: Cow<'static, str>,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Missing required environment variable: {var}")]
    MissingEnvVar { var: &'static str },

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidConfig {
        key: &'static str,
        message: Cow<'static, str>,
    },

    // ========================================================================
    // Graph API Errors
    // ========================================================================
    #[error("Transport error: {message}")]
    Transport {
        message: Cow<'static, str>,
        #[source]
        source: Option<reqwest::Error>,
    },

    #[error("Graph API error ({kind}): {message}")]
    RemoteApi { kind: String, message: String },

    #[error("Invalid identifier: {id:?}")]
    InvalidIdentifier { id: String },

    #[error("Write operations require an access token")]
    MissingAccessToken,

    #[error("Unexpected Graph API response: {message}")]
    InvalidResponse { message: Cow<'static, str> },

    // ========================================================================
    // Snapshot Errors
    // ========================================================================
    #[error("Malformed timestamp: {value:?}")]
    MalformedTimestamp { value: String },

    // ========================================================================
    // Serialization / Storage Errors
    // ========================================================================
    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {message}")]
    Internal { message: Cow<'static, str> },
}

impl Error {
    // ========================================================================
    // Constructors for common error patterns
    // ========================================================================

    /// Create a configuration error
    pub fn config(message: impl Into<Cow<'static, str>>) -> Self {
        Self::Config {
            message: message.into(),
            source: None,
        }
    }

    /// Create a transport error from a failed HTTP exchange
    pub fn transport(message: impl Into<Cow<'static, str>>, source: reqwest::Error) -> Self {
        Self::Transport {
            message: message.into(),
            source: Some(source),
        }
    }

    /// Create an error from a Graph API `error` payload
    pub fn remote_api(kind: impl Into<String>, message: impl Into<String>) -> Self {
        Self::RemoteApi {
            kind: kind.into(),
            message: message.into(),
        }
    }

    pub fn invalid_identifier(id: impl Into<String>) -> Self {
        Self::InvalidIdentifier { id: id.into() }
    }

    pub fn invalid_response(message: impl Into<Cow<'static, str>>) -> Self {
        Self::InvalidResponse {
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<Cow<'static, str>>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    pub fn malformed_timestamp(value: impl Into<String>) -> Self {
        Self::MalformedTimestamp {
            value: value.into(),
        }
    }

    // ========================================================================
    // Error Classification
    // ========================================================================

    /// Returns true if a caller may reasonably retry the failed call.
    /// The collector itself never retries.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::Transport { .. })
    }

    /// Returns true if this error should be logged at error level
    pub fn is_error_level(&self) -> bool {
        matches!(
            self,
            Error::Transport { .. }
                | Error::RemoteApi { .. }
                | Error::MalformedTimestamp { .. }
                | Error::Io(_)
                | Error::Internal { .. }
        )
    }

    /// Stable error code for logs
    pub fn error_code(&self) -> &'static str {
        match self {
            Error::Config { .. } | Error::MissingEnvVar { .. } | Error::InvalidConfig { .. } => {
                "CONFIG_ERROR"
            }
            Error::Transport { .. } => "TRANSPORT_ERROR",
            Error::RemoteApi { .. } => "REMOTE_API_ERROR",
            Error::InvalidIdentifier { .. } => "INVALID_IDENTIFIER",
            Error::MissingAccessToken => "MISSING_ACCESS_TOKEN",
            Error::InvalidResponse { .. } => "INVALID_RESPONSE",
            Error::MalformedTimestamp { .. } => "MALFORMED_TIMESTAMP",
            Error::Json(_) => "SERIALIZATION_ERROR",
            Error::Io(_) => "STORAGE_ERROR",
            Error::Internal { .. } => "INTERNAL_ERROR",
        }
    }
}

impl From<std::env::VarError> for Error {
    fn from(_err: std::env::VarError) -> Self {
        Error::Config {
            message: "Environment variable error".into(),
            source: None,
        }
    }
}
