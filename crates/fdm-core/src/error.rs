//! Error types for FDM operations.
//!
//! Every failure a module can report flows through [`Error`]. HTTP failures keep
//! their status code and raw body so the result normalizer can surface them
//! unchanged; everything else carries a human-readable message.

use thiserror::Error;

/// Main error type for FDM operations.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// The remote API answered with a non-success status
    #[error("HTTP {status}: {body}")]
    Http {
        /// HTTP status code returned by the appliance
        status: u16,
        /// Raw response body
        body: String,
    },

    /// The appliance could not be reached
    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),

    /// Request timed out
    #[error("Timeout waiting for appliance: {0}")]
    Timeout(String),

    /// Transport failure without an HTTP status
    #[error("HTTP request failed: {0}")]
    HttpError(String),

    /// Name-based lookup found no matching object
    #[error("Not found: {0}")]
    NotFound(String),

    /// A path template placeholder had no value
    #[error("Missing path parameter: {0}")]
    MissingPathParameter(String),

    /// Invalid or missing module arguments
    #[error("{0}")]
    ValidationError(String),

    /// Operation name is not declared for the resource
    #[error("{0}")]
    UnknownOperation(String),

    /// Failed to parse a response body
    #[error("Failed to parse response: {0}")]
    ParseError(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Invalid endpoint URL
    #[error("Invalid endpoint: {0}")]
    InvalidEndpoint(String),

    /// Local I/O failure (reading an upload file)
    #[error("I/O error: {0}")]
    Io(String),
}

/// Specialized result type for FDM operations.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Returns the error code for this error type.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Http { .. } => "HTTP_STATUS",
            Self::ServiceUnavailable(_) => "SERVICE_UNAVAILABLE",
            Self::Timeout(_) => "TIMEOUT",
            Self::HttpError(_) => "HTTP_ERROR",
            Self::NotFound(_) => "NOT_FOUND",
            Self::MissingPathParameter(_) => "MISSING_PATH_PARAMETER",
            Self::ValidationError(_) => "VALIDATION_ERROR",
            Self::UnknownOperation(_) => "UNKNOWN_OPERATION",
            Self::ParseError(_) => "PARSE_ERROR",
            Self::ConfigError(_) => "CONFIG_ERROR",
            Self::InvalidEndpoint(_) => "INVALID_ENDPOINT",
            Self::Io(_) => "IO_ERROR",
        }
    }

    /// HTTP status carried by the error, if the appliance answered at all.
    #[must_use]
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::Http { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Returns true when the failure means the access token is no longer valid.
    #[must_use]
    pub const fn is_auth_failure(&self) -> bool {
        matches!(self, Self::Http { status: 401, .. })
    }

    /// Returns true for errors raised before any remote call was attempted.
    #[must_use]
    pub const fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::ValidationError(_) | Self::UnknownOperation(_) | Self::MissingPathParameter(_)
        )
    }
}

// Conversions from external error types
impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout(err.to_string())
        } else if err.is_connect() {
            Self::ServiceUnavailable(err.to_string())
        } else {
            Self::HttpError(err.to_string())
        }
    }
}

impl From<url::ParseError> for Error {
    fn from(err: url::ParseError) -> Self {
        Self::InvalidEndpoint(err.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::ParseError(err.to_string())
    }
}

impl From<validator::ValidationErrors> for Error {
    fn from(err: validator::ValidationErrors) -> Self {
        Self::ConfigError(err.to_string())
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}
