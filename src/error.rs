use std::time::Duration;

/// Errors that can occur when streaming a chat response.
///
/// Errors are organized by category:
/// - Configuration errors: detected at `build()` time or before a request is sent
/// - Transport errors: the connection, the HTTP status, or the body read failed
///
/// Malformed lines inside an otherwise healthy stream are never reported
/// through this type; they are normalized into content or provider-error
/// events by the classifier. Cancellation is not an error either: the
/// session ends in [`SessionState::Cancelled`](crate::SessionState::Cancelled).
#[derive(thiserror::Error, Debug)]
#[non_exhaustive]
pub enum Error {
    // -------------------------------------------------------------------------
    // Configuration errors
    // -------------------------------------------------------------------------
    /// Invalid configuration provided to builder.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Environment variable holding the API key is not set.
    #[error("environment variable {var} not set")]
    EnvVarNotFound { var: String },

    /// The request descriptor failed validation.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    // -------------------------------------------------------------------------
    // Transport errors
    // -------------------------------------------------------------------------
    /// Connection, DNS, TLS or body read failure.
    #[error("HTTP transport error: {0}")]
    Http(#[source] reqwest::Error),

    /// The backend answered with a non-2xx status.
    #[error("HTTP status {status}: {body}")]
    HttpStatus { status: u16, body: String },

    /// IO error while reading the response body.
    #[error("IO error: {0}")]
    Io(#[source] std::io::Error),

    /// Request exceeded the configured timeout.
    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    /// Stream closed before the session could finish.
    #[error("stream closed unexpectedly")]
    StreamClosed,
}

/// A specialized Result type for chatstream operations.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Create an IO error.
    pub fn io(source: std::io::Error) -> Self {
        Self::Io(source)
    }

    /// Check if this error came from the transport (network, status, body read).
    ///
    /// Transport errors end a session in the `Failed` state.
    pub fn is_transport_error(&self) -> bool {
        matches!(
            self,
            Error::Http(_)
                | Error::HttpStatus { .. }
                | Error::Io(_)
                | Error::Timeout(_)
                | Error::StreamClosed
        )
    }

    /// Check if this error is retryable.
    ///
    /// Retry policy belongs to the caller; the session never retries.
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Timeout(_) | Error::Io(_) | Error::StreamClosed => true,
            Error::Http(e) => e.is_connect() || e.is_timeout(),
            Error::HttpStatus { status, .. } => matches!(status, 408 | 429 | 500..=599),
            _ => false,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err)
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        Error::Http(err)
    }
}
