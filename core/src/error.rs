use std::fmt;
use thiserror::Error;

/// The error type for amzreq operations.
///
/// Transport implementations decide whether a failure is worth another
/// attempt when they construct the error, see [`Error::set_retryable`].
#[derive(Error, Debug)]
#[error("{message}")]
pub struct Error {
    kind: ErrorKind,
    message: String,
    #[source]
    source: Option<anyhow::Error>,
    context: Vec<String>,
    retryable: bool,
}

/// The kind of error that occurred
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Credentials exist but are invalid/malformed
    CredentialInvalid,

    /// Credentials are expired
    CredentialExpired,

    /// Permission denied when accessing credentials
    CredentialDenied,

    /// Request cannot be signed (missing required fields, etc.)
    RequestInvalid,

    /// Configuration error (missing fields, invalid values)
    ConfigInvalid,

    /// A connect, read, write or request deadline elapsed.
    Timeout,

    /// The request could not be written because the connection was broken.
    ConnectionBroken,

    /// A pooled connection was closed by the peer before it could be reused.
    ConnectionClosed,

    /// The request was canceled while waiting for a connection.
    ConnectCanceled,

    /// Any other network level failure.
    Transport,

    /// The caller canceled the operation.
    Canceled,

    /// Unexpected errors (I/O, decoding, etc.)
    Unexpected,
}

impl Error {
    /// Create a new error with the given kind and message
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            source: None,
            context: Vec::new(),
            retryable: false,
        }
    }

    /// Add a source error
    pub fn with_source(mut self, source: impl Into<anyhow::Error>) -> Self {
        self.source = Some(source.into());
        self
    }

    /// Append a line of diagnostic context.
    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context.push(context.into());
        self
    }

    /// Mark whether another attempt could succeed.
    ///
    /// Cancellation is never retryable, the flag is ignored for it.
    pub fn set_retryable(mut self, retryable: bool) -> Self {
        self.retryable = retryable && self.kind != ErrorKind::Canceled;
        self
    }

    /// Get the error kind
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Get the diagnostic context lines.
    pub fn context(&self) -> &[String] {
        &self.context
    }

    /// Whether the error was tagged retryable when it was constructed.
    pub fn is_retryable(&self) -> bool {
        self.retryable
    }

    /// Check if this is a credential error
    pub fn is_credential_error(&self) -> bool {
        matches!(
            self.kind,
            ErrorKind::CredentialInvalid
                | ErrorKind::CredentialExpired
                | ErrorKind::CredentialDenied
        )
    }

    /// Check if this error comes from the network rather than from the
    /// request or its credentials.
    pub fn is_transport_error(&self) -> bool {
        matches!(
            self.kind,
            ErrorKind::Timeout
                | ErrorKind::ConnectionBroken
                | ErrorKind::ConnectionClosed
                | ErrorKind::ConnectCanceled
                | ErrorKind::Transport
        )
    }
}

// Convenience constructors
impl Error {
    /// Create a credential invalid error
    pub fn credential_invalid(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::CredentialInvalid, message)
    }

    /// Create a credential expired error
    pub fn credential_expired(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::CredentialExpired, message)
    }

    /// Create a credential denied error
    pub fn credential_denied(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::CredentialDenied, message)
    }

    /// Create a request invalid error
    pub fn request_invalid(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::RequestInvalid, message)
    }

    /// Create a config invalid error
    pub fn config_invalid(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ConfigInvalid, message)
    }

    /// Create a timeout error, retryable.
    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Timeout, message).set_retryable(true)
    }

    /// Create a transport error of the given kind with an explicit retry tag.
    pub fn transport(kind: ErrorKind, message: impl Into<String>, retryable: bool) -> Self {
        Self::new(kind, message).set_retryable(retryable)
    }

    /// Create a cancellation error.
    pub fn canceled(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Canceled, message)
    }

    /// Create an unexpected error
    pub fn unexpected(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Unexpected, message)
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::CredentialInvalid => write!(f, "invalid credentials"),
            ErrorKind::CredentialExpired => write!(f, "expired credentials"),
            ErrorKind::CredentialDenied => write!(f, "credential access denied"),
            ErrorKind::RequestInvalid => write!(f, "invalid request"),
            ErrorKind::ConfigInvalid => write!(f, "invalid configuration"),
            ErrorKind::Timeout => write!(f, "timed out"),
            ErrorKind::ConnectionBroken => write!(f, "broken connection"),
            ErrorKind::ConnectionClosed => write!(f, "connection closed"),
            ErrorKind::ConnectCanceled => write!(f, "canceled while connecting"),
            ErrorKind::Transport => write!(f, "transport error"),
            ErrorKind::Canceled => write!(f, "canceled"),
            ErrorKind::Unexpected => write!(f, "unexpected error"),
        }
    }
}

/// Convenience type alias for Results
pub type Result<T> = std::result::Result<T, Error>;

impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Self::unexpected(err.to_string()).with_source(err)
    }
}

impl From<http::Error> for Error {
    fn from(err: http::Error) -> Self {
        Self::request_invalid(err.to_string()).with_source(anyhow::Error::from(err))
    }
}

impl From<http::header::InvalidHeaderValue> for Error {
    fn from(err: http::header::InvalidHeaderValue) -> Self {
        Self::request_invalid(err.to_string()).with_source(anyhow::Error::from(err))
    }
}

impl From<http::header::InvalidHeaderName> for Error {
    fn from(err: http::header::InvalidHeaderName) -> Self {
        Self::request_invalid(err.to_string()).with_source(anyhow::Error::from(err))
    }
}

impl From<http::header::ToStrError> for Error {
    fn from(err: http::header::ToStrError) -> Self {
        Self::request_invalid(err.to_string()).with_source(anyhow::Error::from(err))
    }
}

impl From<http::uri::InvalidUri> for Error {
    fn from(err: http::uri::InvalidUri) -> Self {
        Self::request_invalid(err.to_string()).with_source(anyhow::Error::from(err))
    }
}

impl From<http::uri::InvalidUriParts> for Error {
    fn from(err: http::uri::InvalidUriParts) -> Self {
        Self::request_invalid(err.to_string()).with_source(anyhow::Error::from(err))
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Self::unexpected(err.to_string()).with_source(anyhow::Error::from(err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canceled_is_never_retryable() {
        let err = Error::canceled("caller gave up").set_retryable(true);
        assert!(!err.is_retryable());
        assert_eq!(err.kind(), ErrorKind::Canceled);
    }

    #[test]
    fn test_context_is_kept_in_order() {
        let err = Error::timeout("read timed out")
            .with_context("method: GET")
            .with_context("url: http://127.0.0.1/a");

        assert!(err.is_retryable());
        assert!(err.is_transport_error());
        assert_eq!(err.context(), ["method: GET", "url: http://127.0.0.1/a"]);
        assert_eq!(err.to_string(), "read timed out");
    }
}
