use crate::constants::*;
use crate::RetryPolicy;
use bytes::Bytes;
use http::{HeaderMap, StatusCode};
use quick_xml::de;
use serde::Deserialize;
use std::fmt;

/// Errors returned by S3 operations.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// Signing, configuration, transport or cancellation failure.
    #[error(transparent)]
    Core(#[from] amzreq_core::Error),
    /// S3 (or something in front of it) answered with a non-2xx status.
    #[error(transparent)]
    Service(#[from] Box<ServiceError>),
    /// The request succeeded but the response broke a requested contract.
    #[error("{0}")]
    Verification(String),
    /// A successful response body could not be decoded.
    #[error("{message}")]
    Decode {
        /// What failed to decode.
        message: String,
        /// The decoder error.
        #[source]
        source: anyhow::Error,
    },
    /// The bucket name cannot be placed into the bucket endpoint.
    #[error("bad S3 bucket: {0:?}")]
    InvalidBucket(String),
}

/// Result type of S3 operations.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub(crate) fn decode(message: impl Into<String>, source: impl Into<anyhow::Error>) -> Self {
        Error::Decode {
            message: message.into(),
            source: source.into(),
        }
    }

    /// HTTP status of a service error.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Error::Service(e) => Some(e.status),
            _ => None,
        }
    }

    /// Error code reported by the service, like `NoSuchKey`.
    pub fn code(&self) -> Option<&str> {
        match self {
            Error::Service(e) => Some(&e.code),
            _ => None,
        }
    }

    /// Request id of the failed request.
    pub fn request_id(&self) -> Option<&str> {
        match self {
            Error::Service(e) => Some(&e.request_id),
            _ => None,
        }
    }

    /// Host id of the failed request.
    pub fn host_id(&self) -> Option<&str> {
        match self {
            Error::Service(e) => Some(&e.host_id),
            _ => None,
        }
    }

    /// Whether another attempt could succeed under `policy`.
    pub fn is_retryable(&self, policy: RetryPolicy) -> bool {
        policy.should_retry(self)
    }
}

/// An error response from S3.
#[derive(Debug, Clone)]
pub struct ServiceError {
    /// HTTP status code (403, 404, ...).
    pub status: StatusCode,
    /// S3 error code ("NoSuchBucket", ...), empty when the body had none.
    pub code: String,
    /// The human oriented error message.
    pub message: String,
    pub bucket_name: String,
    pub request_id: String,
    pub host_id: String,
    /// Headers of the error response.
    pub headers: HeaderMap,
}

impl fmt::Display for ServiceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for ServiceError {}

#[derive(Default, Debug, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
struct ErrorDocument {
    code: String,
    message: String,
    bucket_name: String,
    request_id: String,
    host_id: String,
}

impl ServiceError {
    /// Build the error from a non-2xx response.
    ///
    /// Bodies without a message (HEAD responses, proxies) keep the raw body
    /// in the message.
    pub fn from_response(resp: http::Response<Bytes>) -> Self {
        let (parts, body) = resp.into_parts();

        let mut decode_failure = String::new();
        let doc = match de::from_reader::<_, ErrorDocument>(body.as_ref()) {
            Ok(doc) => doc,
            Err(e) => {
                decode_failure = format!("decoding XML failed: {e}\n");
                ErrorDocument::default()
            }
        };

        let message = if doc.message.is_empty() {
            format!(
                "HTTP response '{}': {decode_failure}raw response: \n{}\n",
                parts.status,
                String::from_utf8_lossy(&body)
            )
        } else {
            doc.message
        };

        let header = |name: &str| {
            parts
                .headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .unwrap_or_default()
                .to_string()
        };
        let request_id = if doc.request_id.is_empty() {
            header(X_AMZ_REQUEST_ID)
        } else {
            doc.request_id
        };
        let host_id = if doc.host_id.is_empty() {
            header(X_AMZ_ID_2)
        } else {
            doc.host_id
        };

        Self {
            status: parts.status,
            code: doc.code,
            message,
            bucket_name: doc.bucket_name,
            request_id,
            host_id,
            headers: parts.headers,
        }
    }
}

impl From<ServiceError> for Error {
    fn from(err: ServiceError) -> Self {
        Error::Service(Box::new(err))
    }
}
