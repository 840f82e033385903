use crate::{Error, ServiceError};
use amzreq_core::ErrorKind;
use http::StatusCode;

/// Which failures the dispatch loop retries.
///
/// Both policies agree on service errors and on errors tagged at the
/// transport boundary. They differ on network failures that were not tagged
/// retryable: [`Permissive`](RetryPolicy::Permissive) retries those too,
/// [`Conservative`](RetryPolicy::Conservative) gives up.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RetryPolicy {
    /// Retry almost everything.
    #[default]
    Permissive,
    /// Retry only what is known to be transient.
    Conservative,
}

/// Error codes that are transient whatever status they come with.
const RETRYABLE_CODES: &[&str] = &[
    "InternalError",
    "NoSuchUpload",
    "NoSuchBucket",
    "RequestTimeout",
];

impl RetryPolicy {
    /// Decide whether `err` deserves another attempt.
    pub fn should_retry(&self, err: &Error) -> bool {
        match err {
            Error::Core(e) => match e.kind() {
                ErrorKind::Canceled => false,
                _ if e.is_retryable() => true,
                _ if e.is_transport_error() => *self == RetryPolicy::Permissive,
                _ => false,
            },
            Error::Service(e) => should_retry_service(e),
            Error::Decode { .. } => *self == RetryPolicy::Permissive,
            Error::Verification(_) | Error::InvalidBucket(_) => false,
        }
    }
}

fn should_retry_service(err: &ServiceError) -> bool {
    if RETRYABLE_CODES.contains(&err.code.as_str()) {
        return true;
    }
    if err.status.is_server_error() {
        return true;
    }

    match err.status {
        StatusCode::TOO_MANY_REQUESTS => true,
        StatusCode::CONFLICT => should_retry_conflict(err),
        // Some intermediaries answer 400 without any S3 error body, that is
        // not a bad request from us.
        StatusCode::BAD_REQUEST => err.code.is_empty(),
        _ => false,
    }
}

/// 409 is retried everywhere except on Hitachi Content Platform.
///
/// HCP reports both "object already exists" (never retry) and a conflicting
/// operation from a timed out earlier attempt (retry) as 409, the message
/// text is the only way to tell them apart. This keys off the `Server`
/// header and is a heuristic.
fn should_retry_conflict(err: &ServiceError) -> bool {
    let server = err
        .headers
        .get(http::header::SERVER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    if !server.starts_with("HCP") {
        return true;
    }

    err.code == "OperationAborted" && err.message.to_lowercase().contains("conflicting operation")
}

#[cfg(test)]
mod tests {
    use super::*;
    use amzreq_core::Error as CoreError;
    use http::HeaderMap;
    use test_case::test_case;

    fn service_error(status: u16, code: &str, message: &str, server: Option<&str>) -> Error {
        let mut headers = HeaderMap::new();
        if let Some(server) = server {
            headers.insert(http::header::SERVER, server.parse().unwrap());
        }
        ServiceError {
            status: StatusCode::from_u16(status).unwrap(),
            code: code.to_string(),
            message: message.to_string(),
            bucket_name: String::new(),
            request_id: "4442587FB7D0A2F9".to_string(),
            host_id: String::new(),
            headers,
        }
        .into()
    }

    #[test_case(500, "", "", None => true; "internal server error")]
    #[test_case(503, "SlowDown", "Please reduce your request rate.", None => true; "slow down")]
    #[test_case(429, "", "", None => true; "too many requests")]
    #[test_case(404, "NoSuchBucket", "", None => true; "no such bucket")]
    #[test_case(404, "NoSuchUpload", "", None => true; "no such upload")]
    #[test_case(400, "RequestTimeout", "", None => true; "request timeout code")]
    #[test_case(200, "InternalError", "", None => true; "internal error code")]
    #[test_case(400, "", "", None => true; "bare bad request")]
    #[test_case(400, "InvalidArgument", "", None => false; "invalid argument")]
    #[test_case(403, "AccessDenied", "Access Denied", None => false; "access denied")]
    #[test_case(404, "NoSuchKey", "", None => false; "no such key")]
    #[test_case(409, "BucketNotEmpty", "", None => true; "conflict on s3")]
    #[test_case(409, "BucketNotEmpty", "", Some("AmazonS3") => true; "conflict on amazon s3")]
    #[test_case(
        409, "OperationAborted", "A conflicting operation is currently in progress",
        Some("HCP V7.2.0.26") => true; "conflicting operation on hcp"
    )]
    #[test_case(
        409, "OperationAborted", "Object already exists", Some("HCP V7.2.0.26")
        => false; "object exists on hcp"
    )]
    #[test_case(
        409, "ObjectAlreadyExists", "A CONFLICTING OPERATION", Some("HCP")
        => false; "other code on hcp"
    )]
    fn test_service_error_classification(
        status: u16,
        code: &str,
        message: &str,
        server: Option<&str>,
    ) -> bool {
        let err = service_error(status, code, message, server);
        assert_eq!(
            RetryPolicy::Permissive.should_retry(&err),
            RetryPolicy::Conservative.should_retry(&err)
        );
        err.is_retryable(RetryPolicy::Permissive)
    }

    #[test]
    fn test_core_error_classification() {
        let timeout = Error::Core(CoreError::timeout("read timed out"));
        assert!(timeout.is_retryable(RetryPolicy::Permissive));
        assert!(timeout.is_retryable(RetryPolicy::Conservative));

        let broken = Error::Core(CoreError::transport(
            ErrorKind::ConnectionBroken,
            "broken pipe",
            true,
        ));
        assert!(broken.is_retryable(RetryPolicy::Conservative));

        let untagged = Error::Core(CoreError::transport(ErrorKind::Transport, "tls", false));
        assert!(untagged.is_retryable(RetryPolicy::Permissive));
        assert!(!untagged.is_retryable(RetryPolicy::Conservative));

        let canceled = Error::Core(CoreError::canceled("caller gave up").set_retryable(true));
        assert!(!canceled.is_retryable(RetryPolicy::Permissive));

        let signing = Error::Core(CoreError::request_invalid("path is not valid utf-8"));
        assert!(!signing.is_retryable(RetryPolicy::Permissive));

        let credential = Error::Core(CoreError::credential_invalid("no credential"));
        assert!(!credential.is_retryable(RetryPolicy::Permissive));
    }

    #[test]
    fn test_local_error_classification() {
        let err = Error::Verification("encryption not honored".to_string());
        assert!(!err.is_retryable(RetryPolicy::Permissive));

        let err = Error::InvalidBucket("a:b".to_string());
        assert!(!err.is_retryable(RetryPolicy::Permissive));

        let err = Error::decode("bad list", anyhow::anyhow!("eof"));
        assert!(err.is_retryable(RetryPolicy::Permissive));
        assert!(!err.is_retryable(RetryPolicy::Conservative));
    }
}
