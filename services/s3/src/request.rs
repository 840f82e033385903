use crate::constants::BUCKET_PLACEHOLDER;
use crate::{Error, Region, Result};
use amzreq_aws_v4::{AWS_QUERY_ENCODE_SET, AWS_URI_ENCODE_SET};
use amzreq_core::{Body, Context};
use bytes::Bytes;
use futures::stream::BoxStream;
use http::header::HeaderName;
use http::{HeaderMap, HeaderValue, Method, Uri};
use percent_encoding::utf8_percent_encode;
use std::fmt::{Debug, Formatter};
use std::mem;
use std::time::Duration;

/// Where the body of a request comes from.
#[derive(Default)]
pub enum Payload {
    /// No body.
    #[default]
    Empty,
    /// A buffered body, resent as is on every attempt.
    Bytes(Bytes),
    /// A byte range of a local file, read again on every attempt.
    File {
        /// Path of the file.
        path: String,
        /// Where the range starts.
        offset: u64,
        /// Length of the range.
        length: u64,
    },
    /// A body that can only be consumed once.
    ///
    /// Requests carrying a stream get a single attempt, failures are never
    /// retried.
    Stream(BoxStream<'static, std::io::Result<Bytes>>),
}

impl Payload {
    /// Whether the payload can be sent again after a failed attempt.
    pub fn is_replayable(&self) -> bool {
        !matches!(self, Payload::Stream(_))
    }

    /// Length of the payload when it is known up front.
    pub fn len(&self) -> Option<u64> {
        match self {
            Payload::Empty => Some(0),
            Payload::Bytes(bs) => Some(bs.len() as u64),
            Payload::File { length, .. } => Some(*length),
            Payload::Stream(_) => None,
        }
    }

    /// Whether the payload is known to be empty.
    pub fn is_empty(&self) -> bool {
        self.len() == Some(0)
    }

    /// Produce the body for one attempt.
    ///
    /// A stream is handed out once, the payload is empty afterwards.
    pub(crate) async fn to_body(&mut self, ctx: &Context) -> Result<Body> {
        match mem::take(self) {
            Payload::Empty => Ok(Body::Empty),
            Payload::Bytes(bs) => {
                *self = Payload::Bytes(bs.clone());
                Ok(Body::Bytes(bs))
            }
            Payload::File {
                path,
                offset,
                length,
            } => {
                let content = ctx.file_read_range(&path, offset, length).await;
                *self = Payload::File {
                    path,
                    offset,
                    length,
                };
                Ok(Body::Bytes(Bytes::from(content?)))
            }
            Payload::Stream(s) => Ok(Body::Stream(s)),
        }
    }
}

impl Debug for Payload {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Payload::Empty => f.write_str("Empty"),
            Payload::Bytes(bs) => write!(f, "Bytes({} bytes)", bs.len()),
            Payload::File {
                path,
                offset,
                length,
            } => write!(f, "File({path}, {offset}..+{length})"),
            Payload::Stream(_) => f.write_str("Stream"),
        }
    }
}

impl From<Bytes> for Payload {
    fn from(bs: Bytes) -> Self {
        Payload::Bytes(bs)
    }
}

/// A request to S3 before signing.
///
/// The caller supplied fields never change between attempts. `prepare`
/// resolves the endpoint once, signing happens again for every attempt.
#[derive(Debug, Default)]
pub struct RequestDescriptor {
    method: Method,
    bucket: Option<String>,
    path: String,
    query: Vec<(String, String)>,
    headers: HeaderMap,
    payload: Payload,
    timeout: Option<Duration>,

    base_url: Option<String>,
}

impl RequestDescriptor {
    /// Create a descriptor for `method`.
    pub fn new(method: Method) -> Self {
        Self {
            method,
            ..Default::default()
        }
    }

    /// Address a bucket.
    pub fn with_bucket(mut self, bucket: impl Into<String>) -> Self {
        self.bucket = Some(bucket.into());
        self
    }

    /// Set the object path, relative to the bucket when there is one.
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = path.into();
        self
    }

    /// Append a query parameter. An empty value renders a bare key like
    /// `?tagging`.
    pub fn with_query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    /// Set a header, replacing any previous values.
    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Merge headers, replacing previous values of the same name.
    pub fn with_headers(mut self, headers: HeaderMap) -> Self {
        let mut last = None;
        for (name, value) in headers {
            // Following values of the same name come with `None`.
            let name = match name {
                Some(name) => {
                    self.headers.remove(&name);
                    last = Some(name.clone());
                    name
                }
                None => match &last {
                    Some(name) => name.clone(),
                    None => continue,
                },
            };
            self.headers.append(name, value);
        }
        self
    }

    /// Set the payload.
    pub fn with_payload(mut self, payload: impl Into<Payload>) -> Self {
        self.payload = payload.into();
        self
    }

    /// Bound every attempt of this request, overriding the client default.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Path of the request. After `prepare` it starts with `/` and includes
    /// the bucket for path style requests.
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn payload(&self) -> &Payload {
        &self.payload
    }

    pub(crate) fn payload_mut(&mut self) -> &mut Payload {
        &mut self.payload
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Whether `prepare` already ran.
    pub fn is_prepared(&self) -> bool {
        self.base_url.is_some()
    }

    /// Resolve the endpoint and normalize the path.
    ///
    /// Running it again is a no-op.
    pub fn prepare(&mut self, region: &Region) -> Result<()> {
        if self.is_prepared() {
            return Ok(());
        }

        if !self.path.starts_with('/') {
            self.path.insert(0, '/');
        }

        let base_url = match (&self.bucket, &region.s3_bucket_endpoint) {
            (None, _) => region.s3_endpoint.clone(),
            (Some(bucket), None) => {
                self.path = format!("/{bucket}{}", self.path);
                region.s3_endpoint.clone()
            }
            (Some(bucket), Some(template)) => {
                if bucket.contains(['/', ':', '@']) {
                    return Err(Error::InvalidBucket(bucket.clone()));
                }
                template.replace(BUCKET_PLACEHOLDER, bucket)
            }
        };

        self.base_url = Some(base_url.trim_end_matches('/').to_string());
        Ok(())
    }

    /// Full URL of the prepared request.
    pub fn uri(&self) -> Result<Uri> {
        let mut url = self.base_url_or_err()?.to_string();
        url.push_str(&utf8_percent_encode(&self.path, &AWS_URI_ENCODE_SET).to_string());

        for (i, (k, v)) in self.query.iter().enumerate() {
            url.push(if i == 0 { '?' } else { '&' });
            url.push_str(&utf8_percent_encode(k, &AWS_QUERY_ENCODE_SET).to_string());
            if !v.is_empty() {
                url.push('=');
                url.push_str(&utf8_percent_encode(v, &AWS_QUERY_ENCODE_SET).to_string());
            }
        }

        url.parse::<Uri>()
            .map_err(|e| amzreq_core::Error::from(e).into())
    }

    /// Build the unsigned http request parts for one attempt.
    pub(crate) fn to_parts(&self) -> Result<http::request::Parts> {
        let (mut parts, ()) = http::Request::builder()
            .method(self.method.clone())
            .uri(self.uri()?)
            .body(())
            .map_err(amzreq_core::Error::from)?
            .into_parts();
        parts.headers = self.headers.clone();
        Ok(parts)
    }

    fn base_url_or_err(&self) -> Result<&str> {
        self.base_url.as_deref().ok_or_else(|| {
            amzreq_core::Error::unexpected("request must be prepared before use").into()
        })
    }
}

/// Build a header value from caller input.
///
/// Non-ASCII text is kept as its UTF-8 bytes.
pub(crate) fn header_value(v: &str) -> Result<HeaderValue> {
    HeaderValue::from_bytes(v.as_bytes()).map_err(|e| amzreq_core::Error::from(e).into())
}

/// Build a header name from caller input.
pub(crate) fn header_name(v: &str) -> Result<HeaderName> {
    HeaderName::try_from(v).map_err(|e| amzreq_core::Error::from(e).into())
}
