use crate::constants::{
    AWS4_REQUEST, AWS_QUERY_ENCODE_SET, AWS_URI_ENCODE_SET, UNSIGNED_PAYLOAD,
    X_AMZ_CONTENT_SHA_256, X_AMZ_SECURITY_TOKEN,
};
use amzreq_core::hash::hex_sha256;
use amzreq_core::time::{format_date, DateTime};
use amzreq_core::utils::Redact;
use amzreq_core::{Error, Result, SigningRequest};
use http::{header, HeaderMap};
use percent_encoding::{percent_decode_str, utf8_percent_encode};
use std::fmt::{self, Display, Formatter};

/// Digest of the request payload as it enters the canonical request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PayloadDigest {
    /// Hex encoded SHA256 of the payload.
    Sha256(String),
    /// The payload is not hashed, `UNSIGNED-PAYLOAD` is signed instead.
    Unsigned,
}

impl PayloadDigest {
    /// Hash a buffered payload.
    pub fn of(payload: &[u8]) -> Self {
        PayloadDigest::Sha256(hex_sha256(payload))
    }

    /// Digest of an empty payload.
    pub fn empty() -> Self {
        Self::of(b"")
    }

    /// Read the digest declared by the `x-amz-content-sha256` header.
    ///
    /// Requests without the header are signed as unsigned payloads.
    pub fn from_headers(headers: &HeaderMap) -> Result<Self> {
        match headers.get(X_AMZ_CONTENT_SHA_256) {
            None => Ok(PayloadDigest::Unsigned),
            Some(v) => {
                let v = v.to_str()?.trim();
                if v == UNSIGNED_PAYLOAD {
                    Ok(PayloadDigest::Unsigned)
                } else {
                    Ok(PayloadDigest::Sha256(v.to_string()))
                }
            }
        }
    }

    /// The value written into the canonical request.
    pub fn as_str(&self) -> &str {
        match self {
            PayloadDigest::Sha256(v) => v,
            PayloadDigest::Unsigned => UNSIGNED_PAYLOAD,
        }
    }
}

/// SigningScope restricts where a derived signing key is valid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SigningScope {
    /// UTC date in `YYYYMMDD` form.
    pub date: String,
    /// Region name, for example `us-east-1`.
    pub region: String,
    /// Service name, for example `s3`.
    pub service: String,
}

impl SigningScope {
    /// Build the scope for a signing time.
    pub fn new(time: DateTime, region: &str, service: &str) -> Self {
        Self {
            date: format_date(time),
            region: region.to_string(),
            service: service.to_string(),
        }
    }
}

/// Scope: "20220313/<region>/<service>/aws4_request"
impl Display for SigningScope {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}/{}/{}",
            self.date, self.region, self.service, AWS4_REQUEST
        )
    }
}

/// CanonicalRequest is the byte exact form of a request that gets signed.
///
/// ```text
/// GET
/// /test.txt
/// list-type=2&prefix=a%20b
/// host:examplebucket.s3.amazonaws.com
/// x-amz-date:20130524T000000Z
///
/// host;x-amz-date
/// UNSIGNED-PAYLOAD
/// ```
///
/// Headers are ordered by name and queries by encoded key, so the input
/// order never changes the result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CanonicalRequest {
    method: String,
    path: String,
    query: String,
    headers: Vec<(String, String)>,
    signed_headers: String,
    payload: String,
}

impl CanonicalRequest {
    /// Build the canonical request.
    ///
    /// Fails when the path once percent decoded, or a header value, is not
    /// valid UTF-8.
    pub fn build(req: &SigningRequest, payload: &PayloadDigest) -> Result<Self> {
        let path = percent_decode_str(&req.path).decode_utf8().map_err(|e| {
            Error::request_invalid(format!("path {} is not valid utf-8", req.path))
                .with_source(e)
        })?;
        let path = if path.is_empty() {
            "/".to_string()
        } else {
            utf8_percent_encode(&path, &AWS_URI_ENCODE_SET).to_string()
        };

        let query = canonical_query_pairs(&req.query)
            .into_iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join("&");

        let mut headers = Vec::with_capacity(req.headers.keys_len());
        for name in req.headers.keys() {
            if name == header::AUTHORIZATION {
                continue;
            }

            let mut values = Vec::new();
            for value in req.headers.get_all(name) {
                // S3 user metadata may carry UTF-8 bytes.
                let value = std::str::from_utf8(value.as_bytes()).map_err(|e| {
                    Error::request_invalid(format!("header {name} is not valid utf-8"))
                        .with_source(e)
                })?;
                values.push(value.trim());
            }
            headers.push((name.as_str().to_string(), values.join(",")));
        }
        headers.sort_unstable_by(|a, b| a.0.cmp(&b.0));

        let signed_headers = headers
            .iter()
            .map(|(k, _)| k.as_str())
            .collect::<Vec<_>>()
            .join(";");

        Ok(Self {
            method: req.method.as_str().to_string(),
            path,
            query,
            headers,
            signed_headers,
            payload: payload.as_str().to_string(),
        })
    }

    /// Semicolon joined names of the signed headers.
    pub fn signed_headers(&self) -> &str {
        &self.signed_headers
    }

    /// Hex encoded SHA256 of the canonical request.
    pub fn hash(&self) -> String {
        hex_sha256(self.to_string().as_bytes())
    }

    /// Copy fit for logging, with the session token masked.
    pub(crate) fn redacted(&self) -> Self {
        let mut creq = self.clone();
        for (k, v) in creq.headers.iter_mut() {
            if k.as_str() == X_AMZ_SECURITY_TOKEN {
                *v = format!("{:?}", Redact::from(v.as_str()));
            }
        }
        creq.query = creq
            .query
            .split('&')
            .map(|pair| match pair.split_once('=') {
                Some(("X-Amz-Security-Token", v)) => {
                    format!("X-Amz-Security-Token={:?}", Redact::from(v))
                }
                _ => pair.to_string(),
            })
            .collect::<Vec<_>>()
            .join("&");
        creq
    }
}

impl Display for CanonicalRequest {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.method)?;
        writeln!(f, "{}", self.path)?;
        writeln!(f, "{}", self.query)?;
        for (k, v) in &self.headers {
            writeln!(f, "{k}:{v}")?;
        }
        writeln!(f)?;
        writeln!(f, "{}", self.signed_headers)?;
        write!(f, "{}", self.payload)
    }
}

/// Encode decoded query pairs and order them by encoded key.
///
/// The sort is stable so repeated keys keep their relative order.
pub(crate) fn canonical_query_pairs(query: &[(String, String)]) -> Vec<(String, String)> {
    let mut pairs = query
        .iter()
        .map(|(k, v)| {
            (
                utf8_percent_encode(k, &AWS_QUERY_ENCODE_SET).to_string(),
                utf8_percent_encode(v, &AWS_QUERY_ENCODE_SET).to_string(),
            )
        })
        .collect::<Vec<_>>();
    pairs.sort_by(|a, b| a.0.cmp(&b.0));
    pairs
}
