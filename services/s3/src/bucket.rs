use crate::constants::*;
use crate::request::{header_name, header_value};
use crate::{Error, Payload, RequestDescriptor, Result, S3};
use bytes::Bytes;
use futures::stream::BoxStream;
use http::header::{CACHE_CONTROL, CONTENT_ENCODING, CONTENT_LENGTH, CONTENT_TYPE};
use http::{HeaderMap, HeaderName, Method, Response, StatusCode};
use quick_xml::de;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Canned access control lists.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Acl {
    Private,
    PublicRead,
    PublicReadWrite,
    AuthenticatedRead,
    BucketOwnerRead,
    BucketOwnerFullControl,
}

impl Acl {
    pub fn as_str(&self) -> &'static str {
        match self {
            Acl::Private => "private",
            Acl::PublicRead => "public-read",
            Acl::PublicReadWrite => "public-read-write",
            Acl::AuthenticatedRead => "authenticated-read",
            Acl::BucketOwnerRead => "bucket-owner-read",
            Acl::BucketOwnerFullControl => "bucket-owner-full-control",
        }
    }
}

impl fmt::Display for Acl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Optional headers of an upload.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Options {
    /// Ask for AES256 server side encryption. The response is checked to
    /// confirm it.
    pub sse: bool,
    /// User metadata, sent as `x-amz-meta-*`.
    pub meta: BTreeMap<String, Vec<String>>,
    pub content_encoding: Option<String>,
    pub cache_control: Option<String>,
    pub redirect_location: Option<String>,
    /// Base64 encoded MD5 of the body.
    pub content_md5: Option<String>,
}

impl Options {
    fn add_headers(&self, headers: &mut HeaderMap) -> Result<()> {
        if self.sse {
            headers.insert(
                X_AMZ_SERVER_SIDE_ENCRYPTION,
                http::HeaderValue::from_static("AES256"),
            );
        }
        if let Some(v) = &self.content_encoding {
            headers.insert(CONTENT_ENCODING, header_value(v)?);
        }
        if let Some(v) = &self.cache_control {
            headers.insert(CACHE_CONTROL, header_value(v)?);
        }
        if let Some(v) = &self.content_md5 {
            headers.insert("content-md5", header_value(v)?);
        }
        if let Some(v) = &self.redirect_location {
            headers.insert(X_AMZ_WEBSITE_REDIRECT_LOCATION, header_value(v)?);
        }
        for (k, values) in &self.meta {
            let name = header_name(&format!("{X_AMZ_META_PREFIX}{k}"))?;
            headers.remove(&name);
            for v in values {
                headers.append(name.clone(), header_value(v)?);
            }
        }
        Ok(())
    }
}

/// Options of a server side copy.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CopyOptions {
    pub options: Options,
    /// `COPY` or `REPLACE`.
    pub metadata_directive: Option<String>,
    pub content_type: Option<String>,
}

impl CopyOptions {
    fn add_headers(&self, headers: &mut HeaderMap) -> Result<()> {
        self.options.add_headers(headers)?;
        if let Some(v) = &self.metadata_directive {
            headers.insert(X_AMZ_METADATA_DIRECTIVE, header_value(v)?);
        }
        if let Some(v) = &self.content_type {
            headers.insert(CONTENT_TYPE, header_value(v)?);
        }
        Ok(())
    }
}

#[derive(Default, Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct CopyObjectResult {
    #[serde(rename = "ETag")]
    pub etag: String,
    pub last_modified: String,
}

#[derive(Default, Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct Owner {
    #[serde(rename = "ID")]
    pub id: String,
    pub display_name: String,
}

/// An object listed in a bucket.
#[derive(Default, Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct Key {
    pub key: String,
    pub last_modified: String,
    pub size: u64,
    /// Hex encoded MD5 of the content, surrounded with double quotes.
    #[serde(rename = "ETag")]
    pub etag: String,
    pub storage_class: String,
    pub owner: Owner,
}

#[derive(Default, Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct CommonPrefix {
    pub prefix: String,
}

/// One page of a bucket listing.
#[derive(Default, Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct ListResp {
    pub name: String,
    pub prefix: String,
    pub delimiter: String,
    pub marker: String,
    /// Only returned by S3 when a delimiter was given.
    pub next_marker: String,
    pub max_keys: u32,
    /// Whether more keys and prefixes are left after this page.
    pub is_truncated: bool,
    pub contents: Vec<Key>,
    pub common_prefixes: Vec<CommonPrefix>,
}

#[derive(Default, Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct RoutingRule {
    pub condition: RoutingRuleCondition,
    pub redirect: RoutingRuleRedirect,
}

#[derive(Default, Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct RoutingRuleCondition {
    pub key_prefix_equals: String,
}

#[derive(Default, Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct RoutingRuleRedirect {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub replace_key_prefix_with: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub replace_key_with: Option<String>,
}

/// Static website hosting of a bucket.
#[derive(Default, Debug, Clone, PartialEq, Eq)]
pub struct WebsiteConfiguration {
    pub index_document_suffix: String,
    pub error_document_key: String,
    pub routing_rules: Vec<RoutingRule>,
}

impl WebsiteConfiguration {
    fn to_xml(&self) -> Result<String> {
        #[derive(Serialize)]
        #[serde(rename = "WebsiteConfiguration", rename_all = "PascalCase")]
        struct Doc<'a> {
            #[serde(rename = "@xmlns")]
            xmlns: &'a str,
            index_document: Suffix<'a>,
            error_document: ErrorKey<'a>,
            #[serde(skip_serializing_if = "Option::is_none")]
            routing_rules: Option<Rules<'a>>,
        }
        #[derive(Serialize)]
        #[serde(rename_all = "PascalCase")]
        struct Suffix<'a> {
            suffix: &'a str,
        }
        #[derive(Serialize)]
        #[serde(rename_all = "PascalCase")]
        struct ErrorKey<'a> {
            key: &'a str,
        }
        #[derive(Serialize)]
        struct Rules<'a> {
            #[serde(rename = "RoutingRule")]
            rules: &'a [RoutingRule],
        }

        let doc = Doc {
            xmlns: S3_XMLNS,
            index_document: Suffix {
                suffix: &self.index_document_suffix,
            },
            error_document: ErrorKey {
                key: &self.error_document_key,
            },
            routing_rules: (!self.routing_rules.is_empty()).then_some(Rules {
                rules: &self.routing_rules,
            }),
        };
        let xml = quick_xml::se::to_string(&doc).map_err(|e| {
            amzreq_core::Error::unexpected("failed to serialize website configuration")
                .with_source(e)
        })?;
        Ok(format!("{XML_HEADER}{xml}"))
    }
}

/// A bucket in S3.
#[derive(Debug, Clone)]
pub struct Bucket {
    s3: S3,
    name: String,
}

impl Bucket {
    pub(crate) fn new(s3: S3, name: String) -> Self {
        Self { s3, name }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The client this bucket talks through.
    pub fn s3(&self) -> &S3 {
        &self.s3
    }

    pub(crate) fn request(&self, method: Method, path: &str) -> RequestDescriptor {
        RequestDescriptor::new(method)
            .with_bucket(self.name.clone())
            .with_path(path)
    }

    /// Send `req` and decode the XML body of its response.
    ///
    /// Decoding is part of the attempt, a garbled body is retried under the
    /// permissive policy.
    pub(crate) async fn execute_xml<T: serde::de::DeserializeOwned>(
        &self,
        what: &str,
        req: RequestDescriptor,
    ) -> Result<T> {
        self.s3
            .execute_and_then(req, &CancellationToken::new(), |resp| {
                let body = resp.into_body();
                de::from_reader(body.as_ref()).map_err(|e| {
                    Error::decode(
                        format!("failed to decode {what} response of bucket {}", self.name),
                        e,
                    )
                })
            })
            .await
    }

    /// Create the bucket.
    pub async fn put_bucket(&self, acl: Acl) -> Result<()> {
        let mut req = self
            .request(Method::PUT, "/")
            .with_header(HeaderName::from_static(X_AMZ_ACL), acl_value(acl));
        if let Some(body) = self.s3.region().location_constraint()? {
            req = req.with_payload(Bytes::from(body));
        }
        self.s3.execute(req).await?;
        Ok(())
    }

    /// Remove the bucket. It must be empty.
    pub async fn del_bucket(&self) -> Result<()> {
        self.s3.execute(self.request(Method::DELETE, "/")).await?;
        Ok(())
    }

    /// Read a whole object.
    pub async fn get(&self, path: &str) -> Result<Bytes> {
        Ok(self.get_response(path).await?.into_body())
    }

    pub async fn get_response(&self, path: &str) -> Result<Response<Bytes>> {
        self.get_response_with_headers(path, HeaderMap::new(), None)
            .await
    }

    /// Get an object with extra request headers (`range`, `if-match`, ...)
    /// and an optional per attempt timeout.
    pub async fn get_response_with_headers(
        &self,
        path: &str,
        headers: HeaderMap,
        timeout: Option<Duration>,
    ) -> Result<Response<Bytes>> {
        let mut req = self.request(Method::GET, path).with_headers(headers);
        if let Some(timeout) = timeout {
            req = req.with_timeout(timeout);
        }
        self.s3.execute(req).await
    }

    /// Check whether an object exists.
    ///
    /// Both 403 and 404 mean it does not.
    pub async fn exists(&self, path: &str) -> Result<bool> {
        match self.s3.execute(self.request(Method::HEAD, path)).await {
            Ok(resp) => Ok(resp.status().is_success()),
            Err(err)
                if matches!(
                    err.status(),
                    Some(StatusCode::FORBIDDEN | StatusCode::NOT_FOUND)
                ) =>
            {
                Ok(false)
            }
            Err(err) => Err(err),
        }
    }

    /// HEAD an object, the response has no body.
    pub async fn head(&self, path: &str, headers: HeaderMap) -> Result<Response<Bytes>> {
        self.s3
            .execute(self.request(Method::HEAD, path).with_headers(headers))
            .await
    }

    /// Upload an object.
    pub async fn put(
        &self,
        path: &str,
        data: Bytes,
        content_type: &str,
        acl: Acl,
        options: Options,
    ) -> Result<()> {
        self.put_payload(path, Payload::Bytes(data), content_type, acl, options)
            .await
    }

    /// Upload an object with caller supplied headers.
    ///
    /// The content type defaults to `application/text`, `headers` override
    /// the defaults.
    pub async fn put_header(
        &self,
        path: &str,
        data: Bytes,
        headers: HeaderMap,
        acl: Acl,
    ) -> Result<()> {
        let req = self
            .request(Method::PUT, path)
            .with_header(CONTENT_LENGTH, data.len().into())
            .with_header(
                CONTENT_TYPE,
                http::HeaderValue::from_static("application/text"),
            )
            .with_header(HeaderName::from_static(X_AMZ_ACL), acl_value(acl))
            .with_headers(headers)
            .with_payload(data);
        self.s3.execute(req).await?;
        Ok(())
    }

    /// Upload `length` bytes from a stream.
    ///
    /// The stream can't be replayed, the upload gets a single attempt.
    pub async fn put_reader(
        &self,
        path: &str,
        stream: BoxStream<'static, std::io::Result<Bytes>>,
        length: u64,
        content_type: &str,
        acl: Acl,
        options: Options,
    ) -> Result<()> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_LENGTH, length.into());
        self.put_with_headers(path, Payload::Stream(stream), headers, content_type, acl, options)
            .await
    }

    /// Upload a byte range of a local file, read again for each attempt.
    pub async fn put_file(
        &self,
        path: &str,
        file: &str,
        offset: u64,
        length: u64,
        content_type: &str,
        acl: Acl,
    ) -> Result<()> {
        let payload = Payload::File {
            path: file.to_string(),
            offset,
            length,
        };
        self.put_payload(path, payload, content_type, acl, Options::default())
            .await
    }

    /// Upload any replayable payload.
    pub async fn put_payload(
        &self,
        path: &str,
        payload: Payload,
        content_type: &str,
        acl: Acl,
        options: Options,
    ) -> Result<()> {
        let mut headers = HeaderMap::new();
        if let Some(len) = payload.len() {
            headers.insert(CONTENT_LENGTH, len.into());
        }
        self.put_with_headers(path, payload, headers, content_type, acl, options)
            .await
    }

    async fn put_with_headers(
        &self,
        path: &str,
        payload: Payload,
        mut headers: HeaderMap,
        content_type: &str,
        acl: Acl,
        options: Options,
    ) -> Result<()> {
        headers.insert(CONTENT_TYPE, header_value(content_type)?);
        headers.insert(X_AMZ_ACL, acl_value(acl));
        options.add_headers(&mut headers)?;

        let req = self
            .request(Method::PUT, path)
            .with_headers(headers)
            .with_payload(payload);
        self.s3.execute(req).await?;
        Ok(())
    }

    /// Copy `source` (`bucket/key`) to `path` in this bucket.
    pub async fn put_copy(
        &self,
        path: &str,
        acl: Acl,
        options: CopyOptions,
        source: &str,
    ) -> Result<CopyObjectResult> {
        let mut headers = HeaderMap::new();
        headers.insert(X_AMZ_ACL, acl_value(acl));
        headers.insert(X_AMZ_COPY_SOURCE, header_value(source)?);
        options.add_headers(&mut headers)?;

        self.execute_xml(
            "copy object",
            self.request(Method::PUT, path).with_headers(headers),
        )
        .await
    }

    /// Remove an object.
    pub async fn del(&self, path: &str) -> Result<()> {
        self.s3.execute(self.request(Method::DELETE, path)).await?;
        Ok(())
    }

    /// List objects in the bucket.
    ///
    /// - `prefix` limits the response to keys starting with it.
    /// - `delim` groups keys sharing a prefix up to the next delimiter into
    ///   `common_prefixes`.
    /// - `marker` lists keys after it.
    /// - `max` limits keys plus common prefixes returned, 0 leaves the
    ///   service default of 1000.
    pub async fn list(
        &self,
        prefix: &str,
        delim: &str,
        marker: &str,
        max: usize,
    ) -> Result<ListResp> {
        let mut req = self
            .request(Method::GET, "/")
            .with_query("prefix", prefix)
            .with_query("delimiter", delim)
            .with_query("marker", marker);
        if max != 0 {
            req = req.with_query("max-keys", max.to_string());
        }

        self.execute_xml("list", req).await
    }

    /// Every key of the bucket, following pagination.
    pub async fn get_bucket_contents(&self) -> Result<BTreeMap<String, Key>> {
        let mut contents = BTreeMap::new();
        let mut marker = String::new();
        loop {
            let page = self.list("", "", &marker, 1000).await?;
            let last_key = page.contents.last().map(|k| k.key.clone());
            for key in page.contents {
                contents.insert(key.key.clone(), key);
            }
            if !page.is_truncated {
                break;
            }

            // NextMarker is only sent with a delimiter, continue after the
            // last key otherwise.
            marker = match (page.next_marker.is_empty(), last_key) {
                (false, _) => page.next_marker,
                (true, Some(key)) => key,
                (true, None) => break,
            };
        }
        Ok(contents)
    }

    /// Unsigned URL of an object, usable when the object is public.
    pub fn url(&self, path: &str) -> Result<String> {
        let mut req = self.request(Method::GET, path);
        req.prepare(self.s3.region())?;
        Ok(req.uri()?.to_string())
    }

    /// Presigned GET URL, valid for `expires_in` (7 days at most).
    pub async fn signed_url(&self, path: &str, expires_in: Duration) -> Result<String> {
        let mut req = self.request(Method::GET, path);
        req.prepare(self.s3.region())?;

        let mut parts = req.to_parts()?;
        self.s3.signer().sign(&mut parts, Some(expires_in)).await?;
        Ok(parts.uri.to_string())
    }

    /// PUT a bucket subresource such as `website` or `cors`.
    pub async fn put_bucket_subresource(&self, subresource: &str, data: Bytes) -> Result<()> {
        let req = self
            .request(Method::PUT, "/")
            .with_query(subresource, "")
            .with_header(CONTENT_LENGTH, data.len().into())
            .with_payload(data);
        self.s3.execute(req).await?;
        Ok(())
    }

    /// Configure static website hosting.
    pub async fn put_bucket_website(&self, config: &WebsiteConfiguration) -> Result<()> {
        let body = config.to_xml()?;
        self.put_bucket_subresource("website", Bytes::from(body))
            .await
    }
}

fn acl_value(acl: Acl) -> http::HeaderValue {
    http::HeaderValue::from_static(acl.as_str())
}
