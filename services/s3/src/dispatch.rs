use crate::constants::X_AMZ_SERVER_SIDE_ENCRYPTION;
use crate::{Bucket, Error, Region, RequestDescriptor, Result, RetryPolicy, ServiceError};
use amzreq_aws_v4::{Credential, RequestSigner, UNSIGNED_PAYLOAD, X_AMZ_CONTENT_SHA_256};
use amzreq_core::hash::hex_sha256;
use amzreq_core::{
    Body, Context, FixedAttemptStrategy, ProvideCredential, RequestTimeout, Signer, Step,
};
use bytes::Bytes;
use http::{HeaderValue, Response};
use log::{debug, warn};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Attempt strategy used unless configured otherwise: at least 5 attempts
/// 200ms apart, more while within 5s.
pub fn default_attempt_strategy() -> FixedAttemptStrategy {
    FixedAttemptStrategy::new(Duration::from_secs(5), Duration::from_millis(200)).with_min(5)
}

/// Client for one S3 region.
///
/// Cloning is cheap, clones share the cached credential.
#[derive(Debug, Clone)]
pub struct S3 {
    ctx: Context,
    region: Region,
    signer: Signer<Credential>,
    strategy: FixedAttemptStrategy,
    policy: RetryPolicy,
    request_timeout: Option<Duration>,
}

impl S3 {
    /// Create a client that signs with credentials from `loader`.
    pub fn new(
        ctx: Context,
        region: Region,
        loader: impl ProvideCredential<Credential = Credential>,
    ) -> Self {
        let signer = Signer::new(
            ctx.clone(),
            loader,
            RequestSigner::new("s3", &region.name),
        );
        Self::from_signer(ctx, region, signer)
    }

    /// Create a client around a ready signer.
    ///
    /// The signer must sign for service `s3` in the region's name.
    pub fn from_signer(ctx: Context, region: Region, signer: Signer<Credential>) -> Self {
        Self {
            ctx,
            region,
            signer,
            strategy: default_attempt_strategy(),
            policy: RetryPolicy::default(),
            request_timeout: None,
        }
    }

    /// Set the attempt strategy shared by every request.
    pub fn with_attempt_strategy(mut self, strategy: FixedAttemptStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Set which failures are retried.
    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Bound every attempt, including reading the response body.
    ///
    /// A timeout set on the request itself wins.
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    pub fn region(&self) -> &Region {
        &self.region
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        self.policy
    }

    pub(crate) fn signer(&self) -> &Signer<Credential> {
        &self.signer
    }

    /// Handle to a bucket.
    ///
    /// The name is lowercased when the region demands it or buckets are
    /// addressed through a bucket endpoint.
    pub fn bucket(&self, name: &str) -> Bucket {
        let name = if self.region.s3_bucket_endpoint.is_some() || self.region.s3_lowercase_bucket
        {
            name.to_lowercase()
        } else {
            name.to_string()
        };
        Bucket::new(self.clone(), name)
    }

    /// Send a request, retrying failures the policy considers transient.
    ///
    /// Any 2xx response is a success. When exhausted the error of the last
    /// attempt is returned as is.
    pub async fn execute(&self, req: RequestDescriptor) -> Result<Response<Bytes>> {
        self.execute_with_cancel(req, &CancellationToken::new()).await
    }

    /// Like [`execute`](Self::execute), giving up as soon as `cancel` fires.
    ///
    /// Cancellation aborts the in-flight attempt or the wait before the next
    /// one and is never retried.
    pub async fn execute_with_cancel(
        &self,
        req: RequestDescriptor,
        cancel: &CancellationToken,
    ) -> Result<Response<Bytes>> {
        self.execute_and_then(req, cancel, Ok).await
    }

    /// Send a request and turn its successful response into `T`.
    ///
    /// `handle` runs inside the attempt: its errors (a truncated body that
    /// fails to decode, for instance) are classified and retried like
    /// transport failures.
    pub async fn execute_and_then<T, F>(
        &self,
        mut req: RequestDescriptor,
        cancel: &CancellationToken,
        handle: F,
    ) -> Result<T>
    where
        F: Fn(Response<Bytes>) -> Result<T>,
    {
        req.prepare(&self.region)?;
        let replayable = req.payload().is_replayable();

        let mut attempt = self.strategy.start();
        // The first attempt is always granted.
        attempt.next().await;
        loop {
            let result = tokio::select! {
                biased;
                _ = cancel.cancelled() => Err(canceled()),
                result = self.send_once(&mut req, attempt.count()) => result,
            };

            let err = match result.and_then(|resp| {
                verify_server_side_encryption(&req, &resp)?;
                handle(resp)
            }) {
                Ok(v) => return Ok(v),
                Err(err) => err,
            };

            if !replayable {
                debug!("payload of {} {} can't be replayed, not retrying", req.method(), req.path());
                return Err(err);
            }
            if !self.policy.should_retry(&err) {
                return Err(err);
            }

            warn!(
                "attempt {} of {} {} failed, retrying: {err}",
                attempt.count(),
                req.method(),
                req.path()
            );
            let step = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(canceled()),
                step = attempt.retry(err) => step,
            };
            match step {
                Step::Continue => continue,
                Step::Exhausted(err) => {
                    debug!(
                        "giving up {} {} after {} attempts",
                        req.method(),
                        req.path(),
                        attempt.count()
                    );
                    return Err(err);
                }
            }
        }
    }

    /// Sign and send one attempt with a fresh timestamp.
    async fn send_once(&self, req: &mut RequestDescriptor, n: usize) -> Result<Response<Bytes>> {
        let body = req.payload_mut().to_body(&self.ctx).await?;
        let digest = match &body {
            Body::Empty => hex_sha256(b""),
            Body::Bytes(bs) => hex_sha256(bs),
            Body::Stream(_) => UNSIGNED_PAYLOAD.to_string(),
        };

        let mut parts = req.to_parts()?;
        parts.headers.insert(
            X_AMZ_CONTENT_SHA_256,
            HeaderValue::from_str(&digest).map_err(amzreq_core::Error::from)?,
        );
        self.signer.sign(&mut parts, None).await?;
        if let Some(timeout) = req.timeout().or(self.request_timeout) {
            parts.extensions.insert(RequestTimeout(timeout));
        }

        debug!("attempt {n}: sending {} {}", parts.method, parts.uri);
        let resp = self
            .ctx
            .http_send(http::Request::from_parts(parts, body))
            .await?;
        debug!("attempt {n}: got response {}", resp.status());

        if resp.status().is_success() {
            Ok(resp)
        } else {
            Err(ServiceError::from_response(resp).into())
        }
    }
}

fn canceled() -> Error {
    amzreq_core::Error::canceled("request canceled by caller").into()
}

/// Make sure S3 encrypted the data when the request asked for it.
fn verify_server_side_encryption(req: &RequestDescriptor, resp: &Response<Bytes>) -> Result<()> {
    let Some(want) = req.headers().get(X_AMZ_SERVER_SIDE_ENCRYPTION) else {
        return Ok(());
    };
    let got = resp.headers().get(X_AMZ_SERVER_SIDE_ENCRYPTION);
    if got == Some(want) {
        return Ok(());
    }

    let value = |v: Option<&HeaderValue>| {
        v.map(|v| String::from_utf8_lossy(v.as_bytes()).to_string())
            .unwrap_or_default()
    };
    Err(Error::Verification(format!(
        "S3 did not honor encryption request: expected {X_AMZ_SERVER_SIDE_ENCRYPTION} response header value {:?} but got {:?}",
        value(Some(want)),
        value(got)
    )))
}
