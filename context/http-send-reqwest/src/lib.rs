//! Reqwest-based transport for amzreq.
//!
//! `ReqwestHttpSend` implements the `HttpSend` seam of `amzreq_core`. It
//! owns the connection level deadlines and turns every reqwest failure into
//! an `amzreq_core::Error` that already knows whether another attempt makes
//! sense.
//!
//! ```no_run
//! use amzreq_core::Context;
//! use amzreq_http_send_reqwest::ReqwestHttpSend;
//! use std::time::Duration;
//!
//! # fn example() -> amzreq_core::Result<()> {
//! let http = ReqwestHttpSend::with_timeouts(
//!     Some(Duration::from_secs(5)),
//!     Some(Duration::from_secs(30)),
//!     Some(Duration::from_secs(30)),
//! )?;
//! let ctx = Context::new().with_http_send(http);
//! # Ok(())
//! # }
//! ```

use amzreq_core::{Body, Error, ErrorKind, HttpSend, RequestTimeout, Result};
use async_trait::async_trait;
use bytes::Bytes;
use log::debug;
use reqwest::Client;
use std::error::Error as _;
use std::io;
use std::time::Duration;

/// HttpSend over a shared [`reqwest::Client`].
#[derive(Debug, Default, Clone)]
pub struct ReqwestHttpSend {
    client: Client,
    write_timeout: Option<Duration>,
}

impl ReqwestHttpSend {
    /// Create a new ReqwestHttpSend with a reqwest::Client.
    pub fn new(client: Client) -> Self {
        Self {
            client,
            write_timeout: None,
        }
    }

    /// Build a client with connection level deadlines.
    ///
    /// - `connect`: establishing the connection.
    /// - `read`: any single read of the response.
    /// - `write`: sending the request until the response head arrives.
    pub fn with_timeouts(
        connect: Option<Duration>,
        read: Option<Duration>,
        write: Option<Duration>,
    ) -> Result<Self> {
        let mut builder = Client::builder();
        if let Some(d) = connect {
            builder = builder.connect_timeout(d);
        }
        if let Some(d) = read {
            builder = builder.read_timeout(d);
        }
        let client = builder.build().map_err(|e| {
            Error::config_invalid("failed to build reqwest client").with_source(e)
        })?;

        Ok(Self {
            client,
            write_timeout: write,
        })
    }

    /// Bound the time spent sending a request.
    pub fn with_write_timeout(mut self, timeout: Duration) -> Self {
        self.write_timeout = Some(timeout);
        self
    }
}

#[async_trait]
impl HttpSend for ReqwestHttpSend {
    async fn http_send(&self, req: http::Request<Body>) -> Result<http::Response<Bytes>> {
        let (parts, body) = req.into_parts();
        let url = parts.uri.to_string();

        let mut builder = self
            .client
            .request(parts.method, &url)
            .headers(parts.headers)
            .version(parts.version);
        if let Some(RequestTimeout(timeout)) = parts.extensions.get::<RequestTimeout>() {
            builder = builder.timeout(*timeout);
        }
        builder = match body {
            Body::Empty => builder,
            Body::Bytes(bs) => builder.body(bs),
            Body::Stream(stream) => builder.body(reqwest::Body::wrap_stream(stream)),
        };

        let send = builder.send();
        let resp = match self.write_timeout {
            None => send.await,
            Some(d) => match tokio::time::timeout(d, send).await {
                Ok(resp) => resp,
                Err(_) => {
                    return Err(Error::timeout(format!(
                        "sending request to {url} exceeded {d:?}"
                    )))
                }
            },
        }
        .map_err(|e| map_reqwest_error(&url, e))?;

        let status = resp.status();
        let version = resp.version();
        let headers = resp.headers().clone();
        let bs = resp.bytes().await.map_err(|e| map_reqwest_error(&url, e))?;
        debug!("received response {status} with {} bytes from {url}", bs.len());

        let mut out = http::Response::new(bs);
        *out.status_mut() = status;
        *out.version_mut() = version;
        *out.headers_mut() = headers;
        Ok(out)
    }
}

/// Classify a reqwest failure at the transport boundary.
fn map_reqwest_error(url: &str, err: reqwest::Error) -> Error {
    if err.is_builder() {
        return Error::request_invalid(format!("invalid request to {url}")).with_source(err);
    }
    if err.is_timeout() {
        return Error::timeout(format!("request to {url} timed out")).with_source(err);
    }

    if let Some(io_err) = find_io_error(&err) {
        let kind = match io_err.kind() {
            io::ErrorKind::BrokenPipe => Some(ErrorKind::ConnectionBroken),
            io::ErrorKind::ConnectionReset
            | io::ErrorKind::ConnectionAborted
            | io::ErrorKind::UnexpectedEof => Some(ErrorKind::ConnectionClosed),
            io::ErrorKind::Interrupted => Some(ErrorKind::ConnectCanceled),
            io::ErrorKind::TimedOut => Some(ErrorKind::Timeout),
            _ => None,
        };
        if let Some(kind) = kind {
            return Error::transport(kind, format!("connection to {url} failed"), true)
                .with_source(err);
        }
    }

    let retryable = err.is_connect() || err.is_request() || err.is_body();
    Error::transport(
        ErrorKind::Transport,
        format!("send request to {url} failed"),
        retryable,
    )
    .with_source(err)
}

fn find_io_error(err: &reqwest::Error) -> Option<&io::Error> {
    let mut source = err.source();
    while let Some(e) = source {
        if let Some(io_err) = e.downcast_ref::<io::Error>() {
            return Some(io_err);
        }
        source = e.source();
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    async fn serve_once(response: &'static str, delay: Duration) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = vec![0; 4096];
            let _ = socket.read(&mut buf).await;
            tokio::time::sleep(delay).await;
            let _ = socket.write_all(response.as_bytes()).await;
            let _ = socket.shutdown().await;
        });
        format!("http://{addr}")
    }

    #[tokio::test]
    async fn test_http_send() {
        let _ = env_logger::builder().is_test(true).try_init();

        let url = serve_once(
            "HTTP/1.1 404 Not Found\r\nx-amz-request-id: 42\r\ncontent-length: 5\r\n\r\nnope!",
            Duration::ZERO,
        )
        .await;

        let req = http::Request::put(format!("{url}/bucket/key"))
            .body(Body::Bytes(Bytes::from_static(b"payload")))
            .unwrap();
        let resp = ReqwestHttpSend::default().http_send(req).await.unwrap();
        assert_eq!(resp.status(), http::StatusCode::NOT_FOUND);
        assert_eq!(resp.headers()["x-amz-request-id"], "42");
        assert_eq!(resp.body().as_ref(), b"nope!");
    }

    #[tokio::test]
    async fn test_http_send_stream_body() {
        let url = serve_once(
            "HTTP/1.1 200 OK\r\ncontent-length: 0\r\n\r\n",
            Duration::ZERO,
        )
        .await;

        let stream = futures::stream::iter(vec![Ok(Bytes::from_static(b"a")), Ok(Bytes::from_static(b"b"))]);
        let req = http::Request::put(format!("{url}/bucket/key"))
            .header(http::header::CONTENT_LENGTH, 2)
            .body(Body::Stream(stream.boxed()))
            .unwrap();
        let resp = ReqwestHttpSend::default().http_send(req).await.unwrap();
        assert_eq!(resp.status(), http::StatusCode::OK);
    }

    #[tokio::test]
    async fn test_http_send_request_timeout() {
        let url = serve_once(
            "HTTP/1.1 200 OK\r\ncontent-length: 0\r\n\r\n",
            Duration::from_secs(5),
        )
        .await;

        let mut req = http::Request::get(format!("{url}/bucket")).body(Body::Empty).unwrap();
        req.extensions_mut()
            .insert(RequestTimeout(Duration::from_millis(100)));
        let err = ReqwestHttpSend::default().http_send(req).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Timeout);
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn test_http_send_write_timeout() {
        let url = serve_once(
            "HTTP/1.1 200 OK\r\ncontent-length: 0\r\n\r\n",
            Duration::from_secs(5),
        )
        .await;

        let http = ReqwestHttpSend::default().with_write_timeout(Duration::from_millis(100));
        let req = http::Request::get(format!("{url}/bucket")).body(Body::Empty).unwrap();
        let err = http.http_send(req).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Timeout);
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn test_http_send_connect_failure_is_retryable() {
        // Bind then drop to get a port nobody listens on.
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let req = http::Request::get(format!("http://{addr}/bucket"))
            .body(Body::Empty)
            .unwrap();
        let err = ReqwestHttpSend::default().http_send(req).await.unwrap_err();
        assert!(err.is_transport_error(), "{err:?}");
        assert!(err.is_retryable());
    }
}
