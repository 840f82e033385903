use bytes::Bytes;
use futures::stream::BoxStream;
use std::fmt::{Debug, Formatter};
use std::time::Duration;

/// Body of a request handed to [`HttpSend`](crate::HttpSend).
pub enum Body {
    /// No payload.
    Empty,
    /// A fully buffered payload.
    Bytes(Bytes),
    /// A streamed payload. It can only be sent once.
    Stream(BoxStream<'static, std::io::Result<Bytes>>),
}

impl Body {
    /// Length of the payload when it is known up front.
    pub fn len(&self) -> Option<u64> {
        match self {
            Body::Empty => Some(0),
            Body::Bytes(bs) => Some(bs.len() as u64),
            Body::Stream(_) => None,
        }
    }

    /// Whether the payload is known to be empty.
    pub fn is_empty(&self) -> bool {
        self.len() == Some(0)
    }
}

impl Default for Body {
    fn default() -> Self {
        Body::Empty
    }
}

impl From<Bytes> for Body {
    fn from(bs: Bytes) -> Self {
        Body::Bytes(bs)
    }
}

impl Debug for Body {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Body::Empty => f.write_str("Empty"),
            Body::Bytes(bs) => write!(f, "Bytes({} bytes)", bs.len()),
            Body::Stream(_) => f.write_str("Stream"),
        }
    }
}

/// Deadline for a single attempt, carried in the request extensions.
///
/// It covers the whole exchange: connecting, writing the request and reading
/// the response body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestTimeout(pub Duration);
