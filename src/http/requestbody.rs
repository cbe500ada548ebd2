//! Request body for POST/PUT operations.

use crate::http::BoxError;
use bytes::Bytes;
use futures::stream::{Stream, StreamExt};
use http_body_util::combinators::UnsyncBoxBody;
use http_body_util::{BodyExt, Empty, Full, StreamBody};
use hyper::body::Frame;
use std::fmt;
use std::pin::Pin;

/// A lazily produced request body.
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, BoxError>> + Send>>;

/// Body type handed to hyper.
pub(crate) type WireBody = UnsyncBoxBody<Bytes, BoxError>;

/// Request body for HTTP methods that send data.
#[derive(Default)]
pub enum RequestBody {
    /// No body (GET, HEAD, DELETE).
    #[default]
    Empty,
    /// Body with raw bytes. Can be replayed on redirect or auth retry.
    Bytes(Bytes),
    /// Body produced by a stream. Consumed by the first dispatch.
    Stream(ByteStream),
}

impl fmt::Debug for RequestBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RequestBody::Empty => f.write_str("Empty"),
            RequestBody::Bytes(b) => f.debug_tuple("Bytes").field(&b.len()).finish(),
            RequestBody::Stream(_) => f.write_str("Stream(..)"),
        }
    }
}

impl From<String> for RequestBody {
    fn from(s: String) -> Self {
        RequestBody::Bytes(Bytes::from(s))
    }
}

impl From<Vec<u8>> for RequestBody {
    fn from(v: Vec<u8>) -> Self {
        RequestBody::Bytes(Bytes::from(v))
    }
}

impl From<&'static str> for RequestBody {
    fn from(s: &'static str) -> Self {
        RequestBody::Bytes(Bytes::from_static(s.as_bytes()))
    }
}

impl From<Bytes> for RequestBody {
    fn from(b: Bytes) -> Self {
        RequestBody::Bytes(b)
    }
}

impl RequestBody {
    /// Wrap a stream of byte chunks.
    pub fn from_stream<S>(stream: S) -> Self
    where
        S: Stream<Item = Result<Bytes, BoxError>> + Send + 'static,
    {
        RequestBody::Stream(Box::pin(stream))
    }

    /// Check if the body is empty.
    pub fn is_empty(&self) -> bool {
        match self {
            RequestBody::Empty => true,
            RequestBody::Bytes(b) => b.is_empty(),
            RequestBody::Stream(_) => false,
        }
    }

    /// Known length in bytes, `None` for streams.
    pub fn len(&self) -> Option<usize> {
        match self {
            RequestBody::Empty => Some(0),
            RequestBody::Bytes(b) => Some(b.len()),
            RequestBody::Stream(_) => None,
        }
    }

    /// Whether the body can be sent more than once.
    pub fn is_replayable(&self) -> bool {
        !matches!(self, RequestBody::Stream(_))
    }

    /// Copy a replayable body. Returns `None` for streams.
    pub fn try_clone(&self) -> Option<RequestBody> {
        match self {
            RequestBody::Empty => Some(RequestBody::Empty),
            RequestBody::Bytes(b) => Some(RequestBody::Bytes(b.clone())),
            RequestBody::Stream(_) => None,
        }
    }

    pub(crate) fn into_wire(self) -> WireBody {
        match self {
            RequestBody::Empty => Empty::<Bytes>::new()
                .map_err(|never| match never {})
                .boxed_unsync(),
            RequestBody::Bytes(b) => Full::new(b).map_err(|never| match never {}).boxed_unsync(),
            RequestBody::Stream(s) => StreamBody::new(s.map(|chunk| chunk.map(Frame::data)))
                .boxed_unsync(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_body() {
        let body = RequestBody::Empty;
        assert!(body.is_empty());
        assert_eq!(body.len(), Some(0));
        assert!(body.is_replayable());
    }

    #[test]
    fn test_from_string() {
        let body: RequestBody = "hello world".to_string().into();
        assert_eq!(body.len(), Some(11));
    }

    #[test]
    fn test_stream_is_not_replayable() {
        let chunks = futures::stream::iter(vec![Ok::<_, BoxError>(Bytes::from_static(b"a"))]);
        let body = RequestBody::from_stream(chunks);
        assert!(!body.is_replayable());
        assert!(body.try_clone().is_none());
        assert_eq!(body.len(), None);
        assert_eq!(format!("{:?}", body), "Stream(..)");
    }

    #[test]
    fn test_bytes_clone_shares_data() {
        let body: RequestBody = Bytes::from_static(b"raw").into();
        let copy = body.try_clone().unwrap();
        assert_eq!(copy.len(), Some(3));
    }

    #[tokio::test]
    async fn test_stream_into_wire_yields_all_chunks() {
        let chunks = futures::stream::iter(vec![
            Ok::<_, BoxError>(Bytes::from_static(b"ab")),
            Ok(Bytes::from_static(b"cd")),
        ]);
        let wire = RequestBody::from_stream(chunks).into_wire();
        let collected = wire.collect().await.unwrap().to_bytes();
        assert_eq!(&collected[..], b"abcd");
    }
}
