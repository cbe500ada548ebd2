//! Response body, either buffered or streaming from a pooled connection.

use crate::base::neterror::NetError;
use crate::socket::pool::PooledBody;
use bytes::{Bytes, BytesMut};
use http_body_util::BodyExt;

/// Response body.
///
/// A streaming body holds its connection until it is read to the end (the
/// connection goes back to the pool), closed, or dropped (the connection is
/// discarded).
#[derive(Debug)]
pub enum ResponseBody {
    /// Fully read into memory. Can be read repeatedly.
    Buffered(Bytes),
    /// Lazily read from the connection. Single consumption.
    Streaming(PooledBody),
    /// Streamed out chunk by chunk, or closed before completion.
    Consumed,
}

impl ResponseBody {
    pub fn is_buffered(&self) -> bool {
        matches!(self, ResponseBody::Buffered(_))
    }

    /// Read the whole body, buffering it for later reads.
    pub async fn read(&mut self) -> Result<Bytes, NetError> {
        match self {
            ResponseBody::Buffered(bytes) => Ok(bytes.clone()),
            ResponseBody::Consumed => Err(NetError::BodyConsumed),
            ResponseBody::Streaming(body) => {
                let mut buf = BytesMut::new();
                while let Some(frame) = body.frame().await {
                    if let Ok(data) = frame?.into_data() {
                        buf.extend_from_slice(&data);
                    }
                }
                let bytes = buf.freeze();
                *self = ResponseBody::Buffered(bytes.clone());
                Ok(bytes)
            }
        }
    }

    /// Next chunk of a streaming body. A buffered body yields itself once.
    pub async fn chunk(&mut self) -> Option<Result<Bytes, NetError>> {
        match self {
            ResponseBody::Consumed => None,
            ResponseBody::Buffered(_) => {
                match std::mem::replace(self, ResponseBody::Consumed) {
                    ResponseBody::Buffered(bytes) if !bytes.is_empty() => Some(Ok(bytes)),
                    _ => None,
                }
            }
            ResponseBody::Streaming(body) => loop {
                match body.frame().await {
                    None => {
                        *self = ResponseBody::Consumed;
                        return None;
                    }
                    Some(Err(e)) => {
                        *self = ResponseBody::Consumed;
                        return Some(Err(e));
                    }
                    Some(Ok(frame)) => {
                        // Trailers are skipped.
                        if let Ok(data) = frame.into_data() {
                            return Some(Ok(data));
                        }
                    }
                }
            },
        }
    }

    /// Stop reading. An unfinished stream discards its connection.
    pub fn close(&mut self) {
        if let ResponseBody::Streaming(_) = self {
            *self = ResponseBody::Consumed;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_buffered_read_is_repeatable() {
        let mut body = ResponseBody::Buffered(Bytes::from_static(b"hello"));
        assert_eq!(body.read().await.unwrap(), "hello");
        assert_eq!(body.read().await.unwrap(), "hello");
        body.close();
        assert!(body.is_buffered());
    }

    #[tokio::test]
    async fn test_buffered_chunk_yields_once() {
        let mut body = ResponseBody::Buffered(Bytes::from_static(b"abc"));
        assert_eq!(body.chunk().await.unwrap().unwrap(), "abc");
        assert!(body.chunk().await.is_none());
        assert!(matches!(body.read().await, Err(NetError::BodyConsumed)));
    }

    #[tokio::test]
    async fn test_empty_buffered_chunk_is_none() {
        let mut body = ResponseBody::Buffered(Bytes::new());
        assert!(body.chunk().await.is_none());
    }
}
