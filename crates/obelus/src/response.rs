// File: src/response.rs
// Purpose: Response head + streamed body handed back to the host

use std::convert::Infallible;

use axum::body::{Body, Bytes};
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;
use tokio_stream::StreamExt;

use crate::error::ResponseError;

/// A response produced by the dispatch loop. Headers are final once this
/// exists; the body keeps streaming until every writer is dropped.
#[derive(Debug)]
pub struct Response {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: ResponseBody,
}

impl Response {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|value| value.to_str().ok())
    }

    /// Waits for the whole body. Mostly useful in tests and for static
    /// generation.
    pub async fn text(self) -> String {
        String::from_utf8_lossy(&self.body.collect().await).into_owned()
    }
}

/// Streamed response body.
#[derive(Debug)]
pub struct ResponseBody {
    rx: mpsc::UnboundedReceiver<Bytes>,
}

impl ResponseBody {
    /// Creates a connected body and writer pair.
    pub(crate) fn channel() -> (ResponseWriter, ResponseBody) {
        let (tx, rx) = mpsc::unbounded_channel();
        (ResponseWriter { tx }, ResponseBody { rx })
    }

    pub async fn collect(mut self) -> Bytes {
        let mut buffer = Vec::new();
        while let Some(chunk) = self.rx.recv().await {
            buffer.extend_from_slice(&chunk);
        }
        Bytes::from(buffer)
    }

    pub fn into_stream(self) -> UnboundedReceiverStream<Bytes> {
        UnboundedReceiverStream::new(self.rx)
    }
}

/// Write half of a response body.
#[derive(Debug, Clone)]
pub struct ResponseWriter {
    tx: mpsc::UnboundedSender<Bytes>,
}

impl ResponseWriter {
    pub fn write(&self, chunk: impl Into<Bytes>) -> Result<(), ResponseError> {
        let chunk = chunk.into();
        if chunk.is_empty() {
            return Ok(());
        }
        self.tx.send(chunk).map_err(|_| ResponseError::Closed)
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }

    /// Ends the body.
    pub fn close(self) {}
}

impl IntoResponse for Response {
    fn into_response(self) -> axum::response::Response {
        let stream = self.body.into_stream().map(Ok::<_, Infallible>);
        let mut response = Body::from_stream(stream).into_response();
        *response.status_mut() = self.status;
        *response.headers_mut() = self.headers;
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_body_ends_when_writers_drop() {
        let (writer, body) = ResponseBody::channel();
        let second = writer.clone();
        writer.write("hello ").unwrap();
        second.write(Bytes::from_static(b"world")).unwrap();
        writer.close();
        drop(second);

        assert_eq!(body.collect().await, Bytes::from_static(b"hello world"));
    }

    #[tokio::test]
    async fn test_write_after_receiver_dropped() {
        let (writer, body) = ResponseBody::channel();
        drop(body);
        assert!(writer.is_closed());
        assert!(matches!(writer.write("late"), Err(ResponseError::Closed)));
    }
}
