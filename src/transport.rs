//! Stream transport abstraction
//!
//! The controller only sees this seam: open a stream, get the handshake
//! metadata, then pull decoded event payloads until the stream ends.

mod error;
mod http;
mod sse;

#[cfg(test)]
pub mod testing;

pub use error::{TransportError, TransportErrorKind};
pub use http::HttpTransport;
pub use sse::{decode_frames, SseDecoder};

use crate::identity::ThreadId;
use async_trait::async_trait;
use futures::stream::BoxStream;
use serde::Serialize;

pub const EVENT_STREAM_CONTENT_TYPE: &str = "text/event-stream";

/// Body of a chat stream request
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StreamRequest {
    pub query: String,
    pub thread_id: ThreadId,
}

/// Handshake metadata of a stream response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseMeta {
    pub status: u16,
    pub content_type: Option<String>,
}

impl ResponseMeta {
    pub fn new(status: u16, content_type: Option<&str>) -> Self {
        Self {
            status,
            content_type: content_type.map(str::to_string),
        }
    }

    /// A successful event-stream handshake
    pub fn event_stream() -> Self {
        Self::new(200, Some(EVENT_STREAM_CONTENT_TYPE))
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Whether the stream can be consumed: 2xx and an event-stream body
    pub fn is_event_stream(&self) -> bool {
        self.is_success()
            && self.content_type.as_deref().is_some_and(|ct| {
                ct.to_ascii_lowercase().contains(EVENT_STREAM_CONTENT_TYPE)
            })
    }
}

/// One item of an open stream
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamItem {
    /// A decoded event payload
    Frame(String),
    /// Bytes arrived but completed no event (keepalive comments, partial lines)
    KeepAlive,
}

impl StreamItem {
    pub fn into_frame(self) -> Option<String> {
        match self {
            StreamItem::Frame(raw) => Some(raw),
            StreamItem::KeepAlive => None,
        }
    }
}

/// Stream items in arrival order. Ends when the server closes.
pub type FrameStream = BoxStream<'static, Result<StreamItem, TransportError>>;

/// An opened stream: handshake metadata plus its frames
pub struct OpenedStream {
    pub meta: ResponseMeta,
    pub frames: FrameStream,
}

impl std::fmt::Debug for OpenedStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenedStream")
            .field("meta", &self.meta)
            .finish_non_exhaustive()
    }
}

/// Opens chat streams
#[async_trait]
pub trait ChatTransport: Send + Sync {
    /// Issue the request and return once the response headers arrive
    async fn open(&self, request: &StreamRequest) -> Result<OpenedStream, TransportError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_stream_detection() {
        assert!(ResponseMeta::event_stream().is_event_stream());
        assert!(ResponseMeta::new(200, Some("text/event-stream; charset=utf-8")).is_event_stream());
        assert!(ResponseMeta::new(204, Some("Text/Event-Stream")).is_event_stream());

        assert!(!ResponseMeta::new(200, Some("application/json")).is_event_stream());
        assert!(!ResponseMeta::new(200, None).is_event_stream());
        assert!(!ResponseMeta::new(502, Some("text/event-stream")).is_event_stream());
    }

    #[test]
    fn test_request_body_shape() {
        let request = StreamRequest {
            query: "Hello".to_string(),
            thread_id: serde_json::from_str("\"thread_1_abc\"").unwrap(),
        };
        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            serde_json::json!({ "query": "Hello", "thread_id": "thread_1_abc" })
        );
    }
}
