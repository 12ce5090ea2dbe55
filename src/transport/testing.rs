//! Mock transport for testing
//!
//! Each `open` call pops the next queued script. Stream scripts are fed by
//! the test through a [`StreamFeed`], so frames arrive exactly when the
//! test says so.

use super::{
    ChatTransport, OpenedStream, ResponseMeta, StreamItem, StreamRequest, TransportError,
};
use async_trait::async_trait;
use futures::StreamExt;
use std::collections::VecDeque;
use std::sync::Mutex;
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;

type FrameResult = Result<StreamItem, TransportError>;

enum Script {
    Stream {
        meta: ResponseMeta,
        frames: mpsc::UnboundedReceiver<FrameResult>,
    },
    Fail(TransportError),
    /// `open` never returns
    Hang,
}

/// Test handle that pushes frames into a queued stream.
/// Dropping it (or calling `close`) ends the stream normally.
pub struct StreamFeed {
    tx: mpsc::UnboundedSender<FrameResult>,
}

impl StreamFeed {
    pub fn frame(&self, raw: &str) {
        let _ = self.tx.send(Ok(StreamItem::Frame(raw.to_string())));
    }

    /// Bytes that complete no event, like an SSE `: ping` comment
    pub fn keep_alive(&self) {
        let _ = self.tx.send(Ok(StreamItem::KeepAlive));
    }

    pub fn context(&self, chunk: &str) {
        self.frame(&serde_json::json!({ "context": chunk }).to_string());
    }

    pub fn error(&self, message: &str) {
        self.frame(&serde_json::json!({ "error": message }).to_string());
    }

    pub fn fail(&self, error: TransportError) {
        let _ = self.tx.send(Err(error));
    }

    pub fn close(self) {}

    /// Resolves once the consuming side has dropped the stream
    pub async fn released(&self) {
        self.tx.closed().await;
    }
}

/// Mock transport returning queued scripts
pub struct MockTransport {
    scripts: Mutex<VecDeque<Script>>,
    /// Record of all requests made
    pub requests: Mutex<Vec<StreamRequest>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self {
            scripts: Mutex::new(VecDeque::new()),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Queue a stream whose handshake returns `meta`
    pub fn queue_stream(&self, meta: ResponseMeta) -> StreamFeed {
        let (tx, frames) = mpsc::unbounded_channel();
        self.scripts
            .lock()
            .unwrap()
            .push_back(Script::Stream { meta, frames });
        StreamFeed { tx }
    }

    /// Queue an accepted event stream
    pub fn queue_event_stream(&self) -> StreamFeed {
        self.queue_stream(ResponseMeta::event_stream())
    }

    /// Queue a failure of `open` itself
    pub fn queue_error(&self, error: TransportError) {
        self.scripts.lock().unwrap().push_back(Script::Fail(error));
    }

    /// Queue an `open` that never completes
    pub fn queue_hang(&self) {
        self.scripts.lock().unwrap().push_back(Script::Hang);
    }

    pub fn recorded_requests(&self) -> Vec<StreamRequest> {
        self.requests.lock().unwrap().clone()
    }
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ChatTransport for MockTransport {
    async fn open(&self, request: &StreamRequest) -> Result<OpenedStream, TransportError> {
        self.requests.lock().unwrap().push(request.clone());
        let script = self.scripts.lock().unwrap().pop_front();
        match script {
            Some(Script::Stream { meta, frames }) => Ok(OpenedStream {
                meta,
                frames: UnboundedReceiverStream::new(frames).boxed(),
            }),
            Some(Script::Fail(error)) => Err(error),
            Some(Script::Hang) => futures::future::pending().await,
            None => Err(TransportError::connect("No mock stream queued")),
        }
    }
}
