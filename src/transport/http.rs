//! HTTP/SSE transport backed by reqwest

use super::{
    decode_frames, ChatTransport, OpenedStream, ResponseMeta, StreamRequest, TransportError,
    EVENT_STREAM_CONTENT_TYPE,
};
use async_trait::async_trait;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::Client;

const STREAM_PATH: &str = "/api/chat/stream";

/// Production transport: `POST /api/chat/stream` and decode the SSE body
pub struct HttpTransport {
    client: Client,
    endpoint: String,
}

impl HttpTransport {
    pub fn new(base_url: &str) -> Result<Self, TransportError> {
        // No overall request timeout: the body is a long-lived stream.
        // Connect and idle bounds are enforced by the session pump.
        let client = Client::builder()
            .build()
            .map_err(|e| TransportError::other(format!("Failed to create HTTP client: {e}")))?;
        Ok(Self::with_client(client, base_url))
    }

    pub fn with_client(client: Client, base_url: &str) -> Self {
        Self {
            client,
            endpoint: format!("{}{STREAM_PATH}", base_url.trim_end_matches('/')),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl ChatTransport for HttpTransport {
    async fn open(&self, request: &StreamRequest) -> Result<OpenedStream, TransportError> {
        let response = self
            .client
            .post(&self.endpoint)
            .header(ACCEPT, EVENT_STREAM_CONTENT_TYPE)
            .json(request)
            .send()
            .await?;

        let meta = ResponseMeta {
            status: response.status().as_u16(),
            content_type: response
                .headers()
                .get(CONTENT_TYPE)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string),
        };

        tracing::debug!(
            endpoint = %self.endpoint,
            status = meta.status,
            content_type = ?meta.content_type,
            "Chat stream response received"
        );

        Ok(OpenedStream {
            meta,
            frames: decode_frames(response.bytes_stream()),
        })
    }
}
