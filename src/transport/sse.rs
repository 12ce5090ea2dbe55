//! Server-Sent Events decoding
//!
//! Turns a chunked byte stream into event payloads. Only `data` fields
//! matter here; `event`, `id`, `retry` and comment lines are skipped.

use super::{FrameStream, StreamItem, TransportError};
use futures::{stream, Stream, StreamExt};

/// Incremental SSE decoder.
///
/// Bytes are buffered until a full line is available, so chunk boundaries
/// may fall anywhere, including inside a multi-byte UTF-8 sequence.
#[derive(Debug, Default)]
pub struct SseDecoder {
    buffer: Vec<u8>,
    data: Vec<String>,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a chunk and return every event payload it completes
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.buffer.extend_from_slice(chunk);

        let mut frames = Vec::new();
        while let Some(pos) = self.buffer.iter().position(|&b| b == b'\n') {
            let mut line: Vec<u8> = self.buffer.drain(..=pos).collect();
            line.pop();
            if line.last() == Some(&b'\r') {
                line.pop();
            }
            if let Some(frame) = self.process_line(&String::from_utf8_lossy(&line)) {
                frames.push(frame);
            }
        }
        frames
    }

    fn process_line(&mut self, line: &str) -> Option<String> {
        if line.is_empty() {
            return self.dispatch();
        }
        if line.starts_with(':') {
            return None;
        }

        let (field, value) = match line.split_once(':') {
            Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
            None => (line, ""),
        };
        if field == "data" {
            self.data.push(value.to_string());
        }
        None
    }

    fn dispatch(&mut self) -> Option<String> {
        if self.data.is_empty() {
            return None;
        }
        let payload = self.data.join("\n");
        self.data.clear();
        Some(payload)
    }
}

/// Decode a byte stream into a [`FrameStream`].
///
/// A non-empty chunk that completes no event yields [`StreamItem::KeepAlive`],
/// so readers can tell a quiet connection from a dead one. An event still
/// unterminated when the byte stream ends is dropped.
pub fn decode_frames<S, B, E>(bytes: S) -> FrameStream
where
    S: Stream<Item = Result<B, E>> + Send + 'static,
    B: AsRef<[u8]>,
    E: Into<TransportError>,
{
    bytes
        .scan(SseDecoder::new(), |decoder, chunk| {
            let items: Vec<Result<StreamItem, TransportError>> = match chunk {
                Ok(bytes) => {
                    let bytes = bytes.as_ref();
                    let frames = decoder.push(bytes);
                    if frames.is_empty() && !bytes.is_empty() {
                        vec![Ok(StreamItem::KeepAlive)]
                    } else {
                        frames.into_iter().map(|raw| Ok(StreamItem::Frame(raw))).collect()
                    }
                }
                Err(e) => vec![Err(e.into())],
            };
            futures::future::ready(Some(stream::iter(items)))
        })
        .flatten()
        .boxed()
}
