//! Stream pump
//!
//! Runs in its own task for one stream session: opens the transport,
//! forwards handshake, frames, and termination as state machine events,
//! and stops as soon as the session's cancellation token fires.

use super::StreamTimeouts;
use crate::state_machine::Event;
use crate::transport::{ChatTransport, StreamItem, StreamRequest, TransportError};
use futures::StreamExt;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// An event tagged with the stream session that produced it
#[derive(Debug)]
pub(super) struct TransportEvent {
    pub session: u64,
    pub event: Event,
}

pub(super) struct Pump<T: ChatTransport + ?Sized> {
    pub session: u64,
    pub transport: Arc<T>,
    pub request: StreamRequest,
    pub timeouts: StreamTimeouts,
    pub cancel: CancellationToken,
    pub events: mpsc::UnboundedSender<TransportEvent>,
}

impl<T: ChatTransport + ?Sized> Pump<T> {
    fn emit(&self, event: Event) -> bool {
        self.events
            .send(TransportEvent {
                session: self.session,
                event,
            })
            .is_ok()
    }

    pub async fn run(self) {
        let opened = tokio::select! {
            biased;
            () = self.cancel.cancelled() => return,
            result = tokio::time::timeout(self.timeouts.connect, self.transport.open(&self.request)) => result,
        };

        let mut frames = match opened {
            Ok(Ok(opened)) => {
                let accepted = opened.meta.is_event_stream();
                if !self.emit(Event::Opened { meta: opened.meta }) || !accepted {
                    return;
                }
                opened.frames
            }
            Ok(Err(e)) => {
                self.emit(Event::TransportFailed {
                    message: e.to_string(),
                });
                return;
            }
            Err(_) => {
                let error = TransportError::timeout(format!(
                    "Connection timed out after {:?}",
                    self.timeouts.connect
                ));
                self.emit(Event::TransportFailed {
                    message: error.to_string(),
                });
                return;
            }
        };

        loop {
            let next = tokio::select! {
                biased;
                () = self.cancel.cancelled() => return,
                next = tokio::time::timeout(self.timeouts.idle, frames.next()) => next,
            };

            let keep_going = match next {
                Ok(Some(Ok(StreamItem::KeepAlive))) => {
                    tracing::trace!(session = self.session, "Keepalive received");
                    true
                }
                Ok(Some(Ok(StreamItem::Frame(raw)))) => {
                    tracing::debug!(session = self.session, len = raw.len(), "Frame received");
                    self.emit(Event::Frame { raw })
                }
                Ok(Some(Err(e))) => {
                    self.emit(Event::TransportFailed {
                        message: e.to_string(),
                    });
                    false
                }
                Ok(None) => {
                    tracing::info!(session = self.session, "Chat stream closed by server");
                    self.emit(Event::Closed);
                    false
                }
                Err(_) => {
                    let error = TransportError::timeout(format!(
                        "No data received for {:?}",
                        self.timeouts.idle
                    ));
                    self.emit(Event::TransportFailed {
                        message: error.to_string(),
                    });
                    false
                }
            };

            if !keep_going {
                return;
            }
        }
    }
}
