//! Pure state transition function
//!
//! Every transport callback and user action is an [`Event`]; the function
//! below is the complete transition table. It performs no I/O; the
//! controller executes the returned effects in order.

use super::{Effect, Event, StreamState};
use crate::frame::Frame;
use crate::status::ErrorKind;
use thiserror::Error;

/// Result of a state transition
#[derive(Debug)]
pub struct TransitionResult {
    pub new_state: StreamState,
    pub effects: Vec<Effect>,
}

impl TransitionResult {
    pub fn new(state: StreamState) -> Self {
        Self {
            new_state: state,
            effects: vec![],
        }
    }

    pub fn with_effect(mut self, effect: Effect) -> Self {
        self.effects.push(effect);
        self
    }

    pub fn with_effects(mut self, effects: impl IntoIterator<Item = Effect>) -> Self {
        self.effects.extend(effects);
        self
    }
}

/// Errors that can occur during transition
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TransitionError {
    #[error("Query must not be empty")]
    EmptyQuery,
    #[error("Invalid transition: {0}")]
    InvalidTransition(String),
}

/// Pure transition function: same inputs, same outputs, no side effects
pub fn transition(state: &StreamState, event: Event) -> Result<TransitionResult, TransitionError> {
    match (state, event) {
        // ============================================================
        // Send
        // ============================================================
        (_, Event::Send { query, .. }) if query.trim().is_empty() => {
            Err(TransitionError::EmptyQuery)
        }

        // Any prior stream is cancelled first, so at most one is ever live
        (_, Event::Send { query, turn_id }) => {
            Ok(TransitionResult::new(StreamState::Connecting { turn_id }).with_effects([
                Effect::CancelStream,
                Effect::ClearStatus,
                Effect::AppendUserTurn {
                    text: query.clone(),
                },
                Effect::AppendPlaceholder { turn_id },
                Effect::OpenStream { query },
                Effect::SetBusy(true),
            ]))
        }

        // ============================================================
        // Handshake
        // ============================================================
        (StreamState::Connecting { turn_id }, Event::Opened { meta }) => {
            if meta.is_event_stream() {
                Ok(TransitionResult::new(StreamState::Streaming { turn_id: *turn_id }))
            } else {
                let message = format!(
                    "Failed to connect. Status: {}, Content-Type: {}",
                    meta.status,
                    meta.content_type.as_deref().unwrap_or("none")
                );
                Ok(fail(ErrorKind::Connection, message))
            }
        }

        // ============================================================
        // Frames
        // ============================================================
        (StreamState::Streaming { turn_id }, Event::Frame { raw }) => {
            let turn_id = *turn_id;
            match Frame::parse(&raw) {
                Frame::Context(chunk) => {
                    Ok(TransitionResult::new(StreamState::Streaming { turn_id })
                        .with_effect(Effect::AppendChunk { turn_id, chunk }))
                }
                // The only path that removes a turn, and only the live one
                Frame::Error(message) => Ok(TransitionResult::new(StreamState::Errored {
                    kind: ErrorKind::Backend,
                })
                .with_effects([
                    Effect::report_error(ErrorKind::Backend, message),
                    Effect::RetractTurn { turn_id },
                    Effect::CancelStream,
                    Effect::SetBusy(false),
                ])),
                Frame::Unrecognized(reason) => {
                    Ok(TransitionResult::new(StreamState::Streaming { turn_id })
                        .with_effect(Effect::ReportNotice(reason)))
                }
            }
        }

        // ============================================================
        // Termination
        // ============================================================
        // A clean finish and a dropped connection look the same here
        (StreamState::Streaming { .. }, Event::Closed) => {
            Ok(TransitionResult::new(StreamState::Closed)
                .with_effects([Effect::CancelStream, Effect::SetBusy(false)]))
        }

        (
            StreamState::Connecting { .. } | StreamState::Streaming { .. },
            Event::TransportFailed { message },
        ) => Ok(fail(ErrorKind::Transport, message)),

        // ============================================================
        // Cancellation
        // ============================================================
        (StreamState::Connecting { .. } | StreamState::Streaming { .. }, Event::Cancel) => {
            Ok(TransitionResult::new(StreamState::Closed)
                .with_effects([Effect::CancelStream, Effect::SetBusy(false)]))
        }

        // Nothing live: cancel is a no-op
        (_, Event::Cancel) => Ok(TransitionResult::new(*state)),

        (state, event) => Err(TransitionError::InvalidTransition(format!(
            "{} in state {}",
            event.name(),
            state.name()
        ))),
    }
}

/// Terminal failure that keeps the placeholder turn in place
fn fail(kind: ErrorKind, message: String) -> TransitionResult {
    TransitionResult::new(StreamState::Errored { kind }).with_effects([
        Effect::CancelStream,
        Effect::report_error(kind, message),
        Effect::SetBusy(false),
    ])
}
