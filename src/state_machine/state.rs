//! Stream session state

use crate::conversation::TurnId;
use crate::status::ErrorKind;
use serde::Serialize;

/// Lifecycle of the controller's stream session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamState {
    /// Nothing sent yet
    #[default]
    Idle,

    /// Request issued, waiting for the handshake response
    Connecting { turn_id: TurnId },

    /// Handshake accepted, frames are being applied to `turn_id`
    Streaming { turn_id: TurnId },

    /// Stream ended by the server or cancelled (terminal until next send)
    Closed,

    /// Stream failed (terminal until next send)
    Errored { kind: ErrorKind },
}

impl StreamState {
    /// The assistant turn the live stream writes to, if any
    pub fn active_turn(&self) -> Option<TurnId> {
        match self {
            StreamState::Connecting { turn_id } | StreamState::Streaming { turn_id } => {
                Some(*turn_id)
            }
            _ => None,
        }
    }

    /// Whether a stream session is live
    pub fn is_active(&self) -> bool {
        self.active_turn().is_some()
    }

    pub fn name(&self) -> &'static str {
        match self {
            StreamState::Idle => "idle",
            StreamState::Connecting { .. } => "connecting",
            StreamState::Streaming { .. } => "streaming",
            StreamState::Closed => "closed",
            StreamState::Errored { .. } => "errored",
        }
    }
}
