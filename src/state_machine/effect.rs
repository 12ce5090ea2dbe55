//! Effects produced by state transitions

use crate::conversation::TurnId;
use crate::status::{ErrorKind, StatusError};

/// Effects to be executed after a state transition, in order
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Release the live transport handle, if there is one
    CancelStream,

    /// Open a new stream for `query`
    OpenStream { query: String },

    AppendUserTurn { text: String },

    AppendPlaceholder { turn_id: TurnId },

    AppendChunk { turn_id: TurnId, chunk: String },

    /// Remove the in-progress assistant turn
    RetractTurn { turn_id: TurnId },

    /// Reset current error and notice
    ClearStatus,

    SetBusy(bool),

    ReportError(StatusError),

    /// Recoverable problem, stream continues
    ReportNotice(String),
}

impl Effect {
    pub fn report_error(kind: ErrorKind, message: impl Into<String>) -> Self {
        Effect::ReportError(StatusError::new(kind, message))
    }

    /// Whether this effect touches the message log
    #[cfg(test)]
    pub fn touches_log(&self) -> bool {
        matches!(
            self,
            Effect::AppendUserTurn { .. }
                | Effect::AppendPlaceholder { .. }
                | Effect::AppendChunk { .. }
                | Effect::RetractTurn { .. }
        )
    }
}
