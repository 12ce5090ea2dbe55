//! Events that drive the stream state machine

use crate::conversation::TurnId;
use crate::transport::ResponseMeta;

/// Events that trigger state transitions
#[derive(Debug, Clone)]
pub enum Event {
    // User events
    Send {
        query: String,
        /// Id for the new assistant placeholder
        turn_id: TurnId,
    },
    Cancel,

    // Transport events
    Opened {
        meta: ResponseMeta,
    },
    Frame {
        raw: String,
    },
    Closed,
    TransportFailed {
        message: String,
    },
}

impl Event {
    pub fn name(&self) -> &'static str {
        match self {
            Event::Send { .. } => "send",
            Event::Cancel => "cancel",
            Event::Opened { .. } => "opened",
            Event::Frame { .. } => "frame",
            Event::Closed => "closed",
            Event::TransportFailed { .. } => "transport_failed",
        }
    }
}
