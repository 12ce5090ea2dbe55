//! Busy flag and user-facing error state

use serde::Serialize;
use std::fmt;

/// Classification of a terminal stream failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Handshake rejected or response was not an event stream
    Connection,
    /// Network failure or timeout while connecting or streaming
    Transport,
    /// The backend sent an explicit `{"error": ...}` frame
    Backend,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::Connection => "connection",
            ErrorKind::Transport => "transport",
            ErrorKind::Backend => "backend",
        }
    }
}

/// Error surfaced to the user
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusError {
    pub kind: ErrorKind,
    pub message: String,
}

impl StatusError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl fmt::Display for StatusError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

/// Tracks whether a reply is in flight, the current error, and the last
/// recoverable parse notice.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatusReporter {
    busy: bool,
    current_error: Option<StatusError>,
    notice: Option<String>,
}

impl StatusReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_busy(&self) -> bool {
        self.busy
    }

    pub fn current_error(&self) -> Option<&StatusError> {
        self.current_error.as_ref()
    }

    /// Pending notice, if any, without consuming it
    pub fn notice(&self) -> Option<&str> {
        self.notice.as_deref()
    }

    /// Consume the pending notice. Notices are shown once.
    pub fn take_notice(&mut self) -> Option<String> {
        self.notice.take()
    }

    pub fn set_busy(&mut self, busy: bool) {
        self.busy = busy;
    }

    /// Reset error and notice at the start of a send
    pub fn clear(&mut self) {
        self.current_error = None;
        self.notice = None;
    }

    pub fn report_error(&mut self, error: StatusError) {
        self.current_error = Some(error);
    }

    pub fn report_notice(&mut self, message: impl Into<String>) {
        self.notice = Some(message.into());
    }
}
