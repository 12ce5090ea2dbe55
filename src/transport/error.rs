//! Transport error types

use thiserror::Error;

/// Transport failure with classification
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct TransportError {
    pub kind: TransportErrorKind,
    pub message: String,
}

impl TransportError {
    pub fn new(kind: TransportErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn connect(message: impl Into<String>) -> Self {
        Self::new(TransportErrorKind::Connect, message)
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(TransportErrorKind::Timeout, message)
    }

    pub fn body(message: impl Into<String>) -> Self {
        Self::new(TransportErrorKind::Body, message)
    }

    pub fn other(message: impl Into<String>) -> Self {
        Self::new(TransportErrorKind::Other, message)
    }
}

impl From<reqwest::Error> for TransportError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            TransportError::timeout(format!("Request timeout: {e}"))
        } else if e.is_connect() {
            TransportError::connect(format!("Connection failed: {e}"))
        } else if e.is_body() || e.is_decode() {
            TransportError::body(format!("Stream interrupted: {e}"))
        } else {
            TransportError::other(format!("Request failed: {e}"))
        }
    }
}

/// Where the transport failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportErrorKind {
    /// Could not reach the server
    Connect,
    /// Connect or idle timeout expired
    Timeout,
    /// Response body broke off mid-stream
    Body,
    Other,
}
