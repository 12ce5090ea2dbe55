//! Message log
//!
//! Ordered record of conversation turns. Append-only, except that the
//! assistant turn of the live stream grows chunk by chunk and can be
//! retracted when the backend reports an error.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Correlation key of a turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TurnId(Uuid);

impl TurnId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for TurnId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TurnId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sender {
    User,
    Assistant,
}

/// One message in the conversation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    id: TurnId,
    sender: Sender,
    text: String,
}

impl Turn {
    pub fn id(&self) -> TurnId {
        self.id
    }

    pub fn sender(&self) -> Sender {
        self.sender
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn is_assistant(&self) -> bool {
        self.sender == Sender::Assistant
    }
}

/// Ordered conversation turns
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Conversation {
    turns: Vec<Turn>,
}

impl Conversation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a user turn. User turns are never modified afterwards.
    pub fn append_user(&mut self, text: impl Into<String>) -> TurnId {
        let id = TurnId::new();
        self.turns.push(Turn {
            id,
            sender: Sender::User,
            text: text.into(),
        });
        id
    }

    /// Append the empty assistant turn that a stream will fill in
    pub fn append_assistant_placeholder(&mut self, id: TurnId) {
        self.turns.push(Turn {
            id,
            sender: Sender::Assistant,
            text: String::new(),
        });
    }

    /// Append `chunk` to the assistant turn `id`.
    ///
    /// If no such turn exists the chunk becomes a new assistant turn carrying
    /// `id`, so streamed data is never dropped.
    pub fn append_chunk(&mut self, id: TurnId, chunk: &str) {
        // The streaming turn is almost always the newest one
        match self
            .turns
            .iter_mut()
            .rev()
            .find(|turn| turn.id == id && turn.is_assistant())
        {
            Some(turn) => turn.text.push_str(chunk),
            None => {
                tracing::debug!(turn_id = %id, "No assistant turn for chunk, appending new turn");
                self.turns.push(Turn {
                    id,
                    sender: Sender::Assistant,
                    text: chunk.to_string(),
                });
            }
        }
    }

    /// Remove the turn `id`, returning it if it was present
    pub fn remove_by_id(&mut self, id: TurnId) -> Option<Turn> {
        let index = self.turns.iter().position(|turn| turn.id == id)?;
        Some(self.turns.remove(index))
    }

    /// Read-only ordered view for presentation
    pub fn snapshot(&self) -> &[Turn] {
        &self.turns
    }

    pub fn get(&self, id: TurnId) -> Option<&Turn> {
        self.turns.iter().find(|turn| turn.id == id)
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }
}
