//! Streaming chat session controller
//!
//! Owns the thread id, the message log, the status, and at most one live
//! stream. Transport activity reaches the controller only as events over a
//! channel; each event runs through the pure transition function and the
//! resulting effects are applied here, one event at a time.

mod pump;

use crate::conversation::{Conversation, Turn, TurnId};
use crate::identity::ThreadId;
use crate::state_machine::{transition, Effect, Event, StreamState, TransitionError};
use crate::status::{StatusError, StatusReporter};
use crate::transport::{ChatTransport, StreamRequest};
use pump::{Pump, TransportEvent};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(120);

/// Bounds on waiting for the handshake and between frames
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamTimeouts {
    pub connect: Duration,
    pub idle: Duration,
}

impl Default for StreamTimeouts {
    fn default() -> Self {
        Self {
            connect: DEFAULT_CONNECT_TIMEOUT,
            idle: DEFAULT_IDLE_TIMEOUT,
        }
    }
}

/// What a processed transport event did, for presentation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionUpdate {
    /// Handshake accepted
    Opened,
    /// Text appended to the streaming turn
    Chunk { turn_id: TurnId, text: String },
    /// Recoverable problem with a frame; stream continues
    Notice(String),
    /// Stream ended normally
    Finished,
    /// Stream ended with an error
    Failed(StatusError),
}

impl SessionUpdate {
    fn from_effects(effects: &[Effect], state: &StreamState) -> Self {
        for effect in effects {
            match effect {
                Effect::ReportError(error) => return SessionUpdate::Failed(error.clone()),
                Effect::AppendChunk { turn_id, chunk } => {
                    return SessionUpdate::Chunk {
                        turn_id: *turn_id,
                        text: chunk.clone(),
                    }
                }
                Effect::ReportNotice(message) => return SessionUpdate::Notice(message.clone()),
                _ => {}
            }
        }
        if *state == StreamState::Closed {
            SessionUpdate::Finished
        } else {
            SessionUpdate::Opened
        }
    }
}

/// The live stream session
struct ActiveStream {
    id: u64,
    turn_id: TurnId,
    cancel: CancellationToken,
}

/// Streaming chat session controller
pub struct ChatSession<T: ChatTransport + 'static> {
    thread_id: ThreadId,
    transport: Arc<T>,
    timeouts: StreamTimeouts,
    state: StreamState,
    conversation: Conversation,
    status: StatusReporter,
    active: Option<ActiveStream>,
    next_session: u64,
    event_tx: mpsc::UnboundedSender<TransportEvent>,
    event_rx: mpsc::UnboundedReceiver<TransportEvent>,
}

impl<T: ChatTransport + 'static> ChatSession<T> {
    pub fn new(transport: T, timeouts: StreamTimeouts) -> Self {
        Self::with_shared_transport(Arc::new(transport), timeouts)
    }

    pub fn with_shared_transport(transport: Arc<T>, timeouts: StreamTimeouts) -> Self {
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let thread_id = ThreadId::create();
        tracing::info!(thread_id = %thread_id, "Chat session created");
        Self {
            thread_id,
            transport,
            timeouts,
            state: StreamState::Idle,
            conversation: Conversation::new(),
            status: StatusReporter::new(),
            active: None,
            next_session: 0,
            event_tx,
            event_rx,
        }
    }

    pub fn thread_id(&self) -> &ThreadId {
        &self.thread_id
    }

    pub fn state(&self) -> &StreamState {
        &self.state
    }

    pub fn snapshot(&self) -> &[Turn] {
        self.conversation.snapshot()
    }

    pub fn conversation(&self) -> &Conversation {
        &self.conversation
    }

    pub fn status(&self) -> &StatusReporter {
        &self.status
    }

    pub fn is_busy(&self) -> bool {
        self.status.is_busy()
    }

    pub fn current_error(&self) -> Option<&StatusError> {
        self.status.current_error()
    }

    pub fn take_notice(&mut self) -> Option<String> {
        self.status.take_notice()
    }

    /// Send a query, superseding any stream still in flight.
    ///
    /// Returns the id of the assistant turn the reply will stream into.
    /// Must be called within a tokio runtime.
    pub fn send(&mut self, query: impl Into<String>) -> Result<TurnId, TransitionError> {
        let turn_id = TurnId::new();
        self.dispatch(Event::Send {
            query: query.into(),
            turn_id,
        })?;
        Ok(turn_id)
    }

    /// Cancel the live stream, if any. Safe to call at any time, any number
    /// of times; never touches the message log.
    pub fn cancel(&mut self) {
        if let Err(e) = self.dispatch(Event::Cancel) {
            tracing::warn!(error = %e, "Cancel rejected");
        }
    }

    /// Wait for the next event of the live stream and apply it.
    ///
    /// Returns `None` when no stream is live. Cancel-safe.
    pub async fn next_update(&mut self) -> Option<SessionUpdate> {
        loop {
            let active_id = self.active.as_ref().map(|a| a.id)?;
            let TransportEvent { session, event } = self.event_rx.recv().await?;

            // Leftovers from a cancelled or superseded stream
            if session != active_id {
                tracing::trace!(session, active = active_id, "Dropping stale transport event");
                continue;
            }

            match self.dispatch(event) {
                Ok(effects) => return Some(SessionUpdate::from_effects(&effects, &self.state)),
                Err(e) => {
                    tracing::warn!(error = %e, thread_id = %self.thread_id, "Ignoring transport event");
                }
            }
        }
    }

    /// Drive the live stream until it closes or fails
    pub async fn run_to_end(&mut self) -> Vec<SessionUpdate> {
        let mut updates = Vec::new();
        while let Some(update) = self.next_update().await {
            updates.push(update);
        }
        updates
    }

    fn dispatch(&mut self, event: Event) -> Result<Vec<Effect>, TransitionError> {
        let event_name = event.name();
        let result = transition(&self.state, event)?;

        let old_state = std::mem::replace(&mut self.state, result.new_state);
        if old_state != self.state {
            tracing::debug!(
                thread_id = %self.thread_id,
                event = event_name,
                from = old_state.name(),
                to = self.state.name(),
                "Stream state changed"
            );
        }

        for effect in &result.effects {
            if !apply_local(&mut self.conversation, &mut self.status, effect) {
                self.execute_transport_effect(effect);
            }
        }

        Ok(result.effects)
    }

    fn execute_transport_effect(&mut self, effect: &Effect) {
        match effect {
            Effect::CancelStream => self.release_stream(),
            Effect::OpenStream { query } => self.open_stream(query.clone()),
            _ => {}
        }
    }

    fn open_stream(&mut self, query: String) {
        let Some(turn_id) = self.state.active_turn() else {
            tracing::warn!(state = self.state.name(), "OpenStream without an active turn");
            return;
        };

        self.next_session += 1;
        let id = self.next_session;
        let cancel = CancellationToken::new();

        tracing::info!(
            thread_id = %self.thread_id,
            turn_id = %turn_id,
            session = id,
            "Opening chat stream"
        );

        let pump = Pump {
            session: id,
            transport: Arc::clone(&self.transport),
            request: StreamRequest {
                query,
                thread_id: self.thread_id.clone(),
            },
            timeouts: self.timeouts,
            cancel: cancel.clone(),
            events: self.event_tx.clone(),
        };
        tokio::spawn(pump.run());

        self.active = Some(ActiveStream {
            id,
            turn_id,
            cancel,
        });
    }

    fn release_stream(&mut self) {
        if let Some(active) = self.active.take() {
            tracing::debug!(
                session = active.id,
                turn_id = %active.turn_id,
                "Releasing chat stream"
            );
            active.cancel.cancel();
        }
    }
}

impl<T: ChatTransport + 'static> Drop for ChatSession<T> {
    fn drop(&mut self) {
        self.release_stream();
    }
}

/// Apply an effect to the message log or status.
///
/// Returns `false` for transport effects, which the caller must execute.
pub(crate) fn apply_local(
    conversation: &mut Conversation,
    status: &mut StatusReporter,
    effect: &Effect,
) -> bool {
    match effect {
        Effect::AppendUserTurn { text } => {
            conversation.append_user(text.clone());
        }
        Effect::AppendPlaceholder { turn_id } => conversation.append_assistant_placeholder(*turn_id),
        Effect::AppendChunk { turn_id, chunk } => {
            tracing::debug!(turn_id = %turn_id, len = chunk.len(), "Appending chunk");
            conversation.append_chunk(*turn_id, chunk);
        }
        Effect::RetractTurn { turn_id } => {
            if conversation.remove_by_id(*turn_id).is_none() {
                tracing::warn!(turn_id = %turn_id, "No turn to retract");
            }
        }
        Effect::ClearStatus => status.clear(),
        Effect::SetBusy(busy) => status.set_busy(*busy),
        Effect::ReportError(error) => {
            tracing::error!(kind = error.kind.as_str(), error = %error.message, "Chat stream failed");
            status.report_error(error.clone());
        }
        Effect::ReportNotice(message) => {
            tracing::warn!(notice = %message, "Skipping unusable frame");
            status.report_notice(message.clone());
        }
        Effect::CancelStream | Effect::OpenStream { .. } => return false,
    }
    true
}
