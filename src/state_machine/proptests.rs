//! Property-based tests for the stream state machine
//!
//! Events are replayed through `transition` and the log/status effects are
//! applied to a model of the controller, so the invariants below are checked
//! against the same code paths the session uses.

use super::*;
use crate::conversation::{Conversation, Turn, TurnId};
use crate::session::apply_local;
use crate::status::StatusReporter;
use crate::transport::ResponseMeta;
use proptest::prelude::*;

// ============================================================================
// Model
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct Model {
    state: StreamState,
    log: Conversation,
    status: StatusReporter,
}

impl Model {
    /// Apply one event; rejected events leave the model untouched
    fn apply(&mut self, event: Event) -> Option<Vec<Effect>> {
        let result = transition(&self.state, event).ok()?;
        self.state = result.new_state;
        for effect in &result.effects {
            apply_local(&mut self.log, &mut self.status, effect);
        }
        Some(result.effects)
    }

    fn replay(events: impl IntoIterator<Item = Event>) -> Self {
        let mut model = Self::default();
        for event in events {
            model.apply(event);
        }
        model
    }

    fn turns_except(&self, id: Option<TurnId>) -> Vec<Turn> {
        self.log
            .snapshot()
            .iter()
            .filter(|turn| Some(turn.id()) != id)
            .cloned()
            .collect()
    }
}

// ============================================================================
// Arbitrary Generators
// ============================================================================

fn send(query: &str) -> Event {
    Event::Send {
        query: query.to_string(),
        turn_id: TurnId::new(),
    }
}

fn context_frame(chunk: &str) -> Event {
    Event::Frame {
        raw: serde_json::json!({ "context": chunk }).to_string(),
    }
}

fn error_frame(message: &str) -> Event {
    Event::Frame {
        raw: serde_json::json!({ "error": message }).to_string(),
    }
}

fn opened() -> Event {
    Event::Opened {
        meta: ResponseMeta::event_stream(),
    }
}

fn arb_send() -> impl Strategy<Value = Event> {
    "[a-zA-Z ]{0,12}".prop_map(|query| send(&query))
}

fn arb_meta() -> impl Strategy<Value = ResponseMeta> {
    (
        prop_oneof![Just(200u16), Just(204), Just(404), Just(500)],
        prop_oneof![
            Just(None),
            Just(Some("text/event-stream")),
            Just(Some("text/event-stream; charset=utf-8")),
            Just(Some("application/json")),
        ],
    )
        .prop_map(|(status, content_type)| ResponseMeta::new(status, content_type))
}

fn arb_garbage() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("{oops".to_string()),
        Just(r#"{"context": 5}"#.to_string()),
        Just(r#"{"other":"x"}"#.to_string()),
        Just(r#"{"context":"a","error":"b"}"#.to_string()),
        Just(r#"["oops"]"#.to_string()),
        "[a-z]{0,8}",
    ]
}

fn arb_frame() -> impl Strategy<Value = Event> {
    prop_oneof![
        4 => "[a-zA-Z !]{0,10}".prop_map(|chunk| context_frame(&chunk)),
        1 => "[a-z ]{1,10}".prop_map(|message| error_frame(&message)),
        1 => arb_garbage().prop_map(|raw| Event::Frame { raw }),
    ]
}

fn arb_event() -> impl Strategy<Value = Event> {
    prop_oneof![
        2 => arb_send(),
        1 => Just(Event::Cancel),
        2 => arb_meta().prop_map(|meta| Event::Opened { meta }),
        4 => arb_frame(),
        1 => Just(Event::Closed),
        1 => "[a-z ]{1,10}".prop_map(|message| Event::TransportFailed { message }),
    ]
}

fn arb_non_send_event() -> impl Strategy<Value = Event> {
    arb_event().prop_filter("not a send", |e| !matches!(e, Event::Send { .. }))
}

fn arb_events() -> impl Strategy<Value = Vec<Event>> {
    proptest::collection::vec(arb_event(), 0..25)
}

/// A model with an accepted stream in progress
fn arb_streaming_model() -> impl Strategy<Value = Model> {
    (
        arb_events(),
        "[a-zA-Z]{1,8}",
        proptest::collection::vec("[a-z ]{0,6}", 0..4),
    )
        .prop_map(|(prefix, query, chunks)| {
            let mut model = Model::replay(prefix);
            model.apply(send(&query));
            model.apply(opened());
            for chunk in chunks {
                model.apply(context_frame(&chunk));
            }
            model
        })
}

// ============================================================================
// Property Tests
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    // Chunks land in the streaming turn in arrival order
    #[test]
    fn prop_chunks_concatenate_in_order(
        query in "[a-zA-Z]{1,10}",
        chunks in proptest::collection::vec("[a-zA-Z !]{0,8}", 0..10)
    ) {
        let mut model = Model::default();
        model.apply(send(&query));
        model.apply(opened());
        for chunk in &chunks {
            model.apply(context_frame(chunk));
        }

        let turn_id = model.state.active_turn().unwrap();
        prop_assert_eq!(model.log.get(turn_id).unwrap().text(), chunks.concat());
        prop_assert_eq!(model.log.len(), 2);
    }

    // A second cancel changes nothing, and cancel never touches the log
    #[test]
    fn prop_cancel_is_idempotent(events in arb_events()) {
        let mut model = Model::replay(events);
        let log_before = model.log.clone();

        model.apply(Event::Cancel);
        let once = model.clone();
        let effects = model.apply(Event::Cancel).unwrap();

        prop_assert_eq!(&model, &once);
        prop_assert!(effects.is_empty());
        prop_assert_eq!(&model.log, &log_before);
        prop_assert!(!model.state.is_active());
        prop_assert!(!model.status.is_busy());
    }

    // Busy is set exactly while a stream is live
    #[test]
    fn prop_busy_tracks_active_stream(events in arb_events()) {
        let mut model = Model::default();
        for event in events {
            model.apply(event);
            prop_assert_eq!(
                model.status.is_busy(),
                model.state.is_active(),
                "busy out of sync in state {:?}",
                model.state
            );
        }
    }

    // Chunk effects only ever target the live turn
    #[test]
    fn prop_chunks_target_active_turn(events in arb_events()) {
        let mut model = Model::default();
        for event in events {
            let active = model.state.active_turn();
            if let Some(effects) = model.apply(event) {
                for effect in effects {
                    if let Effect::AppendChunk { turn_id, .. } = effect {
                        prop_assert_eq!(Some(turn_id), active);
                    }
                }
            }
        }
    }

    // Only a send adds turns; other events only touch the live turn
    #[test]
    fn prop_history_is_stable(
        prefix in arb_events(),
        event in arb_non_send_event()
    ) {
        let mut model = Model::replay(prefix);
        let active = model.state.active_turn();
        let before = model.turns_except(active);

        model.apply(event);

        prop_assert_eq!(model.turns_except(active), before);
    }

    // An error frame removes exactly the placeholder, nothing earlier
    #[test]
    fn prop_error_frame_retracts_only_placeholder(
        model in arb_streaming_model(),
        message in "[a-z ]{1,10}"
    ) {
        let mut model = model;
        let turn_id = model.state.active_turn().unwrap();
        let expected = model.turns_except(Some(turn_id));

        model.apply(error_frame(&message));

        prop_assert_eq!(model.log.snapshot(), expected.as_slice());
        prop_assert!(model.log.get(turn_id).is_none());
        prop_assert_eq!(model.status.current_error().unwrap().message.as_str(), message.as_str());
    }

    // An unusable frame is reported and skipped
    #[test]
    fn prop_unrecognized_frame_leaves_log(
        model in arb_streaming_model(),
        raw in arb_garbage()
    ) {
        let mut model = model;
        let before = model.clone();

        model.apply(Event::Frame { raw });

        prop_assert_eq!(&model.log, &before.log);
        prop_assert_eq!(model.state, before.state);
        prop_assert!(model.status.notice().is_some());
        prop_assert!(model.status.current_error().is_none());
    }

    // A send always starts a fresh stream, whatever came before
    #[test]
    fn prop_send_always_connects(
        events in arb_events(),
        query in "[a-zA-Z]{1,10}"
    ) {
        let mut model = Model::replay(events);
        let len = model.log.len();

        let effects = model.apply(send(&query)).unwrap();

        prop_assert!(
            matches!(model.state, StreamState::Connecting { .. }),
            "expected connecting, got {:?}",
            model.state
        );
        prop_assert_eq!(effects.first(), Some(&Effect::CancelStream));
        prop_assert_eq!(model.log.len(), len + 2);
        prop_assert!(model.status.current_error().is_none());
    }

    // Blank queries are rejected without effect
    #[test]
    fn prop_blank_query_rejected(events in arb_events(), blank in "[ \t\n]{0,5}") {
        let mut model = Model::replay(events);
        let before = model.clone();

        prop_assert!(model.apply(send(&blank)).is_none());
        prop_assert_eq!(&model, &before);
    }
}
