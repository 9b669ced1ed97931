use std::collections::VecDeque;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::catalog::{DetailId, ImageId, QuizId, StyleId, TagId};
use super::scoreboard::Sentiment;

/// Identifier issued by the external session service.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub String);

/// Session-creation request sent once the catalog is ready.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionRequest {
    pub quiz_id: QuizId,
    pub selected_rooms: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InteractionType {
    Swipe,
}

/// Swipe analytics, minus the session id that is stamped on delivery.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SwipeRecord {
    pub style_id: StyleId,
    pub image_id: ImageId,
    pub style_score_change: i32,
    pub detail_score_change: i32,
    pub detail_ids: Vec<DetailId>,
    pub interaction_type: InteractionType,
    pub reaction_time_ms: i64,
    pub is_decision_change: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InteractionEvent {
    pub session_id: SessionId,
    #[serde(flatten)]
    pub swipe: SwipeRecord,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentRecord {
    pub style_image_id: ImageId,
    pub text: String,
    pub sentiment: Sentiment,
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tag_id: Option<TagId>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentEvent {
    pub session_id: SessionId,
    #[serde(flatten)]
    pub comment: CommentRecord,
}

#[derive(Debug, thiserror::Error)]
pub enum RecorderError {
    #[error("event transport unavailable: {0}")]
    Transport(String),
    #[error("event rejected: {0}")]
    Rejected(String),
}

/// Outbound analytics hooks, called inline after the engine has moved on to
/// the next card. Implementations must return promptly: anything that blocks
/// on I/O hands the event to a background task. Delivery outcome never feeds
/// back into scoring.
pub trait InteractionRecorder: Send + Sync {
    fn record_swipe(&self, event: InteractionEvent) -> Result<(), RecorderError>;
    fn record_comment(&self, event: CommentEvent) -> Result<(), RecorderError>;
}

/// External session-creation endpoint.
pub trait SessionGateway: Send + Sync {
    fn create_session(&self, request: &SessionRequest) -> Result<SessionId, RecorderError>;
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum OutboundEvent {
    Swipe(SwipeRecord),
    Comment(CommentRecord),
}

/// Holds events back until the session id resolves, then forwards them
/// best-effort. At most `limit` events wait; older ones are dropped first.
pub(crate) struct EventOutbox {
    recorder: Arc<dyn InteractionRecorder>,
    session_id: Option<SessionId>,
    pending: VecDeque<OutboundEvent>,
    limit: usize,
}

impl EventOutbox {
    pub(crate) fn new(recorder: Arc<dyn InteractionRecorder>, limit: usize) -> Self {
        Self {
            recorder,
            session_id: None,
            pending: VecDeque::new(),
            limit,
        }
    }

    pub(crate) fn session_id(&self) -> Option<&SessionId> {
        self.session_id.as_ref()
    }

    pub(crate) fn pending(&self) -> usize {
        self.pending.len()
    }

    pub(crate) fn send(&mut self, event: OutboundEvent) {
        if let Some(session_id) = &self.session_id {
            dispatch(self.recorder.as_ref(), session_id, event);
            return;
        }

        if self.limit == 0 {
            warn!("no session id yet, dropping event");
            return;
        }
        if self.pending.len() >= self.limit {
            self.pending.pop_front();
            warn!(limit = self.limit, "pending events full, dropped the oldest");
        }
        self.pending.push_back(event);
    }

    pub(crate) fn attach(&mut self, session_id: SessionId) {
        debug!(session_id = %session_id.0, queued = self.pending.len(), "flushing queued events");
        for event in std::mem::take(&mut self.pending) {
            dispatch(self.recorder.as_ref(), &session_id, event);
        }
        self.session_id = Some(session_id);
    }
}

fn dispatch(recorder: &dyn InteractionRecorder, session_id: &SessionId, event: OutboundEvent) {
    let result = match event {
        OutboundEvent::Swipe(swipe) => recorder.record_swipe(InteractionEvent {
            session_id: session_id.clone(),
            swipe,
        }),
        OutboundEvent::Comment(comment) => recorder.record_comment(CommentEvent {
            session_id: session_id.clone(),
            comment,
        }),
    };

    if let Err(err) = result {
        warn!(session_id = %session_id.0, error = %err, "dropping undeliverable event");
    }
}

/// Recorder that discards everything; used when analytics are not wired up.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullRecorder;

impl InteractionRecorder for NullRecorder {
    fn record_swipe(&self, _event: InteractionEvent) -> Result<(), RecorderError> {
        Ok(())
    }

    fn record_comment(&self, _event: CommentEvent) -> Result<(), RecorderError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Capture {
        swipes: Mutex<Vec<InteractionEvent>>,
    }

    impl InteractionRecorder for Capture {
        fn record_swipe(&self, event: InteractionEvent) -> Result<(), RecorderError> {
            self.swipes.lock().expect("capture mutex poisoned").push(event);
            Ok(())
        }

        fn record_comment(&self, _event: CommentEvent) -> Result<(), RecorderError> {
            Err(RecorderError::Transport("offline".to_string()))
        }
    }

    fn swipe(style: &str) -> SwipeRecord {
        SwipeRecord {
            style_id: StyleId(style.to_string()),
            image_id: ImageId(format!("{style}-1")),
            style_score_change: 2,
            detail_score_change: 1,
            detail_ids: vec![DetailId("oak".to_string())],
            interaction_type: InteractionType::Swipe,
            reaction_time_ms: 850,
            is_decision_change: false,
        }
    }

    #[test]
    fn queues_until_session_attaches_then_flushes_in_order() {
        let capture = Arc::new(Capture::default());
        let mut outbox = EventOutbox::new(capture.clone(), 8);

        outbox.send(OutboundEvent::Swipe(swipe("loft")));
        outbox.send(OutboundEvent::Swipe(swipe("boho")));
        assert_eq!(outbox.pending(), 2);
        assert!(capture.swipes.lock().expect("capture").is_empty());

        outbox.attach(SessionId("sess-1".to_string()));
        outbox.send(OutboundEvent::Swipe(swipe("nordic")));

        let delivered = capture.swipes.lock().expect("capture");
        let styles: Vec<&str> = delivered
            .iter()
            .map(|event| event.swipe.style_id.0.as_str())
            .collect();
        assert_eq!(styles, vec!["loft", "boho", "nordic"]);
        assert!(delivered
            .iter()
            .all(|event| event.session_id.0 == "sess-1"));
        assert_eq!(outbox.pending(), 0);
    }

    #[test]
    fn full_outbox_drops_the_oldest_events() {
        let capture = Arc::new(Capture::default());
        let mut outbox = EventOutbox::new(capture.clone(), 2);

        for style in ["loft", "boho", "nordic", "deco"] {
            outbox.send(OutboundEvent::Swipe(swipe(style)));
        }
        assert_eq!(outbox.pending(), 2);

        outbox.attach(SessionId("sess-4".to_string()));
        let delivered = capture.swipes.lock().expect("capture");
        let styles: Vec<&str> = delivered
            .iter()
            .map(|event| event.swipe.style_id.0.as_str())
            .collect();
        assert_eq!(styles, vec!["nordic", "deco"]);
    }

    #[test]
    fn delivery_failures_are_swallowed() {
        let capture = Arc::new(Capture::default());
        let mut outbox = EventOutbox::new(capture, 8);
        outbox.attach(SessionId("sess-2".to_string()));

        outbox.send(OutboundEvent::Comment(CommentRecord {
            style_image_id: ImageId("loft-1".to_string()),
            text: "love the brick".to_string(),
            sentiment: Sentiment::Positive,
            x: 10.0,
            y: 10.0,
            w: 5.0,
            h: 5.0,
            tag_id: None,
        }));

        assert_eq!(outbox.pending(), 0);
        assert_eq!(outbox.session_id(), Some(&SessionId("sess-2".to_string())));
    }

    #[test]
    fn interaction_event_serializes_flat_camel_case() {
        let event = InteractionEvent {
            session_id: SessionId("sess-3".to_string()),
            swipe: swipe("loft"),
        };

        let value = serde_json::to_value(&event).expect("serializes");
        assert_eq!(value["sessionId"], "sess-3");
        assert_eq!(value["styleId"], "loft");
        assert_eq!(value["interactionType"], "swipe");
        assert_eq!(value["reactionTimeMs"], 850);
    }
}
