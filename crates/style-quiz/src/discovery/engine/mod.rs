//! Swipe-driven discovery round.
//!
//! [`SwipeEngine`] owns every piece of mutable session state (scoreboard,
//! rejections, deck cursor, escalation counters) and is the only component a
//! presentation layer talks to. All scoring is synchronous; outbound analytics
//! go through a best-effort outbox that never feeds back into local state.

mod clock;
mod handle;

pub use clock::{Clock, ManualClock, SystemClock};
pub use handle::SessionHandle;

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::catalog::{
    Catalog, CatalogError, CatalogSource, DetailId, ImageId, QuizId, Region, RoomFilter, StyleId,
    Tag, TagId,
};
use super::deck::{Card, Chooser, DeckComposer, DeckComposition, DeckRequest, RandomChooser};
use super::escalation::{EscalationMonitor, EscalationSignal};
use super::recorder::{
    CommentRecord, EventOutbox, InteractionRecorder, InteractionType, OutboundEvent, SessionId,
    SessionRequest, SwipeRecord,
};
use super::report::{self, SessionSummary};
use super::scoreboard::{Scoreboard, Sentiment};
use super::settings::EngineSettings;
use super::stop::{FinishReason, StopConditionEvaluator};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "reason", rename_all = "snake_case")]
pub enum EnginePhase {
    Loading,
    Active,
    Finished(FinishReason),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Left,
    Right,
}

impl Direction {
    pub const fn is_like(self) -> bool {
        matches!(self, Self::Right)
    }
}

/// Why a request was dropped without touching state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IgnoreReason {
    NotStarted,
    Finished,
    Busy,
    NoCurrentCard,
}

/// Terminal snapshot handed to the presentation layer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FinishSnapshot {
    pub reason: FinishReason,
    pub final_scores: BTreeMap<StyleId, i32>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SwipeReport {
    pub style_id: StyleId,
    pub liked: bool,
    pub total_swipes: u32,
    pub next_card: Option<Card>,
    pub signals: Vec<EscalationSignal>,
    pub finished: Option<FinishSnapshot>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SwipeOutcome {
    Ignored { reason: IgnoreReason },
    Recorded(SwipeReport),
}

impl SwipeOutcome {
    fn ignored(reason: IgnoreReason) -> Self {
        Self::Ignored { reason }
    }

    pub fn report(&self) -> Option<&SwipeReport> {
        match self {
            Self::Recorded(report) => Some(report),
            Self::Ignored { .. } => None,
        }
    }
}

/// Where a comment points: a tag, or a raw click on the current image.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CommentTarget {
    #[serde(default)]
    pub tag_id: Option<TagId>,
    #[serde(default)]
    pub x: f32,
    #[serde(default)]
    pub y: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CommentOutcome {
    Ignored {
        reason: IgnoreReason,
    },
    Recorded {
        detail_id: Option<DetailId>,
        score_change: i32,
    },
}

/// Read-only copy of the session record.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionView {
    pub session_id: Option<SessionId>,
    pub quiz_id: QuizId,
    pub rejected_style_ids: BTreeSet<StyleId>,
    pub user_preference_text: String,
    pub total_swipes: u32,
    pub consecutive_dislikes: u32,
    pub decision_changes: BTreeMap<StyleId, u32>,
    pub finish_reason: Option<FinishReason>,
    pub pool_expanded: bool,
    pub queued_events: usize,
}

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("catalog unavailable: {0}")]
    Catalog(#[from] CatalogError),
    #[error("discovery round already started")]
    AlreadyStarted,
}

struct Round {
    quiz_id: QuizId,
    catalog: Arc<Catalog>,
    rooms: RoomFilter,
    scoreboard: Scoreboard,
    monitor: EscalationMonitor,
    rejected: BTreeSet<StyleId>,
    preference_text: String,
    total_swipes: u32,
    decision_changes: BTreeMap<StyleId, u32>,
    reaction_times: Vec<i64>,
    deck: Vec<Card>,
    cursor: usize,
    decks_composed: u32,
    card_shown_at: DateTime<Utc>,
    finish: Option<FinishSnapshot>,
}

impl Round {
    fn current_card(&self) -> Option<&Card> {
        self.deck.get(self.cursor)
    }

    fn refill(&mut self, composer: &DeckComposer, chooser: &mut dyn Chooser) -> bool {
        let request = DeckRequest {
            catalog: &self.catalog,
            scoreboard: &self.scoreboard,
            rejected: &self.rejected,
            pool_expanded: self.monitor.pool_expanded(),
            preference_text: &self.preference_text,
            rooms: &self.rooms,
        };

        match composer.compose_next(&request, chooser) {
            DeckComposition::Cards(cards) => {
                debug!(cards = cards.len(), "composed next deck");
                self.deck = cards;
                self.cursor = 0;
                self.decks_composed += 1;
                true
            }
            DeckComposition::Exhausted => false,
        }
    }

    fn conclude(&mut self, reason: FinishReason) -> FinishSnapshot {
        let snapshot = FinishSnapshot {
            reason,
            final_scores: self.scoreboard.final_scores(),
        };
        self.finish = Some(snapshot.clone());
        snapshot
    }

    /// Tags are only resolved against the image on screen.
    fn resolve_tag(&self, tag_id: &TagId) -> Option<(ImageId, Tag)> {
        self.current_card().and_then(|card| {
            card.image
                .tags
                .iter()
                .find(|tag| &tag.id == tag_id)
                .map(|tag| (card.image.id.clone(), tag.clone()))
        })
    }
}

/// Single-owner orchestrator for one elicitation round.
pub struct SwipeEngine {
    settings: EngineSettings,
    composer: DeckComposer,
    evaluator: StopConditionEvaluator,
    chooser: Box<dyn Chooser>,
    clock: Arc<dyn Clock>,
    outbox: EventOutbox,
    phase: EnginePhase,
    round: Option<Round>,
}

impl SwipeEngine {
    pub fn new(settings: EngineSettings, recorder: Arc<dyn InteractionRecorder>) -> Self {
        Self {
            settings,
            composer: DeckComposer::new(settings.deck),
            evaluator: StopConditionEvaluator::new(settings.stop),
            chooser: Box::new(RandomChooser::from_entropy()),
            clock: Arc::new(SystemClock),
            outbox: EventOutbox::new(recorder, settings.pending_event_limit),
            phase: EnginePhase::Loading,
            round: None,
        }
    }

    pub fn with_chooser(mut self, chooser: Box<dyn Chooser>) -> Self {
        self.chooser = chooser;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    /// Fetches the catalog and builds the initial deck. The returned request is
    /// what the caller sends to the session service; its answer comes back via
    /// [`SwipeEngine::attach_session`].
    pub fn start(
        &mut self,
        quiz_id: QuizId,
        rooms: RoomFilter,
        source: &dyn CatalogSource,
    ) -> Result<SessionRequest, EngineError> {
        if self.round.is_some() {
            return Err(EngineError::AlreadyStarted);
        }
        let catalog = source.fetch(&quiz_id)?;
        self.load(quiz_id, rooms, catalog)
    }

    /// Same as [`SwipeEngine::start`] with a catalog already in hand.
    pub fn load(
        &mut self,
        quiz_id: QuizId,
        rooms: RoomFilter,
        catalog: Catalog,
    ) -> Result<SessionRequest, EngineError> {
        if self.round.is_some() {
            return Err(EngineError::AlreadyStarted);
        }

        let catalog = Arc::new(catalog);
        let deck = self
            .composer
            .compose_initial(&catalog, &rooms, self.chooser.as_mut());
        let request = SessionRequest {
            quiz_id: quiz_id.clone(),
            selected_rooms: rooms.rooms(),
        };

        let mut round = Round {
            quiz_id,
            scoreboard: Scoreboard::for_catalog(&catalog, self.settings.weights),
            monitor: EscalationMonitor::new(self.settings.escalation),
            catalog,
            rooms,
            rejected: BTreeSet::new(),
            preference_text: String::new(),
            total_swipes: 0,
            decision_changes: BTreeMap::new(),
            reaction_times: Vec::new(),
            deck,
            cursor: 0,
            decks_composed: 1,
            card_shown_at: self.clock.now(),
            finish: None,
        };

        info!(
            quiz_id = %round.quiz_id.0,
            styles = round.catalog.total_styles(),
            initial_cards = round.deck.len(),
            "discovery round started"
        );

        self.phase = EnginePhase::Active;
        if round.deck.is_empty() && !round.refill(&self.composer, self.chooser.as_mut()) {
            let snapshot = round.conclude(FinishReason::ConditionMet);
            info!(reason = ?snapshot.reason, "nothing to show, round finished");
            self.phase = EnginePhase::Finished(snapshot.reason);
        }
        self.round = Some(round);

        Ok(request)
    }

    pub fn attach_session(&mut self, session_id: SessionId) {
        info!(session_id = %session_id.0, "session id resolved");
        self.outbox.attach(session_id);
    }

    pub fn swipe(&mut self, direction: Direction) -> SwipeOutcome {
        self.apply_swipe(direction.is_like())
    }

    /// Rules out the current card's style for the rest of the round and counts
    /// the card as a dislike.
    pub fn reject_current_style(&mut self) -> SwipeOutcome {
        if let Some(reason) = self.gate() {
            return SwipeOutcome::ignored(reason);
        }
        let Some(round) = self.round.as_mut() else {
            return SwipeOutcome::ignored(IgnoreReason::NotStarted);
        };
        let Some(card) = round.current_card() else {
            return SwipeOutcome::ignored(IgnoreReason::NoCurrentCard);
        };

        let style_id = card.style_id.clone();
        info!(style_id = %style_id.0, "style rejected");
        round.rejected.insert(style_id);

        let mut outcome = self.apply_swipe(false);
        if let (SwipeOutcome::Recorded(report), Some(round)) = (&mut outcome, self.round.as_mut())
        {
            if report.finished.is_none() {
                let signal = round
                    .monitor
                    .on_style_rejected(round.rejected.len(), round.catalog.total_styles());
                report.signals.extend(signal);
            }
        }
        outcome
    }

    pub fn comment(
        &mut self,
        target: CommentTarget,
        text: String,
        sentiment: Sentiment,
    ) -> CommentOutcome {
        if let Some(reason) = self.gate() {
            return CommentOutcome::Ignored { reason };
        }
        let Some(round) = self.round.as_mut() else {
            return CommentOutcome::Ignored {
                reason: IgnoreReason::NotStarted,
            };
        };
        let Some(card) = round.current_card() else {
            return CommentOutcome::Ignored {
                reason: IgnoreReason::NoCurrentCard,
            };
        };
        let card_image = card.image.id.clone();

        let resolved = target.tag_id.as_ref().and_then(|id| {
            let found = round.resolve_tag(id);
            if found.is_none() {
                debug!(tag_id = %id.0, "comment tag not on current card, keeping click point");
            }
            found
        });

        let (image_id, detail_id, tag_id, region) = match resolved {
            Some((image_id, tag)) => (image_id, Some(tag.detail), Some(tag.id), tag.region),
            None => (
                card_image,
                None,
                None,
                Region {
                    x: target.x,
                    y: target.y,
                    width: self.settings.comment_region.width,
                    height: self.settings.comment_region.height,
                },
            ),
        };

        let score_change = round.scoreboard.record_comment(detail_id.as_ref(), sentiment);
        self.outbox.send(OutboundEvent::Comment(CommentRecord {
            style_image_id: image_id,
            text,
            sentiment,
            x: region.x,
            y: region.y,
            w: region.width,
            h: region.height,
            tag_id,
        }));

        CommentOutcome::Recorded {
            detail_id,
            score_change,
        }
    }

    /// Appends free text collected after an escalation prompt. Returns false
    /// when no round is active.
    pub fn provide_preferences(&mut self, text: &str) -> bool {
        if self.phase != EnginePhase::Active {
            return false;
        }
        let Some(round) = self.round.as_mut() else {
            return false;
        };

        let text = text.trim();
        if text.is_empty() {
            return true;
        }
        if !round.preference_text.is_empty() {
            round.preference_text.push(' ');
        }
        round.preference_text.push_str(text);
        true
    }

    fn gate(&self) -> Option<IgnoreReason> {
        match self.phase {
            EnginePhase::Loading => Some(IgnoreReason::NotStarted),
            EnginePhase::Finished(_) => Some(IgnoreReason::Finished),
            EnginePhase::Active => None,
        }
    }

    fn apply_swipe(&mut self, liked: bool) -> SwipeOutcome {
        if let Some(reason) = self.gate() {
            return SwipeOutcome::ignored(reason);
        }
        let Some(round) = self.round.as_mut() else {
            return SwipeOutcome::ignored(IgnoreReason::NotStarted);
        };
        let Some(card) = round.current_card().cloned() else {
            return SwipeOutcome::ignored(IgnoreReason::NoCurrentCard);
        };

        let now = self.clock.now();
        let reaction_time_ms = (now - round.card_shown_at).num_milliseconds().max(0);
        let is_decision_change = round.scoreboard.shown_count(&card.style_id) > 0;
        let detail_ids = card.image.detail_ids();

        let delta = round
            .scoreboard
            .record_swipe(&card.style_id, &detail_ids, liked);
        round
            .scoreboard
            .mark_shown(&card.style_id, &card.image.id);
        round.total_swipes += 1;
        round.reaction_times.push(reaction_time_ms);
        if is_decision_change {
            *round
                .decision_changes
                .entry(card.style_id.clone())
                .or_insert(0) += 1;
        }

        let signals: Vec<EscalationSignal> = round.monitor.on_swipe(liked).into_iter().collect();
        round.cursor += 1;
        round.card_shown_at = now;

        // dispatched after the advance; delivery never gates the next card
        self.outbox.send(OutboundEvent::Swipe(SwipeRecord {
            style_id: card.style_id.clone(),
            image_id: card.image.id.clone(),
            style_score_change: delta.style_change,
            detail_score_change: delta.detail_change,
            detail_ids,
            interaction_type: InteractionType::Swipe,
            reaction_time_ms,
            is_decision_change,
        }));

        let mut finish = self
            .evaluator
            .evaluate(&round.scoreboard, round.total_swipes);
        if finish.is_none() && round.catalog.active_styles(&round.rejected).is_empty() {
            finish = Some(FinishReason::ConditionMet);
        }
        if finish.is_none()
            && round.cursor >= round.deck.len()
            && !round.refill(&self.composer, self.chooser.as_mut())
        {
            finish = Some(FinishReason::ConditionMet);
        }

        let finished = finish.map(|reason| round.conclude(reason));
        if let Some(snapshot) = &finished {
            info!(
                reason = ?snapshot.reason,
                total_swipes = round.total_swipes,
                "discovery round finished"
            );
            self.phase = EnginePhase::Finished(snapshot.reason);
        }

        let next_card = match finished {
            Some(_) => None,
            None => round.current_card().cloned(),
        };

        SwipeOutcome::Recorded(SwipeReport {
            style_id: card.style_id,
            liked,
            total_swipes: round.total_swipes,
            next_card,
            signals,
            finished,
        })
    }

    pub fn phase(&self) -> EnginePhase {
        self.phase
    }

    pub fn current_card(&self) -> Option<&Card> {
        match self.phase {
            EnginePhase::Active => self.round.as_ref().and_then(Round::current_card),
            _ => None,
        }
    }

    /// The whole deck currently being worked through, including played cards.
    pub fn deck(&self) -> &[Card] {
        self.round
            .as_ref()
            .map(|round| round.deck.as_slice())
            .unwrap_or_default()
    }

    pub fn decks_composed(&self) -> u32 {
        self.round.as_ref().map_or(0, |round| round.decks_composed)
    }

    pub fn catalog(&self) -> Option<&Catalog> {
        self.round.as_ref().map(|round| round.catalog.as_ref())
    }

    pub fn scoreboard(&self) -> Option<&Scoreboard> {
        self.round.as_ref().map(|round| &round.scoreboard)
    }

    pub fn pool_expanded(&self) -> bool {
        self.round
            .as_ref()
            .is_some_and(|round| round.monitor.pool_expanded())
    }

    pub fn session_id(&self) -> Option<&SessionId> {
        self.outbox.session_id()
    }

    pub fn finish(&self) -> Option<&FinishSnapshot> {
        self.round.as_ref().and_then(|round| round.finish.as_ref())
    }

    pub fn session(&self) -> Option<SessionView> {
        let round = self.round.as_ref()?;
        Some(SessionView {
            session_id: self.outbox.session_id().cloned(),
            quiz_id: round.quiz_id.clone(),
            rejected_style_ids: round.rejected.clone(),
            user_preference_text: round.preference_text.clone(),
            total_swipes: round.total_swipes,
            consecutive_dislikes: round.monitor.consecutive_dislikes(),
            decision_changes: round.decision_changes.clone(),
            finish_reason: round.finish.as_ref().map(|finish| finish.reason),
            pool_expanded: round.monitor.pool_expanded(),
            queued_events: self.outbox.pending(),
        })
    }

    pub fn summary(&self, limit: usize) -> Option<SessionSummary> {
        let round = self.round.as_ref()?;
        let (favored_details, avoided_details) =
            report::detail_standings(&round.catalog, &round.scoreboard, limit);

        Some(SessionSummary {
            finish_reason: round.finish.as_ref().map(|finish| finish.reason),
            total_swipes: round.total_swipes,
            rejected_styles: round.rejected.len(),
            top_styles: report::top_styles(&round.catalog, &round.scoreboard, limit),
            favored_details,
            avoided_details,
            decision_changes: round.decision_changes.values().sum(),
            mean_reaction_ms: report::mean_reaction_ms(&round.reaction_times),
        })
    }
}
