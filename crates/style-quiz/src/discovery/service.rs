use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::catalog::{CatalogSource, QuizId, RoomFilter};
use super::deck::{Card, RandomChooser};
use super::engine::{
    Clock, CommentOutcome, CommentTarget, Direction, EngineError, EnginePhase, FinishSnapshot,
    IgnoreReason, SessionHandle, SessionView, SwipeEngine, SwipeOutcome,
};
use super::recorder::{InteractionRecorder, SessionGateway};
use super::report::SessionSummary;
use super::scoreboard::Sentiment;
use super::settings::EngineSettings;

/// Server-side handle for one running round, independent of the external
/// session id (which may never resolve).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RoundId(pub String);

impl fmt::Display for RoundId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

static ROUND_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_round_id() -> RoundId {
    let id = ROUND_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    RoundId(format!("round-{id:06}"))
}

/// Snapshot returned to API callers after every state-changing call.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RoundView {
    pub round_id: RoundId,
    pub phase: EnginePhase,
    pub current_card: Option<Card>,
    pub session: Option<SessionView>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finish: Option<FinishSnapshot>,
}

impl RoundView {
    fn capture(round_id: RoundId, engine: &SwipeEngine) -> Self {
        Self {
            round_id,
            phase: engine.phase(),
            current_card: engine.current_card().cloned(),
            session: engine.session(),
            finish: engine.finish().cloned(),
        }
    }
}

/// How many finished rounds keep their final view and summary.
pub const DEFAULT_FINISHED_RETENTION: usize = 256;

/// Finished rounds keep this many styles and details in their summary.
const RETAINED_SUMMARY_LIMIT: usize = 10;

/// What is left of a round once its engine has been released.
#[derive(Debug, Clone)]
struct FinishedRound {
    view: RoundView,
    summary: SessionSummary,
}

impl FinishedRound {
    fn capture(round_id: RoundId, engine: &SwipeEngine) -> Option<Self> {
        Some(Self {
            summary: engine.summary(RETAINED_SUMMARY_LIMIT)?,
            view: RoundView::capture(round_id, engine),
        })
    }
}

enum Slot {
    Running(SessionHandle),
    Finished(FinishedRound),
}

/// Runs many independent rounds against shared catalog, session and
/// analytics adapters. A round's engine is dropped as soon as it finishes;
/// only its final view and summary are kept, for a bounded number of rounds.
pub struct DiscoveryService<C, G, R> {
    catalogs: Arc<C>,
    gateway: Arc<G>,
    recorder: Arc<R>,
    settings: EngineSettings,
    seed: Option<u64>,
    clock: Option<Arc<dyn Clock>>,
    rounds: Mutex<HashMap<RoundId, SessionHandle>>,
    finished: Mutex<VecDeque<(RoundId, FinishedRound)>>,
    retention: usize,
}

impl<C, G, R> DiscoveryService<C, G, R>
where
    C: CatalogSource + 'static,
    G: SessionGateway + 'static,
    R: InteractionRecorder + 'static,
{
    pub fn new(
        catalogs: Arc<C>,
        gateway: Arc<G>,
        recorder: Arc<R>,
        settings: EngineSettings,
    ) -> Self {
        Self {
            catalogs,
            gateway,
            recorder,
            settings,
            seed: None,
            clock: None,
            rounds: Mutex::new(HashMap::new()),
            finished: Mutex::new(VecDeque::new()),
            retention: DEFAULT_FINISHED_RETENTION,
        }
    }

    /// Every round shuffles from the same seed.
    pub fn with_seed(mut self, seed: Option<u64>) -> Self {
        self.seed = seed;
        self
    }

    /// Finished rounds kept for status and summary lookups; the oldest goes first.
    pub fn with_retention(mut self, retention: usize) -> Self {
        self.retention = retention;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Loads the catalog, builds the first deck and registers the round. A
    /// failing session gateway does not fail the round; its events wait in
    /// the engine's bounded outbox.
    pub fn start(
        &self,
        quiz_id: QuizId,
        rooms: Vec<String>,
    ) -> Result<RoundView, DiscoveryServiceError> {
        let recorder: Arc<dyn InteractionRecorder> = self.recorder.clone();
        let mut engine = SwipeEngine::new(self.settings, recorder)
            .with_chooser(Box::new(RandomChooser::from_seed(self.seed)));
        if let Some(clock) = &self.clock {
            engine = engine.with_clock(clock.clone());
        }

        let request = engine.start(quiz_id, RoomFilter::new(rooms), self.catalogs.as_ref())?;
        match self.gateway.create_session(&request) {
            Ok(session_id) => engine.attach_session(session_id),
            Err(err) => warn!(
                quiz_id = %request.quiz_id.0,
                error = %err,
                "session creation failed, events held until the outbox limit"
            ),
        }

        let round_id = next_round_id();
        let view = RoundView::capture(round_id.clone(), &engine);
        info!(round_id = %round_id, "round registered");

        if engine.phase() == EnginePhase::Active {
            self.registry().insert(round_id, SessionHandle::new(engine));
        } else if let Some(finished) = FinishedRound::capture(round_id.clone(), &engine) {
            self.retain(round_id, finished);
        }
        Ok(view)
    }

    pub fn swipe(
        &self,
        round_id: &RoundId,
        direction: Direction,
    ) -> Result<SwipeOutcome, DiscoveryServiceError> {
        match self.slot(round_id)? {
            Slot::Running(handle) => {
                let outcome = handle.try_swipe(direction);
                self.release_if_finished(round_id, &handle, &outcome);
                Ok(outcome)
            }
            Slot::Finished(_) => Ok(SwipeOutcome::Ignored {
                reason: IgnoreReason::Finished,
            }),
        }
    }

    pub fn reject(&self, round_id: &RoundId) -> Result<SwipeOutcome, DiscoveryServiceError> {
        match self.slot(round_id)? {
            Slot::Running(handle) => {
                let outcome = handle.try_reject();
                self.release_if_finished(round_id, &handle, &outcome);
                Ok(outcome)
            }
            Slot::Finished(_) => Ok(SwipeOutcome::Ignored {
                reason: IgnoreReason::Finished,
            }),
        }
    }

    pub fn comment(
        &self,
        round_id: &RoundId,
        target: CommentTarget,
        text: String,
        sentiment: Sentiment,
    ) -> Result<CommentOutcome, DiscoveryServiceError> {
        match self.slot(round_id)? {
            Slot::Running(handle) => {
                Ok(handle.with(|engine| engine.comment(target, text, sentiment)))
            }
            Slot::Finished(_) => Ok(CommentOutcome::Ignored {
                reason: IgnoreReason::Finished,
            }),
        }
    }

    pub fn provide_preferences(
        &self,
        round_id: &RoundId,
        text: &str,
    ) -> Result<bool, DiscoveryServiceError> {
        match self.slot(round_id)? {
            Slot::Running(handle) => Ok(handle.with(|engine| engine.provide_preferences(text))),
            Slot::Finished(_) => Ok(false),
        }
    }

    pub fn status(&self, round_id: &RoundId) -> Result<RoundView, DiscoveryServiceError> {
        match self.slot(round_id)? {
            Slot::Running(handle) => {
                Ok(handle.with(|engine| RoundView::capture(round_id.clone(), engine)))
            }
            Slot::Finished(finished) => Ok(finished.view),
        }
    }

    /// Finished rounds answer from their retained summary, which holds at most
    /// ten styles and details per list.
    pub fn summary(
        &self,
        round_id: &RoundId,
        limit: usize,
    ) -> Result<SessionSummary, DiscoveryServiceError> {
        match self.slot(round_id)? {
            Slot::Running(handle) => handle
                .with(|engine| engine.summary(limit))
                .ok_or_else(|| DiscoveryServiceError::UnknownRound(round_id.clone())),
            Slot::Finished(finished) => Ok(finished.summary.truncated(limit)),
        }
    }

    /// Rounds that still hold an engine.
    pub fn active_rounds(&self) -> usize {
        self.registry().len()
    }

    /// Finished rounds whose results can still be read.
    pub fn retained_rounds(&self) -> usize {
        self.finished_log().len()
    }

    fn slot(&self, round_id: &RoundId) -> Result<Slot, DiscoveryServiceError> {
        if let Some(handle) = self.registry().get(round_id).cloned() {
            return Ok(Slot::Running(handle));
        }

        self.finished_log()
            .iter()
            .find(|(id, _)| id == round_id)
            .map(|(_, finished)| Slot::Finished(finished.clone()))
            .ok_or_else(|| DiscoveryServiceError::UnknownRound(round_id.clone()))
    }

    fn release_if_finished(
        &self,
        round_id: &RoundId,
        handle: &SessionHandle,
        outcome: &SwipeOutcome,
    ) {
        let finished = outcome
            .report()
            .is_some_and(|report| report.finished.is_some());
        if !finished {
            return;
        }

        let retained = handle.with(|engine| FinishedRound::capture(round_id.clone(), engine));
        if let Some(retained) = retained {
            self.retain(round_id.clone(), retained);
        }
        self.registry().remove(round_id);
        info!(round_id = %round_id, "round finished, engine released");
    }

    fn retain(&self, round_id: RoundId, finished: FinishedRound) {
        if self.retention == 0 {
            return;
        }
        let mut log = self.finished_log();
        while log.len() >= self.retention {
            log.pop_front();
        }
        log.push_back((round_id, finished));
    }

    fn registry(&self) -> std::sync::MutexGuard<'_, HashMap<RoundId, SessionHandle>> {
        self.rounds
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn finished_log(&self) -> std::sync::MutexGuard<'_, VecDeque<(RoundId, FinishedRound)>> {
        self.finished
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Error raised by the discovery service.
#[derive(Debug, thiserror::Error)]
pub enum DiscoveryServiceError {
    #[error("unknown discovery round {0}")]
    UnknownRound(RoundId),
    #[error(transparent)]
    Engine(#[from] EngineError),
}
