//! Adaptive style discovery: catalog, scoring, deck composition, stop rules,
//! escalation prompts and the session engine that ties them together.

pub mod catalog;
pub mod deck;
pub mod engine;
pub mod escalation;
pub mod recorder;
pub mod report;
pub mod router;
pub mod scoreboard;
pub mod service;
pub mod settings;
pub mod stop;

#[cfg(test)]
mod tests;

pub use catalog::{
    Catalog, CatalogError, CatalogLoader, CatalogSource, Detail, DetailId, FileCatalogSource,
    Image, ImageId, QuizId, Region, RoomFilter, StaticCatalogSource, Style, StyleId, Tag, TagId,
};
pub use deck::{
    Card, Chooser, DeckComposer, DeckComposition, DeckRequest, DeckSettings, FirstChooser,
    RandomChooser,
};
pub use engine::{
    Clock, CommentOutcome, CommentTarget, Direction, EngineError, EnginePhase, FinishSnapshot,
    IgnoreReason, ManualClock, SessionHandle, SessionView, SwipeEngine, SwipeOutcome, SwipeReport,
    SystemClock,
};
pub use escalation::{EscalationMonitor, EscalationSettings, EscalationSignal};
pub use recorder::{
    CommentEvent, CommentRecord, InteractionEvent, InteractionRecorder, InteractionType,
    NullRecorder, RecorderError, SessionGateway, SessionId, SessionRequest, SwipeRecord,
};
pub use report::{DetailStanding, SessionSummary, StyleStanding};
pub use router::quiz_router;
pub use scoreboard::{DetailStats, ScoreWeights, Scoreboard, Sentiment, StyleStats, SwipeDelta};
pub use service::{
    DiscoveryService, DiscoveryServiceError, RoundId, RoundView, DEFAULT_FINISHED_RETENTION,
};
pub use settings::{CommentRegion, EngineSettings};
pub use stop::{FinishReason, StopConditionEvaluator, StopRules};
