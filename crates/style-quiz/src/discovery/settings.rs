use serde::{Deserialize, Serialize};

use super::deck::DeckSettings;
use super::escalation::EscalationSettings;
use super::scoreboard::ScoreWeights;
use super::stop::StopRules;

/// Every tunable of a discovery round in one place.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EngineSettings {
    pub weights: ScoreWeights,
    pub deck: DeckSettings,
    pub stop: StopRules,
    pub escalation: EscalationSettings,
    pub comment_region: CommentRegion,
    /// Events held while the session id is unresolved; the oldest is dropped beyond this.
    pub pending_event_limit: usize,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            weights: ScoreWeights::default(),
            deck: DeckSettings::default(),
            stop: StopRules::default(),
            escalation: EscalationSettings::default(),
            comment_region: CommentRegion::default(),
            pending_event_limit: 64,
        }
    }
}

/// Region recorded for comments that are not attached to a tag.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CommentRegion {
    pub width: f32,
    pub height: f32,
}

impl Default for CommentRegion {
    fn default() -> Self {
        Self {
            width: 5.0,
            height: 5.0,
        }
    }
}
