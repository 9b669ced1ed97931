use serde::{Deserialize, Serialize};

use super::scoreboard::Scoreboard;

/// Why an elicitation round ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FinishReason {
    ConditionMet,
    LimitReached,
}

impl FinishReason {
    pub const fn label(self) -> &'static str {
        match self {
            Self::ConditionMet => "Preferences identified",
            Self::LimitReached => "Swipe limit reached",
        }
    }
}

/// Thresholds for the stop rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StopRules {
    pub swipe_limit: u32,
    pub contenders: usize,
    pub liked_threshold: u32,
    pub lead_margin: u32,
}

impl Default for StopRules {
    fn default() -> Self {
        Self {
            swipe_limit: 40,
            contenders: 3,
            liked_threshold: 4,
            lead_margin: 2,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct StopConditionEvaluator {
    rules: StopRules,
}

impl StopConditionEvaluator {
    pub fn new(rules: StopRules) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &StopRules {
        &self.rules
    }

    pub fn evaluate(&self, scoreboard: &Scoreboard, total_swipes: u32) -> Option<FinishReason> {
        if total_swipes >= self.rules.swipe_limit {
            return Some(FinishReason::LimitReached);
        }

        let ranked = scoreboard.rank_by_likes();
        let (_, runner_up) = ranked.get(self.rules.contenders)?;

        let bar = runner_up.liked_count + self.rules.lead_margin;
        let leaders_clear = ranked[..self.rules.contenders].iter().all(|(_, stats)| {
            stats.liked_count >= self.rules.liked_threshold && stats.liked_count >= bar
        });

        leaders_clear.then_some(FinishReason::ConditionMet)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::discovery::catalog::StyleId;
    use crate::discovery::scoreboard::ScoreWeights;

    fn board(likes: &[(&str, u32, u32)]) -> Scoreboard {
        let mut scoreboard = Scoreboard::new(ScoreWeights::default());
        for (id, liked, disliked) in likes {
            let style = StyleId(id.to_string());
            for _ in 0..*liked {
                scoreboard.record_swipe(&style, &[], true);
            }
            for _ in 0..*disliked {
                scoreboard.record_swipe(&style, &[], false);
            }
        }
        scoreboard
    }

    #[test]
    fn limit_is_checked_first() {
        let evaluator = StopConditionEvaluator::default();
        let scoreboard = board(&[("a", 0, 1)]);

        assert_eq!(evaluator.evaluate(&scoreboard, 39), None);
        assert_eq!(
            evaluator.evaluate(&scoreboard, 40),
            Some(FinishReason::LimitReached)
        );
    }

    #[test]
    fn needs_four_tracked_styles() {
        let evaluator = StopConditionEvaluator::default();
        let scoreboard = board(&[("a", 6, 0), ("b", 6, 0), ("c", 6, 0)]);

        assert_eq!(evaluator.evaluate(&scoreboard, 18), None);
    }

    #[test]
    fn top_three_with_lead_meets_condition() {
        let evaluator = StopConditionEvaluator::default();
        let scoreboard = board(&[("a", 4, 0), ("b", 4, 0), ("c", 4, 0), ("d", 0, 1), ("e", 0, 1)]);

        assert_eq!(
            evaluator.evaluate(&scoreboard, 14),
            Some(FinishReason::ConditionMet)
        );
    }

    #[test]
    fn narrow_lead_keeps_going() {
        let evaluator = StopConditionEvaluator::default();
        let scoreboard = board(&[("a", 5, 0), ("b", 4, 0), ("c", 4, 0), ("d", 3, 0)]);

        assert_eq!(evaluator.evaluate(&scoreboard, 16), None);

        let below_threshold = board(&[("a", 5, 0), ("b", 5, 0), ("c", 3, 0), ("d", 0, 2)]);
        assert_eq!(evaluator.evaluate(&below_threshold, 15), None);
    }
}
