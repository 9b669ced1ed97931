use serde::{Deserialize, Serialize};
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EscalationSettings {
    pub dislike_streak: u32,
    pub pool_ratio: f32,
}

impl Default for EscalationSettings {
    fn default() -> Self {
        Self {
            dislike_streak: 10,
            pool_ratio: 0.5,
        }
    }
}

/// One-shot, non-terminal notification for the surrounding application.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EscalationSignal {
    /// The user rejected `streak` cards in a row.
    DislikeStreak { streak: u32, prompt: &'static str },
    /// More than the configured share of the catalog has been rejected.
    PoolTooSmall {
        rejected: usize,
        total: usize,
        prompt: &'static str,
    },
}

const STREAK_PROMPT: &str =
    "Nothing is landing yet. Describe the look you are after, or rule out whole styles.";
const POOL_PROMPT: &str =
    "Most styles are ruled out. Tell us which details you want so we can search more widely.";

/// Tracks the dislike streak and the sticky shrinking-pool flag.
#[derive(Debug, Clone, Default)]
pub struct EscalationMonitor {
    settings: EscalationSettings,
    consecutive_dislikes: u32,
    pool_expanded: bool,
}

impl EscalationMonitor {
    pub fn new(settings: EscalationSettings) -> Self {
        Self {
            settings,
            consecutive_dislikes: 0,
            pool_expanded: false,
        }
    }

    pub fn consecutive_dislikes(&self) -> u32 {
        self.consecutive_dislikes
    }

    pub fn pool_expanded(&self) -> bool {
        self.pool_expanded
    }

    pub fn on_swipe(&mut self, liked: bool) -> Option<EscalationSignal> {
        if liked {
            self.consecutive_dislikes = 0;
            return None;
        }

        self.consecutive_dislikes += 1;
        if self.consecutive_dislikes < self.settings.dislike_streak {
            return None;
        }

        let streak = self.consecutive_dislikes;
        self.consecutive_dislikes = 0;
        info!(streak, "dislike streak escalation");
        Some(EscalationSignal::DislikeStreak {
            streak,
            prompt: STREAK_PROMPT,
        })
    }

    /// Ratio is taken against the whole catalog, not the remaining active styles.
    pub fn on_style_rejected(
        &mut self,
        rejected: usize,
        total_styles: usize,
    ) -> Option<EscalationSignal> {
        if self.pool_expanded || total_styles == 0 {
            return None;
        }

        let ratio = rejected as f32 / total_styles as f32;
        if ratio <= self.settings.pool_ratio {
            return None;
        }

        self.pool_expanded = true;
        info!(rejected, total_styles, "style pool escalation, expanding decks");
        Some(EscalationSignal::PoolTooSmall {
            rejected,
            total: total_styles,
            prompt: POOL_PROMPT,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn streak_fires_at_threshold_and_resets() {
        let mut monitor = EscalationMonitor::default();

        for _ in 0..9 {
            assert_eq!(monitor.on_swipe(false), None);
        }
        assert!(matches!(
            monitor.on_swipe(false),
            Some(EscalationSignal::DislikeStreak { streak: 10, .. })
        ));
        assert_eq!(monitor.consecutive_dislikes(), 0);
    }

    #[test]
    fn likes_break_the_streak() {
        let mut monitor = EscalationMonitor::default();
        for _ in 0..9 {
            monitor.on_swipe(false);
        }
        assert_eq!(monitor.on_swipe(true), None);
        assert_eq!(monitor.consecutive_dislikes(), 0);
        assert_eq!(monitor.on_swipe(false), None);
    }

    #[test]
    fn pool_signal_is_sticky() {
        let mut monitor = EscalationMonitor::default();

        assert_eq!(monitor.on_style_rejected(5, 10), None);
        assert!(!monitor.pool_expanded());
        assert!(matches!(
            monitor.on_style_rejected(6, 10),
            Some(EscalationSignal::PoolTooSmall { rejected: 6, total: 10, .. })
        ));
        assert!(monitor.pool_expanded());
        assert_eq!(monitor.on_style_rejected(7, 10), None);
        assert!(monitor.pool_expanded());
    }
}
