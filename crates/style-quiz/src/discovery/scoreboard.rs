use std::collections::{BTreeMap, BTreeSet, HashMap};

use serde::{Deserialize, Serialize};

use super::catalog::{Catalog, DetailId, ImageId, StyleId};

/// Free-text sentiment attached to a comment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sentiment {
    Positive,
    Negative,
    Neutral,
}

/// Score increments applied per interaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreWeights {
    pub swipe: i32,
    pub tag: i32,
    pub comment: i32,
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self {
            swipe: 2,
            tag: 1,
            comment: 3,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StyleStats {
    pub score: i32,
    pub liked_count: u32,
    pub shown_count: u32,
    pub shown_image_ids: BTreeSet<ImageId>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DetailStats {
    pub score: i32,
}

/// Per-interaction score movement, forwarded with the interaction event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SwipeDelta {
    pub style_change: i32,
    pub detail_change: i32,
}

/// Mutable per-session scoring state. Styles are tracked lazily on first touch;
/// detail entries are seeded from the catalog vocabulary.
#[derive(Debug, Clone, Default)]
pub struct Scoreboard {
    weights: ScoreWeights,
    styles: HashMap<StyleId, StyleStats>,
    touch_order: Vec<StyleId>,
    details: HashMap<DetailId, DetailStats>,
}

impl Scoreboard {
    pub fn new(weights: ScoreWeights) -> Self {
        Self {
            weights,
            ..Self::default()
        }
    }

    pub fn for_catalog(catalog: &Catalog, weights: ScoreWeights) -> Self {
        let mut scoreboard = Self::new(weights);
        for detail in catalog.details() {
            scoreboard
                .details
                .insert(detail.id.clone(), DetailStats::default());
        }
        scoreboard
    }

    fn style_entry(&mut self, style_id: &StyleId) -> &mut StyleStats {
        if !self.styles.contains_key(style_id) {
            self.touch_order.push(style_id.clone());
        }
        self.styles.entry(style_id.clone()).or_default()
    }

    pub fn record_swipe(
        &mut self,
        style_id: &StyleId,
        tag_detail_ids: &[DetailId],
        liked: bool,
    ) -> SwipeDelta {
        let (style_change, detail_change) = if liked {
            (self.weights.swipe, self.weights.tag)
        } else {
            (-self.weights.swipe, -self.weights.tag)
        };

        let stats = self.style_entry(style_id);
        stats.score += style_change;
        stats.shown_count += 1;
        if liked {
            stats.liked_count += 1;
        }

        for detail_id in tag_detail_ids {
            self.details.entry(detail_id.clone()).or_default().score += detail_change;
        }

        SwipeDelta {
            style_change,
            detail_change,
        }
    }

    /// Returns the applied score change (zero for neutral or unattributed comments).
    pub fn record_comment(&mut self, detail_id: Option<&DetailId>, sentiment: Sentiment) -> i32 {
        let change = match sentiment {
            Sentiment::Positive => self.weights.comment,
            Sentiment::Negative => -self.weights.comment,
            Sentiment::Neutral => 0,
        };

        match detail_id {
            Some(detail_id) if change != 0 => {
                self.details.entry(detail_id.clone()).or_default().score += change;
                change
            }
            _ => 0,
        }
    }

    pub fn mark_shown(&mut self, style_id: &StyleId, image_id: &ImageId) {
        self.style_entry(style_id)
            .shown_image_ids
            .insert(image_id.clone());
    }

    pub fn style_stats(&self, style_id: &StyleId) -> Option<&StyleStats> {
        self.styles.get(style_id)
    }

    pub fn style_score(&self, style_id: &StyleId) -> i32 {
        self.styles.get(style_id).map_or(0, |stats| stats.score)
    }

    pub fn detail_score(&self, detail_id: &DetailId) -> i32 {
        self.details.get(detail_id).map_or(0, |stats| stats.score)
    }

    pub fn detail_scores(&self) -> &HashMap<DetailId, DetailStats> {
        &self.details
    }

    pub fn shown_count(&self, style_id: &StyleId) -> u32 {
        self.styles.get(style_id).map_or(0, |stats| stats.shown_count)
    }

    pub fn has_shown(&self, style_id: &StyleId, image_id: &ImageId) -> bool {
        self.styles
            .get(style_id)
            .is_some_and(|stats| stats.shown_image_ids.contains(image_id))
    }

    pub fn tracked_styles(&self) -> usize {
        self.touch_order.len()
    }

    pub fn total_shown(&self) -> u32 {
        self.styles.values().map(|stats| stats.shown_count).sum()
    }

    /// Tracked styles by score, highest first; ties keep first-touch order.
    pub fn rank_by_score(&self) -> Vec<(&StyleId, &StyleStats)> {
        self.ranked(|stats| stats.score as i64)
    }

    /// Tracked styles by liked count, highest first; ties keep first-touch order.
    pub fn rank_by_likes(&self) -> Vec<(&StyleId, &StyleStats)> {
        self.ranked(|stats| stats.liked_count as i64)
    }

    fn ranked<F>(&self, key: F) -> Vec<(&StyleId, &StyleStats)>
    where
        F: Fn(&StyleStats) -> i64,
    {
        let mut ranked: Vec<(&StyleId, &StyleStats)> = self
            .touch_order
            .iter()
            .filter_map(|id| self.styles.get(id).map(|stats| (id, stats)))
            .collect();
        ranked.sort_by_key(|(_, stats)| std::cmp::Reverse(key(stats)));
        ranked
    }

    pub fn final_scores(&self) -> BTreeMap<StyleId, i32> {
        self.styles
            .iter()
            .map(|(id, stats)| (id.clone(), stats.score))
            .collect()
    }
}
