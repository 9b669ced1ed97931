use serde::Serialize;

use super::catalog::{Catalog, DetailId, StyleId};
use super::scoreboard::Scoreboard;
use super::stop::FinishReason;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StyleStanding {
    pub style_id: StyleId,
    pub name: String,
    pub score: i32,
    pub liked: u32,
    pub shown: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DetailStanding {
    pub detail_id: DetailId,
    pub name: String,
    pub category: String,
    pub score: i32,
}

/// End-of-round digest for the result screen.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionSummary {
    pub finish_reason: Option<FinishReason>,
    pub total_swipes: u32,
    pub rejected_styles: usize,
    pub top_styles: Vec<StyleStanding>,
    pub favored_details: Vec<DetailStanding>,
    pub avoided_details: Vec<DetailStanding>,
    pub decision_changes: u32,
    pub mean_reaction_ms: Option<i64>,
}

impl SessionSummary {
    pub fn finish_label(&self) -> &'static str {
        self.finish_reason
            .map(FinishReason::label)
            .unwrap_or("in progress")
    }

    /// Keeps at most `limit` entries in each ranked list.
    pub fn truncated(mut self, limit: usize) -> Self {
        self.top_styles.truncate(limit);
        self.favored_details.truncate(limit);
        self.avoided_details.truncate(limit);
        self
    }
}

pub(crate) fn top_styles(
    catalog: &Catalog,
    scoreboard: &Scoreboard,
    limit: usize,
) -> Vec<StyleStanding> {
    scoreboard
        .rank_by_score()
        .into_iter()
        .take(limit)
        .map(|(id, stats)| StyleStanding {
            style_id: id.clone(),
            name: catalog
                .style(id)
                .map(|style| style.name.clone())
                .unwrap_or_else(|| id.0.clone()),
            score: stats.score,
            liked: stats.liked_count,
            shown: stats.shown_count,
        })
        .collect()
}

/// Details with a positive score, best first, and details with a negative
/// score, worst first. Ties keep detail id order.
pub(crate) fn detail_standings(
    catalog: &Catalog,
    scoreboard: &Scoreboard,
    limit: usize,
) -> (Vec<DetailStanding>, Vec<DetailStanding>) {
    let standings: Vec<DetailStanding> = catalog
        .details()
        .map(|detail| DetailStanding {
            detail_id: detail.id.clone(),
            name: detail.name.clone(),
            category: detail.category.clone(),
            score: scoreboard.detail_score(&detail.id),
        })
        .collect();

    let mut favored: Vec<DetailStanding> = standings
        .iter()
        .filter(|standing| standing.score > 0)
        .cloned()
        .collect();
    favored.sort_by_key(|standing| std::cmp::Reverse(standing.score));
    favored.truncate(limit);

    let mut avoided: Vec<DetailStanding> = standings
        .into_iter()
        .filter(|standing| standing.score < 0)
        .collect();
    avoided.sort_by_key(|standing| standing.score);
    avoided.truncate(limit);

    (favored, avoided)
}

pub(crate) fn mean_reaction_ms(samples: &[i64]) -> Option<i64> {
    if samples.is_empty() {
        return None;
    }
    let total: i64 = samples.iter().sum();
    Some(total / samples.len() as i64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::discovery::catalog::{Detail, Image, ImageId, Region, Style, Tag, TagId};
    use crate::discovery::scoreboard::{ScoreWeights, Sentiment};

    fn catalog() -> Catalog {
        let details = vec![
            Detail {
                id: DetailId("brass".to_string()),
                name: "Brass fixtures".to_string(),
                category: "metal".to_string(),
            },
            Detail {
                id: DetailId("velvet".to_string()),
                name: "Velvet".to_string(),
                category: "fabric".to_string(),
            },
            Detail {
                id: DetailId("oak".to_string()),
                name: "Oak".to_string(),
                category: "wood".to_string(),
            },
        ];
        let styles = vec![Style {
            id: StyleId("deco".to_string()),
            name: "Art Deco".to_string(),
            cluster: 0,
            images: vec![Image {
                id: ImageId("deco-1".to_string()),
                url: "https://img.example/deco-1.jpg".to_string(),
                room: "living".to_string(),
                tags: vec![Tag {
                    id: TagId("deco-1-brass".to_string()),
                    region: Region {
                        x: 10.0,
                        y: 10.0,
                        width: 20.0,
                        height: 20.0,
                    },
                    detail: DetailId("brass".to_string()),
                }],
            }],
        }];
        Catalog::new(styles, details).expect("valid catalog")
    }

    #[test]
    fn splits_details_by_sign() {
        let catalog = catalog();
        let mut scoreboard = Scoreboard::for_catalog(&catalog, ScoreWeights::default());
        scoreboard.record_comment(Some(&DetailId("brass".to_string())), Sentiment::Positive);
        scoreboard.record_comment(Some(&DetailId("velvet".to_string())), Sentiment::Negative);

        let (favored, avoided) = detail_standings(&catalog, &scoreboard, 5);

        assert_eq!(favored.len(), 1);
        assert_eq!(favored[0].name, "Brass fixtures");
        assert_eq!(favored[0].score, 3);
        assert_eq!(avoided.len(), 1);
        assert_eq!(avoided[0].category, "fabric");
    }

    #[test]
    fn top_styles_carry_catalog_names_and_counts() {
        let catalog = catalog();
        let mut scoreboard = Scoreboard::for_catalog(&catalog, ScoreWeights::default());
        scoreboard.record_swipe(&StyleId("deco".to_string()), &[], true);

        let top = top_styles(&catalog, &scoreboard, 3);
        assert_eq!(top.len(), 1);
        assert_eq!(top[0].name, "Art Deco");
        assert_eq!(top[0].score, 2);
        assert_eq!(top[0].liked, 1);
    }

    #[test]
    fn truncation_caps_every_ranked_list() {
        let catalog = catalog();
        let mut scoreboard = Scoreboard::for_catalog(&catalog, ScoreWeights::default());
        scoreboard.record_comment(Some(&DetailId("brass".to_string())), Sentiment::Positive);
        scoreboard.record_comment(Some(&DetailId("oak".to_string())), Sentiment::Positive);
        let (favored, avoided) = detail_standings(&catalog, &scoreboard, 5);
        let summary = SessionSummary {
            finish_reason: Some(FinishReason::LimitReached),
            total_swipes: 40,
            rejected_styles: 0,
            top_styles: top_styles(&catalog, &scoreboard, 5),
            favored_details: favored,
            avoided_details: avoided,
            decision_changes: 0,
            mean_reaction_ms: None,
        };

        let short = summary.clone().truncated(1);
        assert_eq!(short.favored_details.len(), 1);
        assert_eq!(short.top_styles.len(), 1);
        assert_eq!(short.total_swipes, 40);
        assert_eq!(summary.truncated(0).favored_details.len(), 0);
    }

    #[test]
    fn mean_reaction_handles_empty_samples() {
        assert_eq!(mean_reaction_ms(&[]), None);
        assert_eq!(mean_reaction_ms(&[400, 600, 800]), Some(600));
    }
}
