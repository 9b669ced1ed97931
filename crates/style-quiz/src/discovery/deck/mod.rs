mod chooser;
mod selection;

pub use chooser::{Chooser, FirstChooser, RandomChooser};

use std::collections::{BTreeSet, HashMap, HashSet};

use serde::{Deserialize, Serialize};

use super::catalog::{Catalog, Image, RoomFilter, Style, StyleId};
use super::scoreboard::Scoreboard;
use selection::{DeckLedger, ImagePicker};

/// Sizing knobs for deck composition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeckSettings {
    pub exploit_size: usize,
    pub explore_size: usize,
    pub deck_size: usize,
    pub expanded_deck_size: usize,
    pub preference_bonus: i32,
}

impl Default for DeckSettings {
    fn default() -> Self {
        Self {
            exploit_size: 5,
            explore_size: 3,
            deck_size: 8,
            expanded_deck_size: 12,
            preference_bonus: -5,
        }
    }
}

/// One style/image pairing offered for accept or reject.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Card {
    pub style_id: StyleId,
    pub style_name: String,
    pub image: Image,
}

impl Card {
    fn new(style: &Style, image: &Image) -> Self {
        Self {
            style_id: style.id.clone(),
            style_name: style.name.clone(),
            image: image.clone(),
        }
    }
}

/// Inputs for composing a follow-up deck.
#[derive(Debug, Clone, Copy)]
pub struct DeckRequest<'a> {
    pub catalog: &'a Catalog,
    pub scoreboard: &'a Scoreboard,
    pub rejected: &'a BTreeSet<StyleId>,
    pub pool_expanded: bool,
    pub preference_text: &'a str,
    pub rooms: &'a RoomFilter,
}

#[derive(Debug, Clone, PartialEq)]
pub enum DeckComposition {
    Cards(Vec<Card>),
    /// Nothing left to show: every style is rejected or has no admissible image.
    Exhausted,
}

/// Explore/exploit deck builder.
#[derive(Debug, Clone, Default)]
pub struct DeckComposer {
    settings: DeckSettings,
}

impl DeckComposer {
    pub fn new(settings: DeckSettings) -> Self {
        Self { settings }
    }

    pub fn target_size(&self, pool_expanded: bool) -> usize {
        if pool_expanded {
            self.settings.expanded_deck_size
        } else {
            self.settings.deck_size
        }
    }

    /// One card per cluster for breadth, skipping clusters without an admissible image.
    pub fn compose_initial(
        &self,
        catalog: &Catalog,
        rooms: &RoomFilter,
        chooser: &mut dyn Chooser,
    ) -> Vec<Card> {
        let mut ledger = DeckLedger::default();
        let mut cards = Vec::new();

        for cluster in catalog.clusters() {
            let candidates: Vec<&Style> = catalog
                .styles_in_cluster(cluster)
                .into_iter()
                .filter(|style| {
                    style
                        .images
                        .iter()
                        .any(|image| rooms.admits(image) && !ledger.contains(image))
                })
                .collect();
            if candidates.is_empty() {
                continue;
            }

            let style = candidates[chooser.pick(candidates.len())];
            let image = style
                .images
                .iter()
                .find(|image| rooms.admits(image) && !ledger.contains(image));
            if let Some(image) = image {
                ledger.insert(image);
                cards.push(Card::new(style, image));
            }
        }

        cards
    }

    pub fn compose_next(
        &self,
        request: &DeckRequest<'_>,
        chooser: &mut dyn Chooser,
    ) -> DeckComposition {
        let active = request.catalog.active_styles(request.rejected);
        if active.is_empty() {
            return DeckComposition::Exhausted;
        }

        let candidates = self.candidate_styles(request, &active, chooser);

        let cards = self.fill(request, &candidates, false);
        if !cards.is_empty() {
            return DeckComposition::Cards(cards);
        }

        // every candidate has shown all its admissible images; start repeating them
        let cards = self.fill(request, &candidates, true);
        if cards.is_empty() {
            DeckComposition::Exhausted
        } else {
            DeckComposition::Cards(cards)
        }
    }

    fn candidate_styles<'c>(
        &self,
        request: &DeckRequest<'_>,
        active: &[&'c Style],
        chooser: &mut dyn Chooser,
    ) -> Vec<&'c Style> {
        let by_id: HashMap<&StyleId, &'c Style> =
            active.iter().map(|style| (&style.id, *style)).collect();
        let mut chosen: Vec<&'c Style> = Vec::new();
        let mut taken: HashSet<StyleId> = HashSet::new();

        let exploit = request
            .scoreboard
            .rank_by_score()
            .into_iter()
            .filter_map(|(id, _)| by_id.get(id).copied())
            .take(self.settings.exploit_size);
        for style in exploit {
            taken.insert(style.id.clone());
            chosen.push(style);
        }

        let explore: Vec<&'c Style> = active
            .iter()
            .copied()
            .filter(|style| {
                request.scoreboard.shown_count(&style.id) == 0 && !taken.contains(&style.id)
            })
            .take(self.settings.explore_size)
            .collect();
        for style in explore {
            taken.insert(style.id.clone());
            chosen.push(style);
        }

        let target = self.target_size(request.pool_expanded);
        while chosen.len() < target {
            let unused: Vec<&'c Style> = active
                .iter()
                .copied()
                .filter(|style| !taken.contains(&style.id))
                .collect();
            if unused.is_empty() {
                break;
            }
            let style = unused[chooser.pick(unused.len())];
            taken.insert(style.id.clone());
            chosen.push(style);
        }

        chosen
    }

    fn fill(
        &self,
        request: &DeckRequest<'_>,
        candidates: &[&Style],
        allow_repeats: bool,
    ) -> Vec<Card> {
        let picker = ImagePicker::new(
            request.catalog,
            request.scoreboard,
            request.preference_text,
            self.settings.preference_bonus,
        );
        let mut ledger = DeckLedger::default();
        let mut cards = Vec::new();

        for style in candidates {
            if let Some(image) = picker.pick(style, request.rooms, &ledger, allow_repeats) {
                ledger.insert(image);
                cards.push(Card::new(style, image));
            }
        }

        cards
    }
}
