use std::collections::HashSet;

use super::super::catalog::{Catalog, Image, ImageId, RoomFilter, Style};
use super::super::scoreboard::Scoreboard;

/// Images already placed in the deck being composed.
#[derive(Debug, Default)]
pub(crate) struct DeckLedger {
    ids: HashSet<ImageId>,
    urls: HashSet<String>,
}

impl DeckLedger {
    pub(crate) fn contains(&self, image: &Image) -> bool {
        self.ids.contains(&image.id) || self.urls.contains(&image.url)
    }

    pub(crate) fn insert(&mut self, image: &Image) {
        self.ids.insert(image.id.clone());
        self.urls.insert(image.url.clone());
    }
}

/// Scores candidate images of a style; lower is more desirable.
pub(crate) struct ImagePicker<'a> {
    catalog: &'a Catalog,
    scoreboard: &'a Scoreboard,
    preference: String,
    preference_bonus: i64,
}

impl<'a> ImagePicker<'a> {
    pub(crate) fn new(
        catalog: &'a Catalog,
        scoreboard: &'a Scoreboard,
        preference_text: &str,
        preference_bonus: i32,
    ) -> Self {
        Self {
            catalog,
            scoreboard,
            preference: preference_text.trim().to_lowercase(),
            preference_bonus: preference_bonus as i64,
        }
    }

    fn requested(&self, name: &str) -> bool {
        let name = name.trim().to_lowercase();
        !name.is_empty() && !self.preference.is_empty() && self.preference.contains(&name)
    }

    pub(crate) fn score(&self, image: &Image) -> i64 {
        image
            .tags
            .iter()
            .map(|tag| {
                let mut score = self.scoreboard.detail_score(&tag.detail) as i64;
                let requested = self
                    .catalog
                    .detail(&tag.detail)
                    .is_some_and(|detail| self.requested(&detail.name));
                if requested {
                    score += self.preference_bonus;
                }
                score
            })
            .sum()
    }

    /// Lowest-scoring eligible image; the first one wins ties.
    pub(crate) fn pick<'s>(
        &self,
        style: &'s Style,
        rooms: &RoomFilter,
        ledger: &DeckLedger,
        allow_repeats: bool,
    ) -> Option<&'s Image> {
        let mut best: Option<(&'s Image, i64)> = None;

        for image in &style.images {
            if !rooms.admits(image) || ledger.contains(image) {
                continue;
            }
            if !allow_repeats && self.scoreboard.has_shown(&style.id, &image.id) {
                continue;
            }

            let score = self.score(image);
            match best {
                Some((_, best_score)) if best_score <= score => {}
                _ => best = Some((image, score)),
            }
        }

        best.map(|(image, _)| image)
    }
}
