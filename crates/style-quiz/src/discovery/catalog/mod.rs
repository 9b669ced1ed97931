mod loader;

pub use loader::{CatalogLoader, FileCatalogSource, StaticCatalogSource};

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use serde::{Deserialize, Serialize};

/// Identifier of a quiz whose catalog is fetched at session start.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct QuizId(pub String);

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct StyleId(pub String);

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ImageId(pub String);

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DetailId(pub String);

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TagId(pub String);

/// Named decor element that tags point at (e.g. "herringbone floor").
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Detail {
    pub id: DetailId,
    pub name: String,
    pub category: String,
}

/// Rectangle expressed in percent of the image dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Region {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Region {
    pub(crate) fn within_bounds(&self) -> bool {
        let in_range = |value: f32| value.is_finite() && (0.0..=100.0).contains(&value);
        in_range(self.x) && in_range(self.y) && in_range(self.width) && in_range(self.height)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tag {
    pub id: TagId,
    pub region: Region,
    pub detail: DetailId,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Image {
    pub id: ImageId,
    pub url: String,
    pub room: String,
    pub tags: Vec<Tag>,
}

impl Image {
    pub fn detail_ids(&self) -> Vec<DetailId> {
        self.tags.iter().map(|tag| tag.detail.clone()).collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Style {
    pub id: StyleId,
    pub name: String,
    pub cluster: u32,
    pub images: Vec<Image>,
}

/// Room types selected before the quiz. An empty filter admits every room.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoomFilter {
    rooms: BTreeSet<String>,
}

impl RoomFilter {
    pub fn new<I, S>(rooms: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let rooms = rooms
            .into_iter()
            .map(|room| room.as_ref().trim().to_lowercase())
            .filter(|room| !room.is_empty())
            .collect();
        Self { rooms }
    }

    pub fn admits(&self, image: &Image) -> bool {
        self.rooms.is_empty() || self.rooms.contains(&image.room.trim().to_lowercase())
    }

    pub fn rooms(&self) -> Vec<String> {
        self.rooms.iter().cloned().collect()
    }
}

/// Validation and fetch failures for style catalogs.
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("failed to read catalog: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid catalog JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid catalog CSV: {0}")]
    Csv(#[from] csv::Error),
    #[error("unsupported catalog format '{0}' (expected .json or .csv)")]
    UnsupportedFormat(String),
    #[error("catalog contains no styles")]
    Empty,
    #[error("duplicate style id {0}")]
    DuplicateStyle(String),
    #[error("duplicate image id {0}")]
    DuplicateImage(String),
    #[error("detail {0} is defined more than once with different names")]
    ConflictingDetail(String),
    #[error("tag {tag} references unknown detail {detail}")]
    UnknownDetail { tag: String, detail: String },
    #[error("tag {0} has a region outside 0..=100 percent")]
    RegionOutOfBounds(String),
    #[error("no catalog available for quiz {0}")]
    NotFound(String),
}

/// External catalog fetch. Implementations may hit a network service or disk.
pub trait CatalogSource: Send + Sync {
    fn fetch(&self, quiz_id: &QuizId) -> Result<Catalog, CatalogError>;
}

/// Immutable, session-scoped set of styles and the detail vocabulary their tags use.
#[derive(Debug, Clone)]
pub struct Catalog {
    styles: Vec<Style>,
    details: BTreeMap<DetailId, Detail>,
    style_index: HashMap<StyleId, usize>,
}

impl Catalog {
    pub fn new(styles: Vec<Style>, details: Vec<Detail>) -> Result<Self, CatalogError> {
        if styles.is_empty() {
            return Err(CatalogError::Empty);
        }

        let mut vocabulary: BTreeMap<DetailId, Detail> = BTreeMap::new();
        for detail in details {
            match vocabulary.get(&detail.id) {
                Some(existing) if existing.name != detail.name => {
                    return Err(CatalogError::ConflictingDetail(detail.id.0));
                }
                Some(_) => {}
                None => {
                    vocabulary.insert(detail.id.clone(), detail);
                }
            }
        }

        let mut style_index = HashMap::new();
        let mut image_ids = HashSet::new();
        for (position, style) in styles.iter().enumerate() {
            if style_index.insert(style.id.clone(), position).is_some() {
                return Err(CatalogError::DuplicateStyle(style.id.0.clone()));
            }
            for image in &style.images {
                if !image_ids.insert(image.id.clone()) {
                    return Err(CatalogError::DuplicateImage(image.id.0.clone()));
                }
                for tag in &image.tags {
                    if !vocabulary.contains_key(&tag.detail) {
                        return Err(CatalogError::UnknownDetail {
                            tag: tag.id.0.clone(),
                            detail: tag.detail.0.clone(),
                        });
                    }
                    if !tag.region.within_bounds() {
                        return Err(CatalogError::RegionOutOfBounds(tag.id.0.clone()));
                    }
                }
            }
        }

        Ok(Self {
            styles,
            details: vocabulary,
            style_index,
        })
    }

    pub fn styles(&self) -> &[Style] {
        &self.styles
    }

    pub fn total_styles(&self) -> usize {
        self.styles.len()
    }

    pub fn style(&self, id: &StyleId) -> Option<&Style> {
        self.style_index
            .get(id)
            .and_then(|position| self.styles.get(*position))
    }

    pub fn detail(&self, id: &DetailId) -> Option<&Detail> {
        self.details.get(id)
    }

    pub fn details(&self) -> impl Iterator<Item = &Detail> {
        self.details.values()
    }

    /// Styles not in `rejected`, in catalog order.
    pub fn active_styles(&self, rejected: &BTreeSet<StyleId>) -> Vec<&Style> {
        self.styles
            .iter()
            .filter(|style| !rejected.contains(&style.id))
            .collect()
    }

    pub fn styles_in_cluster(&self, cluster: u32) -> Vec<&Style> {
        self.styles
            .iter()
            .filter(|style| style.cluster == cluster)
            .collect()
    }

    /// Cluster partition present in the catalog, ascending.
    pub fn clusters(&self) -> BTreeSet<u32> {
        self.styles.iter().map(|style| style.cluster).collect()
    }
}
