use std::collections::HashMap;
use std::io::Read;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use super::{
    Catalog, CatalogError, CatalogSource, Detail, DetailId, Image, ImageId, QuizId, Region, Style,
    StyleId, Tag, TagId,
};

#[derive(Debug, Deserialize)]
struct CatalogDocument {
    styles: Vec<StyleRecord>,
}

#[derive(Debug, Deserialize)]
struct StyleRecord {
    id: String,
    name: String,
    #[serde(default)]
    cluster: u32,
    #[serde(default)]
    images: Vec<ImageRecord>,
}

#[derive(Debug, Deserialize)]
struct ImageRecord {
    id: String,
    url: String,
    room: String,
    #[serde(default)]
    tags: Vec<TagRecord>,
}

#[derive(Debug, Deserialize)]
struct TagRecord {
    id: String,
    x: f32,
    y: f32,
    width: f32,
    height: f32,
    detail: DetailRecord,
}

#[derive(Debug, Deserialize)]
struct DetailRecord {
    id: String,
    name: String,
    #[serde(default)]
    category: String,
}

/// Flat export row: one line per tag, tag columns empty for untagged images.
#[derive(Debug, Deserialize)]
struct CsvRow {
    style_id: String,
    style_name: String,
    cluster: u32,
    image_id: String,
    image_url: String,
    room: String,
    tag_id: Option<String>,
    x: Option<f32>,
    y: Option<f32>,
    width: Option<f32>,
    height: Option<f32>,
    detail_id: Option<String>,
    detail_name: Option<String>,
    detail_category: Option<String>,
}

/// Builds catalogs from the nested JSON fetch payload or a flat CSV export.
pub struct CatalogLoader;

impl CatalogLoader {
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Catalog, CatalogError> {
        let path = path.as_ref();
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_ascii_lowercase())
            .unwrap_or_default();

        match extension.as_str() {
            "json" => Self::from_json_reader(std::fs::File::open(path)?),
            "csv" => Self::from_csv_reader(std::fs::File::open(path)?),
            other => Err(CatalogError::UnsupportedFormat(other.to_string())),
        }
    }

    pub fn from_json_reader<R: Read>(reader: R) -> Result<Catalog, CatalogError> {
        let document: CatalogDocument = serde_json::from_reader(reader)?;
        let mut details = Vec::new();

        let styles = document
            .styles
            .into_iter()
            .map(|style| Style {
                id: StyleId(style.id),
                name: style.name,
                cluster: style.cluster,
                images: style
                    .images
                    .into_iter()
                    .map(|image| Image {
                        id: ImageId(image.id),
                        url: image.url,
                        room: image.room,
                        tags: image
                            .tags
                            .into_iter()
                            .map(|tag| {
                                let detail_id = DetailId(tag.detail.id);
                                details.push(Detail {
                                    id: detail_id.clone(),
                                    name: tag.detail.name,
                                    category: tag.detail.category,
                                });
                                Tag {
                                    id: TagId(tag.id),
                                    region: Region {
                                        x: tag.x,
                                        y: tag.y,
                                        width: tag.width,
                                        height: tag.height,
                                    },
                                    detail: detail_id,
                                }
                            })
                            .collect(),
                    })
                    .collect(),
            })
            .collect();

        Catalog::new(styles, details)
    }

    pub fn from_csv_reader<R: Read>(reader: R) -> Result<Catalog, CatalogError> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(reader);

        let mut styles: Vec<Style> = Vec::new();
        let mut style_positions: HashMap<String, usize> = HashMap::new();
        let mut image_positions: HashMap<String, (usize, usize)> = HashMap::new();
        let mut details = Vec::new();

        for row in csv_reader.deserialize::<CsvRow>() {
            let row = row?;

            let style_position = *style_positions
                .entry(row.style_id.clone())
                .or_insert_with(|| {
                    styles.push(Style {
                        id: StyleId(row.style_id.clone()),
                        name: row.style_name.clone(),
                        cluster: row.cluster,
                        images: Vec::new(),
                    });
                    styles.len() - 1
                });

            let (owner, image_position) = match image_positions.get(&row.image_id) {
                Some(position) => *position,
                None => {
                    let images = &mut styles[style_position].images;
                    images.push(Image {
                        id: ImageId(row.image_id.clone()),
                        url: row.image_url.clone(),
                        room: row.room.clone(),
                        tags: Vec::new(),
                    });
                    let position = (style_position, images.len() - 1);
                    image_positions.insert(row.image_id.clone(), position);
                    position
                }
            };

            // an image id reused under another style is a catalog defect
            if owner != style_position {
                return Err(CatalogError::DuplicateImage(row.image_id));
            }

            let (Some(tag_id), Some(detail_id)) = (row.tag_id, row.detail_id) else {
                continue;
            };

            let detail_id = DetailId(detail_id);
            details.push(Detail {
                id: detail_id.clone(),
                name: row.detail_name.unwrap_or_default(),
                category: row.detail_category.unwrap_or_default(),
            });
            styles[owner].images[image_position].tags.push(Tag {
                id: TagId(tag_id),
                region: Region {
                    x: row.x.unwrap_or_default(),
                    y: row.y.unwrap_or_default(),
                    width: row.width.unwrap_or_default(),
                    height: row.height.unwrap_or_default(),
                },
                detail: detail_id,
            });
        }

        Catalog::new(styles, details)
    }
}

/// Serves one catalog file for every quiz.
#[derive(Debug, Clone)]
pub struct FileCatalogSource {
    path: PathBuf,
}

impl FileCatalogSource {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self { path: path.into() }
    }
}

impl CatalogSource for FileCatalogSource {
    fn fetch(&self, _quiz_id: &QuizId) -> Result<Catalog, CatalogError> {
        CatalogLoader::from_path(&self.path)
    }
}

/// Catalogs held in memory, keyed by quiz.
#[derive(Debug, Clone, Default)]
pub struct StaticCatalogSource {
    catalogs: HashMap<QuizId, Catalog>,
    fallback: Option<Catalog>,
}

impl StaticCatalogSource {
    /// Every quiz id resolves to `catalog`.
    pub fn single(catalog: Catalog) -> Self {
        Self {
            catalogs: HashMap::new(),
            fallback: Some(catalog),
        }
    }

    pub fn with_quiz(mut self, quiz_id: QuizId, catalog: Catalog) -> Self {
        self.catalogs.insert(quiz_id, catalog);
        self
    }
}

impl CatalogSource for StaticCatalogSource {
    fn fetch(&self, quiz_id: &QuizId) -> Result<Catalog, CatalogError> {
        self.catalogs
            .get(quiz_id)
            .or(self.fallback.as_ref())
            .cloned()
            .ok_or_else(|| CatalogError::NotFound(quiz_id.0.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    const JSON: &str = r#"{
        "styles": [
            {
                "id": "japandi",
                "name": "Japandi",
                "cluster": 1,
                "images": [
                    {
                        "id": "j-1",
                        "url": "https://cdn.example/j-1.jpg",
                        "room": "living",
                        "tags": [
                            {
                                "id": "t-1",
                                "x": 12.5, "y": 40, "width": 10, "height": 8,
                                "detail": { "id": "oak", "name": "Oak floor", "category": "flooring" }
                            }
                        ]
                    },
                    { "id": "j-2", "url": "https://cdn.example/j-2.jpg", "room": "bedroom" }
                ]
            },
            { "id": "loft", "name": "Industrial Loft", "cluster": 2, "images": [] }
        ]
    }"#;

    #[test]
    fn parses_nested_json_payload() {
        let catalog = CatalogLoader::from_json_reader(Cursor::new(JSON)).expect("json parses");

        assert_eq!(catalog.total_styles(), 2);
        let japandi = catalog
            .style(&StyleId("japandi".to_string()))
            .expect("style present");
        assert_eq!(japandi.images.len(), 2);
        assert_eq!(japandi.images[0].tags[0].region.x, 12.5);
        let oak = catalog
            .detail(&DetailId("oak".to_string()))
            .expect("detail registered");
        assert_eq!(oak.category, "flooring");
    }

    #[test]
    fn groups_flat_csv_rows_in_first_seen_order() {
        let csv = "\
style_id,style_name,cluster,image_id,image_url,room,tag_id,x,y,width,height,detail_id,detail_name,detail_category
loft,Industrial Loft,2,l-1,https://cdn.example/l-1.jpg,kitchen,t-1,5,5,20,20,brick,Exposed brick,walls
loft,Industrial Loft,2,l-1,https://cdn.example/l-1.jpg,kitchen,t-2,50,60,10,10,steel,Steel frame,fixtures
japandi,Japandi,1,j-1,https://cdn.example/j-1.jpg,living,,,,,,,,
";

        let catalog = CatalogLoader::from_csv_reader(Cursor::new(csv)).expect("csv parses");

        let ids: Vec<&str> = catalog
            .styles()
            .iter()
            .map(|style| style.id.0.as_str())
            .collect();
        assert_eq!(ids, vec!["loft", "japandi"]);
        assert_eq!(catalog.styles()[0].images[0].tags.len(), 2);
        assert!(catalog.styles()[1].images[0].tags.is_empty());
    }

    #[test]
    fn rejects_conflicting_detail_definitions() {
        let csv = "\
style_id,style_name,cluster,image_id,image_url,room,tag_id,x,y,width,height,detail_id,detail_name,detail_category
a,A,1,i-1,u1,living,t-1,1,1,1,1,oak,Oak floor,flooring
a,A,1,i-2,u2,living,t-2,1,1,1,1,oak,Walnut floor,flooring
";

        let result = CatalogLoader::from_csv_reader(Cursor::new(csv));
        assert!(matches!(result, Err(CatalogError::ConflictingDetail(id)) if id == "oak"));
    }

    #[test]
    fn static_source_reports_missing_quiz() {
        let source = StaticCatalogSource::default();
        let result = source.fetch(&QuizId("spring".to_string()));
        assert!(matches!(result, Err(CatalogError::NotFound(_))));
    }

    #[test]
    fn unknown_extension_is_unsupported() {
        let result = CatalogLoader::from_path("/definitely/missing/catalog.yaml");
        assert!(matches!(result, Err(CatalogError::UnsupportedFormat(ext)) if ext == "yaml"));
    }
}
