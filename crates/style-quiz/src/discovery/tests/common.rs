use std::sync::{Arc, Mutex};

use axum::response::Response;
use chrono::{TimeZone, Utc};
use serde_json::Value;

use crate::discovery::catalog::{
    Catalog, Detail, DetailId, Image, ImageId, QuizId, Region, RoomFilter, StaticCatalogSource,
    Style, StyleId, Tag, TagId,
};
use crate::discovery::deck::FirstChooser;
use crate::discovery::engine::{Direction, ManualClock, SwipeEngine, SwipeOutcome, SwipeReport};
use crate::discovery::recorder::{
    CommentEvent, InteractionEvent, InteractionRecorder, RecorderError, SessionGateway, SessionId,
    SessionRequest,
};
use crate::discovery::service::DiscoveryService;
use crate::discovery::settings::EngineSettings;

/// (style id, style name, signature detail id, detail name) for the showroom catalog.
pub(super) const SHOWROOM: [(&str, &str, &str, &str); 5] = [
    ("loft", "Industrial Loft", "exposed-brick", "Exposed brick"),
    ("nordic", "Nordic", "pale-oak", "Pale oak"),
    ("boho", "Bohemian", "rattan", "Rattan"),
    ("deco", "Art Deco", "brass", "Brass"),
    ("coastal", "Coastal", "linen", "Linen"),
];

pub(super) fn style_id(id: &str) -> StyleId {
    StyleId(id.to_string())
}

pub(super) fn detail_id(id: &str) -> DetailId {
    DetailId(id.to_string())
}

pub(super) fn quiz() -> QuizId {
    QuizId("spring-showroom".to_string())
}

pub(super) fn detail(id: &str, name: &str, category: &str) -> Detail {
    Detail {
        id: detail_id(id),
        name: name.to_string(),
        category: category.to_string(),
    }
}

pub(super) fn image(style: &str, n: usize, room: &str, details: &[&str]) -> Image {
    let id = format!("{style}-{n:02}");
    let tags = details
        .iter()
        .enumerate()
        .map(|(index, detail)| Tag {
            id: TagId(format!("{id}-{detail}")),
            region: Region {
                x: 10.0 + 20.0 * index as f32,
                y: 30.0,
                width: 15.0,
                height: 15.0,
            },
            detail: detail_id(detail),
        })
        .collect();

    Image {
        url: format!("https://img.example/{style}/{n}.jpg"),
        id: ImageId(id),
        room: room.to_string(),
        tags,
    }
}

/// Five styles, one per cluster, ten images each alternating living room and
/// bedroom, every image tagged with its style's signature detail.
pub(super) fn showroom() -> Catalog {
    let details = SHOWROOM
        .iter()
        .map(|(_, _, id, name)| detail(id, name, "signature"))
        .collect();
    let styles = SHOWROOM
        .iter()
        .enumerate()
        .map(|(cluster, (id, name, signature, _))| Style {
            id: style_id(id),
            name: name.to_string(),
            cluster: cluster as u32,
            images: (1..=10)
                .map(|n| {
                    let room = if n % 2 == 1 { "living" } else { "bedroom" };
                    image(id, n, room, &[signature])
                })
                .collect(),
        })
        .collect();

    Catalog::new(styles, details).expect("showroom catalog is valid")
}

/// `count` styles spread over five clusters, two oak-tagged images each.
pub(super) fn wide_catalog(count: usize) -> Catalog {
    let styles = (0..count)
        .map(|index| {
            let id = format!("s{index:02}");
            Style {
                id: style_id(&id),
                name: format!("Style {index}"),
                cluster: (index % 5) as u32,
                images: vec![
                    image(&id, 1, "living", &["oak"]),
                    image(&id, 2, "living", &["oak"]),
                ],
            }
        })
        .collect();

    Catalog::new(styles, vec![detail("oak", "Oak", "wood")]).expect("wide catalog is valid")
}

#[derive(Default)]
pub(super) struct MemoryRecorder {
    swipes: Mutex<Vec<InteractionEvent>>,
    comments: Mutex<Vec<CommentEvent>>,
}

impl MemoryRecorder {
    pub(super) fn swipes(&self) -> Vec<InteractionEvent> {
        self.swipes.lock().expect("recorder mutex poisoned").clone()
    }

    pub(super) fn comments(&self) -> Vec<CommentEvent> {
        self.comments.lock().expect("recorder mutex poisoned").clone()
    }
}

impl InteractionRecorder for MemoryRecorder {
    fn record_swipe(&self, event: InteractionEvent) -> Result<(), RecorderError> {
        self.swipes
            .lock()
            .expect("recorder mutex poisoned")
            .push(event);
        Ok(())
    }

    fn record_comment(&self, event: CommentEvent) -> Result<(), RecorderError> {
        self.comments
            .lock()
            .expect("recorder mutex poisoned")
            .push(event);
        Ok(())
    }
}

pub(super) struct OfflineRecorder;

impl InteractionRecorder for OfflineRecorder {
    fn record_swipe(&self, _event: InteractionEvent) -> Result<(), RecorderError> {
        Err(RecorderError::Transport("analytics offline".to_string()))
    }

    fn record_comment(&self, _event: CommentEvent) -> Result<(), RecorderError> {
        Err(RecorderError::Transport("analytics offline".to_string()))
    }
}

#[derive(Default)]
pub(super) struct MemoryGateway {
    requests: Mutex<Vec<SessionRequest>>,
}

impl MemoryGateway {
    pub(super) fn requests(&self) -> Vec<SessionRequest> {
        self.requests.lock().expect("gateway mutex poisoned").clone()
    }
}

impl SessionGateway for MemoryGateway {
    fn create_session(&self, request: &SessionRequest) -> Result<SessionId, RecorderError> {
        let mut requests = self.requests.lock().expect("gateway mutex poisoned");
        requests.push(request.clone());
        Ok(SessionId(format!("sess-{:03}", requests.len())))
    }
}

pub(super) struct OfflineGateway;

impl SessionGateway for OfflineGateway {
    fn create_session(&self, _request: &SessionRequest) -> Result<SessionId, RecorderError> {
        Err(RecorderError::Transport("session service offline".to_string()))
    }
}

pub(super) fn clock() -> Arc<ManualClock> {
    let start = Utc
        .with_ymd_and_hms(2025, 3, 1, 9, 0, 0)
        .single()
        .expect("valid timestamp");
    Arc::new(ManualClock::starting_at(start))
}

pub(super) struct Harness {
    pub(super) engine: SwipeEngine,
    pub(super) recorder: Arc<MemoryRecorder>,
    pub(super) clock: Arc<ManualClock>,
}

pub(super) fn harness(settings: EngineSettings) -> Harness {
    let recorder = Arc::new(MemoryRecorder::default());
    let clock = clock();
    let engine = SwipeEngine::new(settings, recorder.clone())
        .with_chooser(Box::new(FirstChooser))
        .with_clock(clock.clone());

    Harness {
        engine,
        recorder,
        clock,
    }
}

pub(super) fn started(catalog: Catalog) -> Harness {
    let mut harness = harness(EngineSettings::default());
    harness
        .engine
        .load(quiz(), RoomFilter::default(), catalog)
        .expect("round starts");
    harness
}

pub(super) fn recorded(outcome: SwipeOutcome) -> SwipeReport {
    match outcome {
        SwipeOutcome::Recorded(report) => report,
        SwipeOutcome::Ignored { reason } => panic!("swipe ignored: {reason:?}"),
    }
}

/// Swipes right on `liked` styles and left on everything else until the deck
/// runs through `count` cards.
pub(super) fn play(engine: &mut SwipeEngine, liked: &[&str], count: usize) -> Vec<SwipeReport> {
    (0..count)
        .map(|_| {
            let style = engine
                .current_card()
                .map(|card| card.style_id.0.clone())
                .expect("a card is showing");
            let direction = if liked.contains(&style.as_str()) {
                Direction::Right
            } else {
                Direction::Left
            };
            recorded(engine.swipe(direction))
        })
        .collect()
}

pub(super) type TestService = DiscoveryService<StaticCatalogSource, MemoryGateway, MemoryRecorder>;

pub(super) fn service() -> (Arc<TestService>, Arc<MemoryGateway>, Arc<MemoryRecorder>) {
    let gateway = Arc::new(MemoryGateway::default());
    let recorder = Arc::new(MemoryRecorder::default());
    let catalogs = StaticCatalogSource::default().with_quiz(quiz(), showroom());
    let service = DiscoveryService::new(
        Arc::new(catalogs),
        gateway.clone(),
        recorder.clone(),
        EngineSettings::default(),
    )
    .with_seed(Some(7))
    .with_clock(clock());

    (Arc::new(service), gateway, recorder)
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
