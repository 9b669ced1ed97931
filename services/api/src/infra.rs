use metrics_exporter_prometheus::PrometheusHandle;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use style_quiz::discovery::{
    Catalog, CatalogError, CatalogLoader, CatalogSource, CommentEvent, FileCatalogSource,
    InteractionEvent, InteractionRecorder, QuizId, RecorderError, SessionGateway, SessionId,
    SessionRequest, StaticCatalogSource,
};

const BUNDLED_SHOWROOM: &str = include_str!("../data/showroom.json");

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Issues sequential session ids and remembers every request it saw.
#[derive(Default)]
pub(crate) struct InMemorySessionGateway {
    sequence: AtomicU64,
    requests: Mutex<Vec<SessionRequest>>,
}

impl SessionGateway for InMemorySessionGateway {
    fn create_session(&self, request: &SessionRequest) -> Result<SessionId, RecorderError> {
        let id = self.sequence.fetch_add(1, Ordering::Relaxed) + 1;
        self.requests
            .lock()
            .expect("session gateway mutex poisoned")
            .push(request.clone());
        Ok(SessionId(format!("session-{id:06}")))
    }
}

impl InMemorySessionGateway {
    pub(crate) fn requests(&self) -> Vec<SessionRequest> {
        self.requests
            .lock()
            .expect("session gateway mutex poisoned")
            .clone()
    }
}

#[derive(Default, Clone)]
pub(crate) struct InMemoryEventSink {
    swipes: Arc<Mutex<Vec<InteractionEvent>>>,
    comments: Arc<Mutex<Vec<CommentEvent>>>,
}

impl InteractionRecorder for InMemoryEventSink {
    fn record_swipe(&self, event: InteractionEvent) -> Result<(), RecorderError> {
        let mut guard = self.swipes.lock().expect("event sink mutex poisoned");
        guard.push(event);
        Ok(())
    }

    fn record_comment(&self, event: CommentEvent) -> Result<(), RecorderError> {
        let mut guard = self.comments.lock().expect("event sink mutex poisoned");
        guard.push(event);
        Ok(())
    }
}

impl InMemoryEventSink {
    pub(crate) fn swipes(&self) -> Vec<InteractionEvent> {
        self.swipes.lock().expect("event sink mutex poisoned").clone()
    }

    pub(crate) fn comments(&self) -> Vec<CommentEvent> {
        self.comments
            .lock()
            .expect("event sink mutex poisoned")
            .clone()
    }
}

/// The catalog the service answers every quiz with: a configured file, or the
/// showroom compiled into the binary.
pub(crate) enum QuizCatalogs {
    File(FileCatalogSource),
    Bundled(StaticCatalogSource),
}

impl QuizCatalogs {
    pub(crate) fn from_config(path: Option<PathBuf>) -> Result<Self, CatalogError> {
        match path {
            Some(path) => Ok(Self::File(FileCatalogSource::new(path))),
            None => Ok(Self::Bundled(StaticCatalogSource::single(bundled_catalog()?))),
        }
    }
}

impl CatalogSource for QuizCatalogs {
    fn fetch(&self, quiz_id: &QuizId) -> Result<Catalog, CatalogError> {
        match self {
            Self::File(source) => source.fetch(quiz_id),
            Self::Bundled(source) => source.fetch(quiz_id),
        }
    }
}

pub(crate) fn bundled_catalog() -> Result<Catalog, CatalogError> {
    CatalogLoader::from_json_reader(BUNDLED_SHOWROOM.as_bytes())
}
