use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use serde_json::json;

use super::catalog::{CatalogError, CatalogSource, QuizId};
use super::engine::{CommentTarget, Direction, EngineError};
use super::recorder::{InteractionRecorder, SessionGateway};
use super::scoreboard::Sentiment;
use super::service::{DiscoveryService, DiscoveryServiceError, RoundId};

const SUMMARY_LIMIT: usize = 5;

#[derive(Debug, Deserialize)]
pub struct StartRoundRequest {
    pub quiz_id: String,
    #[serde(default)]
    pub rooms: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct SwipeRequest {
    pub direction: Direction,
}

#[derive(Debug, Deserialize)]
pub struct CommentRequest {
    #[serde(flatten)]
    pub target: CommentTarget,
    pub text: String,
    pub sentiment: Sentiment,
}

#[derive(Debug, Deserialize)]
pub struct PreferencesRequest {
    pub text: String,
}

/// Router builder exposing the swipe quiz over HTTP.
pub fn quiz_router<C, G, R>(service: Arc<DiscoveryService<C, G, R>>) -> Router
where
    C: CatalogSource + 'static,
    G: SessionGateway + 'static,
    R: InteractionRecorder + 'static,
{
    Router::new()
        .route("/api/v1/quiz/sessions", post(start_handler::<C, G, R>))
        .route(
            "/api/v1/quiz/sessions/:round_id",
            get(status_handler::<C, G, R>),
        )
        .route(
            "/api/v1/quiz/sessions/:round_id/swipe",
            post(swipe_handler::<C, G, R>),
        )
        .route(
            "/api/v1/quiz/sessions/:round_id/reject",
            post(reject_handler::<C, G, R>),
        )
        .route(
            "/api/v1/quiz/sessions/:round_id/comments",
            post(comment_handler::<C, G, R>),
        )
        .route(
            "/api/v1/quiz/sessions/:round_id/preferences",
            post(preferences_handler::<C, G, R>),
        )
        .route(
            "/api/v1/quiz/sessions/:round_id/summary",
            get(summary_handler::<C, G, R>),
        )
        .with_state(service)
}

pub(crate) async fn start_handler<C, G, R>(
    State(service): State<Arc<DiscoveryService<C, G, R>>>,
    axum::Json(request): axum::Json<StartRoundRequest>,
) -> Response
where
    C: CatalogSource + 'static,
    G: SessionGateway + 'static,
    R: InteractionRecorder + 'static,
{
    match service.start(QuizId(request.quiz_id), request.rooms) {
        Ok(view) => (StatusCode::CREATED, axum::Json(view)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn status_handler<C, G, R>(
    State(service): State<Arc<DiscoveryService<C, G, R>>>,
    Path(round_id): Path<String>,
) -> Response
where
    C: CatalogSource + 'static,
    G: SessionGateway + 'static,
    R: InteractionRecorder + 'static,
{
    match service.status(&RoundId(round_id)) {
        Ok(view) => (StatusCode::OK, axum::Json(view)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn swipe_handler<C, G, R>(
    State(service): State<Arc<DiscoveryService<C, G, R>>>,
    Path(round_id): Path<String>,
    axum::Json(request): axum::Json<SwipeRequest>,
) -> Response
where
    C: CatalogSource + 'static,
    G: SessionGateway + 'static,
    R: InteractionRecorder + 'static,
{
    match service.swipe(&RoundId(round_id), request.direction) {
        Ok(outcome) => (StatusCode::OK, axum::Json(outcome)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn reject_handler<C, G, R>(
    State(service): State<Arc<DiscoveryService<C, G, R>>>,
    Path(round_id): Path<String>,
) -> Response
where
    C: CatalogSource + 'static,
    G: SessionGateway + 'static,
    R: InteractionRecorder + 'static,
{
    match service.reject(&RoundId(round_id)) {
        Ok(outcome) => (StatusCode::OK, axum::Json(outcome)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn comment_handler<C, G, R>(
    State(service): State<Arc<DiscoveryService<C, G, R>>>,
    Path(round_id): Path<String>,
    axum::Json(request): axum::Json<CommentRequest>,
) -> Response
where
    C: CatalogSource + 'static,
    G: SessionGateway + 'static,
    R: InteractionRecorder + 'static,
{
    let CommentRequest {
        target,
        text,
        sentiment,
    } = request;

    match service.comment(&RoundId(round_id), target, text, sentiment) {
        Ok(outcome) => (StatusCode::OK, axum::Json(outcome)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn preferences_handler<C, G, R>(
    State(service): State<Arc<DiscoveryService<C, G, R>>>,
    Path(round_id): Path<String>,
    axum::Json(request): axum::Json<PreferencesRequest>,
) -> Response
where
    C: CatalogSource + 'static,
    G: SessionGateway + 'static,
    R: InteractionRecorder + 'static,
{
    match service.provide_preferences(&RoundId(round_id), &request.text) {
        Ok(true) => (StatusCode::OK, axum::Json(json!({ "status": "recorded" }))).into_response(),
        Ok(false) => (
            StatusCode::OK,
            axum::Json(json!({ "status": "ignored", "reason": "not_active" })),
        )
            .into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn summary_handler<C, G, R>(
    State(service): State<Arc<DiscoveryService<C, G, R>>>,
    Path(round_id): Path<String>,
) -> Response
where
    C: CatalogSource + 'static,
    G: SessionGateway + 'static,
    R: InteractionRecorder + 'static,
{
    match service.summary(&RoundId(round_id), SUMMARY_LIMIT) {
        Ok(summary) => {
            let payload = json!({
                "finish_label": summary.finish_label(),
                "summary": summary,
            });
            (StatusCode::OK, axum::Json(payload)).into_response()
        }
        Err(err) => error_response(err),
    }
}

fn error_response(err: DiscoveryServiceError) -> Response {
    let status = match &err {
        DiscoveryServiceError::UnknownRound(_) => StatusCode::NOT_FOUND,
        DiscoveryServiceError::Engine(EngineError::Catalog(CatalogError::NotFound(_))) => {
            StatusCode::NOT_FOUND
        }
        DiscoveryServiceError::Engine(EngineError::Catalog(_)) => StatusCode::BAD_REQUEST,
        DiscoveryServiceError::Engine(EngineError::AlreadyStarted) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };

    let payload = json!({
        "error": err.to_string(),
    });
    (status, axum::Json(payload)).into_response()
}
