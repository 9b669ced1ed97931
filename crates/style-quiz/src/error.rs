use crate::config::ConfigError;
use crate::discovery::{CatalogError, DiscoveryServiceError, EngineError};
use crate::telemetry::TelemetryError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use std::fmt;

#[derive(Debug)]
pub enum AppError {
    Config(ConfigError),
    Telemetry(TelemetryError),
    Io(std::io::Error),
    Server(axum::Error),
    Catalog(CatalogError),
    Discovery(DiscoveryServiceError),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Config(err) => write!(f, "configuration error: {}", err),
            AppError::Telemetry(err) => write!(f, "telemetry error: {}", err),
            AppError::Io(err) => write!(f, "io error: {}", err),
            AppError::Server(err) => write!(f, "server error: {}", err),
            AppError::Catalog(err) => write!(f, "catalog error: {}", err),
            AppError::Discovery(err) => write!(f, "discovery error: {}", err),
        }
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AppError::Config(err) => Some(err),
            AppError::Telemetry(err) => Some(err),
            AppError::Io(err) => Some(err),
            AppError::Server(err) => Some(err),
            AppError::Catalog(err) => Some(err),
            AppError::Discovery(err) => Some(err),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::Catalog(_) => StatusCode::BAD_REQUEST,
            AppError::Discovery(DiscoveryServiceError::UnknownRound(_)) => StatusCode::NOT_FOUND,
            AppError::Discovery(_)
            | AppError::Config(_)
            | AppError::Telemetry(_)
            | AppError::Io(_)
            | AppError::Server(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = Json(json!({ "error": self.to_string() }));
        (status, body).into_response()
    }
}

impl From<ConfigError> for AppError {
    fn from(value: ConfigError) -> Self {
        Self::Config(value)
    }
}

impl From<TelemetryError> for AppError {
    fn from(value: TelemetryError) -> Self {
        Self::Telemetry(value)
    }
}

impl From<std::io::Error> for AppError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<axum::Error> for AppError {
    fn from(value: axum::Error) -> Self {
        Self::Server(value)
    }
}

impl From<CatalogError> for AppError {
    fn from(value: CatalogError) -> Self {
        Self::Catalog(value)
    }
}

impl From<DiscoveryServiceError> for AppError {
    fn from(value: DiscoveryServiceError) -> Self {
        Self::Discovery(value)
    }
}

impl From<EngineError> for AppError {
    fn from(value: EngineError) -> Self {
        match value {
            EngineError::Catalog(err) => Self::Catalog(err),
            other => Self::Discovery(DiscoveryServiceError::Engine(other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::discovery::RoundId;

    #[test]
    fn catalog_errors_map_to_bad_request() {
        let response = AppError::from(CatalogError::Empty).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn unknown_rounds_map_to_not_found() {
        let error = DiscoveryServiceError::UnknownRound(RoundId("round-999999".to_string()));
        let response = AppError::from(error).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn config_errors_are_internal() {
        let response = AppError::from(ConfigError::InvalidPort).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn engine_catalog_failures_surface_as_catalog_errors() {
        let error = AppError::from(EngineError::Catalog(CatalogError::Empty));
        assert!(matches!(error, AppError::Catalog(CatalogError::Empty)));

        let error = AppError::from(EngineError::AlreadyStarted);
        assert!(matches!(
            error,
            AppError::Discovery(DiscoveryServiceError::Engine(EngineError::AlreadyStarted))
        ));
    }
}
