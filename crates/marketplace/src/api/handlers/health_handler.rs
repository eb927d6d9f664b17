//! Health check handlers.

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::get,
    Router,
};
use serde::Serialize;

use crate::api::AppState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub services: ServiceStatus,
}

#[derive(Debug, Serialize)]
pub struct ServiceStatus {
    pub database: ServiceHealth,
    pub cache: ServiceHealth,
}

/// Service health with optional error message.
#[derive(Debug, Serialize)]
pub struct ServiceHealth {
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub backend: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ServiceHealth {
    fn from_result<E: std::fmt::Display>(result: Result<(), E>, backend: Option<&str>) -> Self {
        let (status, error) = match result {
            Ok(()) => ("healthy", None),
            Err(e) => ("unhealthy", Some(e.to_string())),
        };
        Self {
            status: status.to_string(),
            backend: backend.map(str::to_string),
            error,
        }
    }

    fn is_healthy(&self) -> bool {
        self.status == "healthy"
    }
}

pub fn health_routes() -> Router<AppState> {
    Router::new().route("/", get(health_check))
}

/// Health check endpoint - verifies database and cache connectivity.
pub async fn health_check(State(state): State<AppState>) -> Response {
    let (database, cache) = tokio::join!(state.database.ping(), state.cache.ping());
    let database = ServiceHealth::from_result(database, None);
    let cache = ServiceHealth::from_result(cache, Some(state.cache.backend_name()));

    let all_healthy = database.is_healthy() && cache.is_healthy();
    let response = HealthResponse {
        status: if all_healthy { "healthy" } else { "degraded" }.to_string(),
        services: ServiceStatus { database, cache },
    };

    let status_code = if all_healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status_code, Json(response)).into_response()
}
