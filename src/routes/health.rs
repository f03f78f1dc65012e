use axum::extract::State;
use axum::Json;
use serde::Serialize;
use utoipa::ToSchema;

use crate::routes::AppState;

/// Health check response.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    /// Service status, always "ok" while the process serves requests
    pub status: String,
    /// API version
    pub version: String,
    /// Whether the race-coach chat has a language model configured
    pub chat_enabled: bool,
}

/// Health check endpoint.
///
/// Returns the API status and version. `chat_enabled` is false when no
/// Gemini API key is configured; chat still works but only answers with the
/// connection fallback message.
#[utoipa::path(
    get,
    path = "/api/v1/health",
    tag = "Health",
    responses(
        (status = 200, description = "Service is healthy", body = HealthResponse),
    )
)]
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        chat_enabled: state.gemini.is_enabled(),
    })
}
