use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::errors::{AppError, ErrorResponse};
use crate::routes::AppState;
use crate::services::chat::{self, ChatMessage, ChatSession};

/// Request body for POST /api/v1/chat/sessions/:id/messages.
#[derive(Debug, Deserialize, ToSchema)]
pub struct SendMessageRequest {
    /// The runner's message
    pub content: String,
}

/// Response type for POST /api/v1/chat/sessions/:id/messages.
#[derive(Debug, Serialize, ToSchema)]
pub struct SendMessageResponse {
    /// The coach message appended for this turn (answer, warning, lockout or fallback)
    pub reply: ChatMessage,
    /// Session after the turn, including strike count and status
    pub session: ChatSession,
}

/// Open a new race-coach chat session.
///
/// The session starts with the coach greeting and zero strikes.
#[utoipa::path(
    post,
    path = "/api/v1/chat/sessions",
    tag = "Chat",
    responses(
        (status = 201, description = "Session created", body = ChatSession),
    )
)]
pub async fn create_session(State(state): State<AppState>) -> (StatusCode, Json<ChatSession>) {
    let session = chat::create_session(&state.sessions).await;
    (StatusCode::CREATED, Json(session))
}

/// Get a chat session with its full message history.
#[utoipa::path(
    get,
    path = "/api/v1/chat/sessions/{session_id}",
    tag = "Chat",
    params(
        ("session_id" = Uuid, Path, description = "Chat session ID"),
    ),
    responses(
        (status = 200, description = "Chat session", body = ChatSession),
        (status = 404, description = "Session not found", body = ErrorResponse),
    )
)]
pub async fn get_session(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> Result<Json<ChatSession>, AppError> {
    let session = chat::get_session(&state.sessions, session_id).await?;
    Ok(Json(session))
}

/// Send a message to the race coach.
///
/// Off-topic messages earn a strike; the third strike locks the session and
/// further messages are rejected with 403. Relay failures come back as a
/// fallback message and do not count as strikes.
#[utoipa::path(
    post,
    path = "/api/v1/chat/sessions/{session_id}/messages",
    tag = "Chat",
    params(
        ("session_id" = Uuid, Path, description = "Chat session ID"),
    ),
    request_body = SendMessageRequest,
    responses(
        (status = 200, description = "Coach reply", body = SendMessageResponse),
        (status = 400, description = "Empty message", body = ErrorResponse),
        (status = 403, description = "Session is blocked", body = ErrorResponse),
        (status = 404, description = "Session not found", body = ErrorResponse),
        (status = 409, description = "A reply is already pending", body = ErrorResponse),
    )
)]
pub async fn post_message(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
    Json(body): Json<SendMessageRequest>,
) -> Result<Json<SendMessageResponse>, AppError> {
    let (reply, session) =
        chat::send_message(&state.sessions, &state.gemini, session_id, &body.content).await?;
    Ok(Json(SendMessageResponse { reply, session }))
}
