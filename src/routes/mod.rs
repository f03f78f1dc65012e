pub mod chat;
pub mod course;
pub mod health;
pub mod plan;

use std::sync::Arc;

use crate::services::chat::SharedChatSessions;
use crate::services::course::Course;
use crate::services::gemini::GeminiClient;

/// Shared application state.
///
/// The course is read-only after startup; chat sessions are the only
/// mutable state and live behind their own lock.
#[derive(Clone)]
pub struct AppState {
    pub course: Arc<Course>,
    pub gemini: GeminiClient,
    pub sessions: SharedChatSessions,
}

#[cfg(test)]
pub(crate) fn test_state() -> AppState {
    AppState {
        course: Arc::new(Course::ultra_helike()),
        gemini: GeminiClient::new(None, "test-model", "http://127.0.0.1:9"),
        sessions: crate::services::chat::new_session_registry(),
    }
}
