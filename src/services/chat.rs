//! Race-coach chat sessions and the off-topic lockout.
//!
//! The language model only classifies messages (it may answer `OFF_TOPIC`);
//! strike counting and blocking are enforced here:
//!
//! - each off-topic reply adds a strike and a warning "n/3"
//! - the third strike moves the session to `Blocked`, which is terminal
//! - transport failures show a fallback message and never count as strikes
//! - one relay call in flight per session (`AwaitingReply`)
//!
//! Sessions are in-memory only (`Arc<RwLock<HashMap>>`); nothing survives a
//! restart. The lock is never held across the relay call, and the relay runs
//! in its own task so a turn always completes even if the caller goes away.
//! Idle sessions are evicted when new ones are opened.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::RwLock;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::services::gemini::{GeminiClient, RelayReply};

/// Off-topic replies allowed before the session is blocked.
pub const MAX_STRIKES: u8 = 3;

/// Sessions without activity for this long are dropped from the registry.
const SESSION_IDLE_TTL_MINUTES: i64 = 6 * 60;
/// Upper bound on live sessions; the least recently active go first.
const MAX_SESSIONS: usize = 10_000;

pub const GREETING_MESSAGE: &str = "📍 Race command online.\n\n\
I'm your strategist for the 100km. Ask me about:\n\n\
🎒 Mandatory gear\n⚡ Pace per sector\n🥪 Nutrition plan";

pub const LOCKOUT_MESSAGE: &str = "⛔ SECURITY LOCK.\n\n\
You have exceeded the limit of irrelevant questions. This channel is for runners only. \
Chat disabled.";

pub const CONNECTION_FALLBACK_MESSAGE: &str =
    "⚠️ Connection error with race control. Hold your course.";

fn off_topic_warning(strikes: u8) -> String {
    format!(
        "⚠️ WARNING {}/{}: off-topic.\n\n\
         Focus on the race. I can't handle anything unrelated to the Ultra Helike.",
        strikes, MAX_STRIKES
    )
}

/// Errors from chat session operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ChatError {
    #[error("Chat session {0} not found")]
    SessionNotFound(Uuid),
    #[error("Message is empty")]
    EmptyMessage,
    #[error("Chat session is blocked after too many off-topic messages")]
    Blocked,
    #[error("A reply is already pending for this session")]
    Busy,
}

/// Who wrote a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Model,
}

/// A single chat message.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct ChatMessage {
    pub id: Uuid,
    pub role: Role,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

impl ChatMessage {
    fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            role,
            content: content.into(),
            timestamp: Utc::now(),
        }
    }
}

/// Where a session is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ChatStatus {
    /// Accepting a new message
    Ready,
    /// A relay call is in flight
    AwaitingReply,
    /// Locked out for the rest of the session
    Blocked,
}

/// One conversation with the race coach.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ChatSession {
    pub id: Uuid,
    pub messages: Vec<ChatMessage>,
    /// Off-topic strikes so far (0..=3)
    pub strikes: u8,
    pub status: ChatStatus,
    /// Last time a message was accepted or answered
    pub last_activity: DateTime<Utc>,
}

/// A user turn accepted by `begin_turn`, ready to be relayed.
#[derive(Debug, Clone)]
pub struct PendingTurn {
    /// Conversation before the new message
    pub history: Vec<ChatMessage>,
    /// The new user message
    pub message: String,
}

/// What came back for a pending turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnOutcome {
    Answer(String),
    OffTopic,
    /// The relay could not be reached or returned garbage.
    Failed,
}

impl From<RelayReply> for TurnOutcome {
    fn from(reply: RelayReply) -> Self {
        match reply {
            RelayReply::Answer(text) => TurnOutcome::Answer(text),
            RelayReply::OffTopic => TurnOutcome::OffTopic,
        }
    }
}

impl ChatSession {
    /// A fresh session opening with the coach greeting.
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            messages: vec![ChatMessage::new(Role::Model, GREETING_MESSAGE)],
            strikes: 0,
            status: ChatStatus::Ready,
            last_activity: Utc::now(),
        }
    }

    pub fn is_blocked(&self) -> bool {
        self.status == ChatStatus::Blocked
    }

    /// Accept a user message and mark the session as awaiting a reply.
    pub fn begin_turn(&mut self, content: &str) -> Result<PendingTurn, ChatError> {
        match self.status {
            ChatStatus::Blocked => return Err(ChatError::Blocked),
            ChatStatus::AwaitingReply => return Err(ChatError::Busy),
            ChatStatus::Ready => {}
        }
        if content.trim().is_empty() {
            return Err(ChatError::EmptyMessage);
        }

        let history = self.messages.clone();
        self.messages.push(ChatMessage::new(Role::User, content));
        self.status = ChatStatus::AwaitingReply;
        self.last_activity = Utc::now();

        Ok(PendingTurn {
            history,
            message: content.to_string(),
        })
    }

    /// Record the outcome of the pending turn and return the model message shown.
    pub fn complete_turn(&mut self, outcome: TurnOutcome) -> ChatMessage {
        let content = match outcome {
            TurnOutcome::Answer(text) => text,
            TurnOutcome::Failed => CONNECTION_FALLBACK_MESSAGE.to_string(),
            TurnOutcome::OffTopic => {
                self.strikes = self.strikes.saturating_add(1);
                if self.strikes >= MAX_STRIKES {
                    LOCKOUT_MESSAGE.to_string()
                } else {
                    off_topic_warning(self.strikes)
                }
            }
        };

        self.status = if self.strikes >= MAX_STRIKES {
            ChatStatus::Blocked
        } else {
            ChatStatus::Ready
        };

        let message = ChatMessage::new(Role::Model, content);
        self.last_activity = message.timestamp;
        self.messages.push(message.clone());
        message
    }
}

impl Default for ChatSession {
    fn default() -> Self {
        Self::new()
    }
}

/// Shared session registry handle.
pub type SharedChatSessions = Arc<RwLock<HashMap<Uuid, ChatSession>>>;

pub fn new_session_registry() -> SharedChatSessions {
    Arc::new(RwLock::new(HashMap::new()))
}

/// Drop idle sessions, then the least recently active ones until there is
/// room for one more. Sessions awaiting a reply are never evicted.
fn evict_sessions(
    sessions: &mut HashMap<Uuid, ChatSession>,
    now: DateTime<Utc>,
    max_sessions: usize,
) {
    let idle_cutoff = now - Duration::minutes(SESSION_IDLE_TTL_MINUTES);
    let before = sessions.len();
    sessions.retain(|_, s| {
        s.status == ChatStatus::AwaitingReply || s.last_activity >= idle_cutoff
    });

    while sessions.len() >= max_sessions {
        let oldest = sessions
            .values()
            .filter(|s| s.status != ChatStatus::AwaitingReply)
            .min_by_key(|s| s.last_activity)
            .map(|s| s.id);
        match oldest {
            Some(id) => {
                sessions.remove(&id);
            }
            None => break,
        }
    }

    let evicted = before - sessions.len();
    if evicted > 0 {
        tracing::debug!("Evicted {} chat sessions, {} remain", evicted, sessions.len());
    }
}

/// Open a new session and register it.
pub async fn create_session(sessions: &SharedChatSessions) -> ChatSession {
    let session = ChatSession::new();
    let mut guard = sessions.write().await;
    evict_sessions(&mut guard, session.last_activity, MAX_SESSIONS);
    guard.insert(session.id, session.clone());
    drop(guard);
    tracing::debug!("Opened chat session {}", session.id);
    session
}

pub async fn get_session(
    sessions: &SharedChatSessions,
    session_id: Uuid,
) -> Result<ChatSession, ChatError> {
    sessions
        .read()
        .await
        .get(&session_id)
        .cloned()
        .ok_or(ChatError::SessionNotFound(session_id))
}

/// Relay one user message and apply the lockout policy to the reply.
///
/// Blocked or busy sessions are rejected before the relay is called.
/// Returns the model message appended to the session and the updated session.
pub async fn send_message(
    sessions: &SharedChatSessions,
    relay: &GeminiClient,
    session_id: Uuid,
    content: &str,
) -> Result<(ChatMessage, ChatSession), ChatError> {
    let turn = {
        let mut guard = sessions.write().await;
        let session = guard
            .get_mut(&session_id)
            .ok_or(ChatError::SessionNotFound(session_id))?;
        session.begin_turn(content)?
    };

    // Detached so that dropping this future (client disconnect) cannot leave
    // the session stuck in `AwaitingReply`.
    let task = tokio::spawn(run_turn(sessions.clone(), relay.clone(), session_id, turn));
    match task.await {
        Ok(result) => result,
        Err(e) => {
            tracing::error!("Chat turn task for session {} failed: {}", session_id, e);
            let mut guard = sessions.write().await;
            let session = guard
                .get_mut(&session_id)
                .ok_or(ChatError::SessionNotFound(session_id))?;
            let message = session.complete_turn(TurnOutcome::Failed);
            Ok((message, session.clone()))
        }
    }
}

async fn run_turn(
    sessions: SharedChatSessions,
    relay: GeminiClient,
    session_id: Uuid,
    turn: PendingTurn,
) -> Result<(ChatMessage, ChatSession), ChatError> {
    let outcome = match relay.send(&turn.history, &turn.message).await {
        Ok(reply) => TurnOutcome::from(reply),
        Err(e) => {
            tracing::error!("Race coach relay failed for session {}: {}", session_id, e);
            TurnOutcome::Failed
        }
    };

    let mut guard = sessions.write().await;
    let session = guard
        .get_mut(&session_id)
        .ok_or(ChatError::SessionNotFound(session_id))?;
    let message = session.complete_turn(outcome);

    if session.is_blocked() {
        tracing::warn!(
            "Chat session {} blocked after {} off-topic messages",
            session_id,
            session.strikes
        );
    }

    Ok((message, session.clone()))
}
