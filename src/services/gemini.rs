//! Race-coach language model client.
//!
//! Relays a chat turn to the Gemini `generateContent` API with a fixed system
//! instruction. The model is asked to answer only race topics and to reply
//! with the literal `OFF_TOPIC` otherwise; enforcement of that signal lives in
//! `services::chat`, not here.
//! See: https://ai.google.dev/api/generate-content

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::errors::AppError;
use crate::services::chat::{ChatMessage, Role};

/// Default upper bound on one `generateContent` round trip.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Sentinel the model returns for messages outside the race domain.
pub const OFF_TOPIC_SENTINEL: &str = "OFF_TOPIC";

pub const SYSTEM_INSTRUCTION: &str = "\
You are the COMMANDER of the Ultra Helike 100km. Your job is critical: guide the runner.

MAIN GOAL:
Give TACTICAL, PRECISE and STRUCTURED information about the Ultra Helike race in Elche.

FORMAT RULES (MANDATORY):
1. Answer with bullet points and lists. No walls of text.
2. Start every key point with an emoji:
   - 📍 Location/Km
   - ⚠️ Warning/Danger
   - 🎒 Gear/Equipment
   - 💧 Nutrition/Water
   - ⚡ Pace/Strategy
3. Be brief. Military/sports style.

SAFETY RULES (STRICT):
- ONLY talk about the race (route, elevation, gear, strategy, sports nutrition).
- If the user asks about politics, (non-sports) cooking, jokes or anything unrelated to the race, reply ONLY: \"OFF_TOPIC\".
- If the user keeps insisting with nonsense, reply: \"OFF_TOPIC\".

ULTRA HELIKE TECHNICAL DATA:
- Distance: 100km.
- Start: Paseo de la Estación, Elche.
- Terrain:
  1. Km 0-15: Vinalopó riverbed (fast).
  2. Km 15-35: Reservoir and sierra (technical, climbs).
  3. Km 40-60: Beaches (sand, heavy).
  4. Km 60-90: Hamlets and countryside (mentally hard, flat/false flat).
  5. Km 90-100: Back into the city.
- Mandatory gear: headlamp, rear red light, emergency blanket, charged phone, 1L liquid container.
";

/// Outcome of a successful relay call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelayReply {
    /// Free-text answer from the model.
    Answer(String),
    /// The model judged the message off-topic.
    OffTopic,
}

/// Client for the Gemini `generateContent` endpoint.
#[derive(Debug, Clone)]
pub struct GeminiClient {
    client: reqwest::Client,
    api_key: Option<String>,
    model: String,
    base_url: String,
    timeout: Duration,
}

// --- Gemini JSON request/response types ---

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    system_instruction: Content<'a>,
    contents: Vec<Content<'a>>,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'a str>,
    parts: Vec<Part<'a>>,
}

#[derive(Debug, Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

fn role_name(role: Role) -> &'static str {
    match role {
        Role::User => "user",
        Role::Model => "model",
    }
}

/// Build the `contents` array: prior history followed by the new user message.
///
/// Leading model turns (the session greeting) are dropped because
/// `generateContent` expects the conversation to open with a user turn.
fn build_contents<'a>(history: &'a [ChatMessage], new_message: &'a str) -> Vec<Content<'a>> {
    history
        .iter()
        .skip_while(|msg| msg.role == Role::Model)
        .map(|msg| Content {
            role: Some(role_name(msg.role)),
            parts: vec![Part { text: &msg.content }],
        })
        .chain(std::iter::once(Content {
            role: Some("user"),
            parts: vec![Part { text: new_message }],
        }))
        .collect()
}

/// Classify the model's raw text.
pub fn classify_reply(text: &str) -> RelayReply {
    let text = text.trim();
    if text.contains(OFF_TOPIC_SENTINEL) {
        RelayReply::OffTopic
    } else {
        RelayReply::Answer(text.to_string())
    }
}

impl GeminiClient {
    pub fn new(api_key: Option<String>, model: &str, base_url: &str) -> Self {
        let client = reqwest::Client::builder()
            .build()
            .expect("Failed to build HTTP client");
        Self {
            client,
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            model: model.to_string(),
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    /// Replace the per-request timeout. A timed-out call is an `ExternalServiceError`.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Whether an API key is configured. Without one every send fails.
    pub fn is_enabled(&self) -> bool {
        self.api_key.is_some()
    }

    /// Send the conversation history plus a new user message to the model.
    pub async fn send(
        &self,
        history: &[ChatMessage],
        new_message: &str,
    ) -> Result<RelayReply, AppError> {
        let api_key = self.api_key.as_deref().ok_or_else(|| {
            AppError::ExternalServiceError("Gemini API key is not configured".to_string())
        })?;

        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url, self.model
        );

        let body = GenerateContentRequest {
            system_instruction: Content {
                role: None,
                parts: vec![Part {
                    text: SYSTEM_INSTRUCTION,
                }],
            },
            contents: build_contents(history, new_message),
        };

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", api_key)
            .timeout(self.timeout)
            .json(&body)
            .send()
            .await
            .map_err(|e| AppError::ExternalServiceError(format!("Gemini request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(AppError::ExternalServiceError(format!(
                "Gemini returned HTTP {}",
                response.status()
            )));
        }

        let parsed: GenerateContentResponse = response.json().await.map_err(|e| {
            AppError::ExternalServiceError(format!("Gemini JSON parse error: {}", e))
        })?;

        let text: String = parsed
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|content| {
                content
                    .parts
                    .into_iter()
                    .filter_map(|p| p.text)
                    .collect::<Vec<_>>()
                    .join("")
            })
            .unwrap_or_default();

        if text.trim().is_empty() {
            return Err(AppError::ExternalServiceError(
                "Gemini returned no text".to_string(),
            ));
        }

        Ok(classify_reply(&text))
    }
}
