/// Default Gemini model for the race coach.
const DEFAULT_GEMINI_MODEL: &str = "gemini-2.0-flash";
/// Default timeout for one Gemini call, in seconds.
const DEFAULT_GEMINI_TIMEOUT_SECS: u64 = 30;
/// Default Gemini API base URL.
const DEFAULT_GEMINI_API_URL: &str = "https://generativelanguage.googleapis.com";

/// Application configuration, parsed from environment variables.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub port: u16,
    /// JSON course file; the built-in Ultra Helike course is used when unset.
    pub course_file: Option<String>,
    /// Gemini API key. The race-coach chat answers with a fallback message without one.
    pub gemini_api_key: Option<String>,
    pub gemini_model: String,
    pub gemini_api_url: String,
    /// Upper bound on one language-model call, in seconds.
    pub gemini_timeout_secs: u64,
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self {
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .expect("PORT must be a valid u16"),
            course_file: std::env::var("COURSE_FILE").ok().filter(|s| !s.is_empty()),
            gemini_api_key: std::env::var("GEMINI_API_KEY")
                .ok()
                .filter(|s| !s.is_empty()),
            gemini_model: std::env::var("GEMINI_MODEL")
                .unwrap_or_else(|_| DEFAULT_GEMINI_MODEL.to_string()),
            gemini_api_url: std::env::var("GEMINI_API_URL")
                .unwrap_or_else(|_| DEFAULT_GEMINI_API_URL.to_string()),
            gemini_timeout_secs: std::env::var("GEMINI_TIMEOUT_SECS")
                .unwrap_or_else(|_| DEFAULT_GEMINI_TIMEOUT_SECS.to_string())
                .parse()
                .expect("GEMINI_TIMEOUT_SECS must be a whole number of seconds"),
        }
    }
}
