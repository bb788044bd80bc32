//! Free-text feedback scoring.
//!
//! A rater's comment is turned into a negativity score in [0, 1] by a
//! [`ScoreProvider`]. The shipped provider calls an OpenAI-compatible chat
//! completions endpoint. [`FallbackScorer`] wraps any provider so the
//! training side always gets a usable number: failures become
//! [`DEFAULT_SCORE`], out-of-range values are clipped.

use std::panic::{self, AssertUnwindSafe};
use std::time::Duration;

use reqwest::blocking::Client;
use serde::Deserialize;
use serde_json::{json, Value};

/// Score used whenever scoring fails. Lands in the neutral band.
pub const DEFAULT_SCORE: f32 = 0.25;

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_MODEL: &str = "gpt-4o-mini";

const SYSTEM_PROMPT: &str = "You evaluate user feedback about an action just taken by a \
reinforcement learning agent driving a car. Rate how NEGATIVE the feedback is about that \
action on a continuous scale from 0.0 to 1.0:\n\
- 0.0: very positive (correct action)\n\
- 0.1 to 0.3: somewhat positive\n\
- 0.4 to 0.6: neutral or unclear\n\
- 0.7 to 0.9: somewhat negative (a small mistake)\n\
- 1.0: very negative or dangerous (a big mistake, a crash)\n\
Reply only with JSON of the form {\"feedback\": <value>} where <value> is a float in [0.0, 1.0].";

/// Error from a score provider.
#[derive(Debug)]
pub enum ScoreError {
    /// No API key configured.
    MissingApiKey,
    /// Request could not be sent or timed out.
    Transport(String),
    /// Endpoint answered with a non-success status.
    Status(u16),
    /// Reply did not contain a readable score.
    Malformed(String),
    /// Score was NaN or infinite.
    NonFinite,
    /// Provider panicked.
    Panicked,
}

impl std::fmt::Display for ScoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ScoreError::MissingApiKey => write!(f, "no API key configured"),
            ScoreError::Transport(e) => write!(f, "transport error: {}", e),
            ScoreError::Status(code) => write!(f, "endpoint returned status {}", code),
            ScoreError::Malformed(e) => write!(f, "malformed reply: {}", e),
            ScoreError::NonFinite => write!(f, "score is not finite"),
            ScoreError::Panicked => write!(f, "score provider panicked"),
        }
    }
}

impl std::error::Error for ScoreError {}

impl From<reqwest::Error> for ScoreError {
    fn from(e: reqwest::Error) -> Self {
        ScoreError::Transport(e.to_string())
    }
}

/// Converts a rater comment about an action into a negativity score.
pub trait ScoreProvider: Send + Sync {
    /// Score `text` as feedback on the action named `action_label`.
    fn score(&self, text: &str, action_label: &str) -> Result<f32, ScoreError>;
}

impl<F> ScoreProvider for F
where
    F: Fn(&str, &str) -> Result<f32, ScoreError> + Send + Sync,
{
    fn score(&self, text: &str, action_label: &str) -> Result<f32, ScoreError> {
        self(text, action_label)
    }
}

/// Parse a model reply: a bare number, or JSON `{"feedback": x}`.
pub fn parse_score(content: &str) -> Result<f32, ScoreError> {
    let trimmed = content.trim();
    let value = match serde_json::from_str::<Value>(trimmed) {
        Ok(Value::Number(n)) => n.as_f64(),
        Ok(Value::Object(map)) => match map.get("feedback") {
            Some(Value::Number(n)) => n.as_f64(),
            Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
            _ => None,
        },
        Ok(Value::String(s)) => s.trim().parse::<f64>().ok(),
        _ => trimmed.parse::<f64>().ok(),
    };
    let value = value.ok_or_else(|| ScoreError::Malformed(trimmed.chars().take(80).collect()))?;
    if !value.is_finite() {
        return Err(ScoreError::NonFinite);
    }
    Ok(value as f32)
}

// ============================================================================
// Chat completions provider
// ============================================================================

/// Connection settings for the chat completions endpoint.
#[derive(Debug, Clone)]
pub struct LlmScorerConfig {
    /// API root, e.g. `https://api.openai.com/v1`.
    pub base_url: String,
    pub model: String,
    pub api_key: Option<String>,
    /// Whole-request timeout.
    pub timeout: Duration,
}

impl Default for LlmScorerConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            api_key: None,
            timeout: Duration::from_secs(10),
        }
    }
}

impl LlmScorerConfig {
    /// Read `OPENAI_API_KEY`, `OPENAI_BASE_URL` and `OPENAI_MODEL`.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.api_key = std::env::var("OPENAI_API_KEY").ok().filter(|k| !k.is_empty());
        if let Ok(url) = std::env::var("OPENAI_BASE_URL") {
            if !url.trim().is_empty() {
                config.base_url = url.trim().trim_end_matches('/').to_string();
            }
        }
        if let Ok(model) = std::env::var("OPENAI_MODEL") {
            if !model.trim().is_empty() {
                config.model = model.trim().to_string();
            }
        }
        config
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Deserialize)]
struct ChatMessage {
    content: Option<String>,
}

/// Scores feedback with a chat completions call.
pub struct LlmScorer {
    config: LlmScorerConfig,
    http: Client,
}

impl LlmScorer {
    pub fn new(config: LlmScorerConfig) -> Self {
        let http = Client::builder()
            .timeout(config.timeout)
            .build()
            .unwrap_or_else(|_| Client::new());
        Self { config, http }
    }

    pub fn config(&self) -> &LlmScorerConfig {
        &self.config
    }

    fn user_prompt(text: &str, action_label: &str) -> String {
        format!(
            "The agent just performed the action '{}'.\nThe user's feedback on it is: '{}'",
            action_label,
            text.trim()
        )
    }
}

impl ScoreProvider for LlmScorer {
    fn score(&self, text: &str, action_label: &str) -> Result<f32, ScoreError> {
        let api_key = self.config.api_key.as_deref().ok_or(ScoreError::MissingApiKey)?;
        let body = json!({
            "model": self.config.model,
            "temperature": 0.0,
            "max_tokens": 20,
            "response_format": { "type": "json_object" },
            "messages": [
                { "role": "system", "content": SYSTEM_PROMPT },
                { "role": "user", "content": Self::user_prompt(text, action_label) },
            ],
        });

        let resp = self
            .http
            .post(format!("{}/chat/completions", self.config.base_url))
            .bearer_auth(api_key)
            .json(&body)
            .send()?;
        if !resp.status().is_success() {
            return Err(ScoreError::Status(resp.status().as_u16()));
        }
        let reply: ChatResponse = resp
            .json()
            .map_err(|e| ScoreError::Malformed(e.to_string()))?;
        let content = reply
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| ScoreError::Malformed("no choices in reply".to_string()))?;
        parse_score(&content)
    }
}

// ============================================================================
// Fallback wrapper
// ============================================================================

/// Provider wrapper that never fails.
pub struct FallbackScorer {
    inner: Box<dyn ScoreProvider>,
    default_score: f32,
}

impl FallbackScorer {
    pub fn new(inner: impl ScoreProvider + 'static) -> Self {
        Self {
            inner: Box::new(inner),
            default_score: DEFAULT_SCORE,
        }
    }

    /// Override the failure score. Non-finite values keep the default.
    pub fn with_default_score(mut self, score: f32) -> Self {
        if score.is_finite() {
            self.default_score = score.clamp(0.0, 1.0);
        }
        self
    }

    pub fn default_score(&self) -> f32 {
        self.default_score
    }

    /// Score `text`, substituting the default on any failure.
    pub fn score(&self, text: &str, action_label: &str) -> f32 {
        let result = panic::catch_unwind(AssertUnwindSafe(|| self.inner.score(text, action_label)))
            .unwrap_or(Err(ScoreError::Panicked));
        match result {
            Ok(v) if v.is_finite() => v.clamp(0.0, 1.0),
            Ok(_) => {
                log::warn!("[FeedbackScorer] non-finite score, using default {}", self.default_score);
                self.default_score
            }
            Err(e) => {
                log::warn!("[FeedbackScorer] scoring failed ({}), using default {}", e, self.default_score);
                self.default_score
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_score_forms() {
        assert_eq!(parse_score("0.7").unwrap(), 0.7);
        assert_eq!(parse_score(" {\"feedback\": 0.2} ").unwrap(), 0.2);
        assert_eq!(parse_score("{\"feedback\": \"0.9\"}").unwrap(), 0.9);
        assert!(matches!(parse_score("great job"), Err(ScoreError::Malformed(_))));
        assert!(matches!(parse_score("{\"score\": 1}"), Err(ScoreError::Malformed(_))));
        assert!(parse_score("NaN").is_err());
    }

    #[test]
    fn test_fallback_on_error() {
        let scorer = FallbackScorer::new(|_: &str, _: &str| -> Result<f32, ScoreError> {
            Err(ScoreError::Transport("timed out".into()))
        });
        assert_eq!(scorer.score("bad turn", "Left"), DEFAULT_SCORE);
    }

    #[test]
    fn test_fallback_on_panic() {
        let scorer = FallbackScorer::new(|_: &str, _: &str| -> Result<f32, ScoreError> {
            panic!("provider blew up")
        });
        assert_eq!(scorer.score("anything", "Brake"), DEFAULT_SCORE);
    }

    #[test]
    fn test_clips_out_of_range() {
        let high = FallbackScorer::new(|_: &str, _: &str| -> Result<f32, ScoreError> { Ok(3.5) });
        assert_eq!(high.score("x", "Accel"), 1.0);
        let low = FallbackScorer::new(|_: &str, _: &str| -> Result<f32, ScoreError> { Ok(-0.2) });
        assert_eq!(low.score("x", "Accel"), 0.0);
        let nan = FallbackScorer::new(|_: &str, _: &str| -> Result<f32, ScoreError> { Ok(f32::NAN) });
        assert_eq!(nan.score("x", "Accel"), DEFAULT_SCORE);
    }

    #[test]
    fn test_passes_action_label() {
        let scorer = FallbackScorer::new(|text: &str, label: &str| -> Result<f32, ScoreError> {
            assert_eq!(label, "Right+Accel");
            Ok(if text.contains("good") { 0.0 } else { 1.0 })
        });
        assert_eq!(scorer.score("good move", "Right+Accel"), 0.0);
    }

    #[test]
    fn test_missing_key_falls_back() {
        let scorer = FallbackScorer::new(LlmScorer::new(LlmScorerConfig::default()));
        assert_eq!(scorer.score("hello", "No-Op"), DEFAULT_SCORE);
    }

    #[test]
    fn test_custom_default() {
        let scorer = FallbackScorer::new(|_: &str, _: &str| -> Result<f32, ScoreError> {
            Err(ScoreError::NonFinite)
        })
        .with_default_score(0.5);
        assert_eq!(scorer.score("x", "y"), 0.5);
    }
}
