//! Completion notification sinks.
//!
//! The trainer calls [`CompletionNotifier::notify`] exactly once, from its
//! cleanup path. Failures are logged by the caller and never retried.

use std::fmt;
use std::time::Duration;

use crossbeam_channel::Sender;

use super::run_msg::{FinishReason, RunEvent};

#[derive(Debug, Clone, PartialEq)]
pub enum NotifyError {
    /// The receiving side of the channel is gone.
    Disconnected,
    Transport(String),
    Status(u16),
}

impl fmt::Display for NotifyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NotifyError::Disconnected => write!(f, "notification receiver disconnected"),
            NotifyError::Transport(msg) => write!(f, "notification request failed: {}", msg),
            NotifyError::Status(code) => write!(f, "notification rejected with HTTP {}", code),
        }
    }
}

impl std::error::Error for NotifyError {}

impl From<reqwest::Error> for NotifyError {
    fn from(e: reqwest::Error) -> Self {
        match e.status() {
            Some(status) => NotifyError::Status(status.as_u16()),
            None => NotifyError::Transport(e.to_string()),
        }
    }
}

/// Receives the final outcome of a run.
pub trait CompletionNotifier: Send {
    fn notify(&self, run_id: &str, reason: &FinishReason) -> Result<(), NotifyError>;
}

/// Sends [`RunEvent::Finished`] over a crossbeam channel.
#[derive(Debug, Clone)]
pub struct ChannelNotifier {
    tx: Sender<RunEvent>,
}

impl ChannelNotifier {
    pub fn new(tx: Sender<RunEvent>) -> Self {
        Self { tx }
    }
}

impl CompletionNotifier for ChannelNotifier {
    fn notify(&self, run_id: &str, reason: &FinishReason) -> Result<(), NotifyError> {
        self.tx
            .send(RunEvent::Finished {
                run_id: run_id.to_string(),
                reason: reason.clone(),
            })
            .map_err(|_| NotifyError::Disconnected)
    }
}

/// POSTs `{"status": ...}` to `{base_url}/callbacks/{run_id}/experiment-completed`.
pub struct HttpNotifier {
    base_url: String,
    client: reqwest::blocking::Client,
}

impl HttpNotifier {
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

    pub fn new(base_url: impl Into<String>) -> Result<Self, NotifyError> {
        Self::with_timeout(base_url, Self::DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(base_url: impl Into<String>, timeout: Duration) -> Result<Self, NotifyError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()?;
        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client,
        })
    }

    /// Notifier for `API_SERVER_URL`, if set.
    pub fn from_env() -> Option<Result<Self, NotifyError>> {
        std::env::var("API_SERVER_URL")
            .ok()
            .filter(|url| !url.trim().is_empty())
            .map(Self::new)
    }

    pub fn callback_url(&self, run_id: &str) -> String {
        format!("{}/callbacks/{}/experiment-completed", self.base_url, run_id)
    }
}

impl CompletionNotifier for HttpNotifier {
    fn notify(&self, run_id: &str, reason: &FinishReason) -> Result<(), NotifyError> {
        let body = serde_json::json!({ "status": reason.status() });
        let response = self
            .client
            .post(self.callback_url(run_id))
            .json(&body)
            .send()?;
        let status = response.status();
        if !status.is_success() {
            return Err(NotifyError::Status(status.as_u16()));
        }
        log::info!("[HttpNotifier] run {} reported {}", run_id, reason.status());
        Ok(())
    }
}
