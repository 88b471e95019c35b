//! Chat-completion client for a locally running Ollama service.
//!
//! Only the two endpoints the relay needs are covered: `POST /api/chat`
//! (non-streaming) and `GET /api/tags`, which serves as a liveness probe.

use std::time::Duration;

use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use strum::Display;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::message::{Message, Role};

/// Failure modes of a model call.
///
/// `Unavailable` and `Service` are kept apart because the remedies differ:
/// the first means nothing is listening, the second that Ollama answered but
/// refused or failed the request.
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("cannot connect to the model service at {url}")]
    Unavailable {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("model service returned HTTP {status}")]
    Service { status: u16 },

    #[error("model call failed: {0}")]
    Internal(String),
}

/// Result of probing the tag-listing endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ModelHealth {
    /// `/api/tags` answered 200.
    Connected,
    /// The service answered with any other status.
    Error,
    /// No answer at all.
    Disconnected,
}

#[derive(Debug, Clone)]
pub struct OllamaConfig {
    /// Service root, e.g. `http://localhost:11434`.
    pub base_url: String,
    /// Model tag sent with every chat request.
    pub model: String,
    /// Upper bound for a whole chat call.
    pub request_timeout: Duration,
    /// Upper bound for the health probe.
    pub probe_timeout: Duration,
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:11434".into(),
            model: "llama3.2:latest".into(),
            request_timeout: Duration::from_secs(60),
            probe_timeout: Duration::from_secs(5),
        }
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<WireMessage<'a>>,
    stream: bool,
}

#[derive(Serialize)]
struct WireMessage<'a> {
    role: &'static str,
    content: &'a str,
}

impl<'a> From<&'a Message> for WireMessage<'a> {
    fn from(msg: &'a Message) -> Self {
        let role = match msg.role {
            Role::System => "system",
            other => other.as_str(),
        };
        Self {
            role,
            content: &msg.content,
        }
    }
}

#[derive(Deserialize)]
struct ChatResponse {
    message: ReplyMessage,
}

#[derive(Deserialize)]
struct ReplyMessage {
    content: String,
}

#[derive(Debug, Clone)]
pub struct OllamaClient {
    config: OllamaConfig,
    client: Client,
}

impl OllamaClient {
    pub fn new(config: OllamaConfig) -> Result<Self, ModelError> {
        let client = Client::builder()
            .user_agent(concat!("rehearse/", env!("CARGO_PKG_VERSION")))
            .timeout(config.request_timeout)
            // The model service runs on this machine; never route it through
            // HTTP(S)_PROXY.
            .no_proxy()
            .build()
            .map_err(|e| ModelError::Internal(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { config, client })
    }

    pub fn model(&self) -> &str {
        &self.config.model
    }

    pub fn base_url(&self) -> &str {
        self.config.base_url.trim_end_matches('/')
    }

    /// Send the whole conversation and return the assistant's reply text.
    pub async fn complete(&self, messages: &[Message]) -> Result<String, ModelError> {
        let url = format!("{}/api/chat", self.base_url());
        let body = ChatRequest {
            model: &self.config.model,
            messages: messages.iter().map(WireMessage::from).collect(),
            stream: false,
        };

        debug!(url = %url, model = %self.config.model, message_count = messages.len(), "calling model service");

        let resp = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| self.classify(e, &url))?;

        let status = resp.status();
        if status != StatusCode::OK {
            warn!(url = %url, status = status.as_u16(), "model service rejected chat request");
            return Err(ModelError::Service {
                status: status.as_u16(),
            });
        }

        let reply: ChatResponse = resp
            .json()
            .await
            .map_err(|e| ModelError::Internal(format!("unexpected chat response body: {e}")))?;

        info!(model = %self.config.model, reply_len = reply.message.content.len(), "model reply received");
        Ok(reply.message.content)
    }

    /// Probe `GET /api/tags` with the short probe timeout.
    pub async fn probe(&self) -> ModelHealth {
        let url = format!("{}/api/tags", self.base_url());
        match self
            .client
            .get(&url)
            .timeout(self.config.probe_timeout)
            .send()
            .await
        {
            Ok(resp) if resp.status() == StatusCode::OK => ModelHealth::Connected,
            Ok(resp) => {
                debug!(status = resp.status().as_u16(), "model service probe returned non-200");
                ModelHealth::Error
            }
            Err(e) => {
                debug!(error = %e, "model service probe failed");
                ModelHealth::Disconnected
            }
        }
    }

    fn classify(&self, err: reqwest::Error, url: &str) -> ModelError {
        if err.is_connect() {
            warn!(url = %url, error = %err, "model service unreachable");
            ModelError::Unavailable {
                url: url.to_owned(),
                source: err,
            }
        } else if err.is_timeout() {
            ModelError::Internal(format!(
                "model service did not answer within {}s",
                self.config.request_timeout.as_secs()
            ))
        } else {
            ModelError::Internal(err.to_string())
        }
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────────
