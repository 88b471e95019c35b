//! Shared application state injected into every Axum handler.

use std::sync::Arc;

use rehearse_core::tts::load_backend;
use rehearse_core::{MemorySessionStore, OllamaClient, SpeechService};

use crate::config::Config;

/// State shared across all HTTP handlers.
#[derive(Clone, Debug)]
pub struct AppState {
    /// Server configuration (env-derived).
    pub config: Arc<Config>,
    /// Per-session message lists; volatile.
    pub sessions: Arc<MemorySessionStore>,
    /// Client for the Ollama chat service.
    pub model: Arc<OllamaClient>,
    /// Speech synthesis for assistant replies.
    pub speech: Arc<SpeechService>,
}

impl AppState {
    /// Build every component from `config`.
    ///
    /// The speech backend is constructed here, so a voice model that fails to
    /// load is reported during startup rather than on the first chat.
    pub fn from_config(config: Config) -> anyhow::Result<Self> {
        let model = OllamaClient::new(config.ollama())?;
        let backend = load_backend(&config.tts());
        let speech = SpeechService::new(backend, config.audio_dir.clone());

        Ok(Self {
            config: Arc::new(config),
            sessions: Arc::new(MemorySessionStore::new()),
            model: Arc::new(model),
            speech: Arc::new(speech),
        })
    }
}
