//! Server configuration, loaded from environment variables at startup.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use rehearse_core::OllamaConfig;
use rehearse_core::TtsSettings;
use rehearse_core::tts::BackendKind;

/// Runtime configuration for rehearse-server.
///
/// Every field has a default so the server runs against a stock local
/// Ollama and `piper` install without any environment variables set.
#[derive(Debug, Clone)]
pub struct Config {
    /// TCP address to bind (default: `"0.0.0.0:8000"`).
    pub bind_address: String,

    /// Root URL of the Ollama service.
    pub ollama_url: String,

    /// Model tag used for every chat call.
    pub ollama_model: String,

    /// Upper bound on a single chat call, in seconds.
    pub ollama_timeout_secs: u64,

    /// Upper bound on the `/health` probe of Ollama, in seconds.
    pub health_timeout_secs: u64,

    /// Speech backend: `piper`, `onnx` or `disabled`.
    pub tts_backend: BackendKind,

    pub piper_bin: String,
    pub piper_voice: String,
    pub piper_timeout_secs: u64,

    /// Piper voice model and its JSON config for the `onnx` backend.
    pub onnx_model: PathBuf,
    pub onnx_config: PathBuf,
    /// Upper bound on loading ONNX Runtime and the voice, in seconds.
    pub onnx_load_timeout_secs: u64,

    /// Directory generated WAV files are written to and served from.
    pub audio_dir: PathBuf,

    /// `tracing` filter string, e.g. `"info"` or `"debug,tower_http=warn"`.
    pub log_level: String,

    /// When `true`, emit log records as newline-delimited JSON.
    pub log_json: bool,

    /// Comma-separated list of allowed CORS origins; `None` allows any.
    pub cors_allowed_origins: Option<String>,

    /// Serve the OpenAPI document at `/api-docs/openapi.json`.
    pub enable_docs: bool,
}

impl Default for Config {
    fn default() -> Self {
        let tts = TtsSettings::default();
        Self {
            bind_address: "0.0.0.0:8000".into(),
            ollama_url: "http://localhost:11434".into(),
            ollama_model: "llama3.2:latest".into(),
            ollama_timeout_secs: 60,
            health_timeout_secs: 5,
            tts_backend: tts.backend,
            piper_bin: tts.piper_bin,
            piper_voice: tts.piper_voice,
            piper_timeout_secs: tts.piper_timeout.as_secs(),
            onnx_model: tts.onnx_model,
            onnx_config: tts.onnx_config,
            onnx_load_timeout_secs: tts.onnx_load_timeout.as_secs(),
            audio_dir: PathBuf::from("audio"),
            log_level: "info".into(),
            log_json: false,
            cors_allowed_origins: None,
            enable_docs: true,
        }
    }
}

impl Config {
    /// Build [`Config`] from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        let d = Self::default();
        Self {
            bind_address: env_or("REHEARSE_BIND", &d.bind_address),
            ollama_url: env_or("REHEARSE_OLLAMA_URL", &d.ollama_url),
            ollama_model: env_or("REHEARSE_OLLAMA_MODEL", &d.ollama_model),
            ollama_timeout_secs: parse_env("REHEARSE_OLLAMA_TIMEOUT_SECS", d.ollama_timeout_secs),
            health_timeout_secs: parse_env("REHEARSE_HEALTH_TIMEOUT_SECS", d.health_timeout_secs),
            tts_backend: parse_env("REHEARSE_TTS_BACKEND", d.tts_backend),
            piper_bin: env_or("REHEARSE_PIPER_BIN", &d.piper_bin),
            piper_voice: env_or("REHEARSE_PIPER_VOICE", &d.piper_voice),
            piper_timeout_secs: parse_env("REHEARSE_PIPER_TIMEOUT_SECS", d.piper_timeout_secs),
            onnx_model: parse_env("REHEARSE_ONNX_MODEL", d.onnx_model),
            onnx_config: parse_env("REHEARSE_ONNX_CONFIG", d.onnx_config),
            onnx_load_timeout_secs: parse_env("REHEARSE_ONNX_LOAD_TIMEOUT_SECS", d.onnx_load_timeout_secs),
            audio_dir: parse_env("REHEARSE_AUDIO_DIR", d.audio_dir),
            log_level: env_or("REHEARSE_LOG", &d.log_level),
            log_json: parse_flag("REHEARSE_LOG_JSON", d.log_json),
            cors_allowed_origins: std::env::var("REHEARSE_CORS_ORIGINS").ok(),
            enable_docs: parse_flag("REHEARSE_ENABLE_DOCS", d.enable_docs),
        }
    }

    pub fn ollama(&self) -> OllamaConfig {
        OllamaConfig {
            base_url: self.ollama_url.clone(),
            model: self.ollama_model.clone(),
            request_timeout: Duration::from_secs(self.ollama_timeout_secs),
            probe_timeout: Duration::from_secs(self.health_timeout_secs),
        }
    }

    pub fn tts(&self) -> TtsSettings {
        TtsSettings {
            backend: self.tts_backend,
            piper_bin: self.piper_bin.clone(),
            piper_voice: self.piper_voice.clone(),
            piper_timeout: Duration::from_secs(self.piper_timeout_secs),
            onnx_model: self.onnx_model.clone(),
            onnx_config: self.onnx_config.clone(),
            onnx_load_timeout: Duration::from_secs(self.onnx_load_timeout_secs),
        }
    }
}

// ── private helpers ──────────────────────────────────────────────────────────

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_owned())
}

fn parse_env<T: FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn parse_flag(key: &str, default: bool) -> bool {
    std::env::var(key)
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
        .unwrap_or(default)
}
