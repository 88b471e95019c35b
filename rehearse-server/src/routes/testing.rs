//! Shared fixtures for router tests.

use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::body::Body;
use axum::extract::State;
use axum::http::{Request, StatusCode};
use axum::routing::{get as get_route, post};
use axum::{Json, Router};
use http_body_util::BodyExt;
use rehearse_core::{MemorySessionStore, OllamaClient, SpeechService, TtsBackend, TtsError};
use serde_json::{Value, json};
use tempfile::TempDir;
use tower::ServiceExt;

use crate::config::Config;
use crate::state::AppState;

/// Minimal 44-byte PCM WAV header with no samples.
pub(crate) const EMPTY_WAV: &[u8] = b"RIFF\x24\x00\x00\x00WAVEfmt \x10\x00\x00\x00\x01\x00\x01\x00\x22\x56\x00\x00\x44\xac\x00\x00\x02\x00\x10\x00data\x00\x00\x00\x00";

/// Request bodies received by a mock Ollama, in arrival order.
pub(crate) type Seen = Arc<Mutex<Vec<Value>>>;

/// Start a stand-in Ollama on a loopback port.
///
/// `/api/chat` answers `status`; a 200 carries `reply` as the assistant
/// content. `/api/tags` answers the same status.
pub(crate) async fn mock_ollama(status: u16, reply: &str) -> (String, Seen) {
    let seen: Seen = Arc::default();
    let body = if status == 200 {
        json!({ "model": "llama3.2:latest", "message": { "role": "assistant", "content": reply }, "done": true })
    } else {
        json!({ "error": reply })
    };
    let code = StatusCode::from_u16(status).unwrap();

    let app = Router::new()
        .route(
            "/api/chat",
            post(move |State(seen): State<Seen>, Json(req): Json<Value>| {
                let body = body.clone();
                async move {
                    seen.lock().unwrap().push(req);
                    (code, Json(body))
                }
            }),
        )
        .route("/api/tags", get_route(move || async move { (code, Json(json!({ "models": [] }))) }))
        .with_state(seen.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (format!("http://{addr}"), seen)
}

/// A loopback URL on which nothing is listening.
pub(crate) async fn closed_port_url() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{addr}")
}

/// Speech backend that writes a valid, silent WAV file.
#[derive(Debug, Default)]
pub(crate) struct SilentVoice {
    pub received: Mutex<Vec<String>>,
}

#[async_trait]
impl TtsBackend for SilentVoice {
    fn name(&self) -> &'static str {
        "silent"
    }

    async fn check(&self) -> Result<String, TtsError> {
        Ok("silent".into())
    }

    async fn synthesize(&self, text: &str, output: &Path) -> Result<(), TtsError> {
        self.received.lock().unwrap().push(text.to_owned());
        Ok(tokio::fs::write(output, EMPTY_WAV).await?)
    }
}

/// Application state talking to `ollama_url`, with audio written to a fresh
/// temporary directory that lives as long as the returned guard.
pub(crate) fn test_state(ollama_url: String, tts: Arc<dyn TtsBackend>) -> (Arc<AppState>, TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let config = Config {
        ollama_url,
        ollama_timeout_secs: 5,
        health_timeout_secs: 1,
        audio_dir: dir.path().to_path_buf(),
        ..Config::default()
    };
    let state = AppState {
        model: Arc::new(OllamaClient::new(config.ollama()).unwrap()),
        speech: Arc::new(SpeechService::new(tts, config.audio_dir.clone())),
        sessions: Arc::new(MemorySessionStore::new()),
        config: Arc::new(config),
    };
    (Arc::new(state), dir)
}

pub(crate) fn get(uri: &str) -> Request<Body> {
    Request::get(uri).body(Body::empty()).unwrap()
}

pub(crate) fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::post(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

/// Drive `app` with one request and decode the JSON response body.
pub(crate) async fn send(app: Router, req: Request<Body>) -> (StatusCode, Value) {
    let resp = app.oneshot(req).await.unwrap();
    let status = resp.status();
    let bytes = resp.into_body().collect().await.unwrap().to_bytes();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, body)
}
