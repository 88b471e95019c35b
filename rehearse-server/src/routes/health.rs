//! Health endpoint.

use std::sync::Arc;

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use rehearse_core::SessionStore;
use utoipa::OpenApi;

use crate::schemas::health::HealthResponse;
use crate::state::AppState;

#[derive(OpenApi)]
#[openapi(paths(get_health), components(schemas(HealthResponse)))]
pub struct HealthApi;

/// Register health-check routes.
pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/health", get(get_health))
}

/// Report relay, model-service and speech status.
///
/// Always answers 200; a down Ollama shows up in the `ollama` field rather
/// than as an error status. The probe is bounded by the health timeout.
#[utoipa::path(
    get,
    path = "/health",
    tag = "health",
    responses(
        (status = 200, description = "Relay is up", body = HealthResponse)
    )
)]
pub async fn get_health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let ollama = state.model.probe().await;
    Json(HealthResponse {
        status: "healthy".into(),
        ollama: ollama.to_string(),
        sessions: state.sessions.count().await,
        tts: state.speech.backend_name().into(),
    })
}

// ── Tests ──────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod test {
    use crate::routes::build;
    use crate::routes::testing::{closed_port_url, get, mock_ollama, post_json, send, test_state};
    use axum::http::StatusCode;
    use rehearse_core::tts::DisabledTts;
    use serde_json::json;
    use std::sync::Arc;

    #[tokio::test]
    async fn reachable_ollama_is_connected() {
        let (url, _) = mock_ollama(200, "").await;
        let (state, _dir) = test_state(url, Arc::new(DisabledTts));
        let (status, body) = send(build(state), get("/health")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body,
            json!({ "status": "healthy", "ollama": "connected", "sessions": 0, "tts": "disabled" })
        );
    }

    #[tokio::test]
    async fn failing_ollama_is_error() {
        let (url, _) = mock_ollama(500, "overloaded").await;
        let (state, _dir) = test_state(url, Arc::new(DisabledTts));
        let (status, body) = send(build(state), get("/health")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["ollama"], "error");
    }

    #[tokio::test]
    async fn unreachable_ollama_is_disconnected() {
        let (state, _dir) = test_state(closed_port_url().await, Arc::new(DisabledTts));
        let (status, body) = send(build(state), get("/health")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["ollama"], "disconnected");
    }

    #[tokio::test]
    async fn session_count_follows_chats() {
        let (url, _) = mock_ollama(200, "Next question.").await;
        let (state, _dir) = test_state(url, Arc::new(DisabledTts));
        let app = build(state);

        for id in ["a", "b", "a"] {
            let req = post_json(
                "/chat",
                json!({ "session_id": id, "messages": [{ "role": "user", "content": "hi" }] }),
            );
            let (status, _) = send(app.clone(), req).await;
            assert_eq!(status, StatusCode::OK);
        }

        let (_, body) = send(app, get("/health")).await;
        assert_eq!(body["sessions"], 2);
    }
}
