//! Interview turn endpoint.

use std::sync::Arc;

use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use rehearse_core::SessionStore;
use tracing::{debug, info};
use utoipa::OpenApi;

use crate::error::ServerError;
use crate::schemas::chat::{ChatMessage, ChatRequest, ChatResponse};
use crate::state::AppState;

#[derive(OpenApi)]
#[openapi(
    paths(chat),
    components(schemas(ChatMessage, ChatRequest, ChatResponse))
)]
pub struct ChatApi;

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/chat", post(chat))
}

/// Relay one interview turn to the model.
///
/// The session's stored history is replaced by `messages` before the model is
/// called, so it is updated even when the call fails. The reply is spoken when
/// a speech backend is available; otherwise `audio_url` is `null`.
#[utoipa::path(
    post,
    path = "/chat",
    tag = "interview",
    request_body = ChatRequest,
    responses(
        (status = 200, description = "Interviewer reply", body = ChatResponse),
        (status = 422, description = "Malformed request body"),
        (status = 502, description = "Ollama answered with an error"),
        (status = 503, description = "Ollama is unreachable"),
    )
)]
pub async fn chat(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, ServerError> {
    let session_id = req.session_id.clone();
    let messages = req.into_messages();
    debug!(session_id = %session_id, messages = messages.len(), "chat turn");

    state.sessions.put(&session_id, messages.clone()).await;

    let reply = state.model.complete(&messages).await?;
    let audio_url = state.speech.speak(&reply, &session_id).await;
    info!(
        session_id = %session_id,
        reply_chars = reply.chars().count(),
        audio = audio_url.is_some(),
        "chat reply ready"
    );

    Ok(Json(ChatResponse {
        message: reply,
        audio_url,
    }))
}

// ── Tests ──────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod test {
    use crate::routes::build;
    use crate::routes::testing::{SilentVoice, closed_port_url, get, mock_ollama, post_json, send, test_state};
    use axum::http::StatusCode;
    use rehearse_core::tts::{DisabledTts, PiperProcess};
    use rehearse_core::{Message, SessionStore};
    use serde_json::{Value, json};
    use std::sync::Arc;
    use std::time::Duration;
    use tower::ServiceExt;

    fn turn(session_id: &str, messages: Value) -> Value {
        json!({ "session_id": session_id, "messages": messages })
    }

    #[tokio::test]
    async fn reply_is_returned_as_message() {
        let (url, seen) = mock_ollama(200, "Tell me about a project you led.").await;
        let (state, _dir) = test_state(url, Arc::new(DisabledTts));

        let body = turn(
            "s1",
            json!([
                { "role": "system", "content": "You are an interviewer." },
                { "role": "user", "content": "Ready." },
            ]),
        );
        let (status, resp) = send(build(state), post_json("/chat", body)).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            resp,
            json!({ "message": "Tell me about a project you led.", "audio_url": null })
        );
        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0]["messages"][1], json!({ "role": "user", "content": "Ready." }));
        assert_eq!(seen[0]["stream"], false);
    }

    #[tokio::test]
    async fn second_turn_overwrites_session() {
        let (url, _) = mock_ollama(200, "ok").await;
        let (state, _dir) = test_state(url, Arc::new(DisabledTts));
        let app = build(state.clone());

        let first = json!([{ "role": "user", "content": "one" }]);
        let second = json!([
            { "role": "user", "content": "one" },
            { "role": "assistant", "content": "ok" },
            { "role": "user", "content": "two" },
        ]);
        send(app.clone(), post_json("/chat", turn("s1", first))).await;
        send(app, post_json("/chat", turn("s1", second))).await;

        let stored = state.sessions.get("s1").await.unwrap();
        assert_eq!(
            stored,
            vec![Message::user("one"), Message::assistant("ok"), Message::user("two")]
        );
        assert_eq!(state.sessions.count().await, 1);
    }

    #[tokio::test]
    async fn session_is_stored_even_when_model_fails() {
        let (state, _dir) = test_state(closed_port_url().await, Arc::new(DisabledTts));
        let body = turn("s9", json!([{ "role": "user", "content": "hello?" }]));
        let (status, _) = send(build(state.clone()), post_json("/chat", body)).await;

        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(state.sessions.get("s9").await, Some(vec![Message::user("hello?")]));
    }

    #[tokio::test]
    async fn upstream_error_is_bad_gateway() {
        let (url, _) = mock_ollama(404, "model 'llama3.2:latest' not found").await;
        let (state, _dir) = test_state(url, Arc::new(DisabledTts));
        let body = turn("s1", json!([{ "role": "user", "content": "hi" }]));
        let (status, resp) = send(build(state), post_json("/chat", body)).await;

        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(resp["error"], "Ollama API error: 404");
    }

    #[tokio::test]
    async fn unreachable_model_is_service_unavailable() {
        let (state, _dir) = test_state(closed_port_url().await, Arc::new(DisabledTts));
        let body = turn("s1", json!([{ "role": "user", "content": "hi" }]));
        let (status, resp) = send(build(state), post_json("/chat", body)).await;

        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(
            resp["error"],
            "Cannot connect to Ollama. Make sure Ollama is running (ollama serve)"
        );
    }

    #[tokio::test]
    async fn unknown_role_is_rejected() {
        let (url, seen) = mock_ollama(200, "ok").await;
        let (state, _dir) = test_state(url, Arc::new(DisabledTts));
        let body = turn("s1", json!([{ "role": "moderator", "content": "hi" }]));
        let resp = build(state.clone()).oneshot(post_json("/chat", body)).await.unwrap();

        assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert!(seen.lock().unwrap().is_empty());
        assert_eq!(state.sessions.count().await, 0);
    }

    #[tokio::test]
    async fn missing_speech_engine_still_answers() {
        let (url, _) = mock_ollama(200, "Why this role?").await;
        let piper = PiperProcess::new(
            "rehearse-test-no-such-piper",
            "en_US-lessac-medium",
            Duration::from_secs(5),
        );
        let (state, dir) = test_state(url, Arc::new(piper));
        let body = turn("s1", json!([{ "role": "user", "content": "hi" }]));
        let (status, resp) = send(build(state), post_json("/chat", body)).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(resp["message"], "Why this role?");
        assert_eq!(resp["audio_url"], Value::Null);
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn spoken_reply_is_served_under_audio() {
        let reply = "Walk me through \"your\" resume.";
        let (url, _) = mock_ollama(200, reply).await;
        let voice = Arc::new(SilentVoice::default());
        let (state, dir) = test_state(url, voice.clone());
        let app = build(state);

        let body = turn("s1", json!([{ "role": "user", "content": "hi" }]));
        let (status, resp) = send(app.clone(), post_json("/chat", body)).await;
        assert_eq!(status, StatusCode::OK);

        let expected = format!("/audio/speech_s1_{}.wav", reply.chars().count());
        assert_eq!(resp["audio_url"], expected.as_str());
        assert!(dir.path().join(&expected["/audio/".len()..]).is_file());
        assert_eq!(
            *voice.received.lock().unwrap(),
            vec!["Walk me through 'your' resume.".to_owned()]
        );

        let served = app.oneshot(get(&expected)).await.unwrap();
        assert_eq!(served.status(), StatusCode::OK);
    }
}
