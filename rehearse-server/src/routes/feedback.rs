//! End-of-session feedback endpoint.

use std::sync::Arc;

use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use rehearse_core::feedback::feedback_request;
use rehearse_core::parse_feedback;
use tracing::info;
use utoipa::OpenApi;

use crate::error::ServerError;
use crate::schemas::chat::ChatRequest;
use crate::schemas::feedback::{Feedback, FeedbackResponse};
use crate::state::AppState;

#[derive(OpenApi)]
#[openapi(paths(feedback), components(schemas(Feedback, FeedbackResponse)))]
pub struct FeedbackApi;

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/feedback", post(feedback))
}

/// Ask the model to critique the interview and split its answer into
/// strengths, weaknesses and one improvement.
///
/// Reads nothing from and writes nothing to the session store.
#[utoipa::path(
    post,
    path = "/feedback",
    tag = "interview",
    request_body = ChatRequest,
    responses(
        (status = 200, description = "Structured feedback", body = FeedbackResponse),
        (status = 422, description = "Malformed request body"),
        (status = 502, description = "Ollama answered with an error"),
        (status = 503, description = "Ollama is unreachable"),
    )
)]
pub async fn feedback(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ChatRequest>,
) -> Result<Json<FeedbackResponse>, ServerError> {
    let session_id = req.session_id.clone();
    let prompt = feedback_request(req.into_messages());

    let reply = state.model.complete(&prompt).await?;
    let record = parse_feedback(&reply);
    info!(session_id = %session_id, "feedback generated");

    Ok(Json(FeedbackResponse {
        feedback: record.into(),
    }))
}

// ── Tests ──────────────────────────────────────────────────────────────────────
