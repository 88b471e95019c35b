use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Response body for `GET /health`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    /// Always `"healthy"` when the relay itself answers.
    pub status: String,
    /// `"connected"`, `"error"` or `"disconnected"`.
    #[schema(example = "connected")]
    pub ollama: String,
    /// Number of sessions held in memory.
    pub sessions: usize,
    /// Name of the active speech backend.
    #[schema(example = "piper")]
    pub tts: String,
}
