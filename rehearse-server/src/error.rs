//! Unified server error type.
//!
//! Every handler returns `Result<T, ServerError>`, which implements
//! [`axum::response::IntoResponse`] so errors become a JSON body
//! `{"error": "..."}` with a matching status code.
//!
//! Model-service failures keep their distinction on the wire: an unreachable
//! Ollama is `503`, an Ollama that answered with an error is `502`. Anything
//! else is logged in full and reported as a generic `500`.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use rehearse_core::ModelError;
use serde_json::json;
use thiserror::Error;
use tracing::error;

#[derive(Debug, Error)]
pub enum ServerError {
    /// Propagated from the Ollama client.
    #[error(transparent)]
    Model(#[from] ModelError),

    /// An unclassified internal server error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl ServerError {
    pub fn status(&self) -> StatusCode {
        match self {
            ServerError::Model(ModelError::Unavailable { .. }) => StatusCode::SERVICE_UNAVAILABLE,
            ServerError::Model(ModelError::Service { .. }) => StatusCode::BAD_GATEWAY,
            ServerError::Model(ModelError::Internal(_)) | ServerError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let client_message = match &self {
            ServerError::Model(ModelError::Unavailable { url, source }) => {
                error!(url = %url, error = %source, "model service unreachable");
                "Cannot connect to Ollama. Make sure Ollama is running (ollama serve)".to_owned()
            }
            ServerError::Model(ModelError::Service { status }) => {
                format!("Ollama API error: {status}")
            }
            ServerError::Model(ModelError::Internal(m)) => {
                error!(message = %m, "model call failed");
                "error calling the model service".to_owned()
            }
            ServerError::Internal(m) => {
                error!(message = %m, "internal server error");
                "internal server error".to_owned()
            }
        };
        (self.status(), Json(json!({ "error": client_message }))).into_response()
    }
}

impl From<anyhow::Error> for ServerError {
    fn from(e: anyhow::Error) -> Self {
        error!(error = ?e, "converting anyhow error to ServerError::Internal");
        ServerError::Internal(e.to_string())
    }
}
