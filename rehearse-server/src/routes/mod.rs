//! Axum router construction.
//!
//! [`build`] assembles the complete application router, including:
//! - Middleware layers (CORS, per-request trace-ID injection)
//! - Optional OpenAPI document (disable with `REHEARSE_ENABLE_DOCS=false`)
//! - The root listing and health routes
//! - The interview routes `/chat` and `/feedback`
//! - Static serving of synthesized speech under `/audio`

mod chat;
pub mod doc;
mod feedback;
mod health;
mod root;
#[cfg(test)]
pub(crate) mod testing;

use std::sync::Arc;

use axum::routing::get;
use axum::{Json, Router, middleware};
use rehearse_core::tts::AUDIO_URL_PREFIX;
use tower_http::services::ServeDir;

use crate::middleware::{cors, trace};
use crate::state::AppState;

// ── Router builder ────────────────────────────────────────────────────────────

/// Build the complete Axum [`Router`] for the application.
pub fn build(state: Arc<AppState>) -> Router {
    let api_router = Router::new()
        .merge(root::router())
        .merge(health::router())
        .merge(chat::router())
        .merge(feedback::router());

    let mut app = Router::new()
        .merge(api_router)
        .nest_service(AUDIO_URL_PREFIX, ServeDir::new(state.speech.audio_dir()));

    if state.config.enable_docs {
        let api_doc = doc::get_docs();
        app = app.route(
            "/api-docs/openapi.json",
            get(move || {
                let api_doc = api_doc.clone();
                async move { Json(api_doc) }
            }),
        );
    }

    app
        // Outermost layers execute first on the way in.
        .layer(cors::cors_layer(&state.config))
        .layer(middleware::from_fn(trace::trace_middleware))
        .with_state(state)
}

// ── Tests ──────────────────────────────────────────────────────────────────────
