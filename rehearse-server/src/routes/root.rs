//! Service banner listing the available endpoints.

use std::sync::Arc;

use axum::routing::get;
use axum::{Json, Router};
use serde_json::{Value, json};
use utoipa::OpenApi;

use crate::state::AppState;

#[derive(OpenApi)]
#[openapi(paths(get_root))]
pub struct RootApi;

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/", get(get_root))
}

#[utoipa::path(
    get,
    path = "/",
    tag = "meta",
    responses(
        (status = 200, description = "Service name and endpoint listing", body = Value)
    )
)]
pub async fn get_root() -> Json<Value> {
    Json(json!({
        "message": "Mock Interview API",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": {
            "/chat": "POST - Send chat messages",
            "/feedback": "POST - Get end-of-session feedback",
            "/health": "GET - Check API health",
        },
    }))
}
