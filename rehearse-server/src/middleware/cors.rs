use tower_http::cors::{Any, CorsLayer};

use crate::config::Config;

/// CORS for the browser extension front-end.
///
/// `REHEARSE_CORS_ORIGINS` narrows the allowed origins; without it (or when
/// none of its entries parse) every origin is accepted.
pub fn cors_layer(config: &Config) -> CorsLayer {
    let origins: Vec<http::HeaderValue> = config
        .cors_allowed_origins
        .as_deref()
        .unwrap_or_default()
        .split(',')
        .filter_map(|s| s.trim().parse().ok())
        .collect();

    let layer = CorsLayer::new().allow_headers(Any).allow_methods(Any);
    if origins.is_empty() {
        layer.allow_origin(Any)
    } else {
        layer.allow_origin(origins)
    }
}
