use utoipa::OpenApi;

use crate::routes::chat::ChatApi;
use crate::routes::feedback::FeedbackApi;
use crate::routes::health::HealthApi;
use crate::routes::root::RootApi;

#[derive(OpenApi)]
#[openapi(info(
    title = "rehearse-server",
    description = "Mock interview relay API",
    version = "0.1.0",
))]
pub struct ApiDoc;

pub fn get_docs() -> utoipa::openapi::OpenApi {
    let mut root = ApiDoc::openapi();
    root.merge(RootApi::openapi());
    root.merge(HealthApi::openapi());
    root.merge(ChatApi::openapi());
    root.merge(FeedbackApi::openapi());
    root
}
