use rehearse_core::FeedbackRecord;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Structured end-of-session critique.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Feedback {
    pub strengths: String,
    pub weaknesses: String,
    pub improvement: String,
}

impl From<FeedbackRecord> for Feedback {
    fn from(r: FeedbackRecord) -> Self {
        Self {
            strengths: r.strengths,
            weaknesses: r.weaknesses,
            improvement: r.improvement,
        }
    }
}

/// Response body for `POST /feedback`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct FeedbackResponse {
    pub feedback: Feedback,
}
