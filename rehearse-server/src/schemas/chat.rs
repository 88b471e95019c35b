//! Conversation request / response types shared by `/chat` and `/feedback`.

use rehearse_core::{Message, Role};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// A single message in the conversation history.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ChatMessage {
    /// The role of the message author (`"system"`, `"user"`, `"assistant"`).
    #[schema(value_type = String, example = "user")]
    pub role: Role,
    /// The content of the message.
    pub content: String,
}

impl From<ChatMessage> for Message {
    fn from(m: ChatMessage) -> Self {
        Message::new(m.role, m.content)
    }
}

/// Request body for `POST /chat` and `POST /feedback`.
///
/// `messages` is the whole conversation so far; the client owns the history.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ChatRequest {
    pub messages: Vec<ChatMessage>,
    pub session_id: String,
}

impl ChatRequest {
    pub fn into_messages(self) -> Vec<Message> {
        self.messages.into_iter().map(Message::from).collect()
    }
}

/// Response body for `POST /chat`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ChatResponse {
    /// The interviewer's reply.
    pub message: String,
    /// Relative URL of the spoken reply, or `null` when no audio was produced.
    pub audio_url: Option<String>,
}
