//! Building blocks of the rehearse mock-interview relay.
//!
//! - [`message`]: role-tagged conversation messages.
//! - [`session`]: the volatile session store (one message list per session id).
//! - [`ollama`]: the chat-completion client for a local Ollama service.
//! - [`tts`]: speech synthesis behind one [`tts::TtsBackend`] interface.
//! - [`feedback`]: turns free-form model critique into a [`feedback::FeedbackRecord`].
//!
//! The HTTP surface lives in the `rehearse-server` crate.

pub mod feedback;
pub mod message;
pub mod ollama;
pub mod session;
pub mod tts;

pub use feedback::{FeedbackRecord, parse_feedback};
pub use message::{Message, Role};
pub use ollama::{ModelError, ModelHealth, OllamaClient, OllamaConfig};
pub use session::{MemorySessionStore, SessionStore};
pub use tts::{SpeechService, TtsBackend, TtsError, TtsSettings};
