//! Volatile per-session conversation storage.
//!
//! [`SessionStore`] is the seam handlers talk to; [`MemorySessionStore`] is
//! the only implementation and keeps everything in process memory, so all
//! sessions are lost on restart.
//!
//! Every [`SessionStore::put`] replaces the stored list wholesale. Two
//! concurrent writers for the same id are not serialized against each other:
//! whichever write lands last is what [`SessionStore::get`] returns.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{PoisonError, RwLock};

use crate::message::Message;

pub trait SessionStore: Send + Sync + 'static {
    /// Replace the message list of `session_id`, returning the previous one.
    fn put(
        &self,
        session_id: &str,
        messages: Vec<Message>,
    ) -> impl Future<Output = Option<Vec<Message>>> + Send;

    fn get(&self, session_id: &str) -> impl Future<Output = Option<Vec<Message>>> + Send;

    /// Number of sessions currently held.
    fn count(&self) -> impl Future<Output = usize> + Send;
}

#[derive(Debug, Default)]
pub struct MemorySessionStore {
    sessions: RwLock<HashMap<String, Vec<Message>>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionStore for MemorySessionStore {
    async fn put(&self, session_id: &str, messages: Vec<Message>) -> Option<Vec<Message>> {
        // A panicked writer cannot leave a half-written entry behind (insert
        // is a single move), so a poisoned map is still consistent.
        let mut map = self.sessions.write().unwrap_or_else(PoisonError::into_inner);
        map.insert(session_id.to_owned(), messages)
    }

    async fn get(&self, session_id: &str) -> Option<Vec<Message>> {
        let map = self.sessions.read().unwrap_or_else(PoisonError::into_inner);
        map.get(session_id).cloned()
    }

    async fn count(&self) -> usize {
        self.sessions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}
