//! Shared application state.

use crate::users::UserStore;
use docrag_knowledge::rag::AskPipeline;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub sender: String,
    pub text: String,
    pub time: String,
}

/// Chat messages per email, in arrival order. Not persisted.
#[derive(Debug, Default)]
pub struct ChatHistoryStore {
    chats: RwLock<HashMap<String, Vec<ChatMessage>>>,
}

impl ChatHistoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&self, email: &str, message: ChatMessage) {
        let mut chats = self
            .chats
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        chats.entry(email.to_string()).or_default().push(message);
    }

    /// Messages for `email`; empty when unknown.
    pub fn history(&self, email: &str) -> Vec<ChatMessage> {
        let chats = self
            .chats
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        chats.get(email).cloned().unwrap_or_default()
    }
}

/// State handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<AskPipeline>,
    pub users: Arc<UserStore>,
    pub chats: Arc<ChatHistoryStore>,
}

impl AppState {
    pub fn new(pipeline: Arc<AskPipeline>) -> Self {
        Self {
            pipeline,
            users: Arc::new(UserStore::new()),
            chats: Arc::new(ChatHistoryStore::new()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_history_per_email() {
        let store = ChatHistoryStore::new();
        let msg = |text: &str| ChatMessage {
            sender: "user".to_string(),
            text: text.to_string(),
            time: "10:00".to_string(),
        };

        store.append("a@example.com", msg("hello"));
        store.append("a@example.com", msg("again"));
        store.append("b@example.com", msg("other"));

        let history = store.history("a@example.com");
        assert_eq!(history.len(), 2);
        assert_eq!(history[1].text, "again");
        assert!(store.history("nobody@example.com").is_empty());
    }
}
