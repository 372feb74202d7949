//! Conversation store trait — durable, append-only message history.
//!
//! Real persistence lives in the host application; the core only ever
//! appends and reads back in ascending timestamp order at startup. The
//! in-memory implementation here is the reference backend used by tests
//! and by hosts that opt out of durability.

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::error::StoreError;
use crate::message::Message;

/// Append-only, timestamp-ordered message log.
#[async_trait]
pub trait ConversationStore: Send + Sync {
    /// The backend name (e.g., "memory", "sqlite").
    fn name(&self) -> &str;

    /// Append a message to the log.
    async fn append(&self, message: Message) -> std::result::Result<(), StoreError>;

    /// Load the full history in ascending timestamp order.
    async fn load(&self) -> std::result::Result<Vec<Message>, StoreError>;

    /// Remove all stored messages.
    async fn clear(&self) -> std::result::Result<(), StoreError>;
}

/// In-memory reference implementation.
#[derive(Default)]
pub struct InMemoryStore {
    messages: Mutex<Vec<Message>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ConversationStore for InMemoryStore {
    fn name(&self) -> &str {
        "memory"
    }

    async fn append(&self, message: Message) -> std::result::Result<(), StoreError> {
        self.messages.lock().await.push(message);
        Ok(())
    }

    async fn load(&self) -> std::result::Result<Vec<Message>, StoreError> {
        let mut messages = self.messages.lock().await.clone();
        messages.sort_by_key(|m| m.timestamp);
        Ok(messages)
    }

    async fn clear(&self) -> std::result::Result<(), StoreError> {
        self.messages.lock().await.clear();
        Ok(())
    }
}
