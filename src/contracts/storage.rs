//! Storage contract (§6)
//!
//! `getSettings`, `getConversations`, `saveConversation`, `getSchedules` are
//! all opaque to the core; this module only carries the trait and a minimal
//! in-memory adapter so the agent loop and tests have something to hand
//! transcripts to at the run boundary.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::core::{Message, Result};

/// Opaque provider settings, as returned by `getSettings`
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Settings {
    pub api_key: Option<String>,
    pub api_base_url: Option<String>,
    pub model: Option<String>,
}

/// A persisted conversation, as returned by `getConversations`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conversation {
    pub id: String,
    pub messages: Vec<Message>,
}

/// A scheduled-task descriptor, as returned by `getSchedules` (out of scope
/// beyond the shape needed to satisfy the contract — the alarm/timer system
/// that fires these lives outside the core, per §6).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Schedule {
    pub task_id: String,
    pub prompt: String,
}

/// The storage contract the core hands its transcripts to at run boundaries
#[async_trait]
pub trait ConversationStore: Send + Sync {
    async fn get_settings(&self) -> Result<Settings>;
    async fn get_conversations(&self) -> Result<Vec<Conversation>>;
    async fn save_conversation(&self, conversation: Conversation) -> Result<()>;
    async fn get_schedules(&self) -> Result<Vec<Schedule>>;
}

/// In-memory `ConversationStore`, sufficient to exercise the agent loop and
/// research orchestrator without a real persistence backend.
#[derive(Default)]
pub struct InMemoryConversationStore {
    settings: Settings,
    conversations: Mutex<Vec<Conversation>>,
}

impl InMemoryConversationStore {
    pub fn new(settings: Settings) -> Self {
        Self {
            settings,
            conversations: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl ConversationStore for InMemoryConversationStore {
    async fn get_settings(&self) -> Result<Settings> {
        Ok(self.settings.clone())
    }

    async fn get_conversations(&self) -> Result<Vec<Conversation>> {
        Ok(self.conversations.lock().await.clone())
    }

    async fn save_conversation(&self, conversation: Conversation) -> Result<()> {
        let mut guard = self.conversations.lock().await;
        if let Some(existing) = guard.iter_mut().find(|c| c.id == conversation.id) {
            *existing = conversation;
        } else {
            guard.push(conversation);
        }
        Ok(())
    }

    async fn get_schedules(&self) -> Result<Vec<Schedule>> {
        Ok(Vec::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn save_conversation_then_list() {
        let store = InMemoryConversationStore::default();
        store
            .save_conversation(Conversation {
                id: "c1".into(),
                messages: vec![],
            })
            .await
            .unwrap();

        let all = store.get_conversations().await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].id, "c1");
    }

    #[tokio::test]
    async fn save_conversation_upserts_by_id() {
        let store = InMemoryConversationStore::default();
        store
            .save_conversation(Conversation { id: "c1".into(), messages: vec![] })
            .await
            .unwrap();
        store
            .save_conversation(Conversation {
                id: "c1".into(),
                messages: vec![Message::user(1, "hi", 0)],
            })
            .await
            .unwrap();

        let all = store.get_conversations().await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].messages.len(), 1);
    }
}
