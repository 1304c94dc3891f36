//! History store: the persistence seam.
//!
//! The engine owns the in-memory turn list only for the duration of one
//! call; an external collaborator persists and restores it between
//! calls. The storage medium is the collaborator's business; this
//! crate ships an in-memory implementation for tests and single-process
//! sessions.

use crate::error::Error;
use crate::message::{ConversationId, Role, Turn};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

/// Load/save/clear interface for conversation histories.
#[async_trait]
pub trait HistoryStore: Send + Sync {
    /// Load the turns for a conversation. A conversation that has never
    /// been saved starts as a single system turn built from
    /// `system_prompt`.
    async fn load(
        &self,
        id: &ConversationId,
        system_prompt: &str,
    ) -> Result<Vec<Turn>, Error>;

    /// Persist the turns for a conversation, replacing what was there.
    async fn save(&self, id: &ConversationId, turns: &[Turn]) -> Result<(), Error>;

    /// Reset a conversation to just its system turn.
    async fn clear(&self, id: &ConversationId, system_prompt: &str) -> Result<(), Error>;
}

/// In-memory history store.
///
/// The map holds plain data and stays valid across a panic, so a
/// poisoned lock is recovered rather than propagated.
pub struct MemoryHistoryStore {
    conversations: Mutex<HashMap<ConversationId, Vec<Turn>>>,
}

impl MemoryHistoryStore {
    pub fn new() -> Self {
        Self {
            conversations: Mutex::new(HashMap::new()),
        }
    }
}

impl Default for MemoryHistoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl HistoryStore for MemoryHistoryStore {
    async fn load(
        &self,
        id: &ConversationId,
        system_prompt: &str,
    ) -> Result<Vec<Turn>, Error> {
        let map = self.conversations.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(map
            .get(id)
            .cloned()
            .unwrap_or_else(|| vec![Turn::system(system_prompt)]))
    }

    async fn save(&self, id: &ConversationId, turns: &[Turn]) -> Result<(), Error> {
        let mut map = self.conversations.lock().unwrap_or_else(PoisonError::into_inner);
        map.insert(id.clone(), turns.to_vec());
        Ok(())
    }

    async fn clear(&self, id: &ConversationId, system_prompt: &str) -> Result<(), Error> {
        let mut map = self.conversations.lock().unwrap_or_else(PoisonError::into_inner);
        map.insert(id.clone(), vec![Turn::system(system_prompt)]);
        Ok(())
    }
}

/// Count the non-system turns in a history (display helper).
pub fn user_visible_turns(turns: &[Turn]) -> usize {
    turns.iter().filter(|t| t.role != Role::System).count()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn load_unknown_starts_with_system_turn() {
        let store = MemoryHistoryStore::new();
        let id = ConversationId::new();
        let turns = store.load(&id, "You are helpful.").await.unwrap();
        assert_eq!(turns.len(), 1);
        assert_eq!(turns[0].role, Role::System);
        assert_eq!(turns[0].content, "You are helpful.");
    }

    #[tokio::test]
    async fn save_then_load_roundtrip() {
        let store = MemoryHistoryStore::new();
        let id = ConversationId::new();

        let turns = vec![Turn::system("sys"), Turn::user("hi"), Turn::assistant("hello")];
        store.save(&id, &turns).await.unwrap();

        let loaded = store.load(&id, "ignored").await.unwrap();
        assert_eq!(loaded.len(), 3);
        assert_eq!(loaded[1].content, "hi");
    }

    #[tokio::test]
    async fn clear_resets_to_system_only() {
        let store = MemoryHistoryStore::new();
        let id = ConversationId::new();

        store
            .save(&id, &[Turn::system("sys"), Turn::user("hi")])
            .await
            .unwrap();
        store.clear(&id, "fresh system").await.unwrap();

        let loaded = store.load(&id, "ignored").await.unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].content, "fresh system");
    }

    #[tokio::test]
    async fn poisoned_lock_is_recovered() {
        let store = std::sync::Arc::new(MemoryHistoryStore::new());
        let id = ConversationId::new();
        store
            .save(&id, &[Turn::system("sys"), Turn::user("hi")])
            .await
            .unwrap();

        let poisoner = std::sync::Arc::clone(&store);
        let _ = std::thread::spawn(move || {
            let _guard = poisoner.conversations.lock().unwrap();
            panic!("poison the history lock");
        })
        .join();

        let loaded = store.load(&id, "ignored").await.unwrap();
        assert_eq!(loaded.len(), 2);
    }

    #[test]
    fn user_visible_turn_count() {
        let turns = vec![Turn::system("sys"), Turn::user("hi"), Turn::assistant("yo")];
        assert_eq!(user_visible_turns(&turns), 2);
    }
}
