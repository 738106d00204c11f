//! Per-session conversation history.

use super::{EvictionPolicy, MemoTable};
use crate::rag::ChatHistory;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::debug;

/// Shared handle to one session's history.
pub type SharedHistory = Arc<Mutex<ChatHistory>>;

/// A session is in use while anyone besides the table holds its handle.
fn in_use(history: &SharedHistory) -> bool {
    Arc::strong_count(history) > 1
}

/// Histories keyed by session id, created empty on first use.
pub struct SessionHistoryStore {
    sessions: Mutex<MemoTable<SharedHistory>>,
}

impl SessionHistoryStore {
    pub fn new(policy: EvictionPolicy) -> Self {
        Self {
            sessions: Mutex::new(MemoTable::new(policy).with_pin(in_use)),
        }
    }

    /// History for `session_id`, registering an empty one if unseen.
    pub async fn get_or_create(&self, session_id: &str) -> SharedHistory {
        let mut sessions = self.sessions.lock().await;
        sessions.get_or_insert_with(session_id, || {
            debug!("New chat session {}", session_id);
            Arc::new(Mutex::new(ChatHistory::new()))
        })
    }

    /// Number of sessions currently held.
    pub async fn len(&self) -> usize {
        self.sessions.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.lock().await.is_empty()
    }
}

impl Default for SessionHistoryStore {
    fn default() -> Self {
        Self::new(EvictionPolicy::unbounded())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_get_or_create_returns_same_history() {
        let store = SessionHistoryStore::default();
        let first = store.get_or_create("s1").await;
        first.lock().await.push_turn("q", "a");

        let again = store.get_or_create("s1").await;
        assert!(Arc::ptr_eq(&first, &again));
        assert_eq!(again.lock().await.len(), 2);

        let other = store.get_or_create("s2").await;
        assert!(other.lock().await.is_empty());
        assert_eq!(store.len().await, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_idle_sessions_are_dropped() {
        let store = SessionHistoryStore::new(EvictionPolicy {
            max_entries: None,
            idle_ttl: Some(Duration::from_secs(30)),
        });

        store.get_or_create("old").await.lock().await.push_turn("q", "a");
        tokio::time::advance(Duration::from_secs(31)).await;
        store.get_or_create("new").await;

        let old = store.get_or_create("old").await;
        assert!(old.lock().await.is_empty());
    }

    #[tokio::test]
    async fn test_held_session_is_not_evicted() {
        let store = SessionHistoryStore::new(EvictionPolicy {
            max_entries: Some(1),
            idle_ttl: None,
        });

        let held = store.get_or_create("busy").await;
        held.lock().await.push_turn("q", "a");
        store.get_or_create("other").await;

        let again = store.get_or_create("busy").await;
        assert!(Arc::ptr_eq(&held, &again));
    }
}
