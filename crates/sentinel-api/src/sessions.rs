//! Per-session chat state
//!
//! Each session owns its own lock, so two requests on one session run one
//! after the other while different sessions never wait on each other. The
//! store holds at most `capacity` sessions; the least recently used one is
//! dropped to make room.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use sentinel_core::config::DEFAULT_MAX_SESSIONS;
use sentinel_core::models::ChatContext;
use tokio::sync::{Mutex, RwLock};

pub const DEFAULT_SESSION: &str = "default";

#[derive(Debug)]
struct Entry {
    context: Arc<Mutex<ChatContext>>,
    last_used: AtomicU64,
}

#[derive(Debug)]
pub struct SessionStore {
    sessions: RwLock<HashMap<String, Entry>>,
    capacity: usize,
    clock: AtomicU64,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_MAX_SESSIONS)
    }
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            capacity: capacity.max(1),
            clock: AtomicU64::new(0),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Context for `id`, created empty on first use; blank ids map to the default session
    pub async fn session(&self, id: Option<&str>) -> Arc<Mutex<ChatContext>> {
        let id = id.map(str::trim).filter(|s| !s.is_empty()).unwrap_or(DEFAULT_SESSION);
        let now = self.clock.fetch_add(1, Ordering::Relaxed);

        if let Some(entry) = self.sessions.read().await.get(id) {
            entry.last_used.store(now, Ordering::Relaxed);
            return entry.context.clone();
        }

        let mut sessions = self.sessions.write().await;
        if let Some(entry) = sessions.get(id) {
            entry.last_used.store(now, Ordering::Relaxed);
            return entry.context.clone();
        }

        if sessions.len() >= self.capacity {
            let oldest = sessions
                .iter()
                .min_by_key(|(_, entry)| entry.last_used.load(Ordering::Relaxed))
                .map(|(key, _)| key.clone());
            if let Some(oldest) = oldest {
                sessions.remove(&oldest);
                tracing::debug!(session = %oldest, "Evicted least recently used chat session");
            }
        }

        let context = Arc::new(Mutex::new(ChatContext::new()));
        sessions.insert(
            id.to_string(),
            Entry {
                context: context.clone(),
                last_used: AtomicU64::new(now),
            },
        );
        context
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }

    pub async fn contains(&self, id: &str) -> bool {
        self.sessions.read().await.contains_key(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_sessions_are_isolated() {
        let store = SessionStore::new();
        store.session(Some("a")).await.lock().await.record_exchange("oi", "olá");

        assert_eq!(store.session(Some("a")).await.lock().await.history().len(), 2);
        assert!(store.session(Some("b")).await.lock().await.history().is_empty());
        assert_eq!(store.len().await, 2);
    }

    #[tokio::test]
    async fn test_blank_id_is_default() {
        let store = SessionStore::new();
        let blank = store.session(Some("  ")).await;
        let default = store.session(None).await;
        assert!(Arc::ptr_eq(&blank, &default));
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_other_session_is_not_blocked() {
        let store = Arc::new(SessionStore::new());
        let busy = store.session(Some("busy")).await;
        let _guard = busy.lock().await;

        let other = tokio::time::timeout(Duration::from_secs(1), async {
            let session = store.session(Some("free")).await;
            let ctx = session.lock().await;
            ctx.history().len()
        })
        .await;
        assert_eq!(other.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_full_store_evicts_least_recently_used() {
        let store = SessionStore::with_capacity(2);
        store.session(Some("first")).await.lock().await.record_exchange("oi", "olá");
        store.session(Some("second")).await;
        // touching "first" makes "second" the oldest
        store.session(Some("first")).await;

        store.session(Some("third")).await;

        assert_eq!(store.len().await, 2);
        assert!(store.contains("first").await);
        assert!(!store.contains("second").await);
        assert!(store.contains("third").await);
        assert_eq!(store.session(Some("first")).await.lock().await.history().len(), 2);
    }

    #[tokio::test]
    async fn test_many_ids_stay_within_capacity() {
        let store = SessionStore::with_capacity(16);
        for i in 0..500 {
            store.session(Some(&format!("client-{}", i))).await;
        }
        assert_eq!(store.len().await, 16);
        assert!(store.contains("client-499").await);
        assert!(!store.contains("client-0").await);
    }
}
