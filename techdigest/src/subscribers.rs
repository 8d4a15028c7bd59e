use std::collections::HashSet;
use std::sync::Arc;

use tokio::sync::RwLock;

/// Telegram chat identifier used as the subscriber id.
pub type ChatId = i64;

/// In-memory set of digest subscribers, shared between the update listener
/// (writer) and the broadcast path (reader).
///
/// Cloning is cheap; all clones observe the same set.
#[derive(Debug, Clone, Default)]
pub struct Registry {
    inner: Arc<RwLock<HashSet<ChatId>>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a subscriber. Idempotent; returns true only when the id was
    /// not registered before (callers greet new subscribers exactly once).
    pub async fn add(&self, id: ChatId) -> bool {
        self.inner.write().await.insert(id)
    }

    /// Point-in-time copy of all registered ids, order unspecified.
    pub async fn snapshot(&self) -> Vec<ChatId> {
        self.inner.read().await.iter().copied().collect()
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.len()
    }
}
