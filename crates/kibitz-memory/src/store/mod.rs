//! Keyed conversation buffers with lazy expiry.
//!
//! Each key owns its own lock, so work on one conversation never waits on
//! another. The outer map lock is held only long enough to find or create
//! the per-key entry.

mod record;

#[cfg(test)]
mod tests;

use chrono::Duration;
use kibitz_core::{
    clock::{Clock, SystemClock},
    config::MemoryConfig,
    turn::{ConversationKey, Retention, Turn},
};
use record::{Bound, Record};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::debug;

type Slot = Arc<Mutex<Record>>;

/// Process-lifetime conversation memory.
#[derive(Clone)]
pub struct ConversationStore {
    records: Arc<Mutex<HashMap<ConversationKey, Slot>>>,
    clock: Arc<dyn Clock>,
    channel_ttl: Duration,
    peer_ttl: Duration,
    ambient_capacity: usize,
}

impl ConversationStore {
    /// Create a store driven by the system clock.
    pub fn new(config: &MemoryConfig) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    pub fn with_clock(config: &MemoryConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            records: Arc::new(Mutex::new(HashMap::new())),
            clock,
            channel_ttl: config.channel_ttl(),
            peer_ttl: config.peer_ttl(),
            ambient_capacity: config.ambient_capacity.max(1),
        }
    }

    fn bound_for(&self, key: &ConversationKey) -> Bound {
        match (key, key.retention()) {
            (_, Retention::Capacity) => Bound::Capacity(self.ambient_capacity),
            (ConversationKey::Peer { .. }, Retention::Windowed) => Bound::Idle(self.peer_ttl),
            (_, Retention::Windowed) => Bound::Idle(self.channel_ttl),
        }
    }

    async fn slot(&self, key: &ConversationKey) -> Option<Slot> {
        self.records.lock().await.get(key).cloned()
    }

    async fn slot_or_insert(&self, key: &ConversationKey) -> Slot {
        let mut records = self.records.lock().await;
        records
            .entry(key.clone())
            .or_insert_with(|| Arc::new(Mutex::new(Record::default())))
            .clone()
    }

    /// Current turns for `key`, oldest first. An idle record is cleared
    /// before it is read; an unknown key reads as empty.
    pub async fn get(&self, key: &ConversationKey) -> Vec<Turn> {
        let Some(slot) = self.slot(key).await else {
            return Vec::new();
        };
        let mut record = slot.lock().await;
        if record.expire(self.bound_for(key), self.clock.now()) {
            debug!("conversation {key} expired on read");
        }
        record.snapshot()
    }

    /// Record a turn, creating the conversation on first write.
    pub async fn append(&self, key: &ConversationKey, turn: Turn) {
        let slot = self.slot_or_insert(key).await;
        let mut record = slot.lock().await;
        let dropped = record.push(turn, self.bound_for(key), self.clock.now());
        if dropped > 0 {
            debug!("conversation {key}: dropped {dropped} turn(s)");
        }
    }

    /// Forget everything recorded under `key`.
    pub async fn clear(&self, key: &ConversationKey) {
        if let Some(slot) = self.slot(key).await {
            slot.lock().await.clear();
        }
    }

    /// Number of conversations currently holding at least one turn.
    ///
    /// Idle records count until something reads or writes them.
    pub async fn len(&self) -> usize {
        let slots: Vec<Slot> = self.records.lock().await.values().cloned().collect();
        let mut count = 0;
        for slot in slots {
            if !slot.lock().await.is_empty() {
                count += 1;
            }
        }
        count
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}
