use std::collections::HashMap;

use tokio::sync::RwLock;
use tokio::task::JoinHandle;

/// Pending deferred recordings, keyed by schedule id. Entries are removed
/// when the timer fires or when an operator cancels the schedule; a fired
/// schedule can no longer be cancelled.
#[derive(Default)]
pub struct ScheduleRegistry {
    pending: RwLock<HashMap<String, JoinHandle<()>>>,
}

impl ScheduleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Spawns the deferred task and inserts its handle under one lock
    /// acquisition. The task removes its own entry at fire time, which
    /// takes the same lock, so even an immediately-firing task observes
    /// its entry.
    pub async fn register<F>(&self, schedule_id: String, spawn: F)
    where
        F: FnOnce() -> JoinHandle<()>,
    {
        let mut pending = self.pending.write().await;
        let handle = spawn();
        pending.insert(schedule_id, handle);
    }

    /// Called by the deferred task itself when its timer fires.
    pub async fn complete(&self, schedule_id: &str) {
        self.pending.write().await.remove(schedule_id);
    }

    /// Aborts a pending schedule. Returns false when the schedule is
    /// unknown or already fired.
    pub async fn cancel(&self, schedule_id: &str) -> bool {
        match self.pending.write().await.remove(schedule_id) {
            Some(handle) => {
                handle.abort();
                true
            }
            None => false,
        }
    }

    #[cfg(test)]
    pub async fn len(&self) -> usize {
        self.pending.read().await.len()
    }
}
