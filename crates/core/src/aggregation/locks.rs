//! Per-(user, project) async locks around time-entry read-modify-write

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// Serialises writers of the same time entry; different entries proceed
/// concurrently.
#[derive(Debug, Default)]
pub struct EntryLocks {
    locks: DashMap<(String, String), Arc<Mutex<()>>>,
}

impl EntryLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn lock(&self, user_id: &str, project_id: &str) -> OwnedMutexGuard<()> {
        let mutex = self
            .locks
            .entry((user_id.to_string(), project_id.to_string()))
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .value()
            .clone();
        mutex.lock_owned().await
    }

    pub fn len(&self) -> usize {
        self.locks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }
}
