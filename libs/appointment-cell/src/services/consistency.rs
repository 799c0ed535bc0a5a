// libs/appointment-cell/src/services/consistency.rs
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use tracing::debug;

use shared_models::SlotKey;

/// In-process mutual exclusion per slot key around create/approve/cancel.
/// The store's atomic operations cover other processes.
#[derive(Default)]
pub struct SlotLockRegistry {
    locks: Mutex<HashMap<SlotKey, Arc<AsyncMutex<()>>>>,
}

impl SlotLockRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn acquire(&self, key: &SlotKey) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
            // Unheld locks are only referenced by the map.
            locks.retain(|_, lock| Arc::strong_count(lock) > 1);
            locks
                .entry(key.clone())
                .or_insert_with(|| Arc::new(AsyncMutex::new(())))
                .clone()
        };
        debug!("Acquiring scheduling lock {}", key.lock_key());
        lock.lock_owned().await
    }

    pub fn tracked_keys(&self) -> usize {
        self.locks
            .lock()
            .map(|locks| locks.len())
            .unwrap_or_else(|poisoned| poisoned.into_inner().len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use std::time::Duration;

    fn key(time: &str) -> SlotKey {
        SlotKey::new(42, NaiveDate::from_ymd_opt(2025, 4, 23).unwrap(), time)
    }

    #[tokio::test]
    async fn same_key_is_exclusive() {
        let registry = Arc::new(SlotLockRegistry::new());
        let guard = registry.acquire(&key("09:00")).await;

        let contender = {
            let registry = registry.clone();
            tokio::spawn(async move {
                let _guard = registry.acquire(&key("09:00")).await;
            })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!contender.is_finished());

        drop(guard);
        contender.await.unwrap();
    }

    #[tokio::test]
    async fn different_keys_do_not_block() {
        let registry = SlotLockRegistry::new();
        let _nine = registry.acquire(&key("09:00")).await;
        let _ten = registry.acquire(&key("10:00")).await;
        assert_eq!(registry.tracked_keys(), 2);
    }

    #[tokio::test]
    async fn released_locks_are_pruned() {
        let registry = SlotLockRegistry::new();
        drop(registry.acquire(&key("09:00")).await);
        drop(registry.acquire(&key("10:00")).await);
        assert_eq!(registry.tracked_keys(), 1);
    }
}
