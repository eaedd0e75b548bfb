//! Per-key single-flight guard
//!
//! Concurrent misses for the same derivative key queue on one async mutex so
//! only the first computes it. The table holds weak references; an entry is
//! removed once its last guard is released.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use tokio::sync::OwnedMutexGuard;

type GuardTable = Mutex<HashMap<String, Weak<tokio::sync::Mutex<()>>>>;

#[derive(Default)]
pub struct SingleFlight {
    table: Arc<GuardTable>,
}

/// Held for the duration of one recomputation.
pub struct FlightGuard {
    table: Arc<GuardTable>,
    key: String,
    guard: Option<OwnedMutexGuard<()>>,
}

fn lock(table: &GuardTable) -> MutexGuard<'_, HashMap<String, Weak<tokio::sync::Mutex<()>>>> {
    // The map stays consistent even if a holder panicked.
    table.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl SingleFlight {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn acquire(&self, key: &str) -> FlightGuard {
        let slot = {
            let mut table = lock(&self.table);
            // Waiters cancelled mid-acquire leave dead entries behind.
            table.retain(|_, slot| slot.strong_count() > 0);
            match table.get(key).and_then(Weak::upgrade) {
                Some(slot) => slot,
                None => {
                    let slot = Arc::new(tokio::sync::Mutex::new(()));
                    table.insert(key.to_string(), Arc::downgrade(&slot));
                    slot
                }
            }
        };

        let guard = slot.lock_owned().await;
        FlightGuard {
            table: self.table.clone(),
            key: key.to_string(),
            guard: Some(guard),
        }
    }

    /// Keys with a live guard or waiter
    pub fn in_flight(&self) -> usize {
        lock(&self.table)
            .values()
            .filter(|slot| slot.strong_count() > 0)
            .count()
    }

    /// Entries in the table, live or not
    pub fn table_len(&self) -> usize {
        lock(&self.table).len()
    }
}

impl Drop for FlightGuard {
    fn drop(&mut self) {
        drop(self.guard.take());
        let mut table = lock(&self.table);
        if table
            .get(&self.key)
            .is_some_and(|slot| slot.strong_count() == 0)
        {
            table.remove(&self.key);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn test_entry_pruned_after_release() {
        let flights = SingleFlight::new();
        let guard = flights.acquire("a/100x100/b.jpg").await;
        assert_eq!(flights.in_flight(), 1);
        drop(guard);
        assert_eq!(flights.table_len(), 0);
    }

    #[tokio::test]
    async fn test_same_key_is_serialized() {
        let flights = Arc::new(SingleFlight::new());
        let active = Arc::new(AtomicUsize::new(0));
        let max_active = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let flights = flights.clone();
            let active = active.clone();
            let max_active = max_active.clone();
            handles.push(tokio::spawn(async move {
                let _guard = flights.acquire("k").await;
                let now = active.fetch_add(1, Ordering::SeqCst) + 1;
                max_active.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(5)).await;
                active.fetch_sub(1, Ordering::SeqCst);
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(max_active.load(Ordering::SeqCst), 1);
        assert_eq!(flights.table_len(), 0);
    }

    #[tokio::test]
    async fn test_distinct_keys_do_not_block() {
        let flights = SingleFlight::new();
        let _a = flights.acquire("a").await;
        let b = tokio::time::timeout(Duration::from_millis(100), flights.acquire("b")).await;
        assert!(b.is_ok());
    }
}
