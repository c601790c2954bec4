use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::{ArcMutexGuard, Mutex, RawMutex};

/// Lazily created mutex per key. Used to serialize check-then-act regions
/// that span more than one store call.
///
/// An entry lives only while some caller holds or waits on it; the last
/// guard to drop removes it from the map.
#[derive(Default)]
pub struct KeyedLocks {
    locks: DashMap<String, Arc<Mutex<()>>>,
}

impl KeyedLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Blocks until the lock for `key` is held. The map shard is released
    /// before waiting, so waiting on one key never blocks unrelated keys.
    pub fn lock(&self, key: &str) -> KeyGuard<'_> {
        let mutex = self.mutex_for(key);
        KeyGuard {
            owner: self,
            key: key.to_string(),
            guard: Some(mutex.lock_arc()),
        }
    }

    /// Number of keys currently held or waited on.
    pub fn len(&self) -> usize {
        self.locks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }

    fn mutex_for(&self, key: &str) -> Arc<Mutex<()>> {
        if let Some(existing) = self.locks.get(key) {
            return existing.clone();
        }
        self.locks.entry(key.to_string()).or_default().clone()
    }

    fn release(&self, key: &str) {
        // A count of one means only the map still references the mutex.
        // Clones are taken under the shard lock, so none can appear mid-check.
        self.locks
            .remove_if(key, |_, mutex| Arc::strong_count(mutex) == 1);
    }
}

/// Held lock on one key of a [`KeyedLocks`].
pub struct KeyGuard<'a> {
    owner: &'a KeyedLocks,
    key: String,
    guard: Option<ArcMutexGuard<RawMutex, ()>>,
}

impl Drop for KeyGuard<'_> {
    fn drop(&mut self) {
        // Unlock and drop our reference first, then try to reclaim the entry.
        self.guard.take();
        self.owner.release(&self.key);
    }
}

/// Key for an unordered pair of ids: `{a, b}` and `{b, a}` map to the same key.
pub fn pair_key(a: &str, b: &str) -> String {
    let (low, high) = if a <= b { (a, b) } else { (b, a) };
    format!("{low}\u{1f}{high}")
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::thread;

    use super::{pair_key, KeyedLocks};

    #[test]
    fn pair_key_is_order_independent() {
        assert_eq!(pair_key("user_a", "user_b"), pair_key("user_b", "user_a"));
        assert_ne!(pair_key("user_a", "user_b"), pair_key("user_a", "user_c"));
    }

    #[test]
    fn same_key_shares_one_mutex() {
        let locks = KeyedLocks::new();
        let first = locks.mutex_for("conv_1");
        let second = locks.mutex_for("conv_1");
        let other = locks.mutex_for("conv_2");

        assert!(Arc::ptr_eq(&first, &second));
        assert!(!Arc::ptr_eq(&first, &other));
    }

    #[test]
    fn entry_is_removed_once_the_last_guard_drops() {
        let locks = KeyedLocks::new();
        for i in 0..1_000 {
            let _guard = locks.lock(&format!("conv_{i}"));
            assert_eq!(locks.len(), 1);
        }
        assert!(locks.is_empty());
    }

    #[test]
    fn contended_key_stays_exclusive_and_is_reclaimed() {
        let locks = Arc::new(KeyedLocks::new());
        let inside = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let locks = locks.clone();
                let inside = inside.clone();
                thread::spawn(move || {
                    for _ in 0..200 {
                        let _guard = locks.lock("ship_1");
                        assert_eq!(inside.fetch_add(1, Ordering::SeqCst), 0);
                        inside.fetch_sub(1, Ordering::SeqCst);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert!(locks.is_empty());
    }
}
