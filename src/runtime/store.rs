//! Lock-free holder of the served snapshot.

use std::sync::Arc;

use arc_swap::ArcSwap;

use crate::runtime::RuntimeSnapshot;

/// The currently served [`RuntimeSnapshot`].
///
/// Loads never block and always see a complete snapshot; a store is a single
/// pointer swap. Callers load once per request and keep that `Arc`.
#[derive(Debug)]
pub struct RuntimeStore {
    inner: ArcSwap<RuntimeSnapshot>,
}

impl RuntimeStore {
    pub fn new(snapshot: RuntimeSnapshot) -> Self {
        Self {
            inner: ArcSwap::from_pointee(snapshot),
        }
    }

    pub fn load(&self) -> Arc<RuntimeSnapshot> {
        self.inner.load_full()
    }

    pub fn store(&self, snapshot: RuntimeSnapshot) {
        self.inner.store(Arc::new(snapshot));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::test_support::snapshot_with_token;

    #[test]
    fn test_store_swaps_whole_snapshot() {
        let store = RuntimeStore::new(snapshot_with_token("a"));
        let before = store.load();

        store.store(snapshot_with_token("b"));
        let after = store.load();

        assert!(!Arc::ptr_eq(&before, &after));
        assert_eq!(before.config.auth.token.expose(), "a");
        assert_eq!(after.config.auth.token.expose(), "b");
    }

    #[test]
    fn test_concurrent_readers_see_complete_snapshots() {
        let store = Arc::new(RuntimeStore::new(snapshot_with_token("a")));
        let readers: Vec<_> = (0..4)
            .map(|_| {
                let store = Arc::clone(&store);
                std::thread::spawn(move || {
                    for _ in 0..200 {
                        let snapshot = store.load();
                        let token = snapshot.config.auth.token.expose().to_string();
                        assert!(token == "a" || token == "b");
                        assert!(snapshot.groups.contains_key("default"));
                    }
                })
            })
            .collect();

        for _ in 0..20 {
            store.store(snapshot_with_token("b"));
        }
        for reader in readers {
            reader.join().unwrap();
        }
        assert_eq!(store.load().config.auth.token.expose(), "b");
    }
}
