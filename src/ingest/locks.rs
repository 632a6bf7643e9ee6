//! Serializes operations touching the same track

use std::{
    collections::HashSet,
    sync::{Condvar, Mutex, PoisonError},
};

use crate::domain::track::TrackId;

/// Set of track ids currently being modified.
///
/// Holding a [`TrackGuard`] for an id blocks every other `lock` call for the same id.
#[derive(Debug, Default)]
pub struct TrackLocks {
    held: Mutex<HashSet<TrackId>>,
    released: Condvar,
}

#[derive(Debug)]
pub struct TrackGuard<'a> {
    locks: &'a TrackLocks,
    id: TrackId,
}

impl TrackLocks {
    pub fn lock(&self, id: TrackId) -> TrackGuard<'_> {
        let mut held = self.held.lock().unwrap_or_else(PoisonError::into_inner);
        while held.contains(&id) {
            held = self
                .released
                .wait(held)
                .unwrap_or_else(PoisonError::into_inner);
        }
        held.insert(id);
        TrackGuard { locks: self, id }
    }

    pub fn is_locked(&self, id: TrackId) -> bool {
        self.held
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(&id)
    }
}

impl Drop for TrackGuard<'_> {
    fn drop(&mut self) {
        self.locks
            .held
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.id);
        self.locks.released.notify_all();
    }
}

#[cfg(test)]
mod tests {
    use std::{
        sync::atomic::{AtomicBool, AtomicUsize, Ordering},
        thread,
        time::Duration,
    };

    use super::*;

    #[test]
    fn test_guard_releases_on_drop() {
        let locks = TrackLocks::default();
        let id = TrackId::generate();

        let guard = locks.lock(id);
        assert!(locks.is_locked(id));
        drop(guard);
        assert!(!locks.is_locked(id));
    }

    #[test]
    fn test_same_id_is_serialized() {
        let locks = TrackLocks::default();
        let id = TrackId::generate();
        let inside = AtomicBool::new(false);
        let entered = AtomicUsize::new(0);

        thread::scope(|s| {
            for _ in 0..4 {
                s.spawn(|| {
                    let _guard = locks.lock(id);
                    assert!(!inside.swap(true, Ordering::SeqCst), "two holders at once");
                    thread::sleep(Duration::from_millis(10));
                    entered.fetch_add(1, Ordering::SeqCst);
                    inside.store(false, Ordering::SeqCst);
                });
            }
        });

        assert_eq!(entered.load(Ordering::SeqCst), 4);
        assert!(!locks.is_locked(id));
    }

    #[test]
    fn test_different_ids_do_not_block() {
        let locks = TrackLocks::default();
        let a = TrackId::generate();
        let b = TrackId::generate();

        let _a = locks.lock(a);
        let _b = locks.lock(b);
        assert!(locks.is_locked(a) && locks.is_locked(b));
    }
}
