use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use tokio::sync::{OwnedRwLockReadGuard, OwnedRwLockWriteGuard, RwLock};

const DRAIN_ATTEMPTS: usize = 100;
const DRAIN_BACKOFF: Duration = Duration::from_millis(10);

struct LockSlot {
    rw: Arc<RwLock<()>>,
    refs: AtomicUsize,
}

/// A keyed read/write lock table over filenames.
///
/// Read locks are shared, write locks exclusive. Entries are ref-counted;
/// when the last guard drops the entry becomes evictable and is removed
/// from the table. Deleting a file drains outstanding refs with a bounded
/// back-off before the entry goes away.
#[derive(Clone)]
pub struct FileLockTable {
    slots: Arc<DashMap<String, Arc<LockSlot>>>,
}

pub struct FileReadGuard {
    _guard: OwnedRwLockReadGuard<()>,
    _release: SlotRelease,
}

pub struct FileWriteGuard {
    _guard: OwnedRwLockWriteGuard<()>,
    _release: SlotRelease,
}

/// Decrements the slot ref count on drop and evicts the entry at zero.
struct SlotRelease {
    slots: Arc<DashMap<String, Arc<LockSlot>>>,
    slot: Arc<LockSlot>,
    key: String,
}

impl Drop for SlotRelease {
    fn drop(&mut self) {
        if self.slot.refs.fetch_sub(1, Ordering::AcqRel) == 1 {
            self.slots
                .remove_if(&self.key, |_, slot| slot.refs.load(Ordering::Acquire) == 0);
        }
    }
}

impl FileLockTable {
    pub fn new() -> FileLockTable {
        FileLockTable {
            slots: Arc::new(DashMap::new()),
        }
    }

    pub async fn read(&self, filename: &str) -> FileReadGuard {
        let (slot, release) = self.checkout(filename);
        let guard = slot.rw.clone().read_owned().await;
        FileReadGuard {
            _guard: guard,
            _release: release,
        }
    }

    pub async fn write(&self, filename: &str) -> FileWriteGuard {
        let (slot, release) = self.checkout(filename);
        let guard = slot.rw.clone().write_owned().await;
        FileWriteGuard {
            _guard: guard,
            _release: release,
        }
    }

    /// Waits for outstanding refs on a deleted file's entry to drain, then
    /// drops the entry. Bounded: after the back-off budget the entry is
    /// removed anyway and stragglers finish on their own slot handle.
    pub async fn drain(&self, filename: &str) {
        for _ in 0..DRAIN_ATTEMPTS {
            match self.slots.get(filename) {
                None => return,
                Some(slot) => {
                    if slot.refs.load(Ordering::Acquire) == 0 {
                        break;
                    }
                }
            }
            tokio::time::sleep(DRAIN_BACKOFF).await;
        }
        self.slots.remove(filename);
    }

    pub fn active_entries(&self) -> usize {
        self.slots.len()
    }

    fn checkout(&self, filename: &str) -> (Arc<LockSlot>, SlotRelease) {
        let entry = self.slots.entry(filename.to_string()).or_insert_with(|| {
            Arc::new(LockSlot {
                rw: Arc::new(RwLock::new(())),
                refs: AtomicUsize::new(0),
            })
        });

        // Incremented while the map entry is held, so eviction's zero-check
        // cannot interleave between lookup and checkout.
        entry.refs.fetch_add(1, Ordering::AcqRel);
        let slot = entry.clone();
        drop(entry);

        let release = SlotRelease {
            slots: self.slots.clone(),
            slot: slot.clone(),
            key: filename.to_string(),
        };
        (slot, release)
    }
}

impl Default for FileLockTable {
    fn default() -> Self {
        Self::new()
    }
}
