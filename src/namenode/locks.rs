use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use crate::error::{Result, ServiceError};

use super::types::{now_ms, LockKey, SentenceLock};

/// The sentence-lock manager.
///
/// One entry per `(filename, sentence index)`; at most one holder. Locks
/// are in-memory leases: re-acquisition by the holder renews the lease,
/// an expired lease is up for grabs, and the background scan reclaims
/// whatever expired without a release. Locks never block reads.
pub struct SentenceLockTable {
    entries: DashMap<LockKey, SentenceLock>,
    lease_ms: u64,
}

impl SentenceLockTable {
    pub fn new(lease_ms: u64) -> SentenceLockTable {
        SentenceLockTable {
            entries: DashMap::new(),
            lease_ms,
        }
    }

    /// Acquires or re-enters the lock. Re-entry by the holder succeeds and
    /// renews the lease; a foreign unexpired hold fails with *file-locked*.
    pub fn acquire(&self, user: &str, filename: &str, sentence_index: usize) -> Result<()> {
        let key = LockKey::new(filename, sentence_index);
        let now = now_ms();

        match self.entries.entry(key) {
            Entry::Vacant(slot) => {
                slot.insert(self.fresh_lock(user, now));
                Ok(())
            }
            Entry::Occupied(mut slot) => {
                let lock = slot.get();
                if lock.holder == user {
                    slot.get_mut().lease_expires = now + self.lease_ms;
                    Ok(())
                } else if now > lock.lease_expires {
                    slot.insert(self.fresh_lock(user, now));
                    Ok(())
                } else {
                    Err(ServiceError::FileLocked {
                        holder: lock.holder.clone(),
                    })
                }
            }
        }
    }

    /// Releases a held lock. Only the holder may release; releasing an
    /// absent lock is an argument error.
    pub fn release(&self, user: &str, filename: &str, sentence_index: usize) -> Result<()> {
        let key = LockKey::new(filename, sentence_index);

        match self.entries.entry(key) {
            Entry::Vacant(_) => Err(ServiceError::InvalidParameters(
                "no lock exists".to_string(),
            )),
            Entry::Occupied(slot) => {
                if slot.get().holder != user {
                    return Err(ServiceError::Unauthorized(format!(
                        "lock held by {}",
                        slot.get().holder
                    )));
                }
                slot.remove();
                Ok(())
            }
        }
    }

    /// Validation-only query used by storage nodes before committing a
    /// write: confirms the user currently holds an unexpired lease. Never
    /// creates or mutates a lock.
    pub fn validate(&self, user: &str, filename: &str, sentence_index: usize) -> Result<()> {
        let key = LockKey::new(filename, sentence_index);

        match self.entries.get(&key) {
            None => Err(ServiceError::InvalidParameters(
                "no lock exists".to_string(),
            )),
            Some(lock) => {
                if now_ms() > lock.lease_expires {
                    Err(ServiceError::InvalidParameters(
                        "lock lease expired".to_string(),
                    ))
                } else if lock.holder != user {
                    Err(ServiceError::FileLocked {
                        holder: lock.holder.clone(),
                    })
                } else {
                    Ok(())
                }
            }
        }
    }

    /// Removes every expired lease and returns the reclaimed keys.
    pub fn reclaim_expired(&self) -> Vec<LockKey> {
        let now = now_ms();
        let expired: Vec<LockKey> = self
            .entries
            .iter()
            .filter(|entry| now > entry.value().lease_expires)
            .map(|entry| entry.key().clone())
            .collect();

        let mut reclaimed = Vec::new();
        for key in expired {
            if self
                .entries
                .remove_if(&key, |_, lock| now > lock.lease_expires)
                .is_some()
            {
                reclaimed.push(key);
            }
        }
        reclaimed
    }

    pub fn holder_of(&self, filename: &str, sentence_index: usize) -> Option<String> {
        self.entries
            .get(&LockKey::new(filename, sentence_index))
            .map(|lock| lock.holder.clone())
    }

    pub fn lease_of(&self, filename: &str, sentence_index: usize) -> Option<u64> {
        self.entries
            .get(&LockKey::new(filename, sentence_index))
            .map(|lock| lock.lease_expires)
    }

    /// Test hook: force a lease into the past so reclaim logic can run
    /// without waiting out the wall clock.
    #[cfg(test)]
    pub(crate) fn expire_now(&self, filename: &str, sentence_index: usize) {
        if let Some(mut lock) = self.entries.get_mut(&LockKey::new(filename, sentence_index)) {
            lock.lease_expires = 0;
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn fresh_lock(&self, user: &str, now: u64) -> SentenceLock {
        SentenceLock {
            holder: user.to_string(),
            acquired_at: now,
            lease_expires: now + self.lease_ms,
        }
    }
}
