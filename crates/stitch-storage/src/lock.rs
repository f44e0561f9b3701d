//! Per-file-identity read/write locks.
//!
//! Chunk uploads and verification take a shared guard; merge takes the
//! exclusive guard, so a merge never races a staging write for the same
//! file and a verify never sees a staging area mid-merge.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{OwnedRwLockReadGuard, OwnedRwLockWriteGuard, RwLock};

/// Registry of locks keyed by file hash.
#[derive(Debug, Clone, Default)]
pub struct IdentityLocks {
    locks: Arc<DashMap<String, Arc<RwLock<()>>>>,
}

/// A held lock. Dropping it releases the lock and prunes the registry
/// entry once nobody else references it.
#[derive(Debug)]
pub struct IdentityGuard {
    key: String,
    locks: Arc<DashMap<String, Arc<RwLock<()>>>>,
    held: Option<Held>,
}

#[derive(Debug)]
enum Held {
    Shared(OwnedRwLockReadGuard<()>),
    Exclusive(OwnedRwLockWriteGuard<()>),
}

impl IdentityLocks {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquire the shared lock for `file_hash`.
    pub async fn shared(&self, file_hash: &str) -> IdentityGuard {
        let lock = self.entry(file_hash);
        let guard = lock.read_owned().await;
        self.guard(file_hash, Held::Shared(guard))
    }

    /// Acquire the exclusive lock for `file_hash`.
    pub async fn exclusive(&self, file_hash: &str) -> IdentityGuard {
        let lock = self.entry(file_hash);
        let guard = lock.write_owned().await;
        self.guard(file_hash, Held::Exclusive(guard))
    }

    /// Number of identities with live lock entries.
    pub fn len(&self) -> usize {
        self.locks.len()
    }

    /// Whether no lock entries are live.
    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }

    fn entry(&self, file_hash: &str) -> Arc<RwLock<()>> {
        self.locks
            .entry(file_hash.to_string())
            .or_insert_with(|| Arc::new(RwLock::new(())))
            .clone()
    }

    fn guard(&self, file_hash: &str, held: Held) -> IdentityGuard {
        IdentityGuard {
            key: file_hash.to_string(),
            locks: Arc::clone(&self.locks),
            held: Some(held),
        }
    }
}

impl IdentityGuard {
    /// Whether this guard holds the exclusive lock.
    pub fn is_exclusive(&self) -> bool {
        matches!(self.held, Some(Held::Exclusive(_)))
    }
}

impl Drop for IdentityGuard {
    fn drop(&mut self) {
        // Release before checking the count so our own Arc is gone.
        self.held.take();
        self.locks
            .remove_if(&self.key, |_, lock| Arc::strong_count(lock) == 1);
    }
}
