//! C9: per-repository mutual exclusion around local working directories.
//!
//! The only consumer is C7's `fetch()`, which needs at most one
//! clone-or-pull in flight per remote at a time rather than general task
//! scheduling, so this is a
//! `DashMap` of per-key `tokio::sync::Mutex`es rather than a FIFO runner,
//! since the lock itself gives FIFO-ish fairness for the one call site that
//! needs it. Distinct from `once-map`'s single-shot memoization: a repository may
//! legitimately be fetched many times over its lifetime (clone once, pull
//! on every subsequent resolve), so the guard is a mutex, not a
//! compute-once cell.

use std::sync::Arc;

use dashmap::DashMap;
use gitpin_types::RepositoryUrl;
use once_cell::sync::Lazy;
use tokio::sync::{Mutex, MutexGuard};

static LOCKS: Lazy<DashMap<RepositoryUrl, Arc<Mutex<()>>>> = Lazy::new(DashMap::new);

/// Acquires the lock for `key`, creating it on first use. The returned guard
/// must be held for the duration of the critical section; dropping it
/// releases the lock for the next waiter on the same key.
pub async fn lock(key: &RepositoryUrl) -> OwnedRepoLock {
    let mutex = LOCKS
        .entry(key.clone())
        .or_insert_with(|| Arc::new(Mutex::new(())))
        .clone();
    OwnedRepoLock { mutex }
}

/// Holds the `Arc<Mutex<()>>` alive for as long as the guard is needed; the
/// guard itself borrows from `mutex`, so this struct self-references via a
/// raw pointer-free trick: we re-lock through the owned `Arc` each time.
pub struct OwnedRepoLock {
    mutex: Arc<Mutex<()>>,
}

impl OwnedRepoLock {
    pub async fn guard(&self) -> MutexGuard<'_, ()> {
        self.mutex.lock().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn distinct_keys_do_not_block_each_other() {
        let a = RepositoryUrl::parse("https://example.com/a/a.git").unwrap();
        let b = RepositoryUrl::parse("https://example.com/b/b.git").unwrap();

        let lock_a = lock(&a).await;
        let _guard_a = lock_a.guard().await;

        let lock_b = lock(&b).await;
        let result = tokio::time::timeout(Duration::from_millis(50), lock_b.guard()).await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn same_key_serializes() {
        let key = RepositoryUrl::parse("https://example.com/a/a.git").unwrap();

        let first = lock(&key).await;
        let guard = first.guard().await;

        let second = lock(&key).await;
        let result = tokio::time::timeout(Duration::from_millis(50), second.guard()).await;
        assert!(result.is_err());

        drop(guard);
    }
}
