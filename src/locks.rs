//! Keyed mutual-exclusion scopes.
//!
//! The engine serializes ledger-gated operations per user and lifecycle
//! operations per container, closing the window where two concurrent paid
//! actions could both observe a sufficient balance before either debits.
//! Absence of preemption on the async runtime is not relied on.

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Hands out one `Mutex` per key, created on first use.
///
/// Lock entries are never reclaimed; the key space (user ids, container ids
/// on one host) is small enough that this does not matter in practice.
#[derive(Default)]
pub struct LockMap {
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl LockMap {
    /// Creates an empty lock map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the lock for `key`, creating it if needed.
    ///
    /// Callers hold the returned mutex for the whole critical section:
    ///
    /// ```rust,ignore
    /// let lock = locks.get("user-42").await;
    /// let _guard = lock.lock().await;
    /// // check balance → provision → debit
    /// ```
    pub async fn get(&self, key: &str) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().await;
        locks.entry(key.to_string()).or_default().clone()
    }
}
