//! Per-link critical sections.
//!
//! A link is a single-writer resource: processing for one link is
//! serialized, while different links proceed fully in parallel.

use crate::link::domain::LinkId;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

/// Keyed async lock map granting exclusive access per link.
#[derive(Debug, Default)]
pub struct LinkLocks {
    inner: Mutex<HashMap<LinkId, Arc<AsyncMutex<()>>>>,
}

impl LinkLocks {
    /// Creates an empty lock map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquires the exclusive critical section for a link, waiting if
    /// another task currently holds it.
    ///
    /// Entries no other holder references are evicted on the way in, so
    /// the map tracks only links with processing in flight rather than
    /// every link ever touched.
    pub async fn acquire(&self, id: LinkId) -> OwnedMutexGuard<()> {
        let lock = {
            let mut map = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
            map.retain(|key, entry| *key == id || Arc::strong_count(entry) > 1);
            Arc::clone(map.entry(id).or_default())
        };
        lock.lock_owned().await
    }

    /// Returns the number of links currently tracked by the map.
    #[must_use]
    pub fn tracked(&self) -> usize {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}
