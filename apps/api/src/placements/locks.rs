//! Per-page locks serializing validate-then-write on the same page.
//!
//! Every mutating call holds the locks of each page it reads capacity from until
//! its write has landed. Locks are taken in sorted `PageRef` order so two calls
//! touching the same pair of pages cannot deadlock.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

use crate::models::placement::PageRef;

#[derive(Default)]
pub struct PageLocks {
    locks: Mutex<HashMap<PageRef, Arc<AsyncMutex<()>>>>,
}

/// Held for the duration of a critical section; releases every page on drop.
pub struct PageGuard {
    _guards: Vec<OwnedMutexGuard<()>>,
}

impl PageLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn acquire(&self, pages: &[PageRef]) -> PageGuard {
        let mut pages = pages.to_vec();
        pages.sort();
        pages.dedup();

        let mut guards = Vec::with_capacity(pages.len());
        for page in pages {
            let lock = self.lock_for(page);
            guards.push(lock.lock_owned().await);
        }
        PageGuard { _guards: guards }
    }

    fn lock_for(&self, page: PageRef) -> Arc<AsyncMutex<()>> {
        let mut locks = self.locks.lock().unwrap_or_else(|e| e.into_inner());
        // Entries only referenced by the map are idle.
        locks.retain(|_, lock| Arc::strong_count(lock) > 1);
        locks.entry(page).or_default().clone()
    }

    #[cfg(test)]
    fn tracked_pages(&self) -> usize {
        self.locks.lock().unwrap_or_else(|e| e.into_inner()).len()
    }
}
