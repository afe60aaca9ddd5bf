use std::sync::Arc;

use tokio::sync::RwLock;

// ═══════════════════════════════════════════════════════════════
//  EventStore — single writer
// ═══════════════════════════════════════════════════════════════

/// Append-only, unbounded in-memory record log.
///
/// Exactly one `EventStore` handle exists per log and only it can append,
/// so the single-writer discipline is enforced by ownership. Readers get a
/// [`StoreReader`] via [`EventStore::reader`]. The lock is held only for the
/// duration of one push or one copy, so readers never observe a partially
/// appended record and never see the log shrink.
pub struct EventStore<T> {
    records: Arc<RwLock<Vec<T>>>,
}

impl<T> Default for EventStore<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> EventStore<T> {
    pub fn new() -> Self {
        Self {
            records: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// Append one record at the end of the log.
    pub async fn append(&self, record: T) {
        self.records.write().await.push(record);
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }

    /// Read-only handle for query paths. Cheap to clone.
    pub fn reader(&self) -> StoreReader<T> {
        StoreReader {
            records: self.records.clone(),
        }
    }
}

impl<T: Clone> EventStore<T> {
    pub async fn snapshot(&self) -> Vec<T> {
        self.records.read().await.clone()
    }
}

// ═══════════════════════════════════════════════════════════════
//  StoreReader — shared, read-only
// ═══════════════════════════════════════════════════════════════

pub struct StoreReader<T> {
    records: Arc<RwLock<Vec<T>>>,
}

impl<T> Clone for StoreReader<T> {
    fn clone(&self) -> Self {
        Self {
            records: self.records.clone(),
        }
    }
}

impl<T> StoreReader<T> {
    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}

impl<T: Clone> StoreReader<T> {
    /// Independent copy of every record appended so far, in append order.
    pub async fn snapshot(&self) -> Vec<T> {
        self.records.read().await.clone()
    }
}
