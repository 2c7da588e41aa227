//! Concurrent record storage with per-request fine-grained locking.
//!
//! [`GenerationRegistry`] keeps every known [`GenerationRecord`] in a
//! `HashMap` whose entries are individually protected by a
//! [`tokio::sync::RwLock`]. Completions for different requests never
//! contend; completions for cards of the same request serialize.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;

use super::RequestId;
use super::record::GenerationRecord;
use crate::error::SpawnerError;

/// Shared handle on one record.
pub type RecordHandle = Arc<RwLock<GenerationRecord>>;

/// Central store for all generation records held in memory.
///
/// # Concurrency
///
/// - Multiple readers may inspect the same record concurrently.
/// - Writes to different records are concurrent.
/// - Writes to the same record are serialized.
#[derive(Debug, Default)]
pub struct GenerationRegistry {
    records: RwLock<HashMap<RequestId, RecordHandle>>,
}

impl GenerationRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a new record.
    ///
    /// # Errors
    ///
    /// Returns [`SpawnerError::Internal`] if a record with the same id is
    /// already registered (should never happen with UUID v4).
    pub async fn insert(&self, record: GenerationRecord) -> Result<RequestId, SpawnerError> {
        let request_id = record.id();
        let mut map = self.records.write().await;
        if map.contains_key(&request_id) {
            return Err(SpawnerError::Internal(format!(
                "generation {request_id} already exists"
            )));
        }
        map.insert(request_id, Arc::new(RwLock::new(record)));
        Ok(request_id)
    }

    /// Returns the record behind its per-request lock.
    ///
    /// # Errors
    ///
    /// Returns [`SpawnerError::RequestNotFound`] for an unknown id.
    pub async fn get(&self, request_id: RequestId) -> Result<RecordHandle, SpawnerError> {
        self.records
            .read()
            .await
            .get(&request_id)
            .cloned()
            .ok_or(SpawnerError::RequestNotFound(request_id))
    }

    /// Returns handles on every record, ordered by request id.
    ///
    /// Callers that lock several records at once must lock them in this
    /// order.
    pub async fn handles(&self) -> Vec<(RequestId, RecordHandle)> {
        let mut handles: Vec<(RequestId, RecordHandle)> = self
            .records
            .read()
            .await
            .iter()
            .map(|(id, handle)| (*id, Arc::clone(handle)))
            .collect();
        handles.sort_by_key(|(id, _)| *id);
        handles
    }

    /// Returns the number of records in the registry.
    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    /// Returns `true` if the registry holds no records.
    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}
