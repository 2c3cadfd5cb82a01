use async_trait::async_trait;
use thiserror::Error;

use linkdrop_core::{Code, ContentReference, RecipientId, RecipientRecord, RelayError};

use crate::types::BroadcastCheckpoint;

/// Failure reported by a backing store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A row with the same key already exists.
    #[error("key already exists: {0}")]
    Conflict(String),

    /// A stored row could not be decoded.
    #[error("corrupt row: {0}")]
    Corrupt(String),

    #[error("backend failure: {0}")]
    Backend(String),
}

impl From<StoreError> for RelayError {
    fn from(err: StoreError) -> Self {
        RelayError::StorageError(err.to_string())
    }
}

/// The `files` table: code → content reference.
#[async_trait]
pub trait ReferenceStore: Send + Sync {
    /// Insert a new reference. Fails with [`StoreError::Conflict`] if the code is taken.
    async fn insert(&self, reference: &ContentReference) -> Result<(), StoreError>;

    async fn get(&self, code: &Code) -> Result<Option<ContentReference>, StoreError>;

    /// Add one to the download counter in a single store-side step.
    /// Returns the new count, or `None` if the code is gone.
    async fn increment_downloads(&self, code: &Code) -> Result<Option<u64>, StoreError>;

    /// Remove a reference, returning what was removed.
    async fn delete(&self, code: &Code) -> Result<Option<ContentReference>, StoreError>;

    /// All references, newest first.
    async fn list(&self) -> Result<Vec<ContentReference>, StoreError>;
}

/// The `users` table: recipient id → record.
#[async_trait]
pub trait RecipientStore: Send + Sync {
    /// Insert or refresh a recipient. `first_seen` of an existing row is kept.
    async fn upsert(&self, record: &RecipientRecord) -> Result<(), StoreError>;

    async fn get(&self, id: RecipientId) -> Result<Option<RecipientRecord>, StoreError>;

    /// Every known id, ascending.
    async fn ids(&self) -> Result<Vec<RecipientId>, StoreError>;

    async fn count(&self) -> Result<u64, StoreError>;
}

/// Broadcast checkpoints. At most one is pending at a time.
#[async_trait]
pub trait BroadcastLog: Send + Sync {
    async fn save(&self, checkpoint: &BroadcastCheckpoint) -> Result<(), StoreError>;

    /// The most recently updated unfinished checkpoint, if any.
    async fn pending(&self) -> Result<Option<BroadcastCheckpoint>, StoreError>;

    async fn clear(&self, id: &str) -> Result<(), StoreError>;
}
