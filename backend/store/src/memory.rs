use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use tokio::sync::RwLock;

use linkdrop_core::{Code, ContentReference, RecipientId, RecipientRecord};

use crate::store::{BroadcastLog, RecipientStore, ReferenceStore, StoreError};
use crate::types::BroadcastCheckpoint;

/// Process-local store for tests and throwaway runs.
pub struct InMemoryStore {
    files: RwLock<HashMap<Code, (u64, ContentReference)>>,
    users: RwLock<BTreeMap<RecipientId, RecipientRecord>>,
    broadcasts: RwLock<HashMap<String, BroadcastCheckpoint>>,
    seq: std::sync::atomic::AtomicU64,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            files: RwLock::new(HashMap::new()),
            users: RwLock::new(BTreeMap::new()),
            broadcasts: RwLock::new(HashMap::new()),
            seq: std::sync::atomic::AtomicU64::new(0),
        }
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ReferenceStore for InMemoryStore {
    async fn insert(&self, reference: &ContentReference) -> Result<(), StoreError> {
        let mut files = self.files.write().await;
        if files.contains_key(&reference.code) {
            return Err(StoreError::Conflict(reference.code.to_string()));
        }
        let seq = self.seq.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
        files.insert(reference.code.clone(), (seq, reference.clone()));
        Ok(())
    }

    async fn get(&self, code: &Code) -> Result<Option<ContentReference>, StoreError> {
        Ok(self.files.read().await.get(code).map(|(_, r)| r.clone()))
    }

    async fn increment_downloads(&self, code: &Code) -> Result<Option<u64>, StoreError> {
        let mut files = self.files.write().await;
        Ok(files.get_mut(code).map(|(_, r)| {
            r.download_count += 1;
            r.download_count
        }))
    }

    async fn delete(&self, code: &Code) -> Result<Option<ContentReference>, StoreError> {
        Ok(self.files.write().await.remove(code).map(|(_, r)| r))
    }

    async fn list(&self) -> Result<Vec<ContentReference>, StoreError> {
        let files = self.files.read().await;
        let mut rows: Vec<_> = files.values().cloned().collect();
        rows.sort_by(|(sa, a), (sb, b)| b.created_at.cmp(&a.created_at).then(sb.cmp(sa)));
        Ok(rows.into_iter().map(|(_, r)| r).collect())
    }
}

#[async_trait]
impl RecipientStore for InMemoryStore {
    async fn upsert(&self, record: &RecipientRecord) -> Result<(), StoreError> {
        let mut users = self.users.write().await;
        match users.get_mut(&record.id) {
            Some(existing) => {
                existing.display_name = record.display_name.clone();
                existing.username = record.username.clone();
                existing.last_seen = record.last_seen;
            }
            None => {
                users.insert(record.id, record.clone());
            }
        }
        Ok(())
    }

    async fn get(&self, id: RecipientId) -> Result<Option<RecipientRecord>, StoreError> {
        Ok(self.users.read().await.get(&id).cloned())
    }

    async fn ids(&self) -> Result<Vec<RecipientId>, StoreError> {
        Ok(self.users.read().await.keys().copied().collect())
    }

    async fn count(&self) -> Result<u64, StoreError> {
        Ok(self.users.read().await.len() as u64)
    }
}

#[async_trait]
impl BroadcastLog for InMemoryStore {
    async fn save(&self, checkpoint: &BroadcastCheckpoint) -> Result<(), StoreError> {
        self.broadcasts
            .write()
            .await
            .insert(checkpoint.id.clone(), checkpoint.clone());
        Ok(())
    }

    async fn pending(&self) -> Result<Option<BroadcastCheckpoint>, StoreError> {
        Ok(self
            .broadcasts
            .read()
            .await
            .values()
            .max_by_key(|c| c.updated_at)
            .cloned())
    }

    async fn clear(&self, id: &str) -> Result<(), StoreError> {
        self.broadcasts.write().await.remove(id);
        Ok(())
    }
}
