use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info, warn};

use linkdrop_core::{Code, ContentDraft, ContentReference, RelayError};
use linkdrop_logging::{EventLogger, RelayEvent};
use linkdrop_store::{ReferenceStore, StoreError};

/// How many fresh codes `create` draws before giving up on collisions.
const MAX_CODE_ATTEMPTS: usize = 3;

/// Aggregate numbers for the operator's `/stats`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryStats {
    pub files: usize,
    pub downloads: u64,
    /// Most downloaded references, ties broken newest first.
    pub top: Vec<ContentReference>,
}

/// Codes → content references over a [`ReferenceStore`].
pub struct Registry {
    store: Arc<dyn ReferenceStore>,
}

impl Registry {
    pub fn new(store: Arc<dyn ReferenceStore>) -> Self {
        Self { store }
    }

    /// Persist an upload under a fresh code with a zero download count.
    pub async fn create(&self, draft: ContentDraft) -> Result<ContentReference, RelayError> {
        for attempt in 1..=MAX_CODE_ATTEMPTS {
            let reference = draft.clone().into_reference(Code::generate(), Utc::now());
            match self.store.insert(&reference).await {
                Ok(()) => {
                    info!(code = %reference.code, kind = %reference.kind, "Registered content");
                    EventLogger::log_event(RelayEvent::Upload {
                        code: reference.code.to_string(),
                        kind: reference.kind.to_string(),
                    });
                    return Ok(reference);
                }
                Err(StoreError::Conflict(code)) => {
                    warn!(code = %code, attempt, "Code collision, drawing a new one");
                }
                Err(e) => return Err(e.into()),
            }
        }
        Err(RelayError::StorageError(format!(
            "no unique code after {MAX_CODE_ATTEMPTS} attempts"
        )))
    }

    pub async fn find(&self, code: &Code) -> Result<Option<ContentReference>, RelayError> {
        Ok(self.store.get(code).await?)
    }

    pub async fn get(&self, code: &Code) -> Result<ContentReference, RelayError> {
        self.find(code)
            .await?
            .ok_or_else(|| RelayError::NotFound(code.clone()))
    }

    /// Count one successful delivery of `code`; returns the new total.
    pub async fn record_download(&self, code: &Code) -> Result<u64, RelayError> {
        let count = self
            .store
            .increment_downloads(code)
            .await?
            .ok_or_else(|| RelayError::NotFound(code.clone()))?;
        debug!(code = %code, count, "Recorded download");
        Ok(count)
    }

    pub async fn delete(&self, code: &Code) -> Result<ContentReference, RelayError> {
        let removed = self
            .store
            .delete(code)
            .await?
            .ok_or_else(|| RelayError::NotFound(code.clone()))?;
        info!(code = %code, "Deleted content");
        EventLogger::log_event(RelayEvent::Deleted { code: code.to_string() });
        Ok(removed)
    }

    /// Every reference, newest first.
    pub async fn list_all(&self) -> Result<Vec<ContentReference>, RelayError> {
        Ok(self.store.list().await?)
    }

    pub async fn stats(&self, top_n: usize) -> Result<RegistryStats, RelayError> {
        let mut all = self.list_all().await?;
        let downloads = all.iter().map(|r| r.download_count).sum();
        let files = all.len();
        // Stable sort keeps newest-first order among equal counts.
        all.sort_by(|a, b| b.download_count.cmp(&a.download_count));
        all.truncate(top_n);
        Ok(RegistryStats { files, downloads, top: all })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use linkdrop_core::ContentKind;
    use linkdrop_store::InMemoryStore;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn registry() -> Registry {
        Registry::new(Arc::new(InMemoryStore::new()))
    }

    #[tokio::test]
    async fn get_after_create_returns_the_draft_with_zero_downloads() {
        let registry = registry();
        let draft = ContentDraft::new(ContentKind::Audio, "CQAC")
            .with_display_name("song.mp3")
            .with_caption("live");
        let created = registry.create(draft.clone()).await.unwrap();
        let loaded = registry.get(&created.code).await.unwrap();
        assert_eq!(loaded, created);
        assert_eq!(loaded.kind, draft.kind);
        assert_eq!(loaded.external_id, draft.external_id);
        assert_eq!(loaded.display_name, "song.mp3");
        assert_eq!(loaded.caption.as_deref(), Some("live"));
        assert_eq!(loaded.download_count, 0);
    }

    #[tokio::test]
    async fn get_unknown_code_is_not_found() {
        let err = registry().get(&Code::generate()).await.unwrap_err();
        assert!(matches!(err, RelayError::NotFound(_)));
    }

    #[tokio::test]
    async fn record_download_is_monotonic() {
        let registry = registry();
        let created = registry
            .create(ContentDraft::new(ContentKind::Photo, "X1"))
            .await
            .unwrap();
        let mut last = 0;
        for _ in 0..5 {
            let count = registry.record_download(&created.code).await.unwrap();
            assert!(count > last);
            last = count;
        }
        assert_eq!(registry.get(&created.code).await.unwrap().download_count, 5);
    }

    #[tokio::test]
    async fn concurrent_downloads_are_all_counted() {
        let registry = Arc::new(registry());
        let created = registry
            .create(ContentDraft::new(ContentKind::Photo, "X1"))
            .await
            .unwrap();
        let mut handles = Vec::new();
        for _ in 0..20 {
            let registry = Arc::clone(&registry);
            let code = created.code.clone();
            handles.push(tokio::spawn(async move { registry.record_download(&code).await }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }
        assert_eq!(registry.get(&created.code).await.unwrap().download_count, 20);
    }

    #[tokio::test]
    async fn delete_twice_reports_not_found() {
        let registry = registry();
        let created = registry
            .create(ContentDraft::new(ContentKind::Sticker, "CAAC"))
            .await
            .unwrap();
        registry.delete(&created.code).await.unwrap();
        assert!(matches!(
            registry.delete(&created.code).await.unwrap_err(),
            RelayError::NotFound(_)
        ));
    }

    #[tokio::test]
    async fn stats_sum_downloads_and_rank_top() {
        let registry = registry();
        let mut codes = Vec::new();
        for i in 0..7 {
            let created = registry
                .create(ContentDraft::new(ContentKind::Document, format!("doc{i}")))
                .await
                .unwrap();
            for _ in 0..i {
                registry.record_download(&created.code).await.unwrap();
            }
            codes.push(created.code);
        }
        let stats = registry.stats(5).await.unwrap();
        assert_eq!(stats.files, 7);
        assert_eq!(stats.downloads, (0..7).sum::<u64>());
        assert_eq!(stats.top.len(), 5);
        assert_eq!(stats.top[0].code, codes[6]);
        assert_eq!(stats.top[4].code, codes[2]);
    }

    /// Store that reports a collision for the first `collisions` inserts.
    struct CollidingStore {
        inner: InMemoryStore,
        collisions: AtomicUsize,
    }

    #[async_trait]
    impl ReferenceStore for CollidingStore {
        async fn insert(&self, reference: &ContentReference) -> Result<(), StoreError> {
            if self.collisions.load(Ordering::SeqCst) > 0 {
                self.collisions.fetch_sub(1, Ordering::SeqCst);
                return Err(StoreError::Conflict(reference.code.to_string()));
            }
            self.inner.insert(reference).await
        }
        async fn get(&self, code: &Code) -> Result<Option<ContentReference>, StoreError> {
            ReferenceStore::get(&self.inner, code).await
        }
        async fn increment_downloads(&self, code: &Code) -> Result<Option<u64>, StoreError> {
            self.inner.increment_downloads(code).await
        }
        async fn delete(&self, code: &Code) -> Result<Option<ContentReference>, StoreError> {
            self.inner.delete(code).await
        }
        async fn list(&self) -> Result<Vec<ContentReference>, StoreError> {
            self.inner.list().await
        }
    }

    #[tokio::test]
    async fn create_retries_on_code_collision() {
        let store = CollidingStore { inner: InMemoryStore::new(), collisions: AtomicUsize::new(2) };
        let registry = Registry::new(Arc::new(store));
        assert!(registry.create(ContentDraft::new(ContentKind::Photo, "X1")).await.is_ok());
    }

    #[tokio::test]
    async fn create_gives_up_after_repeated_collisions() {
        let store = CollidingStore { inner: InMemoryStore::new(), collisions: AtomicUsize::new(10) };
        let registry = Registry::new(Arc::new(store));
        let err = registry
            .create(ContentDraft::new(ContentKind::Photo, "X1"))
            .await
            .unwrap_err();
        assert!(matches!(err, RelayError::StorageError(_)));
    }
}
