use std::sync::Arc;

use chrono::Utc;

use linkdrop_core::{RecipientId, RecipientRecord, RelayError};
use linkdrop_store::RecipientStore;

/// Known recipients, refreshed on every inbound interaction.
pub struct RecipientDirectory {
    store: Arc<dyn RecipientStore>,
}

impl RecipientDirectory {
    pub fn new(store: Arc<dyn RecipientStore>) -> Self {
        Self { store }
    }

    /// Record that `id` interacted with the relay just now.
    pub async fn touch(
        &self,
        id: RecipientId,
        display_name: &str,
        username: Option<&str>,
    ) -> Result<(), RelayError> {
        let record = RecipientRecord::new(id, display_name, Utc::now())
            .with_username(username.map(str::to_string));
        self.store.upsert(&record).await?;
        Ok(())
    }

    pub async fn get(&self, id: RecipientId) -> Result<Option<RecipientRecord>, RelayError> {
        Ok(self.store.get(id).await?)
    }

    /// Point-in-time list of every recipient id, ascending.
    pub async fn snapshot(&self) -> Result<Vec<RecipientId>, RelayError> {
        Ok(self.store.ids().await?)
    }

    pub async fn count(&self) -> Result<u64, RelayError> {
        Ok(self.store.count().await?)
    }
}
