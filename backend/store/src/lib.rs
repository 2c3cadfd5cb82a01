//! `linkdrop-store`: the key-value collaborators behind the registry, the
//! recipient directory and broadcast checkpoints.

pub mod memory;
pub mod sqlite;
pub mod store;
pub mod types;

pub use memory::InMemoryStore;
pub use sqlite::SqliteStore;
pub use store::{BroadcastLog, RecipientStore, ReferenceStore, StoreError};
pub use types::BroadcastCheckpoint;
