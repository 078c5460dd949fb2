pub mod chat_requests;
pub mod config;
pub mod document;
pub mod errors;
pub mod filesystem;
pub mod memory;
pub mod models;
pub mod prompt_sets;
pub mod websites;

pub use chat_requests::ChatRequests;
pub use config::StoreConfig;
pub use document::{DocumentStore, ItemKey, Table};
pub use errors::StoreError;
pub use filesystem::FilesystemStore;
pub use memory::MemoryStore;
pub use prompt_sets::{PromptSetResolver, PromptSets};
pub use websites::Websites;

use std::sync::Arc;

/// Every repository, sharing one document store handle.
#[derive(Clone)]
pub struct Store {
    documents: Arc<dyn DocumentStore>,
    pub websites: Websites,
    pub prompt_sets: PromptSets,
    pub chat_requests: ChatRequests,
}

impl Store {
    pub fn new(documents: Arc<dyn DocumentStore>) -> Self {
        Store {
            websites: Websites::new(documents.clone()),
            prompt_sets: PromptSets::new(documents.clone()),
            chat_requests: ChatRequests::new(documents.clone()),
            documents,
        }
    }

    pub async fn open(config: &StoreConfig) -> Result<Self, StoreError> {
        let documents: Arc<dyn DocumentStore> = match config {
            StoreConfig::Memory => {
                tracing::warn!("Using the in-memory store, data is lost on restart");
                Arc::new(MemoryStore::new())
            }
            StoreConfig::Filesystem { path } => {
                tracing::info!(path, "Opening filesystem store");
                Arc::new(FilesystemStore::open(path).await?)
            }
        };
        Ok(Store::new(documents))
    }

    pub async fn ping(&self) -> Result<(), StoreError> {
        self.documents.ping().await
    }
}
