use std::sync::Arc;

use tracing::info;

use super::{
    config::{Config, StoreBackend},
    join::JoinIndex,
    store::{FileStore, MemoryStore, Store, StoreError},
};

pub struct AppState {
    pub config: Config,
    pub store: Arc<dyn Store>,
    pub join_codes: JoinIndex,
}

impl AppState {
    pub async fn new(config: Config) -> Result<Arc<Self>, StoreError> {
        let store: Arc<dyn Store> = match config.store_backend {
            StoreBackend::File => {
                let store = FileStore::open(&config.data_dir).await?;
                info!("Using data directory {}", store.root().display());
                Arc::new(store)
            }
            StoreBackend::Memory => {
                info!("Using in-memory store, households will not survive a restart");
                Arc::new(MemoryStore::new())
            }
        };

        Self::with_store(config, store).await
    }

    pub async fn with_store(config: Config, store: Arc<dyn Store>) -> Result<Arc<Self>, StoreError> {
        let join_codes = JoinIndex::rebuild(store.as_ref()).await?;

        Ok(Arc::new(Self {
            config,
            store,
            join_codes,
        }))
    }
}
