//! # Store
//!
//! Durable home of every household record.
//!
//! ## Layout
//!
//! - One JSON file per household, `<id>.json`, inside the data directory
//! - The whole record is written on every change, there are no partial updates
//! - Each write lands in its own `<id>.json.<uuid>.tmp` and is renamed over the record
//!
//! ## Backends
//!
//! - [`FileStore`]: the data directory above, created at startup and never torn down
//! - [`MemoryStore`]: a map behind a lock, gone when the process exits
//!
//! Both sit behind the [`Store`] trait so the routes never see which one is in use.
//!
//! ## Identifiers
//!
//! The household id doubles as the file name, so anything outside
//! `[A-Za-z0-9_-]{1,64}` is refused before it reaches the filesystem.
use std::{
    collections::HashMap,
    io::{self, ErrorKind},
    path::{Path, PathBuf},
};

use async_trait::async_trait;
use thiserror::Error;
use tokio::{fs, sync::RwLock};
use tracing::warn;
use uuid::Uuid;

use crate::household::Household;

const RECORD_EXTENSION: &str = "json";
const MAX_ID_LEN: usize = 64;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("No household record for {0}")]
    NotFound(String),

    #[error("Household record {id} is not valid JSON: {source}")]
    CorruptRecord {
        id: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Store I/O error: {0}")]
    Io(#[from] io::Error),
}

#[async_trait]
pub trait Store: Send + Sync {
    async fn put(&self, household: &Household) -> Result<(), StoreError>;

    async fn get(&self, id: &str) -> Result<Household, StoreError>;

    async fn list_all(&self) -> Result<Vec<Household>, StoreError>;
}

pub fn is_valid_id(id: &str) -> bool {
    !id.is_empty()
        && id.len() <= MAX_ID_LEN
        && id
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
}

pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    pub async fn open(root: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let root = root.into();
        fs::create_dir_all(&root).await?;

        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn record_path(&self, id: &str) -> PathBuf {
        self.root.join(format!("{id}.{RECORD_EXTENSION}"))
    }
}

#[async_trait]
impl Store for FileStore {
    async fn put(&self, household: &Household) -> Result<(), StoreError> {
        if !is_valid_id(&household.id) {
            return Err(io::Error::new(
                ErrorKind::InvalidInput,
                format!("invalid household id {:?}", household.id),
            )
            .into());
        }

        let bytes = serde_json::to_vec(household).map_err(io::Error::from)?;

        let path = self.record_path(&household.id);
        let tmp = path.with_extension(format!(
            "{RECORD_EXTENSION}.{}.tmp",
            Uuid::new_v4().simple()
        ));

        fs::write(&tmp, bytes).await?;
        if let Err(e) = fs::rename(&tmp, &path).await {
            let _ = fs::remove_file(&tmp).await;
            return Err(e.into());
        }

        Ok(())
    }

    async fn get(&self, id: &str) -> Result<Household, StoreError> {
        if !is_valid_id(id) {
            return Err(StoreError::NotFound(id.to_string()));
        }

        let bytes = match fs::read(self.record_path(id)).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(StoreError::NotFound(id.to_string()));
            }
            Err(e) => return Err(e.into()),
        };

        serde_json::from_slice(&bytes).map_err(|source| StoreError::CorruptRecord {
            id: id.to_string(),
            source,
        })
    }

    async fn list_all(&self) -> Result<Vec<Household>, StoreError> {
        let mut households = Vec::new();
        let mut entries = fs::read_dir(&self.root).await?;

        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();

            if path.extension().and_then(|ext| ext.to_str()) != Some(RECORD_EXTENSION) {
                continue;
            }

            let bytes = match fs::read(&path).await {
                Ok(bytes) => bytes,
                // removed between read_dir and read
                Err(e) if e.kind() == ErrorKind::NotFound => continue,
                Err(e) => {
                    warn!("Skipping unreadable record {}: {e}", path.display());
                    continue;
                }
            };

            match serde_json::from_slice(&bytes) {
                Ok(household) => households.push(household),
                Err(e) => warn!("Skipping corrupt record {}: {e}", path.display()),
            }
        }

        Ok(households)
    }
}

#[derive(Default)]
pub struct MemoryStore {
    households: RwLock<HashMap<String, Household>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn put(&self, household: &Household) -> Result<(), StoreError> {
        self.households
            .write()
            .await
            .insert(household.id.clone(), household.clone());

        Ok(())
    }

    async fn get(&self, id: &str) -> Result<Household, StoreError> {
        self.households
            .read()
            .await
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(id.to_string()))
    }

    async fn list_all(&self) -> Result<Vec<Household>, StoreError> {
        Ok(self.households.read().await.values().cloned().collect())
    }
}
