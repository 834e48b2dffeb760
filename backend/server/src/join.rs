//! # Join Codes
//!
//! In-memory map of join code to household id.
//!
//! - Rebuilt from every stored record at startup
//! - Updated on every create
//! - On a code collision the first household seen keeps the code
//! - A miss, or a hit whose record has disappeared, falls back to a full store scan
use std::collections::{HashMap, hash_map::Entry};

use tokio::sync::RwLock;
use tracing::info;

use crate::store::{Store, StoreError};

#[derive(Default)]
pub struct JoinIndex {
    codes: RwLock<HashMap<String, String>>,
}

impl JoinIndex {
    pub async fn rebuild(store: &dyn Store) -> Result<Self, StoreError> {
        let mut codes = HashMap::new();

        for household in store.list_all().await? {
            codes.entry(household.join_code).or_insert(household.id);
        }

        info!("Indexed {} join codes", codes.len());

        Ok(Self {
            codes: RwLock::new(codes),
        })
    }

    pub async fn insert(&self, code: &str, id: &str) {
        if let Entry::Vacant(entry) = self.codes.write().await.entry(code.to_string()) {
            entry.insert(id.to_string());
        }
    }

    pub(crate) async fn len(&self) -> usize {
        self.codes.read().await.len()
    }

    #[cfg(test)]
    pub(crate) async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    pub async fn lookup(&self, store: &dyn Store, code: &str) -> Result<Option<String>, StoreError> {
        let indexed = self.codes.read().await.get(code).cloned();

        if let Some(id) = indexed {
            match store.get(&id).await {
                Ok(_) => return Ok(Some(id)),
                Err(StoreError::NotFound(_)) => {
                    self.codes.write().await.remove(code);
                }
                Err(e) => return Err(e),
            }
        }

        let found = store
            .list_all()
            .await?
            .into_iter()
            .find(|household| household.join_code == code)
            .map(|household| household.id);

        if let Some(id) = &found {
            self.insert(code, id).await;
        }

        Ok(found)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{household::Household, store::MemoryStore};

    fn household(code: &str) -> Household {
        Household {
            join_code: code.to_string(),
            ..Household::new()
        }
    }

    #[tokio::test]
    async fn test_rebuild_and_lookup() {
        let store = MemoryStore::new();
        let first = household("111111");
        let second = household("222222");
        store.put(&first).await.unwrap();
        store.put(&second).await.unwrap();

        let index = JoinIndex::rebuild(&store).await.unwrap();
        assert_eq!(index.len().await, 2);

        assert_eq!(
            index.lookup(&store, "222222").await.unwrap(),
            Some(second.id)
        );
        assert_eq!(index.lookup(&store, "333333").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_miss_falls_back_to_scan() {
        let store = MemoryStore::new();
        let index = JoinIndex::rebuild(&store).await.unwrap();
        assert!(index.is_empty().await);

        let late = household("444444");
        store.put(&late).await.unwrap();

        assert_eq!(
            index.lookup(&store, "444444").await.unwrap(),
            Some(late.id)
        );
        assert_eq!(index.len().await, 1);
    }

    #[tokio::test]
    async fn test_collision_is_stable() {
        let store = MemoryStore::new();
        let first = household("555555");
        let second = household("555555");
        store.put(&first).await.unwrap();
        store.put(&second).await.unwrap();

        let index = JoinIndex::rebuild(&store).await.unwrap();
        let winner = index.lookup(&store, "555555").await.unwrap().unwrap();

        assert!(winner == first.id || winner == second.id);
        for _ in 0..5 {
            assert_eq!(
                index.lookup(&store, "555555").await.unwrap(),
                Some(winner.clone())
            );
        }
    }

    #[tokio::test]
    async fn test_stale_entry_is_dropped() {
        let store = MemoryStore::new();
        let index = JoinIndex::default();

        index.insert("666666", "gone").await;
        assert_eq!(index.lookup(&store, "666666").await.unwrap(), None);
        assert!(index.is_empty().await);
    }
}
