use super::{DocumentStore, field_matches, merge_document};
use anyhow::{Context, Result};
use async_trait::async_trait;
use fjall::{Keyspace, PartitionCreateOptions, PartitionHandle, PersistMode};
use serde_json::Value;
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

/// Document store on a fjall keyspace: one partition per collection,
/// documents keyed by their key value and stored as JSON.
#[derive(Clone)]
pub struct DiskStore {
    keyspace: Arc<Keyspace>,
}

impl DiskStore {
    pub fn open(path: &Path) -> Result<Self> {
        std::fs::create_dir_all(path)?;
        let keyspace = fjall::Config::new(path).open()?;
        Ok(Self {
            keyspace: Arc::new(keyspace),
        })
    }

    fn partition(&self, collection: &str) -> Result<PartitionHandle> {
        self.keyspace
            .open_partition(collection, PartitionCreateOptions::default())
            .with_context(|| format!("Failed to open collection {collection}"))
    }

    fn decode(bytes: &[u8]) -> Result<Value> {
        Ok(serde_json::from_slice(bytes)?)
    }
}

#[async_trait]
impl DocumentStore for DiskStore {
    async fn upsert(
        &self,
        collection: &str,
        key_field: &str,
        key_value: &str,
        record: Value,
    ) -> Result<()> {
        let partition = self.partition(collection)?;
        let existing = partition
            .get(key_value.as_bytes())?
            .map(|bytes| Self::decode(&bytes))
            .transpose()?;
        let merged = merge_document(existing, key_field, key_value, record)?;

        partition.insert(key_value.as_bytes(), serde_json::to_vec(&merged)?)?;
        self.keyspace.persist(PersistMode::SyncAll)?;
        debug!(collection, key_value, "Store PUT");
        Ok(())
    }

    async fn find_all(&self, collection: &str) -> Result<Vec<Value>> {
        let partition = self.partition(collection)?;
        partition
            .iter()
            .map(|entry| {
                let (_, value) = entry?;
                Self::decode(&value)
            })
            .collect()
    }

    async fn find_one(
        &self,
        collection: &str,
        key_field: &str,
        key_value: &str,
    ) -> Result<Option<Value>> {
        let partition = self.partition(collection)?;
        if let Some(bytes) = partition.get(key_value.as_bytes())? {
            let document = Self::decode(&bytes)?;
            if field_matches(&document, key_field, key_value) {
                return Ok(Some(document));
            }
        }
        // not keyed by this field; fall back to a scan
        Ok(self
            .find_all(collection)
            .await?
            .into_iter()
            .find(|doc| field_matches(doc, key_field, key_value)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_disk_store_upsert_and_find() {
        let dir = tempdir().unwrap();
        let store = DiskStore::open(dir.path()).unwrap();

        // Initially, store is empty
        assert!(store.find_all("wallets").await.unwrap().is_empty());

        store
            .upsert("wallets", "id", "uala", json!({"tna": 50.0, "name": "Ualá"}))
            .await
            .unwrap();
        store
            .upsert("wallets", "id", "uala", json!({"tna": 55.0}))
            .await
            .unwrap();

        let found = store.find_one("wallets", "id", "uala").await.unwrap().unwrap();
        assert_eq!(found, json!({"id": "uala", "tna": 55.0, "name": "Ualá"}));
        assert!(store.find_one("wallets", "id", "brubank").await.unwrap().is_none());
        assert!(store.find_one("wallets", "name", "Ualá").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_disk_store_survives_reopen() {
        let dir = tempdir().unwrap();
        {
            let store = DiskStore::open(dir.path()).unwrap();
            store
                .upsert("wallets", "id", "mercado_pago", json!({"tna": 54.2}))
                .await
                .unwrap();
        }

        let store = DiskStore::open(dir.path()).unwrap();
        let all = store.find_all("wallets").await.unwrap();
        assert_eq!(all, vec![json!({"tna": 54.2, "id": "mercado_pago"})]);
    }
}
