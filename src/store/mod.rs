pub mod disk;
pub mod memory;

use crate::core::config::AppConfig;
use crate::core::wallet::WalletRate;
use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use disk::DiskStore;
use memory::MemoryStore;
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::{debug, warn};

/// `STORE_URI` value selecting the non-persistent backend.
pub const MEMORY_URI: &str = "memory";

/// Minimal document store: JSON documents grouped in named collections.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Merges `record` into the document whose `key_field` equals `key_value`,
    /// inserting it when absent.
    async fn upsert(
        &self,
        collection: &str,
        key_field: &str,
        key_value: &str,
        record: Value,
    ) -> Result<()>;

    async fn find_all(&self, collection: &str) -> Result<Vec<Value>>;

    async fn find_one(
        &self,
        collection: &str,
        key_field: &str,
        key_value: &str,
    ) -> Result<Option<Value>>;
}

/// Applies `record` over `existing` field by field and pins the key.
pub(crate) fn merge_document(
    existing: Option<Value>,
    key_field: &str,
    key_value: &str,
    record: Value,
) -> Result<Value> {
    let Value::Object(fields) = record else {
        bail!("Document for {key_field}={key_value} is not a JSON object");
    };
    let mut merged = match existing {
        Some(Value::Object(map)) => map,
        _ => Map::new(),
    };
    merged.extend(fields);
    merged.insert(key_field.to_string(), Value::String(key_value.to_string()));
    Ok(Value::Object(merged))
}

pub(crate) fn field_matches(document: &Value, key_field: &str, key_value: &str) -> bool {
    document.get(key_field).and_then(Value::as_str) == Some(key_value)
}

/// Opens the backend selected by the store configuration.
pub fn open(config: &AppConfig) -> Result<Arc<dyn DocumentStore>> {
    if config.store.uri.as_deref() == Some(MEMORY_URI) {
        debug!("Using in-memory document store");
        return Ok(Arc::new(MemoryStore::new()));
    }
    let path = config.default_data_path()?.join(&config.store.db_name);
    debug!("Using on-disk document store at {}", path.display());
    let store = DiskStore::open(&path)
        .with_context(|| format!("Failed to open store at {}", path.display()))?;
    Ok(Arc::new(store))
}

const WALLET_KEY_FIELD: &str = "id";

/// Typed access to the wallets collection.
#[derive(Clone)]
pub struct WalletRepository {
    store: Arc<dyn DocumentStore>,
    collection: String,
}

impl WalletRepository {
    pub fn new(store: Arc<dyn DocumentStore>, collection: &str) -> Self {
        Self {
            store,
            collection: collection.to_string(),
        }
    }

    pub async fn save(&self, wallet: &WalletRate) -> Result<()> {
        let record = serde_json::to_value(wallet)?;
        self.store
            .upsert(&self.collection, WALLET_KEY_FIELD, &wallet.id, record)
            .await
            .with_context(|| format!("Failed to persist wallet {}", wallet.id))
    }

    pub async fn list(&self) -> Result<Vec<WalletRate>> {
        let documents = self.store.find_all(&self.collection).await?;
        Ok(documents
            .into_iter()
            .filter_map(|doc| match serde_json::from_value::<WalletRate>(doc) {
                Ok(wallet) => Some(wallet),
                Err(e) => {
                    warn!("Skipping malformed wallet document: {}", e);
                    None
                }
            })
            .collect())
    }

    pub async fn get(&self, id: &str) -> Result<Option<WalletRate>> {
        match self
            .store
            .find_one(&self.collection, WALLET_KEY_FIELD, id)
            .await?
        {
            Some(doc) => Ok(Some(
                serde_json::from_value(doc)
                    .with_context(|| format!("Malformed wallet document for {id}"))?,
            )),
            None => Ok(None),
        }
    }
}
