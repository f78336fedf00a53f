use super::{DocumentStore, field_matches, merge_document};
use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::debug;

/// In-memory document store. Collections keep insertion order.
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<HashMap<String, Vec<Value>>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn upsert(
        &self,
        collection: &str,
        key_field: &str,
        key_value: &str,
        record: Value,
    ) -> Result<()> {
        let mut collections = self.inner.lock().await;
        let documents = collections.entry(collection.to_string()).or_default();

        match documents
            .iter_mut()
            .find(|doc| field_matches(doc, key_field, key_value))
        {
            Some(existing) => {
                *existing = merge_document(Some(existing.take()), key_field, key_value, record)?;
                debug!(collection, key_value, "Store UPDATE");
            }
            None => {
                documents.push(merge_document(None, key_field, key_value, record)?);
                debug!(collection, key_value, "Store INSERT");
            }
        }
        Ok(())
    }

    async fn find_all(&self, collection: &str) -> Result<Vec<Value>> {
        let collections = self.inner.lock().await;
        Ok(collections.get(collection).cloned().unwrap_or_default())
    }

    async fn find_one(
        &self,
        collection: &str,
        key_field: &str,
        key_value: &str,
    ) -> Result<Option<Value>> {
        let collections = self.inner.lock().await;
        Ok(collections.get(collection).and_then(|docs| {
            docs.iter()
                .find(|doc| field_matches(doc, key_field, key_value))
                .cloned()
        }))
    }
}
