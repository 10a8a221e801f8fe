//! In-process [`DocumentStore`], used for local development and tests.

use std::{
    collections::HashMap,
    sync::atomic::{AtomicBool, Ordering},
};

use async_trait::async_trait;
use serde_json::{Map, Value};
use tokio::sync::RwLock;

use super::{DocumentStore, Filter, StoreError, StoreResult, StoredDocument};

#[derive(Debug, Default)]
pub struct MemoryStore {
    // Insertion order is kept per collection so queries come back oldest first
    collections: RwLock<HashMap<String, Vec<StoredDocument>>>,
    unavailable: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every following call fail with [`StoreError::Unavailable`] until reset.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    fn check_available(&self) -> StoreResult<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("memory store is offline".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn get(&self, collection: &str, id: &str) -> StoreResult<Option<Value>> {
        self.check_available()?;
        let collections = self.collections.read().await;
        Ok(collections
            .get(collection)
            .and_then(|docs| docs.iter().find(|d| d.id == id))
            .map(|d| d.data.clone()))
    }

    async fn create(&self, collection: &str, id: &str, doc: Value) -> StoreResult<String> {
        self.check_available()?;
        let mut collections = self.collections.write().await;
        let docs = collections.entry(collection.to_string()).or_default();
        if docs.iter().any(|d| d.id == id) {
            return Err(StoreError::AlreadyExists {
                collection: collection.to_string(),
                id: id.to_string(),
            });
        }
        docs.push(StoredDocument {
            id: id.to_string(),
            data: doc,
        });
        Ok(id.to_string())
    }

    async fn set(&self, collection: &str, id: &str, doc: Value) -> StoreResult<()> {
        self.check_available()?;
        let mut collections = self.collections.write().await;
        let docs = collections.entry(collection.to_string()).or_default();
        match docs.iter_mut().find(|d| d.id == id) {
            Some(existing) => existing.data = doc,
            None => docs.push(StoredDocument {
                id: id.to_string(),
                data: doc,
            }),
        }
        Ok(())
    }

    async fn update(&self, collection: &str, id: &str, patch: Map<String, Value>) -> StoreResult<()> {
        self.check_available()?;
        let mut collections = self.collections.write().await;
        let missing = || StoreError::Missing {
            collection: collection.to_string(),
            id: id.to_string(),
        };
        let existing = collections
            .get_mut(collection)
            .and_then(|docs| docs.iter_mut().find(|d| d.id == id))
            .ok_or_else(missing)?;
        let Value::Object(fields) = &mut existing.data else {
            return Err(missing());
        };
        fields.extend(patch);
        Ok(())
    }

    async fn query(&self, collection: &str, filters: &[Filter]) -> StoreResult<Vec<StoredDocument>> {
        self.check_available()?;
        let collections = self.collections.read().await;
        Ok(collections
            .get(collection)
            .map(|docs| {
                docs.iter()
                    .filter(|d| filters.iter().all(|f| f.matches(&d.data)))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_create_get_and_conflict() {
        let store = MemoryStore::new();
        store
            .create("things", "a", json!({ "name": "first" }))
            .await
            .unwrap();

        assert_eq!(
            store.get("things", "a").await.unwrap(),
            Some(json!({ "name": "first" }))
        );
        assert_eq!(store.get("things", "b").await.unwrap(), None);
        assert_eq!(store.get("other", "a").await.unwrap(), None);

        let err = store.create("things", "a", json!({})).await.unwrap_err();
        assert!(matches!(err, StoreError::AlreadyExists { .. }));
    }

    #[tokio::test]
    async fn test_update_merges_top_level_fields() {
        let store = MemoryStore::new();
        store
            .create("things", "a", json!({ "name": "first", "count": 1 }))
            .await
            .unwrap();

        let mut patch = Map::new();
        patch.insert("count".to_string(), json!(2));
        patch.insert("extra".to_string(), json!(true));
        store.update("things", "a", patch).await.unwrap();

        assert_eq!(
            store.get("things", "a").await.unwrap(),
            Some(json!({ "name": "first", "count": 2, "extra": true }))
        );

        let err = store.update("things", "zzz", Map::new()).await.unwrap_err();
        assert!(matches!(err, StoreError::Missing { .. }));
    }

    #[tokio::test]
    async fn test_set_replaces_whole_document() {
        let store = MemoryStore::new();
        store
            .set("things", "a", json!({ "name": "first", "count": 1 }))
            .await
            .unwrap();
        store.set("things", "a", json!({ "name": "second" })).await.unwrap();

        assert_eq!(
            store.get("things", "a").await.unwrap(),
            Some(json!({ "name": "second" }))
        );
    }

    #[tokio::test]
    async fn test_query_filters_and_keeps_insertion_order() {
        let store = MemoryStore::new();
        store
            .create("things", "1", json!({ "owner": "u1", "kind": "x" }))
            .await
            .unwrap();
        store
            .create("things", "2", json!({ "owner": "u2", "kind": "x" }))
            .await
            .unwrap();
        store
            .create("things", "3", json!({ "owner": "u1", "kind": "y" }))
            .await
            .unwrap();

        let owned = store
            .query("things", &[Filter::eq("owner", "u1")])
            .await
            .unwrap();
        let ids: Vec<_> = owned.iter().map(|d| d.id.as_str()).collect();
        assert_eq!(ids, ["1", "3"]);

        let narrowed = store
            .query("things", &[Filter::eq("owner", "u1"), Filter::eq("kind", "y")])
            .await
            .unwrap();
        assert_eq!(narrowed.len(), 1);
        assert_eq!(narrowed[0].id, "3");

        assert!(store.query("empty", &[]).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unavailable_store_fails_every_call() {
        let store = MemoryStore::new();
        store.set_unavailable(true);
        assert!(matches!(
            store.get("things", "a").await,
            Err(StoreError::Unavailable(_))
        ));
        assert!(store.query("things", &[]).await.is_err());

        store.set_unavailable(false);
        assert!(store.get("things", "a").await.is_ok());
    }
}
