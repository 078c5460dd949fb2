use crate::document::{DocumentStore, ItemKey, Table};
use crate::errors::StoreError;
use async_trait::async_trait;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::collections::{BTreeMap, HashMap};

type TableData = BTreeMap<ItemKey, JsonValue>;

/// Point-in-time copy of every table, used for persistence.
#[derive(Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub tables: BTreeMap<Table, Vec<StoredItem>>,
}

#[derive(Debug, PartialEq, Serialize, Deserialize)]
pub struct StoredItem {
    pub key: ItemKey,
    pub item: JsonValue,
}

#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<HashMap<Table, TableData>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_snapshot(snapshot: Snapshot) -> Self {
        let tables = snapshot
            .tables
            .into_iter()
            .map(|(table, items)| {
                let data = items
                    .into_iter()
                    .map(|stored| (stored.key, stored.item))
                    .collect();
                (table, data)
            })
            .collect();

        MemoryStore {
            tables: RwLock::new(tables),
        }
    }

    pub fn snapshot(&self) -> Snapshot {
        let guard = self.tables.read();
        let tables = guard
            .iter()
            .map(|(table, data)| {
                let items = data
                    .iter()
                    .map(|(key, item)| StoredItem {
                        key: key.clone(),
                        item: item.clone(),
                    })
                    .collect();
                (*table, items)
            })
            .collect();

        Snapshot { tables }
    }

    pub fn len(&self, table: Table) -> usize {
        self.tables.read().get(&table).map_or(0, |data| data.len())
    }

    pub fn is_empty(&self) -> bool {
        self.tables.read().values().all(|data| data.is_empty())
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn get(&self, table: Table, key: &ItemKey) -> Result<Option<JsonValue>, StoreError> {
        Ok(self
            .tables
            .read()
            .get(&table)
            .and_then(|data| data.get(key))
            .cloned())
    }

    async fn put(&self, table: Table, key: ItemKey, item: JsonValue) -> Result<(), StoreError> {
        self.tables.write().entry(table).or_default().insert(key, item);
        Ok(())
    }

    async fn put_if_absent(
        &self,
        table: Table,
        key: ItemKey,
        item: JsonValue,
    ) -> Result<bool, StoreError> {
        let mut guard = self.tables.write();
        let data = guard.entry(table).or_default();
        if data.contains_key(&key) {
            return Ok(false);
        }
        data.insert(key, item);
        Ok(true)
    }

    async fn delete(&self, table: Table, key: &ItemKey) -> Result<bool, StoreError> {
        Ok(self
            .tables
            .write()
            .get_mut(&table)
            .is_some_and(|data| data.remove(key).is_some()))
    }

    async fn scan(&self, table: Table) -> Result<Vec<JsonValue>, StoreError> {
        Ok(self
            .tables
            .read()
            .get(&table)
            .map(|data| data.values().cloned().collect())
            .unwrap_or_default())
    }

    async fn query(&self, table: Table, partition: &str) -> Result<Vec<JsonValue>, StoreError> {
        Ok(self
            .tables
            .read()
            .get(&table)
            .map(|data| {
                data.iter()
                    .filter(|(key, _)| key.partition == partition)
                    .map(|(_, item)| item.clone())
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_put_get_delete() {
        let store = MemoryStore::new();
        let key = ItemKey::new("site-1");

        assert_eq!(store.get(Table::Websites, &key).await.unwrap(), None);

        store
            .put(Table::Websites, key.clone(), json!({"id": "site-1"}))
            .await
            .unwrap();
        store
            .put(Table::Websites, key.clone(), json!({"id": "site-1", "v": 2}))
            .await
            .unwrap();
        assert_eq!(
            store.get(Table::Websites, &key).await.unwrap(),
            Some(json!({"id": "site-1", "v": 2}))
        );
        // Tables are independent namespaces
        assert_eq!(store.get(Table::ChatRequests, &key).await.unwrap(), None);

        assert!(store.delete(Table::Websites, &key).await.unwrap());
        assert!(!store.delete(Table::Websites, &key).await.unwrap());
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_put_if_absent() {
        let store = MemoryStore::new();
        let key = ItemKey::with_sort("website#w1", "prompt#p1");

        assert!(
            store
                .put_if_absent(Table::PromptSets, key.clone(), json!({"n": 1}))
                .await
                .unwrap()
        );
        assert!(
            !store
                .put_if_absent(Table::PromptSets, key.clone(), json!({"n": 2}))
                .await
                .unwrap()
        );
        assert_eq!(
            store.get(Table::PromptSets, &key).await.unwrap(),
            Some(json!({"n": 1}))
        );
    }

    #[tokio::test]
    async fn test_query_by_partition() {
        let store = MemoryStore::new();
        for (partition, sort) in [("website#w1", "prompt#b"), ("website#w1", "prompt#a"), ("website#w2", "prompt#a")] {
            store
                .put(
                    Table::PromptSets,
                    ItemKey::with_sort(partition, sort),
                    json!({"pk": partition, "sk": sort}),
                )
                .await
                .unwrap();
        }

        let items = store.query(Table::PromptSets, "website#w1").await.unwrap();
        assert_eq!(
            items,
            vec![
                json!({"pk": "website#w1", "sk": "prompt#a"}),
                json!({"pk": "website#w1", "sk": "prompt#b"}),
            ]
        );
        assert_eq!(store.scan(Table::PromptSets).await.unwrap().len(), 3);
        assert_eq!(store.len(Table::PromptSets), 3);
    }

    #[tokio::test]
    async fn test_snapshot_restore() {
        let store = MemoryStore::new();
        store
            .put(Table::Websites, ItemKey::new("a"), json!({"id": "a"}))
            .await
            .unwrap();
        store
            .put(Table::ChatRequests, ItemKey::new("c"), json!({"id": "c"}))
            .await
            .unwrap();

        let restored = MemoryStore::from_snapshot(store.snapshot());
        assert_eq!(restored.snapshot(), store.snapshot());
        assert_eq!(
            restored.get(Table::ChatRequests, &ItemKey::new("c")).await.unwrap(),
            Some(json!({"id": "c"}))
        );
    }
}
