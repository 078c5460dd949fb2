use crate::errors::StoreError;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Table {
    Websites,
    PromptSets,
    ChatRequests,
}

/// Primary key of a stored item: a partition key plus an optional sort key.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ItemKey {
    pub partition: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort: Option<String>,
}

impl ItemKey {
    pub fn new(partition: impl Into<String>) -> Self {
        ItemKey {
            partition: partition.into(),
            sort: None,
        }
    }

    pub fn with_sort(partition: impl Into<String>, sort: impl Into<String>) -> Self {
        ItemKey {
            partition: partition.into(),
            sort: Some(sort.into()),
        }
    }
}

/// Key-value document store holding every persisted record.
///
/// Writes are atomic per item and last-writer-wins; `put_if_absent` is the
/// only conditional write. There are no cross-item transactions.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn get(&self, table: Table, key: &ItemKey) -> Result<Option<JsonValue>, StoreError>;

    async fn put(&self, table: Table, key: ItemKey, item: JsonValue) -> Result<(), StoreError>;

    /// Stores `item` only if nothing exists under `key`. Returns whether the
    /// item was written.
    async fn put_if_absent(
        &self,
        table: Table,
        key: ItemKey,
        item: JsonValue,
    ) -> Result<bool, StoreError>;

    /// Returns whether an item was removed.
    async fn delete(&self, table: Table, key: &ItemKey) -> Result<bool, StoreError>;

    /// All items of a table, ordered by key.
    async fn scan(&self, table: Table) -> Result<Vec<JsonValue>, StoreError>;

    /// All items sharing a partition key, ordered by sort key.
    async fn query(&self, table: Table, partition: &str) -> Result<Vec<JsonValue>, StoreError>;

    async fn ping(&self) -> Result<(), StoreError>;
}

pub(crate) fn decode_all<T: DeserializeOwned>(items: Vec<JsonValue>) -> Result<Vec<T>, StoreError> {
    items
        .into_iter()
        .map(|item| serde_json::from_value(item).map_err(StoreError::from))
        .collect()
}
