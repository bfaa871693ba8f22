//! Item storage behind a trait so handlers can run against DynamoDB or memory.

mod dynamo;
mod memory;

use async_trait::async_trait;

pub use dynamo::DynamoStore;
pub use memory::MemoryStore;

use crate::item::Item;
use crate::Result;

/// Key condition for a partition query.
#[derive(Debug, Clone)]
pub struct Query<'a> {
    pub partition_key: &'a str,
    pub partition_value: &'a str,
    /// `(sort key name, prefix)` applied with `begins_with`
    pub sort_prefix: Option<(&'a str, &'a str)>,
}

impl<'a> Query<'a> {
    pub fn partition(partition_key: &'a str, partition_value: &'a str) -> Self {
        Self {
            partition_key,
            partition_value,
            sort_prefix: None,
        }
    }

    pub fn begins_with(mut self, sort_key: &'a str, prefix: &'a str) -> Self {
        self.sort_prefix = Some((sort_key, prefix));
        self
    }
}

/// Single-item operations against a keyed table.
#[async_trait]
pub trait ItemStore: Send + Sync {
    /// Create or replace an item.
    async fn put_item(&self, table: &str, item: Item) -> Result<()>;

    /// Fetch one item by its full primary key.
    async fn get_item(&self, table: &str, key: Item) -> Result<Option<Item>>;

    /// All items of a partition, following pagination.
    async fn query(&self, table: &str, query: Query<'_>) -> Result<Vec<Item>>;

    /// All items of a table, following pagination.
    async fn scan(&self, table: &str) -> Result<Vec<Item>>;

    /// Set attributes on an existing item. Returns `None` when the key does not exist.
    async fn update_item(&self, table: &str, key: Item, changes: Item) -> Result<Option<Item>>;

    /// Delete an item. Returns whether it existed.
    async fn delete_item(&self, table: &str, key: Item) -> Result<bool>;
}
