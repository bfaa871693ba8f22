use std::collections::HashMap;

use async_trait::async_trait;
use aws_sdk_dynamodb::types::AttributeValue;
use tokio::sync::RwLock;

use super::{ItemStore, Query};
use crate::item::Item;
use crate::{Error, Result};

#[derive(Debug, Clone)]
struct KeySchema {
    partition_key: String,
    sort_key: Option<String>,
}

#[derive(Debug)]
struct Table {
    schema: KeySchema,
    items: Vec<Item>,
}

impl Table {
    fn key_of(&self, item: &Item) -> Result<Item> {
        let mut key = Item::new();
        let names = std::iter::once(&self.schema.partition_key).chain(self.schema.sort_key.as_ref());
        for name in names {
            let value = item
                .get(name)
                .ok_or_else(|| Error::Validation(format!("missing key attribute `{name}`")))?;
            key.insert(name.clone(), value.clone());
        }
        Ok(key)
    }

    fn position(&self, key: &Item) -> Option<usize> {
        self.items
            .iter()
            .position(|item| key.iter().all(|(name, value)| item.get(name) == Some(value)))
    }
}

/// In-process item store with DynamoDB put/replace semantics.
///
/// Tables must be registered with their key schema before use, mirroring
/// `CreateTable`.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<HashMap<String, Table>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a table with a partition key and optional sort key.
    pub fn with_table(mut self, name: &str, partition_key: &str, sort_key: Option<&str>) -> Self {
        let table = Table {
            schema: KeySchema {
                partition_key: partition_key.to_string(),
                sort_key: sort_key.map(str::to_string),
            },
            items: Vec::new(),
        };
        self.tables.get_mut().insert(name.to_string(), table);
        self
    }
}

fn missing_table(name: &str) -> Error {
    Error::Aws(format!("ResourceNotFoundException: table `{name}` does not exist"))
}

fn sort_value(item: &Item, sort_key: Option<&String>) -> String {
    sort_key
        .and_then(|key| item.get(key))
        .and_then(|value| value.as_s().ok().cloned())
        .unwrap_or_default()
}

#[async_trait]
impl ItemStore for MemoryStore {
    async fn put_item(&self, table: &str, item: Item) -> Result<()> {
        let mut tables = self.tables.write().await;
        let entry = tables.get_mut(table).ok_or_else(|| missing_table(table))?;
        let key = entry.key_of(&item)?;
        match entry.position(&key) {
            Some(index) => entry.items[index] = item,
            None => entry.items.push(item),
        }
        Ok(())
    }

    async fn get_item(&self, table: &str, key: Item) -> Result<Option<Item>> {
        let tables = self.tables.read().await;
        let entry = tables.get(table).ok_or_else(|| missing_table(table))?;
        Ok(entry.position(&key).map(|index| entry.items[index].clone()))
    }

    async fn query(&self, table: &str, query: Query<'_>) -> Result<Vec<Item>> {
        let tables = self.tables.read().await;
        let entry = tables.get(table).ok_or_else(|| missing_table(table))?;
        let partition = AttributeValue::S(query.partition_value.to_string());

        let mut items: Vec<Item> = entry
            .items
            .iter()
            .filter(|item| item.get(query.partition_key) == Some(&partition))
            .filter(|item| match query.sort_prefix {
                Some((sort_key, prefix)) => item
                    .get(sort_key)
                    .and_then(|value| value.as_s().ok())
                    .is_some_and(|value| value.starts_with(prefix)),
                None => true,
            })
            .cloned()
            .collect();
        items.sort_by_key(|item| sort_value(item, entry.schema.sort_key.as_ref()));
        Ok(items)
    }

    async fn scan(&self, table: &str) -> Result<Vec<Item>> {
        let tables = self.tables.read().await;
        let entry = tables.get(table).ok_or_else(|| missing_table(table))?;
        Ok(entry.items.clone())
    }

    async fn update_item(&self, table: &str, key: Item, changes: Item) -> Result<Option<Item>> {
        let mut tables = self.tables.write().await;
        let entry = tables.get_mut(table).ok_or_else(|| missing_table(table))?;
        let Some(index) = entry.position(&key) else {
            return Ok(None);
        };
        let item = &mut entry.items[index];
        item.extend(changes);
        Ok(Some(item.clone()))
    }

    async fn delete_item(&self, table: &str, key: Item) -> Result<bool> {
        let mut tables = self.tables.write().await;
        let entry = tables.get_mut(table).ok_or_else(|| missing_table(table))?;
        match entry.position(&key) {
            Some(index) => {
                entry.items.remove(index);
                Ok(true)
            }
            None => Ok(false),
        }
    }
}
