//! Helpers for reading and writing DynamoDB attribute maps.

use std::collections::HashMap;

use aws_sdk_dynamodb::types::AttributeValue;
use chrono::{DateTime, Utc};

use crate::{Error, Result};

/// A DynamoDB item (or key) as an attribute map.
pub type Item = HashMap<String, AttributeValue>;

/// Fluent builder for attribute maps.
#[derive(Debug, Default)]
pub struct ItemBuilder {
    item: Item,
}

impl ItemBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn s(mut self, key: &str, value: impl Into<String>) -> Self {
        self.item.insert(key.to_string(), AttributeValue::S(value.into()));
        self
    }

    pub fn opt_s(self, key: &str, value: Option<impl Into<String>>) -> Self {
        match value {
            Some(value) => self.s(key, value),
            None => self,
        }
    }

    pub fn n(mut self, key: &str, value: impl ToString) -> Self {
        self.item
            .insert(key.to_string(), AttributeValue::N(value.to_string()));
        self
    }

    pub fn bool(mut self, key: &str, value: bool) -> Self {
        self.item.insert(key.to_string(), AttributeValue::Bool(value));
        self
    }

    pub fn time(self, key: &str, value: DateTime<Utc>) -> Self {
        self.s(key, value.to_rfc3339())
    }

    pub fn opt_time(self, key: &str, value: Option<DateTime<Utc>>) -> Self {
        self.opt_s(key, value.map(|v| v.to_rfc3339()))
    }

    pub fn list(mut self, key: &str, values: &[String]) -> Self {
        let list = values.iter().cloned().map(AttributeValue::S).collect();
        self.item.insert(key.to_string(), AttributeValue::L(list));
        self
    }

    pub fn build(self) -> Item {
        self.item
    }
}

/// Typed accessors over a borrowed item.
pub struct ItemReader<'a> {
    item: &'a Item,
}

impl<'a> ItemReader<'a> {
    pub fn new(item: &'a Item) -> Self {
        Self { item }
    }

    pub fn opt_str(&self, key: &str) -> Option<String> {
        self.item
            .get(key)
            .and_then(|v| v.as_s().ok())
            .map(|s| s.to_string())
    }

    pub fn str(&self, key: &str) -> Result<String> {
        self.opt_str(key)
            .ok_or_else(|| Error::Aws(format!("missing attribute `{key}`")))
    }

    pub fn opt_f64(&self, key: &str) -> Option<f64> {
        self.item
            .get(key)
            .and_then(|v| v.as_n().ok())
            .and_then(|n| n.parse::<f64>().ok())
    }

    pub fn f64_or(&self, key: &str, default: f64) -> f64 {
        self.opt_f64(key).unwrap_or(default)
    }

    pub fn opt_u32(&self, key: &str) -> Option<u32> {
        self.item
            .get(key)
            .and_then(|v| v.as_n().ok())
            .and_then(|n| n.parse::<u32>().ok())
    }

    pub fn u32(&self, key: &str) -> Result<u32> {
        self.opt_u32(key)
            .ok_or_else(|| Error::Aws(format!("missing numeric attribute `{key}`")))
    }

    pub fn bool_or(&self, key: &str, default: bool) -> bool {
        self.item
            .get(key)
            .and_then(|v| v.as_bool().ok())
            .copied()
            .unwrap_or(default)
    }

    pub fn list(&self, key: &str) -> Vec<String> {
        match self.item.get(key) {
            Some(AttributeValue::L(values)) => values
                .iter()
                .filter_map(|v| v.as_s().ok().map(|s| s.to_string()))
                .collect(),
            Some(AttributeValue::Ss(values)) => values.clone(),
            _ => Vec::new(),
        }
    }

    pub fn time(&self, key: &str) -> Result<DateTime<Utc>> {
        self.str(key)?
            .parse::<DateTime<Utc>>()
            .map_err(|_| Error::Aws(format!("invalid {key} timestamp")))
    }

    pub fn opt_time(&self, key: &str) -> Option<DateTime<Utc>> {
        self.opt_str(key)
            .and_then(|raw| raw.parse::<DateTime<Utc>>().ok())
    }
}

/// Key of an item in the Users table.
pub fn user_key(user_id: &str, sort_key: &str) -> Item {
    ItemBuilder::new()
        .s("userId", user_id)
        .s("type", sort_key)
        .build()
}
