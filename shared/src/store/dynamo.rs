use std::collections::HashMap;

use async_trait::async_trait;
use aws_sdk_dynamodb::error::DisplayErrorContext;
use aws_sdk_dynamodb::operation::update_item::UpdateItemError;
use aws_sdk_dynamodb::types::{AttributeValue, ReturnValue};
use aws_sdk_dynamodb::Client;

use super::{ItemStore, Query};
use crate::item::Item;
use crate::{Error, Result};

/// DynamoDB-backed item store.
#[derive(Clone)]
pub struct DynamoStore {
    client: Client,
}

impl DynamoStore {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

fn aws_error<E>(operation: &str, table: &str, err: E) -> Error
where
    E: std::error::Error + Send + Sync + 'static,
{
    Error::Aws(format!(
        "{operation} on {table} failed: {}",
        DisplayErrorContext(err)
    ))
}

#[async_trait]
impl ItemStore for DynamoStore {
    async fn put_item(&self, table: &str, item: Item) -> Result<()> {
        self.client
            .put_item()
            .table_name(table)
            .set_item(Some(item))
            .send()
            .await
            .map_err(|e| aws_error("PutItem", table, e))?;
        Ok(())
    }

    async fn get_item(&self, table: &str, key: Item) -> Result<Option<Item>> {
        let output = self
            .client
            .get_item()
            .table_name(table)
            .set_key(Some(key))
            .send()
            .await
            .map_err(|e| aws_error("GetItem", table, e))?;
        Ok(output.item)
    }

    async fn query(&self, table: &str, query: Query<'_>) -> Result<Vec<Item>> {
        let mut items = Vec::new();
        let mut start_key: Option<Item> = None;

        loop {
            let mut request = self
                .client
                .query()
                .table_name(table)
                .expression_attribute_names("#pk", query.partition_key)
                .expression_attribute_values(
                    ":pk",
                    AttributeValue::S(query.partition_value.to_string()),
                )
                .set_exclusive_start_key(start_key.take());

            request = match query.sort_prefix {
                Some((sort_key, prefix)) => request
                    .key_condition_expression("#pk = :pk AND begins_with(#sk, :prefix)")
                    .expression_attribute_names("#sk", sort_key)
                    .expression_attribute_values(":prefix", AttributeValue::S(prefix.to_string())),
                None => request.key_condition_expression("#pk = :pk"),
            };

            let output = request
                .send()
                .await
                .map_err(|e| aws_error("Query", table, e))?;
            items.extend(output.items.unwrap_or_default());

            match output.last_evaluated_key {
                Some(key) if !key.is_empty() => start_key = Some(key),
                _ => break,
            }
        }

        Ok(items)
    }

    async fn scan(&self, table: &str) -> Result<Vec<Item>> {
        let mut items = Vec::new();
        let mut start_key: Option<Item> = None;

        loop {
            let output = self
                .client
                .scan()
                .table_name(table)
                .set_exclusive_start_key(start_key.take())
                .send()
                .await
                .map_err(|e| aws_error("Scan", table, e))?;
            items.extend(output.items.unwrap_or_default());

            match output.last_evaluated_key {
                Some(key) if !key.is_empty() => start_key = Some(key),
                _ => break,
            }
        }

        Ok(items)
    }

    async fn update_item(&self, table: &str, key: Item, changes: Item) -> Result<Option<Item>> {
        if changes.is_empty() {
            return self.get_item(table, key).await;
        }

        let mut names = HashMap::new();
        let mut values = HashMap::new();
        let mut assignments = Vec::with_capacity(changes.len());
        for (index, (attribute, value)) in changes.into_iter().enumerate() {
            names.insert(format!("#a{index}"), attribute);
            values.insert(format!(":v{index}"), value);
            assignments.push(format!("#a{index} = :v{index}"));
        }

        // Any key attribute works for the existence check.
        let mut key_names: Vec<&String> = key.keys().collect();
        key_names.sort();
        let condition_key = key_names
            .first()
            .map(|name| name.to_string())
            .ok_or_else(|| Error::Internal("update_item called with an empty key".into()))?;
        names.insert("#k0".to_string(), condition_key);

        let result = self
            .client
            .update_item()
            .table_name(table)
            .set_key(Some(key))
            .update_expression(format!("SET {}", assignments.join(", ")))
            .condition_expression("attribute_exists(#k0)")
            .set_expression_attribute_names(Some(names))
            .set_expression_attribute_values(Some(values))
            .return_values(ReturnValue::AllNew)
            .send()
            .await;

        match result {
            Ok(output) => Ok(output.attributes),
            Err(err) => match err.into_service_error() {
                UpdateItemError::ConditionalCheckFailedException(_) => Ok(None),
                other => Err(aws_error("UpdateItem", table, other)),
            },
        }
    }

    async fn delete_item(&self, table: &str, key: Item) -> Result<bool> {
        let output = self
            .client
            .delete_item()
            .table_name(table)
            .set_key(Some(key))
            .return_values(ReturnValue::AllOld)
            .send()
            .await
            .map_err(|e| aws_error("DeleteItem", table, e))?;
        Ok(output.attributes.is_some_and(|attrs| !attrs.is_empty()))
    }
}
