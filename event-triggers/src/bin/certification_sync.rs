//! Certification Sync Lambda - Refreshes the certification catalog.
//!
//! Runs on an EventBridge schedule. Downloads the raw catalog from
//! `CATALOG_URL`, normalizes every entry and writes it to the
//! certifications table. Re-running overwrites existing records.

use std::sync::Arc;

use lambda_runtime::{run, service_fn, Error, LambdaEvent};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use shared::catalog;
use shared::{DynamoStore, ItemStore, Tables};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

/// EventBridge scheduled event
#[derive(Debug, Default, Deserialize)]
struct ScheduledEvent {
    /// Optional: override the configured catalog URL
    #[serde(default)]
    catalog_url: Option<String>,
}

/// Sync response
#[derive(Debug, Default, PartialEq, Serialize)]
struct SyncResponse {
    ingested: u32,
    skipped: u32,
}

struct AppState {
    store: Arc<dyn ItemStore>,
    http_client: reqwest::Client,
    tables: Tables,
    catalog_url: Option<String>,
}

impl AppState {
    async fn new() -> Result<Self, Error> {
        let config = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;
        let client = aws_sdk_dynamodb::Client::new(&config);

        Ok(Self {
            store: Arc::new(DynamoStore::new(client)),
            http_client: reqwest::Client::new(),
            tables: Tables::from_env(),
            catalog_url: std::env::var("CATALOG_URL").ok(),
        })
    }

    async fn fetch_catalog(&self, url: &str) -> Result<Vec<Value>, Error> {
        let response = self
            .http_client
            .get(url)
            .send()
            .await
            .map_err(|e| format!("Failed to fetch catalog: {}", e))?;

        if !response.status().is_success() {
            return Err(format!("Catalog request failed with status {}", response.status()).into());
        }

        let entries: Vec<Value> = response
            .json()
            .await
            .map_err(|e| format!("Catalog is not a JSON array: {}", e))?;
        Ok(entries)
    }
}

/// Normalize and store each entry independently.
async fn ingest(store: &dyn ItemStore, table: &str, entries: &[Value]) -> SyncResponse {
    let mut response = SyncResponse::default();

    for entry in entries {
        let Some(cert) = catalog::normalize(entry) else {
            warn!("Skipping catalog entry without a usable name");
            response.skipped += 1;
            continue;
        };
        let id = cert.id.clone();

        let stored = match cert.into_item() {
            Ok(item) => store.put_item(table, item).await,
            Err(e) => Err(e),
        };
        match stored {
            Ok(()) => response.ingested += 1,
            Err(e) => {
                error!("Failed to store certification {}: {}", id, e);
                response.skipped += 1;
            }
        }
    }

    response
}

async fn handler(
    state: Arc<AppState>,
    event: LambdaEvent<ScheduledEvent>,
) -> Result<SyncResponse, Error> {
    let url = event
        .payload
        .catalog_url
        .or_else(|| state.catalog_url.clone())
        .ok_or("CATALOG_URL not set")?;

    info!("Starting certification sync from {}", url);
    let entries = state.fetch_catalog(&url).await?;
    info!("Fetched {} catalog entries", entries.len());

    let response = ingest(state.store.as_ref(), &state.tables.certifications, &entries).await;

    info!(
        "Certification sync complete: {} ingested, {} skipped",
        response.ingested, response.skipped
    );
    Ok(response)
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .json()
        .init();

    let state = Arc::new(AppState::new().await?);

    run(service_fn(move |event| {
        let state = Arc::clone(&state);
        async move { handler(state, event).await }
    }))
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use shared::{Certification, MemoryStore};

    fn store() -> MemoryStore {
        MemoryStore::new().with_table("Certifications", "id", None)
    }

    #[tokio::test]
    async fn test_ingest_skips_nameless_entries() {
        let store = store();
        let entries = vec![
            json!({ "name": "정보처리기사", "category": "IT", "keywords": ["정처기"] }),
            json!({ "id": "sqld", "title": "SQL 개발자", "difficulty": "중급" }),
            json!({ "category": "IT" }),
            json!({ "name": "   " }),
        ];

        let response = ingest(&store, "Certifications", &entries).await;
        assert_eq!(response, SyncResponse { ingested: 2, skipped: 2 });

        let items = store.scan("Certifications").await.unwrap();
        let certs: Vec<Certification> = items
            .iter()
            .map(|item| Certification::from_item(item).unwrap())
            .collect();
        assert_eq!(certs[0].id, "정보처리기사");
        assert_eq!(certs[1].id, "sqld");
        assert_eq!(certs[1].level.as_deref(), Some("중급"));
        assert_eq!(certs[1].category, catalog::DEFAULT_CATEGORY);
    }

    #[tokio::test]
    async fn test_reingest_overwrites() {
        let store = store();
        ingest(&store, "Certifications", &[json!({ "id": "adsp", "name": "ADsP" })]).await;
        ingest(
            &store,
            "Certifications",
            &[json!({ "id": "adsp", "name": "데이터분석 준전문가" })],
        )
        .await;

        let items = store.scan("Certifications").await.unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(Certification::from_item(&items[0]).unwrap().name, "데이터분석 준전문가");
    }
}
