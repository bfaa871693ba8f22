//! Fakes and request helpers for driving the router in-process.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use api_gateway::{handler, AppState};
use async_trait::async_trait;
use lambda_http::{Body, Request, RequestExt, Response};
use serde_json::Value;
use shared::item::Item;
use shared::{
    AuthTokens, AuthenticatedUser, Certification, Error, IdentityProvider, ItemStore,
    MemoryCache, MemoryStore, Query, Result, SignInOutcome, SignUpOutcome, Tables,
    TextGenerator, TokenVerifier,
};
use tokio::sync::Mutex;

/// Memory store that counts every call and can be told to fail reads.
pub struct CountingStore {
    pub inner: MemoryStore,
    calls: AtomicUsize,
    failing_gets: AtomicUsize,
}

impl CountingStore {
    pub fn new(tables: &Tables) -> Self {
        Self {
            inner: MemoryStore::new()
                .with_table(&tables.certifications, "id", None)
                .with_table(&tables.users, "userId", Some("type"))
                .with_table(&tables.resources, "certId", Some("resourceId")),
            calls: AtomicUsize::new(0),
            failing_gets: AtomicUsize::new(0),
        }
    }

    /// Make the next `count` calls to `get_item` return an error.
    pub fn fail_next_gets(&self, count: usize) {
        self.failing_gets.store(count, Ordering::SeqCst);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn hit(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl ItemStore for CountingStore {
    async fn put_item(&self, table: &str, item: Item) -> Result<()> {
        self.hit();
        self.inner.put_item(table, item).await
    }

    async fn get_item(&self, table: &str, key: Item) -> Result<Option<Item>> {
        self.hit();
        let fail = self
            .failing_gets
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if fail {
            return Err(Error::Aws("ProvisionedThroughputExceededException".to_string()));
        }
        self.inner.get_item(table, key).await
    }

    async fn query(&self, table: &str, query: Query<'_>) -> Result<Vec<Item>> {
        self.hit();
        self.inner.query(table, query).await
    }

    async fn scan(&self, table: &str) -> Result<Vec<Item>> {
        self.hit();
        self.inner.scan(table).await
    }

    async fn update_item(&self, table: &str, key: Item, changes: Item) -> Result<Option<Item>> {
        self.hit();
        self.inner.update_item(table, key, changes).await
    }

    async fn delete_item(&self, table: &str, key: Item) -> Result<bool> {
        self.hit();
        self.inner.delete_item(table, key).await
    }
}

/// Identity provider keeping accounts in memory. Access tokens are `token-<userId>`.
#[derive(Default)]
pub struct FakeIdentity {
    accounts: Mutex<HashMap<String, (String, String)>>,
}

fn tokens(user_id: &str) -> AuthTokens {
    AuthTokens {
        access_token: format!("token-{user_id}"),
        id_token: None,
        refresh_token: Some(format!("refresh-{user_id}")),
        expires_in: 3600,
        token_type: "Bearer".to_string(),
    }
}

#[async_trait]
impl IdentityProvider for FakeIdentity {
    async fn sign_up(&self, email: &str, password: &str, _name: &str) -> Result<SignUpOutcome> {
        let mut accounts = self.accounts.lock().await;
        if accounts.contains_key(email) {
            return Ok(SignUpOutcome::AlreadyExists);
        }
        let user_id = uuid::Uuid::new_v4().to_string();
        accounts.insert(email.to_string(), (password.to_string(), user_id.clone()));
        Ok(SignUpOutcome::Created { user_id })
    }

    async fn login(&self, email: &str, password: &str) -> Result<SignInOutcome> {
        let accounts = self.accounts.lock().await;
        Ok(match accounts.get(email) {
            Some((stored, user_id)) if stored == password => {
                SignInOutcome::Authenticated(tokens(user_id))
            }
            _ => SignInOutcome::InvalidCredentials,
        })
    }

    async fn refresh(&self, refresh_token: &str) -> Result<SignInOutcome> {
        Ok(match refresh_token.strip_prefix("refresh-") {
            Some(user_id) => SignInOutcome::Authenticated(tokens(user_id)),
            None => SignInOutcome::InvalidCredentials,
        })
    }
}

/// Accepts `token-<userId>` bearer tokens.
pub struct FakeVerifier;

#[async_trait]
impl TokenVerifier for FakeVerifier {
    async fn verify(&self, token: &str) -> Result<AuthenticatedUser> {
        let user_id = token
            .strip_prefix("token-")
            .ok_or_else(|| Error::Auth("unknown token".to_string()))?;
        Ok(AuthenticatedUser {
            user_id: user_id.to_string(),
            email: Some(format!("{user_id}@example.com")),
        })
    }
}

/// Text generator with a canned outcome.
pub enum FakeGenerator {
    Failing,
    Reply(String),
}

#[async_trait]
impl TextGenerator for FakeGenerator {
    async fn generate(&self, _prompt: &str, _max_tokens: u32) -> Result<String> {
        match self {
            FakeGenerator::Failing => Err(Error::Aws("ThrottlingException".to_string())),
            FakeGenerator::Reply(text) => Ok(text.clone()),
        }
    }
}

pub struct TestApp {
    pub state: Arc<AppState>,
    pub store: Arc<CountingStore>,
}

impl TestApp {
    pub fn new(generator: FakeGenerator) -> Self {
        let tables = Tables::default();
        let store = Arc::new(CountingStore::new(&tables));
        let state = AppState {
            store: store.clone(),
            cache: Arc::new(MemoryCache::new()),
            generator: Arc::new(generator),
            identity: Arc::new(FakeIdentity::default()),
            verifier: Arc::new(FakeVerifier),
            tables,
            cache_ttl: Duration::from_secs(300),
        };
        Self {
            state: Arc::new(state),
            store,
        }
    }

    pub async fn seed_certification(&self, cert: Certification) {
        self.store
            .inner
            .put_item(
                &self.state.tables.certifications,
                cert.into_item().expect("encode certification"),
            )
            .await
            .expect("seed certification");
    }

    pub async fn send(&self, request: Request) -> Response<Body> {
        handler(self.state.clone(), request)
            .await
            .expect("handler returned an error")
    }

    pub async fn call(
        &self,
        method: &str,
        path: &str,
        body: Option<Value>,
        token: Option<&str>,
    ) -> (u16, Value) {
        let response = self.send(request(method, path, body, token)).await;
        let status = response.status().as_u16();
        (status, json_body(&response))
    }

    pub async fn call_with_query(
        &self,
        path: &str,
        params: &[(&str, &str)],
        token: Option<&str>,
    ) -> (u16, Value) {
        let params: HashMap<String, String> = params
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        let request = request("GET", path, None, token).with_query_string_parameters(params);
        let response = self.send(request).await;
        let status = response.status().as_u16();
        (status, json_body(&response))
    }
}

pub fn request(method: &str, path: &str, body: Option<Value>, token: Option<&str>) -> Request {
    let mut builder = lambda_http::http::Request::builder()
        .method(method)
        .uri(path)
        .header("content-type", "application/json");
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {token}"));
    }
    let body = match body {
        Some(value) => Body::from(value.to_string()),
        None => Body::Empty,
    };
    builder.body(body).expect("valid request")
}

pub fn json_body(response: &Response<Body>) -> Value {
    let bytes: &[u8] = response.body().as_ref();
    if bytes.is_empty() {
        return Value::Null;
    }
    serde_json::from_slice(bytes).expect("JSON response body")
}

pub fn cert(id: &str, name: &str, category: &str, keywords: &[&str]) -> Certification {
    Certification {
        id: id.to_string(),
        name: name.to_string(),
        category: category.to_string(),
        level: None,
        description: format!("{name} 자격증"),
        search_keywords: keywords.iter().map(|k| k.to_string()).collect(),
        raw_data: None,
        updated_at: None,
    }
}
