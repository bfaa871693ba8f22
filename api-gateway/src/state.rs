//! Application state shared across invocations of a warm Lambda.

use std::sync::Arc;
use std::time::Duration;

use aws_config::BehaviorVersion;
use shared::{
    BedrockGenerator, CognitoIdentity, CognitoJwksVerifier, Config, DynamoStore,
    IdentityProvider, ItemStore, MemoryCache, NoopCache, ResponseCache, Tables, TextGenerator,
    TokenVerifier,
};
use tracing::info;

/// External collaborators and settings used by the handlers.
pub struct AppState {
    pub store: Arc<dyn ItemStore>,
    pub cache: Arc<dyn ResponseCache>,
    pub generator: Arc<dyn TextGenerator>,
    pub identity: Arc<dyn IdentityProvider>,
    pub verifier: Arc<dyn TokenVerifier>,
    pub tables: Tables,
    /// TTL of cached certificate searches
    pub cache_ttl: Duration,
}

impl AppState {
    /// Build the state from environment configuration and the default AWS credential chain.
    pub async fn from_env() -> Result<Self, lambda_http::Error> {
        let config = Config::from_env()?;
        let aws = aws_config::defaults(BehaviorVersion::latest())
            .region(aws_config::Region::new(config.aws_region.clone()))
            .load()
            .await;

        let cache: Arc<dyn ResponseCache> = if config.cache_ttl.is_zero() {
            Arc::new(NoopCache)
        } else {
            Arc::new(MemoryCache::new())
        };

        info!(
            region = %config.aws_region,
            model = %config.bedrock_model_id,
            "initialized application state"
        );

        Ok(Self {
            store: Arc::new(DynamoStore::new(aws_sdk_dynamodb::Client::new(&aws))),
            cache,
            generator: Arc::new(BedrockGenerator::new(
                aws_sdk_bedrockruntime::Client::new(&aws),
                config.bedrock_model_id.clone(),
            )),
            identity: Arc::new(CognitoIdentity::new(
                aws_sdk_cognitoidentityprovider::Client::new(&aws),
                config.user_pool_id.clone(),
                config.client_id.clone(),
                config.auto_confirm,
            )),
            verifier: Arc::new(CognitoJwksVerifier::new(config.issuer())),
            tables: config.tables,
            cache_ttl: config.cache_ttl,
        })
    }
}
