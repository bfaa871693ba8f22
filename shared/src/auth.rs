//! JWT authentication utilities.

use std::collections::HashMap;

use async_trait::async_trait;
use jsonwebtoken::{decode, decode_header, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{info, warn};

use crate::{Error, Result};

/// JWT claims from Cognito.
#[derive(Debug, Serialize, Deserialize)]
pub struct CognitoClaims {
    /// Subject (user id)
    pub sub: String,
    /// Email (id tokens only)
    pub email: Option<String>,
    /// Cognito username
    #[serde(rename = "cognito:username")]
    pub cognito_username: Option<String>,
    /// Access tokens carry `username` instead
    pub username: Option<String>,
    /// Token use (access or id)
    pub token_use: String,
    /// Client id
    pub client_id: Option<String>,
    /// Issued at
    pub iat: i64,
    /// Expiration
    pub exp: i64,
    /// Issuer
    pub iss: String,
}

/// Decoded user information from JWT.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    /// User's Cognito subject (UUID)
    pub user_id: String,
    /// User's email
    pub email: Option<String>,
}

impl TryFrom<CognitoClaims> for AuthenticatedUser {
    type Error = Error;

    fn try_from(claims: CognitoClaims) -> Result<Self> {
        if claims.token_use != "access" && claims.token_use != "id" {
            return Err(Error::Auth(format!(
                "Unexpected token_use `{}`",
                claims.token_use
            )));
        }

        Ok(Self {
            user_id: claims.sub,
            email: claims
                .email
                .or(claims.cognito_username)
                .or(claims.username),
        })
    }
}

/// Verifies bearer tokens and resolves the caller.
#[async_trait]
pub trait TokenVerifier: Send + Sync {
    async fn verify(&self, token: &str) -> Result<AuthenticatedUser>;
}

/// One RSA key of a JWKS document.
#[derive(Debug, Clone, Deserialize)]
struct Jwk {
    kid: String,
    n: String,
    e: String,
}

#[derive(Debug, Deserialize)]
struct JwkSet {
    keys: Vec<Jwk>,
}

/// Validates Cognito-issued tokens against the user pool's JWKS.
///
/// Keys are cached by `kid` for the lifetime of the process and refetched once
/// when a token names an unknown key (key rotation).
pub struct CognitoJwksVerifier {
    http: reqwest::Client,
    issuer: String,
    keys: RwLock<HashMap<String, Jwk>>,
}

impl CognitoJwksVerifier {
    pub fn new(issuer: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            issuer: issuer.into(),
            keys: RwLock::new(HashMap::new()),
        }
    }

    fn jwks_url(&self) -> String {
        format!("{}/.well-known/jwks.json", self.issuer)
    }

    async fn refresh_keys(&self) -> Result<()> {
        let url = self.jwks_url();
        info!(%url, "fetching JWKS");

        let set: JwkSet = self
            .http
            .get(&url)
            .send()
            .await
            .and_then(|response| response.error_for_status())
            .map_err(|e| Error::Auth(format!("Failed to fetch JWKS: {}", e)))?
            .json()
            .await
            .map_err(|e| Error::Auth(format!("Failed to parse JWKS: {}", e)))?;

        let mut keys = self.keys.write().await;
        keys.clear();
        keys.extend(set.keys.into_iter().map(|key| (key.kid.clone(), key)));
        Ok(())
    }

    async fn key_for(&self, kid: &str) -> Result<Jwk> {
        if let Some(key) = self.keys.read().await.get(kid) {
            return Ok(key.clone());
        }

        self.refresh_keys().await?;
        self.keys
            .read()
            .await
            .get(kid)
            .cloned()
            .ok_or_else(|| Error::Auth(format!("Unknown signing key `{kid}`")))
    }
}

#[async_trait]
impl TokenVerifier for CognitoJwksVerifier {
    async fn verify(&self, token: &str) -> Result<AuthenticatedUser> {
        let header = decode_header(token)
            .map_err(|e| Error::Auth(format!("Failed to decode token header: {}", e)))?;
        let kid = header
            .kid
            .ok_or_else(|| Error::Auth("Token header has no kid".to_string()))?;

        let jwk = self.key_for(&kid).await?;
        let key = DecodingKey::from_rsa_components(&jwk.n, &jwk.e)
            .map_err(|e| Error::Auth(format!("Invalid signing key: {}", e)))?;

        let mut validation = Validation::new(Algorithm::RS256);
        validation.set_issuer(&[self.issuer.as_str()]);
        // Access tokens carry client_id instead of aud.
        validation.validate_aud = false;

        let token_data = decode::<CognitoClaims>(token, &key, &validation)
            .map_err(|e| Error::Auth(format!("Failed to validate token: {}", e)))?;

        AuthenticatedUser::try_from(token_data.claims)
    }
}

/// Extract the token from an `Authorization: Bearer <token>` header value.
pub fn bearer_token(header: &str) -> Option<&str> {
    let token = header
        .strip_prefix("Bearer ")
        .or_else(|| header.strip_prefix("bearer "))?
        .trim();
    (!token.is_empty()).then_some(token)
}

/// Extract user from API Gateway request context.
///
/// When using Cognito authorizer, user info is in requestContext.authorizer.claims
pub fn extract_user_from_context(claims: &serde_json::Value) -> Result<AuthenticatedUser> {
    let sub = claims
        .get("sub")
        .and_then(|v| v.as_str())
        .ok_or_else(|| Error::Auth("Missing sub claim".to_string()))?;

    let email = claims.get("email").and_then(|v| v.as_str()).map(String::from);

    Ok(AuthenticatedUser {
        user_id: sub.to_string(),
        email,
    })
}

/// Resolve the caller, preferring authorizer claims over the bearer header.
///
/// Any failure resolves to an anonymous caller (`None`).
pub async fn resolve_user(
    verifier: &dyn TokenVerifier,
    authorizer_claims: Option<&serde_json::Value>,
    authorization: Option<&str>,
) -> Option<AuthenticatedUser> {
    if let Some(claims) = authorizer_claims {
        match extract_user_from_context(claims) {
            Ok(user) => return Some(user),
            Err(e) => warn!("Ignoring authorizer claims: {}", e),
        }
    }

    let token = authorization.and_then(bearer_token)?;
    match verifier.verify(token).await {
        Ok(user) => Some(user),
        Err(e) => {
            warn!("Bearer token rejected: {}", e);
            None
        }
    }
}
