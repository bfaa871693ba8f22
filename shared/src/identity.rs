//! User sign-up and sign-in through Amazon Cognito.

use async_trait::async_trait;
use aws_sdk_cognitoidentityprovider::error::DisplayErrorContext;
use aws_sdk_cognitoidentityprovider::operation::initiate_auth::{
    InitiateAuthError, InitiateAuthOutput,
};
use aws_sdk_cognitoidentityprovider::operation::sign_up::SignUpError;
use aws_sdk_cognitoidentityprovider::types::{AttributeType, AuthFlowType};
use aws_sdk_cognitoidentityprovider::Client as CognitoClient;
use serde::Serialize;
use tracing::info;

use crate::{Error, Result};

/// Outcome of a sign-up attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignUpOutcome {
    Created { user_id: String },
    AlreadyExists,
}

/// Tokens handed back to the client after a successful sign-in.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthTokens {
    pub access_token: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id_token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    pub expires_in: i32,
    pub token_type: String,
}

/// Outcome of a sign-in or refresh attempt.
#[derive(Debug, Clone)]
pub enum SignInOutcome {
    Authenticated(AuthTokens),
    InvalidCredentials,
}

/// Account management against the identity provider.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn sign_up(&self, email: &str, password: &str, name: &str) -> Result<SignUpOutcome>;
    async fn login(&self, email: &str, password: &str) -> Result<SignInOutcome>;
    async fn refresh(&self, refresh_token: &str) -> Result<SignInOutcome>;
}

/// Cognito user pool client.
pub struct CognitoIdentity {
    client: CognitoClient,
    user_pool_id: String,
    client_id: String,
    auto_confirm: bool,
}

impl CognitoIdentity {
    pub fn new(
        client: CognitoClient,
        user_pool_id: impl Into<String>,
        client_id: impl Into<String>,
        auto_confirm: bool,
    ) -> Self {
        Self {
            client,
            user_pool_id: user_pool_id.into(),
            client_id: client_id.into(),
            auto_confirm,
        }
    }

    fn tokens(output: InitiateAuthOutput) -> Result<SignInOutcome> {
        let result = output
            .authentication_result()
            .ok_or_else(|| Error::Auth("Sign-in requires an additional challenge".to_string()))?;
        let access_token = result
            .access_token()
            .ok_or_else(|| Error::Auth("Cognito returned no access token".to_string()))?;

        Ok(SignInOutcome::Authenticated(AuthTokens {
            access_token: access_token.to_string(),
            id_token: result.id_token().map(String::from),
            refresh_token: result.refresh_token().map(String::from),
            expires_in: result.expires_in(),
            token_type: result.token_type().unwrap_or("Bearer").to_string(),
        }))
    }

    async fn initiate(&self, flow: AuthFlowType, parameters: &[(&str, &str)]) -> Result<SignInOutcome> {
        let mut request = self
            .client
            .initiate_auth()
            .auth_flow(flow)
            .client_id(&self.client_id);
        for (name, value) in parameters {
            request = request.auth_parameters(*name, *value);
        }

        match request.send().await {
            Ok(output) => Self::tokens(output),
            Err(err) => match err.into_service_error() {
                InitiateAuthError::NotAuthorizedException(_)
                | InitiateAuthError::UserNotFoundException(_)
                | InitiateAuthError::UserNotConfirmedException(_) => {
                    Ok(SignInOutcome::InvalidCredentials)
                }
                other => Err(Error::Aws(format!(
                    "InitiateAuth failed: {}",
                    DisplayErrorContext(other)
                ))),
            },
        }
    }
}

#[async_trait]
impl IdentityProvider for CognitoIdentity {
    async fn sign_up(&self, email: &str, password: &str, name: &str) -> Result<SignUpOutcome> {
        let attributes = vec![
            AttributeType::builder()
                .name("email")
                .value(email)
                .build()
                .map_err(|e| Error::Internal(format!("Invalid user attribute: {}", e)))?,
            AttributeType::builder()
                .name("name")
                .value(name)
                .build()
                .map_err(|e| Error::Internal(format!("Invalid user attribute: {}", e)))?,
        ];

        let output = match self
            .client
            .sign_up()
            .client_id(&self.client_id)
            .username(email)
            .password(password)
            .set_user_attributes(Some(attributes))
            .send()
            .await
        {
            Ok(output) => output,
            Err(err) => {
                return match err.into_service_error() {
                    SignUpError::UsernameExistsException(_) => Ok(SignUpOutcome::AlreadyExists),
                    SignUpError::InvalidPasswordException(e) => Err(Error::Validation(
                        e.message().unwrap_or("Invalid password").to_string(),
                    )),
                    other => Err(Error::Aws(format!(
                        "SignUp failed: {}",
                        DisplayErrorContext(other)
                    ))),
                }
            }
        };

        if self.auto_confirm {
            self.client
                .admin_confirm_sign_up()
                .user_pool_id(&self.user_pool_id)
                .username(email)
                .send()
                .await
                .map_err(|e| {
                    Error::Aws(format!("AdminConfirmSignUp failed: {}", DisplayErrorContext(e)))
                })?;
        }

        let user_id = output.user_sub().to_string();
        info!(%user_id, "registered Cognito user");
        Ok(SignUpOutcome::Created { user_id })
    }

    async fn login(&self, email: &str, password: &str) -> Result<SignInOutcome> {
        self.initiate(
            AuthFlowType::UserPasswordAuth,
            &[("USERNAME", email), ("PASSWORD", password)],
        )
        .await
    }

    async fn refresh(&self, refresh_token: &str) -> Result<SignInOutcome> {
        let outcome = self
            .initiate(
                AuthFlowType::RefreshTokenAuth,
                &[("REFRESH_TOKEN", refresh_token)],
            )
            .await?;

        // Cognito does not rotate refresh tokens by default.
        Ok(match outcome {
            SignInOutcome::Authenticated(mut tokens) => {
                tokens
                    .refresh_token
                    .get_or_insert_with(|| refresh_token.to_string());
                SignInOutcome::Authenticated(tokens)
            }
            other => other,
        })
    }
}
