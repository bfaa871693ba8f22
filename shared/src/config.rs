//! Configuration management for Lambda functions.

use std::env;
use std::time::Duration;

use crate::{Error, Result};

/// DynamoDB table names.
#[derive(Debug, Clone)]
pub struct Tables {
    /// Certification catalog, partition key `id`
    pub certifications: String,
    /// User-scoped items, partition key `userId`, sort key `type`
    pub users: String,
    /// Learning resources, partition key `certId`, sort key `resourceId`
    pub resources: String,
}

impl Default for Tables {
    fn default() -> Self {
        Self {
            certifications: "Certifications".to_string(),
            users: "Users".to_string(),
            resources: "LearningResources".to_string(),
        }
    }
}

impl Tables {
    /// Table names from `*_TABLE` variables, falling back to the defaults.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            certifications: env::var("CERTIFICATIONS_TABLE").unwrap_or(defaults.certifications),
            users: env::var("USERS_TABLE").unwrap_or(defaults.users),
            resources: env::var("RESOURCES_TABLE").unwrap_or(defaults.resources),
        }
    }
}

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Table names
    pub tables: Tables,
    /// AWS region
    pub aws_region: String,
    /// Cognito user pool id
    pub user_pool_id: String,
    /// Cognito app client id
    pub client_id: String,
    /// Confirm new sign-ups immediately through AdminConfirmSignUp
    pub auto_confirm: bool,
    /// Bedrock model used for curriculum and recommendation generation
    pub bedrock_model_id: String,
    /// TTL for cached search responses
    pub cache_ttl: Duration,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        let cache_ttl_secs = match env::var("CACHE_TTL_SECONDS") {
            Ok(raw) => raw.trim().parse::<u64>().map_err(|_| {
                Error::Config(format!("CACHE_TTL_SECONDS must be a number, got `{raw}`"))
            })?,
            Err(_) => 300,
        };

        Ok(Self {
            tables: Tables::from_env(),
            aws_region: env::var("AWS_REGION").unwrap_or_else(|_| "ap-northeast-2".to_string()),
            user_pool_id: required("COGNITO_USER_POOL_ID")?,
            client_id: required("COGNITO_CLIENT_ID")?,
            auto_confirm: env::var("COGNITO_AUTO_CONFIRM")
                .map(|value| is_truthy(&value))
                .unwrap_or(false),
            bedrock_model_id: env::var("BEDROCK_MODEL_ID")
                .unwrap_or_else(|_| "anthropic.claude-3-haiku-20240307-v1:0".to_string()),
            cache_ttl: Duration::from_secs(cache_ttl_secs),
        })
    }

    /// Issuer URL of tokens minted by the configured user pool.
    pub fn issuer(&self) -> String {
        format!(
            "https://cognito-idp.{}.amazonaws.com/{}",
            self.aws_region, self.user_pool_id
        )
    }
}

fn required(name: &str) -> Result<String> {
    env::var(name).map_err(|_| Error::Config(format!("{name} not set")))
}

fn is_truthy(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    fn clear_env_vars() {
        for key in [
            "CERTIFICATIONS_TABLE",
            "USERS_TABLE",
            "RESOURCES_TABLE",
            "AWS_REGION",
            "COGNITO_USER_POOL_ID",
            "COGNITO_CLIENT_ID",
            "COGNITO_AUTO_CONFIRM",
            "BEDROCK_MODEL_ID",
            "CACHE_TTL_SECONDS",
        ] {
            env::remove_var(key);
        }
    }

    #[test]
    #[serial]
    fn test_defaults_applied() {
        clear_env_vars();
        env::set_var("COGNITO_USER_POOL_ID", "ap-northeast-2_pool");
        env::set_var("COGNITO_CLIENT_ID", "client-1");

        let config = Config::from_env().unwrap();
        assert_eq!(config.tables.users, "Users");
        assert_eq!(config.tables.certifications, "Certifications");
        assert_eq!(config.cache_ttl, Duration::from_secs(300));
        assert!(!config.auto_confirm);
        assert_eq!(
            config.issuer(),
            "https://cognito-idp.ap-northeast-2.amazonaws.com/ap-northeast-2_pool"
        );
        clear_env_vars();
    }

    #[test]
    #[serial]
    fn test_missing_pool_is_config_error() {
        clear_env_vars();
        env::set_var("COGNITO_CLIENT_ID", "client-1");

        let err = Config::from_env().unwrap_err();
        assert!(matches!(err, Error::Config(_)));
        clear_env_vars();
    }

    #[test]
    #[serial]
    fn test_overrides() {
        clear_env_vars();
        env::set_var("COGNITO_USER_POOL_ID", "pool");
        env::set_var("COGNITO_CLIENT_ID", "client");
        env::set_var("USERS_TABLE", "Users_Staging");
        env::set_var("COGNITO_AUTO_CONFIRM", "Yes");
        env::set_var("CACHE_TTL_SECONDS", "60");

        let config = Config::from_env().unwrap();
        assert_eq!(config.tables.users, "Users_Staging");
        assert!(config.auto_confirm);
        assert_eq!(config.cache_ttl, Duration::from_secs(60));
        clear_env_vars();
    }
}
