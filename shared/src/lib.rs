//! Shared library for CertPath Lambda functions.
//!
//! This crate provides common utilities, types, and clients used across all Lambda functions.

pub mod auth;
pub mod cache;
pub mod catalog;
pub mod config;
pub mod error;
pub mod http;
pub mod identity;
pub mod item;
pub mod llm;
pub mod models;
pub mod store;

pub use auth::{
    extract_user_from_context, resolve_user, AuthenticatedUser, CognitoClaims,
    CognitoJwksVerifier, TokenVerifier,
};
pub use cache::{MemoryCache, NoopCache, ResponseCache};
pub use config::{Config, Tables};
pub use error::{Error, Result};
pub use http::ApiResponse;
pub use identity::{AuthTokens, CognitoIdentity, IdentityProvider, SignInOutcome, SignUpOutcome};
pub use llm::{BedrockGenerator, TextGenerator};
pub use models::{
    Certification, Curriculum, CurriculumStatus, Favorite, LearningResource, Milestone,
    Notification, Task, TaskStatus, UserProfile,
};
pub use store::{DynamoStore, ItemStore, MemoryStore, Query};
