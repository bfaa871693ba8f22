//! Registration, sign-in and profile endpoints.
//!
//! Endpoints:
//! - POST /register - Create a Cognito user and its profile
//! - POST /login - Exchange credentials for tokens
//! - POST /refresh - Exchange a refresh token for new tokens
//! - GET /profile - Get the caller's profile
//! - PATCH /profile - Update the caller's profile

use chrono::Utc;
use lambda_http::{Body, Response};
use serde::Deserialize;
use serde_json::json;
use shared::http::{error_response, ok};
use shared::item::user_key;
use shared::models::sort_key;
use shared::{parse_body, AuthenticatedUser, Result, SignInOutcome, SignUpOutcome, UserProfile};
use tracing::{info, warn};
use validator::Validate;

use super::validate;
use crate::state::AppState;

pub const EMAIL_EXISTS: &str = "이미 존재하는 이메일입니다.";
pub const INVALID_CREDENTIALS: &str = "이메일 또는 비밀번호가 올바르지 않습니다.";
pub const INVALID_REFRESH_TOKEN: &str = "유효하지 않은 리프레시 토큰입니다.";

/// Register request
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
struct RegisterRequest {
    #[validate(email(message = "올바른 이메일 형식이 아닙니다."))]
    email: String,
    #[validate(length(min = 8, message = "비밀번호는 8자 이상이어야 합니다."))]
    password: String,
    #[validate(length(min = 1, max = 50))]
    name: String,
    #[serde(default)]
    interests: Vec<String>,
    major: Option<String>,
    job: Option<String>,
}

/// Login request
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
struct LoginRequest {
    #[validate(length(min = 1))]
    email: String,
    #[validate(length(min = 1))]
    password: String,
}

/// Token refresh request
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
struct RefreshRequest {
    #[validate(length(min = 1))]
    refresh_token: String,
}

/// Update profile request
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
struct UpdateProfileRequest {
    #[validate(length(min = 1, max = 50))]
    name: Option<String>,
    interests: Option<Vec<String>>,
    major: Option<String>,
    job: Option<String>,
}

pub async fn register(state: &AppState, body: &Body) -> Result<Response<Body>> {
    let request: RegisterRequest = parse_body!(body);
    validate!(&request);

    let email = request.email.trim().to_lowercase();
    let user_id = match state
        .identity
        .sign_up(&email, &request.password, &request.name)
        .await?
    {
        SignUpOutcome::Created { user_id } => user_id,
        SignUpOutcome::AlreadyExists => return error_response(400, EMAIL_EXISTS),
    };

    let mut profile = UserProfile::new(&user_id, Some(email.clone()), request.name);
    profile.interests = request.interests;
    profile.major = request.major;
    profile.job = request.job;
    state
        .store
        .put_item(&state.tables.users, profile.into_item())
        .await?;

    info!(%user_id, "registered user");

    ok(
        200,
        json!({
            "userId": user_id,
            "email": email,
            "message": "회원가입이 완료되었습니다.",
        }),
    )
}

pub async fn login(state: &AppState, body: &Body) -> Result<Response<Body>> {
    let request: LoginRequest = parse_body!(body);
    validate!(&request);

    let email = request.email.trim().to_lowercase();
    match state.identity.login(&email, &request.password).await? {
        SignInOutcome::Authenticated(tokens) => ok(200, tokens),
        SignInOutcome::InvalidCredentials => error_response(401, INVALID_CREDENTIALS),
    }
}

pub async fn refresh(state: &AppState, body: &Body) -> Result<Response<Body>> {
    let request: RefreshRequest = parse_body!(body);
    validate!(&request);

    match state.identity.refresh(&request.refresh_token).await? {
        SignInOutcome::Authenticated(tokens) => ok(200, tokens),
        SignInOutcome::InvalidCredentials => error_response(401, INVALID_REFRESH_TOKEN),
    }
}

/// Stored profile of a user, if there is one.
pub async fn fetch_profile(
    state: &AppState,
    user: &AuthenticatedUser,
) -> Result<Option<UserProfile>> {
    let key = user_key(&user.user_id, sort_key::PROFILE);
    match state.store.get_item(&state.tables.users, key).await? {
        Some(item) => Ok(Some(UserProfile::from_item(&item)?)),
        None => Ok(None),
    }
}

fn default_profile(user: &AuthenticatedUser) -> UserProfile {
    UserProfile::new(&user.user_id, user.email.clone(), "")
}

/// Stored profile of a user, or a default one when missing or unreadable.
///
/// Not for read-modify-write paths; use `fetch_profile` there.
pub async fn load_profile(state: &AppState, user: &AuthenticatedUser) -> UserProfile {
    match fetch_profile(state, user).await {
        Ok(Some(profile)) => profile,
        Ok(None) => default_profile(user),
        Err(e) => {
            warn!(user_id = %user.user_id, "Using default profile: {}", e);
            default_profile(user)
        }
    }
}

pub async fn get_profile(state: &AppState, user: &AuthenticatedUser) -> Result<Response<Body>> {
    ok(200, load_profile(state, user).await)
}

pub async fn update_profile(
    state: &AppState,
    user: &AuthenticatedUser,
    body: &Body,
) -> Result<Response<Body>> {
    let request: UpdateProfileRequest = parse_body!(body);
    validate!(&request);

    if request.name.is_none()
        && request.interests.is_none()
        && request.major.is_none()
        && request.job.is_none()
    {
        return error_response(400, "No fields to update");
    }

    let mut profile = fetch_profile(state, user)
        .await?
        .unwrap_or_else(|| default_profile(user));
    if let Some(name) = request.name {
        profile.name = name;
    }
    if let Some(interests) = request.interests {
        profile.interests = interests;
    }
    if let Some(major) = request.major {
        profile.major = Some(major);
    }
    if let Some(job) = request.job {
        profile.job = Some(job);
    }
    profile.updated_at = Utc::now();

    state
        .store
        .put_item(&state.tables.users, profile.clone().into_item())
        .await?;

    info!(user_id = %user.user_id, "updated profile");
    ok(200, profile)
}
