//! Study reminders.
//!
//! Endpoints:
//! - GET /notifications - List notifications
//! - POST /notifications - Schedule a notification
//! - DELETE /notifications/{id} - Delete a notification

use chrono::{DateTime, Utc};
use lambda_http::{Body, Response};
use serde::Deserialize;
use serde_json::json;
use shared::http::ok;
use shared::item::user_key;
use shared::models::sort_key;
use shared::{parse_body, Notification, Query, Result};
use tracing::info;
use validator::Validate;

use super::{not_found, validate};
use crate::state::AppState;

/// Create notification request
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
struct CreateNotificationRequest {
    #[validate(length(min = 1, max = 200))]
    title: String,
    #[validate(length(min = 1, max = 2000))]
    message: String,
    scheduled_at: Option<DateTime<Utc>>,
    curriculum_id: Option<String>,
}

pub async fn list(state: &AppState, user_id: &str) -> Result<Response<Body>> {
    let mut notifications: Vec<Notification> = state
        .store
        .query(
            &state.tables.users,
            Query::partition("userId", user_id).begins_with("type", sort_key::NOTIFICATION),
        )
        .await?
        .iter()
        .map(Notification::from_item)
        .collect::<Result<_>>()?;
    notifications.sort_by(|a, b| b.created_at.cmp(&a.created_at));

    ok(
        200,
        json!({ "notifications": notifications, "total": notifications.len() }),
    )
}

pub async fn create(state: &AppState, user_id: &str, body: &Body) -> Result<Response<Body>> {
    let request: CreateNotificationRequest = parse_body!(body);
    validate!(&request);

    let mut notification = Notification::new(user_id, request.title, request.message);
    notification.scheduled_at = request.scheduled_at;
    notification.curriculum_id = request.curriculum_id;

    state
        .store
        .put_item(&state.tables.users, notification.clone().into_item())
        .await?;

    info!(%user_id, notification_id = %notification.id, "created notification");
    ok(201, notification)
}

pub async fn delete(state: &AppState, user_id: &str, id: &str) -> Result<Response<Body>> {
    let key = user_key(user_id, &Notification::sort_key(id));
    if !state.store.delete_item(&state.tables.users, key).await? {
        return not_found("Notification");
    }

    ok(200, json!({ "notificationId": id, "deleted": true }))
}
