//! Curriculum CRUD and milestones.
//!
//! Endpoints:
//! - GET /curriculums - List the caller's curriculums
//! - POST /curriculums - Create a skeleton curriculum
//! - GET /curriculums/{id} - Get curriculum
//! - PATCH /curriculums/{id} - Update curriculum
//! - DELETE /curriculums/{id} - Delete curriculum (tasks are kept)
//! - GET /curriculums/{id}/milestones - List milestones
//! - POST /curriculums/{id}/milestones - Create milestone
//! - PATCH /curriculums/{id}/milestones/{milestoneId} - Update milestone

use chrono::Utc;
use lambda_http::{Body, Response};
use serde::Deserialize;
use serde_json::json;
use shared::http::{error_response, ok};
use shared::item::{user_key, ItemBuilder};
use shared::models::sort_key;
use shared::{parse_body, Curriculum, CurriculumStatus, Milestone, Query, Result};
use tracing::info;
use validator::Validate;

use super::{certificates, not_found, validate};
use crate::plan::default_title;
use crate::state::AppState;

/// Create curriculum request
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
struct CreateCurriculumRequest {
    #[validate(length(min = 1))]
    cert_id: String,
    #[validate(length(max = 200))]
    title: Option<String>,
    #[validate(range(min = 1, max = 52))]
    timeframe: u32,
    #[validate(range(min = 1, max = 80))]
    study_hours_per_week: u32,
    description: Option<String>,
}

/// Update curriculum request
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
struct UpdateCurriculumRequest {
    #[validate(length(min = 1, max = 200))]
    title: Option<String>,
    status: Option<String>,
    #[validate(range(min = 1, max = 52))]
    timeframe: Option<u32>,
    #[validate(range(min = 1, max = 80))]
    study_hours_per_week: Option<u32>,
    description: Option<String>,
}

/// Create milestone request
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
struct CreateMilestoneRequest {
    #[validate(length(min = 1, max = 200))]
    title: String,
    #[validate(range(min = 1, max = 52))]
    week: u32,
    description: Option<String>,
}

/// Update milestone request
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpdateMilestoneRequest {
    title: Option<String>,
    completed: Option<bool>,
}

/// Load one curriculum of a user.
pub async fn load(state: &AppState, user_id: &str, id: &str) -> Result<Option<Curriculum>> {
    let key = user_key(user_id, &Curriculum::sort_key(id));
    match state.store.get_item(&state.tables.users, key).await? {
        Some(item) => Ok(Some(Curriculum::from_item(&item)?)),
        None => Ok(None),
    }
}

pub async fn list(state: &AppState, user_id: &str) -> Result<Response<Body>> {
    let mut curriculums: Vec<Curriculum> = state
        .store
        .query(
            &state.tables.users,
            Query::partition("userId", user_id).begins_with("type", sort_key::CURRICULUM),
        )
        .await?
        .iter()
        .map(Curriculum::from_item)
        .collect::<Result<_>>()?;
    curriculums.sort_by(|a, b| b.created_at.cmp(&a.created_at));

    ok(
        200,
        json!({ "curriculums": curriculums, "total": curriculums.len() }),
    )
}

pub async fn create(state: &AppState, user_id: &str, body: &Body) -> Result<Response<Body>> {
    let request: CreateCurriculumRequest = parse_body!(body);
    validate!(&request);

    let title = match request.title.filter(|t| !t.trim().is_empty()) {
        Some(title) => title,
        None => {
            let name = certificates::get_certification(state, &request.cert_id)
                .await?
                .map(|cert| cert.name)
                .unwrap_or_else(|| request.cert_id.clone());
            default_title(&name)
        }
    };

    let mut curriculum = Curriculum::new(
        user_id,
        request.cert_id,
        title,
        request.timeframe,
        request.study_hours_per_week,
    );
    curriculum.description = request.description;

    state
        .store
        .put_item(&state.tables.users, curriculum.clone().into_item())
        .await?;

    info!(%user_id, curriculum_id = %curriculum.id, "created curriculum");
    ok(201, curriculum)
}

pub async fn get(state: &AppState, user_id: &str, id: &str) -> Result<Response<Body>> {
    match load(state, user_id, id).await? {
        Some(curriculum) => ok(200, curriculum),
        None => not_found("Curriculum"),
    }
}

pub async fn update(
    state: &AppState,
    user_id: &str,
    id: &str,
    body: &Body,
) -> Result<Response<Body>> {
    let request: UpdateCurriculumRequest = parse_body!(body);
    validate!(&request);

    let status = match request.status.as_deref().map(str::parse::<CurriculumStatus>) {
        Some(Ok(status)) => Some(status),
        Some(Err(e)) => return error_response(400, e.to_string()),
        None => None,
    };

    let changes = ItemBuilder::new()
        .opt_s("title", request.title)
        .opt_s("status", status.map(|s| s.to_string()))
        .opt_s("description", request.description);
    let changes = match request.timeframe {
        Some(timeframe) => changes.n("timeframe", timeframe),
        None => changes,
    };
    let changes = match request.study_hours_per_week {
        Some(hours) => changes.n("studyHoursPerWeek", hours),
        None => changes,
    };
    let mut changes = changes.build();

    if changes.is_empty() {
        return error_response(400, "No fields to update");
    }
    changes.extend(ItemBuilder::new().time("updatedAt", Utc::now()).build());

    let key = user_key(user_id, &Curriculum::sort_key(id));
    match state
        .store
        .update_item(&state.tables.users, key, changes)
        .await?
    {
        Some(item) => {
            info!(%user_id, curriculum_id = %id, "updated curriculum");
            ok(200, Curriculum::from_item(&item)?)
        }
        None => not_found("Curriculum"),
    }
}

pub async fn delete(state: &AppState, user_id: &str, id: &str) -> Result<Response<Body>> {
    let key = user_key(user_id, &Curriculum::sort_key(id));
    if !state.store.delete_item(&state.tables.users, key).await? {
        return not_found("Curriculum");
    }

    // Tasks and milestones of the curriculum are left in place.
    info!(%user_id, curriculum_id = %id, "deleted curriculum");
    ok(200, json!({ "curriculumId": id, "deleted": true }))
}

/// Milestones of one curriculum, ordered by week.
pub async fn load_milestones(
    state: &AppState,
    user_id: &str,
    curriculum_id: &str,
) -> Result<Vec<Milestone>> {
    let mut milestones: Vec<Milestone> = state
        .store
        .query(
            &state.tables.users,
            Query::partition("userId", user_id).begins_with("type", sort_key::MILESTONE),
        )
        .await?
        .iter()
        .map(Milestone::from_item)
        .collect::<Result<_>>()?;
    milestones.retain(|m| m.curriculum_id == curriculum_id);
    milestones.sort_by(|a, b| a.week.cmp(&b.week).then(a.created_at.cmp(&b.created_at)));
    Ok(milestones)
}

pub async fn list_milestones(
    state: &AppState,
    user_id: &str,
    curriculum_id: &str,
) -> Result<Response<Body>> {
    if load(state, user_id, curriculum_id).await?.is_none() {
        return not_found("Curriculum");
    }
    let milestones = load_milestones(state, user_id, curriculum_id).await?;
    ok(200, json!({ "milestones": milestones, "total": milestones.len() }))
}

pub async fn create_milestone(
    state: &AppState,
    user_id: &str,
    curriculum_id: &str,
    body: &Body,
) -> Result<Response<Body>> {
    let request: CreateMilestoneRequest = parse_body!(body);
    validate!(&request);

    if load(state, user_id, curriculum_id).await?.is_none() {
        return not_found("Curriculum");
    }

    let mut milestone = Milestone::new(user_id, curriculum_id, request.title, request.week);
    milestone.description = request.description;
    state
        .store
        .put_item(&state.tables.users, milestone.clone().into_item())
        .await?;

    ok(201, milestone)
}

pub async fn update_milestone(
    state: &AppState,
    user_id: &str,
    curriculum_id: &str,
    milestone_id: &str,
    body: &Body,
) -> Result<Response<Body>> {
    let request: UpdateMilestoneRequest = parse_body!(body);
    if request.title.is_none() && request.completed.is_none() {
        return error_response(400, "No fields to update");
    }

    let key = user_key(user_id, &Milestone::sort_key(milestone_id));
    let mut milestone = match state.store.get_item(&state.tables.users, key).await? {
        Some(item) => Milestone::from_item(&item)?,
        None => return not_found("Milestone"),
    };
    if milestone.curriculum_id != curriculum_id {
        return not_found("Milestone");
    }

    if let Some(title) = request.title {
        milestone.title = title;
    }
    if let Some(completed) = request.completed {
        milestone.completed = completed;
    }
    state
        .store
        .put_item(&state.tables.users, milestone.clone().into_item())
        .await?;

    ok(200, milestone)
}
