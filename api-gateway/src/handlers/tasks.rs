//! Tasks of a curriculum and progress tracking.
//!
//! Endpoints:
//! - GET /curriculums/{id}/tasks - List tasks (optional ?week=)
//! - POST /curriculums/{id}/tasks - Create task
//! - GET /curriculums/{id}/tasks/{taskId} - Get task
//! - PATCH /curriculums/{id}/tasks/{taskId} - Update task
//! - DELETE /curriculums/{id}/tasks/{taskId} - Delete task
//! - GET /curriculums/{id}/progress - Completion summary

use std::collections::BTreeMap;

use chrono::Utc;
use lambda_http::{Body, Request, Response};
use serde::{Deserialize, Serialize};
use serde_json::json;
use shared::http::{error_response, ok};
use shared::item::user_key;
use shared::models::sort_key;
use shared::{parse_body, Query, Result, Task, TaskStatus};
use tracing::info;
use validator::Validate;

use super::{curriculums, not_found, query_param, validate};
use crate::state::AppState;

/// Create task request
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
struct CreateTaskRequest {
    #[validate(length(min = 1, max = 200))]
    title: String,
    description: Option<String>,
    #[validate(range(min = 1, max = 52))]
    week: u32,
    #[validate(range(min = 0.0, max = 80.0))]
    estimated_hours: Option<f64>,
}

/// Update task request
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
struct UpdateTaskRequest {
    #[validate(length(min = 1, max = 200))]
    title: Option<String>,
    description: Option<String>,
    #[validate(range(min = 1, max = 52))]
    week: Option<u32>,
    status: Option<String>,
    #[validate(range(min = 0.0, max = 80.0))]
    estimated_hours: Option<f64>,
    #[validate(range(min = 0.0))]
    actual_hours: Option<f64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct WeekProgress {
    week: u32,
    total_tasks: usize,
    completed_tasks: usize,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Progress {
    pub curriculum_id: String,
    pub total_tasks: usize,
    pub completed_tasks: usize,
    pub progress_percent: f64,
    pub estimated_hours: f64,
    pub actual_hours: f64,
    pub current_week: u32,
    weeks: Vec<WeekProgress>,
}

const DEFAULT_TASK_HOURS: f64 = 1.0;

/// Tasks of one curriculum sorted by week, then creation time.
pub async fn load_tasks(state: &AppState, user_id: &str, curriculum_id: &str) -> Result<Vec<Task>> {
    let mut tasks: Vec<Task> = state
        .store
        .query(
            &state.tables.users,
            Query::partition("userId", user_id).begins_with("type", sort_key::TASK),
        )
        .await?
        .iter()
        .map(Task::from_item)
        .collect::<Result<_>>()?;
    tasks.retain(|task| task.curriculum_id == curriculum_id);
    tasks.sort_by(|a, b| a.week.cmp(&b.week).then(a.created_at.cmp(&b.created_at)));
    Ok(tasks)
}

async fn load_task(
    state: &AppState,
    user_id: &str,
    curriculum_id: &str,
    task_id: &str,
) -> Result<Option<Task>> {
    let key = user_key(user_id, &Task::sort_key(task_id));
    let task = match state.store.get_item(&state.tables.users, key).await? {
        Some(item) => Task::from_item(&item)?,
        None => return Ok(None),
    };
    Ok((task.curriculum_id == curriculum_id).then_some(task))
}

pub async fn list(
    state: &AppState,
    user_id: &str,
    curriculum_id: &str,
    event: &Request,
) -> Result<Response<Body>> {
    if curriculums::load(state, user_id, curriculum_id).await?.is_none() {
        return not_found("Curriculum");
    }

    let week = match query_param(event, "week").map(str::parse::<u32>) {
        Some(Ok(week)) => Some(week),
        Some(Err(_)) => return error_response(400, "week must be a positive number"),
        None => None,
    };

    let mut tasks = load_tasks(state, user_id, curriculum_id).await?;
    if let Some(week) = week {
        tasks.retain(|task| task.week == week);
    }

    ok(200, json!({ "tasks": tasks, "total": tasks.len() }))
}

pub async fn create(
    state: &AppState,
    user_id: &str,
    curriculum_id: &str,
    body: &Body,
) -> Result<Response<Body>> {
    let request: CreateTaskRequest = parse_body!(body);
    validate!(&request);

    if curriculums::load(state, user_id, curriculum_id).await?.is_none() {
        return not_found("Curriculum");
    }

    let mut task = Task::new(
        user_id,
        curriculum_id,
        request.title,
        request.week,
        request.estimated_hours.unwrap_or(DEFAULT_TASK_HOURS),
    );
    task.description = request.description;

    state
        .store
        .put_item(&state.tables.users, task.clone().into_item())
        .await?;

    info!(%user_id, %curriculum_id, task_id = %task.id, "created task");
    ok(201, task)
}

pub async fn get(
    state: &AppState,
    user_id: &str,
    curriculum_id: &str,
    task_id: &str,
) -> Result<Response<Body>> {
    match load_task(state, user_id, curriculum_id, task_id).await? {
        Some(task) => ok(200, task),
        None => not_found("Task"),
    }
}

pub async fn update(
    state: &AppState,
    user_id: &str,
    curriculum_id: &str,
    task_id: &str,
    body: &Body,
) -> Result<Response<Body>> {
    let request: UpdateTaskRequest = parse_body!(body);
    validate!(&request);

    let status = match request.status.as_deref().map(str::parse::<TaskStatus>) {
        Some(Ok(status)) => Some(status),
        Some(Err(e)) => return error_response(400, e.to_string()),
        None => None,
    };

    let mut task = match load_task(state, user_id, curriculum_id, task_id).await? {
        Some(task) => task,
        None => return not_found("Task"),
    };

    if let Some(title) = request.title {
        task.title = title;
    }
    if let Some(description) = request.description {
        task.description = Some(description);
    }
    if let Some(week) = request.week {
        task.week = week;
    }
    if let Some(hours) = request.estimated_hours {
        task.estimated_hours = hours;
    }
    if let Some(hours) = request.actual_hours {
        task.actual_hours = hours;
    }
    match status {
        Some(TaskStatus::Completed) if task.status != TaskStatus::Completed => {
            task.status = TaskStatus::Completed;
            task.completed_at = Some(Utc::now());
        }
        Some(TaskStatus::Pending) => {
            task.status = TaskStatus::Pending;
            task.completed_at = None;
        }
        _ => {}
    }

    state
        .store
        .put_item(&state.tables.users, task.clone().into_item())
        .await?;

    info!(%user_id, %curriculum_id, %task_id, status = %task.status, "updated task");
    ok(200, task)
}

pub async fn delete(
    state: &AppState,
    user_id: &str,
    curriculum_id: &str,
    task_id: &str,
) -> Result<Response<Body>> {
    if load_task(state, user_id, curriculum_id, task_id).await?.is_none() {
        return not_found("Task");
    }

    let key = user_key(user_id, &Task::sort_key(task_id));
    state.store.delete_item(&state.tables.users, key).await?;
    ok(200, json!({ "taskId": task_id, "deleted": true }))
}

/// Completion summary over a set of tasks.
pub fn summarize(curriculum_id: &str, tasks: &[Task]) -> Progress {
    let total_tasks = tasks.len();
    let completed_tasks = tasks
        .iter()
        .filter(|t| t.status == TaskStatus::Completed)
        .count();

    let mut by_week: BTreeMap<u32, (usize, usize)> = BTreeMap::new();
    for task in tasks {
        let entry = by_week.entry(task.week).or_default();
        entry.0 += 1;
        if task.status == TaskStatus::Completed {
            entry.1 += 1;
        }
    }

    let current_week = by_week
        .iter()
        .find(|(_, (total, done))| done < total)
        .or_else(|| by_week.iter().next_back())
        .map(|(week, _)| *week)
        .unwrap_or(0);

    let progress_percent = if total_tasks == 0 {
        0.0
    } else {
        (completed_tasks as f64 * 1000.0 / total_tasks as f64).round() / 10.0
    };

    Progress {
        curriculum_id: curriculum_id.to_string(),
        total_tasks,
        completed_tasks,
        progress_percent,
        estimated_hours: tasks.iter().map(|t| t.estimated_hours).sum(),
        actual_hours: tasks.iter().map(|t| t.actual_hours).sum(),
        current_week,
        weeks: by_week
            .into_iter()
            .map(|(week, (total_tasks, completed_tasks))| WeekProgress {
                week,
                total_tasks,
                completed_tasks,
            })
            .collect(),
    }
}

pub async fn progress(
    state: &AppState,
    user_id: &str,
    curriculum_id: &str,
) -> Result<Response<Body>> {
    if curriculums::load(state, user_id, curriculum_id).await?.is_none() {
        return not_found("Curriculum");
    }

    let tasks = load_tasks(state, user_id, curriculum_id).await?;
    ok(200, summarize(curriculum_id, &tasks))
}
