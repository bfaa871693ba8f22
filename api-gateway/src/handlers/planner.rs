//! AI study-plan generation and application.
//!
//! Endpoints:
//! - POST /planner/generate - Generate a plan and store it as a skeleton curriculum
//! - POST /planner/{id}/apply - Create the plan's tasks and milestones

use chrono::Utc;
use lambda_http::{Body, Response};
use serde::Deserialize;
use serde_json::json;
use shared::http::{error_response, ok};
use shared::item::{user_key, ItemBuilder};
use shared::models::ANONYMOUS_USER;
use shared::{
    parse_body, AuthenticatedUser, Certification, Curriculum, CurriculumStatus, Milestone,
    Result, Task,
};
use tracing::{info, warn};
use validator::Validate;

use super::{certificates, curriculums, not_found, validate};
use crate::plan::{self, GeneratedCurriculum, PlanRequest};
use crate::state::AppState;

const PLAN_MAX_TOKENS: u32 = 4096;

/// Generate study plan request
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest {
    #[validate(length(min = 1))]
    cert_id: String,
    #[validate(range(min = 1, max = 52))]
    timeframe: u32,
    #[validate(range(min = 1, max = 80))]
    study_hours_per_week: u32,
    level: Option<String>,
    goals: Option<String>,
}

fn partition(user: Option<&AuthenticatedUser>) -> &str {
    user.map_or(ANONYMOUS_USER, |u| u.user_id.as_str())
}

/// Certification record for the prompt, or a minimal one when unknown.
async fn plan_subject(state: &AppState, cert_id: &str) -> Certification {
    match certificates::get_certification(state, cert_id).await {
        Ok(Some(cert)) => return cert,
        Ok(None) => {}
        Err(e) => warn!(%cert_id, "Certification lookup failed: {}", e),
    }
    Certification {
        id: cert_id.to_string(),
        name: cert_id.to_string(),
        category: shared::catalog::DEFAULT_CATEGORY.to_string(),
        level: None,
        description: String::new(),
        search_keywords: Vec::new(),
        raw_data: None,
        updated_at: None,
    }
}

/// Ask the model for a plan, falling back to the template on any failure.
pub async fn generate_plan(
    state: &AppState,
    cert: &Certification,
    request: &PlanRequest,
) -> GeneratedCurriculum {
    let prompt = plan::build_prompt(cert, request);
    match state.generator.generate(&prompt, PLAN_MAX_TOKENS).await {
        Ok(text) => match plan::parse_generated(&text, cert, request) {
            Some(generated) => return generated,
            None => warn!(cert_id = %cert.id, "Model output was not a usable plan"),
        },
        Err(e) => warn!(cert_id = %cert.id, "Plan generation failed: {}", e),
    }
    plan::fallback(cert, request)
}

pub async fn generate(
    state: &AppState,
    user: Option<&AuthenticatedUser>,
    body: &Body,
) -> Result<Response<Body>> {
    let request: GenerateRequest = parse_body!(body);
    validate!(&request);

    let cert = plan_subject(state, &request.cert_id).await;
    let plan_request = PlanRequest {
        timeframe: request.timeframe,
        study_hours_per_week: request.study_hours_per_week,
        level: request.level,
        goals: request.goals,
    };
    let generated = generate_plan(state, &cert, &plan_request).await;

    let mut curriculum = Curriculum::new(
        partition(user),
        &cert.id,
        &generated.title,
        request.timeframe,
        request.study_hours_per_week,
    );
    curriculum.plan = Some(serde_json::to_string(&generated)?);
    let curriculum_id = curriculum.id.clone();

    state
        .store
        .put_item(&state.tables.users, curriculum.into_item())
        .await?;

    info!(
        %curriculum_id,
        cert_id = %cert.id,
        generated_by = %generated.generated_by,
        weeks = generated.weeks.len(),
        "generated curriculum"
    );
    ok(
        200,
        json!({ "curriculumId": curriculum_id, "curriculum": generated }),
    )
}

pub async fn apply(
    state: &AppState,
    user: Option<&AuthenticatedUser>,
    curriculum_id: &str,
) -> Result<Response<Body>> {
    let user_id = partition(user);
    let curriculum = match curriculums::load(state, user_id, curriculum_id).await? {
        Some(curriculum) => curriculum,
        None => return not_found("Curriculum"),
    };
    if curriculum.status == CurriculumStatus::Active {
        return error_response(400, "Curriculum is already active");
    }
    let generated: GeneratedCurriculum = match curriculum.plan.as_deref() {
        Some(raw) => serde_json::from_str(raw)?,
        None => return error_response(400, "Curriculum has no generated plan to apply"),
    };

    // Independent writes; a failure part-way leaves the earlier items in place.
    let mut tasks_created = 0usize;
    for week in &generated.weeks {
        for planned in &week.tasks {
            let mut task = Task::new(
                user_id,
                curriculum_id,
                &planned.title,
                week.week,
                planned.estimated_hours,
            );
            task.description = planned.description.clone();
            state
                .store
                .put_item(&state.tables.users, task.into_item())
                .await?;
            tasks_created += 1;
        }
    }

    let mut milestones_created = 0usize;
    for planned in &generated.milestones {
        let mut milestone = Milestone::new(user_id, curriculum_id, &planned.title, planned.week);
        milestone.description = planned.description.clone();
        state
            .store
            .put_item(&state.tables.users, milestone.into_item())
            .await?;
        milestones_created += 1;
    }

    let changes = ItemBuilder::new()
        .s("status", CurriculumStatus::Active.to_string())
        .time("updatedAt", Utc::now())
        .build();
    let key = user_key(user_id, &Curriculum::sort_key(curriculum_id));
    if state
        .store
        .update_item(&state.tables.users, key, changes)
        .await?
        .is_none()
    {
        return not_found("Curriculum");
    }

    info!(%user_id, %curriculum_id, tasks_created, milestones_created, "applied curriculum");
    ok(
        200,
        json!({
            "curriculumId": curriculum_id,
            "status": CurriculumStatus::Active,
            "tasksCreated": tasks_created,
            "milestonesCreated": milestones_created,
        }),
    )
}
