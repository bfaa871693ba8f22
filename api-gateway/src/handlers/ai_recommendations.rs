//! Model-backed certification recommendations.
//!
//! Endpoints:
//! - POST /ai/recommend - Recommend for the posted profile (public)
//! - GET /ai/recommendations - Recommend for the caller's stored profile (cached)

use std::collections::HashMap;
use std::time::Duration;

use lambda_http::{Body, Response};
use serde::{Deserialize, Serialize};
use shared::http::ok;
use shared::llm::extract_json;
use shared::{parse_body, AuthenticatedUser, Certification, Result};
use tracing::{info, warn};
use validator::Validate;

use super::{auth, certificates, validate};
use crate::plan::{GENERATED_BY_AI, GENERATED_BY_FALLBACK};
use crate::recommend;
use crate::state::AppState;

const RECOMMEND_MAX_TOKENS: u32 = 2048;
const USER_CACHE_TTL: Duration = Duration::from_secs(3600);
const DEFAULT_REASON: &str = "많은 수험생이 선택하는 입문용 자격증입니다.";

/// Recommendation request; every field is optional
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RecommendRequest {
    #[serde(default)]
    #[validate(length(max = 20))]
    pub interests: Vec<String>,
    pub major: Option<String>,
    pub job: Option<String>,
    pub experience: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ModelPick {
    cert_id: String,
    #[serde(default)]
    reason: String,
}

#[derive(Debug, Deserialize)]
struct ModelPicks {
    #[serde(default)]
    recommendations: Vec<ModelPick>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Recommendation {
    pub cert_id: String,
    pub name: String,
    pub category: String,
    pub reason: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecommendResponse {
    pub recommendations: Vec<Recommendation>,
    pub generated_by: String,
}

fn build_prompt(request: &RecommendRequest, catalog: &[Certification]) -> String {
    let certs = catalog
        .iter()
        .map(|c| format!("- {}: {} ({})", c.id, c.name, c.category))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        r#"당신은 IT 자격증 진로 상담가입니다. 사용자 프로필에 맞는 자격증을 아래 목록에서만 최대 5개 추천하세요.

사용자 프로필:
- 관심 분야: {interests}
- 전공: {major}
- 직업: {job}
- 경력: {experience}

자격증 목록 (id: 이름 (분야)):
{certs}

다음 JSON 형식으로만 응답하세요:
{{"recommendations": [{{"certId": "목록의 id", "reason": "추천 이유"}}]}}"#,
        interests = if request.interests.is_empty() {
            "없음".to_string()
        } else {
            request.interests.join(", ")
        },
        major = request.major.as_deref().unwrap_or("없음"),
        job = request.job.as_deref().unwrap_or("없음"),
        experience = request.experience.as_deref().unwrap_or("없음"),
    )
}

/// Keep model picks that name catalog entries, once each.
fn accept_picks(text: &str, catalog: &[Certification]) -> Vec<Recommendation> {
    let Some(picks) = extract_json(text)
        .and_then(|value| serde_json::from_value::<ModelPicks>(value).ok())
    else {
        return Vec::new();
    };

    let by_id: HashMap<&str, &Certification> =
        catalog.iter().map(|c| (c.id.as_str(), c)).collect();
    let mut accepted: Vec<Recommendation> = Vec::new();
    for pick in picks.recommendations {
        let Some(cert) = by_id.get(pick.cert_id.as_str()) else {
            continue;
        };
        if accepted.iter().any(|r| r.cert_id == cert.id) {
            continue;
        }
        accepted.push(Recommendation {
            cert_id: cert.id.clone(),
            name: cert.name.clone(),
            category: cert.category.clone(),
            reason: pick.reason,
        });
    }
    accepted
}

/// Interest-table recommendations with a templated reason.
pub fn fallback(interests: &[String], catalog: &[Certification]) -> Vec<Recommendation> {
    let reason = if interests.is_empty() {
        DEFAULT_REASON.to_string()
    } else {
        format!("관심 분야({})와 관련된 자격증입니다.", interests.join(", "))
    };

    let resolve = |ids: Vec<&'static str>, reason: &str| -> Vec<Recommendation> {
        ids.into_iter()
            .filter_map(|id| {
                let cert = catalog
                    .iter()
                    .find(|c| c.id == id)
                    .cloned()
                    .or_else(|| recommend::builtin(id))?;
                Some(Recommendation {
                    cert_id: cert.id,
                    name: cert.name,
                    category: cert.category,
                    reason: reason.to_string(),
                })
            })
            .collect()
    };

    let recommendations = resolve(recommend::ids_or_defaults(interests), &reason);
    if recommendations.is_empty() {
        return resolve(recommend::DEFAULT_CERT_IDS.to_vec(), DEFAULT_REASON);
    }
    recommendations
}

/// Recommend certifications for a profile; never fails.
pub async fn recommend_for(state: &AppState, request: &RecommendRequest) -> RecommendResponse {
    let catalog = certificates::load_catalog(state).await.unwrap_or_else(|e| {
        warn!("Catalog unavailable for recommendations: {}", e);
        Vec::new()
    });

    if !catalog.is_empty() {
        let prompt = build_prompt(request, &catalog);
        match state.generator.generate(&prompt, RECOMMEND_MAX_TOKENS).await {
            Ok(text) => {
                let accepted = accept_picks(&text, &catalog);
                if !accepted.is_empty() {
                    return RecommendResponse {
                        recommendations: accepted,
                        generated_by: GENERATED_BY_AI.to_string(),
                    };
                }
                warn!("Model recommended nothing from the catalog");
            }
            Err(e) => warn!("Recommendation generation failed: {}", e),
        }
    }

    RecommendResponse {
        recommendations: fallback(&request.interests, &catalog),
        generated_by: GENERATED_BY_FALLBACK.to_string(),
    }
}

pub async fn recommend(state: &AppState, body: &Body) -> Result<Response<Body>> {
    let request: RecommendRequest = parse_body!(body);
    validate!(&request);

    ok(200, recommend_for(state, &request).await)
}

pub async fn for_user(state: &AppState, user: &AuthenticatedUser) -> Result<Response<Body>> {
    let cache_key = format!("ai-recommendations:{}", user.user_id);
    if let Some(cached) = state.cache.get(&cache_key).await {
        match serde_json::from_str::<RecommendResponse>(&cached) {
            Ok(response) => return ok(200, response),
            Err(e) => warn!("Ignoring unreadable cache entry {}: {}", cache_key, e),
        }
    }

    let profile = auth::load_profile(state, user).await;
    let request = RecommendRequest {
        interests: profile.interests,
        major: profile.major,
        job: profile.job,
        experience: None,
    };
    let response = recommend_for(state, &request).await;

    state
        .cache
        .set(&cache_key, serde_json::to_string(&response)?, USER_CACHE_TTL)
        .await;
    info!(user_id = %user.user_id, generated_by = %response.generated_by, "recommended certifications");
    ok(200, response)
}
