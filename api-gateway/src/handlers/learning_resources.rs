//! Study material per certification.
//!
//! Endpoints:
//! - GET /resources/{certId} - Stored resources, or built-in defaults

use lambda_http::{Body, Response};
use serde_json::json;
use shared::http::ok;
use shared::{LearningResource, Query, Result};
use tracing::warn;

use super::certificates;
use crate::state::AppState;

/// Generic resources offered when none are stored for a certification.
pub fn default_resources(cert_id: &str, cert_name: &str) -> Vec<LearningResource> {
    let query = urlencoding::encode(cert_name);
    let resource = |resource_id: &str, title: String, kind: &str, url: String, description: &str, order| {
        LearningResource {
            cert_id: cert_id.to_string(),
            resource_id: resource_id.to_string(),
            title,
            kind: kind.to_string(),
            url: Some(url),
            description: Some(description.to_string()),
            order,
        }
    };

    vec![
        resource(
            "official",
            format!("{} 공식 시험 안내", cert_name),
            "website",
            format!("https://www.google.com/search?q={}+%EA%B3%B5%EC%8B%9D", query),
            "시험 일정, 출제 범위, 응시 자격을 확인하세요.",
            1,
        ),
        resource(
            "past-exams",
            format!("{} 기출문제", cert_name),
            "exam",
            format!("https://www.google.com/search?q={}+%EA%B8%B0%EC%B6%9C%EB%AC%B8%EC%A0%9C", query),
            "최근 기출문제로 출제 경향을 파악하세요.",
            2,
        ),
        resource(
            "lectures",
            format!("{} 강의", cert_name),
            "video",
            format!("https://www.youtube.com/results?search_query={}", query),
            "무료 강의로 핵심 개념을 정리하세요.",
            3,
        ),
        resource(
            "community",
            format!("{} 수험생 커뮤니티", cert_name),
            "community",
            format!("https://www.google.com/search?q={}+%ED%95%A9%EA%B2%A9+%ED%9B%84%EA%B8%B0", query),
            "합격 후기와 학습 팁을 참고하세요.",
            4,
        ),
    ]
}

pub async fn list(state: &AppState, cert_id: &str) -> Result<Response<Body>> {
    let mut resources: Vec<LearningResource> = state
        .store
        .query(&state.tables.resources, Query::partition("certId", cert_id))
        .await?
        .iter()
        .map(LearningResource::from_item)
        .collect::<Result<_>>()?;

    let source = if resources.is_empty() {
        let name = match certificates::get_certification(state, cert_id).await {
            Ok(Some(cert)) => cert.name,
            Ok(None) => cert_id.to_string(),
            Err(e) => {
                warn!(%cert_id, "Certification lookup failed: {}", e);
                cert_id.to_string()
            }
        };
        resources = default_resources(cert_id, &name);
        "default"
    } else {
        resources.sort_by_key(|r| r.order);
        "stored"
    };

    ok(
        200,
        json!({
            "certId": cert_id,
            "resources": resources,
            "total": resources.len(),
            "source": source,
        }),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_resources_encode_name() {
        let resources = default_resources("sqld", "SQL 개발자");
        assert_eq!(resources.len(), 4);
        assert!(resources.iter().all(|r| r.cert_id == "sqld"));
        assert!(resources[0]
            .url
            .as_deref()
            .unwrap()
            .starts_with("https://www.google.com/search?q=SQL%20%EA%B0%9C%EB%B0%9C%EC%9E%90"));
        assert_eq!(
            resources.iter().map(|r| r.order).collect::<Vec<_>>(),
            vec![1, 2, 3, 4]
        );
    }
}
