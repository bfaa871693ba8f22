//! Free-form certification questions answered by the model.
//!
//! Endpoints:
//! - POST /ai/ask - Answer a question with related certifications as context

use lambda_http::{Body, Response};
use serde::Deserialize;
use serde_json::json;
use shared::http::ok;
use shared::{parse_body, Certification, Result};
use tracing::warn;
use validator::Validate;

use super::{certificates, validate};
use crate::plan::{GENERATED_BY_AI, GENERATED_BY_FALLBACK};
use crate::state::AppState;

const MAX_RELATED: usize = 5;
const ANSWER_MAX_TOKENS: u32 = 1024;

pub const FALLBACK_ANSWER: &str =
    "죄송합니다. 지금은 답변을 생성할 수 없습니다. 잠시 후 다시 시도해 주세요.";

/// Ask question request
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
struct AskRequest {
    #[validate(length(min = 1, max = 1000))]
    question: String,
}

/// Catalog entries matching any word of the question.
pub fn related(catalog: Vec<Certification>, question: &str) -> Vec<Certification> {
    let words: Vec<&str> = question
        .split_whitespace()
        .map(|w| w.trim_matches(|c: char| !c.is_alphanumeric()))
        .filter(|w| w.chars().count() >= 2)
        .collect();

    catalog
        .into_iter()
        .filter(|cert| words.iter().any(|word| cert.matches(word)))
        .take(MAX_RELATED)
        .collect()
}

fn build_prompt(question: &str, related: &[Certification]) -> String {
    let context = if related.is_empty() {
        "관련 자격증 정보 없음".to_string()
    } else {
        related
            .iter()
            .map(|c| format!("- {} ({}): {}", c.name, c.category, c.description))
            .collect::<Vec<_>>()
            .join("\n")
    };

    format!(
        "당신은 IT 자격증 상담 전문가입니다. 아래 자격증 정보를 참고하여 질문에 한국어로 간결하게 답하세요.\n\n\
         관련 자격증:\n{context}\n\n질문: {question}"
    )
}

pub async fn ask(state: &AppState, body: &Body) -> Result<Response<Body>> {
    let request: AskRequest = parse_body!(body);
    validate!(&request);

    let catalog = certificates::load_catalog(state).await.unwrap_or_else(|e| {
        warn!("Catalog unavailable for question context: {}", e);
        Vec::new()
    });
    let related = related(catalog, &request.question);

    let prompt = build_prompt(&request.question, &related);
    let (answer, generated_by) = match state.generator.generate(&prompt, ANSWER_MAX_TOKENS).await {
        Ok(answer) => (answer.trim().to_string(), GENERATED_BY_AI),
        Err(e) => {
            warn!("Answer generation failed: {}", e);
            (FALLBACK_ANSWER.to_string(), GENERATED_BY_FALLBACK)
        }
    };

    ok(
        200,
        json!({
            "question": request.question,
            "answer": answer,
            "relatedCertifications": related,
            "generatedBy": generated_by,
        }),
    )
}
