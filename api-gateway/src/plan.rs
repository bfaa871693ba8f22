//! Study-plan generation: prompt construction, model output parsing and the
//! deterministic fallback template.

use serde::{Deserialize, Serialize};
use shared::llm::extract_json;
use shared::Certification;

/// Marker of plans produced by the model.
pub const GENERATED_BY_AI: &str = "AI";
/// Marker of plans produced by the fallback template.
pub const GENERATED_BY_FALLBACK: &str = "Fallback";

/// Tasks per week in the fallback template.
pub const FALLBACK_TASKS_PER_WEEK: usize = 3;

/// Parameters of a plan request.
#[derive(Debug, Clone)]
pub struct PlanRequest {
    pub timeframe: u32,
    pub study_hours_per_week: u32,
    pub level: Option<String>,
    pub goals: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PlanTask {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub estimated_hours: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PlanWeek {
    #[serde(default)]
    pub week: u32,
    #[serde(default)]
    pub phase: String,
    #[serde(default)]
    pub focus: String,
    #[serde(default)]
    pub tasks: Vec<PlanTask>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PlanMilestone {
    pub week: u32,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
}

/// A week-by-week study plan for one certification.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedCurriculum {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub cert_id: String,
    #[serde(default)]
    pub total_weeks: u32,
    #[serde(default)]
    pub study_hours_per_week: u32,
    #[serde(default)]
    pub weeks: Vec<PlanWeek>,
    #[serde(default)]
    pub milestones: Vec<PlanMilestone>,
    #[serde(default)]
    pub study_tips: Vec<String>,
    #[serde(default)]
    pub generated_by: String,
}

impl GeneratedCurriculum {
    /// Number of tasks across all weeks.
    pub fn task_count(&self) -> usize {
        self.weeks.iter().map(|week| week.tasks.len()).sum()
    }
}

/// Default curriculum title for a certification.
pub fn default_title(cert_name: &str) -> String {
    format!("{} 학습 계획", cert_name)
}

/// Prompt asking the model for a plan in the `GeneratedCurriculum` JSON shape.
pub fn build_prompt(cert: &Certification, request: &PlanRequest) -> String {
    format!(
        r#"당신은 자격증 학습 코치입니다. 아래 자격증을 준비하는 학습자를 위한 주차별 학습 계획을 작성하세요.

자격증 정보:
- ID: {id}
- 이름: {name}
- 분야: {category}
- 난이도: {cert_level}
- 설명: {description}

학습자 조건:
- 학습 기간: {timeframe}주
- 주당 학습 시간: {hours}시간
- 현재 수준: {level}
- 목표: {goals}

다음 JSON 형식으로만 응답하세요. 다른 설명은 포함하지 마세요.
{{
  "title": "학습 계획 제목",
  "totalWeeks": {timeframe},
  "weeks": [
    {{
      "week": 1,
      "phase": "foundation",
      "focus": "이번 주 학습 목표",
      "tasks": [
        {{ "title": "과제 제목", "description": "과제 설명", "estimatedHours": 2 }}
      ]
    }}
  ],
  "milestones": [
    {{ "week": 2, "title": "마일스톤 제목", "description": "달성 기준" }}
  ],
  "studyTips": ["학습 팁"]
}}

규칙:
- weeks 배열은 정확히 {timeframe}개의 주차를 포함해야 합니다.
- 각 주차 과제의 estimatedHours 합계는 {hours}시간을 넘지 않아야 합니다."#,
        id = cert.id,
        name = cert.name,
        category = cert.category,
        cert_level = cert.level.as_deref().unwrap_or("정보 없음"),
        description = if cert.description.is_empty() {
            "정보 없음"
        } else {
            cert.description.as_str()
        },
        timeframe = request.timeframe,
        hours = request.study_hours_per_week,
        level = request.level.as_deref().unwrap_or("입문"),
        goals = request.goals.as_deref().unwrap_or("합격"),
    )
}

/// Parse model output into a plan.
///
/// Returns `None` unless the output holds at least one week with at least one task.
pub fn parse_generated(
    text: &str,
    cert: &Certification,
    request: &PlanRequest,
) -> Option<GeneratedCurriculum> {
    let value = extract_json(text)?;
    let mut plan: GeneratedCurriculum = serde_json::from_value(value).ok()?;

    if !plan.weeks.iter().any(|week| !week.tasks.is_empty()) {
        return None;
    }

    for (index, week) in plan.weeks.iter_mut().enumerate() {
        if week.week == 0 {
            week.week = index as u32 + 1;
        }
    }
    if plan.title.trim().is_empty() {
        plan.title = default_title(&cert.name);
    }
    if plan.total_weeks == 0 {
        plan.total_weeks = plan.weeks.len() as u32;
    }
    plan.cert_id = cert.id.clone();
    plan.study_hours_per_week = request.study_hours_per_week;
    plan.generated_by = GENERATED_BY_AI.to_string();

    Some(plan)
}

struct Phase {
    key: &'static str,
    label: &'static str,
    weight: u32,
    tasks: [&'static str; FALLBACK_TASKS_PER_WEEK],
}

const PHASES: [Phase; 4] = [
    Phase {
        key: "foundation",
        label: "기초 다지기",
        weight: 35,
        tasks: ["핵심 개념 정리", "기본서 학습", "용어 및 공식 암기"],
    },
    Phase {
        key: "intermediate",
        label: "핵심 이론 심화",
        weight: 30,
        tasks: ["주요 단원 심화 학습", "단원별 문제 풀이", "오답 노트 작성"],
    },
    Phase {
        key: "advanced",
        label: "실전 응용",
        weight: 20,
        tasks: ["기출문제 풀이", "취약 영역 보완", "실습 및 사례 분석"],
    },
    Phase {
        key: "review",
        label: "총정리 및 모의고사",
        weight: 15,
        tasks: ["모의고사 응시", "전 범위 요약 복습", "시험 전략 점검"],
    },
];

/// Split `total` weeks across the phases by weight using largest remainder.
///
/// Ties go to the earlier phase; the result always sums to `total`.
pub fn phase_weeks(total: u32) -> [u32; 4] {
    let weight_sum: u32 = PHASES.iter().map(|p| p.weight).sum();
    let mut weeks = [0u32; 4];
    let mut remainders = [(0u32, 0usize); 4];

    for (i, phase) in PHASES.iter().enumerate() {
        let exact = total * phase.weight;
        weeks[i] = exact / weight_sum;
        remainders[i] = (exact % weight_sum, i);
    }

    let assigned: u32 = weeks.iter().sum();
    // Stable sort keeps phase order among equal remainders.
    remainders.sort_by(|a, b| b.0.cmp(&a.0));
    for (_, i) in remainders.iter().take((total - assigned) as usize) {
        weeks[*i] += 1;
    }
    weeks
}

/// Per-task hours: a third of the weekly budget rounded to the nearest half hour.
pub fn task_hours(study_hours_per_week: u32) -> f64 {
    let raw = study_hours_per_week as f64 / FALLBACK_TASKS_PER_WEEK as f64;
    ((raw * 2.0).round() / 2.0).max(0.5)
}

/// Deterministic plan used when generation fails.
pub fn fallback(cert: &Certification, request: &PlanRequest) -> GeneratedCurriculum {
    let hours = task_hours(request.study_hours_per_week);
    let mut weeks = Vec::with_capacity(request.timeframe as usize);
    let mut milestones = Vec::new();
    let mut week_number = 0u32;

    for (phase, count) in PHASES.iter().zip(phase_weeks(request.timeframe)) {
        if count == 0 {
            continue;
        }
        for offset in 0..count {
            week_number += 1;
            weeks.push(PlanWeek {
                week: week_number,
                phase: phase.key.to_string(),
                focus: format!("{} {} ({}/{})", cert.name, phase.label, offset + 1, count),
                tasks: phase
                    .tasks
                    .iter()
                    .map(|title| PlanTask {
                        title: format!("{} - {}", phase.label, title),
                        description: Some(format!("{}주차: {} {}", week_number, cert.name, title)),
                        estimated_hours: hours,
                    })
                    .collect(),
            });
        }
        milestones.push(PlanMilestone {
            week: week_number,
            title: format!("{} 완료", phase.label),
            description: Some(format!("{} 단계 학습 목표 달성", phase.label)),
        });
    }

    GeneratedCurriculum {
        title: default_title(&cert.name),
        cert_id: cert.id.clone(),
        total_weeks: request.timeframe,
        study_hours_per_week: request.study_hours_per_week,
        weeks,
        milestones,
        study_tips: vec![
            "매일 일정한 시간에 학습하는 습관을 만드세요.".to_string(),
            "틀린 문제는 오답 노트로 정리하고 주기적으로 복습하세요.".to_string(),
            "시험 2주 전부터는 실전과 같은 시간 제한으로 모의고사를 풀어보세요.".to_string(),
        ],
        generated_by: GENERATED_BY_FALLBACK.to_string(),
    }
}
