mod common;

use common::{cert, FakeGenerator, TestApp};
use serde_json::json;
use shared::models::{sort_key, ANONYMOUS_USER};
use shared::{ItemStore, Query, Task};

const TOKEN: &str = "token-planner-user";

fn ai_plan(weeks: usize, tasks_per_week: usize) -> String {
    let weeks: Vec<_> = (1..=weeks)
        .map(|week| {
            let tasks: Vec<_> = (1..=tasks_per_week)
                .map(|n| json!({ "title": format!("{week}주차 과제 {n}"), "estimatedHours": 2 }))
                .collect();
            json!({ "week": week, "phase": "foundation", "focus": "SQL", "tasks": tasks })
        })
        .collect();
    let plan = json!({
        "title": "SQLD 집중 과정",
        "totalWeeks": weeks.len(),
        "weeks": weeks,
        "milestones": [{ "week": 1, "title": "기초 완료" }],
        "studyTips": ["매일 복습"],
    });
    format!("요청하신 계획입니다.\n```json\n{plan}\n```")
}

#[tokio::test]
async fn test_generation_failure_yields_fallback_plan() -> anyhow::Result<()> {
    let app = TestApp::new(FakeGenerator::Failing);

    let (status, body) = app
        .call(
            "POST",
            "/planner/generate",
            Some(json!({ "certId": "sqld", "timeframe": 10, "studyHoursPerWeek": 9 })),
            None,
        )
        .await;

    assert_eq!(status, 200);
    let plan = &body["data"]["curriculum"];
    assert_eq!(plan["generatedBy"], "Fallback");
    assert_eq!(plan["totalWeeks"], 10);
    assert_eq!(plan["weeks"].as_array().map(Vec::len), Some(10));
    assert_eq!(plan["weeks"][0]["tasks"][0]["estimatedHours"], 3.0);

    // Stored under the anonymous partition as a skeleton
    let curriculum_id = body["data"]["curriculumId"].as_str().unwrap_or_default();
    let stored = app
        .store
        .inner
        .query(
            &app.state.tables.users,
            Query::partition("userId", ANONYMOUS_USER).begins_with("type", sort_key::CURRICULUM),
        )
        .await?;
    assert_eq!(stored.len(), 1);
    let curriculum = shared::Curriculum::from_item(&stored[0])?;
    assert_eq!(curriculum.id, curriculum_id);
    assert_eq!(curriculum.status, shared::CurriculumStatus::Skeleton);
    Ok(())
}

#[tokio::test]
async fn test_unusable_model_output_yields_fallback_plan() -> anyhow::Result<()> {
    let app = TestApp::new(FakeGenerator::Reply("죄송하지만 계획을 만들 수 없습니다.".to_string()));

    let (status, body) = app
        .call(
            "POST",
            "/planner/generate",
            Some(json!({ "certId": "adsp", "timeframe": 3, "studyHoursPerWeek": 5 })),
            Some(TOKEN),
        )
        .await;
    assert_eq!(status, 200);
    assert_eq!(body["data"]["curriculum"]["generatedBy"], "Fallback");
    assert_eq!(body["data"]["curriculum"]["totalWeeks"], 3);
    Ok(())
}

#[tokio::test]
async fn test_model_plan_is_accepted() -> anyhow::Result<()> {
    let app = TestApp::new(FakeGenerator::Reply(ai_plan(3, 2)));
    app.seed_certification(cert("sqld", "SQL 개발자", "데이터베이스", &["sql"]))
        .await;

    let (status, body) = app
        .call(
            "POST",
            "/planner/generate",
            Some(json!({ "certId": "sqld", "timeframe": 3, "studyHoursPerWeek": 6, "goals": "한 번에 합격" })),
            Some(TOKEN),
        )
        .await;
    assert_eq!(status, 200);
    let plan = &body["data"]["curriculum"];
    assert_eq!(plan["generatedBy"], "AI");
    assert_eq!(plan["title"], "SQLD 집중 과정");
    assert_eq!(plan["certId"], "sqld");
    Ok(())
}

#[tokio::test]
async fn test_apply_creates_one_task_per_planned_task() -> anyhow::Result<()> {
    let app = TestApp::new(FakeGenerator::Reply(ai_plan(4, 3)));

    let (_, generated) = app
        .call(
            "POST",
            "/planner/generate",
            Some(json!({ "certId": "sqld", "timeframe": 4, "studyHoursPerWeek": 6 })),
            Some(TOKEN),
        )
        .await;
    let curriculum_id = generated["data"]["curriculumId"]
        .as_str()
        .unwrap_or_default()
        .to_string();

    let (status, applied) = app
        .call("POST", &format!("/planner/{curriculum_id}/apply"), None, Some(TOKEN))
        .await;
    assert_eq!(status, 200);
    assert_eq!(applied["data"]["tasksCreated"], 12);
    assert_eq!(applied["data"]["milestonesCreated"], 1);
    assert_eq!(applied["data"]["status"], "active");

    let items = app
        .store
        .inner
        .query(
            &app.state.tables.users,
            Query::partition("userId", "planner-user").begins_with("type", sort_key::TASK),
        )
        .await?;
    assert_eq!(items.len(), 12);
    for item in &items {
        assert_eq!(Task::from_item(item)?.curriculum_id, curriculum_id);
    }

    let (_, curriculum) = app
        .call("GET", &format!("/curriculums/{curriculum_id}"), None, Some(TOKEN))
        .await;
    assert_eq!(curriculum["data"]["status"], "active");
    assert!(curriculum["data"].get("plan").is_none());

    // Applying twice is rejected
    let (status, _) = app
        .call("POST", &format!("/planner/{curriculum_id}/apply"), None, Some(TOKEN))
        .await;
    assert_eq!(status, 400);
    Ok(())
}

#[tokio::test]
async fn test_apply_fallback_plan_anonymously() -> anyhow::Result<()> {
    let app = TestApp::new(FakeGenerator::Failing);

    let (_, generated) = app
        .call(
            "POST",
            "/planner/generate",
            Some(json!({ "certId": "aws-saa", "timeframe": 5, "studyHoursPerWeek": 7 })),
            None,
        )
        .await;
    let curriculum_id = generated["data"]["curriculumId"]
        .as_str()
        .unwrap_or_default()
        .to_string();

    let (status, applied) = app
        .call("POST", &format!("/api/planner/{curriculum_id}/apply"), None, None)
        .await;
    assert_eq!(status, 200);
    assert_eq!(applied["data"]["tasksCreated"], 15);
    // 5 weeks split 2/1/1/1, one milestone per phase
    assert_eq!(applied["data"]["milestonesCreated"], 4);
    Ok(())
}

#[tokio::test]
async fn test_apply_errors() -> anyhow::Result<()> {
    let app = TestApp::new(FakeGenerator::Failing);

    let (status, _) = app
        .call("POST", "/planner/does-not-exist/apply", None, Some(TOKEN))
        .await;
    assert_eq!(status, 404);

    // A hand-made curriculum has no plan to apply
    let (_, created) = app
        .call(
            "POST",
            "/curriculums",
            Some(json!({ "certId": "sqld", "timeframe": 4, "studyHoursPerWeek": 4 })),
            Some(TOKEN),
        )
        .await;
    let id = created["data"]["id"].as_str().unwrap_or_default().to_string();
    let (status, _) = app
        .call("POST", &format!("/planner/{id}/apply"), None, Some(TOKEN))
        .await;
    assert_eq!(status, 400);

    let (status, _) = app
        .call(
            "POST",
            "/planner/generate",
            Some(json!({ "certId": "sqld", "timeframe": 60, "studyHoursPerWeek": 4 })),
            None,
        )
        .await;
    assert_eq!(status, 400);
    Ok(())
}
