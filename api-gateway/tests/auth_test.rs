mod common;

use common::{request, FakeGenerator, TestApp};
use serde_json::json;

#[tokio::test]
async fn test_register_new_email_returns_user_id() -> anyhow::Result<()> {
    let app = TestApp::new(FakeGenerator::Failing);

    let (status, body) = app
        .call(
            "POST",
            "/api/register",
            Some(json!({
                "email": "Kim@Example.com",
                "password": "password123",
                "name": "김학습",
                "interests": ["클라우드"],
            })),
            None,
        )
        .await;

    assert_eq!(status, 200);
    assert_eq!(body["success"], true);
    let user_id = body["data"]["userId"].as_str().unwrap_or_default().to_string();
    assert!(!user_id.is_empty());
    assert_eq!(body["data"]["email"], "kim@example.com");

    // Profile item written at registration
    let token = format!("token-{user_id}");
    let (status, profile) = app.call("GET", "/profile", None, Some(&token)).await;
    assert_eq!(status, 200);
    assert_eq!(profile["data"]["name"], "김학습");
    assert_eq!(profile["data"]["interests"], json!(["클라우드"]));
    Ok(())
}

#[tokio::test]
async fn test_register_existing_email_is_rejected() -> anyhow::Result<()> {
    let app = TestApp::new(FakeGenerator::Failing);
    let payload = json!({ "email": "dup@example.com", "password": "password123", "name": "A" });

    let (first, _) = app.call("POST", "/register", Some(payload.clone()), None).await;
    assert_eq!(first, 200);

    let (status, body) = app.call("POST", "/register", Some(payload), None).await;
    assert_eq!(status, 400);
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], "이미 존재하는 이메일입니다.");
    Ok(())
}

#[tokio::test]
async fn test_register_validation() -> anyhow::Result<()> {
    let app = TestApp::new(FakeGenerator::Failing);

    let (status, _) = app
        .call(
            "POST",
            "/register",
            Some(json!({ "email": "short@example.com", "password": "123", "name": "A" })),
            None,
        )
        .await;
    assert_eq!(status, 400);

    let (status, _) = app
        .call(
            "POST",
            "/register",
            Some(json!({ "email": "not-an-email", "password": "password123", "name": "A" })),
            None,
        )
        .await;
    assert_eq!(status, 400);
    assert_eq!(app.store.calls(), 0);
    Ok(())
}

#[tokio::test]
async fn test_malformed_body_is_400() -> anyhow::Result<()> {
    let app = TestApp::new(FakeGenerator::Failing);
    let mut req = request("POST", "/login", None, None);
    *req.body_mut() = lambda_http::Body::from("{not json");

    let response = app.send(req).await;
    assert_eq!(response.status(), 400);
    let body = common::json_body(&response);
    assert!(body["error"]
        .as_str()
        .unwrap_or_default()
        .starts_with("Invalid request body"));
    Ok(())
}

#[tokio::test]
async fn test_login_and_refresh() -> anyhow::Result<()> {
    let app = TestApp::new(FakeGenerator::Failing);
    app.call(
        "POST",
        "/register",
        Some(json!({ "email": "lee@example.com", "password": "password123", "name": "Lee" })),
        None,
    )
    .await;

    let (status, body) = app
        .call(
            "POST",
            "/login",
            Some(json!({ "email": "lee@example.com", "password": "wrong-password" })),
            None,
        )
        .await;
    assert_eq!(status, 401);
    assert_eq!(body["error"], "이메일 또는 비밀번호가 올바르지 않습니다.");

    let (status, body) = app
        .call(
            "POST",
            "/login",
            Some(json!({ "email": "lee@example.com", "password": "password123" })),
            None,
        )
        .await;
    assert_eq!(status, 200);
    assert!(body["data"]["accessToken"].as_str().unwrap_or_default().starts_with("token-"));
    let refresh_token = body["data"]["refreshToken"].as_str().unwrap_or_default().to_string();

    let (status, body) = app
        .call("POST", "/refresh", Some(json!({ "refreshToken": refresh_token })), None)
        .await;
    assert_eq!(status, 200);
    assert_eq!(body["data"]["tokenType"], "Bearer");

    let (status, _) = app
        .call("POST", "/refresh", Some(json!({ "refreshToken": "garbage" })), None)
        .await;
    assert_eq!(status, 401);
    Ok(())
}

#[tokio::test]
async fn test_auth_required_routes_reject_before_data_access() -> anyhow::Result<()> {
    let app = TestApp::new(FakeGenerator::Failing);
    let routes = [
        ("GET", "/profile"),
        ("PATCH", "/profile"),
        ("GET", "/certificates/recommended"),
        ("GET", "/certificates/saved"),
        ("GET", "/certificates/sqld/save"),
        ("POST", "/certificates/sqld/save"),
        ("DELETE", "/certificates/sqld/save"),
        ("GET", "/curriculums"),
        ("POST", "/curriculums"),
        ("GET", "/curriculums/abc"),
        ("PATCH", "/curriculums/abc"),
        ("DELETE", "/curriculums/abc"),
        ("GET", "/curriculums/abc/tasks"),
        ("POST", "/curriculums/abc/tasks"),
        ("PATCH", "/curriculums/abc/tasks/t1"),
        ("GET", "/curriculums/abc/progress"),
        ("GET", "/curriculums/abc/milestones"),
        ("GET", "/ai/recommendations"),
        ("GET", "/notifications"),
        ("POST", "/notifications"),
        ("DELETE", "/notifications/n1"),
    ];

    for (method, path) in routes {
        let (status, body) = app.call(method, path, Some(json!({})), None).await;
        assert_eq!(status, 401, "{method} {path}");
        assert_eq!(body["error"], "Authentication required");

        let (status, _) = app.call(method, path, Some(json!({})), Some("forged")).await;
        assert_eq!(status, 401, "{method} {path} with invalid token");
    }

    assert_eq!(app.store.calls(), 0);
    Ok(())
}

#[tokio::test]
async fn test_update_profile() -> anyhow::Result<()> {
    let app = TestApp::new(FakeGenerator::Failing);

    let (status, _) = app.call("PATCH", "/profile", Some(json!({})), Some("token-u1")).await;
    assert_eq!(status, 400);

    let (status, body) = app
        .call(
            "PATCH",
            "/profile",
            Some(json!({ "interests": ["데이터", "AI"], "major": "통계학" })),
            Some("token-u1"),
        )
        .await;
    assert_eq!(status, 200);
    assert_eq!(body["data"]["major"], "통계학");

    let (_, body) = app.call("GET", "/profile", None, Some("token-u1")).await;
    assert_eq!(body["data"]["interests"], json!(["데이터", "AI"]));
    assert_eq!(body["data"]["email"], "u1@example.com");
    Ok(())
}

#[tokio::test]
async fn test_preflight_and_unknown_route() -> anyhow::Result<()> {
    let app = TestApp::new(FakeGenerator::Failing);

    let response = app.send(request("OPTIONS", "/api/curriculums", None, None)).await;
    assert_eq!(response.status(), 200);
    assert_eq!(response.headers()["access-control-allow-origin"], "*");

    let (status, body) = app.call("PUT", "/api/nowhere/1", None, None).await;
    assert_eq!(status, 404);
    assert_eq!(body["error"], "Not found");
    assert_eq!(body["method"], "PUT");
    assert_eq!(body["path"], "/nowhere/1");
    Ok(())
}

async fn register_with_profile(app: &TestApp) -> String {
    let (_, body) = app
        .call(
            "POST",
            "/register",
            Some(json!({
                "email": "lee@example.com",
                "password": "password123",
                "name": "이학습",
                "interests": ["데이터", "클라우드"],
                "major": "CS",
                "job": "dev",
            })),
            None,
        )
        .await;
    format!("token-{}", body["data"]["userId"].as_str().unwrap_or_default())
}

#[tokio::test]
async fn test_profile_read_failure_returns_default_profile() -> anyhow::Result<()> {
    let app = TestApp::new(FakeGenerator::Failing);
    let token = register_with_profile(&app).await;

    app.store.fail_next_gets(1);
    let (status, body) = app.call("GET", "/profile", None, Some(&token)).await;
    assert_eq!(status, 200);
    assert_eq!(body["data"]["name"], "");
    assert_eq!(body["data"]["interests"], json!([]));

    // The stored profile is untouched
    let (_, body) = app.call("GET", "/profile", None, Some(&token)).await;
    assert_eq!(body["data"]["name"], "이학습");
    Ok(())
}

#[tokio::test]
async fn test_profile_update_does_not_overwrite_on_read_failure() -> anyhow::Result<()> {
    let app = TestApp::new(FakeGenerator::Failing);
    let token = register_with_profile(&app).await;

    app.store.fail_next_gets(1);
    let (status, _) = app
        .call("PATCH", "/profile", Some(json!({ "name": "이학습2" })), Some(&token))
        .await;
    assert_eq!(status, 500);

    let (_, body) = app.call("GET", "/profile", None, Some(&token)).await;
    assert_eq!(body["data"]["name"], "이학습");
    assert_eq!(body["data"]["interests"], json!(["데이터", "클라우드"]));
    assert_eq!(body["data"]["major"], "CS");
    assert_eq!(body["data"]["job"], "dev");

    // Without a failure the update keeps the other fields
    let (status, body) = app
        .call("PATCH", "/profile", Some(json!({ "name": "이학습2" })), Some(&token))
        .await;
    assert_eq!(status, 200);
    assert_eq!(body["data"]["name"], "이학습2");
    assert_eq!(body["data"]["major"], "CS");
    Ok(())
}

#[tokio::test]
async fn test_profile_update_creates_missing_profile() -> anyhow::Result<()> {
    let app = TestApp::new(FakeGenerator::Failing);

    let (status, body) = app
        .call("PATCH", "/profile", Some(json!({ "job": "analyst" })), Some("token-no-profile"))
        .await;
    assert_eq!(status, 200);
    assert_eq!(body["data"]["userId"], "no-profile");
    assert_eq!(body["data"]["job"], "analyst");
    Ok(())
}
