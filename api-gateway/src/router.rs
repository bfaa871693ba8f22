//! Entry router: resolves the caller and dispatches each request to exactly one handler.

use std::sync::Arc;

use lambda_http::http::Method;
use lambda_http::{Body, Error, Request, RequestExt, Response};
use serde_json::json;
use shared::http::{error_response, json_response, preflight_response};
use shared::{resolve_user, AuthenticatedUser, Result};
use tracing::{error, info, warn};

use crate::handlers::{
    ai_recommendations, ai_search, auth, certificates, curriculums, learning_resources,
    notifications, planner, tasks,
};
use crate::state::AppState;

/// Return 401 from the enclosing handler when no caller was resolved.
macro_rules! authenticated {
    ($user:expr) => {
        match $user {
            Some(user) => user,
            None => return error_response(401, "Authentication required"),
        }
    };
}

/// Path without the `/api` stage prefix.
fn route_path(raw: &str) -> &str {
    match raw.strip_prefix("/api") {
        Some(rest) if rest.is_empty() || rest.starts_with('/') => rest,
        _ => raw,
    }
}

/// Percent-decoded, non-empty path segments.
fn segments(path: &str) -> Vec<String> {
    path.split('/')
        .filter(|segment| !segment.is_empty())
        .map(|segment| {
            urlencoding::decode(segment)
                .map(|decoded| decoded.into_owned())
                .unwrap_or_else(|_| segment.to_string())
        })
        .collect()
}

async fn route(
    state: &AppState,
    event: &Request,
    method: &str,
    path: &str,
    user: Option<&AuthenticatedUser>,
) -> Result<Response<Body>> {
    let owned = segments(path);
    let segments: Vec<&str> = owned.iter().map(String::as_str).collect();
    let body = event.body();

    match (method, segments.as_slice()) {
        // Auth
        ("POST", ["register"]) => auth::register(state, body).await,
        ("POST", ["login"]) => auth::login(state, body).await,
        ("POST", ["refresh"]) => auth::refresh(state, body).await,
        ("GET", ["profile"]) => auth::get_profile(state, authenticated!(user)).await,
        ("PATCH", ["profile"]) => auth::update_profile(state, authenticated!(user), body).await,

        // Certificates
        ("GET", ["certificates"]) => certificates::search(state, event).await,
        ("GET", ["certificates", "recommended"]) => {
            certificates::recommended(state, authenticated!(user)).await
        }
        ("GET", ["certificates", "saved"]) => {
            certificates::saved(state, authenticated!(user)).await
        }
        ("GET", ["certificates", id]) => certificates::get(state, id).await,
        ("GET", ["certificates", id, "save"]) => {
            certificates::is_saved(state, authenticated!(user), id).await
        }
        ("POST", ["certificates", id, "save"]) => {
            certificates::save(state, authenticated!(user), id).await
        }
        ("DELETE", ["certificates", id, "save"]) => {
            certificates::unsave(state, authenticated!(user), id).await
        }

        // Curriculums
        ("GET", ["curriculums"]) => {
            curriculums::list(state, &authenticated!(user).user_id).await
        }
        ("POST", ["curriculums"]) => {
            curriculums::create(state, &authenticated!(user).user_id, body).await
        }
        ("GET", ["curriculums", id]) => {
            curriculums::get(state, &authenticated!(user).user_id, id).await
        }
        ("PATCH", ["curriculums", id]) => {
            curriculums::update(state, &authenticated!(user).user_id, id, body).await
        }
        ("DELETE", ["curriculums", id]) => {
            curriculums::delete(state, &authenticated!(user).user_id, id).await
        }
        ("GET", ["curriculums", id, "progress"]) => {
            tasks::progress(state, &authenticated!(user).user_id, id).await
        }
        ("GET", ["curriculums", id, "milestones"]) => {
            curriculums::list_milestones(state, &authenticated!(user).user_id, id).await
        }
        ("POST", ["curriculums", id, "milestones"]) => {
            curriculums::create_milestone(state, &authenticated!(user).user_id, id, body).await
        }
        ("PATCH", ["curriculums", id, "milestones", milestone_id]) => {
            let user = authenticated!(user);
            curriculums::update_milestone(state, &user.user_id, id, milestone_id, body).await
        }

        // Tasks
        ("GET", ["curriculums", id, "tasks"]) => {
            tasks::list(state, &authenticated!(user).user_id, id, event).await
        }
        ("POST", ["curriculums", id, "tasks"]) => {
            tasks::create(state, &authenticated!(user).user_id, id, body).await
        }
        ("GET", ["curriculums", id, "tasks", task_id]) => {
            tasks::get(state, &authenticated!(user).user_id, id, task_id).await
        }
        ("PATCH", ["curriculums", id, "tasks", task_id]) => {
            tasks::update(state, &authenticated!(user).user_id, id, task_id, body).await
        }
        ("DELETE", ["curriculums", id, "tasks", task_id]) => {
            tasks::delete(state, &authenticated!(user).user_id, id, task_id).await
        }

        // Planner (anonymous allowed)
        ("POST", ["planner", "generate"]) => planner::generate(state, user, body).await,
        ("POST", ["planner", id, "apply"]) => planner::apply(state, user, id).await,

        // AI
        ("POST", ["ai", "ask"]) => ai_search::ask(state, body).await,
        ("POST", ["ai", "recommend"]) => ai_recommendations::recommend(state, body).await,
        ("GET", ["ai", "recommendations"]) => {
            ai_recommendations::for_user(state, authenticated!(user)).await
        }

        // Resources
        ("GET", ["resources", cert_id]) => learning_resources::list(state, cert_id).await,

        // Notifications
        ("GET", ["notifications"]) => {
            notifications::list(state, &authenticated!(user).user_id).await
        }
        ("POST", ["notifications"]) => {
            notifications::create(state, &authenticated!(user).user_id, body).await
        }
        ("DELETE", ["notifications", id]) => {
            notifications::delete(state, &authenticated!(user).user_id, id).await
        }

        _ => json_response(
            404,
            &json!({
                "success": false,
                "error": "Not found",
                "method": method,
                "path": path,
            }),
        ),
    }
}

/// Lambda entry point for every API route.
pub async fn handler(state: Arc<AppState>, event: Request) -> std::result::Result<Response<Body>, Error> {
    let raw_path = event.uri().path().to_string();
    let path = route_path(&raw_path);
    let method = event.method().clone();

    info!(method = %method, path = %path, "Received request");

    if method == Method::OPTIONS {
        return Ok(preflight_response()?);
    }

    let claims = event
        .request_context_ref()
        .and_then(|context| context.authorizer())
        .and_then(|authorizer| authorizer.fields.get("claims"));
    let authorization = event
        .headers()
        .get("authorization")
        .and_then(|value| value.to_str().ok());
    let user = resolve_user(state.verifier.as_ref(), claims, authorization).await;

    match route(&state, &event, method.as_str(), path, user.as_ref()).await {
        Ok(response) => Ok(response),
        Err(e) => {
            let status = e.status_code();
            if status >= 500 {
                error!(method = %method, path = %path, status, "Request failed: {}", e);
            } else {
                warn!(method = %method, path = %path, status, "Request rejected: {}", e);
            }
            Ok(error_response(status, e.to_string())?)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_route_path_strips_stage_prefix() {
        assert_eq!(route_path("/api/curriculums"), "/curriculums");
        assert_eq!(route_path("/api"), "");
        assert_eq!(route_path("/apiary"), "/apiary");
        assert_eq!(route_path("/certificates"), "/certificates");
    }

    #[test]
    fn test_segments_are_decoded() {
        assert_eq!(
            segments("/resources/%EC%A0%95%EB%B3%B4%EC%B2%98%EB%A6%AC%EA%B8%B0%EC%82%AC/"),
            vec!["resources", "정보처리기사"]
        );
        assert_eq!(segments("//curriculums//abc"), vec!["curriculums", "abc"]);
    }
}
