//! Route handlers. Each returns a complete HTTP response or a `shared::Error`
//! that the router turns into one.

pub mod ai_recommendations;
pub mod ai_search;
pub mod auth;
pub mod certificates;
pub mod curriculums;
pub mod learning_resources;
pub mod notifications;
pub mod planner;
pub mod tasks;

use lambda_http::{Body, Request, RequestExt, Response};
use shared::http::error_response;
use shared::Result;
use validator::Validate;

/// Run `validator` rules, producing a 400 response on violation.
pub(crate) fn check<T: Validate>(request: &T) -> Result<std::result::Result<(), Response<Body>>> {
    match request.validate() {
        Ok(()) => Ok(Ok(())),
        Err(errors) => Ok(Err(error_response(400, errors.to_string())?)),
    }
}

/// Return early with a 400 response when validation fails.
macro_rules! validate {
    ($request:expr) => {
        if let Err(response) = $crate::handlers::check($request)? {
            return Ok(response);
        }
    };
}
pub(crate) use validate;

/// First value of a query-string parameter.
pub(crate) fn query_param<'a>(event: &'a Request, name: &str) -> Option<&'a str> {
    event
        .query_string_parameters_ref()
        .and_then(|params| params.first(name))
        .map(str::trim)
        .filter(|value| !value.is_empty())
}

pub(crate) fn not_found(what: &str) -> Result<Response<Body>> {
    error_response(404, format!("{} not found", what))
}
