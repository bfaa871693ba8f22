//! HTTP helpers for Lambda functions.

use lambda_http::{Body, Response};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::Result;

/// Standard API response wrapper.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn error(message: impl Into<String>) -> ApiResponse<()> {
        ApiResponse {
            success: false,
            data: None,
            error: Some(message.into()),
        }
    }
}

/// Attach the JSON content type and permissive CORS headers.
fn builder(status: u16) -> lambda_http::http::response::Builder {
    Response::builder()
        .status(status)
        .header("Content-Type", "application/json")
        .header("Access-Control-Allow-Origin", "*")
        .header("Access-Control-Allow-Headers", "Content-Type,Authorization")
        .header(
            "Access-Control-Allow-Methods",
            "GET,POST,PUT,PATCH,DELETE,OPTIONS",
        )
}

/// Create a JSON response with the given status code and body.
pub fn json_response<T: Serialize>(status: u16, body: &T) -> Result<Response<Body>> {
    let json = serde_json::to_string(body)?;
    Ok(builder(status).body(Body::from(json))?)
}

/// Create a success envelope around `data`.
pub fn ok<T: Serialize>(status: u16, data: T) -> Result<Response<Body>> {
    json_response(status, &ApiResponse::success(data))
}

/// Create an error response with the given status code and message.
pub fn error_response(status: u16, message: impl Into<String>) -> Result<Response<Body>> {
    json_response(status, &ApiResponse::<()>::error(message))
}

/// Empty 200 answer to CORS preflight requests.
pub fn preflight_response() -> Result<Response<Body>> {
    Ok(builder(200).body(Body::Empty)?)
}

/// Parse request body as JSON, returning a 400 response on failure.
///
/// Returns `Ok(Ok(T))` on successful parse, `Ok(Err(Response))` on parse error (400),
/// or `Err(Error)` when the error response itself cannot be built.
pub fn parse_json_body<T: DeserializeOwned>(body: &Body) -> Result<std::result::Result<T, Response<Body>>> {
    let raw: &[u8] = match body {
        Body::Empty => b"{}",
        other => other.as_ref(),
    };
    match serde_json::from_slice(raw) {
        Ok(parsed) => Ok(Ok(parsed)),
        Err(e) => {
            let response = error_response(400, format!("Invalid request body: {}", e))?;
            Ok(Err(response))
        }
    }
}

/// Macro to parse request body, returning early with 400 on parse error.
///
/// Usage:
/// ```ignore
/// let request: MyRequest = parse_body!(event.body());
/// ```
#[macro_export]
macro_rules! parse_body {
    ($body:expr) => {
        match $crate::http::parse_json_body($body)? {
            Ok(parsed) => parsed,
            Err(response) => return Ok(response),
        }
    };
}
