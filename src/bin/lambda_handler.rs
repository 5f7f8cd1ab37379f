//! AWS Lambda handler for renewal requests
//!
//! Accepts a `RenewalRequest` JSON body through a Lambda Function URL and
//! returns the outcome JSON, or an error body with a typed error kind.

use aws_lambda_events::event::lambda_function_urls::{LambdaFunctionUrlRequest, LambdaFunctionUrlResponse};
use aws_lambda_events::http::header::{self, HeaderMap, HeaderValue};
use lambda_runtime::{run, service_fn, Error, LambdaEvent};
use renewal_engine::{RenewalError, RenewalOutcome, RenewalRequest};
use serde::Serialize;

/// Response body wrapping the outcome with timing
#[derive(Debug, Serialize)]
struct RenewalResponse {
    outcome: RenewalOutcome,
    execution_time_ms: u64,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: &'static str,
    message: String,
}

fn error_kind(err: &RenewalError) -> &'static str {
    match err {
        RenewalError::InsufficientData { .. } => "insufficient_data",
        RenewalError::InvalidClaimant { .. } => "invalid_claimant",
        RenewalError::InvalidParameters { .. } => "invalid_parameters",
        RenewalError::DivisionGuard { .. } => "division_guard",
    }
}

/// CORS headers on every response, JSON content type when there is a body
fn response_headers(has_body: bool) -> HeaderMap {
    let mut headers = HeaderMap::new();
    if has_body {
        headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("application/json"));
    }
    headers.insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, HeaderValue::from_static("*"));
    headers.insert(header::ACCESS_CONTROL_ALLOW_METHODS, HeaderValue::from_static("POST, OPTIONS"));
    headers.insert(header::ACCESS_CONTROL_ALLOW_HEADERS, HeaderValue::from_static("Content-Type"));
    headers
}

fn respond(status_code: i64, body: Option<String>) -> LambdaFunctionUrlResponse {
    LambdaFunctionUrlResponse {
        status_code,
        headers: response_headers(body.is_some()),
        body,
        is_base64_encoded: false,
        cookies: Vec::new(),
    }
}

fn error_response(status_code: i64, error: &'static str, message: String) -> Result<LambdaFunctionUrlResponse, Error> {
    let body = serde_json::to_string(&ErrorBody { error, message })?;
    Ok(respond(status_code, Some(body)))
}

/// Lambda handler function
async fn handler(event: LambdaEvent<LambdaFunctionUrlRequest>) -> Result<LambdaFunctionUrlResponse, Error> {
    let start = std::time::Instant::now();
    let payload = event.payload;

    // CORS preflight
    if payload.request_context.http.method.as_deref() == Some("OPTIONS") {
        return Ok(respond(200, None));
    }
    if payload.is_base64_encoded {
        return error_response(400, "bad_request", "base64-encoded bodies are not supported".to_string());
    }

    let body = payload.body.unwrap_or_default();
    let request = match RenewalRequest::from_json(&body) {
        Ok(request) => request,
        Err(e) => return error_response(400, error_kind(&e), e.to_string()),
    };
    log::info!("request {} for {}", request.case_id(), request.carrier());

    match renewal_engine::run(request) {
        Ok(outcome) => {
            let response = RenewalResponse {
                outcome,
                execution_time_ms: start.elapsed().as_millis() as u64,
            };
            Ok(respond(200, Some(serde_json::to_string(&response)?)))
        }
        Err(e) => {
            log::warn!("renewal failed: {}", e);
            error_response(422, error_kind(&e), e.to_string())
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    env_logger::init();
    run(service_fn(handler)).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preflight_carries_cors_headers() {
        let response = respond(200, None);
        assert_eq!(response.headers.get(header::ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(), "*");
        assert_eq!(response.headers.get(header::ACCESS_CONTROL_ALLOW_METHODS).unwrap(), "POST, OPTIONS");
        assert_eq!(response.headers.get(header::ACCESS_CONTROL_ALLOW_HEADERS).unwrap(), "Content-Type");
        assert!(response.headers.get(header::CONTENT_TYPE).is_none());
    }

    #[test]
    fn test_error_body_is_json_with_cors() {
        let response = error_response(422, "invalid_parameters", "weights must sum to 1".to_string()).unwrap();
        assert_eq!(response.status_code, 422);
        assert_eq!(response.headers.get(header::CONTENT_TYPE).unwrap(), "application/json");
        assert_eq!(response.headers.get(header::ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(), "*");
        let body: serde_json::Value = serde_json::from_str(response.body.as_deref().unwrap()).unwrap();
        assert_eq!(body["error"], "invalid_parameters");
    }
}
