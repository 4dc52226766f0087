//! Request utilities for HTTP endpoints.

use fleetdash_core::FormError;
use http_body_util::BodyExt;
use hyper::{body::Bytes, header::AUTHORIZATION, Request, Response};
use serde::de::DeserializeOwned;
use tokio::time;

use crate::router::{AppState, RouterError};

/// Helper function to read request body with timeout
pub async fn read_request_body_with_timeout(
    req: Request<hyper::body::Incoming>,
    timeout_ms: u64,
) -> Result<Bytes, RouterError> {
    let timeout_duration = time::Duration::from_millis(timeout_ms);
    let body = time::timeout(timeout_duration, req.collect())
        .await
        .map_err(|_| RouterError::Timeout)?
        .map_err(|e| RouterError::InternalError(format!("Failed to read request body: {}", e)))?;
    Ok(body.to_bytes())
}

/// Reads and parses a JSON request body.
pub async fn read_json_body<T: DeserializeOwned>(
    req: Request<hyper::body::Incoming>,
    timeout_ms: u64,
) -> Result<T, RouterError> {
    let body = read_request_body_with_timeout(req, timeout_ms).await?;
    serde_json::from_slice(&body)
        .map_err(|e| RouterError::BadRequest(format!("Invalid JSON: {}", e)))
}

/// Extracts the bearer token of a request.
pub fn bearer_token<B>(req: &Request<B>) -> Option<String> {
    req.headers()
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(|token| token.trim().to_string())
        .filter(|token| !token.is_empty())
}

/// Requires a live session token.
pub fn authorize<B>(req: &Request<B>, state: &AppState) -> Result<String, RouterError> {
    let token = bearer_token(req)
        .ok_or_else(|| RouterError::Unauthorized("missing bearer token".to_string()))?;
    if !state.store.verify_token(&token) {
        return Err(RouterError::Unauthorized(
            "session expired or invalid".to_string(),
        ));
    }
    Ok(token)
}

/// Map FormError to appropriate RouterError
pub fn map_form_error_to_router_error(e: FormError) -> RouterError {
    match e {
        FormError::UnknownField { .. }
        | FormError::DuplicateField { .. }
        | FormError::ReadOnlyField { .. }
        | FormError::TypeMismatch { .. }
        | FormError::MissingField { .. }
        | FormError::FieldSetMismatch { .. } => RouterError::BadRequest(e.to_string()),
        FormError::ValidationRejected { .. } | FormError::ServerRejected(_) => {
            RouterError::Unprocessable(e.to_string())
        }
        FormError::Unauthorized(msg) => RouterError::Unauthorized(msg),
        _ => RouterError::InternalError(format!("Runtime error: {}", e)),
    }
}

/// Helper to build HTTP response with proper error handling
pub fn build_response(status: u16, json: Vec<u8>) -> Result<Response<Bytes>, RouterError> {
    Response::builder()
        .status(status)
        .header("Content-Type", "application/json")
        .body(Bytes::from(json))
        .map_err(|e| RouterError::InternalError(format!("Failed to build response: {}", e)))
}

/// Helper to build empty HTTP response (for 204 No Content)
pub fn build_empty_response(status: u16) -> Result<Response<Bytes>, RouterError> {
    Response::builder()
        .status(status)
        .body(Bytes::new())
        .map_err(|e| RouterError::InternalError(format!("Failed to build response: {}", e)))
}

/// Serializes `data` into a success envelope.
pub fn json_response<T: serde::Serialize>(
    status: u16,
    data: T,
) -> Result<Response<Bytes>, RouterError> {
    let json = serde_json::to_vec(&super::success_response(data))
        .map_err(|e| RouterError::InternalError(format!("Failed to serialize response: {}", e)))?;
    build_response(status, json)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ntest::timeout;

    #[timeout(1000)]
    #[test]
    fn test_bearer_token_parsing() {
        let req = Request::builder()
            .header(AUTHORIZATION, "Bearer session-1")
            .body(())
            .unwrap();
        assert_eq!(bearer_token(&req).as_deref(), Some("session-1"));

        let req = Request::builder()
            .header(AUTHORIZATION, "Basic abc")
            .body(())
            .unwrap();
        assert_eq!(bearer_token(&req), None);

        let req = Request::builder().body(()).unwrap();
        assert_eq!(bearer_token(&req), None);
    }

    #[timeout(1000)]
    #[test]
    fn test_form_error_mapping() {
        assert!(matches!(
            map_form_error_to_router_error(FormError::ReadOnlyField {
                field: "email".to_string()
            }),
            RouterError::BadRequest(_)
        ));
        assert!(matches!(
            map_form_error_to_router_error(FormError::ServerRejected("no".to_string())),
            RouterError::Unprocessable(_)
        ));
        assert!(matches!(
            map_form_error_to_router_error(FormError::Unauthorized("no".to_string())),
            RouterError::Unauthorized(_)
        ));
        assert!(matches!(
            map_form_error_to_router_error(FormError::Network("down".to_string())),
            RouterError::InternalError(_)
        ));
    }
}
