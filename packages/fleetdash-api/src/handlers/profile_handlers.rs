//! Profile read, partial update and password change endpoints.

use fleetdash_core::profile::PasswordChangeRequest;
use hyper::{body::Bytes, Request, Response};
use serde_json::Value;

use super::request_utils::{
    authorize, build_empty_response, json_response, map_form_error_to_router_error,
    read_json_body,
};
use crate::router::{AppState, RouterError};

/// Handler for GET /profile
pub async fn get_profile(
    req: Request<hyper::body::Incoming>,
    state: AppState,
) -> Result<Response<Bytes>, RouterError> {
    authorize(&req, &state)?;
    json_response(200, state.store.profile().to_json())
}

/// Handler for PATCH /profile
///
/// The body holds only the fields being changed. The response carries
/// the full canonical profile.
pub async fn update_profile(
    req: Request<hyper::body::Incoming>,
    state: AppState,
) -> Result<Response<Bytes>, RouterError> {
    authorize(&req, &state)?;
    let body: Value = read_json_body(req, state.config.request_timeout_ms).await?;

    let partial = state
        .store
        .field_set()
        .decode_partial(&body)
        .map_err(map_form_error_to_router_error)?;
    let updated = state
        .store
        .apply_update(&partial)
        .map_err(map_form_error_to_router_error)?;

    json_response(200, updated.to_json())
}

/// Handler for POST /profile/password
pub async fn change_password(
    req: Request<hyper::body::Incoming>,
    state: AppState,
) -> Result<Response<Bytes>, RouterError> {
    authorize(&req, &state)?;
    let request: PasswordChangeRequest =
        read_json_body(req, state.config.request_timeout_ms).await?;

    state
        .store
        .change_password(&request)
        .map_err(map_form_error_to_router_error)?;
    build_empty_response(204)
}
