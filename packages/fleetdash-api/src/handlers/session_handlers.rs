//! Sign-in and sign-out endpoints.

use fleetdash_core::profile::Credentials;
use hyper::{body::Bytes, Request, Response};
use serde::{Deserialize, Serialize};

use super::request_utils::{
    authorize, build_empty_response, json_response, map_form_error_to_router_error,
    read_json_body,
};
use crate::router::{AppState, RouterError};

/// Body returned by a successful sign-in.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionToken {
    pub token: String,
}

/// Handler for POST /session
pub async fn sign_in(
    req: Request<hyper::body::Incoming>,
    state: AppState,
) -> Result<Response<Bytes>, RouterError> {
    let credentials: Credentials =
        read_json_body(req, state.config.request_timeout_ms).await?;

    let token = state
        .store
        .sign_in(&credentials)
        .map_err(map_form_error_to_router_error)?;
    tracing::info!("Signed in {}", credentials.email);

    json_response(200, SessionToken { token })
}

/// Handler for DELETE /session
pub async fn sign_out(
    req: Request<hyper::body::Incoming>,
    state: AppState,
) -> Result<Response<Bytes>, RouterError> {
    let token = authorize(&req, &state)?;
    state.store.sign_out(&token);
    build_empty_response(204)
}
