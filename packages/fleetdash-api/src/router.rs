//! Matchit routing configuration.

use std::sync::Arc;

use fleetdash_core::FormConfig;
use fleetdash_runtime::ProfileStore;
use hyper::{body::Bytes, Method, Request, Response};
use matchit::Router as MatchitRouter;

use crate::handlers;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// Demo backend
    pub store: Arc<ProfileStore>,
    /// Form configuration (timeouts)
    pub config: Arc<FormConfig>,
}

/// HTTP request router.
pub struct Router {
    inner: MatchitRouter<RouteHandler>,
    state: AppState,
}

impl Router {
    /// Creates a new router with default routes.
    pub fn new(store: Arc<ProfileStore>, config: Arc<FormConfig>) -> Self {
        let mut router = MatchitRouter::new();

        router
            .insert("/session", RouteHandler::Session)
            .expect("Failed to insert /session route");
        router
            .insert("/profile", RouteHandler::Profile)
            .expect("Failed to insert /profile route");
        router
            .insert("/profile/password", RouteHandler::Password)
            .expect("Failed to insert /profile/password route");

        Self {
            inner: router,
            state: AppState { store, config },
        }
    }

    /// Routes an incoming request to the appropriate handler.
    ///
    /// Handler errors are rendered as JSON error responses.
    pub async fn route(&self, req: Request<hyper::body::Incoming>) -> Response<Bytes> {
        let path = req.uri().path().to_string();
        let method = req.method().clone();

        let result = match self.inner.at(&path) {
            Ok(matched) => matched.value.handle(req, self.state.clone()).await,
            Err(_) => Err(RouterError::NotFound(format!("No route found for {}", path))),
        };

        match result {
            Ok(response) => {
                tracing::debug!("{} {} -> {}", method, path, response.status());
                response
            }
            Err(err) => {
                match &err {
                    RouterError::InternalError(_) => {
                        tracing::error!("{} {} failed: {}", method, path, err)
                    }
                    _ => tracing::debug!("{} {} rejected: {}", method, path, err),
                }
                err.into()
            }
        }
    }
}

/// Route handler function.
enum RouteHandler {
    Session,
    Profile,
    Password,
}

impl RouteHandler {
    /// Dispatches on the request method.
    async fn handle(
        &self,
        req: Request<hyper::body::Incoming>,
        state: AppState,
    ) -> Result<Response<Bytes>, RouterError> {
        match (self, req.method().clone()) {
            (RouteHandler::Session, Method::POST) => handlers::sign_in(req, state).await,
            (RouteHandler::Session, Method::DELETE) => handlers::sign_out(req, state).await,
            (RouteHandler::Profile, Method::GET) => handlers::get_profile(req, state).await,
            (RouteHandler::Profile, Method::PATCH) => handlers::update_profile(req, state).await,
            (RouteHandler::Password, Method::POST) => handlers::change_password(req, state).await,
            _ => Err(RouterError::MethodNotAllowed),
        }
    }
}

/// Router error type.
#[derive(Debug)]
pub enum RouterError {
    MethodNotAllowed,
    InternalError(String),
    Timeout,
    BadRequest(String),
    NotFound(String),
    Unauthorized(String),
    Unprocessable(String),
}

impl std::fmt::Display for RouterError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RouterError::MethodNotAllowed => write!(f, "Method Not Allowed"),
            RouterError::InternalError(msg) => write!(f, "Internal Error: {}", msg),
            RouterError::Timeout => write!(f, "Request Timeout"),
            RouterError::BadRequest(msg) => write!(f, "Bad Request: {}", msg),
            RouterError::NotFound(msg) => write!(f, "Not Found: {}", msg),
            RouterError::Unauthorized(msg) => write!(f, "Unauthorized: {}", msg),
            RouterError::Unprocessable(msg) => write!(f, "Unprocessable: {}", msg),
        }
    }
}

impl std::error::Error for RouterError {}

impl From<RouterError> for Response<Bytes> {
    fn from(err: RouterError) -> Self {
        let (status, message) = match &err {
            RouterError::MethodNotAllowed => (405, "Method Not Allowed"),
            RouterError::InternalError(msg) => (500, msg.as_str()),
            RouterError::Timeout => (408, "Request Timeout"),
            RouterError::BadRequest(msg) => (400, msg.as_str()),
            RouterError::NotFound(msg) => (404, msg.as_str()),
            RouterError::Unauthorized(msg) => (401, msg.as_str()),
            RouterError::Unprocessable(msg) => (422, msg.as_str()),
        };

        let error_response = crate::handlers::error_response(status, message.to_string(), None);
        let body = serde_json::to_vec(&error_response)
            .unwrap_or_else(|e| format!("{{\"success\":false,\"error\":{{\"code\":\"500\",\"message\":\"Failed to serialize error: {}\",\"details\":null}}}}", e).into_bytes());

        Response::builder()
            .status(status)
            .header("Content-Type", "application/json")
            .body(Bytes::from(body))
            .unwrap_or_else(|_| {
                let mut fallback = Response::new(Bytes::from("Internal Server Error"));
                *fallback.status_mut() = hyper::StatusCode::INTERNAL_SERVER_ERROR;
                fallback
            })
    }
}
