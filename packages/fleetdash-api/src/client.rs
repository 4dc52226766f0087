//! HTTP implementation of the record gateways.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use fleetdash_core::profile::{profile_field_set, Credentials, PasswordChangeRequest};
use fleetdash_core::{EditableRecord, FieldSet, FormConfig, FormError, PartialRecord, Result};
use fleetdash_runtime::{MutationGateway, PasswordGateway, RecordSource, SessionContext};
use reqwest::{Method, StatusCode};
use serde_json::Value;

use crate::handlers::{Envelope, SessionToken};

/// Talks to the profile endpoints over HTTP.
///
/// Every request carries the bearer token of the shared session. A 401
/// response clears that session.
#[derive(Clone)]
pub struct HttpGateway {
    client: reqwest::Client,
    base_url: String,
    session: Arc<SessionContext>,
    field_set: FieldSet,
}

impl HttpGateway {
    /// Creates a gateway for the server at `base_url`.
    ///
    /// # Arguments
    /// * `base_url` - Server root, e.g. `http://127.0.0.1:8080`
    /// * `session` - Session whose token authenticates requests
    /// * `config` - Supplies the response timeout
    pub fn new(base_url: &str, session: Arc<SessionContext>, config: &FormConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.response_timeout_ms))
            .build()
            .map_err(|e| FormError::Unexpected(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            session,
            field_set: profile_field_set()?,
        })
    }

    pub fn session(&self) -> &Arc<SessionContext> {
        &self.session
    }

    /// Signs in and stores the issued token in the session.
    pub async fn sign_in(&self, credentials: &Credentials) -> Result<()> {
        let body = serde_json::to_value(credentials)
            .map_err(|e| FormError::Unexpected(format!("Failed to encode credentials: {}", e)))?;
        let data = self
            .send(Method::POST, "/session", Some(body))
            .await?
            .ok_or_else(|| FormError::Unexpected("sign-in returned no token".to_string()))?;
        let token: SessionToken = serde_json::from_value(data)
            .map_err(|e| FormError::Unexpected(format!("Malformed sign-in response: {}", e)))?;

        self.session.set_token(token.token);
        tracing::debug!("Signed in as {}", credentials.email);
        Ok(())
    }

    /// Ends the server session and clears the local token.
    pub async fn sign_out(&self) -> Result<()> {
        let result = self.send(Method::DELETE, "/session", None).await;
        self.session.clear();
        result.map(|_| ())
    }

    /// Sends one request and unwraps the response envelope.
    ///
    /// Returns the `data` member of a success envelope, or `None` for an
    /// empty body.
    async fn send(&self, method: Method, path: &str, body: Option<Value>) -> Result<Option<Value>> {
        let url = format!("{}{}", self.base_url, path);
        let mut request = self.client.request(method.clone(), &url);
        if let Some(token) = self.session.token() {
            request = request.bearer_auth(token);
        }
        if let Some(body) = body {
            request = request.json(&body);
        }

        let response = request.send().await.map_err(map_transport_error)?;
        let status = response.status();
        let bytes = response.bytes().await.map_err(map_transport_error)?;
        tracing::debug!("{} {} -> {}", method, path, status);

        if status.is_success() {
            if bytes.is_empty() {
                return Ok(None);
            }
            let envelope: Envelope = serde_json::from_slice(&bytes)
                .map_err(|e| FormError::Unexpected(format!("Malformed response body: {}", e)))?;
            return Ok(envelope.data);
        }

        let message = serde_json::from_slice::<Envelope>(&bytes)
            .ok()
            .and_then(|envelope| envelope.error)
            .map(|error| error.message)
            .unwrap_or_else(|| {
                status
                    .canonical_reason()
                    .unwrap_or("request failed")
                    .to_string()
            });

        if status == StatusCode::UNAUTHORIZED {
            self.session.clear();
        }
        Err(classify_status(status, message))
    }
}

impl std::fmt::Debug for HttpGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpGateway")
            .field("base_url", &self.base_url)
            .field("authenticated", &self.session.is_authenticated())
            .finish()
    }
}

/// Maps a non-success status to the failure taxonomy.
pub fn classify_status(status: StatusCode, message: String) -> FormError {
    match status.as_u16() {
        408 | 502 | 503 | 504 => FormError::Network(message),
        400 | 403 | 409 | 422 => FormError::ServerRejected(message),
        401 => FormError::Unauthorized(message),
        code => FormError::Unexpected(format!("HTTP {}: {}", code, message)),
    }
}

/// Connection failures and timeouts are transient.
fn map_transport_error(e: reqwest::Error) -> FormError {
    if e.is_timeout() || e.is_connect() || e.is_request() || e.is_body() {
        FormError::Network(e.to_string())
    } else {
        FormError::Unexpected(e.to_string())
    }
}

#[async_trait]
impl RecordSource for HttpGateway {
    async fn fetch(&self) -> Result<Value> {
        self.send(Method::GET, "/profile", None)
            .await?
            .ok_or_else(|| FormError::Unexpected("profile response had no data".to_string()))
    }
}

#[async_trait]
impl MutationGateway for HttpGateway {
    async fn submit(&self, partial: PartialRecord) -> Result<EditableRecord> {
        let data = self
            .send(Method::PATCH, "/profile", Some(partial.to_json()))
            .await?
            .ok_or_else(|| FormError::Unexpected("update response had no data".to_string()))?;
        self.field_set.hydrate(&data)
    }
}

#[async_trait]
impl PasswordGateway for HttpGateway {
    async fn change_password(&self, request: PasswordChangeRequest) -> Result<()> {
        let body = serde_json::to_value(&request)
            .map_err(|e| FormError::Unexpected(format!("Failed to encode request: {}", e)))?;
        self.send(Method::POST, "/profile/password", Some(body))
            .await
            .map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fleetdash_core::FailureKind;
    use ntest::timeout;

    #[timeout(1000)]
    #[test]
    fn test_classify_status() {
        let kind = |code: u16| {
            classify_status(StatusCode::from_u16(code).unwrap(), "msg".to_string()).failure_kind()
        };
        assert_eq!(kind(503), FailureKind::Network);
        assert_eq!(kind(408), FailureKind::Network);
        assert_eq!(kind(422), FailureKind::ServerRejected);
        assert_eq!(kind(400), FailureKind::ServerRejected);
        assert_eq!(kind(401), FailureKind::Unauthorized);
        assert_eq!(kind(500), FailureKind::Unexpected);
        assert_eq!(kind(404), FailureKind::Unexpected);
    }

    #[timeout(1000)]
    #[test]
    fn test_rejection_keeps_server_message() {
        let err = classify_status(
            StatusCode::UNPROCESSABLE_ENTITY,
            "firstName must not be empty".to_string(),
        );
        assert_eq!(err.to_string(), "firstName must not be empty");
    }
}
