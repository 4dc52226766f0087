//! Collaborator traits for fetching and persisting records.
//!
//! Gateways perform no retries. A `FormError::Network` failure is
//! transient and may be retried by the caller; server rejections are not.

use async_trait::async_trait;
use fleetdash_core::profile::PasswordChangeRequest;
use fleetdash_core::{EditableRecord, PartialRecord, Result};
use serde_json::Value;

/// Supplies the raw record a form is hydrated from.
#[async_trait]
pub trait RecordSource: Send + Sync {
    async fn fetch(&self) -> Result<Value>;
}

/// Submits partial updates and returns the server-confirmed record.
#[async_trait]
pub trait MutationGateway: Send + Sync {
    async fn submit(&self, partial: PartialRecord) -> Result<EditableRecord>;
}

/// Submits password changes.
#[async_trait]
pub trait PasswordGateway: Send + Sync {
    async fn change_password(&self, request: PasswordChangeRequest) -> Result<()>;
}
