//! Save/revert reconciliation for editable records.
//!
//! Ties the core change tracking to asynchronous gateways: the
//! `Reconciler` state machine, the password form, the session context,
//! and an in-memory demo backend with an in-process gateway.

mod gateway;
mod local;
mod password;
mod reconciler;
mod session;
mod store;

use fleetdash_core::profile::{profile_field_set, profile_rules};
use fleetdash_core::{FormConfig, Result};

pub use gateway::{MutationGateway, PasswordGateway, RecordSource};
pub use local::LocalGateway;
pub use password::PasswordForm;
pub use reconciler::{EditState, Reconciler, SaveAttempt, SaveFailure, SaveOutcome, SaveTicket};
pub use session::SessionContext;
pub use store::{ProfileStore, DEMO_EMAIL, DEMO_PASSWORD};

/// Fetches the profile and opens an editing session on it.
///
/// The returned reconciler checks the profile rules before each save.
pub async fn open_profile(source: &dyn RecordSource, config: FormConfig) -> Result<Reconciler> {
    let raw = source.fetch().await?;
    let reconciler = Reconciler::hydrate(profile_field_set()?, &raw, config)?;
    tracing::debug!("Opened profile editor");
    Ok(reconciler.with_validator(profile_rules()))
}
