//! In-process gateway over the demo backend.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use fleetdash_core::profile::PasswordChangeRequest;
use fleetdash_core::{EditableRecord, FormError, PartialRecord, Result};
use parking_lot::Mutex;
use serde_json::Value;

use crate::gateway::{MutationGateway, PasswordGateway, RecordSource};
use crate::store::ProfileStore;

/// Gateway calling a `ProfileStore` directly, with optional simulated
/// latency and injected failures.
#[derive(Debug)]
pub struct LocalGateway {
    store: Arc<ProfileStore>,
    calls: AtomicUsize,
    failures: Mutex<VecDeque<FormError>>,
    latency: Option<Duration>,
}

impl LocalGateway {
    pub fn new(store: Arc<ProfileStore>) -> Self {
        Self {
            store,
            calls: AtomicUsize::new(0),
            failures: Mutex::new(VecDeque::new()),
            latency: None,
        }
    }

    /// Delays every mutation by `latency`.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Makes the next mutation fail with `err` instead of reaching the store.
    pub fn fail_next(&self, err: FormError) {
        self.failures.lock().push_back(err);
    }

    /// Number of mutations (profile updates and password changes) received.
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::Acquire)
    }

    pub fn store(&self) -> &Arc<ProfileStore> {
        &self.store
    }

    async fn round_trip(&self) -> Result<()> {
        self.calls.fetch_add(1, Ordering::AcqRel);
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        let injected = self.failures.lock().pop_front();
        match injected {
            Some(err) => {
                tracing::debug!("Injected gateway failure: {}", err);
                Err(err)
            }
            None => Ok(()),
        }
    }
}

#[async_trait]
impl RecordSource for LocalGateway {
    async fn fetch(&self) -> Result<Value> {
        Ok(self.store.profile().to_json())
    }
}

#[async_trait]
impl MutationGateway for LocalGateway {
    async fn submit(&self, partial: PartialRecord) -> Result<EditableRecord> {
        self.round_trip().await?;
        self.store.apply_update(&partial)
    }
}

#[async_trait]
impl PasswordGateway for LocalGateway {
    async fn change_password(&self, request: PasswordChangeRequest) -> Result<()> {
        self.round_trip().await?;
        self.store.change_password(&request)
    }
}
