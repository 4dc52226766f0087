//! Edit/save/revert state machine for one editable record.
//!
//! The state is derived, never stored: `Saving` while a request is in
//! flight, otherwise `Dirty` exactly when the change set is non-empty.
//! The snapshot only advances inside `complete_save` on success.

use std::collections::BTreeSet;

use fleetdash_core::{
    ChangeSet, ChangeTracker, EditableRecord, FailureKind, FieldSet, FieldValue, FormConfig,
    FormError, PartialRecord, Result, Snapshot, SubmitScope, ValidationResult, Validator,
};
use serde_json::Value;

use crate::gateway::MutationGateway;

/// Lifecycle state of an editable record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditState {
    Clean,
    Dirty,
    Saving,
}

/// A failure turned into something displayable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveFailure {
    pub kind: FailureKind,
    pub message: String,
}

impl SaveFailure {
    /// Maps an error onto the user-visible message for its kind.
    pub fn from_error(err: &FormError, config: &FormConfig) -> Self {
        let kind = err.failure_kind();
        let message = match err {
            FormError::ValidationRejected { reason, .. } => reason.clone(),
            FormError::ServerRejected(reason) => reason.clone(),
            FormError::Network(_) => {
                "Could not reach the server. Your changes are kept, please try again.".to_string()
            }
            FormError::Unauthorized(_) => {
                "Your session has expired, please sign in again.".to_string()
            }
            _ => config.generic_failure_message.clone(),
        };
        Self { kind, message }
    }
}

/// A dispatched save: the payload to hand to the gateway and the id its
/// answer must be completed with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveTicket {
    request_id: u64,
    payload: PartialRecord,
}

impl SaveTicket {
    pub fn request_id(&self) -> u64 {
        self.request_id
    }

    pub fn payload(&self) -> &PartialRecord {
        &self.payload
    }

    pub fn into_payload(self) -> PartialRecord {
        self.payload
    }
}

/// Result of `begin_save`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveAttempt {
    Dispatched(SaveTicket),
    NothingToSave,
    AlreadySaving,
    Invalid(SaveFailure),
}

/// Result of a complete save round.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveOutcome {
    Saved,
    NothingToSave,
    AlreadySaving,
    Failed(SaveFailure),
}

#[derive(Debug)]
struct InFlight {
    request_id: u64,
    /// Fields edited after the request was dispatched
    edited: BTreeSet<String>,
}

/// Coordinates edits, saves and reverts of one record.
///
/// Owned by a single editor view; a second view hydrates its own copy.
pub struct Reconciler {
    field_set: FieldSet,
    tracker: ChangeTracker,
    config: FormConfig,
    validator: Option<Box<dyn Validator<EditableRecord>>>,
    snapshot: Snapshot,
    current: EditableRecord,
    changes: ChangeSet,
    in_flight: Option<InFlight>,
    last_failure: Option<SaveFailure>,
    next_request_id: u64,
}

impl Reconciler {
    /// Creates a reconciler from a fetched JSON record.
    pub fn hydrate(field_set: FieldSet, raw: &Value, config: FormConfig) -> Result<Self> {
        let record = field_set.hydrate(raw)?;
        Self::from_record(field_set, record, config)
    }

    /// Creates a reconciler whose snapshot and current value are `record`.
    pub fn from_record(field_set: FieldSet, record: EditableRecord, config: FormConfig) -> Result<Self> {
        field_set.check_record(&record)?;
        let tracker = ChangeTracker::for_field_set(&field_set);
        Ok(Self {
            field_set,
            tracker,
            config,
            validator: None,
            snapshot: Snapshot::capture(record.clone()),
            current: record,
            changes: ChangeSet::default(),
            in_flight: None,
            last_failure: None,
            next_request_id: 1,
        })
    }

    /// Installs the rules checked before each save.
    pub fn with_validator<V>(mut self, validator: V) -> Self
    where
        V: Validator<EditableRecord> + 'static,
    {
        self.validator = Some(Box::new(validator));
        self
    }

    /// Replaces snapshot and current value after a re-fetch.
    ///
    /// Pending edits are discarded. Refused while a save is in flight.
    pub fn rehydrate(&mut self, raw: &Value) -> Result<()> {
        if self.in_flight.is_some() {
            return Err(FormError::SaveInProgress);
        }
        let record = self.field_set.hydrate(raw)?;
        self.snapshot = Snapshot::capture(record.clone());
        self.current = record;
        self.changes = ChangeSet::default();
        self.last_failure = None;
        tracing::debug!("Record rehydrated");
        Ok(())
    }

    pub fn state(&self) -> EditState {
        if self.in_flight.is_some() {
            EditState::Saving
        } else if self.changes.is_empty() {
            EditState::Clean
        } else {
            EditState::Dirty
        }
    }

    pub fn current(&self) -> &EditableRecord {
        &self.current
    }

    pub fn snapshot(&self) -> &Snapshot {
        &self.snapshot
    }

    pub fn changes(&self) -> &ChangeSet {
        &self.changes
    }

    pub fn field_set(&self) -> &FieldSet {
        &self.field_set
    }

    pub fn is_dirty(&self) -> bool {
        !self.changes.is_empty()
    }

    /// Whether the save control is enabled.
    pub fn can_save(&self) -> bool {
        self.state() == EditState::Dirty
    }

    /// Whether the revert control is enabled.
    pub fn can_revert(&self) -> bool {
        self.state() == EditState::Dirty
    }

    /// Last failure surfaced by a save attempt.
    pub fn last_failure(&self) -> Option<&SaveFailure> {
        self.last_failure.as_ref()
    }

    /// Id of the request currently in flight.
    pub fn in_flight_request(&self) -> Option<u64> {
        self.in_flight.as_ref().map(|f| f.request_id)
    }

    /// Applies a user edit and recomputes the change set.
    ///
    /// Edits are accepted while saving; they survive the in-flight response.
    ///
    /// # Arguments
    /// * `field` - Field name
    /// * `value` - New value, of the field's declared kind
    ///
    /// # Returns
    /// `Result<&ChangeSet, FormError>` containing the recomputed change set.
    pub fn edit(&mut self, field: &str, value: FieldValue) -> Result<&ChangeSet> {
        let spec = self.field_set.spec(field)?;
        if spec.read_only {
            return Err(FormError::ReadOnlyField {
                field: field.to_string(),
            });
        }
        if value.kind() != spec.kind {
            return Err(FormError::TypeMismatch {
                field: field.to_string(),
                expected: spec.kind.name().to_string(),
                got: value.kind().name().to_string(),
            });
        }

        self.current.set(field, value);
        if let Some(flight) = self.in_flight.as_mut() {
            flight.edited.insert(field.to_string());
        }
        self.recompute()?;
        tracing::debug!(
            "Edited field '{}', {} changed fields, state {:?}",
            field,
            self.changes.len(),
            self.state()
        );
        Ok(&self.changes)
    }

    /// Resets the current value to the snapshot without a network call.
    ///
    /// Returns false (and does nothing) while a save is in flight.
    pub fn revert(&mut self) -> bool {
        if self.in_flight.is_some() {
            tracing::debug!("Revert ignored while saving");
            return false;
        }
        self.current = self.snapshot.record().clone();
        self.changes = ChangeSet::default();
        self.last_failure = None;
        true
    }

    /// Validates and packages the pending changes for submission.
    pub fn begin_save(&mut self) -> SaveAttempt {
        if let Some(flight) = &self.in_flight {
            tracing::debug!("Save ignored, request {} in flight", flight.request_id);
            return SaveAttempt::AlreadySaving;
        }
        if self.changes.is_empty() {
            return SaveAttempt::NothingToSave;
        }

        if let Some(validator) = &self.validator {
            if let ValidationResult::Invalid { rule, reason } = validator.validate(&self.current) {
                let failure = SaveFailure::from_error(&FormError::rejected(rule, reason), &self.config);
                self.last_failure = Some(failure.clone());
                return SaveAttempt::Invalid(failure);
            }
        }

        let payload = match self.config.submit_scope {
            SubmitScope::ChangedFields => self.current.partial(
                self.changes
                    .iter()
                    .filter(|name| self.field_set.get(name).is_some_and(|f| !f.read_only)),
            ),
            SubmitScope::FullFieldSet => self.current.partial(self.field_set.editable_names()),
        };

        let request_id = self.next_request_id;
        self.next_request_id += 1;
        self.in_flight = Some(InFlight {
            request_id,
            edited: BTreeSet::new(),
        });
        tracing::debug!(
            "Dispatching save request {} with {} fields",
            request_id,
            payload.len()
        );

        SaveAttempt::Dispatched(SaveTicket {
            request_id,
            payload,
        })
    }

    /// Applies the gateway's answer to the request in flight.
    ///
    /// On success the snapshot advances to the confirmed record and the
    /// current value takes it too, except for fields edited during the
    /// flight. On failure the current value is left untouched.
    ///
    /// # Arguments
    /// * `request_id` - Id from the `SaveTicket`
    /// * `result` - Gateway result for that request
    ///
    /// # Returns
    /// `Result<SaveOutcome, FormError>`; fails with `StaleResponse` when
    /// `request_id` is not the request in flight.
    pub fn complete_save(
        &mut self,
        request_id: u64,
        result: Result<EditableRecord>,
    ) -> Result<SaveOutcome> {
        match &self.in_flight {
            Some(flight) if flight.request_id == request_id => {}
            _ => return Err(FormError::StaleResponse { request_id }),
        }
        let flight = self
            .in_flight
            .take()
            .ok_or(FormError::StaleResponse { request_id })?;

        let confirmed = match result {
            Ok(record) => self
                .field_set
                .check_record(&record)
                .map(|_| record)
                .map_err(|e| FormError::Unexpected(format!("malformed confirmed record: {}", e))),
            Err(err) => Err(err),
        };

        match confirmed {
            Ok(record) => {
                let mut merged = record.clone();
                for name in &flight.edited {
                    if let Some(value) = self.current.get(name) {
                        merged.set(name.clone(), value.clone());
                    }
                }
                self.snapshot = self.snapshot.advance(record);
                self.current = merged;
                self.recompute()?;
                self.last_failure = None;
                tracing::debug!(
                    "Save request {} confirmed, snapshot version {}, state {:?}",
                    request_id,
                    self.snapshot.version(),
                    self.state()
                );
                Ok(SaveOutcome::Saved)
            }
            Err(err) => {
                tracing::warn!("Save request {} failed: {}", request_id, err);
                let failure = SaveFailure::from_error(&err, &self.config);
                self.last_failure = Some(failure.clone());
                Ok(SaveOutcome::Failed(failure))
            }
        }
    }

    /// Runs a full save round against a gateway.
    pub async fn save(&mut self, gateway: &dyn MutationGateway) -> SaveOutcome {
        let ticket = match self.begin_save() {
            SaveAttempt::Dispatched(ticket) => ticket,
            SaveAttempt::NothingToSave => return SaveOutcome::NothingToSave,
            SaveAttempt::AlreadySaving => return SaveOutcome::AlreadySaving,
            SaveAttempt::Invalid(failure) => return SaveOutcome::Failed(failure),
        };

        let request_id = ticket.request_id();
        let result = gateway.submit(ticket.into_payload()).await;
        match self.complete_save(request_id, result) {
            Ok(outcome) => outcome,
            Err(err) => SaveOutcome::Failed(SaveFailure::from_error(&err, &self.config)),
        }
    }

    fn recompute(&mut self) -> Result<()> {
        self.changes = self.tracker.compute(&self.current, self.snapshot.record())?;
        Ok(())
    }
}

impl std::fmt::Debug for Reconciler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reconciler")
            .field("state", &self.state())
            .field("changes", &self.changes)
            .field("snapshot_version", &self.snapshot.version())
            .field("in_flight", &self.in_flight_request())
            .finish()
    }
}
