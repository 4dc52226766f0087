//! Core model for editable records.
//!
//! Provides the field set model, snapshot-based change tracking,
//! validation rules, and the error taxonomy shared by the runtime
//! and the HTTP layer.

pub mod change;
pub mod config;
pub mod error;
pub mod field;
pub mod profile;
pub mod record;
pub mod validation;

pub use change::{compute_changes, ChangeSet, ChangeTracker};
pub use config::{FormConfig, SubmitScope};
pub use error::{FailureKind, FormError, Result};
pub use field::{FieldEquality, FieldKind, FieldSpec, FieldValue, FileRef, PendingFile};
pub use record::{EditableRecord, FieldSet, PartialRecord, Snapshot};
pub use validation::{PasswordChange, PasswordPolicy, ValidationResult, Validator};
