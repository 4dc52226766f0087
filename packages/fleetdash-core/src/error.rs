//! Form error types.

use thiserror::Error;

/// Editable-record operation errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FormError {
    /// Field not part of the field set
    #[error("Field '{field}' is not part of the field set")]
    UnknownField { field: String },

    /// Field declared twice in a field set
    #[error("Field '{field}' already exists in the field set")]
    DuplicateField { field: String },

    /// Field cannot be edited or submitted
    #[error("Field '{field}' is read-only")]
    ReadOnlyField { field: String },

    /// Value does not match the declared field kind
    #[error("Type mismatch for field '{field}': expected {expected}, got {got}")]
    TypeMismatch {
        field: String,
        expected: String,
        got: String,
    },

    /// Required field absent from a fetched record
    #[error("Missing field '{field}' in fetched record")]
    MissingField { field: String },

    /// Two records compared or merged do not share the same fields
    #[error("Field set mismatch on field '{field}'")]
    FieldSetMismatch { field: String },

    /// Operation refused while a mutation is in flight
    #[error("A save is already in progress")]
    SaveInProgress,

    /// Gateway answer for a request that is no longer in flight
    #[error("Stale response for request {request_id}")]
    StaleResponse { request_id: u64 },

    /// Local rule violation, raised before any submission
    #[error("{reason}")]
    ValidationRejected { rule: String, reason: String },

    /// Transient transport failure, retryable by the caller
    #[error("Network error: {0}")]
    Network(String),

    /// The server refused the write
    #[error("{0}")]
    ServerRejected(String),

    /// The session is missing or expired
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Anything the taxonomy above does not cover
    #[error("Unexpected failure: {0}")]
    Unexpected(String),
}

/// User-facing classification of a failed operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    ValidationRejected,
    Network,
    ServerRejected,
    Unauthorized,
    Unexpected,
}

impl FormError {
    /// Creates a validation rejection for the given rule.
    pub fn rejected(rule: impl Into<String>, reason: impl Into<String>) -> Self {
        FormError::ValidationRejected {
            rule: rule.into(),
            reason: reason.into(),
        }
    }

    /// Classifies this error for display.
    pub fn failure_kind(&self) -> FailureKind {
        match self {
            FormError::ValidationRejected { .. } => FailureKind::ValidationRejected,
            FormError::Network(_) => FailureKind::Network,
            FormError::ServerRejected(_) => FailureKind::ServerRejected,
            FormError::Unauthorized(_) => FailureKind::Unauthorized,
            _ => FailureKind::Unexpected,
        }
    }

    /// Returns whether re-invoking the same operation may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, FormError::Network(_))
    }
}

/// Result type for form operations
pub type Result<T> = std::result::Result<T, FormError>;
