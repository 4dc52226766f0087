//! Form configuration.

/// Which fields a save packages into the partial update.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SubmitScope {
    /// Only fields in the current change set
    #[default]
    ChangedFields,
    /// Every editable field, changed or not
    FullFieldSet,
}

/// Form configuration.
#[derive(Debug, Clone)]
pub struct FormConfig {
    /// Save payload scope
    pub submit_scope: SubmitScope,
    /// Minimum accepted password length
    pub min_password_length: usize,
    /// Symbols a password may (and must) draw from
    pub password_symbols: String,
    /// Message shown for failures outside the known taxonomy
    pub generic_failure_message: String,
    /// Request timeout in milliseconds
    pub request_timeout_ms: u64,
    /// Response timeout in milliseconds
    pub response_timeout_ms: u64,
}

impl Default for FormConfig {
    fn default() -> Self {
        Self {
            submit_scope: SubmitScope::ChangedFields,
            min_password_length: 8,
            password_symbols: "@$!%*?&".to_string(),
            generic_failure_message: "Failed to save changes, please try again.".to_string(),
            request_timeout_ms: 5000,   // 5 seconds default
            response_timeout_ms: 10000, // 10 seconds default
        }
    }
}
