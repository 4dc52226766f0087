//! Synchronous validation rules run before any submission.

use crate::config::FormConfig;
use crate::error::{FormError, Result};
use crate::record::EditableRecord;

/// Outcome of validating a candidate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationResult {
    Valid,
    Invalid {
        /// Name of the violated rule
        rule: &'static str,
        /// Human-readable reason
        reason: String,
    },
}

impl ValidationResult {
    pub fn is_valid(&self) -> bool {
        matches!(self, ValidationResult::Valid)
    }

    /// Converts an invalid result into `FormError::ValidationRejected`.
    pub fn into_result(self) -> Result<()> {
        match self {
            ValidationResult::Valid => Ok(()),
            ValidationResult::Invalid { rule, reason } => Err(FormError::rejected(rule, reason)),
        }
    }
}

/// A rule set applied to a candidate value.
pub trait Validator<T: ?Sized>: Send + Sync {
    fn validate(&self, candidate: &T) -> ValidationResult;
}

type Check<T> = Box<dyn Fn(&T) -> Option<String> + Send + Sync>;

/// Ordered rules; the first violated rule decides the result.
pub struct RuleSet<T> {
    rules: Vec<(&'static str, Check<T>)>,
}

impl<T> RuleSet<T> {
    pub fn new() -> Self {
        Self { rules: Vec::new() }
    }

    /// Appends a rule. `check` returns the failure reason, or `None` when satisfied.
    pub fn rule<F>(mut self, name: &'static str, check: F) -> Self
    where
        F: Fn(&T) -> Option<String> + Send + Sync + 'static,
    {
        self.rules.push((name, Box::new(check)));
        self
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

impl<T> Default for RuleSet<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Validator<T> for RuleSet<T> {
    fn validate(&self, candidate: &T) -> ValidationResult {
        for (rule, check) in &self.rules {
            if let Some(reason) = check(candidate) {
                tracing::debug!("Validation rule '{}' failed: {}", rule, reason);
                return ValidationResult::Invalid {
                    rule: *rule,
                    reason,
                };
            }
        }
        ValidationResult::Valid
    }
}

/// Requires a text field to be present and non-blank.
pub fn required_text(
    field: &'static str,
    label: &'static str,
) -> impl Fn(&EditableRecord) -> Option<String> + Send + Sync {
    move |record: &EditableRecord| {
        let blank = record
            .get(field)
            .and_then(|v| v.as_text())
            .map_or(true, |s| s.trim().is_empty());
        blank.then(|| format!("{} required", label))
    }
}

/// Password change draft.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PasswordChange {
    pub old_password: String,
    pub new_password: String,
    pub confirmation: String,
}

impl PasswordChange {
    pub fn new(
        old_password: impl Into<String>,
        new_password: impl Into<String>,
        confirmation: impl Into<String>,
    ) -> Self {
        Self {
            old_password: old_password.into(),
            new_password: new_password.into(),
            confirmation: confirmation.into(),
        }
    }
}

/// Password policy: length and character classes.
#[derive(Debug, Clone)]
pub struct PasswordPolicy {
    min_length: usize,
    symbols: String,
}

impl PasswordPolicy {
    pub fn new(min_length: usize, symbols: impl Into<String>) -> Self {
        Self {
            min_length,
            symbols: symbols.into(),
        }
    }

    pub fn from_config(config: &FormConfig) -> Self {
        Self::new(config.min_password_length, config.password_symbols.clone())
    }

    /// Checks a new password on its own.
    ///
    /// Shared by the change form and by the server re-validation.
    pub fn check_password(&self, password: &str) -> ValidationResult {
        if password.chars().count() < self.min_length {
            return ValidationResult::Invalid {
                rule: "min_length",
                reason: format!("password must be at least {} characters", self.min_length),
            };
        }

        let is_symbol = |c: char| self.symbols.contains(c);
        if password
            .chars()
            .any(|c| !c.is_ascii_alphanumeric() && !is_symbol(c))
        {
            return ValidationResult::Invalid {
                rule: "allowed_characters",
                reason: format!(
                    "password may only contain letters, digits and symbols from {}",
                    self.symbols
                ),
            };
        }

        let has_lower = password.chars().any(|c| c.is_ascii_lowercase());
        let has_upper = password.chars().any(|c| c.is_ascii_uppercase());
        let has_digit = password.chars().any(|c| c.is_ascii_digit());
        let has_symbol = password.chars().any(is_symbol);
        if !(has_lower && has_upper && has_digit && has_symbol) {
            return ValidationResult::Invalid {
                rule: "character_classes",
                reason: format!(
                    "password must contain a lowercase letter, an uppercase letter, a digit and one of {}",
                    self.symbols
                ),
            };
        }

        ValidationResult::Valid
    }
}

impl Default for PasswordPolicy {
    fn default() -> Self {
        Self::from_config(&FormConfig::default())
    }
}

impl Validator<PasswordChange> for PasswordPolicy {
    fn validate(&self, candidate: &PasswordChange) -> ValidationResult {
        if candidate.old_password.is_empty() {
            return ValidationResult::Invalid {
                rule: "old_required",
                reason: "old password required".to_string(),
            };
        }
        if candidate.new_password != candidate.confirmation {
            return ValidationResult::Invalid {
                rule: "confirmation_match",
                reason: "new password and confirmation do not match".to_string(),
            };
        }
        self.check_password(&candidate.new_password)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::FieldValue;
    use ntest::timeout;

    fn rule_of(result: ValidationResult) -> &'static str {
        match result {
            ValidationResult::Invalid { rule, .. } => rule,
            ValidationResult::Valid => "valid",
        }
    }

    #[timeout(1000)]
    #[test]
    fn test_password_scenarios() {
        let policy = PasswordPolicy::default();

        let result = policy.validate(&PasswordChange::new("", "Abcdef1!", "Abcdef1!"));
        assert_eq!(
            result,
            ValidationResult::Invalid {
                rule: "old_required",
                reason: "old password required".to_string(),
            }
        );

        let result = policy.validate(&PasswordChange::new("x", "abc", "abc"));
        assert_eq!(rule_of(result), "min_length");

        let result = policy.validate(&PasswordChange::new("x", "Abcdef1!", "Abcdef1!"));
        assert!(result.is_valid());
    }

    #[timeout(1000)]
    #[test]
    fn test_password_rule_order() {
        let policy = PasswordPolicy::default();

        assert_eq!(
            rule_of(policy.validate(&PasswordChange::new("x", "Abcdef1!", "Abcdef1?"))),
            "confirmation_match"
        );
        assert_eq!(
            rule_of(policy.validate(&PasswordChange::new("x", "abcdefg1!", "abcdefg1!"))),
            "character_classes"
        );
        assert_eq!(
            rule_of(policy.validate(&PasswordChange::new("x", "ABCDEFG1!", "ABCDEFG1!"))),
            "character_classes"
        );
        assert_eq!(
            rule_of(policy.validate(&PasswordChange::new("x", "Abcdefgh!", "Abcdefgh!"))),
            "character_classes"
        );
        assert_eq!(
            rule_of(policy.validate(&PasswordChange::new("x", "Abcdefg12", "Abcdefg12"))),
            "character_classes"
        );
        assert_eq!(
            rule_of(policy.validate(&PasswordChange::new("x", "Abc def1!", "Abc def1!"))),
            "allowed_characters"
        );
    }

    #[timeout(1000)]
    #[test]
    fn test_custom_policy() {
        let policy = PasswordPolicy::new(4, "#");
        assert!(policy.check_password("Ab1#").is_valid());
        assert_eq!(rule_of(policy.check_password("Ab1!")), "allowed_characters");
    }

    #[timeout(1000)]
    #[test]
    fn test_into_result() {
        assert!(ValidationResult::Valid.into_result().is_ok());
        let err = PasswordPolicy::default()
            .validate(&PasswordChange::new("", "", ""))
            .into_result()
            .unwrap_err();
        assert_eq!(err, FormError::rejected("old_required", "old password required"));
        assert_eq!(err.to_string(), "old password required");
    }

    #[timeout(1000)]
    #[test]
    fn test_rule_set_first_failure_wins() {
        let rules = RuleSet::new()
            .rule("first_name_required", required_text("firstName", "first name"))
            .rule("last_name_required", required_text("lastName", "last name"));
        assert_eq!(rules.len(), 2);

        let record = EditableRecord::from_values([
            ("firstName", FieldValue::from("  ")),
            ("lastName", FieldValue::from("")),
        ]);
        assert_eq!(
            rules.validate(&record),
            ValidationResult::Invalid {
                rule: "first_name_required",
                reason: "first name required".to_string(),
            }
        );

        let record = EditableRecord::from_values([
            ("firstName", FieldValue::from("Jo")),
            ("lastName", FieldValue::from("Doe")),
        ]);
        assert!(rules.validate(&record).is_valid());
    }
}
