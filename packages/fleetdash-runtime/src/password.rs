//! Password change form.

use fleetdash_core::profile::PasswordChangeRequest;
use fleetdash_core::{FormConfig, FormError, PasswordChange, PasswordPolicy, ValidationResult, Validator};

use crate::gateway::PasswordGateway;
use crate::reconciler::{SaveFailure, SaveOutcome};

/// Draft and submission of a password change.
#[derive(Debug)]
pub struct PasswordForm {
    policy: PasswordPolicy,
    config: FormConfig,
    draft: PasswordChange,
    last_failure: Option<SaveFailure>,
}

impl PasswordForm {
    pub fn new(config: FormConfig) -> Self {
        Self {
            policy: PasswordPolicy::from_config(&config),
            config,
            draft: PasswordChange::default(),
            last_failure: None,
        }
    }

    pub fn draft(&self) -> &PasswordChange {
        &self.draft
    }

    /// Replaces the whole draft.
    pub fn set_draft(&mut self, draft: PasswordChange) {
        self.draft = draft;
    }

    pub fn set_old_password(&mut self, value: impl Into<String>) {
        self.draft.old_password = value.into();
    }

    pub fn set_new_password(&mut self, value: impl Into<String>) {
        self.draft.new_password = value.into();
    }

    pub fn set_confirmation(&mut self, value: impl Into<String>) {
        self.draft.confirmation = value.into();
    }

    pub fn last_failure(&self) -> Option<&SaveFailure> {
        self.last_failure.as_ref()
    }

    /// Runs the password policy against the draft.
    pub fn validate(&self) -> ValidationResult {
        self.policy.validate(&self.draft)
    }

    /// Validates the draft and, when valid, submits it.
    ///
    /// The draft is cleared on success and kept on failure.
    pub async fn submit(&mut self, gateway: &dyn PasswordGateway) -> SaveOutcome {
        if let ValidationResult::Invalid { rule, reason } = self.validate() {
            return self.fail(FormError::rejected(rule, reason));
        }

        let request = PasswordChangeRequest {
            old_password: self.draft.old_password.clone(),
            new_password: self.draft.new_password.clone(),
        };
        match gateway.change_password(request).await {
            Ok(()) => {
                tracing::info!("Password changed");
                self.draft = PasswordChange::default();
                self.last_failure = None;
                SaveOutcome::Saved
            }
            Err(err) => {
                tracing::warn!("Password change failed: {}", err);
                self.fail(err)
            }
        }
    }

    fn fail(&mut self, err: FormError) -> SaveOutcome {
        let failure = SaveFailure::from_error(&err, &self.config);
        self.last_failure = Some(failure.clone());
        SaveOutcome::Failed(failure)
    }
}
