//! In-memory demo backend holding one user profile.
//!
//! Plays the server side of the mutation collaborator: it re-validates
//! writes, normalizes values and returns the canonical record.

use std::collections::HashSet;

use fleetdash_core::profile::{
    self, Credentials, PasswordChangeRequest, AVATAR, DISPLAY_NAME, EMAIL, FIRST_NAME, LAST_NAME,
    PHONE,
};
use fleetdash_core::{
    EditableRecord, FieldSet, FieldValue, FileRef, FormError, PartialRecord, PasswordPolicy,
    Result,
};
use parking_lot::Mutex;

/// Email of the seeded demo user.
pub const DEMO_EMAIL: &str = "alex.morgan@fleetdash.io";
/// Password of the seeded demo user.
pub const DEMO_PASSWORD: &str = "Fleet@2024";

#[derive(Debug)]
struct StoreState {
    profile: EditableRecord,
    password: String,
    tokens: HashSet<String>,
    next_file_id: u64,
    next_token_id: u64,
}

/// Server-side profile state.
#[derive(Debug)]
pub struct ProfileStore {
    field_set: FieldSet,
    policy: PasswordPolicy,
    state: Mutex<StoreState>,
}

impl ProfileStore {
    /// Creates a store holding `profile`.
    ///
    /// # Arguments
    /// * `field_set` - Field set the profile conforms to
    /// * `profile` - Initial profile record
    /// * `password` - Initial password
    /// * `policy` - Policy re-applied to password changes
    ///
    /// # Returns
    /// `Result<ProfileStore, FormError>`; fails when the profile does not match the field set.
    pub fn new(
        field_set: FieldSet,
        profile: EditableRecord,
        password: impl Into<String>,
        policy: PasswordPolicy,
    ) -> Result<Self> {
        field_set.check_record(&profile)?;
        Ok(Self {
            field_set,
            policy,
            state: Mutex::new(StoreState {
                profile,
                password: password.into(),
                tokens: HashSet::new(),
                next_file_id: 1,
                next_token_id: 1,
            }),
        })
    }

    /// Creates a store seeded with the demo profile.
    pub fn demo(policy: PasswordPolicy) -> Result<Self> {
        let field_set = profile::profile_field_set()?;
        let profile = field_set.hydrate(&serde_json::json!({
            FIRST_NAME: "Alex",
            LAST_NAME: "Morgan",
            EMAIL: DEMO_EMAIL,
            PHONE: "+1 555 0100",
            AVATAR: "avatars/0-alex.png",
            DISPLAY_NAME: "Alex Morgan",
        }))?;
        Self::new(field_set, profile, DEMO_PASSWORD, policy)
    }

    pub fn field_set(&self) -> &FieldSet {
        &self.field_set
    }

    /// Returns a copy of the stored profile.
    pub fn profile(&self) -> EditableRecord {
        self.state.lock().profile.clone()
    }

    /// Applies a partial update and returns the canonical record.
    ///
    /// The update is all-or-nothing: any rejected field leaves the
    /// stored profile untouched.
    pub fn apply_update(&self, partial: &PartialRecord) -> Result<EditableRecord> {
        let mut state = self.state.lock();
        let mut updated = state.profile.clone();
        let mut next_file_id = state.next_file_id;

        for (name, value) in partial.iter() {
            let spec = self.field_set.spec(name)?;
            if spec.read_only {
                return Err(FormError::ReadOnlyField {
                    field: name.to_string(),
                });
            }
            if value.kind() != spec.kind {
                return Err(FormError::TypeMismatch {
                    field: name.to_string(),
                    expected: spec.kind.name().to_string(),
                    got: value.kind().name().to_string(),
                });
            }
            let normalized = normalize(name, value, &mut next_file_id)?;
            updated.set(name, normalized);
        }

        if self.field_set.get(DISPLAY_NAME).is_some() {
            let text = |name: &str| {
                updated
                    .get(name)
                    .and_then(|v| v.as_text())
                    .unwrap_or_default()
                    .to_string()
            };
            let display = profile::display_name(&text(FIRST_NAME), &text(LAST_NAME));
            updated.set(DISPLAY_NAME, FieldValue::OptionalText(Some(display)));
        }

        state.profile = updated.clone();
        state.next_file_id = next_file_id;
        tracing::info!("Profile updated ({} fields)", partial.len());
        Ok(updated)
    }

    /// Changes the password after checking the current one.
    pub fn change_password(&self, request: &PasswordChangeRequest) -> Result<()> {
        let mut state = self.state.lock();
        if request.old_password != state.password {
            return Err(FormError::ServerRejected(
                "current password is incorrect".to_string(),
            ));
        }
        if request.new_password == state.password {
            return Err(FormError::ServerRejected(
                "new password must differ from the current password".to_string(),
            ));
        }
        self.policy
            .check_password(&request.new_password)
            .into_result()
            .map_err(|e| FormError::ServerRejected(e.to_string()))?;

        state.password = request.new_password.clone();
        tracing::info!("Password changed");
        Ok(())
    }

    /// Issues a session token for valid credentials.
    pub fn sign_in(&self, credentials: &Credentials) -> Result<String> {
        let mut state = self.state.lock();
        let email_matches = state
            .profile
            .get(EMAIL)
            .and_then(|v| v.as_text())
            .is_some_and(|email| email.eq_ignore_ascii_case(credentials.email.trim()));
        if !email_matches || credentials.password != state.password {
            tracing::warn!("Rejected sign-in for {}", credentials.email);
            return Err(FormError::Unauthorized(
                "invalid email or password".to_string(),
            ));
        }

        let token = format!("session-{}", state.next_token_id);
        state.next_token_id += 1;
        state.tokens.insert(token.clone());
        Ok(token)
    }

    pub fn verify_token(&self, token: &str) -> bool {
        self.state.lock().tokens.contains(token)
    }

    /// Invalidates a session token.
    pub fn sign_out(&self, token: &str) -> bool {
        self.state.lock().tokens.remove(token)
    }
}

/// Server-side normalization of one submitted value.
fn normalize(name: &str, value: &FieldValue, next_file_id: &mut u64) -> Result<FieldValue> {
    match value {
        FieldValue::Text(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                return Err(FormError::ServerRejected(format!(
                    "{} must not be empty",
                    name
                )));
            }
            Ok(FieldValue::Text(trimmed.to_string()))
        }
        FieldValue::OptionalText(s) => Ok(FieldValue::OptionalText(
            s.as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string),
        )),
        FieldValue::File(Some(FileRef::Pending(file))) => {
            if !file.content_type.starts_with("image/") {
                return Err(FormError::ServerRejected(format!(
                    "{} must be an image",
                    name
                )));
            }
            let id = format!("avatars/{}-{}", next_file_id, file.file_name);
            *next_file_id += 1;
            Ok(FieldValue::File(Some(FileRef::Stored(id))))
        }
        FieldValue::File(other) => Ok(FieldValue::File(other.clone())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fleetdash_core::PendingFile;
    use ntest::timeout;

    fn create_test_store() -> ProfileStore {
        ProfileStore::demo(PasswordPolicy::default()).unwrap()
    }

    fn partial(values: Vec<(&str, FieldValue)>) -> PartialRecord {
        let mut partial = PartialRecord::default();
        for (name, value) in values {
            partial.insert(name.to_string(), value);
        }
        partial
    }

    #[timeout(1000)]
    #[test]
    fn test_update_normalizes_and_recomputes_display_name() {
        let store = create_test_store();
        let updated = store
            .apply_update(&partial(vec![
                (FIRST_NAME, FieldValue::from("  Sam ")),
                (PHONE, FieldValue::OptionalText(Some("   ".to_string()))),
            ]))
            .unwrap();

        assert_eq!(updated.get(FIRST_NAME), Some(&FieldValue::from("Sam")));
        assert_eq!(updated.get(PHONE), Some(&FieldValue::OptionalText(None)));
        assert_eq!(
            updated.get(DISPLAY_NAME),
            Some(&FieldValue::OptionalText(Some("Sam Morgan".to_string())))
        );
        assert_eq!(store.profile(), updated);
    }

    #[timeout(1000)]
    #[test]
    fn test_pending_avatar_becomes_stored() {
        let store = create_test_store();
        let pending = FieldValue::File(Some(FileRef::Pending(PendingFile {
            file_name: "me.png".to_string(),
            content_type: "image/png".to_string(),
            size: 10,
        })));

        let first = store.apply_update(&partial(vec![(AVATAR, pending.clone())])).unwrap();
        let second = store.apply_update(&partial(vec![(AVATAR, pending)])).unwrap();

        assert_eq!(
            first.get(AVATAR),
            Some(&FieldValue::File(Some(FileRef::Stored("avatars/1-me.png".to_string()))))
        );
        assert_eq!(
            second.get(AVATAR),
            Some(&FieldValue::File(Some(FileRef::Stored("avatars/2-me.png".to_string()))))
        );
    }

    #[timeout(1000)]
    #[test]
    fn test_rejected_update_is_atomic() {
        let store = create_test_store();
        let before = store.profile();

        let result = store.apply_update(&partial(vec![
            (FIRST_NAME, FieldValue::from("Sam")),
            (LAST_NAME, FieldValue::from("  ")),
        ]));
        assert_eq!(
            result,
            Err(FormError::ServerRejected("lastName must not be empty".to_string()))
        );
        assert_eq!(store.profile(), before);

        let result = store.apply_update(&partial(vec![(EMAIL, FieldValue::from("x@y.z"))]));
        assert!(matches!(result, Err(FormError::ReadOnlyField { .. })));
    }

    #[timeout(1000)]
    #[test]
    fn test_change_password() {
        let store = create_test_store();

        let wrong_old = PasswordChangeRequest {
            old_password: "nope".to_string(),
            new_password: "Abcdef1!".to_string(),
        };
        assert_eq!(
            store.change_password(&wrong_old),
            Err(FormError::ServerRejected(
                "current password is incorrect".to_string()
            ))
        );

        let weak = PasswordChangeRequest {
            old_password: DEMO_PASSWORD.to_string(),
            new_password: "abc".to_string(),
        };
        assert!(matches!(
            store.change_password(&weak),
            Err(FormError::ServerRejected(_))
        ));

        let ok = PasswordChangeRequest {
            old_password: DEMO_PASSWORD.to_string(),
            new_password: "Abcdef1!".to_string(),
        };
        store.change_password(&ok).unwrap();

        let credentials = Credentials {
            email: DEMO_EMAIL.to_string(),
            password: "Abcdef1!".to_string(),
        };
        assert!(store.sign_in(&credentials).is_ok());
    }

    #[timeout(1000)]
    #[test]
    fn test_sign_in_and_tokens() {
        let store = create_test_store();
        let credentials = Credentials {
            email: "ALEX.MORGAN@fleetdash.io".to_string(),
            password: DEMO_PASSWORD.to_string(),
        };

        let token = store.sign_in(&credentials).unwrap();
        assert!(store.verify_token(&token));
        assert!(!store.verify_token("session-999"));

        assert!(store.sign_out(&token));
        assert!(!store.verify_token(&token));

        let bad = Credentials {
            email: DEMO_EMAIL.to_string(),
            password: "wrong".to_string(),
        };
        assert!(matches!(store.sign_in(&bad), Err(FormError::Unauthorized(_))));
    }
}
