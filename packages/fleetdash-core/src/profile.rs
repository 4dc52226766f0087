//! User profile record: field set, local rules and wire types.

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::field::{FieldKind, FieldSpec};
use crate::record::{EditableRecord, FieldSet};
use crate::validation::{required_text, RuleSet};

pub const FIRST_NAME: &str = "firstName";
pub const LAST_NAME: &str = "lastName";
pub const EMAIL: &str = "email";
pub const PHONE: &str = "phone";
pub const AVATAR: &str = "avatar";
pub const DISPLAY_NAME: &str = "displayName";

/// Returns the field set of the profile page.
///
/// `email` and `displayName` are owned by the server.
pub fn profile_field_set() -> Result<FieldSet> {
    FieldSet::new(vec![
        FieldSpec::new(FIRST_NAME, FieldKind::Text),
        FieldSpec::new(LAST_NAME, FieldKind::Text),
        FieldSpec::new(EMAIL, FieldKind::Text).read_only(),
        FieldSpec::new(PHONE, FieldKind::OptionalText),
        FieldSpec::new(AVATAR, FieldKind::FileRef),
        FieldSpec::new(DISPLAY_NAME, FieldKind::OptionalText).read_only(),
    ])
}

/// Rules checked before a profile save is dispatched.
pub fn profile_rules() -> RuleSet<EditableRecord> {
    RuleSet::new()
        .rule("first_name_required", required_text(FIRST_NAME, "first name"))
        .rule("last_name_required", required_text(LAST_NAME, "last name"))
}

/// Display name derived from first and last name.
pub fn display_name(first: &str, last: &str) -> String {
    format!("{} {}", first.trim(), last.trim()).trim().to_string()
}

/// Body of a password change request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PasswordChangeRequest {
    pub old_password: String,
    pub new_password: String,
}

/// Body of a sign-in request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}
