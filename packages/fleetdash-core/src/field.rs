//! Field kinds, values and per-field equality.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::error::{FormError, Result};

/// Declared kind of an editable field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    /// Required string
    Text,
    /// String that may be absent
    OptionalText,
    /// Opaque file reference that may be absent
    FileRef,
}

impl FieldKind {
    /// Returns the kind name used in error messages.
    pub fn name(&self) -> &'static str {
        match self {
            FieldKind::Text => "text",
            FieldKind::OptionalText => "optional text",
            FieldKind::FileRef => "file reference",
        }
    }

    /// Decodes a JSON value into a field value of this kind.
    ///
    /// # Arguments
    /// * `field` - Field name, used in errors
    /// * `value` - JSON value from a fetched record or a partial update
    ///
    /// # Returns
    /// `Result<FieldValue, FormError>` containing the decoded value.
    pub fn decode(&self, field: &str, value: &Value) -> Result<FieldValue> {
        let mismatch = || FormError::TypeMismatch {
            field: field.to_string(),
            expected: self.name().to_string(),
            got: json_type(value).to_string(),
        };

        match (self, value) {
            (FieldKind::Text, Value::String(s)) => Ok(FieldValue::Text(s.clone())),
            (FieldKind::OptionalText, Value::Null) => Ok(FieldValue::OptionalText(None)),
            (FieldKind::OptionalText, Value::String(s)) => {
                Ok(FieldValue::OptionalText(Some(s.clone())))
            }
            (FieldKind::FileRef, Value::Null) => Ok(FieldValue::File(None)),
            (FieldKind::FileRef, Value::String(id)) => {
                Ok(FieldValue::File(Some(FileRef::Stored(id.clone()))))
            }
            (FieldKind::FileRef, Value::Object(_)) => {
                let pending: PendingFile =
                    serde_json::from_value(value.clone()).map_err(|_| mismatch())?;
                Ok(FieldValue::File(Some(FileRef::Pending(pending))))
            }
            _ => Err(mismatch()),
        }
    }

    /// Returns the empty value for kinds that allow absence.
    pub fn empty_value(&self) -> Option<FieldValue> {
        match self {
            FieldKind::Text => None,
            FieldKind::OptionalText => Some(FieldValue::OptionalText(None)),
            FieldKind::FileRef => Some(FieldValue::File(None)),
        }
    }
}

/// Returns a string representation of a JSON value's type.
fn json_type(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// A file selected for upload but not yet stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingFile {
    /// Original file name
    pub file_name: String,
    /// MIME type reported by the picker
    pub content_type: String,
    /// Size in bytes
    pub size: u64,
}

/// Reference to a file held by a file-reference field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileRef {
    /// Identifier of a file already stored server-side
    Stored(String),
    /// Replacement waiting to be submitted
    Pending(PendingFile),
}

/// Current value of a single field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    Text(String),
    OptionalText(Option<String>),
    File(Option<FileRef>),
}

impl FieldValue {
    /// Returns the kind this value belongs to.
    pub fn kind(&self) -> FieldKind {
        match self {
            FieldValue::Text(_) => FieldKind::Text,
            FieldValue::OptionalText(_) => FieldKind::OptionalText,
            FieldValue::File(_) => FieldKind::FileRef,
        }
    }

    /// Returns the textual content, if any.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(s) => Some(s),
            FieldValue::OptionalText(s) => s.as_deref(),
            FieldValue::File(_) => None,
        }
    }

    /// Returns the file reference, if this is a non-empty file field.
    pub fn as_file(&self) -> Option<&FileRef> {
        match self {
            FieldValue::File(f) => f.as_ref(),
            _ => None,
        }
    }

    /// Returns whether this value holds a pending file replacement.
    pub fn has_pending_file(&self) -> bool {
        matches!(self, FieldValue::File(Some(FileRef::Pending(_))))
    }

    /// Encodes the value for the wire.
    pub fn to_json(&self) -> Value {
        match self {
            FieldValue::Text(s) => Value::String(s.clone()),
            FieldValue::OptionalText(s) => s.clone().map_or(Value::Null, Value::String),
            FieldValue::File(Some(FileRef::Stored(id))) => Value::String(id.clone()),
            FieldValue::File(Some(FileRef::Pending(p))) => json!({
                "fileName": p.file_name,
                "contentType": p.content_type,
                "size": p.size,
            }),
            FieldValue::File(None) => Value::Null,
        }
    }
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        FieldValue::Text(s.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(s: String) -> Self {
        FieldValue::Text(s)
    }
}

/// Equality predicate deciding whether a field differs from its baseline.
#[derive(Clone, Default)]
pub enum FieldEquality {
    /// Plain structural equality
    #[default]
    Structural,
    /// File fields: a pending replacement always counts as a change,
    /// otherwise only presence is compared. Contents are never inspected.
    FilePresence,
    /// Caller-supplied predicate
    Custom(Arc<dyn Fn(&FieldValue, &FieldValue) -> bool + Send + Sync>),
}

impl FieldEquality {
    /// Returns the default equality for a field kind.
    pub fn default_for(kind: FieldKind) -> Self {
        match kind {
            FieldKind::FileRef => FieldEquality::FilePresence,
            _ => FieldEquality::Structural,
        }
    }

    /// Wraps a custom predicate.
    pub fn custom<F>(f: F) -> Self
    where
        F: Fn(&FieldValue, &FieldValue) -> bool + Send + Sync + 'static,
    {
        FieldEquality::Custom(Arc::new(f))
    }

    /// Returns whether `current` is considered equal to `baseline`.
    pub fn equal(&self, current: &FieldValue, baseline: &FieldValue) -> bool {
        match self {
            FieldEquality::Structural => current == baseline,
            FieldEquality::FilePresence => {
                if current.has_pending_file() {
                    return false;
                }
                current.as_file().is_some() == baseline.as_file().is_some()
            }
            FieldEquality::Custom(f) => f(current, baseline),
        }
    }
}

impl fmt::Debug for FieldEquality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldEquality::Structural => write!(f, "Structural"),
            FieldEquality::FilePresence => write!(f, "FilePresence"),
            FieldEquality::Custom(_) => write!(f, "Custom(..)"),
        }
    }
}

/// Field definition within a field set.
#[derive(Debug, Clone)]
pub struct FieldSpec {
    /// Field name
    pub name: String,
    /// Declared kind
    pub kind: FieldKind,
    /// Equality used by change tracking
    pub equality: FieldEquality,
    /// Server-owned field, never edited or submitted
    pub read_only: bool,
}

impl FieldSpec {
    /// Creates an editable field with the default equality for its kind.
    pub fn new(name: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            name: name.into(),
            kind,
            equality: FieldEquality::default_for(kind),
            read_only: false,
        }
    }

    /// Replaces the equality predicate.
    pub fn with_equality(mut self, equality: FieldEquality) -> Self {
        self.equality = equality;
        self
    }

    /// Marks the field read-only.
    pub fn read_only(mut self) -> Self {
        self.read_only = true;
        self
    }
}

/// Turns a stored file identifier into a displayable URL.
pub trait FileResolver {
    fn resolve(&self, id: &str) -> String;
}

/// Resolves identifiers relative to a base URL.
#[derive(Debug, Clone)]
pub struct BaseUrlResolver {
    base: String,
}

impl BaseUrlResolver {
    pub fn new(base: impl Into<String>) -> Self {
        Self { base: base.into() }
    }
}

impl FileResolver for BaseUrlResolver {
    fn resolve(&self, id: &str) -> String {
        if id.starts_with("http://") || id.starts_with("https://") {
            return id.to_string();
        }
        format!(
            "{}/{}",
            self.base.trim_end_matches('/'),
            id.trim_start_matches('/')
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ntest::timeout;

    fn pending(name: &str) -> FieldValue {
        FieldValue::File(Some(FileRef::Pending(PendingFile {
            file_name: name.to_string(),
            content_type: "image/png".to_string(),
            size: 42,
        })))
    }

    #[timeout(1000)]
    #[test]
    fn test_decode_text_kinds() {
        let v = FieldKind::Text.decode("firstName", &json!("John")).unwrap();
        assert_eq!(v, FieldValue::Text("John".to_string()));

        let v = FieldKind::OptionalText.decode("phone", &Value::Null).unwrap();
        assert_eq!(v, FieldValue::OptionalText(None));

        let err = FieldKind::Text.decode("firstName", &json!(12)).unwrap_err();
        assert_eq!(
            err,
            FormError::TypeMismatch {
                field: "firstName".to_string(),
                expected: "text".to_string(),
                got: "number".to_string(),
            }
        );
    }

    #[timeout(1000)]
    #[test]
    fn test_decode_file_kinds() {
        let stored = FieldKind::FileRef
            .decode("avatar", &json!("avatars/1.png"))
            .unwrap();
        assert_eq!(
            stored,
            FieldValue::File(Some(FileRef::Stored("avatars/1.png".to_string())))
        );

        let p = FieldKind::FileRef
            .decode(
                "avatar",
                &json!({"fileName": "me.png", "contentType": "image/png", "size": 42}),
            )
            .unwrap();
        assert_eq!(p, pending("me.png"));
        assert_eq!(
            p.to_json(),
            json!({"fileName": "me.png", "contentType": "image/png", "size": 42})
        );

        let err = FieldKind::FileRef
            .decode("avatar", &json!({"size": "big"}))
            .unwrap_err();
        assert!(matches!(err, FormError::TypeMismatch { .. }));
    }

    #[timeout(1000)]
    #[test]
    fn test_to_json() {
        assert_eq!(FieldValue::OptionalText(None).to_json(), Value::Null);
        assert_eq!(
            FieldValue::OptionalText(Some("555".to_string())).to_json(),
            json!("555")
        );
        assert_eq!(
            FieldValue::File(Some(FileRef::Stored("a.png".to_string()))).to_json(),
            json!("a.png")
        );
        assert_eq!(FieldValue::File(None).to_json(), Value::Null);
    }

    #[timeout(1000)]
    #[test]
    fn test_file_presence_equality() {
        let eq = FieldEquality::default_for(FieldKind::FileRef);
        let stored = FieldValue::File(Some(FileRef::Stored("a.png".to_string())));
        let none = FieldValue::File(None);

        assert!(eq.equal(&none, &none));
        assert!(eq.equal(&stored, &stored));
        assert!(!eq.equal(&none, &stored));
        // a pending replacement is a change even against an identical pending baseline
        assert!(!eq.equal(&pending("a.png"), &pending("a.png")));
        assert!(!eq.equal(&pending("a.png"), &none));
    }

    #[timeout(1000)]
    #[test]
    fn test_custom_equality() {
        let eq = FieldEquality::custom(|a, b| {
            a.as_text().map(str::trim) == b.as_text().map(str::trim)
        });
        assert!(eq.equal(&FieldValue::from(" Jo "), &FieldValue::from("Jo")));
        assert!(!eq.equal(&FieldValue::from("Jo"), &FieldValue::from("John")));
        assert_eq!(format!("{:?}", eq), "Custom(..)");
    }

    #[timeout(1000)]
    #[test]
    fn test_base_url_resolver() {
        let resolver = BaseUrlResolver::new("http://localhost:8080/files/");
        assert_eq!(
            resolver.resolve("avatars/1-me.png"),
            "http://localhost:8080/files/avatars/1-me.png"
        );
        assert_eq!(
            resolver.resolve("https://cdn.example.com/x.png"),
            "https://cdn.example.com/x.png"
        );
    }
}
