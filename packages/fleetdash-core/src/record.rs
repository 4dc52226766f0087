//! Field sets, editable records, snapshots and partial updates.

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use serde_json::{Map, Value};

use crate::error::{FormError, Result};
use crate::field::{FieldSpec, FieldValue, FileRef, FileResolver};

/// Ordered set of field definitions describing one kind of record.
#[derive(Debug, Clone)]
pub struct FieldSet {
    fields: Vec<FieldSpec>,
}

impl FieldSet {
    /// Creates a field set, rejecting duplicate names.
    ///
    /// # Arguments
    /// * `fields` - Field definitions in display order
    ///
    /// # Returns
    /// `Result<FieldSet, FormError>` containing the validated field set.
    pub fn new(fields: Vec<FieldSpec>) -> Result<Self> {
        let mut seen = HashSet::new();
        for field in &fields {
            if !seen.insert(field.name.as_str()) {
                return Err(FormError::DuplicateField {
                    field: field.name.clone(),
                });
            }
        }
        Ok(Self { fields })
    }

    /// Returns the field definitions in declaration order.
    pub fn fields(&self) -> &[FieldSpec] {
        &self.fields
    }

    /// Looks up a field definition by name.
    pub fn get(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Looks up a field definition, failing for unknown names.
    pub fn spec(&self, name: &str) -> Result<&FieldSpec> {
        self.get(name).ok_or_else(|| FormError::UnknownField {
            field: name.to_string(),
        })
    }

    /// Returns the names of fields that may be edited and submitted.
    pub fn editable_names(&self) -> impl Iterator<Item = &str> {
        self.fields
            .iter()
            .filter(|f| !f.read_only)
            .map(|f| f.name.as_str())
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Builds an editable record from a fetched flat JSON object.
    ///
    /// Missing optional and file fields default to empty; missing text
    /// fields are an error. Keys outside the field set are ignored.
    pub fn hydrate(&self, raw: &Value) -> Result<EditableRecord> {
        let obj = as_object(raw)?;

        let mut values = BTreeMap::new();
        for spec in &self.fields {
            let value = match obj.get(&spec.name) {
                Some(v) => spec.kind.decode(&spec.name, v)?,
                None => spec
                    .kind
                    .empty_value()
                    .ok_or_else(|| FormError::MissingField {
                        field: spec.name.clone(),
                    })?,
            };
            values.insert(spec.name.clone(), value);
        }

        let ignored = obj.keys().filter(|k| self.get(k).is_none()).count();
        if ignored > 0 {
            tracing::debug!("Ignored {} unknown keys while hydrating record", ignored);
        }

        Ok(EditableRecord { values })
    }

    /// Decodes a partial-update payload.
    ///
    /// Every key must name an editable field of this set.
    pub fn decode_partial(&self, raw: &Value) -> Result<PartialRecord> {
        let obj = as_object(raw)?;

        let mut partial = PartialRecord::default();
        for (key, value) in obj {
            let spec = self.spec(key)?;
            if spec.read_only {
                return Err(FormError::ReadOnlyField { field: key.clone() });
            }
            partial.insert(key.clone(), spec.kind.decode(key, value)?);
        }
        Ok(partial)
    }

    /// Checks that a record holds exactly the fields of this set with matching kinds.
    pub fn check_record(&self, record: &EditableRecord) -> Result<()> {
        if let Some(extra) = record.field_names().find(|name| self.get(name).is_none()) {
            return Err(FormError::FieldSetMismatch {
                field: extra.to_string(),
            });
        }
        for spec in &self.fields {
            let value = record
                .get(&spec.name)
                .ok_or_else(|| FormError::FieldSetMismatch {
                    field: spec.name.clone(),
                })?;
            if value.kind() != spec.kind {
                return Err(FormError::TypeMismatch {
                    field: spec.name.clone(),
                    expected: spec.kind.name().to_string(),
                    got: value.kind().name().to_string(),
                });
            }
        }
        Ok(())
    }
}

fn as_object(raw: &Value) -> Result<&Map<String, Value>> {
    raw.as_object().ok_or_else(|| FormError::TypeMismatch {
        field: "<record>".to_string(),
        expected: "object".to_string(),
        got: match raw {
            Value::Array(_) => "array",
            Value::String(_) => "string",
            Value::Null => "null",
            _ => "scalar",
        }
        .to_string(),
    })
}

/// Mapping from field name to current value.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct EditableRecord {
    values: BTreeMap<String, FieldValue>,
}

impl EditableRecord {
    /// Creates a record from name/value pairs.
    pub fn from_values<I, K>(values: I) -> Self
    where
        I: IntoIterator<Item = (K, FieldValue)>,
        K: Into<String>,
    {
        Self {
            values: values.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }

    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.values.get(name)
    }

    /// Replaces the value of a field, returning the previous one.
    pub fn set(&mut self, name: impl Into<String>, value: FieldValue) -> Option<FieldValue> {
        self.values.insert(name.into(), value)
    }

    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Copies the named fields into a partial update.
    ///
    /// Names absent from this record are skipped.
    pub fn partial<'a, I>(&self, names: I) -> PartialRecord
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut partial = PartialRecord::default();
        for name in names {
            if let Some(value) = self.values.get(name) {
                partial.insert(name.to_string(), value.clone());
            }
        }
        partial
    }

    /// Applies a partial update in place.
    pub fn apply(&mut self, partial: &PartialRecord) {
        for (name, value) in partial.iter() {
            self.values.insert(name.to_string(), value.clone());
        }
    }

    /// Returns a displayable URL for a stored file field.
    pub fn file_url(&self, name: &str, resolver: &dyn FileResolver) -> Option<String> {
        match self.values.get(name)?.as_file()? {
            FileRef::Stored(id) => Some(resolver.resolve(id)),
            FileRef::Pending(_) => None,
        }
    }

    /// Encodes the record as a flat JSON object.
    pub fn to_json(&self) -> Value {
        Value::Object(
            self.values
                .iter()
                .map(|(k, v)| (k.clone(), v.to_json()))
                .collect(),
        )
    }
}

/// Immutable copy of a record taken at load time or after a confirmed save.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    record: Arc<EditableRecord>,
    version: u64,
}

impl Snapshot {
    /// Captures the initial snapshot of a record.
    pub fn capture(record: EditableRecord) -> Self {
        Self {
            record: Arc::new(record),
            version: 0,
        }
    }

    /// Returns the snapshot replacing this one with a newly confirmed record.
    pub fn advance(&self, record: EditableRecord) -> Self {
        Self {
            record: Arc::new(record),
            version: self.version + 1,
        }
    }

    pub fn record(&self) -> &EditableRecord {
        &self.record
    }

    /// Number of confirmed saves since the record was loaded.
    pub fn version(&self) -> u64 {
        self.version
    }
}

/// Subset of a record's fields submitted in one mutation.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PartialRecord {
    values: BTreeMap<String, FieldValue>,
}

impl PartialRecord {
    pub fn insert(&mut self, name: String, value: FieldValue) {
        self.values.insert(name, value);
    }

    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.values.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Encodes the partial update as a JSON object.
    pub fn to_json(&self) -> Value {
        Value::Object(
            self.values
                .iter()
                .map(|(k, v)| (k.clone(), v.to_json()))
                .collect(),
        )
    }
}
