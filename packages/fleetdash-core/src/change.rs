//! Snapshot-based change tracking.
//!
//! The change set is always recomputed from the current record and its
//! baseline. Nothing is tracked incrementally, so the result cannot drift
//! from the true difference.

use std::collections::{BTreeSet, HashMap};

use crate::error::{FormError, Result};
use crate::field::FieldEquality;
use crate::record::{EditableRecord, FieldSet};

/// Names of the fields whose current value differs from the baseline.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ChangeSet {
    fields: BTreeSet<String>,
}

impl ChangeSet {
    pub fn contains(&self, field: &str) -> bool {
        self.fields.contains(field)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Iterates changed field names in sorted order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(String::as_str)
    }
}

/// Computes the change set between a record and its baseline.
///
/// Both records must hold the same field names. Fields without an entry in
/// `equalities` use structural equality.
///
/// # Arguments
/// * `current` - Record as edited
/// * `baseline` - Last confirmed record
/// * `equalities` - Per-field equality predicates
///
/// # Returns
/// `Result<ChangeSet, FormError>` containing the differing field names.
pub fn compute_changes(
    current: &EditableRecord,
    baseline: &EditableRecord,
    equalities: &HashMap<String, FieldEquality>,
) -> Result<ChangeSet> {
    if let Some(extra) = baseline
        .field_names()
        .find(|name| current.get(name).is_none())
    {
        return Err(FormError::FieldSetMismatch {
            field: extra.to_string(),
        });
    }

    let structural = FieldEquality::Structural;
    let mut fields = BTreeSet::new();
    for (name, value) in current.iter() {
        let base = baseline
            .get(name)
            .ok_or_else(|| FormError::FieldSetMismatch {
                field: name.to_string(),
            })?;
        let equality = equalities.get(name).unwrap_or(&structural);
        if !equality.equal(value, base) {
            fields.insert(name.to_string());
        }
    }

    Ok(ChangeSet { fields })
}

/// Change computation bound to the equalities of one field set.
#[derive(Debug, Clone, Default)]
pub struct ChangeTracker {
    equalities: HashMap<String, FieldEquality>,
}

impl ChangeTracker {
    /// Creates a tracker using each field's declared equality.
    pub fn for_field_set(field_set: &FieldSet) -> Self {
        Self {
            equalities: field_set
                .fields()
                .iter()
                .map(|f| (f.name.clone(), f.equality.clone()))
                .collect(),
        }
    }

    /// Computes the change set of `current` against `baseline`.
    pub fn compute(&self, current: &EditableRecord, baseline: &EditableRecord) -> Result<ChangeSet> {
        compute_changes(current, baseline, &self.equalities)
    }
}
