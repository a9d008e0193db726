use serde::Serialize;
use serde_json::Value;

use crate::database::schema::{TableSchema, PROTECTED_COLUMNS};
use crate::database::store::Row;
use crate::domain::ValidationError;
use crate::filter::FilterError;

/// Presence-aware field changes for `update`.
///
/// Only fields that were set are written. An explicit `null` clears a
/// nullable column; an absent field leaves the column untouched. A value
/// that cannot be encoded makes `restrict` fail.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Patch {
    fields: Row,
    rejected: Option<FilterError>,
}

impl Patch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a patch from a typed change set. Fields serialized as absent are
    /// left out; fields serialized as `null` clear the column.
    pub fn from_changes<T: Serialize>(changes: &T) -> Result<Self, ValidationError> {
        match serde_json::to_value(changes) {
            Ok(Value::Object(fields)) => Ok(Self::from(fields)),
            Ok(other) => Err(ValidationError::field(
                "changes",
                format!("expected an object of fields, got {}", other),
            )),
            Err(e) => Err(ValidationError::field("changes", e.to_string())),
        }
    }

    pub fn set(mut self, field: impl Into<String>, value: impl Serialize) -> Self {
        let field = field.into();
        match serde_json::to_value(value) {
            Ok(v) => {
                self.fields.insert(field, v);
            }
            Err(e) => {
                if self.rejected.is_none() {
                    self.rejected = Some(FilterError::InvalidValue {
                        column: field,
                        message: e.to_string(),
                    });
                }
            }
        }
        self
    }

    pub fn clear(mut self, field: impl Into<String>) -> Self {
        self.fields.insert(field.into(), Value::Null);
        self
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    pub fn contains(&self, field: &str) -> bool {
        self.fields.contains_key(field)
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Keep only the fields the table declares mutable.
    pub fn restrict(&self, schema: &TableSchema) -> Result<Row, FilterError> {
        if let Some(rejected) = &self.rejected {
            return Err(rejected.clone());
        }

        let mut kept = Row::new();
        for (field, value) in &self.fields {
            if schema.is_mutable(field) {
                kept.insert(field.clone(), value.clone());
            } else if PROTECTED_COLUMNS.contains(&field.as_str()) || schema.is_key(field) {
                tracing::warn!(
                    "Ignoring attempt to set protected field '{}' on {}",
                    field,
                    schema.entity
                );
            } else {
                tracing::debug!("Ignoring non-mutable field '{}' on {}", field, schema.entity);
            }
        }
        Ok(kept)
    }
}

impl From<Row> for Patch {
    fn from(fields: Row) -> Self {
        Self { fields, rejected: None }
    }
}
