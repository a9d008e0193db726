use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::error::{check_length, check_max_length, ValidationError};

pub const NAME_MAX_LEN: usize = 128;
pub const DESCRIPTION_MAX_LEN: usize = 1024;

/// A family tree. Every other genealogy record hangs off one of these.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tree {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub is_active: bool,
}

/// Validated fields for creating a tree.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewTree {
    name: String,
    description: Option<String>,
}

impl NewTree {
    pub fn new(
        name: impl Into<String>,
        description: Option<String>,
    ) -> Result<Self, ValidationError> {
        let name = name.into();
        validate_name(&name)?;
        check_max_length("description", description.as_deref(), DESCRIPTION_MAX_LEN)?;
        Ok(Self { name, description })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }
}

/// Partial update for a tree. `description: Some(None)` clears the column.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TreeChanges {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,
}

impl TreeChanges {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if let Some(name) = &self.name {
            validate_name(name)?;
        }
        if let Some(description) = &self.description {
            check_max_length("description", description.as_deref(), DESCRIPTION_MAX_LEN)?;
        }
        Ok(())
    }
}

fn validate_name(name: &str) -> Result<(), ValidationError> {
    check_length("name", name, 1, NAME_MAX_LEN)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_name_at_both_bounds() {
        assert!(NewTree::new("A", None).is_ok());
        assert!(NewTree::new("x".repeat(NAME_MAX_LEN), None).is_ok());
    }

    #[test]
    fn rejects_empty_or_oversized_name() {
        assert!(matches!(
            NewTree::new("", None),
            Err(ValidationError::InvalidField { field: "name", .. })
        ));
        assert!(NewTree::new("x".repeat(NAME_MAX_LEN + 1), None).is_err());
    }

    #[test]
    fn rejects_oversized_description() {
        let err = NewTree::new("Romanov", Some("d".repeat(DESCRIPTION_MAX_LEN + 1))).unwrap_err();
        assert!(matches!(err, ValidationError::InvalidField { field: "description", .. }));
    }

    #[test]
    fn changes_serialize_only_present_fields() {
        let changes = TreeChanges {
            description: Some(None),
            ..Default::default()
        };
        let value = serde_json::to_value(&changes).unwrap();
        assert_eq!(value, serde_json::json!({ "description": null }));
        assert!(changes.validate().is_ok());

        let bad = TreeChanges {
            name: Some(String::new()),
            ..Default::default()
        };
        assert!(bad.validate().is_err());
    }
}
