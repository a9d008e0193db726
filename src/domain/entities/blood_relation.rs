use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::error::ValidationError;

/// Parent to child link between two individuals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BloodRelation {
    pub parent_id: Uuid,
    pub child_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub is_active: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewBloodRelation {
    parent_id: Uuid,
    child_id: Uuid,
}

impl NewBloodRelation {
    pub fn new(parent_id: Uuid, child_id: Uuid) -> Result<Self, ValidationError> {
        if parent_id == child_id {
            return Err(ValidationError::field(
                "child_id",
                "an individual cannot be their own parent",
            ));
        }
        Ok(Self { parent_id, child_id })
    }

    pub fn parent_id(&self) -> Uuid {
        self.parent_id
    }

    pub fn child_id(&self) -> Uuid {
        self.child_id
    }
}
