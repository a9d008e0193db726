use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::access_level::AccessLevel;
use crate::domain::error::ValidationError;

/// A user's grant on a tree. At most one per `(user_id, tree_id)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreeAccess {
    pub user_id: Uuid,
    pub tree_id: Uuid,
    pub access_level: AccessLevel,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub is_active: bool,
}

/// A grant to write. Writing a grant always (re)activates it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewTreeAccess {
    user_id: Uuid,
    tree_id: Uuid,
    access_level: AccessLevel,
    is_active: bool,
}

impl NewTreeAccess {
    pub fn new(user_id: Uuid, tree_id: Uuid, access_level: AccessLevel) -> Self {
        Self {
            user_id,
            tree_id,
            access_level,
            is_active: true,
        }
    }

    /// Build a grant from a stored or user-supplied level string.
    pub fn parse(user_id: Uuid, tree_id: Uuid, raw_level: &str) -> Result<Self, ValidationError> {
        Ok(Self::new(user_id, tree_id, AccessLevel::parse(Some(raw_level))?))
    }

    pub fn user_id(&self) -> Uuid {
        self.user_id
    }

    pub fn tree_id(&self) -> Uuid {
        self.tree_id
    }

    pub fn access_level(&self) -> AccessLevel {
        self.access_level
    }
}
