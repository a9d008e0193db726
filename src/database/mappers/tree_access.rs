use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::EntityMapper;
use crate::database::schema::{TableSchema, TREE_ACCESS};
use crate::domain::entities::{NewTreeAccess, TreeAccess};
use crate::domain::AccessLevel;

/// `tree_access` row. The level is stored in its lowercase string form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreeAccessRecord {
    pub user_id: Uuid,
    pub tree_id: Uuid,
    pub access_level: AccessLevel,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub is_active: bool,
}

pub struct TreeAccessMapper;

impl EntityMapper for TreeAccessMapper {
    type Entity = TreeAccess;
    type Draft = NewTreeAccess;
    type Record = TreeAccessRecord;

    const SCHEMA: &'static TableSchema = &TREE_ACCESS;

    fn to_storage(entity: &TreeAccess) -> TreeAccessRecord {
        TreeAccessRecord {
            user_id: entity.user_id,
            tree_id: entity.tree_id,
            access_level: entity.access_level,
            created_at: entity.created_at,
            updated_at: entity.updated_at,
            is_active: entity.is_active,
        }
    }

    fn to_entity(record: TreeAccessRecord) -> TreeAccess {
        TreeAccess {
            user_id: record.user_id,
            tree_id: record.tree_id,
            access_level: record.access_level,
            created_at: record.created_at,
            updated_at: record.updated_at,
            is_active: record.is_active,
        }
    }
}
