use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::EntityMapper;
use crate::database::schema::{TableSchema, BLOOD_RELATIONS};
use crate::domain::entities::{BloodRelation, NewBloodRelation};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BloodRelationRecord {
    pub parent_id: Uuid,
    pub child_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub is_active: bool,
}

pub struct BloodRelationMapper;

impl EntityMapper for BloodRelationMapper {
    type Entity = BloodRelation;
    type Draft = NewBloodRelation;
    type Record = BloodRelationRecord;

    const SCHEMA: &'static TableSchema = &BLOOD_RELATIONS;

    fn to_storage(entity: &BloodRelation) -> BloodRelationRecord {
        BloodRelationRecord {
            parent_id: entity.parent_id,
            child_id: entity.child_id,
            created_at: entity.created_at,
            updated_at: entity.updated_at,
            is_active: entity.is_active,
        }
    }

    fn to_entity(record: BloodRelationRecord) -> BloodRelation {
        BloodRelation {
            parent_id: record.parent_id,
            child_id: record.child_id,
            created_at: record.created_at,
            updated_at: record.updated_at,
            is_active: record.is_active,
        }
    }
}
