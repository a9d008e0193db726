use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::EntityMapper;
use crate::database::schema::{TableSchema, MARRIAGES};
use crate::domain::entities::{Marriage, NewMarriage};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarriageRecord {
    pub father_id: Uuid,
    pub mother_id: Uuid,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub marriage_place: Option<String>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub is_active: bool,
}

pub struct MarriageMapper;

impl EntityMapper for MarriageMapper {
    type Entity = Marriage;
    type Draft = NewMarriage;
    type Record = MarriageRecord;

    const SCHEMA: &'static TableSchema = &MARRIAGES;

    fn to_storage(entity: &Marriage) -> MarriageRecord {
        MarriageRecord {
            father_id: entity.father_id,
            mother_id: entity.mother_id,
            start_date: entity.start_date,
            end_date: entity.end_date,
            marriage_place: entity.marriage_place.clone(),
            notes: entity.notes.clone(),
            created_at: entity.created_at,
            updated_at: entity.updated_at,
            is_active: entity.is_active,
        }
    }

    fn to_entity(record: MarriageRecord) -> Marriage {
        Marriage {
            father_id: record.father_id,
            mother_id: record.mother_id,
            start_date: record.start_date,
            end_date: record.end_date,
            marriage_place: record.marriage_place,
            notes: record.notes,
            created_at: record.created_at,
            updated_at: record.updated_at,
            is_active: record.is_active,
        }
    }
}
