use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::EntityMapper;
use crate::database::schema::{TableSchema, INDIVIDUALS};
use crate::domain::entities::{DatePrecision, Gender, Individual, LifeEvent, NewIndividual};

/// `individuals` row. Birth and death are spread over three columns each.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndividualRecord {
    pub id: Uuid,
    pub tree_id: Uuid,
    pub first_name: String,
    pub last_name: Option<String>,
    pub patronymic: Option<String>,
    pub gender: Gender,
    pub birth_date: Option<NaiveDate>,
    pub birth_date_precision: Option<DatePrecision>,
    pub birth_place: Option<String>,
    pub death_date: Option<NaiveDate>,
    pub death_date_precision: Option<DatePrecision>,
    pub death_place: Option<String>,
    pub bio: Option<String>,
    pub avatar_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub is_active: bool,
}

pub struct IndividualMapper;

impl EntityMapper for IndividualMapper {
    type Entity = Individual;
    type Draft = NewIndividual;
    type Record = IndividualRecord;

    const SCHEMA: &'static TableSchema = &INDIVIDUALS;

    fn to_storage(entity: &Individual) -> IndividualRecord {
        IndividualRecord {
            id: entity.id,
            tree_id: entity.tree_id,
            first_name: entity.first_name.clone(),
            last_name: entity.last_name.clone(),
            patronymic: entity.patronymic.clone(),
            gender: entity.gender,
            birth_date: entity.birth.date,
            birth_date_precision: entity.birth.precision,
            birth_place: entity.birth.place.clone(),
            death_date: entity.death.date,
            death_date_precision: entity.death.precision,
            death_place: entity.death.place.clone(),
            bio: entity.bio.clone(),
            avatar_url: entity.avatar_url.clone(),
            created_at: entity.created_at,
            updated_at: entity.updated_at,
            is_active: entity.is_active,
        }
    }

    fn to_entity(record: IndividualRecord) -> Individual {
        Individual {
            id: record.id,
            tree_id: record.tree_id,
            first_name: record.first_name,
            last_name: record.last_name,
            patronymic: record.patronymic,
            gender: record.gender,
            birth: LifeEvent {
                date: record.birth_date,
                precision: record.birth_date_precision,
                place: record.birth_place,
            },
            death: LifeEvent {
                date: record.death_date,
                precision: record.death_date_precision,
                place: record.death_place,
            },
            bio: record.bio,
            avatar_url: record.avatar_url,
            created_at: record.created_at,
            updated_at: record.updated_at,
            is_active: record.is_active,
        }
    }
}
