use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::error::ValidationError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Marriage {
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

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewMarriage {
    father_id: Uuid,
    mother_id: Uuid,
    start_date: Option<NaiveDate>,
    end_date: Option<NaiveDate>,
    marriage_place: Option<String>,
    notes: Option<String>,
}

impl NewMarriage {
    pub fn new(father_id: Uuid, mother_id: Uuid) -> Result<Self, ValidationError> {
        if father_id == mother_id {
            return Err(ValidationError::field(
                "mother_id",
                "spouses must be two different individuals",
            ));
        }
        Ok(Self {
            father_id,
            mother_id,
            start_date: None,
            end_date: None,
            marriage_place: None,
            notes: None,
        })
    }

    pub fn with_dates(
        mut self,
        start_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
    ) -> Result<Self, ValidationError> {
        check_period(start_date, end_date)?;
        self.start_date = start_date;
        self.end_date = end_date;
        Ok(self)
    }

    pub fn with_place(mut self, place: impl Into<String>) -> Self {
        self.marriage_place = Some(place.into());
        self
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    pub fn father_id(&self) -> Uuid {
        self.father_id
    }

    pub fn mother_id(&self) -> Uuid {
        self.mother_id
    }
}

/// Partial update for a marriage. `Some(None)` clears the column.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MarriageChanges {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_date: Option<Option<NaiveDate>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_date: Option<Option<NaiveDate>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub marriage_place: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<Option<String>>,
}

impl MarriageChanges {
    pub fn validate_against(&self, current: &Marriage) -> Result<(), ValidationError> {
        let start = self.start_date.unwrap_or(current.start_date);
        let end = self.end_date.unwrap_or(current.end_date);
        check_period(start, end)
    }
}

fn check_period(start: Option<NaiveDate>, end: Option<NaiveDate>) -> Result<(), ValidationError> {
    match (start, end) {
        (Some(s), Some(e)) if e < s => Err(ValidationError::field(
            "end_date",
            "must not precede start_date",
        )),
        _ => Ok(()),
    }
}
