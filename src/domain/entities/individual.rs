use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::error::{check_length, check_max_length, ValidationError};

pub const NAME_MAX_LEN: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Male,
    Female,
    Other,
}

impl Gender {
    pub const fn as_str(self) -> &'static str {
        match self {
            Gender::Male => "male",
            Gender::Female => "female",
            Gender::Other => "other",
        }
    }
}

impl FromStr for Gender {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "male" => Ok(Gender::Male),
            "female" => Ok(Gender::Female),
            "other" => Ok(Gender::Other),
            _ => Err(ValidationError::choice("gender", s, "male, female, other")),
        }
    }
}

impl fmt::Display for Gender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How much of a recorded date is actually known.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DatePrecision {
    Exact,
    Month,
    Year,
    About,
}

impl FromStr for DatePrecision {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "exact" => Ok(DatePrecision::Exact),
            "month" => Ok(DatePrecision::Month),
            "year" => Ok(DatePrecision::Year),
            "about" => Ok(DatePrecision::About),
            _ => Err(ValidationError::choice(
                "date precision",
                s,
                "exact, month, year, about",
            )),
        }
    }
}

/// A birth or death: when (possibly approximate) and where.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LifeEvent {
    pub date: Option<NaiveDate>,
    pub precision: Option<DatePrecision>,
    pub place: Option<String>,
}

impl LifeEvent {
    pub fn on(date: NaiveDate) -> Self {
        Self {
            date: Some(date),
            ..Default::default()
        }
    }

    pub fn with_precision(mut self, precision: DatePrecision) -> Self {
        self.precision = Some(precision);
        self
    }

    pub fn at(mut self, place: impl Into<String>) -> Self {
        self.place = Some(place.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.date.is_none() && self.precision.is_none() && self.place.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Individual {
    pub id: Uuid,
    pub tree_id: Uuid,
    pub first_name: String,
    pub last_name: Option<String>,
    pub patronymic: Option<String>,
    pub gender: Gender,
    pub birth: LifeEvent,
    pub death: LifeEvent,
    pub bio: Option<String>,
    pub avatar_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub is_active: bool,
}

impl Individual {
    pub fn full_name(&self) -> String {
        [Some(self.first_name.as_str()), self.patronymic.as_deref(), self.last_name.as_deref()]
            .into_iter()
            .flatten()
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Validated fields for creating an individual, flattened to storage columns.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewIndividual {
    tree_id: Uuid,
    first_name: String,
    last_name: Option<String>,
    patronymic: Option<String>,
    gender: Gender,
    birth_date: Option<NaiveDate>,
    birth_date_precision: Option<DatePrecision>,
    birth_place: Option<String>,
    death_date: Option<NaiveDate>,
    death_date_precision: Option<DatePrecision>,
    death_place: Option<String>,
    bio: Option<String>,
    avatar_url: Option<String>,
}

impl NewIndividual {
    pub fn builder(tree_id: Uuid, first_name: impl Into<String>, gender: Gender) -> IndividualBuilder {
        IndividualBuilder {
            tree_id,
            first_name: first_name.into(),
            gender,
            last_name: None,
            patronymic: None,
            birth: LifeEvent::default(),
            death: LifeEvent::default(),
            bio: None,
            avatar_url: None,
        }
    }

    pub fn tree_id(&self) -> Uuid {
        self.tree_id
    }

    pub fn first_name(&self) -> &str {
        &self.first_name
    }
}

#[derive(Debug, Clone)]
pub struct IndividualBuilder {
    tree_id: Uuid,
    first_name: String,
    gender: Gender,
    last_name: Option<String>,
    patronymic: Option<String>,
    birth: LifeEvent,
    death: LifeEvent,
    bio: Option<String>,
    avatar_url: Option<String>,
}

impl IndividualBuilder {
    pub fn last_name(mut self, value: impl Into<String>) -> Self {
        self.last_name = Some(value.into());
        self
    }

    pub fn patronymic(mut self, value: impl Into<String>) -> Self {
        self.patronymic = Some(value.into());
        self
    }

    pub fn birth(mut self, event: LifeEvent) -> Self {
        self.birth = event;
        self
    }

    pub fn death(mut self, event: LifeEvent) -> Self {
        self.death = event;
        self
    }

    pub fn bio(mut self, value: impl Into<String>) -> Self {
        self.bio = Some(value.into());
        self
    }

    pub fn avatar_url(mut self, value: impl Into<String>) -> Self {
        self.avatar_url = Some(value.into());
        self
    }

    pub fn build(self) -> Result<NewIndividual, ValidationError> {
        check_length("first_name", &self.first_name, 1, NAME_MAX_LEN)?;
        check_max_length("last_name", self.last_name.as_deref(), NAME_MAX_LEN)?;
        check_max_length("patronymic", self.patronymic.as_deref(), NAME_MAX_LEN)?;
        check_life_span(self.birth.date, self.death.date)?;

        Ok(NewIndividual {
            tree_id: self.tree_id,
            first_name: self.first_name,
            last_name: self.last_name,
            patronymic: self.patronymic,
            gender: self.gender,
            birth_date: self.birth.date,
            birth_date_precision: self.birth.precision,
            birth_place: self.birth.place,
            death_date: self.death.date,
            death_date_precision: self.death.precision,
            death_place: self.death.place,
            bio: self.bio,
            avatar_url: self.avatar_url,
        })
    }
}

/// Partial update for an individual, keyed by storage column names.
/// `Some(None)` clears a nullable column.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct IndividualChanges {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_name: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub patronymic: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gender: Option<Gender>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub birth_date: Option<Option<NaiveDate>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub birth_date_precision: Option<Option<DatePrecision>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub birth_place: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub death_date: Option<Option<NaiveDate>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub death_date_precision: Option<Option<DatePrecision>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub death_place: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bio: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<Option<String>>,
}

impl IndividualChanges {
    /// Validate the changes as they would apply on top of `current`.
    pub fn validate_against(&self, current: &Individual) -> Result<(), ValidationError> {
        if let Some(first_name) = &self.first_name {
            check_length("first_name", first_name, 1, NAME_MAX_LEN)?;
        }
        if let Some(last_name) = &self.last_name {
            check_max_length("last_name", last_name.as_deref(), NAME_MAX_LEN)?;
        }
        if let Some(patronymic) = &self.patronymic {
            check_max_length("patronymic", patronymic.as_deref(), NAME_MAX_LEN)?;
        }

        let birth = self.birth_date.unwrap_or(current.birth.date);
        let death = self.death_date.unwrap_or(current.death.date);
        check_life_span(birth, death)
    }
}

fn check_life_span(birth: Option<NaiveDate>, death: Option<NaiveDate>) -> Result<(), ValidationError> {
    match (birth, death) {
        (Some(b), Some(d)) if d < b => Err(ValidationError::field(
            "death_date",
            "must not precede birth_date",
        )),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn builder_flattens_life_events_into_columns() {
        let draft = NewIndividual::builder(Uuid::new_v4(), "Anna", Gender::Female)
            .last_name("Ivanova")
            .birth(LifeEvent::on(date(1901, 3, 2)).with_precision(DatePrecision::Year).at("Tver"))
            .build()
            .unwrap();

        let value = serde_json::to_value(&draft).unwrap();
        assert_eq!(value["gender"], "female");
        assert_eq!(value["birth_date"], "1901-03-02");
        assert_eq!(value["birth_date_precision"], "year");
        assert_eq!(value["birth_place"], "Tver");
        assert!(value["death_date"].is_null());
    }

    #[test]
    fn death_may_not_precede_birth() {
        let err = NewIndividual::builder(Uuid::new_v4(), "Ivan", Gender::Male)
            .birth(LifeEvent::on(date(1950, 1, 1)))
            .death(LifeEvent::on(date(1949, 12, 31)))
            .build()
            .unwrap_err();
        assert!(matches!(err, ValidationError::InvalidField { field: "death_date", .. }));
    }

    #[test]
    fn first_name_is_required() {
        assert!(NewIndividual::builder(Uuid::new_v4(), "", Gender::Other).build().is_err());
    }

    #[test]
    fn gender_and_precision_parse_case_insensitively() {
        assert_eq!("Female".parse::<Gender>(), Ok(Gender::Female));
        assert_eq!(" ABOUT ".parse::<DatePrecision>(), Ok(DatePrecision::About));
        assert!("unknown".parse::<Gender>().is_err());
        assert!("decade".parse::<DatePrecision>().is_err());
    }

    #[test]
    fn changes_are_checked_against_current_dates() {
        let now = Utc::now();
        let current = Individual {
            id: Uuid::new_v4(),
            tree_id: Uuid::new_v4(),
            first_name: "Ivan".into(),
            last_name: None,
            patronymic: Some("Petrovich".into()),
            gender: Gender::Male,
            birth: LifeEvent::on(date(1900, 1, 1)),
            death: LifeEvent::default(),
            bio: None,
            avatar_url: None,
            created_at: now,
            updated_at: now,
            is_active: true,
        };
        assert_eq!(current.full_name(), "Ivan Petrovich");

        let early_death = IndividualChanges {
            death_date: Some(Some(date(1899, 1, 1))),
            ..Default::default()
        };
        assert!(early_death.validate_against(&current).is_err());

        let cleared_birth = IndividualChanges {
            birth_date: Some(None),
            death_date: Some(Some(date(1899, 1, 1))),
            ..Default::default()
        };
        assert!(cleared_birth.validate_against(&current).is_ok());
    }
}
