//! Generic repositories over a [`Store`](crate::database::store::Store).
//!
//! Object repositories address rows by `id`; association repositories by
//! their composite key. Both stamp audit fields at the storage boundary and
//! map every storage failure into [`RepositoryError`].

use chrono::{DateTime, SubsecRound, Utc};
use serde_json::Value;

use crate::database::mappers::{self, EntityMapper};
use crate::database::schema::{TableSchema, PROTECTED_COLUMNS};
use crate::database::store::Row;

pub mod association;
pub mod error;
pub mod object;

pub use association::AssociationRepository;
pub use error::RepositoryError;
pub use object::ObjectRepository;

use crate::database::mappers::{
    BloodRelationMapper, IndividualMapper, MarriageMapper, TreeAccessMapper, TreeMapper, UserMapper,
};

pub type UserRepository<S> = ObjectRepository<UserMapper, S>;
pub type TreeRepository<S> = ObjectRepository<TreeMapper, S>;
pub type IndividualRepository<S> = ObjectRepository<IndividualMapper, S>;
pub type GrantRepository<S> = AssociationRepository<TreeAccessMapper, S>;
pub type BloodRelationRepository<S> = AssociationRepository<BloodRelationMapper, S>;
pub type MarriageRepository<S> = AssociationRepository<MarriageMapper, S>;

/// Current time at the precision Postgres stores.
pub(crate) fn timestamp() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

/// Serialize a draft into a row. Protected columns in the draft are dropped.
pub(crate) fn draft_row<M: EntityMapper>(draft: &M::Draft, action: &str) -> Result<Row, RepositoryError> {
    let schema = M::SCHEMA;
    let mut row = mappers::to_row(draft)
        .map_err(|e| RepositoryError::unavailable(schema, action, format!("draft encoding failed: {}", e)))?;
    for column in PROTECTED_COLUMNS {
        if !schema.is_key(column) && row.remove(column).is_some() {
            tracing::warn!("Ignoring '{}' supplied in a {} draft", column, schema.entity);
        }
    }
    Ok(row)
}

/// Assign audit fields for a new row. `is_active` defaults to true.
pub(crate) fn stamp_new(row: &mut Row, now: DateTime<Utc>) {
    let now = Value::String(now.to_rfc3339());
    row.insert("created_at".to_string(), now.clone());
    row.insert("updated_at".to_string(), now);
    row.entry("is_active".to_string()).or_insert(Value::Bool(true));
}

pub(crate) fn decode_row<M: EntityMapper>(row: Row, action: &str) -> Result<M::Entity, RepositoryError> {
    mappers::decode::<M>(row).map_err(|e| {
        RepositoryError::unavailable(M::SCHEMA, action, format!("row decoding failed: {}", e))
    })
}

pub(crate) fn decode_rows<M: EntityMapper>(rows: Vec<Row>, action: &str) -> Result<Vec<M::Entity>, RepositoryError> {
    rows.into_iter().map(|row| decode_row::<M>(row, action)).collect()
}

/// Render a key for error messages, e.g. `user_id=.., tree_id=..`.
pub(crate) fn describe_key(schema: &TableSchema, key: &Row) -> String {
    if key.is_empty() {
        return "(no usable filter)".to_string();
    }
    let ordered = schema
        .columns
        .iter()
        .filter_map(|c| key.get(*c).map(|v| (c, v)))
        .map(|(c, v)| match v {
            Value::String(s) => format!("{}={}", c, s),
            other => format!("{}={}", c, other),
        });
    ordered.collect::<Vec<_>>().join(", ")
}
