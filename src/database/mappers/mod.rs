//! Pure translation between domain entities and flat storage records.
//!
//! One mapper per entity kind. Mappers perform no I/O and no validation
//! beyond shape; the repositories move records in and out of storage rows.

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::database::schema::TableSchema;
use crate::database::store::Row;

pub mod blood_relation;
pub mod individual;
pub mod marriage;
pub mod tree;
pub mod tree_access;
pub mod user;

pub use blood_relation::BloodRelationMapper;
pub use individual::IndividualMapper;
pub use marriage::MarriageMapper;
pub use tree::TreeMapper;
pub use tree_access::TreeAccessMapper;
pub use user::UserMapper;

pub trait EntityMapper: Send + Sync + 'static {
    type Entity: Clone + Send + Sync;
    /// Caller-supplied fields for `create`, serialized under column names.
    type Draft: Serialize + Send + Sync;
    /// Flat storage shape, one field per column.
    type Record: Serialize + DeserializeOwned + Send;

    const SCHEMA: &'static TableSchema;

    fn to_storage(entity: &Self::Entity) -> Self::Record;

    fn to_entity(record: Self::Record) -> Self::Entity;
}

/// Serialize any record or draft into a storage row.
pub fn to_row<T: Serialize>(value: &T) -> Result<Row, serde_json::Error> {
    match serde_json::to_value(value)? {
        Value::Object(row) => Ok(row),
        other => Err(serde::ser::Error::custom(format!(
            "expected a struct to serialize as an object, got {}",
            other
        ))),
    }
}

/// Decode a storage row into a domain entity.
pub fn decode<M: EntityMapper>(row: Row) -> Result<M::Entity, serde_json::Error> {
    let record: M::Record = serde_json::from_value(Value::Object(row))?;
    Ok(M::to_entity(record))
}

/// Encode a domain entity into a storage row.
pub fn encode<M: EntityMapper>(entity: &M::Entity) -> Result<Row, serde_json::Error> {
    to_row(&M::to_storage(entity))
}

#[cfg(test)]
pub(crate) mod testing {
    use chrono::{DateTime, SubsecRound, Utc};

    /// A timestamp with the precision Postgres keeps.
    pub fn stamp() -> DateTime<Utc> {
        Utc::now().trunc_subsecs(6)
    }
}
