use async_trait::async_trait;
use serde_json::{Map, Value};
use thiserror::Error;

use crate::database::schema::TableSchema;
use crate::filter::SelectQuery;

/// One table row keyed by column name.
pub type Row = Map<String, Value>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// Uniqueness, foreign-key, check or not-null violation.
    #[error("Constraint violation: {0}")]
    Constraint(String),

    /// Anything else: connectivity, timeouts, malformed statements.
    #[error("Storage backend error: {0}")]
    Backend(String),
}

/// Transactional storage handle consumed by the repositories.
///
/// Every mutation is a single atomic statement. `key` arguments name the
/// row by the schema's key columns.
#[async_trait]
pub trait Store: Send + Sync {
    async fn select(&self, schema: &TableSchema, query: &SelectQuery) -> Result<Vec<Row>, StoreError>;

    async fn insert(&self, schema: &TableSchema, row: Row) -> Result<Row, StoreError>;

    /// Returns `None` when no row matches `key`.
    async fn update(&self, schema: &TableSchema, key: &Row, changes: Row) -> Result<Option<Row>, StoreError>;

    /// Returns the row as it was before deletion, or `None` when absent.
    async fn delete(&self, schema: &TableSchema, key: &Row) -> Result<Option<Row>, StoreError>;

    /// Insert `row`, or on a key collision overwrite only `update_columns`.
    async fn upsert(
        &self,
        schema: &TableSchema,
        row: Row,
        update_columns: &[String],
    ) -> Result<Row, StoreError>;
}

#[async_trait]
impl<S: Store + ?Sized> Store for std::sync::Arc<S> {
    async fn select(&self, schema: &TableSchema, query: &SelectQuery) -> Result<Vec<Row>, StoreError> {
        (**self).select(schema, query).await
    }

    async fn insert(&self, schema: &TableSchema, row: Row) -> Result<Row, StoreError> {
        (**self).insert(schema, row).await
    }

    async fn update(&self, schema: &TableSchema, key: &Row, changes: Row) -> Result<Option<Row>, StoreError> {
        (**self).update(schema, key, changes).await
    }

    async fn delete(&self, schema: &TableSchema, key: &Row) -> Result<Option<Row>, StoreError> {
        (**self).delete(schema, key).await
    }

    async fn upsert(
        &self,
        schema: &TableSchema,
        row: Row,
        update_columns: &[String],
    ) -> Result<Row, StoreError> {
        (**self).upsert(schema, row, update_columns).await
    }
}
