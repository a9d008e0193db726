use thiserror::Error;

use crate::database::schema::TableSchema;
use crate::database::store::StoreError;
use crate::filter::FilterError;

/// Repository failure taxonomy. Storage errors never escape in raw form.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RepositoryError {
    #[error("{entity} not found: {key}")]
    NotFound { entity: &'static str, key: String },

    #[error("Could not save {entity}: {message}")]
    SaveConflict { entity: &'static str, message: String },

    #[error("{entity} storage unavailable: {message}")]
    Unavailable { entity: &'static str, message: String },

    #[error("Invalid {entity} query: {message}")]
    InvalidInput { entity: &'static str, message: String },
}

impl RepositoryError {
    pub fn not_found(schema: &TableSchema, key: impl Into<String>) -> Self {
        RepositoryError::NotFound {
            entity: schema.entity,
            key: key.into(),
        }
    }

    /// Classify a storage failure for `action`. Constraint violations on
    /// writes are conflicts; every other failure is an outage and is logged.
    pub fn from_store(schema: &TableSchema, action: &str, err: StoreError) -> Self {
        match err {
            StoreError::Constraint(message) => {
                tracing::debug!("{} {} rejected by constraint: {}", action, schema.entity, message);
                RepositoryError::SaveConflict {
                    entity: schema.entity,
                    message,
                }
            }
            StoreError::Backend(message) => Self::unavailable(schema, action, message),
        }
    }

    pub fn unavailable(schema: &TableSchema, action: &str, message: impl Into<String>) -> Self {
        let message = message.into();
        tracing::error!(
            entity = schema.entity,
            table = schema.name,
            "{} failed: {}",
            action,
            message
        );
        RepositoryError::Unavailable {
            entity: schema.entity,
            message,
        }
    }

    pub fn invalid(schema: &TableSchema, err: FilterError) -> Self {
        RepositoryError::InvalidInput {
            entity: schema.entity,
            message: err.to_string(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, RepositoryError::NotFound { .. })
    }
}
