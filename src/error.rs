// Crate-level error kinds
use thiserror::Error;
use uuid::Uuid;

use crate::authorization::GuardError;
use crate::database::repository::RepositoryError;
use crate::domain::{AccessLevel, ValidationError};

/// Every failure a use case can report, with transport-neutral status
/// mapping through [`Error::status_code`] and [`Error::error_code`].
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    // 400 Bad Request
    #[error(transparent)]
    Validation(#[from] ValidationError),

    // 403 Forbidden
    #[error("Permission denied: user {user_id} needs {required} access to {resource_id} but holds {held}")]
    PermissionDenied {
        user_id: Uuid,
        resource_id: Uuid,
        required: AccessLevel,
        held: AccessLevel,
    },

    // 404 Not Found
    #[error("{entity} not found: {key}")]
    NotFound { entity: &'static str, key: String },

    // 409 Conflict
    #[error("Could not save {entity}: {message}")]
    SaveConflict { entity: &'static str, message: String },

    // 503 Service Unavailable
    #[error("{entity} storage unavailable: {message}")]
    RepositoryUnavailable { entity: &'static str, message: String },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

impl Error {
    pub fn not_found(entity: &'static str, key: impl Into<String>) -> Self {
        Error::NotFound {
            entity,
            key: key.into(),
        }
    }

    /// Get HTTP-equivalent status code
    pub fn status_code(&self) -> u16 {
        match self {
            Error::Validation(_) => 400,
            Error::PermissionDenied { .. } => 403,
            Error::NotFound { .. } => 404,
            Error::SaveConflict { .. } => 409,
            Error::RepositoryUnavailable { .. } => 503,
        }
    }

    /// Get error code for client handling
    pub fn error_code(&self) -> &'static str {
        match self {
            Error::Validation(_) => "VALIDATION_ERROR",
            Error::PermissionDenied { .. } => "PERMISSION_DENIED",
            Error::NotFound { .. } => "NOT_FOUND",
            Error::SaveConflict { .. } => "SAVE_CONFLICT",
            Error::RepositoryUnavailable { .. } => "REPOSITORY_UNAVAILABLE",
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound { .. })
    }

    pub fn is_permission_denied(&self) -> bool {
        matches!(self, Error::PermissionDenied { .. })
    }
}

impl From<RepositoryError> for Error {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound { entity, key } => Error::NotFound { entity, key },
            RepositoryError::SaveConflict { entity, message } => Error::SaveConflict { entity, message },
            RepositoryError::Unavailable { entity, message } => {
                Error::RepositoryUnavailable { entity, message }
            }
            RepositoryError::InvalidInput { message, .. } => {
                Error::Validation(ValidationError::field("query", message))
            }
        }
    }
}

impl From<GuardError> for Error {
    fn from(err: GuardError) -> Self {
        match err {
            GuardError::PermissionDenied {
                user_id,
                resource_id,
                required,
                held,
            } => Error::PermissionDenied {
                user_id,
                resource_id,
                required,
                held,
            },
            GuardError::Lookup(e) => e.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_every_kind_to_a_status() {
        let cases = [
            (Error::from(ValidationError::field("name", "empty")), 400, "VALIDATION_ERROR"),
            (Error::not_found("Tree", "id=1"), 404, "NOT_FOUND"),
            (
                Error::from(RepositoryError::InvalidInput {
                    entity: "Tree",
                    message: "Invalid value for 'name'".into(),
                }),
                400,
                "VALIDATION_ERROR",
            ),
            (
                Error::from(RepositoryError::SaveConflict {
                    entity: "User",
                    message: "duplicate email".into(),
                }),
                409,
                "SAVE_CONFLICT",
            ),
            (
                Error::from(GuardError::Lookup(RepositoryError::Unavailable {
                    entity: "TreeAccess",
                    message: "connection refused".into(),
                })),
                503,
                "REPOSITORY_UNAVAILABLE",
            ),
            (
                Error::from(GuardError::PermissionDenied {
                    user_id: Uuid::nil(),
                    resource_id: Uuid::nil(),
                    required: AccessLevel::Owner,
                    held: AccessLevel::Viewer,
                }),
                403,
                "PERMISSION_DENIED",
            ),
        ];

        for (err, status, code) in cases {
            assert_eq!(err.status_code(), status, "{}", err);
            assert_eq!(err.error_code(), code);
        }
    }
}
