use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tracing::warn;
use uuid::Uuid;

use crate::database::mappers::TreeAccessMapper;
use crate::database::repository::{AssociationRepository, RepositoryError};
use crate::database::store::Store;
use crate::domain::AccessLevel;

/// Read-only source of a user's level on a resource.
#[async_trait]
pub trait GrantLookup: Send + Sync {
    /// The held level. A missing grant is [`AccessLevel::Nothing`], not an error.
    async fn current_level(&self, user_id: Uuid, resource_id: Uuid) -> Result<AccessLevel, RepositoryError>;
}

#[async_trait]
impl<S: Store> GrantLookup for AssociationRepository<TreeAccessMapper, S> {
    async fn current_level(&self, user_id: Uuid, resource_id: Uuid) -> Result<AccessLevel, RepositoryError> {
        AssociationRepository::<TreeAccessMapper, S>::current_level(self, user_id, resource_id).await
    }
}

#[async_trait]
impl<T: GrantLookup + ?Sized> GrantLookup for Arc<T> {
    async fn current_level(&self, user_id: Uuid, resource_id: Uuid) -> Result<AccessLevel, RepositoryError> {
        (**self).current_level(user_id, resource_id).await
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GuardError {
    #[error("User {user_id} needs {required} access to {resource_id} but holds {held}")]
    PermissionDenied {
        user_id: Uuid,
        resource_id: Uuid,
        required: AccessLevel,
        held: AccessLevel,
    },

    #[error(transparent)]
    Lookup(#[from] RepositoryError),
}

/// Checks a caller's grant before letting a wrapped operation run.
///
/// The guard holds no mutable state and caches nothing; every call performs
/// its own lookup.
pub struct AccessGuard<L> {
    grants: L,
}

impl<L: GrantLookup> AccessGuard<L> {
    pub fn new(grants: L) -> Self {
        Self { grants }
    }

    pub fn grants(&self) -> &L {
        &self.grants
    }

    /// Succeeds when the caller's level on `resource_id` ranks at least
    /// `min_level`. Requiring NOTHING never performs a lookup.
    pub async fn authorize(&self, user_id: Uuid, resource_id: Uuid, min_level: AccessLevel) -> Result<(), GuardError> {
        if min_level == AccessLevel::Nothing {
            return Ok(());
        }

        let held = self.grants.current_level(user_id, resource_id).await?;
        if held.at_least(min_level) {
            return Ok(());
        }

        warn!(
            %user_id,
            %resource_id,
            required = %min_level,
            held = %held,
            "Access denied"
        );
        Err(GuardError::PermissionDenied {
            user_id,
            resource_id,
            required: min_level,
            held,
        })
    }

    /// Wrap `operation` so it only runs for callers holding `min_level`.
    ///
    /// The operation receives `(user_id, resource_id, args)` exactly as the
    /// guarded call was given them.
    pub fn guard<F>(&self, min_level: AccessLevel, operation: F) -> Guarded<'_, L, F> {
        Guarded {
            guard: self,
            min_level,
            operation,
        }
    }
}

/// An operation bound to its minimum access level.
pub struct Guarded<'g, L, F> {
    guard: &'g AccessGuard<L>,
    min_level: AccessLevel,
    operation: F,
}

impl<'g, L, F> Guarded<'g, L, F>
where
    L: GrantLookup,
{
    pub fn min_level(&self) -> AccessLevel {
        self.min_level
    }

    /// Authorize, then run the operation and return its result verbatim.
    /// On denial the operation is never invoked.
    pub async fn call<A, Fut, T, E>(&self, user_id: Uuid, resource_id: Uuid, args: A) -> Result<T, E>
    where
        F: Fn(Uuid, Uuid, A) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: From<GuardError>,
    {
        self.guard.authorize(user_id, resource_id, self.min_level).await?;
        (self.operation)(user_id, resource_id, args).await
    }
}
