use std::marker::PhantomData;

use serde_json::Value;
use uuid::Uuid;

use super::{decode_row, decode_rows, draft_row, stamp_new, timestamp, RepositoryError};
use crate::config::{self, RepositoryConfig};
use crate::database::mappers::EntityMapper;
use crate::database::patch::Patch;
use crate::database::store::{Row, Store};
use crate::filter::{ListQuery, SelectQuery};

/// CRUD for entities addressed by a single `id`.
pub struct ObjectRepository<M, S> {
    store: S,
    limits: RepositoryConfig,
    _mapper: PhantomData<fn() -> M>,
}

impl<M, S> ObjectRepository<M, S>
where
    M: EntityMapper,
    S: Store,
{
    pub fn new(store: S) -> Self {
        Self::with_limits(store, config::config().repository)
    }

    pub fn with_limits(store: S, limits: RepositoryConfig) -> Self {
        Self {
            store,
            limits,
            _mapper: PhantomData,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub async fn get(&self, id: Uuid) -> Result<M::Entity, RepositoryError> {
        let schema = M::SCHEMA;
        let rows = self
            .store
            .select(schema, &SelectQuery::matching(id_key(id), 1))
            .await
            .map_err(|e| RepositoryError::from_store(schema, "get", e))?;

        match rows.into_iter().next() {
            Some(row) => decode_row::<M>(row, "get"),
            None => Err(RepositoryError::not_found(schema, format!("id={}", id))),
        }
    }

    /// List rows matching the query's equality filters. Filters on
    /// undeclared columns are ignored.
    pub async fn get_multi(&self, query: &ListQuery) -> Result<Vec<M::Entity>, RepositoryError> {
        let schema = M::SCHEMA;
        let resolved = query
            .resolve(schema, &self.limits)
            .map_err(|e| RepositoryError::invalid(schema, e))?;
        let rows = self
            .store
            .select(schema, &resolved)
            .await
            .map_err(|e| RepositoryError::from_store(schema, "get_multi", e))?;
        decode_rows::<M>(rows, "get_multi")
    }

    /// Insert a new row. The repository assigns `id`, `created_at`,
    /// `updated_at` and defaults `is_active` to true.
    pub async fn create(&self, draft: &M::Draft) -> Result<M::Entity, RepositoryError> {
        let schema = M::SCHEMA;
        let mut row = draft_row::<M>(draft, "create")?;
        row.insert("id".to_string(), Value::String(Uuid::new_v4().to_string()));
        stamp_new(&mut row, timestamp());

        let stored = self
            .store
            .insert(schema, row)
            .await
            .map_err(|e| RepositoryError::from_store(schema, "create", e))?;
        decode_row::<M>(stored, "create")
    }

    /// Apply the mutable subset of `patch` and refresh `updated_at`.
    /// An effectively empty patch returns the current entity unchanged.
    pub async fn update(&self, id: Uuid, patch: &Patch) -> Result<M::Entity, RepositoryError> {
        let schema = M::SCHEMA;
        let mut changes = patch.restrict(schema).map_err(|e| RepositoryError::invalid(schema, e))?;
        if changes.is_empty() {
            return self.get(id).await;
        }
        changes.insert("updated_at".to_string(), Value::String(timestamp().to_rfc3339()));

        let updated = self
            .store
            .update(schema, &id_key(id), changes)
            .await
            .map_err(|e| RepositoryError::from_store(schema, "update", e))?;

        match updated {
            Some(row) => decode_row::<M>(row, "update"),
            None => Err(RepositoryError::not_found(schema, format!("id={}", id))),
        }
    }

    /// Remove the row, returning the entity as it was before deletion.
    pub async fn delete(&self, id: Uuid) -> Result<M::Entity, RepositoryError> {
        let schema = M::SCHEMA;
        let removed = self
            .store
            .delete(schema, &id_key(id))
            .await
            .map_err(|e| RepositoryError::from_store(schema, "delete", e))?;

        match removed {
            Some(row) => decode_row::<M>(row, "delete"),
            None => Err(RepositoryError::not_found(schema, format!("id={}", id))),
        }
    }
}

fn id_key(id: Uuid) -> Row {
    let mut key = Row::new();
    key.insert("id".to_string(), Value::String(id.to_string()));
    key
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::mappers::TreeMapper;
    use crate::database::memory::MemoryStore;
    use crate::domain::entities::{NewTree, TreeChanges};

    fn repo() -> ObjectRepository<TreeMapper, MemoryStore> {
        ObjectRepository::with_limits(MemoryStore::new(), RepositoryConfig::default())
    }

    #[tokio::test]
    async fn create_assigns_identity_and_audit_fields() {
        let repo = repo();
        let tree = repo.create(&NewTree::new("Romanov", None).unwrap()).await.unwrap();
        assert!(tree.is_active);
        assert_eq!(tree.created_at, tree.updated_at);
        assert_eq!(repo.get(tree.id).await.unwrap(), tree);
    }

    #[tokio::test]
    async fn empty_patch_returns_current_entity() {
        let repo = repo();
        let tree = repo.create(&NewTree::new("Romanov", None).unwrap()).await.unwrap();
        let same = repo.update(tree.id, &Patch::new().set("id", Uuid::new_v4())).await.unwrap();
        assert_eq!(same, tree);
    }

    #[tokio::test]
    async fn explicit_null_clears_a_nullable_column() {
        let repo = repo();
        let tree = repo
            .create(&NewTree::new("Romanov", Some("Imperial house".into())).unwrap())
            .await
            .unwrap();
        let changes = TreeChanges {
            description: Some(None),
            ..Default::default()
        };
        let updated = repo.update(tree.id, &Patch::from_changes(&changes).unwrap()).await.unwrap();
        assert_eq!(updated.description, None);
        assert_eq!(updated.name, "Romanov");
    }

    #[tokio::test]
    async fn delete_returns_prior_state_then_not_found() {
        let repo = repo();
        let tree = repo.create(&NewTree::new("Romanov", None).unwrap()).await.unwrap();
        assert_eq!(repo.delete(tree.id).await.unwrap(), tree);
        assert!(repo.delete(tree.id).await.unwrap_err().is_not_found());
        assert!(repo.get(tree.id).await.unwrap_err().is_not_found());
    }
}
