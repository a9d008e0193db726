use std::marker::PhantomData;

use serde_json::Value;
use tracing::info;
use uuid::Uuid;

use super::{decode_row, decode_rows, describe_key, draft_row, stamp_new, timestamp, RepositoryError};
use crate::config::{self, RepositoryConfig};
use crate::database::mappers::{self, EntityMapper, TreeAccessMapper};
use crate::database::patch::Patch;
use crate::database::store::{Row, Store};
use crate::domain::entities::{NewTreeAccess, TreeAccess};
use crate::domain::AccessLevel;
use crate::filter::{Filters, ListQuery, SelectQuery};

/// CRUD and upsert for relationship entities keyed by a composite key.
pub struct AssociationRepository<M, S> {
    store: S,
    limits: RepositoryConfig,
    _mapper: PhantomData<fn() -> M>,
}

impl<M, S> AssociationRepository<M, S>
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

    /// Fetch the single row matching `filters`. Filters naming no declared
    /// column match nothing, and filters matching several rows are rejected.
    pub async fn get(&self, filters: &Filters) -> Result<M::Entity, RepositoryError> {
        let schema = M::SCHEMA;
        let conditions = filters.restrict(schema).map_err(|e| RepositoryError::invalid(schema, e))?;
        if conditions.is_empty() {
            return Err(RepositoryError::not_found(schema, describe_key(schema, &conditions)));
        }

        let key = describe_key(schema, &conditions);
        let mut rows = self
            .store
            .select(schema, &SelectQuery::matching(conditions, 2))
            .await
            .map_err(|e| RepositoryError::from_store(schema, "get", e))?;

        if rows.len() > 1 {
            return Err(RepositoryError::InvalidInput {
                entity: schema.entity,
                message: format!("{} matches more than one row", key),
            });
        }
        match rows.pop() {
            Some(row) => decode_row::<M>(row, "get"),
            None => Err(RepositoryError::not_found(schema, key)),
        }
    }

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

    /// Every row matching `query`, fetched in pages of `max_limit` starting
    /// at `query.skip`. The query's own limit is ignored.
    pub async fn get_all(&self, query: &ListQuery) -> Result<Vec<M::Entity>, RepositoryError> {
        let page_size = self.limits.max_limit.max(1);
        let mut page = query.clone().limit(page_size);
        let mut all = Vec::new();
        loop {
            let batch = self.get_multi(&page).await?;
            let fetched = batch.len() as u32;
            all.extend(batch);
            if fetched < page_size {
                return Ok(all);
            }
            page.skip = page.skip.saturating_add(fetched);
        }
    }

    /// Insert a new association. A key collision is a `SaveConflict`.
    pub async fn create(&self, draft: &M::Draft) -> Result<M::Entity, RepositoryError> {
        let schema = M::SCHEMA;
        let mut row = draft_row::<M>(draft, "create")?;
        stamp_new(&mut row, timestamp());

        let stored = self
            .store
            .insert(schema, row)
            .await
            .map_err(|e| RepositoryError::from_store(schema, "create", e))?;
        decode_row::<M>(stored, "create")
    }

    pub async fn update(&self, filters: &Filters, patch: &Patch) -> Result<M::Entity, RepositoryError> {
        let schema = M::SCHEMA;
        let key = self.resolve_key(filters).await?;
        let mut changes = patch.restrict(schema).map_err(|e| RepositoryError::invalid(schema, e))?;
        if changes.is_empty() {
            return self.get(&Filters::from(key)).await;
        }
        changes.insert("updated_at".to_string(), Value::String(timestamp().to_rfc3339()));

        let updated = self
            .store
            .update(schema, &key, changes)
            .await
            .map_err(|e| RepositoryError::from_store(schema, "update", e))?;

        match updated {
            Some(row) => decode_row::<M>(row, "update"),
            None => Err(RepositoryError::not_found(schema, describe_key(schema, &key))),
        }
    }

    /// Remove the matching row, returning it as it was before deletion.
    pub async fn delete(&self, filters: &Filters) -> Result<M::Entity, RepositoryError> {
        let schema = M::SCHEMA;
        let key = self.resolve_key(filters).await?;

        let removed = self
            .store
            .delete(schema, &key)
            .await
            .map_err(|e| RepositoryError::from_store(schema, "delete", e))?;

        match removed {
            Some(row) => decode_row::<M>(row, "delete"),
            None => Err(RepositoryError::not_found(schema, describe_key(schema, &key))),
        }
    }

    /// Atomic insert-or-update on the key tuple. On conflict only the mutable
    /// columns present in the draft and `updated_at` are overwritten.
    pub async fn upsert(&self, draft: &M::Draft) -> Result<M::Entity, RepositoryError> {
        let schema = M::SCHEMA;
        let mut row = draft_row::<M>(draft, "upsert")?;

        let mut update_columns: Vec<String> = row
            .keys()
            .filter(|column| schema.is_mutable(column))
            .cloned()
            .collect();
        update_columns.push("updated_at".to_string());

        stamp_new(&mut row, timestamp());

        let stored = self
            .store
            .upsert(schema, row, &update_columns)
            .await
            .map_err(|e| RepositoryError::from_store(schema, "upsert", e))?;
        decode_row::<M>(stored, "upsert")
    }

    /// Narrow `filters` to one row's key. Filters covering the whole key tuple
    /// are used as-is; anything looser is resolved through `get`.
    async fn resolve_key(&self, filters: &Filters) -> Result<Row, RepositoryError> {
        let schema = M::SCHEMA;
        let conditions = filters.restrict(schema).map_err(|e| RepositoryError::invalid(schema, e))?;
        if conditions.is_empty() {
            return Err(RepositoryError::not_found(schema, describe_key(schema, &conditions)));
        }
        if schema.key.iter().all(|column| conditions.contains_key(*column)) {
            return Ok(conditions);
        }

        let entity = self.get(filters).await?;
        let row = mappers::encode::<M>(&entity)
            .map_err(|e| RepositoryError::unavailable(schema, "resolve key", e.to_string()))?;
        Ok(schema
            .key
            .iter()
            .filter_map(|column| row.get(*column).map(|v| (column.to_string(), v.clone())))
            .collect())
    }
}

/// Grant-specific queries over `tree_access`.
impl<S: Store> AssociationRepository<TreeAccessMapper, S> {
    fn grant_filters(user_id: Uuid, tree_id: Uuid) -> Filters {
        Filters::new().eq("user_id", user_id).eq("tree_id", tree_id)
    }

    /// The caller's level on a tree. A missing or inactive grant is NOTHING.
    pub async fn current_level(&self, user_id: Uuid, tree_id: Uuid) -> Result<AccessLevel, RepositoryError> {
        match self.get(&Self::grant_filters(user_id, tree_id)).await {
            Ok(grant) if grant.is_active => Ok(grant.access_level),
            Ok(_) => Ok(AccessLevel::Nothing),
            Err(e) if e.is_not_found() => Ok(AccessLevel::Nothing),
            Err(e) => Err(e),
        }
    }

    pub async fn has_minimum_level(
        &self,
        user_id: Uuid,
        tree_id: Uuid,
        min_level: AccessLevel,
    ) -> Result<bool, RepositoryError> {
        if min_level == AccessLevel::Nothing {
            return Ok(true);
        }
        Ok(self.current_level(user_id, tree_id).await?.at_least(min_level))
    }

    /// Set a user's level on a tree, creating or overwriting the grant.
    pub async fn grant(&self, user_id: Uuid, tree_id: Uuid, level: AccessLevel) -> Result<TreeAccess, RepositoryError> {
        let grant = self.upsert(&NewTreeAccess::new(user_id, tree_id, level)).await?;
        info!(%user_id, %tree_id, level = %level, "Granted tree access");
        Ok(grant)
    }

    /// Active grants held by a user, newest first. Without a limit every
    /// grant is returned.
    pub async fn grants_for_user(&self, user_id: Uuid, limit: Option<u32>) -> Result<Vec<TreeAccess>, RepositoryError> {
        let query = ListQuery::new().filter("user_id", user_id).filter("is_active", true);
        match limit {
            Some(limit) => self.get_multi(&query.limit(limit)).await,
            None => self.get_all(&query).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::mappers::MarriageMapper;
    use crate::database::memory::MemoryStore;
    use crate::domain::entities::{MarriageChanges, NewMarriage};

    fn grants() -> AssociationRepository<TreeAccessMapper, MemoryStore> {
        AssociationRepository::with_limits(MemoryStore::new(), RepositoryConfig::default())
    }

    #[tokio::test]
    async fn get_with_only_unknown_filters_is_not_found() {
        let repo = grants();
        repo.grant(Uuid::new_v4(), Uuid::new_v4(), AccessLevel::Owner).await.unwrap();
        let err = repo.get(&Filters::new().eq("owner_name", "x")).await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn upsert_keeps_created_at_and_overwrites_level() {
        let repo = grants();
        let (u, t) = (Uuid::new_v4(), Uuid::new_v4());
        let first = repo.grant(u, t, AccessLevel::Viewer).await.unwrap();
        let second = repo.grant(u, t, AccessLevel::Editor).await.unwrap();

        assert_eq!(second.access_level, AccessLevel::Editor);
        assert_eq!(second.created_at, first.created_at);
        assert!(second.updated_at >= first.updated_at);
        assert_eq!(repo.store().row_count("tree_access").await, 1);
    }

    #[tokio::test]
    async fn missing_and_inactive_grants_are_nothing() {
        let repo = grants();
        let (u, t) = (Uuid::new_v4(), Uuid::new_v4());
        assert_eq!(repo.current_level(u, t).await.unwrap(), AccessLevel::Nothing);
        assert!(repo.has_minimum_level(u, t, AccessLevel::Nothing).await.unwrap());

        repo.grant(u, t, AccessLevel::Owner).await.unwrap();
        repo.update(
            &AssociationRepository::<TreeAccessMapper, MemoryStore>::grant_filters(u, t),
            &Patch::new().set("is_active", false),
        )
        .await
        .unwrap();
        assert_eq!(repo.current_level(u, t).await.unwrap(), AccessLevel::Nothing);

        repo.grant(u, t, AccessLevel::Viewer).await.unwrap();
        assert_eq!(repo.current_level(u, t).await.unwrap(), AccessLevel::Viewer);
    }

    #[tokio::test]
    async fn update_and_delete_by_partial_filters_resolve_one_row() {
        let repo: AssociationRepository<MarriageMapper, MemoryStore> =
            AssociationRepository::with_limits(MemoryStore::new(), RepositoryConfig::default());
        let (f, m) = (Uuid::new_v4(), Uuid::new_v4());
        repo.create(&NewMarriage::new(f, m).unwrap()).await.unwrap();

        let changes = MarriageChanges {
            marriage_place: Some(Some("Kazan".into())),
            ..Default::default()
        };
        let updated = repo
            .update(&Filters::new().eq("father_id", f), &Patch::from_changes(&changes).unwrap())
            .await
            .unwrap();
        assert_eq!(updated.marriage_place.as_deref(), Some("Kazan"));

        let removed = repo.delete(&Filters::new().eq("mother_id", m)).await.unwrap();
        assert_eq!(removed.father_id, f);
        assert_eq!(repo.store().row_count("marriages").await, 0);
    }

    #[tokio::test]
    async fn filters_matching_several_rows_are_rejected() {
        let repo: AssociationRepository<MarriageMapper, MemoryStore> =
            AssociationRepository::with_limits(MemoryStore::new(), RepositoryConfig::default());
        let father = Uuid::new_v4();
        for _ in 0..2 {
            repo.create(&NewMarriage::new(father, Uuid::new_v4()).unwrap()).await.unwrap();
        }

        let by_father = Filters::new().eq("father_id", father);
        assert!(matches!(repo.get(&by_father).await, Err(RepositoryError::InvalidInput { .. })));

        let changes = MarriageChanges {
            notes: Some(Some("second wedding".into())),
            ..Default::default()
        };
        let err = repo
            .update(&by_father, &Patch::from_changes(&changes).unwrap())
            .await
            .unwrap_err();
        assert!(matches!(err, RepositoryError::InvalidInput { entity: "Marriage", .. }));
        assert!(repo.delete(&by_father).await.is_err());

        let rows = repo.store().rows("marriages").await;
        assert_eq!(rows.len(), 2);
        assert!(rows.iter().all(|row| row["notes"].is_null()));
    }

    #[tokio::test]
    async fn grants_for_user_reads_past_one_page() {
        let limits = RepositoryConfig {
            default_limit: 2,
            max_limit: 3,
        };
        let repo = AssociationRepository::<TreeAccessMapper, _>::with_limits(MemoryStore::new(), limits);
        let user = Uuid::new_v4();
        for _ in 0..7 {
            repo.grant(user, Uuid::new_v4(), AccessLevel::Viewer).await.unwrap();
        }
        repo.grant(Uuid::new_v4(), Uuid::new_v4(), AccessLevel::Owner).await.unwrap();

        let all = repo.grants_for_user(user, None).await.unwrap();
        assert_eq!(all.len(), 7);
        let distinct: std::collections::HashSet<_> = all.iter().map(|g| g.tree_id).collect();
        assert_eq!(distinct.len(), 7);

        assert_eq!(repo.grants_for_user(user, Some(5)).await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn unencodable_filter_is_invalid_input() {
        use serde::ser::{Serialize, SerializeMap, Serializer};

        struct PairKeyed;
        impl Serialize for PairKeyed {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry(&(1, 2), &"x")?;
                map.end()
            }
        }

        let repo = grants();
        let (u, t) = (Uuid::new_v4(), Uuid::new_v4());
        repo.grant(u, t, AccessLevel::Owner).await.unwrap();

        let query = ListQuery::new().filter("user_id", u).filter("access_level", PairKeyed);
        let err = repo.get_multi(&query).await.unwrap_err();
        assert!(matches!(err, RepositoryError::InvalidInput { entity: "TreeAccess", .. }));
        assert_eq!(crate::error::Error::from(err).status_code(), 400);
    }

    #[tokio::test]
    async fn duplicate_create_is_a_save_conflict() {
        let repo: AssociationRepository<MarriageMapper, MemoryStore> =
            AssociationRepository::with_limits(MemoryStore::new(), RepositoryConfig::default());
        let draft = NewMarriage::new(Uuid::new_v4(), Uuid::new_v4()).unwrap();
        repo.create(&draft).await.unwrap();
        assert!(matches!(
            repo.create(&draft).await,
            Err(RepositoryError::SaveConflict { entity: "Marriage", .. })
        ));
    }
}
