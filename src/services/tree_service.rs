use std::sync::Arc;

use serde::Serialize;
use tracing::{error, info, warn};
use uuid::Uuid;

use super::TreeGuard;
use crate::authorization::AccessGuard;
use crate::database::patch::Patch;
use crate::database::repository::{GrantRepository, TreeRepository};
use crate::database::store::Store;
use crate::domain::entities::{NewTree, Tree, TreeAccess, TreeChanges};
use crate::domain::AccessLevel;
use crate::error::{Error, Result};
use crate::filter::{Filters, ListQuery};

/// A tree together with the level the caller holds on it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AccessibleTree {
    #[serde(flatten)]
    pub tree: Tree,
    pub access_level: AccessLevel,
}

pub struct TreeService<S> {
    trees: TreeRepository<S>,
    grants: Arc<GrantRepository<S>>,
    guard: TreeGuard<S>,
}

impl<S: Store> TreeService<S> {
    pub fn new(store: S, grants: Arc<GrantRepository<S>>) -> Self {
        Self {
            trees: TreeRepository::new(store),
            guard: AccessGuard::new(grants.clone()),
            grants,
        }
    }

    /// Create a tree and make `owner_id` its OWNER.
    ///
    /// If the grant cannot be written the tree is removed again, so a tree
    /// never exists without an owner.
    pub async fn create_tree(&self, owner_id: Uuid, draft: NewTree) -> Result<Tree> {
        let tree = self.trees.create(&draft).await?;

        if let Err(e) = self.grants.grant(owner_id, tree.id, AccessLevel::Owner).await {
            error!(tree_id = %tree.id, %owner_id, "Owner grant failed, removing tree: {}", e);
            self.trees.delete(tree.id).await?;
            return Err(e.into());
        }

        info!(tree_id = %tree.id, %owner_id, "Created tree '{}'", tree.name);
        Ok(tree)
    }

    pub async fn get_tree(&self, user_id: Uuid, tree_id: Uuid) -> Result<Tree> {
        self.guard
            .guard(AccessLevel::Viewer, move |_: Uuid, tree_id: Uuid, (): ()| async move {
                self.trees.get(tree_id).await.map_err(Error::from)
            })
            .call(user_id, tree_id, ())
            .await
    }

    /// Trees on which `user_id` holds at least `min_level`, most recently
    /// granted first. Grants whose tree no longer exists are skipped.
    pub async fn accessible_trees(&self, user_id: Uuid, min_level: AccessLevel) -> Result<Vec<AccessibleTree>> {
        let grants = self.grants.grants_for_user(user_id, None).await?;

        let mut trees = Vec::new();
        for grant in grants.into_iter().filter(|g| g.access_level.at_least(min_level)) {
            let tree = match self.trees.get(grant.tree_id).await {
                Ok(tree) => tree,
                Err(e) if e.is_not_found() => {
                    warn!(%user_id, tree_id = %grant.tree_id, "Skipping grant on missing tree");
                    continue;
                }
                Err(e) => return Err(e.into()),
            };
            trees.push(AccessibleTree {
                tree,
                access_level: grant.access_level,
            });
        }
        Ok(trees)
    }

    pub async fn update_tree(&self, user_id: Uuid, tree_id: Uuid, changes: TreeChanges) -> Result<Tree> {
        self.guard
            .guard(AccessLevel::Owner, move |_: Uuid, tree_id: Uuid, changes: TreeChanges| async move {
                changes.validate()?;
                let tree = self.trees.update(tree_id, &Patch::from_changes(&changes)?).await?;
                Ok::<_, Error>(tree)
            })
            .call(user_id, tree_id, changes)
            .await
    }

    /// Delete the tree and every grant on it. Grants are revoked before the
    /// tree row is removed.
    pub async fn delete_tree(&self, user_id: Uuid, tree_id: Uuid) -> Result<Tree> {
        self.guard
            .guard(AccessLevel::Owner, move |_: Uuid, tree_id: Uuid, (): ()| async move {
                let tree = self.trees.get(tree_id).await?;
                self.revoke_all(tree_id).await?;
                let tree = match self.trees.delete(tree_id).await {
                    Ok(removed) => removed,
                    Err(e) if e.is_not_found() => tree,
                    Err(e) => return Err(e.into()),
                };
                info!(%tree_id, "Deleted tree '{}'", tree.name);
                Ok::<_, Error>(tree)
            })
            .call(user_id, tree_id, ())
            .await
    }

    /// Give `target_id` exactly `level` on the tree. Sharing again
    /// overwrites the previous level; sharing NOTHING revokes access.
    pub async fn share_access(
        &self,
        owner_id: Uuid,
        tree_id: Uuid,
        target_id: Uuid,
        level: AccessLevel,
    ) -> Result<TreeAccess> {
        self.guard
            .guard(
                AccessLevel::Owner,
                move |_: Uuid, tree_id: Uuid, (target_id, level): (Uuid, AccessLevel)| async move {
                    self.grants.grant(target_id, tree_id, level).await.map_err(Error::from)
                },
            )
            .call(owner_id, tree_id, (target_id, level))
            .await
    }

    async fn revoke_all(&self, tree_id: Uuid) -> Result<()> {
        let grants = self.grants.get_all(&ListQuery::new().filter("tree_id", tree_id)).await?;
        for grant in grants {
            let key = Filters::new().eq("user_id", grant.user_id).eq("tree_id", grant.tree_id);
            match self.grants.delete(&key).await {
                Ok(_) => {}
                Err(e) if e.is_not_found() => {}
                Err(e) => return Err(e.into()),
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::memory::MemoryStore;

    fn service() -> (TreeService<MemoryStore>, MemoryStore) {
        let store = MemoryStore::new();
        let grants = Arc::new(GrantRepository::new(store.clone()));
        (TreeService::new(store.clone(), grants), store)
    }

    #[tokio::test]
    async fn owner_grant_failure_removes_the_tree() {
        let (service, store) = service();
        store.set_table_unavailable("tree_access", true).await;

        let err = service
            .create_tree(Uuid::new_v4(), NewTree::new("Orphan", None).unwrap())
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), 503);
        assert_eq!(store.row_count("trees").await, 0);
    }

    #[tokio::test]
    async fn delete_tree_revokes_every_grant() {
        let (service, store) = service();
        let (owner, viewer) = (Uuid::new_v4(), Uuid::new_v4());
        let tree = service.create_tree(owner, NewTree::new("Rurik", None).unwrap()).await.unwrap();
        service.share_access(owner, tree.id, viewer, AccessLevel::Viewer).await.unwrap();

        service.delete_tree(owner, tree.id).await.unwrap();
        assert_eq!(store.row_count("trees").await, 0);
        assert_eq!(store.row_count("tree_access").await, 0);
    }

    #[tokio::test]
    async fn outage_during_delete_keeps_the_tree() {
        let (service, store) = service();
        let owner = Uuid::new_v4();
        let tree = service.create_tree(owner, NewTree::new("Rurik", None).unwrap()).await.unwrap();

        store.set_table_unavailable("tree_access", true).await;
        assert!(service.delete_tree(owner, tree.id).await.is_err());
        store.set_table_unavailable("tree_access", false).await;

        assert_eq!(store.row_count("trees").await, 1);
        assert_eq!(service.get_tree(owner, tree.id).await.unwrap(), tree);
    }

    #[tokio::test]
    async fn grants_on_missing_trees_are_skipped() {
        let (service, store) = service();
        let (owner, viewer) = (Uuid::new_v4(), Uuid::new_v4());
        let kept = service.create_tree(owner, NewTree::new("Kept", None).unwrap()).await.unwrap();
        let gone = service.create_tree(owner, NewTree::new("Gone", None).unwrap()).await.unwrap();
        for tree in [&kept, &gone] {
            service.share_access(owner, tree.id, viewer, AccessLevel::Viewer).await.unwrap();
        }

        TreeRepository::new(store.clone()).delete(gone.id).await.unwrap();
        assert_eq!(store.row_count("tree_access").await, 4);

        let trees = service.accessible_trees(viewer, AccessLevel::Viewer).await.unwrap();
        assert_eq!(trees.len(), 1);
        assert_eq!(trees[0].tree, kept);
    }

    #[tokio::test]
    async fn editor_cannot_rename() {
        let (service, _) = service();
        let (owner, editor) = (Uuid::new_v4(), Uuid::new_v4());
        let tree = service.create_tree(owner, NewTree::new("Rurik", None).unwrap()).await.unwrap();
        service.share_access(owner, tree.id, editor, AccessLevel::Editor).await.unwrap();

        let changes = TreeChanges {
            name: Some("Renamed".into()),
            ..Default::default()
        };
        let err = service.update_tree(editor, tree.id, changes).await.unwrap_err();
        assert!(err.is_permission_denied());
        assert_eq!(service.get_tree(editor, tree.id).await.unwrap().name, "Rurik");
    }
}
