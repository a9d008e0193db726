use std::sync::Arc;

use uuid::Uuid;

use super::TreeGuard;
use crate::authorization::AccessGuard;
use crate::database::patch::Patch;
use crate::database::repository::{GrantRepository, IndividualRepository};
use crate::database::store::Store;
use crate::domain::entities::{Individual, IndividualChanges, NewIndividual};
use crate::domain::AccessLevel;
use crate::error::{Error, Result};
use crate::filter::ListQuery;

pub struct IndividualService<S> {
    individuals: IndividualRepository<S>,
    guard: TreeGuard<S>,
}

impl<S: Store> IndividualService<S> {
    pub fn new(store: S, grants: Arc<GrantRepository<S>>) -> Self {
        Self {
            individuals: IndividualRepository::new(store),
            guard: AccessGuard::new(grants),
        }
    }

    /// List people in a tree. Any `tree_id` filter in `query` is replaced.
    pub async fn list(&self, user_id: Uuid, tree_id: Uuid, query: ListQuery) -> Result<Vec<Individual>> {
        self.guard
            .guard(AccessLevel::Viewer, move |_: Uuid, tree_id: Uuid, query: ListQuery| async move {
                let query = query.filter("tree_id", tree_id);
                self.individuals.get_multi(&query).await.map_err(Error::from)
            })
            .call(user_id, tree_id, query)
            .await
    }

    pub async fn get(&self, user_id: Uuid, tree_id: Uuid, individual_id: Uuid) -> Result<Individual> {
        self.guard
            .guard(AccessLevel::Viewer, move |_: Uuid, tree_id: Uuid, id: Uuid| async move {
                self.in_tree(tree_id, id).await
            })
            .call(user_id, tree_id, individual_id)
            .await
    }

    pub async fn create(&self, user_id: Uuid, draft: NewIndividual) -> Result<Individual> {
        let tree_id = draft.tree_id();
        self.guard
            .guard(AccessLevel::Editor, move |_: Uuid, _: Uuid, draft: NewIndividual| async move {
                self.individuals.create(&draft).await.map_err(Error::from)
            })
            .call(user_id, tree_id, draft)
            .await
    }

    pub async fn update(
        &self,
        user_id: Uuid,
        tree_id: Uuid,
        individual_id: Uuid,
        changes: IndividualChanges,
    ) -> Result<Individual> {
        self.guard
            .guard(
                AccessLevel::Editor,
                move |_: Uuid, tree_id: Uuid, (id, changes): (Uuid, IndividualChanges)| async move {
                    let current = self.in_tree(tree_id, id).await?;
                    changes.validate_against(&current)?;
                    let updated = self.individuals.update(id, &Patch::from_changes(&changes)?).await?;
                    Ok::<_, Error>(updated)
                },
            )
            .call(user_id, tree_id, (individual_id, changes))
            .await
    }

    pub async fn delete(&self, user_id: Uuid, tree_id: Uuid, individual_id: Uuid) -> Result<Individual> {
        self.guard
            .guard(AccessLevel::Editor, move |_: Uuid, tree_id: Uuid, id: Uuid| async move {
                self.in_tree(tree_id, id).await?;
                let removed = self.individuals.delete(id).await?;
                Ok::<_, Error>(removed)
            })
            .call(user_id, tree_id, individual_id)
            .await
    }

    /// The individual, provided it belongs to `tree_id`. People from other
    /// trees are reported as missing.
    pub(crate) async fn in_tree(&self, tree_id: Uuid, individual_id: Uuid) -> Result<Individual> {
        let individual = self.individuals.get(individual_id).await?;
        if individual.tree_id != tree_id {
            return Err(Error::not_found("Individual", format!("id={}", individual_id)));
        }
        Ok(individual)
    }
}
