use std::sync::Arc;

use uuid::Uuid;

use super::TreeGuard;
use crate::authorization::AccessGuard;
use crate::database::patch::Patch;
use crate::database::repository::{
    BloodRelationRepository, GrantRepository, IndividualRepository, MarriageRepository,
};
use crate::database::store::Store;
use crate::domain::entities::{BloodRelation, Individual, Marriage, MarriageChanges, NewBloodRelation, NewMarriage};
use crate::domain::AccessLevel;
use crate::error::{Error, Result};
use crate::filter::{Filters, ListQuery};

/// Parent/child links and marriages between people of one tree.
pub struct RelationService<S> {
    individuals: IndividualRepository<S>,
    blood_relations: BloodRelationRepository<S>,
    marriages: MarriageRepository<S>,
    guard: TreeGuard<S>,
}

impl<S: Store + Clone> RelationService<S> {
    pub fn new(store: S, grants: Arc<GrantRepository<S>>) -> Self {
        Self {
            individuals: IndividualRepository::new(store.clone()),
            blood_relations: BloodRelationRepository::new(store.clone()),
            marriages: MarriageRepository::new(store),
            guard: AccessGuard::new(grants),
        }
    }
}

impl<S: Store> RelationService<S> {
    pub async fn get_blood_relation(
        &self,
        user_id: Uuid,
        tree_id: Uuid,
        parent_id: Uuid,
        child_id: Uuid,
    ) -> Result<BloodRelation> {
        self.guard
            .guard(AccessLevel::Viewer, move |_: Uuid, tree_id: Uuid, (parent_id, child_id): (Uuid, Uuid)| async move {
                self.members(tree_id, &[parent_id, child_id]).await?;
                let relation = self.blood_relations.get(&blood_key(parent_id, child_id)).await?;
                Ok::<_, Error>(relation)
            })
            .call(user_id, tree_id, (parent_id, child_id))
            .await
    }

    pub async fn create_blood_relation(
        &self,
        user_id: Uuid,
        tree_id: Uuid,
        draft: NewBloodRelation,
    ) -> Result<BloodRelation> {
        self.guard
            .guard(AccessLevel::Editor, move |_: Uuid, tree_id: Uuid, draft: NewBloodRelation| async move {
                self.members(tree_id, &[draft.parent_id(), draft.child_id()]).await?;
                let relation = self.blood_relations.create(&draft).await?;
                Ok::<_, Error>(relation)
            })
            .call(user_id, tree_id, draft)
            .await
    }

    pub async fn delete_blood_relation(
        &self,
        user_id: Uuid,
        tree_id: Uuid,
        parent_id: Uuid,
        child_id: Uuid,
    ) -> Result<BloodRelation> {
        self.guard
            .guard(AccessLevel::Editor, move |_: Uuid, tree_id: Uuid, (parent_id, child_id): (Uuid, Uuid)| async move {
                self.members(tree_id, &[parent_id, child_id]).await?;
                let relation = self.blood_relations.delete(&blood_key(parent_id, child_id)).await?;
                Ok::<_, Error>(relation)
            })
            .call(user_id, tree_id, (parent_id, child_id))
            .await
    }

    /// Children of `parent_id` through active blood relations.
    pub async fn list_children(&self, user_id: Uuid, tree_id: Uuid, parent_id: Uuid) -> Result<Vec<Individual>> {
        self.guard
            .guard(AccessLevel::Viewer, move |_: Uuid, tree_id: Uuid, parent_id: Uuid| async move {
                self.members(tree_id, &[parent_id]).await?;
                let links = self
                    .blood_relations
                    .get_multi(&ListQuery::new().filter("parent_id", parent_id).filter("is_active", true))
                    .await?;
                self.related(tree_id, links.iter().map(|l| l.child_id)).await
            })
            .call(user_id, tree_id, parent_id)
            .await
    }

    /// Parents of `child_id` through active blood relations.
    pub async fn list_parents(&self, user_id: Uuid, tree_id: Uuid, child_id: Uuid) -> Result<Vec<Individual>> {
        self.guard
            .guard(AccessLevel::Viewer, move |_: Uuid, tree_id: Uuid, child_id: Uuid| async move {
                self.members(tree_id, &[child_id]).await?;
                let links = self
                    .blood_relations
                    .get_multi(&ListQuery::new().filter("child_id", child_id).filter("is_active", true))
                    .await?;
                self.related(tree_id, links.iter().map(|l| l.parent_id)).await
            })
            .call(user_id, tree_id, child_id)
            .await
    }

    pub async fn get_marriage(&self, user_id: Uuid, tree_id: Uuid, father_id: Uuid, mother_id: Uuid) -> Result<Marriage> {
        self.guard
            .guard(AccessLevel::Viewer, move |_: Uuid, tree_id: Uuid, (father_id, mother_id): (Uuid, Uuid)| async move {
                self.members(tree_id, &[father_id, mother_id]).await?;
                let marriage = self.marriages.get(&marriage_key(father_id, mother_id)).await?;
                Ok::<_, Error>(marriage)
            })
            .call(user_id, tree_id, (father_id, mother_id))
            .await
    }

    pub async fn create_marriage(&self, user_id: Uuid, tree_id: Uuid, draft: NewMarriage) -> Result<Marriage> {
        self.guard
            .guard(AccessLevel::Editor, move |_: Uuid, tree_id: Uuid, draft: NewMarriage| async move {
                self.members(tree_id, &[draft.father_id(), draft.mother_id()]).await?;
                let marriage = self.marriages.create(&draft).await?;
                Ok::<_, Error>(marriage)
            })
            .call(user_id, tree_id, draft)
            .await
    }

    pub async fn update_marriage(
        &self,
        user_id: Uuid,
        tree_id: Uuid,
        father_id: Uuid,
        mother_id: Uuid,
        changes: MarriageChanges,
    ) -> Result<Marriage> {
        self.guard
            .guard(
                AccessLevel::Editor,
                move |_: Uuid, tree_id: Uuid, (father_id, mother_id, changes): (Uuid, Uuid, MarriageChanges)| async move {
                    self.members(tree_id, &[father_id, mother_id]).await?;
                    let key = marriage_key(father_id, mother_id);
                    let current = self.marriages.get(&key).await?;
                    changes.validate_against(&current)?;
                    let updated = self.marriages.update(&key, &Patch::from_changes(&changes)?).await?;
                    Ok::<_, Error>(updated)
                },
            )
            .call(user_id, tree_id, (father_id, mother_id, changes))
            .await
    }

    pub async fn delete_marriage(&self, user_id: Uuid, tree_id: Uuid, father_id: Uuid, mother_id: Uuid) -> Result<Marriage> {
        self.guard
            .guard(AccessLevel::Editor, move |_: Uuid, tree_id: Uuid, (father_id, mother_id): (Uuid, Uuid)| async move {
                self.members(tree_id, &[father_id, mother_id]).await?;
                let marriage = self.marriages.delete(&marriage_key(father_id, mother_id)).await?;
                Ok::<_, Error>(marriage)
            })
            .call(user_id, tree_id, (father_id, mother_id))
            .await
    }

    /// Every id must name an individual of `tree_id`.
    async fn members(&self, tree_id: Uuid, ids: &[Uuid]) -> Result<()> {
        for id in ids {
            let individual = self.individuals.get(*id).await?;
            if individual.tree_id != tree_id {
                return Err(Error::not_found("Individual", format!("id={}", id)));
            }
        }
        Ok(())
    }

    async fn related(&self, tree_id: Uuid, ids: impl Iterator<Item = Uuid>) -> Result<Vec<Individual>> {
        let mut people = Vec::new();
        for id in ids {
            let individual = self.individuals.get(id).await?;
            if individual.tree_id == tree_id {
                people.push(individual);
            }
        }
        Ok(people)
    }
}

fn blood_key(parent_id: Uuid, child_id: Uuid) -> Filters {
    Filters::new().eq("parent_id", parent_id).eq("child_id", child_id)
}

fn marriage_key(father_id: Uuid, mother_id: Uuid) -> Filters {
    Filters::new().eq("father_id", father_id).eq("mother_id", mother_id)
}
