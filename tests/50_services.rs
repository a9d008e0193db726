mod common;

use anyhow::Result;
use chrono::NaiveDate;

use gtree_core::domain::entities::{
    DatePrecision, Gender, IndividualChanges, LifeEvent, NewBloodRelation, NewIndividual, TreeChanges,
};
use gtree_core::domain::AccessLevel;
use gtree_core::filter::ListQuery;

#[tokio::test]
async fn viewers_read_editors_write() -> Result<()> {
    let app = common::TestApp::new();
    let owner = app.user("owner").await?;
    let viewer = app.user("viewer").await?;
    let tree = app.tree(owner.id, "Romanov").await?;
    app.services
        .trees
        .share_access(owner.id, tree.id, viewer.id, AccessLevel::Viewer)
        .await?;

    let people = &app.services.individuals;
    let draft = NewIndividual::builder(tree.id, "Nikolai", Gender::Male)
        .last_name("Romanov")
        .birth(LifeEvent::on(NaiveDate::from_ymd_opt(1868, 5, 18).unwrap()).at("Tsarskoye Selo"))
        .build()?;

    let err = people.create(viewer.id, draft.clone()).await.unwrap_err();
    assert!(err.is_permission_denied());

    let nikolai = people.create(owner.id, draft).await?;
    assert_eq!(people.get(viewer.id, tree.id, nikolai.id).await?, nikolai);
    assert_eq!(people.list(viewer.id, tree.id, ListQuery::new()).await?.len(), 1);

    let changes = IndividualChanges {
        bio: Some(Some("Last emperor".to_string())),
        ..Default::default()
    };
    assert!(people
        .update(viewer.id, tree.id, nikolai.id, changes.clone())
        .await
        .unwrap_err()
        .is_permission_denied());
    let updated = people.update(owner.id, tree.id, nikolai.id, changes).await?;
    assert_eq!(updated.bio.as_deref(), Some("Last emperor"));
    assert_eq!(updated.birth.place.as_deref(), Some("Tsarskoye Selo"));
    Ok(())
}

#[tokio::test]
async fn death_before_birth_is_rejected_on_update() -> Result<()> {
    let app = common::TestApp::new();
    let owner = app.user("owner").await?;
    let tree = app.tree(owner.id, "Rurik").await?;

    let born = NaiveDate::from_ymd_opt(1900, 1, 1).unwrap();
    let draft = NewIndividual::builder(tree.id, "Ivan", Gender::Male)
        .birth(LifeEvent::on(born).with_precision(DatePrecision::Year))
        .build()?;
    let ivan = app.services.individuals.create(owner.id, draft).await?;

    let changes = IndividualChanges {
        death_date: Some(NaiveDate::from_ymd_opt(1899, 12, 31)),
        ..Default::default()
    };
    let err = app
        .services
        .individuals
        .update(owner.id, tree.id, ivan.id, changes)
        .await
        .unwrap_err();
    assert_eq!(err.error_code(), "VALIDATION_ERROR");
    Ok(())
}

#[tokio::test]
async fn relations_and_tree_lifecycle() -> Result<()> {
    let app = common::TestApp::new();
    let owner = app.user("owner").await?;
    let tree = app.tree(owner.id, "Windsor").await?;
    let people = &app.services.individuals;
    let relations = &app.services.relations;

    let parent = people
        .create(owner.id, NewIndividual::builder(tree.id, "Elizabeth", Gender::Female).build()?)
        .await?;
    let child = people
        .create(owner.id, NewIndividual::builder(tree.id, "Charles", Gender::Male).build()?)
        .await?;

    relations
        .create_blood_relation(owner.id, tree.id, NewBloodRelation::new(parent.id, child.id)?)
        .await?;
    let duplicate = relations
        .create_blood_relation(owner.id, tree.id, NewBloodRelation::new(parent.id, child.id)?)
        .await
        .unwrap_err();
    assert_eq!(duplicate.status_code(), 409);

    let parents = relations.list_parents(owner.id, tree.id, child.id).await?;
    assert_eq!(parents, vec![parent.clone()]);

    relations
        .delete_blood_relation(owner.id, tree.id, parent.id, child.id)
        .await?;
    assert!(relations.list_children(owner.id, tree.id, parent.id).await?.is_empty());

    let renamed = app
        .services
        .trees
        .update_tree(
            owner.id,
            tree.id,
            TreeChanges {
                description: Some(Some("House of Windsor".to_string())),
                ..Default::default()
            },
        )
        .await?;
    assert_eq!(renamed.description.as_deref(), Some("House of Windsor"));

    app.services.trees.delete_tree(owner.id, tree.id).await?;
    assert!(app
        .services
        .trees
        .get_tree(owner.id, tree.id)
        .await
        .unwrap_err()
        .is_permission_denied());
    Ok(())
}
