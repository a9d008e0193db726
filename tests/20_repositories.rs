mod common;

use anyhow::Result;
use chrono::{Duration, Utc};
use uuid::Uuid;

use gtree_core::config::RepositoryConfig;
use gtree_core::database::repository::{RepositoryError, TreeRepository};
use gtree_core::database::{MemoryStore, Patch};
use gtree_core::domain::entities::NewTree;
use gtree_core::filter::{ListQuery, SortDirection};

fn trees() -> TreeRepository<MemoryStore> {
    common::init_tracing();
    TreeRepository::with_limits(MemoryStore::new(), RepositoryConfig::default())
}

#[tokio::test]
async fn update_only_touches_mutable_fields() -> Result<()> {
    let repo = trees();
    let tree = repo.create(&NewTree::new("Romanov", None)?).await?;

    let patch = Patch::new()
        .set("id", Uuid::new_v4())
        .set("created_at", Utc::now() - Duration::days(365))
        .set("name", "X");
    let updated = repo.update(tree.id, &patch).await?;

    assert_eq!(updated.id, tree.id);
    assert_eq!(updated.created_at, tree.created_at);
    assert_eq!(updated.name, "X");
    assert_eq!(updated.description, tree.description);
    assert!(updated.updated_at >= tree.updated_at);
    assert_eq!(repo.get(tree.id).await?, updated);
    Ok(())
}

#[tokio::test]
async fn explicit_null_clears_and_absent_leaves_alone() -> Result<()> {
    let repo = trees();
    let tree = repo
        .create(&NewTree::new("Rurik", Some("Princes of Kiev".to_string()))?)
        .await?;

    let kept = repo.update(tree.id, &Patch::new().set("name", "Rurikids")).await?;
    assert_eq!(kept.description.as_deref(), Some("Princes of Kiev"));

    let cleared = repo.update(tree.id, &Patch::new().clear("description")).await?;
    assert_eq!(cleared.description, None);
    assert_eq!(cleared.name, "Rurikids");
    Ok(())
}

#[tokio::test]
async fn missing_rows_are_not_found() -> Result<()> {
    let repo = trees();
    let missing = Uuid::new_v4();

    assert!(repo.get(missing).await.unwrap_err().is_not_found());
    assert!(repo
        .update(missing, &Patch::new().set("name", "X"))
        .await
        .unwrap_err()
        .is_not_found());
    assert!(repo.delete(missing).await.unwrap_err().is_not_found());
    Ok(())
}

#[tokio::test]
async fn backend_outage_is_unavailable() -> Result<()> {
    let repo = trees();
    repo.store().set_unavailable(true);

    let err = repo.create(&NewTree::new("Offline", None)?).await.unwrap_err();
    assert!(matches!(err, RepositoryError::Unavailable { entity: "Tree", .. }));
    Ok(())
}

#[tokio::test]
async fn get_multi_orders_and_pages() -> Result<()> {
    let repo = trees();
    for name in ["a", "b", "c", "d"] {
        repo.create(&NewTree::new(name, None)?).await?;
    }

    let page = repo
        .get_multi(&ListQuery::new().order_by("name", SortDirection::Asc).skip(1).limit(2))
        .await?;
    let names: Vec<_> = page.iter().map(|t| t.name.as_str()).collect();
    assert_eq!(names, ["b", "c"]);

    let unknown_filter = repo.get_multi(&ListQuery::new().filter("colour", "red")).await?;
    assert_eq!(unknown_filter.len(), 4);
    Ok(())
}
