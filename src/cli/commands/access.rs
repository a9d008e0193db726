use std::sync::Arc;

use serde_json::json;
use uuid::Uuid;

use super::connect;
use crate::cli::utils::{output_empty_collection, output_success};
use crate::cli::OutputFormat;
use crate::database::repository::{GrantRepository, TreeRepository};
use crate::domain::AccessLevel;
use crate::services::TreeService;

/// Write a grant directly, bypassing the owner check. Operator use only.
pub async fn grant(tree_id: Uuid, user_id: Uuid, level: AccessLevel, output_format: OutputFormat) -> anyhow::Result<()> {
    let store = connect().await?;
    let trees = TreeRepository::new(store.clone());
    let tree = trees.get(tree_id).await?;

    let grants = GrantRepository::new(store);
    let grant = grants.grant(user_id, tree_id, level).await?;

    output_success(
        &output_format,
        &format!("Granted {} on '{}' to {}", grant.access_level, tree.name, user_id),
        Some(json!({ "grant": grant })),
    )
}

pub async fn check(tree_id: Uuid, user_id: Uuid, level: AccessLevel, output_format: OutputFormat) -> anyhow::Result<()> {
    let grants = GrantRepository::new(connect().await?);
    let held = grants.current_level(user_id, tree_id).await?;
    let allowed = grants.has_minimum_level(user_id, tree_id, level).await?;

    match output_format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::to_string_pretty(&json!({
                    "tree_id": tree_id,
                    "user_id": user_id,
                    "required": level,
                    "held": held,
                    "allowed": allowed
                }))?
            );
        }
        OutputFormat::Text => {
            let verdict = if allowed { "ALLOWED" } else { "DENIED" };
            println!("{}: {} holds {} on {} (requires {})", verdict, user_id, held, tree_id, level);
        }
    }
    Ok(())
}

pub async fn trees(user_id: Uuid, min_level: AccessLevel, output_format: OutputFormat) -> anyhow::Result<()> {
    let store = connect().await?;
    let service = TreeService::new(store.clone(), Arc::new(GrantRepository::new(store)));
    let rows = service.accessible_trees(user_id, min_level).await?;

    if rows.is_empty() {
        return output_empty_collection(&output_format, "trees", "No accessible trees");
    }

    match output_format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&json!({ "trees": rows }))?);
        }
        OutputFormat::Text => {
            println!("{:<38} {:<8} {:<20} {}", "ID", "LEVEL", "UPDATED", "NAME");
            println!("{}", "-".repeat(90));
            for row in &rows {
                println!(
                    "{:<38} {:<8} {:<20} {}",
                    row.tree.id,
                    row.access_level.as_str(),
                    row.tree.updated_at.format("%Y-%m-%d %H:%M").to_string(),
                    row.tree.name
                );
            }
        }
    }
    Ok(())
}
