use serde_json::json;

use super::connect;
use crate::cli::utils::output_success;
use crate::cli::OutputFormat;

pub async fn migrate(output_format: OutputFormat) -> anyhow::Result<()> {
    let store = connect().await?;
    store.migrate().await?;
    output_success(&output_format, "Migrations applied", None)
}

pub async fn health(output_format: OutputFormat) -> anyhow::Result<()> {
    let store = connect().await?;
    store.health_check().await?;
    output_success(
        &output_format,
        "Database reachable",
        Some(json!({ "pool_size": store.pool().size() })),
    )
}
