pub mod access;
pub mod database;

use crate::config::config;
use crate::database::PgStore;

/// Open the configured Postgres store.
pub(crate) async fn connect() -> anyhow::Result<PgStore> {
    Ok(PgStore::connect(&config().database).await?)
}
