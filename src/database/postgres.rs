use async_trait::async_trait;
use serde_json::Value;
use sqlx::error::ErrorKind;
use sqlx::PgPool;
use tracing::{debug, info};

use crate::config::DatabaseConfig;
use crate::database::manager::{DatabaseError, DatabaseManager};
use crate::database::query_builder::QueryBuilder;
use crate::database::schema::TableSchema;
use crate::database::store::{Row, Store, StoreError};
use crate::filter::{FilterError, SelectQuery, SqlResult};

/// [`Store`] over a Postgres pool. Each mutation runs as one statement in
/// its own transaction.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
    query_logging: bool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            query_logging: false,
        }
    }

    pub async fn connect(config: &DatabaseConfig) -> Result<Self, DatabaseError> {
        let pool = DatabaseManager::connect(config).await?;
        Ok(Self {
            pool,
            query_logging: config.enable_query_logging,
        })
    }

    pub fn with_query_logging(mut self, enabled: bool) -> Self {
        self.query_logging = enabled;
        self
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Apply the bundled migrations.
    pub async fn migrate(&self) -> Result<(), DatabaseError> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        info!("Database migrations applied");
        Ok(())
    }

    pub async fn health_check(&self) -> Result<(), DatabaseError> {
        DatabaseManager::health_check(&self.pool).await
    }

    fn log(&self, sql: &SqlResult) {
        if self.query_logging {
            debug!(query = %sql.query, "executing statement");
        }
    }

    async fn fetch_all(&self, sql: SqlResult) -> Result<Vec<Row>, StoreError> {
        self.log(&sql);
        let mut query = sqlx::query_scalar::<_, Value>(&sql.query);
        for param in &sql.params {
            query = query.bind(param);
        }
        let values = query.fetch_all(&self.pool).await?;
        values.into_iter().map(into_row).collect()
    }

    /// Run one mutating statement inside its own transaction.
    async fn execute_one(&self, sql: SqlResult) -> Result<Option<Row>, StoreError> {
        self.log(&sql);
        let mut tx = self.pool.begin().await?;

        let mut query = sqlx::query_scalar::<_, Value>(&sql.query);
        for param in &sql.params {
            query = query.bind(param);
        }
        let value = query.fetch_optional(&mut *tx).await?;

        tx.commit().await?;
        value.map(into_row).transpose()
    }

    async fn execute_returning(&self, schema: &TableSchema, sql: SqlResult) -> Result<Row, StoreError> {
        self.execute_one(sql).await?.ok_or_else(|| {
            StoreError::Backend(format!("statement on '{}' returned no row", schema.name))
        })
    }
}

#[async_trait]
impl Store for PgStore {
    async fn select(&self, schema: &TableSchema, query: &SelectQuery) -> Result<Vec<Row>, StoreError> {
        let sql = QueryBuilder::new(schema)?.select(query)?;
        self.fetch_all(sql).await
    }

    async fn insert(&self, schema: &TableSchema, row: Row) -> Result<Row, StoreError> {
        let sql = QueryBuilder::new(schema)?.insert(&row)?;
        self.execute_returning(schema, sql).await
    }

    async fn update(&self, schema: &TableSchema, key: &Row, changes: Row) -> Result<Option<Row>, StoreError> {
        let sql = QueryBuilder::new(schema)?.update(key, &changes)?;
        self.execute_one(sql).await
    }

    async fn delete(&self, schema: &TableSchema, key: &Row) -> Result<Option<Row>, StoreError> {
        let sql = QueryBuilder::new(schema)?.delete(key)?;
        self.execute_one(sql).await
    }

    async fn upsert(
        &self,
        schema: &TableSchema,
        row: Row,
        update_columns: &[String],
    ) -> Result<Row, StoreError> {
        let sql = QueryBuilder::new(schema)?.upsert(&row, update_columns)?;
        self.execute_returning(schema, sql).await
    }
}

fn into_row(value: Value) -> Result<Row, StoreError> {
    match value {
        Value::Object(map) => Ok(map),
        other => Err(StoreError::Backend(format!(
            "expected a JSON object row, got {}",
            other
        ))),
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db) = &err {
            match db.kind() {
                ErrorKind::UniqueViolation
                | ErrorKind::ForeignKeyViolation
                | ErrorKind::NotNullViolation
                | ErrorKind::CheckViolation => {
                    return StoreError::Constraint(db.message().to_string());
                }
                _ => {}
            }
        }
        StoreError::Backend(err.to_string())
    }
}

impl From<FilterError> for StoreError {
    fn from(err: FilterError) -> Self {
        StoreError::Backend(err.to_string())
    }
}
