//! In-process [`Store`] used by tests and dry runs.
//!
//! Mutations are serialised behind one write lock, and the declared key and
//! unique sets are enforced the way Postgres would enforce them. Stores built
//! with [`MemoryStore::with_references`] also enforce the declared references
//! and cascade deletes along them.

use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering as AtomicOrdering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use tokio::sync::RwLock;

use crate::database::schema::{self, TableSchema};
use crate::database::store::{Row, Store, StoreError};
use crate::filter::{SelectQuery, SortDirection};

#[derive(Default)]
struct State {
    tables: HashMap<String, Vec<Row>>,
    unavailable_tables: HashSet<String>,
}

#[derive(Clone, Default)]
pub struct MemoryStore {
    state: Arc<RwLock<State>>,
    unavailable: Arc<AtomicBool>,
    references: bool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store that rejects rows pointing at missing parents and removes
    /// dependent rows on delete, like the Postgres foreign keys.
    pub fn with_references() -> Self {
        Self {
            references: true,
            ..Self::default()
        }
    }

    /// Make every call fail as a backend outage until switched back.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, AtomicOrdering::SeqCst);
    }

    /// Make calls against one table fail as a backend outage.
    pub async fn set_table_unavailable(&self, table: &str, unavailable: bool) {
        let mut state = self.state.write().await;
        if unavailable {
            state.unavailable_tables.insert(table.to_string());
        } else {
            state.unavailable_tables.remove(table);
        }
    }

    pub async fn row_count(&self, table: &str) -> usize {
        self.state.read().await.tables.get(table).map_or(0, Vec::len)
    }

    pub async fn rows(&self, table: &str) -> Vec<Row> {
        self.state
            .read()
            .await
            .tables
            .get(table)
            .cloned()
            .unwrap_or_default()
    }

    fn check_available(&self, state: &State, schema: &TableSchema) -> Result<(), StoreError> {
        if self.unavailable.load(AtomicOrdering::SeqCst) || state.unavailable_tables.contains(schema.name) {
            return Err(StoreError::Backend(format!(
                "connection to '{}' refused",
                schema.name
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn select(&self, schema: &TableSchema, query: &SelectQuery) -> Result<Vec<Row>, StoreError> {
        let state = self.state.read().await;
        self.check_available(&state, schema)?;
        check_columns(schema, query.filters.keys())?;
        check_columns(schema, std::iter::once(&query.order.column))?;

        let mut rows: Vec<Row> = state
            .tables
            .get(schema.name)
            .map(|rows| rows.iter().filter(|row| matches(row, &query.filters)).cloned().collect())
            .unwrap_or_default();

        let column = query.order.column.as_str();
        rows.sort_by(|a, b| {
            let ordering = compare_values(field(a, column), field(b, column));
            let ordering = match query.order.sort {
                SortDirection::Asc => ordering,
                SortDirection::Desc => ordering.reverse(),
            };
            schema.key.iter().fold(ordering, |ordering, key| {
                ordering.then_with(|| compare_values(field(a, key), field(b, key)))
            })
        });

        Ok(rows
            .into_iter()
            .skip(query.offset as usize)
            .take(query.limit as usize)
            .collect())
    }

    async fn insert(&self, schema: &TableSchema, row: Row) -> Result<Row, StoreError> {
        let mut state = self.state.write().await;
        self.check_available(&state, schema)?;
        let row = complete_row(schema, row)?;
        if self.references {
            check_references(&state, schema, &row)?;
        }

        let table = state.tables.entry(schema.name.to_string()).or_default();
        check_unique(schema, table, &row, None)?;
        table.push(row.clone());
        Ok(row)
    }

    async fn update(&self, schema: &TableSchema, key: &Row, changes: Row) -> Result<Option<Row>, StoreError> {
        let mut state = self.state.write().await;
        self.check_available(&state, schema)?;
        check_key(schema, key)?;
        check_columns(schema, changes.keys())?;

        let found = state
            .tables
            .get(schema.name)
            .and_then(|table| table.iter().position(|row| matches(row, key)).map(|index| (index, table[index].clone())));
        let Some((index, mut updated)) = found else {
            return Ok(None);
        };

        for (column, value) in changes {
            updated.insert(column, value);
        }
        check_not_null(schema, &updated)?;
        if self.references {
            check_references(&state, schema, &updated)?;
        }

        let table = state.tables.entry(schema.name.to_string()).or_default();
        check_unique(schema, table, &updated, Some(index))?;
        table[index] = updated.clone();
        Ok(Some(updated))
    }

    async fn delete(&self, schema: &TableSchema, key: &Row) -> Result<Option<Row>, StoreError> {
        let mut state = self.state.write().await;
        self.check_available(&state, schema)?;
        check_key(schema, key)?;

        let table = state.tables.entry(schema.name.to_string()).or_default();
        let removed = table
            .iter()
            .position(|row| matches(row, key))
            .map(|index| table.remove(index));

        if self.references {
            if let Some(id) = removed.as_ref().and_then(|row| row.get("id")) {
                cascade(&mut state, schema.name, id);
            }
        }
        Ok(removed)
    }

    async fn upsert(
        &self,
        schema: &TableSchema,
        row: Row,
        update_columns: &[String],
    ) -> Result<Row, StoreError> {
        let mut state = self.state.write().await;
        self.check_available(&state, schema)?;
        check_columns(schema, update_columns.iter())?;
        let row = complete_row(schema, row)?;
        if self.references {
            check_references(&state, schema, &row)?;
        }
        let key = key_of(schema, &row);

        let table = state.tables.entry(schema.name.to_string()).or_default();
        match table.iter().position(|existing| matches(existing, &key)) {
            Some(index) => {
                let mut updated = table[index].clone();
                for column in update_columns {
                    if let Some(value) = row.get(column) {
                        updated.insert(column.clone(), value.clone());
                    }
                }
                check_unique(schema, table, &updated, Some(index))?;
                table[index] = updated.clone();
                Ok(updated)
            }
            None => {
                check_unique(schema, table, &row, None)?;
                table.push(row.clone());
                Ok(row)
            }
        }
    }
}

static NULL: Value = Value::Null;

fn field<'a>(row: &'a Row, column: &str) -> &'a Value {
    row.get(column).unwrap_or(&NULL)
}

fn matches(row: &Row, filters: &Row) -> bool {
    filters
        .iter()
        .all(|(column, expected)| values_equal(field(row, column), expected))
}

fn key_of(schema: &TableSchema, row: &Row) -> Row {
    schema
        .key
        .iter()
        .map(|column| (column.to_string(), field(row, column).clone()))
        .collect()
}

fn check_columns<'a>(
    schema: &TableSchema,
    columns: impl Iterator<Item = &'a String>,
) -> Result<(), StoreError> {
    for column in columns {
        if !schema.has_column(column) {
            return Err(StoreError::Backend(format!(
                "column \"{}\" of relation \"{}\" does not exist",
                column, schema.name
            )));
        }
    }
    Ok(())
}

fn check_key(schema: &TableSchema, key: &Row) -> Result<(), StoreError> {
    if key.is_empty() {
        return Err(StoreError::Backend(format!(
            "refusing to modify \"{}\" without a key",
            schema.name
        )));
    }
    check_columns(schema, key.keys())
}

fn check_not_null(schema: &TableSchema, row: &Row) -> Result<(), StoreError> {
    for column in schema.key {
        if field(row, column).is_null() {
            return Err(StoreError::Constraint(format!(
                "null value in column \"{}\" of relation \"{}\"",
                column, schema.name
            )));
        }
    }
    Ok(())
}

/// Validate columns, require the key, and fill undeclared columns with null.
fn complete_row(schema: &TableSchema, mut row: Row) -> Result<Row, StoreError> {
    check_columns(schema, row.keys())?;
    check_not_null(schema, &row)?;
    for column in schema.columns {
        row.entry(column.to_string()).or_insert(Value::Null);
    }
    Ok(row)
}

fn check_references(state: &State, schema: &TableSchema, row: &Row) -> Result<(), StoreError> {
    for reference in schema.references {
        let value = field(row, reference.column);
        if value.is_null() {
            continue;
        }
        let exists = state
            .tables
            .get(reference.table)
            .is_some_and(|rows| rows.iter().any(|target| values_equal(field(target, "id"), value)));
        if !exists {
            return Err(StoreError::Constraint(format!(
                "insert or update on \"{}\" violates foreign key {} -> {}(id)",
                schema.name, reference.column, reference.table
            )));
        }
    }
    Ok(())
}

/// Remove every row that references `table` row `id`, then whatever
/// referenced those rows.
fn cascade(state: &mut State, table: &str, id: &Value) {
    for dependent in schema::ALL {
        for reference in dependent.references.iter().filter(|r| r.table == table) {
            let Some(rows) = state.tables.get_mut(dependent.name) else {
                continue;
            };
            let (gone, kept): (Vec<Row>, Vec<Row>) = std::mem::take(rows)
                .into_iter()
                .partition(|row| values_equal(field(row, reference.column), id));
            *rows = kept;

            for row in gone {
                if let Some(child_id) = row.get("id") {
                    cascade(state, dependent.name, child_id);
                }
            }
        }
    }
}

fn check_unique(
    schema: &TableSchema,
    table: &[Row],
    candidate: &Row,
    skip: Option<usize>,
) -> Result<(), StoreError> {
    for set in schema.unique_sets() {
        // Postgres treats NULLs as distinct in unique indexes.
        if set.iter().any(|column| field(candidate, column).is_null()) {
            continue;
        }
        let collision = table.iter().enumerate().any(|(index, row)| {
            Some(index) != skip
                && set
                    .iter()
                    .all(|column| values_equal(field(row, column), field(candidate, column)))
        });
        if collision {
            return Err(StoreError::Constraint(format!(
                "duplicate key value violates unique constraint on {}({})",
                schema.name,
                set.join(", ")
            )));
        }
    }
    Ok(())
}

fn parse_timestamp(value: &Value) -> Option<DateTime<Utc>> {
    value
        .as_str()
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|dt| dt.with_timezone(&Utc))
}

fn values_equal(a: &Value, b: &Value) -> bool {
    compare_values(a, b) == Ordering::Equal
}

/// Orders like Postgres would for the column types in use: timestamps by
/// instant, numbers numerically, NULL above everything else.
fn compare_values(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Null, Value::Null) => Ordering::Equal,
        (Value::Null, _) => Ordering::Greater,
        (_, Value::Null) => Ordering::Less,
        (Value::Number(x), Value::Number(y)) => x
            .as_f64()
            .partial_cmp(&y.as_f64())
            .unwrap_or(Ordering::Equal),
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        (Value::String(x), Value::String(y)) => match (parse_timestamp(a), parse_timestamp(b)) {
            (Some(ta), Some(tb)) => ta.cmp(&tb),
            _ => x.cmp(y),
        },
        _ => a.to_string().cmp(&b.to_string()),
    }
}
