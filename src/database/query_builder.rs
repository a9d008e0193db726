use serde_json::Value;

use crate::database::schema::TableSchema;
use crate::database::store::Row;
use crate::filter::{Filter, FilterError, FilterOrderInfo, SelectQuery, SortDirection, SqlResult};

/// Statement builder for one declared table.
///
/// Rows travel as one JSONB parameter and are expanded with
/// `jsonb_populate_record`, so Postgres resolves every column type. Only
/// columns declared in the schema are ever quoted into the statement text.
pub struct QueryBuilder<'a> {
    schema: &'a TableSchema,
}

impl<'a> QueryBuilder<'a> {
    pub fn new(schema: &'a TableSchema) -> Result<Self, FilterError> {
        schema.validate()?;
        Ok(Self { schema })
    }

    /// Key columns follow the requested order as tie-breakers so that
    /// consecutive pages neither repeat nor skip rows.
    pub fn select(&self, query: &SelectQuery) -> Result<SqlResult, FilterError> {
        self.check_columns(query.filters.keys())?;
        let mut filter = Filter::new(self.schema.name)?;
        filter.assign(query)?;

        let mut order = vec![query.order.clone()];
        order.extend(
            self.schema
                .key
                .iter()
                .filter(|column| **column != query.order.column)
                .map(|column| FilterOrderInfo {
                    column: column.to_string(),
                    sort: SortDirection::Asc,
                }),
        );
        filter.order(order)?;
        filter.to_sql()
    }

    pub fn insert(&self, row: &Row) -> Result<SqlResult, FilterError> {
        let columns = self.column_list(row)?;
        let query = format!(
            "INSERT INTO \"{table}\" AS t ({columns}) SELECT {columns} FROM {record} RETURNING to_jsonb(t) AS \"row\"",
            table = self.schema.name,
            columns = columns,
            record = self.record(1),
        );
        Ok(SqlResult {
            query,
            params: vec![Value::Object(row.clone())],
        })
    }

    pub fn update(&self, key: &Row, changes: &Row) -> Result<SqlResult, FilterError> {
        let mut filter = self.key_filter(key)?;
        self.check_columns(changes.keys())?;

        let assignments = if changes.is_empty() {
            // Nothing to write; still return the current row.
            let column = self.schema.key[0];
            format!("\"{}\" = t.\"{}\"", column, column)
        } else {
            changes
                .keys()
                .map(|c| format!("\"{}\" = c.\"{}\"", c, c))
                .collect::<Vec<_>>()
                .join(", ")
        };

        let where_sql = filter.where_clause(key.clone())?.to_where_sql();
        let query = format!(
            "{cte}, c AS (SELECT * FROM {changes}) UPDATE \"{table}\" AS t SET {assignments} FROM f, c WHERE {conditions} RETURNING to_jsonb(t) AS \"row\"",
            cte = filter.filter_cte(1),
            changes = self.record(2),
            table = self.schema.name,
            assignments = assignments,
            conditions = where_sql.query,
        );

        let mut params = where_sql.params;
        params.push(Value::Object(changes.clone()));
        Ok(SqlResult { query, params })
    }

    pub fn delete(&self, key: &Row) -> Result<SqlResult, FilterError> {
        let mut filter = self.key_filter(key)?;
        let where_sql = filter.where_clause(key.clone())?.to_where_sql();
        let query = format!(
            "{cte} DELETE FROM \"{table}\" AS t USING f WHERE {conditions} RETURNING to_jsonb(t) AS \"row\"",
            cte = filter.filter_cte(1),
            table = self.schema.name,
            conditions = where_sql.query,
        );
        Ok(SqlResult {
            query,
            params: where_sql.params,
        })
    }

    pub fn upsert(&self, row: &Row, update_columns: &[String]) -> Result<SqlResult, FilterError> {
        let columns = self.column_list(row)?;
        self.check_columns(update_columns.iter())?;

        let conflict = self
            .schema
            .key
            .iter()
            .map(|c| format!("\"{}\"", c))
            .collect::<Vec<_>>()
            .join(", ");
        let assignments = if update_columns.is_empty() {
            let column = self.schema.key[0];
            format!("\"{}\" = t.\"{}\"", column, column)
        } else {
            update_columns
                .iter()
                .map(|c| format!("\"{}\" = EXCLUDED.\"{}\"", c, c))
                .collect::<Vec<_>>()
                .join(", ")
        };

        let query = format!(
            "INSERT INTO \"{table}\" AS t ({columns}) SELECT {columns} FROM {record} ON CONFLICT ({conflict}) DO UPDATE SET {assignments} RETURNING to_jsonb(t) AS \"row\"",
            table = self.schema.name,
            columns = columns,
            record = self.record(1),
            conflict = conflict,
            assignments = assignments,
        );
        Ok(SqlResult {
            query,
            params: vec![Value::Object(row.clone())],
        })
    }

    fn record(&self, param_index: usize) -> String {
        format!(
            "jsonb_populate_record(NULL::\"{}\", ${}::jsonb)",
            self.schema.name, param_index
        )
    }

    fn key_filter(&self, key: &Row) -> Result<Filter, FilterError> {
        if key.is_empty() {
            return Err(FilterError::InvalidColumn(format!(
                "refusing to modify \"{}\" without a key",
                self.schema.name
            )));
        }
        self.check_columns(key.keys())?;
        Filter::new(self.schema.name)
    }

    fn column_list(&self, row: &Row) -> Result<String, FilterError> {
        if row.is_empty() {
            return Err(FilterError::InvalidColumn("no columns to insert".to_string()));
        }
        self.check_columns(row.keys())?;
        Ok(row
            .keys()
            .map(|c| format!("\"{}\"", c))
            .collect::<Vec<_>>()
            .join(", "))
    }

    fn check_columns<'c>(&self, mut columns: impl Iterator<Item = &'c String>) -> Result<(), FilterError> {
        match columns.find(|c| !self.schema.has_column(c)) {
            Some(column) => Err(FilterError::InvalidColumn(format!(
                "{}.{} is not a declared column",
                self.schema.name, column
            ))),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::schema::{TREES, TREE_ACCESS};
    use serde_json::json;

    fn row(value: Value) -> Row {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    #[test]
    fn select_breaks_order_ties_on_the_key() {
        let builder = QueryBuilder::new(&TREE_ACCESS).unwrap();
        let mut filters = Row::new();
        filters.insert("user_id".into(), json!("8d0c7c1e-4d7e-4ac5-9f51-0d5e3f0f6a11"));
        let sql = builder.select(&SelectQuery::matching(filters, 50)).unwrap();
        assert!(sql.query.contains(
            "ORDER BY t.\"created_at\" DESC, t.\"user_id\" ASC, t.\"tree_id\" ASC LIMIT 50 OFFSET 0"
        ));

        let sql = QueryBuilder::new(&TREES)
            .unwrap()
            .select(&SelectQuery::matching(Row::new(), 1))
            .unwrap();
        assert!(sql.query.contains("ORDER BY t.\"created_at\" DESC, t.\"id\" ASC"));
    }

    #[test]
    fn update_sets_only_changed_columns() {
        let builder = QueryBuilder::new(&TREES).unwrap();
        let sql = builder
            .update(&row(json!({"id": "x"})), &row(json!({"name": "X"})))
            .unwrap();
        assert_eq!(
            sql.query,
            "WITH f AS (SELECT * FROM jsonb_populate_record(NULL::\"trees\", $1::jsonb)), \
             c AS (SELECT * FROM jsonb_populate_record(NULL::\"trees\", $2::jsonb)) \
             UPDATE \"trees\" AS t SET \"name\" = c.\"name\" FROM f, c WHERE t.\"id\" = f.\"id\" \
             RETURNING to_jsonb(t) AS \"row\""
        );
        assert_eq!(sql.params, vec![json!({"id": "x"}), json!({"name": "X"})]);
    }

    #[test]
    fn upsert_conflicts_on_the_key_tuple() {
        let builder = QueryBuilder::new(&TREE_ACCESS).unwrap();
        let sql = builder
            .upsert(
                &row(json!({"user_id": "u", "tree_id": "t", "access_level": "owner"})),
                &["access_level".to_string(), "updated_at".to_string()],
            )
            .unwrap();
        assert!(sql.query.contains("ON CONFLICT (\"user_id\", \"tree_id\")"));
        assert!(sql.query.contains(
            "DO UPDATE SET \"access_level\" = EXCLUDED.\"access_level\", \"updated_at\" = EXCLUDED.\"updated_at\""
        ));
    }

    #[test]
    fn refuses_undeclared_columns_and_unkeyed_mutations() {
        let builder = QueryBuilder::new(&TREES).unwrap();
        assert!(builder.insert(&row(json!({"name\"--": 1}))).is_err());
        assert!(builder.delete(&Row::new()).is_err());
        assert!(builder
            .update(&row(json!({"id": "x"})), &row(json!({"owner": "y"})))
            .is_err());
    }

    #[test]
    fn delete_returns_the_removed_row() {
        let builder = QueryBuilder::new(&TREE_ACCESS).unwrap();
        let sql = builder.delete(&row(json!({"user_id": "u", "tree_id": "t"}))).unwrap();
        assert!(sql.query.starts_with("WITH f AS"));
        assert!(sql.query.contains("DELETE FROM \"tree_access\" AS t USING f WHERE"));
        assert!(sql.query.ends_with("RETURNING to_jsonb(t) AS \"row\""));
    }
}
