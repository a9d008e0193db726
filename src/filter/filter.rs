use serde_json::Value;

use super::error::FilterError;
use super::filter_order::FilterOrder;
use super::filter_where::FilterWhere;
use super::types::{FilterOrderInfo, SelectQuery, SqlResult};
use crate::database::store::Row;

/// SELECT builder over one table.
///
/// Filter values travel as a single JSONB parameter and are typed by
/// `jsonb_populate_record`, so every comparison uses the column's own type.
pub struct Filter {
    table_name: String,
    where_data: Row,
    order_data: Vec<FilterOrderInfo>,
    limit: Option<u32>,
    offset: Option<u32>,
}

impl Filter {
    pub fn new(table_name: impl Into<String>) -> Result<Self, FilterError> {
        let table_name = table_name.into();
        validate_table_name(&table_name)?;
        Ok(Self {
            table_name,
            where_data: Row::new(),
            order_data: vec![],
            limit: None,
            offset: None,
        })
    }

    pub fn assign(&mut self, query: &SelectQuery) -> Result<&mut Self, FilterError> {
        self.where_clause(query.filters.clone())?;
        self.order(vec![query.order.clone()])?;
        self.limit(query.limit, Some(query.offset));
        Ok(self)
    }

    pub fn where_clause(&mut self, conditions: Row) -> Result<&mut Self, FilterError> {
        FilterWhere::validate(&conditions)?;
        self.where_data = conditions;
        Ok(self)
    }

    pub fn order(&mut self, order: Vec<FilterOrderInfo>) -> Result<&mut Self, FilterError> {
        FilterOrder::validate(&order)?;
        self.order_data = order;
        Ok(self)
    }

    pub fn limit(&mut self, limit: u32, offset: Option<u32>) -> &mut Self {
        self.limit = Some(limit);
        self.offset = offset;
        self
    }

    pub fn to_sql(&self) -> Result<SqlResult, FilterError> {
        let where_clause = FilterWhere::generate(&self.where_data);
        let order_clause = FilterOrder::generate(&self.order_data);
        let limit_clause = self.build_limit_clause();

        let query = [
            self.filter_cte(1),
            "SELECT to_jsonb(t) AS \"row\"".to_string(),
            format!("FROM \"{}\" AS t CROSS JOIN f", self.table_name),
            if where_clause.is_empty() { String::new() } else { format!("WHERE {}", where_clause) },
            order_clause,
            limit_clause,
        ]
        .into_iter()
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(" ");

        Ok(SqlResult {
            query,
            params: vec![Value::Object(self.where_data.clone())],
        })
    }

    /// The bare condition list, for statements that bring their own `f`.
    pub fn to_where_sql(&self) -> SqlResult {
        SqlResult {
            query: FilterWhere::generate(&self.where_data),
            params: vec![Value::Object(self.where_data.clone())],
        }
    }

    /// `WITH f AS (...)` binding the filter record to parameter `$n`.
    pub fn filter_cte(&self, param_index: usize) -> String {
        format!(
            "WITH f AS (SELECT * FROM jsonb_populate_record(NULL::\"{}\", ${}::jsonb))",
            self.table_name, param_index
        )
    }

    fn build_limit_clause(&self) -> String {
        match (self.limit, self.offset) {
            (Some(l), Some(o)) => format!("LIMIT {} OFFSET {}", l, o),
            (Some(l), None) => format!("LIMIT {}", l),
            _ => String::new(),
        }
    }
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    name.len() <= 63 && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

pub fn validate_table_name(name: &str) -> Result<(), FilterError> {
    if name.is_empty() {
        return Err(FilterError::InvalidTableName("Table name cannot be empty".to_string()));
    }
    if !is_identifier(name) {
        return Err(FilterError::InvalidTableName(format!("Invalid table name format: {}", name)));
    }
    Ok(())
}

pub fn validate_column(name: &str) -> Result<(), FilterError> {
    if name.is_empty() {
        return Err(FilterError::InvalidColumn("Column name cannot be empty".to_string()));
    }
    if !is_identifier(name) {
        return Err(FilterError::InvalidColumn(format!("Invalid column name format: {}", name)));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::types::SortDirection;
    use serde_json::json;

    #[test]
    fn builds_select_with_filters_order_and_paging() {
        let mut filters = Row::new();
        filters.insert("tree_id".into(), json!("8d0c7c1e-4d7e-4ac5-9f51-0d5e3f0f6a11"));
        let query = SelectQuery {
            filters,
            order: FilterOrderInfo {
                column: "last_name".into(),
                sort: SortDirection::Asc,
            },
            offset: 40,
            limit: 20,
        };

        let mut filter = Filter::new("individuals").unwrap();
        filter.assign(&query).unwrap();
        let sql = filter.to_sql().unwrap();

        assert_eq!(
            sql.query,
            "WITH f AS (SELECT * FROM jsonb_populate_record(NULL::\"individuals\", $1::jsonb)) \
             SELECT to_jsonb(t) AS \"row\" FROM \"individuals\" AS t CROSS JOIN f \
             WHERE t.\"tree_id\" = f.\"tree_id\" ORDER BY t.\"last_name\" ASC LIMIT 20 OFFSET 40"
        );
        assert_eq!(sql.params.len(), 1);
        assert_eq!(sql.params[0]["tree_id"], "8d0c7c1e-4d7e-4ac5-9f51-0d5e3f0f6a11");
    }

    #[test]
    fn omits_where_without_filters() {
        let filter = Filter::new("trees").unwrap();
        let sql = filter.to_sql().unwrap();
        assert!(!sql.query.contains("WHERE"));
        assert_eq!(sql.params, vec![json!({})]);
    }

    #[test]
    fn validates_identifiers() {
        assert!(Filter::new("tree_access").is_ok());
        assert!(Filter::new("").is_err());
        assert!(Filter::new("1trees").is_err());
        assert!(Filter::new("trees; drop").is_err());
        assert!(validate_column("_hidden").is_ok());
        assert!(validate_column("na-me").is_err());
    }
}
