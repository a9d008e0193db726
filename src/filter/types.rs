use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::RepositoryConfig;
use crate::database::schema::TableSchema;
use crate::database::store::Row;
use crate::filter::FilterError;

pub const DEFAULT_ORDER_COLUMN: &str = "created_at";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    #[default]
    Desc,
}

impl SortDirection {
    pub fn to_sql(&self) -> &'static str {
        match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FilterOrderInfo {
    pub column: String,
    pub sort: SortDirection,
}

#[derive(Debug, Clone)]
pub struct SqlResult {
    pub query: String,
    pub params: Vec<Value>,
}

/// Equality filters keyed by column name. A `null` value matches `IS NULL`.
///
/// A value that cannot be encoded poisons the filter set: `restrict` then
/// fails instead of running a broader query.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filters {
    conditions: Row,
    rejected: Option<FilterError>,
}

impl Filters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an equality condition.
    pub fn eq(mut self, column: impl Into<String>, value: impl Serialize) -> Self {
        let column = column.into();
        match serde_json::to_value(value) {
            Ok(v) => {
                self.conditions.insert(column, v);
            }
            Err(e) => {
                if self.rejected.is_none() {
                    self.rejected = Some(FilterError::InvalidValue {
                        column,
                        message: e.to_string(),
                    });
                }
            }
        }
        self
    }

    pub fn get(&self, column: &str) -> Option<&Value> {
        self.conditions.get(column)
    }

    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }

    pub fn len(&self) -> usize {
        self.conditions.len()
    }

    pub fn as_row(&self) -> &Row {
        &self.conditions
    }

    /// Keep only conditions on columns the table declares. Fails if any
    /// value could not be encoded.
    pub fn restrict(&self, schema: &TableSchema) -> Result<Row, FilterError> {
        if let Some(rejected) = &self.rejected {
            return Err(rejected.clone());
        }

        let mut kept = Row::new();
        for (column, value) in &self.conditions {
            if schema.has_column(column) {
                kept.insert(column.clone(), value.clone());
            } else {
                tracing::debug!(
                    "Ignoring filter on undeclared column '{}' for table '{}'",
                    column,
                    schema.name
                );
            }
        }
        Ok(kept)
    }
}

impl From<Row> for Filters {
    fn from(conditions: Row) -> Self {
        Filters {
            conditions,
            rejected: None,
        }
    }
}

/// Caller-facing listing request for `get_multi`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ListQuery {
    pub filters: Filters,
    pub order_by: Option<String>,
    pub direction: SortDirection,
    pub skip: u32,
    pub limit: Option<u32>,
}

impl ListQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn filter(mut self, column: impl Into<String>, value: impl Serialize) -> Self {
        self.filters = self.filters.eq(column, value);
        self
    }

    pub fn order_by(mut self, column: impl Into<String>, direction: SortDirection) -> Self {
        self.order_by = Some(column.into());
        self.direction = direction;
        self
    }

    pub fn skip(mut self, skip: u32) -> Self {
        self.skip = skip;
        self
    }

    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Resolve against a table: drop undeclared filter columns, fall back to
    /// `created_at DESC` for a missing or undeclared order column, and cap
    /// the limit.
    pub fn resolve(&self, schema: &TableSchema, limits: &RepositoryConfig) -> Result<SelectQuery, FilterError> {
        let filters = self.filters.restrict(schema)?;

        let (order_column, direction) = match self.order_by.as_deref() {
            Some(column) if schema.has_column(column) => (column.to_string(), self.direction),
            Some(column) => {
                tracing::debug!(
                    "Ignoring order on undeclared column '{}' for table '{}'",
                    column,
                    schema.name
                );
                (DEFAULT_ORDER_COLUMN.to_string(), SortDirection::Desc)
            }
            None => (DEFAULT_ORDER_COLUMN.to_string(), SortDirection::Desc),
        };

        let requested = self.limit.unwrap_or(limits.default_limit);
        let limit = if requested > limits.max_limit {
            tracing::warn!("Limit {} exceeds max {}, capping to max", requested, limits.max_limit);
            limits.max_limit
        } else {
            requested
        };

        Ok(SelectQuery {
            filters,
            order: FilterOrderInfo {
                column: order_column,
                sort: direction,
            },
            offset: self.skip,
            limit,
        })
    }
}

/// A listing request already resolved against a table schema.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectQuery {
    pub filters: Row,
    pub order: FilterOrderInfo,
    pub offset: u32,
    pub limit: u32,
}

impl SelectQuery {
    /// Match on exactly the given columns, returning at most `limit` rows.
    pub fn matching(filters: Row, limit: u32) -> Self {
        Self {
            filters,
            order: FilterOrderInfo {
                column: DEFAULT_ORDER_COLUMN.to_string(),
                sort: SortDirection::Desc,
            },
            offset: 0,
            limit,
        }
    }
}
