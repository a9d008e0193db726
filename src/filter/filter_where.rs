use serde_json::Value;

use super::error::FilterError;
use crate::database::store::Row;

/// Equality conditions comparing the target alias `t` with the typed filter
/// record `f` produced by `jsonb_populate_record`.
pub struct FilterWhere;

impl FilterWhere {
    pub fn validate(conditions: &Row) -> Result<(), FilterError> {
        for column in conditions.keys() {
            super::filter::validate_column(column)?;
        }
        Ok(())
    }

    /// Returns the condition list joined by `AND`, or an empty string.
    pub fn generate(conditions: &Row) -> String {
        conditions
            .iter()
            .map(|(column, value)| match value {
                Value::Null => format!("t.\"{}\" IS NULL", column),
                _ => format!("t.\"{}\" = f.\"{}\"", column, column),
            })
            .collect::<Vec<_>>()
            .join(" AND ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn null_values_become_is_null() {
        let mut row = Row::new();
        row.insert("description".into(), Value::Null);
        row.insert("name".into(), json!("Romanov"));
        assert_eq!(
            FilterWhere::generate(&row),
            "t.\"description\" IS NULL AND t.\"name\" = f.\"name\""
        );
    }

    #[test]
    fn rejects_hostile_column_names() {
        let mut row = Row::new();
        row.insert("name\"; DROP TABLE trees; --".into(), json!(1));
        assert!(FilterWhere::validate(&row).is_err());
    }
}
