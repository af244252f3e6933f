//! Table and column lookup helpers shared by both pipelines.
//!
//! Absence is data here, never an error: a missing table is `None`, a
//! missing column is an empty sequence.

use crate::table::{Table, Value};

/// First table whose `ref_id` equals `ref_id`, or `None` ("no data yet").
pub fn find_table_by_ref<'a>(tables: &'a [Table], ref_id: &str) -> Option<&'a Table> {
    tables.iter().find(|t| t.ref_id() == ref_id)
}

/// Values of the column `column_name` with falsy entries removed.
///
/// Returns an empty vector when the table or the column is absent.
pub fn column_values<'a>(table: Option<&'a Table>, column_name: &str) -> Vec<&'a Value> {
    let Some(column) = table.and_then(|t| t.field(column_name)) else {
        return Vec::new();
    };
    column.values.iter().filter(|v| v.is_truthy()).collect()
}

/// Truthy values of a time column as epoch milliseconds.
///
/// Values that cannot be read as milliseconds are skipped.
pub fn time_values(table: Option<&Table>, column_name: &str) -> Vec<i64> {
    column_values(table, column_name)
        .into_iter()
        .filter_map(Value::as_millis)
        .collect()
}

/// Truthy values of a column in their textual form.
pub fn text_values(table: Option<&Table>, column_name: &str) -> Vec<String> {
    column_values(table, column_name)
        .into_iter()
        .filter_map(Value::as_text)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::{Column, FieldType};

    fn labels_table(ref_id: &str, labels: Vec<Value>) -> Table {
        Table::new(ref_id, vec![Column::new("labels", FieldType::String, labels)]).unwrap()
    }

    #[test]
    fn test_find_table_by_ref_first_match() {
        let tables = vec![
            labels_table("A", vec![Value::String("first".into())]),
            labels_table("B", vec![]),
            labels_table("A", vec![Value::String("second".into())]),
        ];

        let found = find_table_by_ref(&tables, "A").unwrap();
        assert_eq!(text_values(Some(found), "labels"), vec!["first"]);
    }

    #[test]
    fn test_find_table_by_ref_absent_is_none() {
        let tables = vec![labels_table("A", vec![])];
        assert!(find_table_by_ref(&tables, "issues_closed").is_none());
        assert!(find_table_by_ref(&[], "A").is_none());
    }

    #[test]
    fn test_column_values_filters_falsy_entries() {
        let table = labels_table(
            "A",
            vec![
                Value::String("wcag-a".into()),
                Value::Null,
                Value::String(String::new()),
                Value::String("bug".into()),
            ],
        );

        let values = column_values(Some(&table), "labels");
        assert_eq!(values.len(), 2);
        assert_eq!(values[0], &Value::String("wcag-a".into()));
        assert_eq!(values[1], &Value::String("bug".into()));
    }

    #[test]
    fn test_column_values_absent_column_or_table() {
        let table = labels_table("A", vec![Value::String("x".into())]);
        assert!(column_values(Some(&table), "createdAt").is_empty());
        assert!(column_values(None, "labels").is_empty());
    }

    #[test]
    fn test_time_values_skips_nulls() {
        let table = Table::new(
            "issues_closed",
            vec![Column::optional_times(
                "closedAt",
                vec![Some(1_000), None, Some(2_000)],
            )],
        )
        .unwrap();

        assert_eq!(time_values(Some(&table), "closedAt"), vec![1_000, 2_000]);
    }
}
