//! Rectangular, immutable tables shared by every pipeline stage.
//!
//! A [`Table`] is an ordered list of named, typed [`Column`]s of equal
//! length, identified by a `ref_id`. Pipelines never mutate their inputs;
//! they only build new tables through [`Table::new`], which rejects ragged
//! or mistyped columns.

use std::fmt;

use serde::Serialize;

use crate::error::{InsightsError, Result};

// ── FieldType ─────────────────────────────────────────────────────────────────

/// Semantic type of every value in a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    String,
    Number,
    Time,
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FieldType::String => "string",
            FieldType::Number => "number",
            FieldType::Time => "time",
        };
        f.write_str(name)
    }
}

// ── Value ─────────────────────────────────────────────────────────────────────

/// A single cell. Time values are epoch milliseconds.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    String(String),
    Number(f64),
    Time(i64),
}

impl Value {
    /// `false` for `Null`, empty strings, `0`, `NaN` and the epoch-zero time.
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Null => false,
            Value::String(s) => !s.is_empty(),
            Value::Number(n) => *n != 0.0 && !n.is_nan(),
            Value::Time(t) => *t != 0,
        }
    }

    /// Whether this value may live in a column of type `field_type`.
    ///
    /// `Null` is accepted by every column type.
    pub fn matches(&self, field_type: FieldType) -> bool {
        matches!(
            (self, field_type),
            (Value::Null, _)
                | (Value::String(_), FieldType::String)
                | (Value::Number(_), FieldType::Number)
                | (Value::Time(_), FieldType::Time)
        )
    }

    /// Textual form of the value, or `None` for `Null`.
    pub fn as_text(&self) -> Option<String> {
        match self {
            Value::Null => None,
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            Value::Time(t) => Some(t.to_string()),
        }
    }

    /// Epoch milliseconds for time values (and integral numbers), else `None`.
    pub fn as_millis(&self) -> Option<i64> {
        match self {
            Value::Time(t) => Some(*t),
            Value::Number(n) if n.is_finite() && n.fract() == 0.0 => Some(*n as i64),
            _ => None,
        }
    }

    /// Numeric form of the value, or `None` when it is not a number.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }
}

// ── Column ────────────────────────────────────────────────────────────────────

/// A named, typed sequence of values.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Column {
    pub name: String,
    #[serde(rename = "type")]
    pub field_type: FieldType,
    pub values: Vec<Value>,
}

impl Column {
    /// Build a column from raw values; type agreement is checked by [`Table::new`].
    pub fn new(name: impl Into<String>, field_type: FieldType, values: Vec<Value>) -> Self {
        Self {
            name: name.into(),
            field_type,
            values,
        }
    }

    /// A string column.
    pub fn strings<S: Into<String>>(name: impl Into<String>, values: Vec<S>) -> Self {
        let values = values
            .into_iter()
            .map(|s| Value::String(s.into()))
            .collect();
        Self::new(name, FieldType::String, values)
    }

    /// A numeric column.
    pub fn numbers(name: impl Into<String>, values: Vec<f64>) -> Self {
        let values = values.into_iter().map(Value::Number).collect();
        Self::new(name, FieldType::Number, values)
    }

    /// A count column; counts are stored as numbers.
    pub fn counts(name: impl Into<String>, values: Vec<u64>) -> Self {
        let values = values.into_iter().map(|c| Value::Number(c as f64)).collect();
        Self::new(name, FieldType::Number, values)
    }

    /// A time column of epoch milliseconds.
    pub fn times(name: impl Into<String>, values: Vec<i64>) -> Self {
        let values = values.into_iter().map(Value::Time).collect();
        Self::new(name, FieldType::Time, values)
    }

    /// A time column where missing entries become `Null`.
    pub fn optional_times(name: impl Into<String>, values: Vec<Option<i64>>) -> Self {
        let values = values
            .into_iter()
            .map(|v| v.map_or(Value::Null, Value::Time))
            .collect();
        Self::new(name, FieldType::Time, values)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

// ── Table ─────────────────────────────────────────────────────────────────────

/// An immutable, rectangular collection of columns.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Table {
    ref_id: String,
    name: Option<String>,
    length: usize,
    fields: Vec<Column>,
}

impl Table {
    /// Build a table, validating that every column has the same length and
    /// that every value matches its column type.
    pub fn new(ref_id: impl Into<String>, fields: Vec<Column>) -> Result<Self> {
        let ref_id = ref_id.into();
        let length = fields.first().map_or(0, Column::len);

        for column in &fields {
            if column.len() != length {
                return Err(InsightsError::RaggedTable {
                    ref_id,
                    column: column.name.clone(),
                    expected: length,
                    actual: column.len(),
                });
            }
            if !column.values.iter().all(|v| v.matches(column.field_type)) {
                return Err(InsightsError::ColumnType {
                    ref_id,
                    column: column.name.clone(),
                    expected: column.field_type.to_string(),
                });
            }
        }

        Ok(Self {
            ref_id,
            name: None,
            length,
            fields,
        })
    }

    /// Build a table from columns the caller has already aligned.
    ///
    /// Pipelines use this for their outputs, which share one key axis and
    /// are rectangular by construction.
    pub fn from_aligned(ref_id: impl Into<String>, fields: Vec<Column>) -> Self {
        let length = fields.first().map_or(0, Column::len);
        debug_assert!(
            fields.iter().all(|c| c.len() == length),
            "aligned columns must share one length"
        );
        Self {
            ref_id: ref_id.into(),
            name: None,
            length,
            fields,
        }
    }

    /// Attach a display name to the table.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn ref_id(&self) -> &str {
        &self.ref_id
    }

    /// Display name, if one was attached.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn fields(&self) -> &[Column] {
        &self.fields
    }

    /// Row count (the shared column length).
    pub fn len(&self) -> usize {
        self.length
    }

    pub fn is_empty(&self) -> bool {
        self.length == 0
    }

    /// First column named `name`.
    pub fn field(&self, name: &str) -> Option<&Column> {
        self.fields.iter().find(|c| c.name == name)
    }

    /// First column of type `field_type`.
    pub fn field_by_type(&self, field_type: FieldType) -> Option<&Column> {
        self.fields.iter().find(|c| c.field_type == field_type)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    // ── Value ─────────────────────────────────────────────────────────────────

    #[test]
    fn test_value_truthiness() {
        assert!(!Value::Null.is_truthy());
        assert!(!Value::String(String::new()).is_truthy());
        assert!(!Value::Number(0.0).is_truthy());
        assert!(!Value::Number(f64::NAN).is_truthy());
        assert!(!Value::Time(0).is_truthy());

        assert!(Value::String("wcag-a".into()).is_truthy());
        assert!(Value::Number(-1.0).is_truthy());
        assert!(Value::Time(1_704_067_200_000).is_truthy());
    }

    #[test]
    fn test_value_matches_type() {
        assert!(Value::Null.matches(FieldType::Time));
        assert!(Value::Time(1).matches(FieldType::Time));
        assert!(!Value::Time(1).matches(FieldType::Number));
        assert!(!Value::String("x".into()).matches(FieldType::Number));
    }

    #[test]
    fn test_value_as_millis() {
        assert_eq!(Value::Time(42).as_millis(), Some(42));
        assert_eq!(Value::Number(42.0).as_millis(), Some(42));
        assert_eq!(Value::Number(42.5).as_millis(), None);
        assert_eq!(Value::String("42".into()).as_millis(), None);
    }

    // ── Table::new ────────────────────────────────────────────────────────────

    #[test]
    fn test_table_new_rectangular() {
        let table = Table::new(
            "issues_created",
            vec![
                Column::times("createdAt", vec![1, 2, 3]),
                Column::strings("labels", vec!["a", "b", "c"]),
            ],
        )
        .unwrap();

        assert_eq!(table.len(), 3);
        assert_eq!(table.ref_id(), "issues_created");
        assert!(table.name().is_none());
        assert_eq!(table.fields().len(), 2);
    }

    #[test]
    fn test_table_new_rejects_ragged_columns() {
        let err = Table::new(
            "A",
            vec![
                Column::times("createdAt", vec![1, 2, 3]),
                Column::strings("labels", vec!["a"]),
            ],
        )
        .unwrap_err();

        assert!(matches!(
            err,
            InsightsError::RaggedTable {
                expected: 3,
                actual: 1,
                ..
            }
        ));
    }

    #[test]
    fn test_table_new_rejects_mistyped_values() {
        let column = Column::new(
            "createdAt",
            FieldType::Time,
            vec![Value::String("2024-01-01".into())],
        );
        let err = Table::new("A", vec![column]).unwrap_err();
        assert!(matches!(err, InsightsError::ColumnType { .. }));
    }

    #[test]
    fn test_table_without_columns_has_zero_rows() {
        let table = Table::new("empty", vec![]).unwrap();
        assert_eq!(table.len(), 0);
        assert!(table.is_empty());
    }

    #[test]
    fn test_table_field_lookup() {
        let table = Table::new(
            "A",
            vec![
                Column::strings("labels", vec!["x"]),
                Column::counts("Issues Created", vec![2]),
            ],
        )
        .unwrap()
        .with_name("created");

        assert_eq!(table.name(), Some("created"));
        assert!(table.field("labels").is_some());
        assert!(table.field("missing").is_none());
        assert_eq!(
            table.field_by_type(FieldType::Number).map(|c| c.name.as_str()),
            Some("Issues Created")
        );
    }

    // ── Serialization ─────────────────────────────────────────────────────────

    #[test]
    fn test_table_serializes_to_frame_shape() {
        let table = Table::new(
            "issues_closed_DATES",
            vec![
                Column::times("reset date", vec![1_000]),
                Column::counts("Issues Closed", vec![1]),
            ],
        )
        .unwrap();

        let json = serde_json::to_value(&table).unwrap();
        assert_eq!(json["refId"], "issues_closed_DATES");
        assert_eq!(json["length"], 1);
        assert_eq!(json["fields"][0]["type"], "time");
        assert_eq!(json["fields"][0]["values"][0], 1_000);
        assert_eq!(json["fields"][1]["name"], "Issues Closed");
        assert_eq!(json["fields"][1]["values"][0], 1.0);
    }
}
