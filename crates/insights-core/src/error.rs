use std::path::PathBuf;
use thiserror::Error;

/// All errors produced by the issue-insights crates.
///
/// The aggregation pipelines themselves never fail; these errors come from
/// building tables out of external input and reading export files.
#[derive(Error, Debug)]
pub enum InsightsError {
    /// A file could not be opened or read from disk.
    #[error("Failed to read file {path}: {source}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A JSON document could not be parsed.
    #[error("Failed to parse JSON: {0}")]
    JsonParse(#[from] serde_json::Error),

    /// A time unit name is not one of hour/day/week/month/year.
    #[error("Invalid time unit: {0}")]
    InvalidTimeUnit(String),

    /// A column's length differs from the other columns of its table.
    #[error("Column {column} in table {ref_id} has {actual} values, expected {expected}")]
    RaggedTable {
        ref_id: String,
        column: String,
        expected: usize,
        actual: usize,
    },

    /// A column holds a value that does not match its declared type.
    #[error("Column {column} in table {ref_id} holds a value that is not of type {expected}")]
    ColumnType {
        ref_id: String,
        column: String,
        expected: String,
    },

    /// The given input path does not exist.
    #[error("Data path not found: {0}")]
    DataPathNotFound(PathBuf),

    /// No JSON export files were found under the given directory.
    #[error("No JSON export files found in {0}")]
    NoDataFiles(PathBuf),
}

/// Convenience alias used throughout the insights crates.
pub type Result<T> = std::result::Result<T, InsightsError>;
