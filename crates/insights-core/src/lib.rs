//! Core types for issue-insights.
//!
//! Holds the tabular data model shared by every pipeline stage, the table
//! lookup helpers, calendar truncation, issue export models, settings and
//! plain-text formatting.

pub mod error;
pub mod formatting;
pub mod lookup;
pub mod models;
pub mod settings;
pub mod table;
pub mod time_utils;

pub use error::{InsightsError, Result};
pub use table::{Column, FieldType, Table, Value};
pub use time_utils::TimeUnit;
