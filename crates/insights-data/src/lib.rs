//! Data layer for Issue Insights.
//!
//! Loads issue exports into tables and runs the label and time-bucket
//! aggregation pipelines over them.

pub mod labels;
pub mod overview;
pub mod reader;
pub mod timeseries;

pub use insights_core as core;
pub use labels::aggregate_labels;
pub use timeseries::aggregate_by_time;
