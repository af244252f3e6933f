//! Runtime layer for Issue Insights.
//!
//! Hosts the observer registry, the transform stage that re-derives the
//! insight tables on every input change, the cached snapshot source and the
//! background refresh loop.

pub mod data_manager;
pub mod observer;
pub mod orchestrator;
pub mod pipeline;

pub use insights_core as core;
pub use insights_data as data;
