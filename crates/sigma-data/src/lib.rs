//! Data access layer for Verba Sigma.
//!
//! Reading spreadsheets, the import pipeline, record aggregation, the
//! persisted state store and report exports.

pub mod aggregator;
pub mod export;
pub mod import;
pub mod reader;
pub mod store;

pub use sigma_core as core;
