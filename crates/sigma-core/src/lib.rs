//! Core model and computation stages for Verba Sigma.
//!
//! Header recognition, metric selection, column heuristics, the statistics
//! engine and the filter/sort pipeline. Every stage is a pure function of its
//! inputs; I/O lives in `sigma-data` and state in `sigma-runtime`.

pub mod collation;
pub mod columns;
pub mod error;
pub mod filter;
pub mod formatting;
pub mod headers;
pub mod metrics;
pub mod models;
pub mod number;
pub mod settings;
pub mod statistics;
pub mod summary;

pub use error::{Result, SigmaError};
