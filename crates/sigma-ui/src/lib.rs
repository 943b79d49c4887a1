//! Terminal UI layer for Verba Sigma.
//!
//! Themes, the KPI header, month totals, the validation table and the
//! interactive event loop, built on [`ratatui`].

pub mod app;
pub mod components;
pub mod table_view;
pub mod themes;

pub use sigma_core as core;
