//! Runtime layer for Verba Sigma.
//!
//! Owns the analysis state and keeps every derived collection in step with
//! the user's parameters.

pub mod session;

pub use sigma_core as core;
pub use sigma_data as data;
