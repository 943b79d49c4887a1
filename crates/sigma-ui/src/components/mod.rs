pub mod header;
pub mod totals;
