//! Placement ledger for a summer work travel exchange: students apply to seasonal jobs,
//! administrators review them, and generated marketing content is drafted on the side.

pub mod config;
pub mod content;
pub mod error;
pub mod placement;
pub mod telemetry;
