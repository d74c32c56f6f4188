//! KPI portal: period-based KPI entry, weighted scoring, and manager
//! approval, exposed over HTTP.

pub mod config;
pub mod error;
pub mod kpi;
pub mod telemetry;

/// In-memory reference implementations of the storage traits, used by the
/// serve/demo commands and by integration tests.
pub mod memory;
