//! KPI entry, weighted scoring, approval workflow, and reporting.
//!
//! The scoring engine and the editable-fields resolver are pure functions in
//! `scoring` and `access`; everything else is the service scaffolding that
//! feeds them: repository traits, CSV import, display formatting, dashboard
//! aggregation, and the HTTP router.

pub mod access;
pub mod display;
pub mod domain;
pub mod import;
pub mod report;
pub mod repository;
pub mod router;
pub mod scoring;
pub mod service;

#[cfg(test)]
mod tests;

pub use access::{resolve_editable_fields, ActorContext, ActorRole, KpiField};
pub use display::ResultView;
pub use domain::{
    Department, Employee, KpiDefinition, KpiResult, KpiType, Period, ReportMonth, ResultId,
    Semester,
};
pub use import::{ImportDefaults, ImportError, ImportSummary};
pub use report::{anomalies, DashboardStats, TeamSummary};
pub use repository::{
    ApprovalNotice, ApprovalNotifier, Directory, DirectoryError, KpiResultRecord, NotifyError,
    RepositoryError, ResultRepository,
};
pub use router::kpi_router;
pub use scoring::{compute_final_result, normalize_before_save, recompute_on_save};
pub use service::{
    EntryUpdate, KpiPortalService, Overview, OverviewFilter, PortalError, ResultDetail,
    SaveOutcome, TeamReport,
};
