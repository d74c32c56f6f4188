use serde::{Deserialize, Serialize};

use super::access::ActorContext;
use super::display::{result_view, ResultView};
use super::domain::{Employee, KpiDefinition, KpiResult, Period, ResultId};

/// Denormalized repository row: the result plus the KPI configuration and the
/// owning employee the core functions consume.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KpiResultRecord {
    pub id: ResultId,
    pub result: KpiResult,
    pub kpi: KpiDefinition,
    pub owner: Employee,
}

impl KpiResultRecord {
    pub fn view(&self) -> ResultView {
        result_view(&self.id, &self.result, &self.kpi, &self.owner)
    }

    /// Upsert identity used by bulk import.
    pub fn import_key(&self) -> (Period, &str, &str) {
        (
            self.result.period,
            self.owner.username.as_str(),
            self.kpi.name.as_str(),
        )
    }
}

/// Storage abstraction so the service module can be exercised in isolation.
pub trait ResultRepository: Send + Sync {
    fn insert(&self, record: KpiResultRecord) -> Result<KpiResultRecord, RepositoryError>;
    fn update(&self, record: KpiResultRecord) -> Result<(), RepositoryError>;
    fn fetch(&self, id: &ResultId) -> Result<Option<KpiResultRecord>, RepositoryError>;
    fn for_employee(&self, username: &str) -> Result<Vec<KpiResultRecord>, RepositoryError>;
    fn find_by_key(
        &self,
        period: Period,
        username: &str,
        kpi_name: &str,
    ) -> Result<Option<KpiResultRecord>, RepositoryError>;
}

/// Error enumeration for repository failures.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("record already exists")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}

/// Directory lookups backing actor resolution and import references.
pub trait Directory: Send + Sync {
    fn resolve_actor(&self, username: &str) -> Result<ActorContext, DirectoryError>;
    fn employee_by_username(&self, username: &str) -> Result<Option<Employee>, DirectoryError>;
    fn employees(&self) -> Result<Vec<Employee>, DirectoryError>;
    fn kpi_by_name(&self, name: &str) -> Result<Option<KpiDefinition>, DirectoryError>;
}

#[derive(Debug, thiserror::Error)]
pub enum DirectoryError {
    #[error("directory unavailable: {0}")]
    Unavailable(String),
}

/// Outbound hook fired when a manager approves (locks) a record.
pub trait ApprovalNotifier: Send + Sync {
    fn publish(&self, notice: ApprovalNotice) -> Result<(), NotifyError>;
}

/// Approval payload so routes/tests can assert the integration boundary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApprovalNotice {
    pub result_id: ResultId,
    pub employee: String,
    pub kpi_name: String,
    pub approved_by: String,
}

#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("notification transport unavailable: {0}")]
    Transport(String),
}
