use std::io::Cursor;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::info;

use super::access::{resolve_editable_fields, ActorContext, ActorRole, KpiField};
use super::display::ResultView;
use super::domain::{KpiType, ResultId};
use super::import::{self, ImportDefaults, ImportError, ImportSummary};
use super::report::{self, DashboardStats, TeamSummary};
use super::repository::{
    ApprovalNotice, ApprovalNotifier, Directory, DirectoryError, KpiResultRecord, NotifyError,
    RepositoryError, ResultRepository,
};
use super::scoring;

/// Entry-grid submission for one result row. Values arrive as text because
/// the caller owns numeric validation; commas are tolerated, an empty string
/// clears the field, and an absent field is left untouched.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EntryUpdate {
    pub achievement: Option<String>,
    pub target_input: Option<String>,
}

/// Result of a successful save, with the optional data-entry warning the
/// entry grid surfaces next to the row.
#[derive(Debug, Clone, Serialize)]
pub struct SaveOutcome {
    pub record: KpiResultRecord,
    pub warning: Option<String>,
}

/// Filter for the overview listing; `None` means no restriction.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OverviewFilter {
    pub year: Option<i32>,
    pub semester: Option<String>,
    pub month: Option<String>,
}

/// Overview payload: formatted rows plus the period total line.
#[derive(Debug, Clone, Serialize)]
pub struct Overview {
    pub results: Vec<ResultView>,
    pub total_score: String,
}

/// Detail payload: the formatted row plus what the requesting actor may edit.
#[derive(Debug, Clone, Serialize)]
pub struct ResultDetail {
    pub view: ResultView,
    pub editable_fields: Vec<KpiField>,
}

/// Manager command-center payload: team aggregates plus the out-of-band rows.
#[derive(Debug, Clone, Serialize)]
pub struct TeamReport {
    pub summary: TeamSummary,
    pub anomalies: Vec<ResultView>,
}

/// Achievements above this on a bigger-is-better KPI look like a raw percent
/// typed where a fraction was expected.
const SUSPECT_PERCENT_THRESHOLD: f64 = 1.5;

/// Service composing the repository, the directory, and the approval
/// notifier around the scoring and access cores.
pub struct KpiPortalService<R, D, N> {
    repository: Arc<R>,
    directory: Arc<D>,
    notifier: Arc<N>,
    import_defaults: ImportDefaults,
}

impl<R, D, N> KpiPortalService<R, D, N>
where
    R: ResultRepository + 'static,
    D: Directory + 'static,
    N: ApprovalNotifier + 'static,
{
    pub fn new(repository: Arc<R>, directory: Arc<D>, notifier: Arc<N>) -> Self {
        Self::with_defaults(repository, directory, notifier, ImportDefaults::default())
    }

    pub fn with_defaults(
        repository: Arc<R>,
        directory: Arc<D>,
        notifier: Arc<N>,
        import_defaults: ImportDefaults,
    ) -> Self {
        Self {
            repository,
            directory,
            notifier,
            import_defaults,
        }
    }

    fn actor(&self, username: &str) -> Result<ActorContext, PortalError> {
        match self.directory.resolve_actor(username)? {
            ActorContext::Unknown => Err(PortalError::UnknownActor(username.to_string())),
            actor => Ok(actor),
        }
    }

    /// Persist an entry-grid submission, enforcing the editable-field set at
    /// the assignment boundary and rederiving the final result.
    pub fn save_entry(
        &self,
        actor_username: &str,
        id: &ResultId,
        update: EntryUpdate,
    ) -> Result<SaveOutcome, PortalError> {
        let actor = self.actor(actor_username)?;
        let mut record = self
            .repository
            .fetch(id)?
            .ok_or(PortalError::NotFound)?;

        let editable =
            resolve_editable_fields(&actor, &record.result, &record.kpi, &record.owner);

        let mut warning = None;

        if let Some(raw) = update.achievement {
            if !editable.contains(&KpiField::Achievement) {
                return Err(PortalError::EditNotPermitted {
                    field: KpiField::Achievement,
                });
            }
            let value = parse_decimal(KpiField::Achievement, &raw)?;
            if let Some(value) = value {
                if record.kpi.kpi_type == KpiType::BiggerIsBetter
                    && value > SUSPECT_PERCENT_THRESHOLD
                {
                    warning = Some(format!(
                        "Did you mean {:.2} ({value}%)? Percent KPIs expect 0.1 for 10%.",
                        value / 100.0
                    ));
                }
            }
            record.result.achievement = value;
        }

        if let Some(raw) = update.target_input {
            if !editable.contains(&KpiField::TargetInput) {
                return Err(PortalError::EditNotPermitted {
                    field: KpiField::TargetInput,
                });
            }
            record.result.target_input = parse_decimal(KpiField::TargetInput, &raw)?;
        }

        scoring::recompute_on_save(&mut record.result, &record.kpi);
        self.repository.update(record.clone())?;

        info!(
            result = %record.id.0,
            actor = actor_username,
            final_result = ?record.result.final_result,
            "kpi entry saved"
        );

        Ok(SaveOutcome { record, warning })
    }

    /// Approve a record: managers and superadmins in scope only. Locking
    /// stamps the approval date and publishes a notice.
    pub fn lock(&self, actor_username: &str, id: &ResultId) -> Result<KpiResultRecord, PortalError> {
        let mut record = self.reviewed_record(actor_username, id)?;

        record.result.is_locked = true;
        record.result.locked_at = Some(chrono::Local::now().date_naive());
        self.repository.update(record.clone())?;

        self.notifier.publish(ApprovalNotice {
            result_id: record.id.clone(),
            employee: record.owner.username.clone(),
            kpi_name: record.kpi.name.clone(),
            approved_by: actor_username.to_string(),
        })?;

        info!(result = %record.id.0, approved_by = actor_username, "kpi record locked");
        Ok(record)
    }

    /// Release an approval lock so the owner can resume editing.
    pub fn unlock(
        &self,
        actor_username: &str,
        id: &ResultId,
    ) -> Result<KpiResultRecord, PortalError> {
        let mut record = self.reviewed_record(actor_username, id)?;

        record.result.is_locked = false;
        record.result.locked_at = None;
        self.repository.update(record.clone())?;
        Ok(record)
    }

    fn reviewed_record(
        &self,
        actor_username: &str,
        id: &ResultId,
    ) -> Result<KpiResultRecord, PortalError> {
        let actor = self.actor(actor_username)?;
        let record = self
            .repository
            .fetch(id)?
            .ok_or(PortalError::NotFound)?;

        if !record.result.active || !actor.role_for(&record.owner).is_reviewer() {
            return Err(PortalError::ApprovalNotPermitted);
        }
        Ok(record)
    }

    /// Fetch a record with the requesting actor's editable-field set.
    pub fn get(&self, actor_username: &str, id: &ResultId) -> Result<ResultDetail, PortalError> {
        let actor = self.actor(actor_username)?;
        let record = self
            .repository
            .fetch(id)?
            .ok_or(PortalError::NotFound)?;

        let editable =
            resolve_editable_fields(&actor, &record.result, &record.kpi, &record.owner);
        Ok(ResultDetail {
            view: record.view(),
            editable_fields: editable.into_iter().collect(),
        })
    }

    /// List an employee's rows for the entry grid, with the total-score line.
    /// The actor must be the employee themselves, a manager in scope, or a
    /// superadmin.
    pub fn overview(
        &self,
        actor_username: &str,
        employee_username: &str,
        filter: OverviewFilter,
    ) -> Result<Overview, PortalError> {
        let actor = self.actor(actor_username)?;
        let owner = self
            .directory
            .employee_by_username(employee_username)?
            .ok_or(PortalError::NotFound)?;

        if actor.role_for(&owner) == ActorRole::Other {
            return Err(PortalError::EditNotPermitted {
                field: KpiField::Employee,
            });
        }

        let mut records = self.repository.for_employee(&owner.username)?;
        records.retain(|record| {
            filter
                .year
                .map(|year| record.result.period.year == year)
                .unwrap_or(true)
                && filter
                    .semester
                    .as_deref()
                    .map(|sem| record.result.period.semester.label().eq_ignore_ascii_case(sem))
                    .unwrap_or(true)
                && filter
                    .month
                    .as_deref()
                    .map(|month| record.result.period.month.label().eq_ignore_ascii_case(month))
                    .unwrap_or(true)
        });
        records.sort_by(|a, b| a.kpi.name.cmp(&b.kpi.name));

        let total: f64 = records
            .iter()
            .map(|record| record.result.final_result.unwrap_or(0.0))
            .sum();
        let results = records.iter().map(KpiResultRecord::view).collect();

        Ok(Overview {
            results,
            total_score: super::display::percent_2(total),
        })
    }

    /// Personal dashboard aggregates for one employee, visible to the
    /// employee themselves and managers in scope.
    pub fn dashboard(
        &self,
        actor_username: &str,
        employee_username: &str,
    ) -> Result<DashboardStats, PortalError> {
        let actor = self.actor(actor_username)?;
        let owner = self
            .directory
            .employee_by_username(employee_username)?
            .ok_or(PortalError::NotFound)?;

        if actor.role_for(&owner) == ActorRole::Other {
            return Err(PortalError::EditNotPermitted {
                field: KpiField::Employee,
            });
        }

        let records = self.repository.for_employee(&owner.username)?;
        Ok(DashboardStats::from_records(&records))
    }

    /// Command-center report over every employee the actor reviews. Rejected
    /// when the actor reviews no one.
    pub fn team_report(&self, actor_username: &str) -> Result<TeamReport, PortalError> {
        let actor = self.actor(actor_username)?;
        let staff: Vec<_> = self
            .directory
            .employees()?
            .into_iter()
            .filter(|employee| actor.role_for(employee).is_reviewer())
            .collect();
        if staff.is_empty() {
            return Err(PortalError::ApprovalNotPermitted);
        }

        let mut records = Vec::new();
        for employee in &staff {
            records.extend(self.repository.for_employee(&employee.username)?);
        }

        Ok(TeamReport {
            summary: TeamSummary::from_records(&records, staff.len()),
            anomalies: report::anomalies(&records),
        })
    }

    /// Bulk-import result rows from a CSV sheet. Superadmin only.
    pub fn import_results(
        &self,
        actor_username: &str,
        csv_bytes: &[u8],
    ) -> Result<ImportSummary, PortalError> {
        let actor = self.actor(actor_username)?;
        if actor != ActorContext::SuperAdmin {
            return Err(PortalError::ImportNotPermitted);
        }

        let summary = import::import_results(
            Cursor::new(csv_bytes),
            self.repository.as_ref(),
            self.directory.as_ref(),
            self.import_defaults,
        )?;

        info!(
            created = summary.created,
            updated = summary.updated,
            actor = actor_username,
            "kpi results imported"
        );
        Ok(summary)
    }
}

fn parse_decimal(field: KpiField, raw: &str) -> Result<Option<f64>, PortalError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    trimmed
        .replace(',', "")
        .parse::<f64>()
        .map(Some)
        .map_err(|_| PortalError::InvalidNumericInput {
            field,
            value: raw.to_string(),
        })
}

/// Error raised by the portal service.
#[derive(Debug, thiserror::Error)]
pub enum PortalError {
    #[error("no employee profile for '{0}'")]
    UnknownActor(String),
    #[error("record not found")]
    NotFound,
    #[error("field '{}' is not editable in the current state", field.label())]
    EditNotPermitted { field: KpiField },
    #[error("invalid number '{value}' for field '{}'", field.label())]
    InvalidNumericInput { field: KpiField, value: String },
    #[error("only managers in scope may approve or release records")]
    ApprovalNotPermitted,
    #[error("only superadmins may bulk import results")]
    ImportNotPermitted,
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    #[error(transparent)]
    Directory(#[from] DirectoryError),
    #[error(transparent)]
    Notify(#[from] NotifyError),
    #[error(transparent)]
    Import(#[from] ImportError),
}
