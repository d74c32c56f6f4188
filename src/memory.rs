use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::kpi::{
    ActorContext, ApprovalNotice, ApprovalNotifier, Directory, DirectoryError, Employee,
    KpiDefinition, KpiResultRecord, NotifyError, Period, RepositoryError, ResultId,
    ResultRepository,
};

/// Mutex-backed record store. Last write wins, which is acceptable because
/// score recomputation is idempotent.
#[derive(Default, Clone)]
pub struct MemoryRepository {
    records: Arc<Mutex<HashMap<ResultId, KpiResultRecord>>>,
}

impl ResultRepository for MemoryRepository {
    fn insert(&self, record: KpiResultRecord) -> Result<KpiResultRecord, RepositoryError> {
        let mut guard = self.records.lock().expect("repository mutex poisoned");
        if guard.contains_key(&record.id) {
            return Err(RepositoryError::Conflict);
        }
        guard.insert(record.id.clone(), record.clone());
        Ok(record)
    }

    fn update(&self, record: KpiResultRecord) -> Result<(), RepositoryError> {
        let mut guard = self.records.lock().expect("repository mutex poisoned");
        guard.insert(record.id.clone(), record);
        Ok(())
    }

    fn fetch(&self, id: &ResultId) -> Result<Option<KpiResultRecord>, RepositoryError> {
        let guard = self.records.lock().expect("repository mutex poisoned");
        Ok(guard.get(id).cloned())
    }

    fn for_employee(&self, username: &str) -> Result<Vec<KpiResultRecord>, RepositoryError> {
        let guard = self.records.lock().expect("repository mutex poisoned");
        Ok(guard
            .values()
            .filter(|record| record.owner.username == username)
            .cloned()
            .collect())
    }

    fn find_by_key(
        &self,
        period: Period,
        username: &str,
        kpi_name: &str,
    ) -> Result<Option<KpiResultRecord>, RepositoryError> {
        let guard = self.records.lock().expect("repository mutex poisoned");
        Ok(guard
            .values()
            .find(|record| {
                record.result.period == period
                    && record.owner.username == username
                    && record.kpi.name == kpi_name
            })
            .cloned())
    }
}

impl MemoryRepository {
    pub fn all(&self) -> Vec<KpiResultRecord> {
        let guard = self.records.lock().expect("repository mutex poisoned");
        guard.values().cloned().collect()
    }
}

/// Directory over fixed employee and KPI lists plus a superadmin allowlist.
#[derive(Default, Clone)]
pub struct MemoryDirectory {
    superadmins: Vec<String>,
    employees: Vec<Employee>,
    kpis: Vec<KpiDefinition>,
}

impl MemoryDirectory {
    pub fn new(
        superadmins: Vec<String>,
        employees: Vec<Employee>,
        kpis: Vec<KpiDefinition>,
    ) -> Self {
        Self {
            superadmins,
            employees,
            kpis,
        }
    }
}

impl Directory for MemoryDirectory {
    fn resolve_actor(&self, username: &str) -> Result<ActorContext, DirectoryError> {
        if self.superadmins.iter().any(|name| name == username) {
            return Ok(ActorContext::SuperAdmin);
        }
        Ok(self
            .employees
            .iter()
            .find(|employee| employee.username == username)
            .cloned()
            .map(ActorContext::Staff)
            .unwrap_or(ActorContext::Unknown))
    }

    fn employee_by_username(&self, username: &str) -> Result<Option<Employee>, DirectoryError> {
        Ok(self
            .employees
            .iter()
            .find(|employee| employee.username == username)
            .cloned())
    }

    fn employees(&self) -> Result<Vec<Employee>, DirectoryError> {
        Ok(self.employees.clone())
    }

    fn kpi_by_name(&self, name: &str) -> Result<Option<KpiDefinition>, DirectoryError> {
        Ok(self.kpis.iter().find(|kpi| kpi.name == name).cloned())
    }
}

/// Captures approval notices so tests and the demo command can inspect them.
#[derive(Default, Clone)]
pub struct MemoryNotifier {
    notices: Arc<Mutex<Vec<ApprovalNotice>>>,
}

impl MemoryNotifier {
    pub fn notices(&self) -> Vec<ApprovalNotice> {
        self.notices.lock().expect("notifier mutex poisoned").clone()
    }
}

impl ApprovalNotifier for MemoryNotifier {
    fn publish(&self, notice: ApprovalNotice) -> Result<(), NotifyError> {
        self.notices
            .lock()
            .expect("notifier mutex poisoned")
            .push(notice);
        Ok(())
    }
}
