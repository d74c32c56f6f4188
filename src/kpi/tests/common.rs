use std::sync::Arc;

use axum::response::Response;
use serde_json::Value;

use crate::kpi::domain::{
    Department, Employee, KpiDefinition, KpiResult, KpiType, Period, ReportMonth, ResultId,
    Semester,
};
use crate::kpi::repository::{KpiResultRecord, ResultRepository};
use crate::kpi::router::kpi_router;
use crate::kpi::service::KpiPortalService;
use crate::memory::{MemoryDirectory, MemoryNotifier, MemoryRepository};

pub(super) fn operations() -> Department {
    Department {
        name: "Operations".to_string(),
        group: "Plant".to_string(),
    }
}

pub(super) fn quality() -> Department {
    Department {
        name: "Quality".to_string(),
        group: "Plant".to_string(),
    }
}

pub(super) fn finance() -> Department {
    Department {
        name: "Finance".to_string(),
        group: "Back Office".to_string(),
    }
}

pub(super) fn employee(username: &str, level: u8, department: Department) -> Employee {
    Employee {
        username: username.to_string(),
        name: format!("{username} (test)"),
        department,
        level,
        active: true,
    }
}

/// Individual contributor owning the sample records.
pub(super) fn owner() -> Employee {
    employee("linh", 2, operations())
}

/// Department manager for the owner's department.
pub(super) fn dept_manager() -> Employee {
    employee("mai", 1, operations())
}

/// Group manager in a sibling department of the same group.
pub(super) fn group_manager() -> Employee {
    employee("hoa", 0, quality())
}

/// Contributor in a different department and group.
pub(super) fn outsider() -> Employee {
    employee("tuan", 2, finance())
}

/// Department manager of an unrelated department and group.
pub(super) fn foreign_manager() -> Employee {
    employee("ngoc", 1, finance())
}

pub(super) fn kpi(kpi_type: KpiType) -> KpiDefinition {
    KpiDefinition::new("Throughput", kpi_type)
}

pub(super) fn percentage_kpi() -> KpiDefinition {
    let mut kpi = kpi(KpiType::BiggerIsBetter);
    kpi.uses_percentage_calculation = true;
    kpi
}

pub(super) fn period() -> Period {
    Period {
        year: 2025,
        semester: Semester::Second,
        month: ReportMonth::M1,
    }
}

pub(super) fn result_with(
    weight: f64,
    target_set: Option<f64>,
    target_input: Option<f64>,
    achievement: Option<f64>,
) -> KpiResult {
    let mut result = KpiResult::new(period());
    result.weight = Some(weight);
    result.target_set = target_set;
    result.target_input = target_input;
    result.achievement = achievement;
    result
}

pub(super) fn record(id: &str, result: KpiResult, kpi: KpiDefinition) -> KpiResultRecord {
    KpiResultRecord {
        id: ResultId(id.to_string()),
        result,
        kpi,
        owner: owner(),
    }
}

pub(super) fn directory() -> MemoryDirectory {
    let mut percentage = percentage_kpi();
    percentage.name = "On-time delivery".to_string();

    let mut external = kpi(KpiType::MistakeCount);
    external.name = "Safety incidents".to_string();
    external.from_external_system = true;

    let mut cost = kpi(KpiType::SmallerIsBetter);
    cost.name = "Unit cost".to_string();

    MemoryDirectory::new(
        vec!["admin".to_string()],
        vec![
            owner(),
            dept_manager(),
            group_manager(),
            outsider(),
            foreign_manager(),
        ],
        vec![kpi(KpiType::BiggerIsBetter), percentage, external, cost],
    )
}

pub(super) type TestService =
    KpiPortalService<MemoryRepository, MemoryDirectory, MemoryNotifier>;

pub(super) fn build_service() -> (Arc<TestService>, Arc<MemoryRepository>, Arc<MemoryNotifier>) {
    let repository = Arc::new(MemoryRepository::default());
    let notifier = Arc::new(MemoryNotifier::default());
    let service = Arc::new(KpiPortalService::new(
        repository.clone(),
        Arc::new(directory()),
        notifier.clone(),
    ));
    (service, repository, notifier)
}

pub(super) fn seeded_service() -> (Arc<TestService>, Arc<MemoryRepository>, Arc<MemoryNotifier>) {
    let (service, repository, notifier) = build_service();

    let mut throughput = result_with(0.2, Some(100.0), Some(100.0), Some(80.0));
    crate::kpi::scoring::recompute_on_save(&mut throughput, &kpi(KpiType::BiggerIsBetter));
    repository
        .insert(record("r-throughput", throughput, kpi(KpiType::BiggerIsBetter)))
        .expect("seed throughput row");

    let mut delivery_kpi = percentage_kpi();
    delivery_kpi.name = "On-time delivery".to_string();
    let mut delivery = result_with(0.25, Some(0.9), Some(50.0), Some(45.0));
    crate::kpi::scoring::recompute_on_save(&mut delivery, &delivery_kpi);
    repository
        .insert(record("r-delivery", delivery, delivery_kpi))
        .expect("seed delivery row");

    (service, repository, notifier)
}

pub(super) fn test_router(service: Arc<TestService>) -> axum::Router {
    kpi_router(service)
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
