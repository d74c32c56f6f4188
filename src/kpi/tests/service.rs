use super::common::*;
use crate::kpi::access::KpiField;
use crate::kpi::domain::ResultId;
use crate::kpi::repository::ResultRepository;
use crate::kpi::service::{EntryUpdate, OverviewFilter, PortalError};

fn id(raw: &str) -> ResultId {
    ResultId(raw.to_string())
}

#[test]
fn save_entry_recomputes_the_final_result() {
    let (service, repository, _) = seeded_service();

    let outcome = service
        .save_entry(
            "linh",
            &id("r-throughput"),
            EntryUpdate {
                achievement: Some("90".to_string()),
                target_input: None,
            },
        )
        .expect("entry saves");

    assert_eq!(outcome.record.result.achievement, Some(90.0));
    let stored = repository
        .fetch(&id("r-throughput"))
        .expect("fetch succeeds")
        .expect("record present");
    let final_result = stored.result.final_result.expect("derived");
    assert!((final_result - 0.18).abs() < 1e-12);
}

#[test]
fn save_entry_tolerates_comma_grouping() {
    let (service, _, _) = seeded_service();

    let outcome = service
        .save_entry(
            "linh",
            &id("r-delivery"),
            EntryUpdate {
                achievement: None,
                target_input: Some("1,250.5".to_string()),
            },
        )
        .expect("entry saves");

    assert_eq!(outcome.record.result.target_input, Some(1250.5));
}

#[test]
fn save_entry_clears_fields_on_empty_strings() {
    let (service, _, _) = seeded_service();

    let outcome = service
        .save_entry(
            "linh",
            &id("r-throughput"),
            EntryUpdate {
                achievement: Some("".to_string()),
                target_input: None,
            },
        )
        .expect("entry saves");

    assert_eq!(outcome.record.result.achievement, None);
    // unset achievement is the defined zero-score state
    assert_eq!(outcome.record.result.final_result, Some(0.0));
}

#[test]
fn save_entry_rejects_malformed_numbers() {
    let (service, _, _) = seeded_service();

    match service.save_entry(
        "linh",
        &id("r-throughput"),
        EntryUpdate {
            achievement: Some("eighty".to_string()),
            target_input: None,
        },
    ) {
        Err(PortalError::InvalidNumericInput { field, value }) => {
            assert_eq!(field, KpiField::Achievement);
            assert_eq!(value, "eighty");
        }
        other => panic!("expected invalid numeric input, got {other:?}"),
    }
}

#[test]
fn save_entry_rejects_working_target_on_non_percentage_kpis() {
    let (service, _, _) = seeded_service();

    match service.save_entry(
        "linh",
        &id("r-throughput"),
        EntryUpdate {
            achievement: None,
            target_input: Some("55".to_string()),
        },
    ) {
        Err(PortalError::EditNotPermitted { field }) => {
            assert_eq!(field, KpiField::TargetInput);
        }
        other => panic!("expected edit rejection, got {other:?}"),
    }
}

#[test]
fn save_entry_rejects_owner_edits_on_locked_records() {
    let (service, repository, _) = seeded_service();

    let mut record = repository
        .fetch(&id("r-throughput"))
        .expect("fetch succeeds")
        .expect("record present");
    record.result.is_locked = true;
    repository.update(record).expect("lock persists");

    match service.save_entry(
        "linh",
        &id("r-throughput"),
        EntryUpdate {
            achievement: Some("95".to_string()),
            target_input: None,
        },
    ) {
        Err(PortalError::EditNotPermitted { field }) => {
            assert_eq!(field, KpiField::Achievement);
        }
        other => panic!("expected edit rejection, got {other:?}"),
    }

    // the department manager still gets through
    service
        .save_entry(
            "mai",
            &id("r-throughput"),
            EntryUpdate {
                achievement: Some("95".to_string()),
                target_input: None,
            },
        )
        .expect("manager edits locked record");
}

#[test]
fn save_entry_warns_on_suspect_percent_entries() {
    let (service, _, _) = seeded_service();

    let outcome = service
        .save_entry(
            "linh",
            &id("r-delivery"),
            EntryUpdate {
                achievement: Some("45".to_string()),
                target_input: None,
            },
        )
        .expect("entry saves");

    let warning = outcome.warning.expect("warning raised");
    assert!(warning.contains("0.45"));
}

#[test]
fn save_entry_requires_a_known_actor() {
    let (service, _, _) = seeded_service();

    match service.save_entry(
        "ghost",
        &id("r-throughput"),
        EntryUpdate::default(),
    ) {
        Err(PortalError::UnknownActor(username)) => assert_eq!(username, "ghost"),
        other => panic!("expected unknown actor, got {other:?}"),
    }
}

#[test]
fn save_entry_propagates_missing_records() {
    let (service, _, _) = build_service();

    match service.save_entry("linh", &id("r-none"), EntryUpdate::default()) {
        Err(PortalError::NotFound) => {}
        other => panic!("expected not found, got {other:?}"),
    }
}

#[test]
fn lock_requires_a_reviewer_in_scope() {
    let (service, _, notifier) = seeded_service();

    match service.lock("linh", &id("r-throughput")) {
        Err(PortalError::ApprovalNotPermitted) => {}
        other => panic!("expected approval rejection, got {other:?}"),
    }
    match service.lock("ngoc", &id("r-throughput")) {
        Err(PortalError::ApprovalNotPermitted) => {}
        other => panic!("expected approval rejection, got {other:?}"),
    }
    assert!(notifier.notices().is_empty());
}

#[test]
fn lock_stamps_the_approval_and_notifies() {
    let (service, repository, notifier) = seeded_service();

    let record = service.lock("mai", &id("r-throughput")).expect("lock succeeds");
    assert!(record.result.is_locked);
    assert!(record.result.locked_at.is_some());

    let stored = repository
        .fetch(&id("r-throughput"))
        .expect("fetch succeeds")
        .expect("record present");
    assert!(stored.result.is_locked);

    let notices = notifier.notices();
    assert_eq!(notices.len(), 1);
    assert_eq!(notices[0].employee, "linh");
    assert_eq!(notices[0].approved_by, "mai");
}

#[test]
fn unlock_releases_the_approval() {
    let (service, _, _) = seeded_service();

    service.lock("mai", &id("r-throughput")).expect("lock succeeds");
    let record = service
        .unlock("hoa", &id("r-throughput"))
        .expect("group manager unlocks");
    assert!(!record.result.is_locked);
    assert_eq!(record.result.locked_at, None);
}

#[test]
fn inactive_records_cannot_be_approved() {
    let (service, repository, _) = seeded_service();

    let mut record = repository
        .fetch(&id("r-throughput"))
        .expect("fetch succeeds")
        .expect("record present");
    record.result.active = false;
    repository.update(record).expect("update persists");

    match service.lock("mai", &id("r-throughput")) {
        Err(PortalError::ApprovalNotPermitted) => {}
        other => panic!("expected approval rejection, got {other:?}"),
    }
}

#[test]
fn overview_totals_the_weighted_scores() {
    let (service, _, _) = seeded_service();

    let overview = service
        .overview("linh", "linh", OverviewFilter::default())
        .expect("overview loads");

    assert_eq!(overview.results.len(), 2);
    // 0.16 (throughput) + 0.25 (delivery)
    assert_eq!(overview.total_score, "41.00%");
    // sorted by KPI name
    assert_eq!(overview.results[0].kpi_name, "On-time delivery");
}

#[test]
fn overview_is_scoped() {
    let (service, _, _) = seeded_service();

    match service.overview("tuan", "linh", OverviewFilter::default()) {
        Err(PortalError::EditNotPermitted { .. }) => {}
        other => panic!("expected scope rejection, got {other:?}"),
    }

    service
        .overview("mai", "linh", OverviewFilter::default())
        .expect("manager in scope reads the grid");
    service
        .overview("admin", "linh", OverviewFilter::default())
        .expect("superadmin reads the grid");
}

#[test]
fn overview_filter_narrows_by_period() {
    let (service, _, _) = seeded_service();

    let overview = service
        .overview(
            "linh",
            "linh",
            OverviewFilter {
                year: Some(2024),
                semester: None,
                month: None,
            },
        )
        .expect("overview loads");
    assert!(overview.results.is_empty());
    assert_eq!(overview.total_score, "0.00%");
}

#[test]
fn dashboard_aggregates_the_employees_rows() {
    let (service, _, _) = seeded_service();
    service.lock("mai", &id("r-throughput")).expect("lock succeeds");

    let stats = service.dashboard("linh", "linh").expect("dashboard loads");
    assert_eq!(stats.total_kpis, 2);
    assert_eq!(stats.approved, 1);
    assert_eq!(stats.pending, 1);
    assert_eq!(stats.completion_rate, 50);
}

#[test]
fn dashboard_is_scoped_like_the_overview() {
    let (service, _, _) = seeded_service();

    match service.dashboard("tuan", "linh") {
        Err(PortalError::EditNotPermitted { .. }) => {}
        other => panic!("expected scope rejection, got {other:?}"),
    }
    service
        .dashboard("mai", "linh")
        .expect("manager in scope reads the dashboard");
}

#[test]
fn team_report_covers_the_reviewers_staff() {
    let (service, _, _) = seeded_service();

    // department manager: own department only
    let report = service.team_report("mai").expect("manager report");
    assert_eq!(report.summary.total_staff, 2);
    assert_eq!(report.summary.done, 0);
    // both seeded scores sit under the anomaly floor
    assert_eq!(report.anomalies.len(), 2);
    assert_eq!(report.anomalies[0].id.0, "r-delivery");

    // group manager: every department of the group
    let report = service.team_report("hoa").expect("group manager report");
    assert_eq!(report.summary.total_staff, 3);
}

#[test]
fn team_report_requires_reviewees() {
    let (service, _, _) = seeded_service();

    match service.team_report("linh") {
        Err(PortalError::ApprovalNotPermitted) => {}
        other => panic!("expected approval rejection, got {other:?}"),
    }
}

#[test]
fn import_is_superadmin_only() {
    let (service, _, _) = seeded_service();

    match service.import_results("mai", b"year,semester,employee,kpi,weight,target_set,achievement,month\n") {
        Err(PortalError::ImportNotPermitted) => {}
        other => panic!("expected import rejection, got {other:?}"),
    }
}
