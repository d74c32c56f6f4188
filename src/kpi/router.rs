use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use serde_json::json;

use super::domain::ResultId;
use super::import::ImportError;
use super::repository::{ApprovalNotifier, Directory, ResultRepository};
use super::service::{EntryUpdate, KpiPortalService, OverviewFilter, PortalError};

const ACTOR_HEADER: &str = "x-portal-user";

/// Router builder exposing the entry grid, approval, dashboard, and import
/// endpoints.
/// The acting user arrives in the `x-portal-user` header; resolving it to a
/// role and scope happens in the service, not here.
pub fn kpi_router<R, D, N>(service: Arc<KpiPortalService<R, D, N>>) -> Router
where
    R: ResultRepository + 'static,
    D: Directory + 'static,
    N: ApprovalNotifier + 'static,
{
    Router::new()
        .route("/api/v1/kpi/results/:result_id", get(detail_handler::<R, D, N>))
        .route(
            "/api/v1/kpi/results/:result_id/entry",
            post(entry_handler::<R, D, N>),
        )
        .route(
            "/api/v1/kpi/results/:result_id/lock",
            post(lock_handler::<R, D, N>),
        )
        .route(
            "/api/v1/kpi/results/:result_id/unlock",
            post(unlock_handler::<R, D, N>),
        )
        .route("/api/v1/kpi/overview", get(overview_handler::<R, D, N>))
        .route("/api/v1/kpi/dashboard", get(dashboard_handler::<R, D, N>))
        .route("/api/v1/kpi/team", get(team_handler::<R, D, N>))
        .route("/api/v1/kpi/import", post(import_handler::<R, D, N>))
        .with_state(service)
}

fn actor_from(headers: &HeaderMap) -> Result<String, Response> {
    headers
        .get(ACTOR_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string)
        .ok_or_else(|| {
            let payload = json!({ "error": "missing x-portal-user header" });
            (StatusCode::UNAUTHORIZED, axum::Json(payload)).into_response()
        })
}

fn error_response(error: PortalError) -> Response {
    let status = match &error {
        PortalError::UnknownActor(_) => StatusCode::UNAUTHORIZED,
        PortalError::NotFound => StatusCode::NOT_FOUND,
        PortalError::InvalidNumericInput { .. } => StatusCode::BAD_REQUEST,
        PortalError::EditNotPermitted { .. }
        | PortalError::ApprovalNotPermitted
        | PortalError::ImportNotPermitted => StatusCode::FORBIDDEN,
        PortalError::Import(ImportError::Csv(_)) => StatusCode::BAD_REQUEST,
        PortalError::Import(_) => StatusCode::UNPROCESSABLE_ENTITY,
        PortalError::Repository(_) | PortalError::Directory(_) | PortalError::Notify(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };

    let payload = json!({ "error": error.to_string() });
    (status, axum::Json(payload)).into_response()
}

pub(crate) async fn detail_handler<R, D, N>(
    State(service): State<Arc<KpiPortalService<R, D, N>>>,
    Path(result_id): Path<String>,
    headers: HeaderMap,
) -> Response
where
    R: ResultRepository + 'static,
    D: Directory + 'static,
    N: ApprovalNotifier + 'static,
{
    let actor = match actor_from(&headers) {
        Ok(actor) => actor,
        Err(response) => return response,
    };

    match service.get(&actor, &ResultId(result_id)) {
        Ok(detail) => (StatusCode::OK, axum::Json(detail)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn entry_handler<R, D, N>(
    State(service): State<Arc<KpiPortalService<R, D, N>>>,
    Path(result_id): Path<String>,
    headers: HeaderMap,
    axum::Json(update): axum::Json<EntryUpdate>,
) -> Response
where
    R: ResultRepository + 'static,
    D: Directory + 'static,
    N: ApprovalNotifier + 'static,
{
    let actor = match actor_from(&headers) {
        Ok(actor) => actor,
        Err(response) => return response,
    };

    match service.save_entry(&actor, &ResultId(result_id), update) {
        Ok(outcome) => {
            let payload = json!({
                "result": outcome.record.view(),
                "warning": outcome.warning,
            });
            (StatusCode::OK, axum::Json(payload)).into_response()
        }
        Err(error) => error_response(error),
    }
}

pub(crate) async fn lock_handler<R, D, N>(
    State(service): State<Arc<KpiPortalService<R, D, N>>>,
    Path(result_id): Path<String>,
    headers: HeaderMap,
) -> Response
where
    R: ResultRepository + 'static,
    D: Directory + 'static,
    N: ApprovalNotifier + 'static,
{
    let actor = match actor_from(&headers) {
        Ok(actor) => actor,
        Err(response) => return response,
    };

    match service.lock(&actor, &ResultId(result_id)) {
        Ok(record) => (StatusCode::OK, axum::Json(record.view())).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn unlock_handler<R, D, N>(
    State(service): State<Arc<KpiPortalService<R, D, N>>>,
    Path(result_id): Path<String>,
    headers: HeaderMap,
) -> Response
where
    R: ResultRepository + 'static,
    D: Directory + 'static,
    N: ApprovalNotifier + 'static,
{
    let actor = match actor_from(&headers) {
        Ok(actor) => actor,
        Err(response) => return response,
    };

    match service.unlock(&actor, &ResultId(result_id)) {
        Ok(record) => (StatusCode::OK, axum::Json(record.view())).into_response(),
        Err(error) => error_response(error),
    }
}

// Fields stay inline: query-string deserialization hands every value over as
// a string, so a flattened `OverviewFilter` would reject `year=2024`.
#[derive(Debug, Deserialize)]
pub(crate) struct OverviewQuery {
    employee: String,
    year: Option<i32>,
    semester: Option<String>,
    month: Option<String>,
}

impl OverviewQuery {
    fn filter(self) -> (String, OverviewFilter) {
        (
            self.employee,
            OverviewFilter {
                year: self.year,
                semester: self.semester,
                month: self.month,
            },
        )
    }
}

pub(crate) async fn overview_handler<R, D, N>(
    State(service): State<Arc<KpiPortalService<R, D, N>>>,
    Query(query): Query<OverviewQuery>,
    headers: HeaderMap,
) -> Response
where
    R: ResultRepository + 'static,
    D: Directory + 'static,
    N: ApprovalNotifier + 'static,
{
    let actor = match actor_from(&headers) {
        Ok(actor) => actor,
        Err(response) => return response,
    };

    let (employee, filter) = query.filter();
    match service.overview(&actor, &employee, filter) {
        Ok(overview) => (StatusCode::OK, axum::Json(overview)).into_response(),
        Err(error) => error_response(error),
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct DashboardQuery {
    employee: String,
}

pub(crate) async fn dashboard_handler<R, D, N>(
    State(service): State<Arc<KpiPortalService<R, D, N>>>,
    Query(query): Query<DashboardQuery>,
    headers: HeaderMap,
) -> Response
where
    R: ResultRepository + 'static,
    D: Directory + 'static,
    N: ApprovalNotifier + 'static,
{
    let actor = match actor_from(&headers) {
        Ok(actor) => actor,
        Err(response) => return response,
    };

    match service.dashboard(&actor, &query.employee) {
        Ok(stats) => (StatusCode::OK, axum::Json(stats)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn team_handler<R, D, N>(
    State(service): State<Arc<KpiPortalService<R, D, N>>>,
    headers: HeaderMap,
) -> Response
where
    R: ResultRepository + 'static,
    D: Directory + 'static,
    N: ApprovalNotifier + 'static,
{
    let actor = match actor_from(&headers) {
        Ok(actor) => actor,
        Err(response) => return response,
    };

    match service.team_report(&actor) {
        Ok(report) => (StatusCode::OK, axum::Json(report)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn import_handler<R, D, N>(
    State(service): State<Arc<KpiPortalService<R, D, N>>>,
    headers: HeaderMap,
    body: String,
) -> Response
where
    R: ResultRepository + 'static,
    D: Directory + 'static,
    N: ApprovalNotifier + 'static,
{
    let actor = match actor_from(&headers) {
        Ok(actor) => actor,
        Err(response) => return response,
    };

    match service.import_results(&actor, body.as_bytes()) {
        Ok(summary) => (StatusCode::OK, axum::Json(summary)).into_response(),
        Err(error) => error_response(error),
    }
}
