use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use axum_prometheus::PrometheusMetricLayer;
use clap::{Args, Parser, Subcommand};
use kpi_portal::config::AppConfig;
use kpi_portal::error::AppError;
use kpi_portal::kpi::{
    kpi_router, Department, Employee, KpiDefinition, KpiPortalService, KpiType, OverviewFilter,
    ResultId,
};
use kpi_portal::memory::{MemoryDirectory, MemoryNotifier, MemoryRepository};
use kpi_portal::telemetry;
use metrics_exporter_prometheus::PrometheusHandle;
use serde_json::json;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::info;

#[derive(Clone)]
struct AppState {
    readiness: Arc<AtomicBool>,
    metrics: PrometheusHandle,
}

#[derive(Parser, Debug)]
#[command(
    name = "KPI Portal",
    about = "Run the KPI entry and approval service from the command line",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service (default command)
    Serve(ServeArgs),
    /// Seed sample records and print an approval-cycle walkthrough
    Demo,
}

#[derive(Args, Debug, Default)]
struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    port: Option<u16>,
    /// Preload the demo dataset so the API has data to serve
    #[arg(long)]
    seed_demo: bool,
}

#[tokio::main]
async fn main() {
    if let Err(err) = run_cli().await {
        eprintln!("application error: {err}");
        std::process::exit(1);
    }
}

async fn run_cli() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => run_server(args).await,
        Command::Demo => run_demo(),
    }
}

async fn run_server(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry)?;

    let repository = Arc::new(MemoryRepository::default());
    let directory = Arc::new(demo_directory());
    let notifier = Arc::new(MemoryNotifier::default());
    let service = Arc::new(KpiPortalService::with_defaults(
        repository,
        directory,
        notifier,
        config.scoring.import_defaults(),
    ));

    if args.seed_demo {
        service.import_results("admin", DEMO_RESULTS_CSV.as_bytes())?;
        info!("demo dataset seeded");
    }

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(AtomicBool::new(false));
    let state = AppState {
        readiness: readiness_flag.clone(),
        metrics: prometheus_handle,
    };

    let app = Router::new()
        .route("/health", get(healthcheck))
        .route("/ready", get(readiness_endpoint))
        .route("/metrics", get(metrics_endpoint))
        .with_state(state)
        .merge(kpi_router(service))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "kpi portal ready");

    axum::serve(listener, app).await?;
    Ok(())
}

fn run_demo() -> Result<(), AppError> {
    let repository = Arc::new(MemoryRepository::default());
    let directory = Arc::new(demo_directory());
    let notifier = Arc::new(MemoryNotifier::default());
    let service = KpiPortalService::new(repository, directory, notifier.clone());

    let summary = service.import_results("admin", DEMO_RESULTS_CSV.as_bytes())?;
    println!(
        "imported {} rows ({} created, {} updated)",
        summary.created + summary.updated,
        summary.created,
        summary.updated
    );

    let overview = service.overview("linh", "linh", OverviewFilter::default())?;
    println!("\nentry grid for linh (total {}):", overview.total_score);
    for row in &overview.results {
        println!(
            "  {:<24} target {:>12} achieved {:>12} final {:>8}{}",
            row.kpi_name,
            row.display_target_set,
            row.display_achievement,
            row.display_final_result,
            if row.is_locked { "  [locked]" } else { "" }
        );
    }

    let first_id = overview
        .results
        .first()
        .map(|row| row.id.clone())
        .unwrap_or_else(|| ResultId("missing".to_string()));
    service.lock("mai", &first_id)?;
    println!("\nmanager 'mai' approved {}", first_id.0);
    for notice in notifier.notices() {
        println!(
            "  notice: {} / {} approved by {}",
            notice.employee, notice.kpi_name, notice.approved_by
        );
    }

    let team = service.team_report("mai")?;
    println!(
        "\nteam: {} staff, {} done, {} pending, avg {}",
        team.summary.total_staff, team.summary.done, team.summary.pending, team.summary.average_score
    );
    for row in &team.anomalies {
        println!("  anomaly: {} {} final {}", row.employee_name, row.kpi_name, row.display_final_result);
    }

    Ok(())
}

fn demo_directory() -> MemoryDirectory {
    let operations = Department {
        name: "Operations".to_string(),
        group: "Plant".to_string(),
    };
    let quality = Department {
        name: "Quality".to_string(),
        group: "Plant".to_string(),
    };

    let employees = vec![
        Employee {
            username: "hoa".to_string(),
            name: "Hoa Tran".to_string(),
            department: operations.clone(),
            level: 0,
            active: true,
        },
        Employee {
            username: "mai".to_string(),
            name: "Mai Pham".to_string(),
            department: operations.clone(),
            level: 1,
            active: true,
        },
        Employee {
            username: "linh".to_string(),
            name: "Linh Nguyen".to_string(),
            department: operations,
            level: 2,
            active: true,
        },
        Employee {
            username: "duc".to_string(),
            name: "Duc Le".to_string(),
            department: quality,
            level: 2,
            active: true,
        },
    ];

    let mut on_time = KpiDefinition::new("On-time delivery", KpiType::BiggerIsBetter);
    on_time.uses_percentage_calculation = true;
    let cost = KpiDefinition::new("Unit cost", KpiType::SmallerIsBetter);
    let mut incidents = KpiDefinition::new("Safety incidents", KpiType::MistakeCount);
    incidents.from_external_system = true;
    let mut audit = KpiDefinition::new("Audit findings", KpiType::BiggerIsBetter);
    audit.treat_any_achievement_as_zero_score = true;

    MemoryDirectory::new(
        vec!["admin".to_string()],
        employees,
        vec![on_time, cost, incidents, audit],
    )
}

const DEMO_RESULTS_CSV: &str = "\
year,semester,employee,kpi,weight,target_set,achievement,month
2025,2nd SEM,linh,On-time delivery,0.25,0.9,,1st
2025,2nd SEM,linh,Unit cost,0.3,40,,1st
2025,2nd SEM,linh,Safety incidents,0.1,1,0,1st
2025,2nd SEM,linh,Audit findings,0.2,1,0,1st
2025,2nd SEM,duc,Unit cost,0.3,38,,1st
2025,2nd SEM,duc,Safety incidents,0.1,1,0,1st
";

async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

async fn readiness_endpoint(State(state): State<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

async fn metrics_endpoint(State(state): State<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}
