use std::net::SocketAddr;
use std::time::Duration;

use api::auth::middleware::log_request;
use api::routes::routes;
use api::state::AppState;
use axum::{
    Router,
    http::header::{CONTENT_DISPOSITION, CONTENT_TYPE},
    middleware::from_fn,
};
use migration::{Migrator, MigratorTrait};
use services::CheckInPolicy;
use tower_http::cors::CorsLayer;
use tracing_appender::rolling;
use util::config;

#[tokio::main]
async fn main() {
    let _log_guard = init_logging(&config::log_file(), &config::log_level());

    if config::jwt_secret().trim().is_empty() {
        tracing::error!("JWT_SECRET is not set; refusing to start");
        std::process::exit(1);
    }

    let db = match db::connect().await {
        Ok(db) => db,
        Err(e) => {
            tracing::error!(error = %e, "Failed to connect to database");
            std::process::exit(1);
        }
    };

    if let Err(e) = Migrator::up(&db, None).await {
        tracing::error!(error = %e, "Failed to run migrations");
        std::process::exit(1);
    }

    let policy = CheckInPolicy::from_config();
    tracing::info!(?policy, "Check-in policy loaded");

    let app_state = AppState::new(db, policy);

    let _sweeper = app_state.registry().spawn_demo_sweeper(
        Duration::from_secs(config::demo_sweep_interval_seconds().max(1)),
        chrono::Duration::seconds(config::demo_idle_seconds()),
        chrono::Duration::seconds(config::demo_retention_seconds()),
    );

    let cors = CorsLayer::very_permissive().expose_headers([CONTENT_DISPOSITION, CONTENT_TYPE]);

    let app = Router::new()
        .nest("/api", routes(app_state.clone()))
        .with_state(app_state)
        .layer(from_fn(log_request))
        .layer(cors);

    let addr: SocketAddr = match format!("{}:{}", config::host(), config::port()).parse() {
        Ok(addr) => addr,
        Err(e) => {
            tracing::error!(error = %e, host = %config::host(), "Invalid listen address");
            std::process::exit(1);
        }
    };

    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(l) => l,
        Err(e) => {
            tracing::error!(error = %e, %addr, "Failed to bind");
            std::process::exit(1);
        }
    };

    tracing::info!(
        "Starting {} on http://{} (env = {})",
        config::project_name(),
        addr,
        config::env()
    );

    if let Err(e) = axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
    {
        tracing::error!(error = %e, "Server crashed");
    }
}

fn init_logging(log_file: &str, log_level: &str) -> tracing_appender::non_blocking::WorkerGuard {
    use std::fs;
    use tracing_subscriber::{EnvFilter, fmt, prelude::*};

    fs::create_dir_all("logs").ok();

    let file_appender = rolling::daily("logs", log_file);
    let (file_writer, guard) = tracing_appender::non_blocking(file_appender);

    let file_layer = fmt::layer()
        .with_writer(file_writer)
        .with_ansi(false)
        .with_target(true)
        .with_thread_ids(true);

    let stdout_layer = config::log_to_stdout().then(|| {
        fmt::layer()
            .with_writer(std::io::stdout)
            .with_ansi(true)
            .with_target(true)
            .with_thread_ids(true)
    });

    let env_filter = EnvFilter::try_new(log_level).unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .with(stdout_layer)
        .init();

    guard
}
