use anyhow::{Context, Result};
use fleetdesk_api::{app, config, middleware};
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    let config = config::Config::load().context("Failed to load configuration")?;

    middleware::logging::init_logging(&config.logging);
    if let Err(e) = middleware::init_metrics() {
        warn!(error = %e, "Prometheus recorder not installed; /metrics is disabled");
    }

    info!("Starting Fleetdesk API v{}", env!("CARGO_PKG_VERSION"));
    info!(
        boundary_policy = config.reservations.boundary_policy.as_str(),
        max_rows = config.reports.max_rows,
        "Booking and reporting settings"
    );

    let pool = persistence::db::create_pool(&(&config.database).into())
        .await
        .context("Failed to connect to database")?;

    info!("Running database migrations...");
    persistence::db::run_migrations(&pool).await?;
    info!("Migrations completed");

    let addr = config.socket_addr().context("Invalid server address")?;
    let app = app::create_app(config, pool);

    info!("Server listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
