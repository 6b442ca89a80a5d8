use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{get, patch, post},
    Router,
};
use domain::models::date_range::BoundaryPolicy;
use sqlx::PgPool;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{
    compression::CompressionLayer,
    cors::{AllowOrigin, Any, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::Config;
use crate::middleware::{metrics_handler, metrics_middleware, security_headers_middleware, trace_id};
use crate::routes::{health, reports, reservations};

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub config: Arc<Config>,
    pub boundary_policy: BoundaryPolicy,
}

fn cors_layer(config: &Config) -> CorsLayer {
    if config.security.cors_origins.is_empty() {
        // Development default: any origin.
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        let origins: Vec<_> = config
            .security
            .cors_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();
        CorsLayer::new()
            .allow_origin(AllowOrigin::list(origins))
            .allow_methods(Any)
            .allow_headers(Any)
    }
}

pub fn create_app(config: Config, pool: PgPool) -> Router {
    let config = Arc::new(config);
    let state = AppState {
        pool,
        boundary_policy: config.reservations.boundary_policy,
        config: config.clone(),
    };

    let reservation_routes = Router::new()
        .route(
            "/api/reservations",
            get(reservations::list_reservations).post(reservations::create_reservation),
        )
        .route(
            "/api/reservations/check-availability",
            get(reservations::check_availability),
        )
        .route(
            "/api/reservations/:reservation_id",
            get(reservations::get_reservation).put(reservations::update_reservation),
        )
        .route(
            "/api/reservations/:reservation_id/status",
            patch(reservations::update_reservation_status),
        );

    let report_routes = Router::new()
        .route("/api/reports/catalog", get(reports::get_catalog))
        .route("/api/reports/execute", post(reports::execute_report))
        .route(
            "/api/reports/saved",
            get(reports::list_saved_reports).post(reports::save_report),
        )
        .route(
            "/api/reports/saved/:report_id",
            get(reports::get_saved_report).delete(reports::delete_saved_report),
        );

    let public_routes = Router::new()
        .route("/api/health", get(health::health_check))
        .route("/api/health/ready", get(health::ready))
        .route("/api/health/live", get(health::live))
        .route("/metrics", get(metrics_handler));

    Router::new()
        .merge(public_routes)
        .merge(reservation_routes)
        .merge(report_routes)
        // Global middleware (order matters: bottom layers run first)
        .layer(middleware::from_fn(security_headers_middleware))
        .layer(DefaultBodyLimit::max(config.server.max_body_size))
        .layer(CompressionLayer::new())
        .layer(TimeoutLayer::new(Duration::from_secs(
            config.server.request_timeout_secs,
        )))
        .layer(middleware::from_fn(metrics_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn(trace_id))
        .layer(cors_layer(&config))
        .with_state(state)
}
