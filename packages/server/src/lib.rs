#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Actix-Web API server for the accident map application.
//!
//! Serves the REST API behind the accident visualization frontend:
//! paginated listings, time-bucket series, geographic breakdowns, state
//! details, and map point data. All query state lives in the Postgres
//! event store; requests are handled statelessly against an injected
//! connection handle.

mod handlers;

use accident_map_database::db;
use actix_cors::Cors;
use actix_web::{App, HttpServer, middleware, web};
use std::sync::Arc;
use switchy_database::Database;

/// Default cap on raw map points when `MAP_POINT_LIMIT` is unset.
const DEFAULT_POINT_LIMIT: u32 = 300_000;

/// Shared application state.
pub struct AppState {
    /// Database connection.
    pub db: Arc<dyn Database>,
    /// Maximum raw points returned by the national map view.
    pub point_limit: u32,
}

/// Starts the accident map API server.
///
/// Connects to the Postgres event store and starts the Actix-Web HTTP
/// server. This is a regular async function — the caller provides the
/// async runtime (e.g. via `#[actix_web::main]`).
///
/// # Errors
///
/// Returns an `std::io::Result` error if the HTTP server fails to bind or
/// encounters a runtime error.
///
/// # Panics
///
/// Panics if the database connection fails; the process cannot serve
/// anything without its store.
#[allow(clippy::future_not_send)]
pub async fn run_server() -> std::io::Result<()> {
    pretty_env_logger::init_custom_env("RUST_LOG");

    log::info!("Connecting to database...");
    let db_conn = db::connect_from_env()
        .await
        .expect("Failed to connect to database");

    let point_limit: u32 = std::env::var("MAP_POINT_LIMIT")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(DEFAULT_POINT_LIMIT);

    let state = web::Data::new(AppState {
        db: Arc::from(db_conn),
        point_limit,
    });

    let bind_addr = std::env::var("BIND_ADDR").unwrap_or_else(|_| "127.0.0.1".to_string());
    let port: u16 = std::env::var("PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(8080);

    log::info!("Starting server on {bind_addr}:{port}");

    HttpServer::new(move || {
        let cors = Cors::permissive();

        App::new()
            .wrap(cors)
            .wrap(middleware::Logger::default())
            .app_data(state.clone())
            .service(
                web::scope("/api")
                    .route("/health", web::get().to(handlers::health))
                    .route("/accidents", web::get().to(handlers::accidents))
                    .route("/spatial/states", web::get().to(handlers::states))
                    .route("/spatial/map-data", web::get().to(handlers::map_data))
                    .route(
                        "/spatial/top-accidents",
                        web::get().to(handlers::top_accidents),
                    )
                    .route("/state/details", web::get().to(handlers::state_details))
                    .route(
                        "/county/time-analysis",
                        web::get().to(handlers::county_time_analysis),
                    )
                    .route("/analysis/cities", web::get().to(handlers::city_analysis))
                    .route(
                        "/analysis/streets",
                        web::get().to(handlers::street_analysis),
                    )
                    .route(
                        "/temporal/summary",
                        web::get().to(handlers::temporal_summary),
                    )
                    .route("/weather/summary", web::get().to(handlers::weather_summary))
                    .route("/metadata", web::get().to(handlers::metadata)),
            )
    })
    .bind((bind_addr, port))?
    .run()
    .await
}
