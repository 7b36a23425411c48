#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Actix-Web API server for the forest-fire dashboard.
//!
//! The incident CSV and the commune layer are loaded and joined once at
//! startup. The joined table is immutable afterwards and every endpoint
//! aggregates over it in memory. The joined `GeoJSON` artifact and,
//! optionally, a directory of pre-rendered map pages are served as static
//! files.

pub mod config;
pub mod context;
mod handlers;

use std::sync::Arc;

use actix_cors::Cors;
use actix_files::Files;
use actix_web::{App, HttpServer, middleware, web};
use fire_map_geography::GeoError;
use fire_map_source::SourceError;
use fire_map_spatial::SpatialError;
use thiserror::Error;

pub use config::{Args, DashboardConfig};
pub use context::{DashboardContext, PipelineReport};

/// Errors that abort startup.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Incident loading failed.
    #[error("Incident source: {0}")]
    Source(#[from] SourceError),

    /// Boundary loading failed.
    #[error("Boundary source: {0}")]
    Geo(#[from] GeoError),

    /// The join could not produce a table.
    #[error("Spatial join: {0}")]
    Spatial(#[from] SpatialError),

    /// The configuration file could not be read.
    #[error("Configuration error: {message}")]
    Config {
        /// Description of what went wrong.
        message: String,
    },

    /// The configuration file is not valid.
    #[error("Invalid configuration: {0}")]
    Toml(#[from] toml::de::Error),
}

/// Shared application state.
pub struct AppState {
    /// Joined table and startup report.
    pub context: Arc<DashboardContext>,
}

/// Registers the `/api` routes.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api")
            .route("/health", web::get().to(handlers::health))
            .route("/filters", web::get().to(handlers::filters))
            .route("/report", web::get().to(handlers::report))
            .route("/summary", web::get().to(handlers::summary))
            .route("/by-region", web::get().to(handlers::region_totals))
            .route(
                "/by-category/{field}",
                web::get().to(handlers::category_frequencies),
            )
            .route("/trends/{granularity}", web::get().to(handlers::trends))
            .route("/density", web::get().to(handlers::population_density))
            .route(
                "/communes.geojson",
                web::get().to(handlers::communes_geojson),
            ),
    );
}

/// Starts the dashboard API server over a prepared context.
///
/// This is a regular async function. The caller provides the runtime
/// (e.g. via `#[actix_web::main]`).
///
/// # Errors
///
/// Returns an `std::io::Result` error if the HTTP server fails to bind or
/// encounters a runtime error.
#[allow(clippy::future_not_send)]
pub async fn run_server(config: &DashboardConfig, context: DashboardContext) -> std::io::Result<()> {
    let state = web::Data::new(AppState {
        context: Arc::new(context),
    });
    let html_dir = config.output.html_dir.clone();
    let bind_addr = config.server.bind_addr.clone();
    let port = config.server.port;

    log::info!("Starting server on {bind_addr}:{port}");

    HttpServer::new(move || {
        let cors = Cors::permissive();
        let html_dir = html_dir.clone();

        App::new()
            .wrap(cors)
            .wrap(middleware::Logger::default())
            .app_data(state.clone())
            .configure(configure)
            .configure(move |cfg| {
                // Pre-rendered map pages
                if let Some(dir) = html_dir {
                    cfg.service(Files::new("/html", dir).index_file("index.html"));
                }
            })
    })
    .bind((bind_addr, port))?
    .run()
    .await
}
