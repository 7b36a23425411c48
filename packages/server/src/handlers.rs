//! HTTP handler functions for the fire map API.

use actix_files::NamedFile;
use actix_web::{HttpRequest, HttpResponse, web};
use fire_map_analytics::{by_category, by_region, density, filter_options, summarize, trend};
use fire_map_analytics_models::{AggregationFilter, TimeGranularity};
use fire_map_incident_models::CategoryField;
use fire_map_server_models::{ApiError, ApiHealth, DensityParams, FilterParams};

use crate::AppState;

/// `GET /api/health`
pub async fn health() -> HttpResponse {
    HttpResponse::Ok().json(ApiHealth {
        healthy: true,
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// `GET /api/filters`
///
/// Years and region names available for the selectors.
pub async fn filters(state: web::Data<AppState>) -> HttpResponse {
    HttpResponse::Ok().json(filter_options(&state.context.table))
}

/// `GET /api/report`
///
/// What the startup pipeline loaded, dropped, joined and exported.
pub async fn report(state: web::Data<AppState>) -> HttpResponse {
    HttpResponse::Ok().json(&state.context.report)
}

/// `GET /api/summary`
pub async fn summary(
    state: web::Data<AppState>,
    params: web::Query<FilterParams>,
) -> HttpResponse {
    let filter = AggregationFilter::from(params.into_inner());
    HttpResponse::Ok().json(summarize(&state.context.table, &filter))
}

/// `GET /api/by-region`
///
/// Total burned hectares per commune.
pub async fn region_totals(
    state: web::Data<AppState>,
    params: web::Query<FilterParams>,
) -> HttpResponse {
    let filter = AggregationFilter::from(params.into_inner());
    HttpResponse::Ok().json(by_region(&state.context.table, &filter))
}

/// `GET /api/by-category/{field}`
pub async fn category_frequencies(
    state: web::Data<AppState>,
    path: web::Path<String>,
    params: web::Query<FilterParams>,
) -> HttpResponse {
    let Ok(field) = path.parse::<CategoryField>() else {
        return HttpResponse::BadRequest().json(ApiError::new(format!(
            "Unknown category field '{path}', expected alert_origin or grid_code"
        )));
    };

    let filter = AggregationFilter::from(params.into_inner());
    HttpResponse::Ok().json(by_category(&state.context.table, field, &filter))
}

/// `GET /api/trends/{granularity}`
pub async fn trends(
    state: web::Data<AppState>,
    path: web::Path<String>,
    params: web::Query<FilterParams>,
) -> HttpResponse {
    let Ok(granularity) = path.parse::<TimeGranularity>() else {
        return HttpResponse::BadRequest().json(ApiError::new(format!(
            "Unknown granularity '{path}', expected month, hour or year"
        )));
    };

    let filter = AggregationFilter::from(params.into_inner());
    HttpResponse::Ok().json(trend(&state.context.table, granularity, &filter))
}

/// `GET /api/density`
///
/// Population intensity per commune, optionally for a single commune.
pub async fn population_density(
    state: web::Data<AppState>,
    params: web::Query<DensityParams>,
) -> HttpResponse {
    HttpResponse::Ok().json(density(&state.context.table, params.region()))
}

/// `GET /api/communes.geojson`
///
/// Serves the artifact written at startup.
pub async fn communes_geojson(req: HttpRequest, state: web::Data<AppState>) -> HttpResponse {
    let export = &state.context.report.export;
    if !export.succeeded() {
        return HttpResponse::NotFound().json(ApiError::new(format!(
            "No joined GeoJSON available: {}",
            export.error.as_deref().unwrap_or("export did not run")
        )));
    }

    match NamedFile::open_async(&export.path).await {
        Ok(file) => file.into_response(&req),
        Err(e) => {
            log::error!("Failed to open {}: {e}", export.path);
            HttpResponse::InternalServerError().json(ApiError::new(e))
        }
    }
}
