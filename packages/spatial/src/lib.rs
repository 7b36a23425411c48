#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Spatial join of forest-fire incidents onto commune boundaries.
//!
//! Left-joins incidents onto boundary polygons by INSEE code, excludes
//! invalid and empty geometries, reprojects every kept polygon to WGS 84
//! and exports the joined table as a `GeoJSON` `FeatureCollection`.
//! Each boundary is validated and reprojected once; every joined row of
//! that boundary shares the result.

pub mod export;
pub mod join;
pub mod reproject;
pub mod validate;

use std::path::PathBuf;

use fire_map_geography_models::Crs;
use thiserror::Error;

pub use export::{export_geojson, load_joined_table};
pub use join::{JoinReport, join};
pub use validate::GeometryValidityWarning;

/// Errors that can occur during the spatial join and export.
#[derive(Debug, Error)]
pub enum SpatialError {
    /// The two sources share no administrative identifier.
    #[error(
        "No administrative identifier in common between {boundary_ids} boundary ids and {incident_ids} incident ids"
    )]
    NoOverlap {
        /// Distinct non-empty boundary identifiers.
        boundary_ids: usize,
        /// Distinct incident identifiers.
        incident_ids: usize,
    },

    /// Every joined row was eliminated.
    #[error(
        "Joined table is empty: {input_rows} rows before filtering, {invalid_rows} with invalid geometry, {empty_rows} with empty geometry"
    )]
    EmptyResult {
        /// Joined rows before geometry filtering.
        input_rows: usize,
        /// Rows excluded for invalid geometry.
        invalid_rows: usize,
        /// Rows excluded for empty geometry.
        empty_rows: usize,
    },

    /// A boundary could not be reprojected into valid WGS 84 coordinates.
    #[error("Boundary {administrative_id} does not reproject from {crs} into WGS 84 range")]
    Reprojection {
        /// Identifier of the offending boundary.
        administrative_id: String,
        /// Source CRS.
        crs: Crs,
    },

    /// File I/O failed.
    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        /// File being read or written.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// `GeoJSON` parsing failed.
    #[error("GeoJSON error: {0}")]
    GeoJson(#[from] geojson::Error),

    /// JSON serialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Boundary geometry or properties could not be converted.
    #[error("Boundary error: {0}")]
    Boundary(#[from] fire_map_geography::GeoError),

    /// Data conversion error.
    #[error("Conversion error: {message}")]
    Conversion {
        /// Description of what went wrong.
        message: String,
    },
}
