#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Commune boundary layer loading.
//!
//! Reads the commune polygons from a `GeoJSON` `FeatureCollection`,
//! keeping the declared coordinate reference system so the spatial join
//! can reproject to WGS 84. No department filtering happens here: the
//! full boundary set is loaded.

pub mod config;
pub mod loader;

use std::path::PathBuf;

use thiserror::Error;

pub use config::{BoundaryColumns, BoundarySourceConfig};
pub use loader::{load_boundaries, parse_boundaries};

/// Errors that can occur during boundary operations.
#[derive(Debug, Error)]
pub enum GeoError {
    /// The boundary file could not be read.
    #[error("Failed to read {}: {source}", .path.display())]
    Io {
        /// File that failed to read.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// `GeoJSON` parsing or geometry conversion failed.
    #[error("GeoJSON error: {0}")]
    GeoJson(#[from] geojson::Error),

    /// JSON parsing failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Data conversion error.
    #[error("Conversion error: {message}")]
    Conversion {
        /// Description of what went wrong.
        message: String,
    },

    /// The declared or configured CRS cannot be reprojected.
    #[error("Unsupported coordinate reference system: {name}")]
    UnsupportedCrs {
        /// The CRS name or code as found.
        name: String,
    },
}
