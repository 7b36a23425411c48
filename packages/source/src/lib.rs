#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Forest-fire incident loading.
//!
//! Reads the semicolon-separated DFCI incident export, decoding it with
//! the first candidate encoding that fits, and normalizes it into
//! [`fire_map_incident_models::IncidentRecord`] values restricted to one
//! department and a year range.

pub mod config;
pub mod encoding;
pub mod loader;
pub mod parsing;

use std::path::PathBuf;

pub use config::{IncidentColumns, IncidentSourceConfig};
pub use loader::{LoadReport, load_incidents, parse_incidents};

/// Errors that can occur while loading incident data.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    /// The input file could not be read.
    #[error("Failed to read {}: {source}", .path.display())]
    Io {
        /// File that failed to read.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// CSV parsing failed (header row unreadable).
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// No candidate encoding could decode the input.
    #[error("Could not decode {} with any of: {tried}", .path.display())]
    Decode {
        /// File that failed to decode.
        path: PathBuf,
        /// Comma-separated candidate encoding labels.
        tried: String,
    },

    /// A required column is missing after header normalization.
    #[error("Data integrity error in {}: required column '{column}' not found", .path.display())]
    DataIntegrity {
        /// File with the missing column.
        path: PathBuf,
        /// Name of the missing column.
        column: String,
    },

    /// Invalid loader configuration.
    #[error("Configuration error: {message}")]
    Config {
        /// Description of what went wrong.
        message: String,
    },
}
