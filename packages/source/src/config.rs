//! Incident source configuration.
//!
//! Deserialized from the `[incidents]` table of the dashboard config file.
//! Every field has a default matching the DFCI forest-fire export for the
//! Bouches-du-Rhône department.

use std::path::PathBuf;

use serde::Deserialize;

use crate::SourceError;

/// Where and how to read the incident CSV.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct IncidentSourceConfig {
    /// Path to the CSV file.
    pub path: PathBuf,
    /// Single-character field delimiter.
    pub delimiter: char,
    /// Candidate encodings, tried in order.
    pub encodings: Vec<String>,
    /// Department prefix identifiers must start with (first two
    /// characters of the INSEE code).
    pub region_prefix: String,
    /// Earliest alert year kept (inclusive).
    pub year_min: i32,
    /// Latest alert year kept (inclusive).
    pub year_max: i32,
    /// Header names of the mapped columns.
    pub columns: IncidentColumns,
}

impl Default for IncidentSourceConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("data/Classeur1.csv"),
            delimiter: ';',
            encodings: vec!["UTF-8".to_string(), "windows-1252".to_string()],
            region_prefix: "13".to_string(),
            year_min: 1970,
            year_max: 2024,
            columns: IncidentColumns::default(),
        }
    }
}

impl IncidentSourceConfig {
    /// The delimiter as a CSV byte.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::Config`] if the delimiter is not ASCII.
    pub fn delimiter_byte(&self) -> Result<u8, SourceError> {
        u8::try_from(self.delimiter)
            .ok()
            .filter(u8::is_ascii)
            .ok_or_else(|| SourceError::Config {
                message: format!("delimiter '{}' is not an ASCII character", self.delimiter),
            })
    }

    /// Whether `year` falls inside the configured bound.
    #[must_use]
    pub const fn year_in_range(&self, year: i32) -> bool {
        year >= self.year_min && year <= self.year_max
    }
}

/// Header names of the columns the loader maps onto
/// [`fire_map_incident_models::IncidentRecord`] fields.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct IncidentColumns {
    /// Alert timestamp column.
    pub alert_time: String,
    /// INSEE code column.
    pub administrative_id: String,
    /// Commune name column.
    pub commune_name: String,
    /// Burned area (m²) column.
    pub burned_area_m2: String,
    /// Alert origin column.
    pub alert_origin: String,
    /// DFCI grid code column.
    pub grid_code: String,
}

impl Default for IncidentColumns {
    fn default() -> Self {
        Self {
            alert_time: "Alerte".to_string(),
            administrative_id: "Code INSEE".to_string(),
            commune_name: "Commune".to_string(),
            burned_area_m2: "Surface parcourue (m2)".to_string(),
            alert_origin: "Origine de l'alerte".to_string(),
            grid_code: "Code du carreau DFCI".to_string(),
        }
    }
}

impl IncidentColumns {
    /// Mapped header names, identifier first.
    #[must_use]
    pub fn required(&self) -> [&str; 6] {
        [
            &self.administrative_id,
            &self.alert_time,
            &self.commune_name,
            &self.burned_area_m2,
            &self.alert_origin,
            &self.grid_code,
        ]
    }
}
