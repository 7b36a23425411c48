//! Boundary source configuration (`[boundaries]` table).

use std::path::PathBuf;

use fire_map_geography_models::Crs;
use fire_map_geography_models::crs::EPSG_LAMBERT_93;
use serde::Deserialize;

use crate::GeoError;

/// Where to read the commune layer and which CRS to assume when the file
/// declares none.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct BoundarySourceConfig {
    /// Path to the `GeoJSON` file.
    pub path: PathBuf,
    /// EPSG code assumed for files without a `crs` member. Lambert-93 by
    /// default, the projection of the IGN commune layers.
    pub default_epsg: u32,
    /// Property names of the mapped columns.
    pub columns: BoundaryColumns,
}

impl Default for BoundarySourceConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("data/communes.geojson"),
            default_epsg: EPSG_LAMBERT_93,
            columns: BoundaryColumns::default(),
        }
    }
}

impl BoundarySourceConfig {
    /// The CRS to assume for undeclared layers.
    ///
    /// # Errors
    ///
    /// Returns [`GeoError::UnsupportedCrs`] if `default_epsg` is not a
    /// supported system.
    pub fn default_crs(&self) -> Result<Crs, GeoError> {
        Crs::from_epsg(self.default_epsg).ok_or_else(|| GeoError::UnsupportedCrs {
            name: format!("EPSG:{}", self.default_epsg),
        })
    }
}

/// Property names of the boundary columns, matching the IGN
/// ADMIN EXPRESS commune layer.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct BoundaryColumns {
    /// INSEE code property.
    pub administrative_id: String,
    /// Commune name property.
    pub region_name: String,
    /// Department name property.
    pub department_name: String,
    /// Population property.
    pub population: String,
    /// Surface area property.
    pub surface_area: String,
}

impl Default for BoundaryColumns {
    fn default() -> Self {
        Self {
            administrative_id: "INSEE_COM".to_string(),
            region_name: "NOM_COM".to_string(),
            department_name: "NOM_DEPT".to_string(),
            population: "POPULATION".to_string(),
            surface_area: "SUPERFICIE".to_string(),
        }
    }
}
