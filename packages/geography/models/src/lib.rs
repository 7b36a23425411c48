#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Commune boundary and joined-table types.
//!
//! [`BoundaryPolygon`] is one commune of the boundary layer as loaded from
//! disk. [`JoinedTable`] is the immutable result of left-joining incidents
//! onto those boundaries: every row carries valid, non-empty geometry in
//! WGS 84 longitude/latitude.

pub mod crs;

use std::collections::BTreeMap;
use std::sync::Arc;

use fire_map_incident_models::IncidentRecord;
use geo::MultiPolygon;

pub use crs::Crs;

/// One commune polygon from the boundary layer.
#[derive(Debug, Clone, PartialEq)]
pub struct BoundaryPolygon {
    /// INSEE code of the commune (trimmed; empty if the source had none).
    pub administrative_id: String,
    /// Commune name.
    pub region_name: String,
    /// Department name.
    pub department_name: String,
    /// Resident population.
    pub population: Option<f64>,
    /// Surface area as published by the source.
    pub surface_area: Option<f64>,
    /// Commune outline. Empty when the source feature had no areal
    /// geometry.
    pub geometry: MultiPolygon<f64>,
    /// Every source property keyed by its trimmed name. The identifier,
    /// commune and department columns hold the normalized strings above.
    pub attributes: BTreeMap<String, serde_json::Value>,
}

/// The boundary layer as loaded, with its declared CRS (if any).
#[derive(Debug, Clone, PartialEq)]
pub struct BoundaryTable {
    /// CRS declared by the source file. `None` when undeclared.
    pub crs: Option<Crs>,
    /// Boundary rows in source order.
    pub rows: Vec<BoundaryPolygon>,
}

/// One row of the joined table: a boundary paired with at most one
/// incident.
///
/// Boundaries matched by several incidents appear once per incident and
/// share the same [`BoundaryPolygon`] allocation.
#[derive(Debug, Clone, PartialEq)]
pub struct JoinedRow {
    /// Join key. Taken from the incident when present, back-filled from
    /// the boundary's own identifier otherwise.
    pub administrative_id: String,
    /// The boundary, with geometry in WGS 84.
    pub boundary: Arc<BoundaryPolygon>,
    /// The matched incident, `None` for boundaries without any incident.
    pub incident: Option<IncidentRecord>,
}

impl JoinedRow {
    /// The region name used for filtering: the incident's commune name
    /// when an incident is attached, the boundary's name otherwise.
    #[must_use]
    pub fn region_name(&self) -> &str {
        self.incident
            .as_ref()
            .map_or(self.boundary.region_name.as_str(), |incident| {
                incident.commune_name.as_str()
            })
    }
}

/// Read-only snapshot produced once by the spatial join.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct JoinedTable {
    rows: Vec<JoinedRow>,
}

impl JoinedTable {
    /// Wraps already-joined rows.
    ///
    /// Callers are responsible for the geometry invariant (valid,
    /// non-empty, WGS 84); the spatial joiner is the only producer in the
    /// running application.
    #[must_use]
    pub const fn from_rows(rows: Vec<JoinedRow>) -> Self {
        Self { rows }
    }

    /// All rows in join order.
    #[must_use]
    pub fn rows(&self) -> &[JoinedRow] {
        &self.rows
    }

    /// Number of rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the table has no rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Iterates over rows that carry an incident.
    pub fn incidents(&self) -> impl Iterator<Item = (&JoinedRow, &IncidentRecord)> {
        self.rows
            .iter()
            .filter_map(|row| row.incident.as_ref().map(|incident| (row, incident)))
    }
}
