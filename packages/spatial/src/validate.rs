//! Boundary geometry checks.
//!
//! Invalid outlines (self-intersecting or degenerate rings) are excluded
//! from the joined table, then empty ones. Coordinates are never repaired.

use geo::{HasDimensions as _, MultiPolygon, Validation as _};
use serde::Serialize;

/// Outcome of checking one boundary outline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeometryStatus {
    /// Valid and non-empty.
    Valid,
    /// Fails the polygon validity predicate.
    Invalid,
    /// Valid but without any area (no polygons or no rings).
    Empty,
}

/// Classifies a boundary outline. Validity is checked first.
#[must_use]
pub fn classify(geometry: &MultiPolygon<f64>) -> GeometryStatus {
    if !geometry.is_valid() {
        GeometryStatus::Invalid
    } else if geometry.is_empty() {
        GeometryStatus::Empty
    } else {
        GeometryStatus::Valid
    }
}

/// Non-fatal report of boundaries excluded for invalid geometry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GeometryValidityWarning {
    /// Joined rows excluded.
    pub invalid_rows: usize,
    /// Identifiers of the excluded boundaries, in source order.
    pub administrative_ids: Vec<String>,
}

impl GeometryValidityWarning {
    /// Records one invalid boundary that would have produced `rows` rows.
    pub fn record(&mut self, administrative_id: &str, rows: usize) {
        self.invalid_rows += rows;
        self.administrative_ids.push(administrative_id.to_string());
    }

    /// Whether any boundary was excluded.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.invalid_rows == 0
    }
}
