//! Left join of incidents onto commune boundaries.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use fire_map_geography_models::{BoundaryPolygon, BoundaryTable, Crs, JoinedRow, JoinedTable};
use fire_map_incident_models::IncidentRecord;
use serde::Serialize;

use crate::reproject::reproject_to_wgs84;
use crate::validate::{GeometryStatus, GeometryValidityWarning, classify};
use crate::SpatialError;

/// Row accounting for one spatial join.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinReport {
    /// Boundary rows received.
    pub boundary_rows: usize,
    /// Incident records received.
    pub incident_rows: usize,
    /// Identifiers present on both sides.
    pub overlapping_ids: usize,
    /// Kept boundaries with at least one incident.
    pub matched_boundaries: usize,
    /// Kept boundaries without any incident.
    pub unmatched_boundaries: usize,
    /// Incidents whose identifier matches no boundary.
    pub unmatched_incidents: usize,
    /// Joined rows before geometry filtering.
    pub input_rows: usize,
    /// Rows excluded for invalid geometry.
    pub invalid_geometry: GeometryValidityWarning,
    /// Rows excluded for empty geometry.
    pub empty_geometry_rows: usize,
    /// Rows excluded because the boundary had no identifier to back-fill.
    pub missing_identifier_rows: usize,
    /// CRS the boundaries were reprojected from.
    pub source_crs: Crs,
    /// Whether `source_crs` was assumed because none was declared.
    pub crs_assumed: bool,
    /// Rows whose join key was back-filled from the boundary.
    pub backfilled_ids: usize,
    /// Rows in the joined table.
    pub output_rows: usize,
}

/// Left-joins `incidents` onto `boundaries` by administrative identifier.
///
/// Every kept boundary appears once per matching incident, or once with
/// no incident. Boundaries with invalid or empty geometry are excluded.
/// Kept geometries are reprojected from the declared CRS, or
/// `default_crs` when the layer declares none, into WGS 84.
///
/// # Errors
///
/// * [`SpatialError::NoOverlap`] if no identifier appears on both sides
/// * [`SpatialError::Reprojection`] if a boundary leaves the WGS 84 range
/// * [`SpatialError::EmptyResult`] if no row survives
#[allow(clippy::too_many_lines)]
pub fn join(
    boundaries: BoundaryTable,
    incidents: Vec<IncidentRecord>,
    default_crs: Crs,
) -> Result<(JoinedTable, JoinReport), SpatialError> {
    let boundary_ids: BTreeSet<String> = boundaries
        .rows
        .iter()
        .map(|b| b.administrative_id.clone())
        .filter(|id| !id.is_empty())
        .collect();

    let incident_rows = incidents.len();
    let mut by_id: BTreeMap<String, Vec<IncidentRecord>> = BTreeMap::new();
    for incident in incidents {
        by_id
            .entry(incident.administrative_id.to_string())
            .or_default()
            .push(incident);
    }

    let overlapping_ids = by_id
        .keys()
        .filter(|id| boundary_ids.contains(*id))
        .count();

    if overlapping_ids == 0 {
        return Err(SpatialError::NoOverlap {
            boundary_ids: boundary_ids.len(),
            incident_ids: by_id.len(),
        });
    }

    let (source_crs, crs_assumed) = boundaries
        .crs
        .map_or((default_crs, true), |crs| (crs, false));

    log::info!(
        "Joining {incident_rows} incidents onto {} boundaries ({overlapping_ids} shared ids, CRS {source_crs}{})",
        boundaries.rows.len(),
        if crs_assumed { " assumed" } else { "" }
    );

    let mut report = JoinReport {
        boundary_rows: boundaries.rows.len(),
        incident_rows,
        overlapping_ids,
        matched_boundaries: 0,
        unmatched_boundaries: 0,
        unmatched_incidents: by_id
            .iter()
            .filter(|(id, _)| !boundary_ids.contains(*id))
            .map(|(_, matches)| matches.len())
            .sum(),
        input_rows: 0,
        invalid_geometry: GeometryValidityWarning::default(),
        empty_geometry_rows: 0,
        missing_identifier_rows: 0,
        source_crs,
        crs_assumed,
        backfilled_ids: 0,
        output_rows: 0,
    };

    let mut rows = Vec::new();

    for boundary in boundaries.rows {
        let matches = by_id.get(&boundary.administrative_id);
        let row_count = matches.map_or(1, Vec::len);
        report.input_rows += row_count;

        match classify(&boundary.geometry) {
            GeometryStatus::Invalid => {
                report
                    .invalid_geometry
                    .record(&boundary.administrative_id, row_count);
                continue;
            }
            GeometryStatus::Empty => {
                report.empty_geometry_rows += row_count;
                continue;
            }
            GeometryStatus::Valid => {}
        }

        // Back-fill needs the boundary's own id; without one the row
        // would have no join key at all.
        if boundary.administrative_id.is_empty() {
            report.missing_identifier_rows += row_count;
            continue;
        }

        let geometry = reproject_to_wgs84(&boundary.geometry, source_crs).ok_or_else(|| {
            SpatialError::Reprojection {
                administrative_id: boundary.administrative_id.clone(),
                crs: source_crs,
            }
        })?;
        let boundary = Arc::new(BoundaryPolygon {
            geometry,
            ..boundary
        });

        match matches {
            Some(matches) => {
                report.matched_boundaries += 1;
                rows.extend(matches.iter().map(|incident| JoinedRow {
                    administrative_id: incident.administrative_id.to_string(),
                    boundary: Arc::clone(&boundary),
                    incident: Some(incident.clone()),
                }));
            }
            None => {
                report.unmatched_boundaries += 1;
                report.backfilled_ids += 1;
                rows.push(JoinedRow {
                    administrative_id: boundary.administrative_id.clone(),
                    boundary,
                    incident: None,
                });
            }
        }
    }

    if !report.invalid_geometry.is_empty() {
        log::warn!(
            "Excluded {} rows with invalid geometry (boundaries: {})",
            report.invalid_geometry.invalid_rows,
            report.invalid_geometry.administrative_ids.join(", ")
        );
    }
    if report.empty_geometry_rows > 0 {
        log::info!(
            "Excluded {} rows with empty geometry",
            report.empty_geometry_rows
        );
    }
    if report.missing_identifier_rows > 0 {
        log::warn!(
            "Excluded {} rows from boundaries without an identifier",
            report.missing_identifier_rows
        );
    }

    if rows.is_empty() {
        return Err(SpatialError::EmptyResult {
            input_rows: report.input_rows,
            invalid_rows: report.invalid_geometry.invalid_rows,
            empty_rows: report.empty_geometry_rows,
        });
    }

    report.output_rows = rows.len();

    log::info!(
        "Joined table has {} rows ({} matched boundaries, {} back-filled ids, {} unmatched incidents)",
        report.output_rows,
        report.matched_boundaries,
        report.backfilled_ids,
        report.unmatched_incidents
    );

    Ok((JoinedTable::from_rows(rows), report))
}
