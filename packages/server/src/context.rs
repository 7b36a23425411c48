//! Startup pipeline.
//!
//! Loads both sources, joins them, writes the `GeoJSON` artifact and keeps
//! the joined table in memory for the lifetime of the server.

use fire_map_geography::load_boundaries;
use fire_map_geography_models::{Crs, JoinedTable};
use fire_map_server_models::ExportStatus;
use fire_map_source::{LoadReport, load_incidents};
use fire_map_spatial::{JoinReport, export_geojson, join};
use serde::Serialize;

use crate::PipelineError;
use crate::config::DashboardConfig;

/// Boundary layer accounting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BoundaryReport {
    /// Features read.
    pub rows: usize,
    /// CRS declared by the file, if any.
    pub declared_crs: Option<Crs>,
}

/// Everything the startup pipeline observed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineReport {
    /// Incident loading.
    pub load: LoadReport,
    /// Boundary loading.
    pub boundaries: BoundaryReport,
    /// Spatial join.
    pub join: JoinReport,
    /// Artifact export.
    pub export: ExportStatus,
}

/// The immutable data behind every API response.
#[derive(Debug)]
pub struct DashboardContext {
    /// Joined table the aggregations run over.
    pub table: JoinedTable,
    /// Startup report.
    pub report: PipelineReport,
}

impl DashboardContext {
    /// Runs the full pipeline for `config`.
    ///
    /// A failed export is logged and recorded in the report but does not
    /// fail startup: the joined table is still served.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError`] if either source cannot be loaded or the
    /// join fails.
    pub fn prepare(config: &DashboardConfig) -> Result<Self, PipelineError> {
        let (incidents, load) = load_incidents(&config.incidents)?;
        log::info!(
            "Loaded {} incidents ({} rows read, {} dropped columns)",
            load.retained_rows,
            load.total_rows,
            load.dropped_columns.len()
        );

        let default_crs = config.boundaries.default_crs()?;
        let boundaries = load_boundaries(&config.boundaries)?;
        let boundary_report = BoundaryReport {
            rows: boundaries.rows.len(),
            declared_crs: boundaries.crs,
        };

        let (table, join_report) = join(boundaries, incidents, default_crs)?;

        let path = &config.output.geojson_path;
        let export = match export_geojson(&table, path) {
            Ok(features) => ExportStatus {
                path: path.display().to_string(),
                features: Some(features),
                error: None,
            },
            Err(e) => {
                log::error!("Failed to export {}: {e}", path.display());
                ExportStatus {
                    path: path.display().to_string(),
                    features: None,
                    error: Some(e.to_string()),
                }
            }
        };

        Ok(Self {
            table,
            report: PipelineReport {
                load,
                boundaries: boundary_report,
                join: join_report,
                export,
            },
        })
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::path::{Path, PathBuf};

    use fire_map_spatial::SpatialError;

    use super::*;

    const HEADER: &str = "Code INSEE;Commune;Alerte;Origine de l'alerte;Surface parcourue (m2);Code du carreau DFCI\n";

    pub fn fixture_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("fire_map_server_{name}_{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn commune(id: &str, name: &str, lon: f64, lat: f64, population: f64) -> String {
        let (x0, y0, x1, y1) = (lon, lat, lon + 0.05, lat + 0.05);
        format!(
            r#"{{"type":"Feature","properties":{{"INSEE_COM":"{id}","NOM_COM":"{name}","NOM_DEPT":"BOUCHES-DU-RHONE","POPULATION":{population},"SUPERFICIE":100}},"geometry":{{"type":"Polygon","coordinates":[[[{x0},{y0}],[{x1},{y0}],[{x1},{y1}],[{x0},{y1}],[{x0},{y0}]]]}}}}"#
        )
    }

    /// Writes a two-commune WGS 84 layer and a three-incident CSV into
    /// `dir` and returns a config pointing at them.
    pub fn write_fixture(dir: &Path, incident_rows: &str) -> DashboardConfig {
        let csv_path = dir.join("incidents.csv");
        std::fs::write(&csv_path, format!("{HEADER}{incident_rows}")).unwrap();

        let geojson_path = dir.join("communes.geojson");
        let features = [
            commune("13001", "Aix-en-Provence", 5.4, 43.5, 145_000.0),
            commune("13002", "Allauch", 5.5, 43.3, 21_000.0),
        ]
        .join(",");
        std::fs::write(
            &geojson_path,
            format!(
                r#"{{"type":"FeatureCollection","crs":{{"type":"name","properties":{{"name":"urn:ogc:def:crs:OGC:1.3:CRS84"}}}},"features":[{features}]}}"#
            ),
        )
        .unwrap();

        let mut config = DashboardConfig::default();
        config.incidents.path = csv_path;
        config.boundaries.path = geojson_path;
        config.output.geojson_path = dir.join("generated").join("all_communes.geojson");
        config
    }

    pub const INCIDENTS: &str = "\
13001;Aix-en-Provence;2019-07-14 10:00:00;Vigie;5000;KD12D4
13001;Aix-en-Provence;2020-08-01 14:30:00;Patrouille;15000;KD12D5
13002;Allauch;2019-07-20 09:15:00;Vigie;2000;KE10A1
";

    #[test]
    fn prepares_and_exports() {
        let dir = fixture_dir("prepare");
        let config = write_fixture(&dir, INCIDENTS);

        let context = DashboardContext::prepare(&config).unwrap();
        assert_eq!(context.report.load.retained_rows, 3);
        assert_eq!(context.report.boundaries.rows, 2);
        assert_eq!(context.report.boundaries.declared_crs, Some(Crs::Wgs84));
        assert_eq!(context.report.join.output_rows, 3);
        assert_eq!(context.table.len(), 3);
        assert!(context.report.export.succeeded());
        assert_eq!(context.report.export.features, Some(3));
        assert!(config.output.geojson_path.is_file());

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn no_overlap_writes_nothing() {
        let dir = fixture_dir("no_overlap");
        let config = write_fixture(&dir, "13055;Marseille;2019-07-14 10:00:00;Vigie;5000;KD12D4\n");

        let err = DashboardContext::prepare(&config).unwrap_err();
        assert!(matches!(
            err,
            PipelineError::Spatial(SpatialError::NoOverlap { .. })
        ));
        assert!(!config.output.geojson_path.exists());

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn export_failure_is_not_fatal() {
        let dir = fixture_dir("export_failure");
        let mut config = write_fixture(&dir, INCIDENTS);
        // A regular file where the output directory should be.
        let blocker = dir.join("blocker");
        std::fs::write(&blocker, "").unwrap();
        config.output.geojson_path = blocker.join("all_communes.geojson");

        let context = DashboardContext::prepare(&config).unwrap();
        assert!(!context.report.export.succeeded());
        assert!(context.report.export.error.is_some());
        assert_eq!(context.table.len(), 3);

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn missing_incident_file_is_fatal() {
        let dir = fixture_dir("missing_source");
        let mut config = write_fixture(&dir, INCIDENTS);
        config.incidents.path = dir.join("absent.csv");

        let err = DashboardContext::prepare(&config).unwrap_err();
        assert!(matches!(err, PipelineError::Source(_)));

        std::fs::remove_dir_all(&dir).ok();
    }
}
