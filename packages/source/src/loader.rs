//! Incident CSV loader.
//!
//! Pipeline per file:
//!
//! 1. decode with the first fitting candidate encoding
//! 2. trim header names and locate the mapped columns
//! 3. skip malformed rows (field count differs from the header)
//! 4. keep rows whose identifier is in the configured department and whose
//!    alert year is inside the configured bound
//! 5. drop unmapped columns that are blank in every kept row, then drop
//!    rows with a blank in any remaining column

use std::collections::BTreeMap;
use std::path::Path;

use chrono::{Datelike as _, NaiveDateTime};
use fire_map_incident_models::{AdministrativeId, AreaError, IncidentRecord};
use serde::Serialize;

use crate::config::{IncidentColumns, IncidentSourceConfig};
use crate::encoding::{decode_with_fallback, resolve_encodings};
use crate::parsing::{non_empty, parse_alert_time, parse_burned_area};
use crate::SourceError;

/// Row accounting for one incident load.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadReport {
    /// Name of the encoding the file was decoded with.
    pub encoding: String,
    /// Data rows read (excluding the header).
    pub total_rows: u64,
    /// Rows skipped because their field count differs from the header.
    pub malformed_rows: u64,
    /// Rows with a blank identifier.
    pub invalid_identifier_rows: u64,
    /// Rows outside the configured department.
    pub outside_region_rows: u64,
    /// Rows with an unparseable alert timestamp.
    pub invalid_timestamp_rows: u64,
    /// Rows whose alert year is outside the configured bound.
    pub outside_year_range_rows: u64,
    /// Rows dropped because a retained column was blank.
    pub incomplete_rows: u64,
    /// Unmapped columns dropped because they were blank in every row.
    pub dropped_columns: Vec<String>,
    /// Rows kept.
    pub retained_rows: u64,
}

/// Positions of the mapped columns plus every unmapped column.
struct ColumnLayout {
    administrative_id: usize,
    alert_time: usize,
    commune_name: usize,
    burned_area_m2: usize,
    alert_origin: usize,
    grid_code: usize,
    extras: Vec<(usize, String)>,
}

impl ColumnLayout {
    fn resolve(
        headers: &[String],
        columns: &IncidentColumns,
        path: &Path,
    ) -> Result<Self, SourceError> {
        let position = |name: &str| {
            headers
                .iter()
                .position(|header| header == name)
                .ok_or_else(|| SourceError::DataIntegrity {
                    path: path.to_path_buf(),
                    column: name.to_string(),
                })
        };

        // `required` lists the identifier first so a missing join key is
        // always the reported column.
        let mut mapped = [0_usize; 6];
        for (slot, name) in mapped.iter_mut().zip(columns.required()) {
            *slot = position(name)?;
        }
        let [
            administrative_id,
            alert_time,
            commune_name,
            burned_area_m2,
            alert_origin,
            grid_code,
        ] = mapped;

        let extras = headers
            .iter()
            .enumerate()
            .filter(|(i, _)| !mapped.contains(i))
            .map(|(i, header)| {
                let name = if header.is_empty() {
                    format!("column_{i}")
                } else {
                    header.clone()
                };
                (i, name)
            })
            .collect();

        Ok(Self {
            administrative_id,
            alert_time,
            commune_name,
            burned_area_m2,
            alert_origin,
            grid_code,
            extras,
        })
    }
}

/// A row that passed the region and year filters but has not yet been
/// checked for blanks.
struct PendingRow {
    administrative_id: AdministrativeId,
    alert_time: NaiveDateTime,
    commune_name: Option<String>,
    burned_area_m2: Result<f64, AreaError>,
    alert_origin: Option<String>,
    grid_code: Option<String>,
    extras: Vec<Option<String>>,
}

impl PendingRow {
    fn into_record(self, extras: &[(usize, String)], retained: &[bool]) -> Option<IncidentRecord> {
        let mut attributes = BTreeMap::new();
        for ((value, (_, name)), keep) in self.extras.into_iter().zip(extras).zip(retained) {
            if *keep {
                attributes.insert(name.clone(), value?);
            }
        }

        Some(IncidentRecord {
            alert_time: self.alert_time,
            administrative_id: self.administrative_id,
            commune_name: self.commune_name?,
            burned_area_m2: self.burned_area_m2.ok()?,
            alert_origin: self.alert_origin?,
            grid_code: self.grid_code?,
            attributes,
        })
    }
}

/// Reads and normalizes the incident CSV named by `config.path`.
///
/// # Errors
///
/// Returns [`SourceError`] if the file cannot be read or decoded, the
/// header row is unreadable, or a mapped column is missing.
pub fn load_incidents(
    config: &IncidentSourceConfig,
) -> Result<(Vec<IncidentRecord>, LoadReport), SourceError> {
    log::info!("Loading incidents from {}", config.path.display());

    let bytes = std::fs::read(&config.path).map_err(|source| SourceError::Io {
        path: config.path.clone(),
        source,
    })?;

    parse_incidents(&bytes, config)
}

/// Normalizes raw incident CSV bytes. `config.path` is only used for
/// diagnostics.
///
/// # Errors
///
/// Returns [`SourceError`] if the bytes cannot be decoded, the header row
/// is unreadable, or a mapped column is missing.
pub fn parse_incidents(
    bytes: &[u8],
    config: &IncidentSourceConfig,
) -> Result<(Vec<IncidentRecord>, LoadReport), SourceError> {
    let candidates = resolve_encodings(&config.encodings)?;
    let (text, encoding) =
        decode_with_fallback(bytes, &candidates).ok_or_else(|| SourceError::Decode {
            path: config.path.clone(),
            tried: config.encodings.join(", "),
        })?;

    let mut report = LoadReport {
        encoding: encoding.name().to_string(),
        ..LoadReport::default()
    };
    log::info!(
        "Decoded {} as {}",
        config.path.display(),
        report.encoding
    );

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(config.delimiter_byte()?)
        .has_headers(true)
        .flexible(false)
        .from_reader(text.as_bytes());

    let headers: Vec<String> = reader
        .headers()?
        .iter()
        .map(|h| h.trim().to_owned())
        .collect();

    let layout = ColumnLayout::resolve(&headers, &config.columns, &config.path)?;

    let mut pending = Vec::new();

    for result in reader.records() {
        report.total_rows += 1;

        let record = match result {
            Ok(record) => record,
            Err(e) => {
                log::debug!("Skipping malformed row {}: {e}", report.total_rows);
                report.malformed_rows += 1;
                continue;
            }
        };
        let cell = |i: usize| record.get(i).unwrap_or("");

        let Ok(administrative_id) = AdministrativeId::parse(cell(layout.administrative_id))
        else {
            report.invalid_identifier_rows += 1;
            continue;
        };

        if !administrative_id.in_department(&config.region_prefix) {
            report.outside_region_rows += 1;
            continue;
        }

        let alert_time = match parse_alert_time(cell(layout.alert_time)) {
            Ok(alert_time) => alert_time,
            Err(e) => {
                log::debug!("Row {}: {e}", report.total_rows);
                report.invalid_timestamp_rows += 1;
                continue;
            }
        };

        if !config.year_in_range(alert_time.year()) {
            report.outside_year_range_rows += 1;
            continue;
        }

        pending.push(PendingRow {
            administrative_id,
            alert_time,
            commune_name: non_empty(cell(layout.commune_name)),
            burned_area_m2: parse_burned_area(cell(layout.burned_area_m2)),
            alert_origin: non_empty(cell(layout.alert_origin)),
            grid_code: non_empty(cell(layout.grid_code)),
            extras: layout
                .extras
                .iter()
                .map(|(i, _)| non_empty(cell(*i)))
                .collect(),
        });
    }

    let retained: Vec<bool> = (0..layout.extras.len())
        .map(|i| pending.iter().any(|row| row.extras[i].is_some()))
        .collect();

    report.dropped_columns = layout
        .extras
        .iter()
        .zip(&retained)
        .filter(|(_, keep)| !**keep)
        .map(|((_, name), _)| name.clone())
        .collect();

    if !report.dropped_columns.is_empty() {
        log::info!(
            "Dropping all-blank columns: {}",
            report.dropped_columns.join(", ")
        );
    }

    let mut records = Vec::with_capacity(pending.len());
    for row in pending {
        match row.into_record(&layout.extras, &retained) {
            Some(record) => records.push(record),
            None => report.incomplete_rows += 1,
        }
    }

    report.retained_rows = records.len() as u64;

    log::info!(
        "Loaded {} incidents from {} rows ({} malformed, {} outside region {}, {} bad timestamps, {} outside {}-{}, {} incomplete)",
        report.retained_rows,
        report.total_rows,
        report.malformed_rows,
        report.outside_region_rows,
        config.region_prefix,
        report.invalid_timestamp_rows,
        report.outside_year_range_rows,
        config.year_min,
        config.year_max,
        report.incomplete_rows,
    );

    Ok((records, report))
}
