//! `GeoJSON` export and re-load of the joined table.
//!
//! One feature per joined row, in table order. Properties are written in
//! sorted key order so two exports of the same table are byte-identical.
//! The `incident_attributes` foreign member maps the property key of each
//! incident attribute column to its column name, so a re-load can tell
//! them apart from boundary properties. An incident column whose name is
//! already a boundary property or an incident field is written under an
//! `incident_` prefixed key.

use std::collections::{BTreeMap, BTreeSet};
use std::io::{BufWriter, Write as _};
use std::path::Path;
use std::sync::Arc;

use chrono::NaiveDateTime;
use fire_map_geography::BoundaryColumns;
use fire_map_geography::loader::{boundary_from_properties, multipolygon_from_geometry, value_to_text};
use fire_map_geography_models::{BoundaryPolygon, JoinedRow, JoinedTable};
use fire_map_incident_models::{AdministrativeId, IncidentRecord};
use geojson::{Feature, FeatureCollection, GeoJson, JsonObject};
use serde_json::Value;

use crate::SpatialError;

/// Property holding the (back-filled) join key.
pub const ADMINISTRATIVE_ID_PROPERTY: &str = "administrative_id";

/// Foreign member mapping property keys to incident attribute columns.
pub const INCIDENT_ATTRIBUTES_MEMBER: &str = "incident_attributes";

/// Prefix for incident attribute columns that collide with another
/// property.
pub const INCIDENT_KEY_PREFIX: &str = "incident_";

const ALERT_TIME_PROPERTY: &str = "alert_time";
const COMMUNE_NAME_PROPERTY: &str = "commune_name";
const BURNED_AREA_PROPERTY: &str = "burned_area_m2";
const ALERT_ORIGIN_PROPERTY: &str = "alert_origin";
const GRID_CODE_PROPERTY: &str = "grid_code";

const FIXED_PROPERTIES: [&str; 6] = [
    ADMINISTRATIVE_ID_PROPERTY,
    ALERT_TIME_PROPERTY,
    COMMUNE_NAME_PROPERTY,
    BURNED_AREA_PROPERTY,
    ALERT_ORIGIN_PROPERTY,
    GRID_CODE_PROPERTY,
];

const ALERT_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f";

/// Writes `table` as a `FeatureCollection` to `path`, creating parent
/// directories. The file is written next to its destination and renamed
/// into place.
///
/// Returns the number of features written.
///
/// # Errors
///
/// Returns [`SpatialError`] if the directory, file or rename fails, or
/// serialization fails.
pub fn export_geojson(table: &JoinedTable, path: &Path) -> Result<usize, SpatialError> {
    let io_error = |source: std::io::Error| SpatialError::Io {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(io_error)?;
    }

    let collection = to_feature_collection(table);
    let count = collection.features.len();

    let tmp_path = path.with_extension("geojson.tmp");
    let file = std::fs::File::create(&tmp_path).map_err(io_error)?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer(&mut writer, &collection)?;
    writer.write_all(b"\n").map_err(io_error)?;
    writer.flush().map_err(io_error)?;
    drop(writer);
    std::fs::rename(&tmp_path, path).map_err(io_error)?;

    log::info!("Exported {count} features to {}", path.display());

    Ok(count)
}

/// Builds the `FeatureCollection` for `table`.
#[must_use]
pub fn to_feature_collection(table: &JoinedTable) -> FeatureCollection {
    let incident_columns = incident_column_keys(table);

    let features = table
        .rows()
        .iter()
        .map(|row| Feature {
            bbox: None,
            geometry: Some(geojson::Geometry::new(geojson::Value::from(
                &row.boundary.geometry,
            ))),
            id: None,
            properties: Some(row_properties(row, &incident_columns)),
            foreign_members: None,
        })
        .collect();

    let mut foreign_members = JsonObject::new();
    foreign_members.insert(
        INCIDENT_ATTRIBUTES_MEMBER.to_string(),
        Value::Object(
            incident_columns
                .iter()
                .map(|(key, name)| (key.clone(), Value::from(*name)))
                .collect(),
        ),
    );

    FeatureCollection {
        bbox: None,
        features,
        foreign_members: Some(foreign_members),
    }
}

/// Property key of every incident attribute column, mapped to the column
/// name.
fn incident_column_keys(table: &JoinedTable) -> BTreeMap<String, &str> {
    let names: BTreeSet<&str> = table
        .incidents()
        .flat_map(|(_, incident)| incident.attributes.keys().map(String::as_str))
        .collect();

    let mut reserved: BTreeSet<&str> = FIXED_PROPERTIES.into_iter().collect();
    for row in table.rows() {
        reserved.extend(row.boundary.attributes.keys().map(String::as_str));
    }

    let mut taken: BTreeSet<String> = reserved
        .iter()
        .chain(&names)
        .map(|name| (*name).to_string())
        .collect();

    let mut keys = BTreeMap::new();
    for name in names {
        let mut key = name.to_string();
        if reserved.contains(name) {
            while taken.contains(&key) {
                key = format!("{INCIDENT_KEY_PREFIX}{key}");
            }
            log::warn!("Incident column '{name}' collides with another property, exported as '{key}'");
            taken.insert(key.clone());
        }
        keys.insert(key, name);
    }
    keys
}

fn row_properties(row: &JoinedRow, incident_columns: &BTreeMap<String, &str>) -> JsonObject {
    let incident = row.incident.as_ref();
    let text = |value: Option<&String>| value.map_or(Value::Null, |s| Value::String(s.clone()));

    let mut properties: BTreeMap<String, Value> = incident_columns
        .iter()
        .map(|(key, name)| {
            (
                key.clone(),
                text(incident.and_then(|i| i.attributes.get(*name))),
            )
        })
        .collect();

    properties.insert(
        ALERT_TIME_PROPERTY.to_string(),
        incident.map_or(Value::Null, |i| {
            Value::String(i.alert_time.format(ALERT_TIME_FORMAT).to_string())
        }),
    );
    properties.insert(
        COMMUNE_NAME_PROPERTY.to_string(),
        text(incident.map(|i| &i.commune_name)),
    );
    properties.insert(
        BURNED_AREA_PROPERTY.to_string(),
        incident.map_or(Value::Null, |i| Value::from(i.burned_area_m2)),
    );
    properties.insert(
        ALERT_ORIGIN_PROPERTY.to_string(),
        text(incident.map(|i| &i.alert_origin)),
    );
    properties.insert(
        GRID_CODE_PROPERTY.to_string(),
        text(incident.map(|i| &i.grid_code)),
    );

    for (name, value) in &row.boundary.attributes {
        properties.insert(name.clone(), value.clone());
    }

    properties.insert(
        ADMINISTRATIVE_ID_PROPERTY.to_string(),
        Value::String(row.administrative_id.clone()),
    );

    properties.into_iter().collect()
}

/// Re-reads an exported artifact into a [`JoinedTable`].
///
/// Consecutive features with identical boundary properties and geometry
/// share one [`BoundaryPolygon`].
///
/// # Errors
///
/// Returns [`SpatialError`] if the file cannot be read or parsed, or an
/// incident property is malformed.
pub fn load_joined_table(path: &Path, columns: &BoundaryColumns) -> Result<JoinedTable, SpatialError> {
    let text = std::fs::read_to_string(path).map_err(|source| SpatialError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let GeoJson::FeatureCollection(collection) = text.parse::<GeoJson>()? else {
        return Err(SpatialError::Conversion {
            message: format!("{} is not a FeatureCollection", path.display()),
        });
    };

    let incident_columns: BTreeMap<String, String> = collection
        .foreign_members
        .as_ref()
        .and_then(|members| members.get(INCIDENT_ATTRIBUTES_MEMBER))
        .and_then(Value::as_object)
        .map(|keys| {
            keys.iter()
                .filter_map(|(key, name)| Some((key.clone(), name.as_str()?.to_string())))
                .collect()
        })
        .unwrap_or_default();

    let mut rows = Vec::with_capacity(collection.features.len());
    let mut previous: Option<Arc<BoundaryPolygon>> = None;

    for feature in collection.features {
        let geometry = multipolygon_from_geometry(feature.geometry)?;
        let mut properties = feature.properties.unwrap_or_default();

        let administrative_id = properties
            .remove(ADMINISTRATIVE_ID_PROPERTY)
            .map(|value| value_to_text(&value))
            .unwrap_or_default();
        let incident = take_incident(&mut properties, &administrative_id, &incident_columns)?;

        let boundary = boundary_from_properties(properties, geometry, columns);
        let boundary = match previous.take() {
            Some(shared) if *shared == boundary => shared,
            _ => Arc::new(boundary),
        };
        previous = Some(Arc::clone(&boundary));

        rows.push(JoinedRow {
            administrative_id,
            boundary,
            incident,
        });
    }

    log::info!("Loaded {} joined rows from {}", rows.len(), path.display());

    Ok(JoinedTable::from_rows(rows))
}

/// Removes the incident properties from `properties`, rebuilding the
/// incident when one was attached.
fn take_incident(
    properties: &mut JsonObject,
    administrative_id: &str,
    incident_columns: &BTreeMap<String, String>,
) -> Result<Option<IncidentRecord>, SpatialError> {
    let mut take = |name: &str| properties.remove(name).filter(|value| !value.is_null());

    let alert_time = take(ALERT_TIME_PROPERTY);
    let commune_name = take(COMMUNE_NAME_PROPERTY);
    let burned_area = take(BURNED_AREA_PROPERTY);
    let alert_origin = take(ALERT_ORIGIN_PROPERTY);
    let grid_code = take(GRID_CODE_PROPERTY);
    let attributes: BTreeMap<String, String> = incident_columns
        .iter()
        .filter_map(|(key, name)| take(key.as_str()).map(|value| (name.clone(), value_to_text(&value))))
        .collect();

    let Some(alert_time) = alert_time else {
        return Ok(None);
    };

    let conversion = |message: String| SpatialError::Conversion { message };

    let alert_time = alert_time
        .as_str()
        .and_then(|s| NaiveDateTime::parse_from_str(s, ALERT_TIME_FORMAT).ok())
        .ok_or_else(|| conversion(format!("invalid {ALERT_TIME_PROPERTY}: {alert_time}")))?;
    let administrative_id = AdministrativeId::parse(administrative_id)
        .map_err(|e| conversion(format!("{ADMINISTRATIVE_ID_PROPERTY}: {e}")))?;
    let burned_area_m2 = burned_area
        .as_ref()
        .and_then(Value::as_f64)
        .ok_or_else(|| conversion(format!("missing or invalid {BURNED_AREA_PROPERTY}")))?;

    Ok(Some(IncidentRecord {
        alert_time,
        administrative_id,
        commune_name: commune_name.as_ref().map(value_to_text).unwrap_or_default(),
        burned_area_m2,
        alert_origin: alert_origin.as_ref().map(value_to_text).unwrap_or_default(),
        grid_code: grid_code.as_ref().map(value_to_text).unwrap_or_default(),
        attributes,
    }))
}

#[cfg(test)]
mod tests {
    use fire_map_geography_models::{BoundaryTable, Crs};
    use geo::MultiPolygon;

    use super::*;
    use crate::join::join;
    use crate::join::tests::{boundary, incident, square};

    fn temp_path(name: &str) -> std::path::PathBuf {
        std::env::temp_dir()
            .join(format!("fire_map_export_{}", std::process::id()))
            .join(name)
    }

    fn joined() -> JoinedTable {
        let boundaries = BoundaryTable {
            crs: Some(Crs::Lambert93),
            rows: vec![
                boundary("13001", "Aix-en-Provence", square(5.4, 43.5, Crs::Lambert93)),
                boundary("13002", "Allauch", square(5.5, 43.3, Crs::Lambert93)),
            ],
        };
        let incidents = vec![
            incident("13001", "Aix-en-Provence", 10, 5_000.0),
            incident("13001", "Aix-en-Provence", 14, 15_000.0),
        ];
        join(boundaries, incidents, Crs::Lambert93).unwrap().0
    }

    fn assert_geometry_close(a: &MultiPolygon<f64>, b: &MultiPolygon<f64>) {
        let coords = |mp: &MultiPolygon<f64>| {
            mp.0.iter()
                .flat_map(|p| p.exterior().coords().copied().collect::<Vec<_>>())
                .collect::<Vec<_>>()
        };
        let (a, b) = (coords(a), coords(b));
        assert_eq!(a.len(), b.len());
        for (a, b) in a.iter().zip(&b) {
            assert!((a.x - b.x).abs() < 1e-12 && (a.y - b.y).abs() < 1e-12);
        }
    }

    #[test]
    fn properties_cover_boundary_and_incident_columns() {
        let table = joined();
        let collection = to_feature_collection(&table);

        assert_eq!(collection.features.len(), 3);

        let matched = collection.features[0].properties.as_ref().unwrap();
        assert_eq!(matched["administrative_id"], "13001");
        assert_eq!(matched["INSEE_COM"], "13001");
        assert_eq!(matched["NOM_COM"], "Aix-en-Provence");
        assert_eq!(matched["alert_time"], "2019-07-14 10:30:00");
        assert_eq!(matched["burned_area_m2"], 5000.0);
        assert_eq!(matched["Numéro"], "13001-10");

        let unmatched = collection.features[2].properties.as_ref().unwrap();
        assert_eq!(unmatched["administrative_id"], "13002");
        assert!(unmatched["alert_time"].is_null());
        assert!(unmatched["Numéro"].is_null());

        let keys: Vec<&String> = matched.keys().collect();
        let mut sorted = keys.clone();
        sorted.sort();
        assert_eq!(keys, sorted);
    }

    #[test]
    fn round_trip_preserves_rows_attributes_and_geometry() {
        let table = joined();
        let path = temp_path("roundtrip/all_communes.geojson");

        let written = export_geojson(&table, &path).unwrap();
        let reloaded = load_joined_table(&path, &BoundaryColumns::default()).unwrap();

        assert_eq!(written, table.len());
        assert_eq!(reloaded.len(), table.len());
        for (original, loaded) in table.rows().iter().zip(reloaded.rows()) {
            assert_eq!(loaded.administrative_id, original.administrative_id);
            assert_eq!(loaded.incident, original.incident);
            assert_eq!(loaded.boundary.attributes, original.boundary.attributes);
            assert_eq!(loaded.boundary.region_name, original.boundary.region_name);
            assert_geometry_close(&loaded.boundary.geometry, &original.boundary.geometry);
        }
        assert!(Arc::ptr_eq(
            &reloaded.rows()[0].boundary,
            &reloaded.rows()[1].boundary
        ));

        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn export_is_idempotent() {
        let first = temp_path("idempotent/first.geojson");
        let second = temp_path("idempotent/second.geojson");

        export_geojson(&joined(), &first).unwrap();
        export_geojson(&joined(), &second).unwrap();

        assert_eq!(
            std::fs::read(&first).unwrap(),
            std::fs::read(&second).unwrap()
        );

        let reloaded = load_joined_table(&first, &BoundaryColumns::default()).unwrap();
        let third = temp_path("idempotent/third.geojson");
        export_geojson(&reloaded, &third).unwrap();
        assert_eq!(
            std::fs::read(&first).unwrap(),
            std::fs::read(&third).unwrap()
        );

        for path in [first, second, third] {
            std::fs::remove_file(path).ok();
        }
    }

    #[test]
    fn colliding_incident_column_keeps_both_values() {
        let boundaries = BoundaryTable {
            crs: Some(Crs::Lambert93),
            rows: vec![boundary(
                "13001",
                "Aix-en-Provence",
                square(5.4, 43.5, Crs::Lambert93),
            )],
        };
        let mut fire = incident("13001", "Aix-en-Provence", 10, 5_000.0);
        fire.attributes
            .insert("NOM_COM".to_string(), "Aix (relevé)".to_string());
        fire.attributes
            .insert("grid_code".to_string(), "legacy".to_string());
        let table = join(boundaries, vec![fire], Crs::Lambert93).unwrap().0;

        let collection = to_feature_collection(&table);
        let properties = collection.features[0].properties.as_ref().unwrap();
        assert_eq!(properties["NOM_COM"], "Aix-en-Provence");
        assert_eq!(properties["incident_NOM_COM"], "Aix (relevé)");
        assert_eq!(properties["grid_code"], "KD12D4");
        assert_eq!(properties["incident_grid_code"], "legacy");
        assert_eq!(properties["Numéro"], "13001-10");

        let path = temp_path("collision/all_communes.geojson");
        export_geojson(&table, &path).unwrap();
        let reloaded = load_joined_table(&path, &BoundaryColumns::default()).unwrap();
        let (original, loaded) = (&table.rows()[0], &reloaded.rows()[0]);
        assert_eq!(loaded.incident, original.incident);
        assert_eq!(loaded.boundary.attributes, original.boundary.attributes);

        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn load_rejects_non_collection() {
        let path = temp_path("point.geojson");
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, r#"{"type": "Point", "coordinates": [5.0, 43.0]}"#).unwrap();

        let err = load_joined_table(&path, &BoundaryColumns::default()).unwrap_err();
        assert!(matches!(err, SpatialError::Conversion { .. }));

        std::fs::remove_file(&path).ok();
    }
}
