//! `GeoJSON` commune layer loader.

use std::collections::BTreeMap;

use fire_map_geography_models::{BoundaryPolygon, BoundaryTable, Crs};
use geo::MultiPolygon;
use geojson::{GeoJson, JsonObject};
use serde_json::Value;

use crate::{BoundaryColumns, BoundarySourceConfig, GeoError};

/// Reads the commune layer named by `config.path`.
///
/// # Errors
///
/// Returns [`GeoError`] if the file cannot be read, is not a `GeoJSON`
/// `FeatureCollection`, or declares an unsupported CRS.
pub fn load_boundaries(config: &BoundarySourceConfig) -> Result<BoundaryTable, GeoError> {
    log::info!("Loading boundaries from {}", config.path.display());

    let text = std::fs::read_to_string(&config.path).map_err(|source| GeoError::Io {
        path: config.path.clone(),
        source,
    })?;

    parse_boundaries(&text, &config.columns)
}

/// Parses a commune `FeatureCollection`.
///
/// # Errors
///
/// Returns [`GeoError`] if the text is not a `FeatureCollection`, a
/// geometry cannot be converted, or the declared CRS is unsupported.
pub fn parse_boundaries(text: &str, columns: &BoundaryColumns) -> Result<BoundaryTable, GeoError> {
    let GeoJson::FeatureCollection(collection) = text.parse::<GeoJson>()? else {
        return Err(GeoError::Conversion {
            message: "boundary layer must be a FeatureCollection".to_string(),
        });
    };

    let crs = declared_crs(collection.foreign_members.as_ref())?;

    let rows = collection
        .features
        .into_iter()
        .map(|feature| {
            let geometry = multipolygon_from_geometry(feature.geometry)?;
            Ok(boundary_from_properties(
                feature.properties.unwrap_or_default(),
                geometry,
                columns,
            ))
        })
        .collect::<Result<Vec<_>, GeoError>>()?;

    log::info!(
        "Loaded {} boundaries (CRS: {})",
        rows.len(),
        crs.map_or_else(|| "undeclared".to_string(), |crs| crs.to_string())
    );

    Ok(BoundaryTable { crs, rows })
}

/// Reads the legacy top-level `crs` member.
///
/// Both the named form (`{"type": "name", "properties": {"name":
/// "EPSG:2154"}}`) and the older `{"type": "EPSG", "properties":
/// {"code": 2154}}` form are understood.
fn declared_crs(foreign_members: Option<&JsonObject>) -> Result<Option<Crs>, GeoError> {
    let Some(member) = foreign_members.and_then(|members| members.get("crs")) else {
        return Ok(None);
    };
    if member.is_null() {
        return Ok(None);
    }

    let properties = member.get("properties");
    let name = properties
        .and_then(|p| p.get("name"))
        .and_then(Value::as_str)
        .map(str::to_string)
        .or_else(|| {
            properties
                .and_then(|p| p.get("code"))
                .and_then(Value::as_u64)
                .map(|code| format!("EPSG:{code}"))
        })
        .ok_or_else(|| GeoError::Conversion {
            message: format!("unreadable crs member: {member}"),
        })?;

    Crs::from_name(&name)
        .map(Some)
        .ok_or(GeoError::UnsupportedCrs { name })
}

/// Converts a feature geometry into a [`MultiPolygon`], promoting
/// polygons. Missing and non-areal geometries become an empty
/// multipolygon so the joiner can exclude them.
///
/// # Errors
///
/// Returns [`GeoError::GeoJson`] if the geometry is malformed.
pub fn multipolygon_from_geometry(
    geometry: Option<geojson::Geometry>,
) -> Result<MultiPolygon<f64>, GeoError> {
    let Some(geometry) = geometry else {
        return Ok(MultiPolygon(vec![]));
    };

    let geo_geom: geo::Geometry<f64> = geometry.try_into()?;
    Ok(match geo_geom {
        geo::Geometry::MultiPolygon(mp) => mp,
        geo::Geometry::Polygon(p) => MultiPolygon(vec![p]),
        other => {
            log::debug!("Ignoring non-areal boundary geometry: {other:?}");
            MultiPolygon(vec![])
        }
    })
}

/// Builds a [`BoundaryPolygon`] from feature properties.
///
/// Property names are trimmed. The identifier, commune and department
/// properties are coerced to trimmed strings (numbers keep their integer
/// form, `null` becomes empty) and written back into the attributes so
/// the export carries the normalized values.
#[must_use]
pub fn boundary_from_properties(
    properties: JsonObject,
    geometry: MultiPolygon<f64>,
    columns: &BoundaryColumns,
) -> BoundaryPolygon {
    let mut attributes: BTreeMap<String, Value> = properties
        .into_iter()
        .map(|(key, value)| (key.trim().to_string(), value))
        .collect();

    let mut text_column = |name: &str| {
        let text = attributes.get(name).map(value_to_text).unwrap_or_default();
        if attributes.contains_key(name) {
            attributes.insert(name.to_string(), Value::String(text.clone()));
        }
        text
    };

    let administrative_id = text_column(&columns.administrative_id);
    let region_name = text_column(&columns.region_name);
    let department_name = text_column(&columns.department_name);

    let population = attributes.get(&columns.population).and_then(value_to_number);
    let surface_area = attributes
        .get(&columns.surface_area)
        .and_then(value_to_number);

    BoundaryPolygon {
        administrative_id,
        region_name,
        department_name,
        population,
        surface_area,
        geometry,
        attributes,
    }
}

/// Coerces a property value to a trimmed string.
#[must_use]
pub fn value_to_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n
            .as_i64()
            .map(|i| i.to_string())
            .or_else(|| n.as_u64().map(|u| u.to_string()))
            .or_else(|| {
                n.as_f64()
                    .filter(|f| f.fract() == 0.0)
                    .map(|f| format!("{f:.0}"))
            })
            .unwrap_or_else(|| n.to_string()),
        other => other.to_string(),
    }
}

/// Coerces a property value to a finite number. Strings may use a
/// decimal comma.
#[must_use]
pub fn value_to_number(value: &Value) -> Option<f64> {
    let number = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().replace(',', ".").parse::<f64>().ok(),
        _ => None,
    };
    number.filter(|n| n.is_finite())
}
