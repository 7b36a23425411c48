//! Coordinate reference systems understood by the pipeline.
//!
//! Maps EPSG codes and the CRS name forms found in `GeoJSON` `crs` members
//! (`EPSG:2154`, `urn:ogc:def:crs:EPSG::2154`, `urn:ogc:def:crs:OGC:1.3:CRS84`)
//! to the small set of systems the reprojection step can handle.

use serde::{Deserialize, Serialize};

/// EPSG code of WGS 84 geographic coordinates (longitude/latitude).
pub const EPSG_WGS84: u32 = 4326;

/// EPSG code of RGF93 v1 / Lambert-93, the French national projection.
pub const EPSG_LAMBERT_93: u32 = 2154;

/// EPSG code of WGS 84 / Pseudo-Mercator.
pub const EPSG_WEB_MERCATOR: u32 = 3857;

/// A supported coordinate reference system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Crs {
    /// Geographic longitude/latitude on the WGS 84 datum.
    Wgs84,
    /// RGF93 / Lambert-93 conformal conic projection, in metres.
    Lambert93,
    /// Spherical Web Mercator projection, in metres.
    WebMercator,
}

impl Crs {
    /// Looks up a CRS by EPSG code.
    #[must_use]
    pub const fn from_epsg(code: u32) -> Option<Self> {
        match code {
            EPSG_WGS84 => Some(Self::Wgs84),
            EPSG_LAMBERT_93 => Some(Self::Lambert93),
            EPSG_WEB_MERCATOR | 900_913 => Some(Self::WebMercator),
            _ => None,
        }
    }

    /// The EPSG code of this CRS.
    #[must_use]
    pub const fn epsg(self) -> u32 {
        match self {
            Self::Wgs84 => EPSG_WGS84,
            Self::Lambert93 => EPSG_LAMBERT_93,
            Self::WebMercator => EPSG_WEB_MERCATOR,
        }
    }

    /// Parses a CRS name as found in a `GeoJSON` `crs` member.
    ///
    /// Returns `None` if the name is not recognized or names an
    /// unsupported system.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        parse_epsg_code(name).and_then(Self::from_epsg)
    }
}

impl std::fmt::Display for Crs {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "EPSG:{}", self.epsg())
    }
}

/// Extracts the EPSG code from a CRS name.
///
/// `CRS84` (any authority form) is treated as EPSG:4326 since both use
/// the WGS 84 datum; only axis order differs and `GeoJSON` is always
/// longitude first.
#[must_use]
pub fn parse_epsg_code(name: &str) -> Option<u32> {
    let upper = name.trim().to_ascii_uppercase();
    if upper.ends_with("CRS84") {
        return Some(EPSG_WGS84);
    }

    let rest = upper
        .strip_prefix("EPSG:")
        .or_else(|| upper.strip_prefix("URN:OGC:DEF:CRS:EPSG:"))?;

    // `urn:ogc:def:crs:EPSG::2154` and `urn:ogc:def:crs:EPSG:6.3:2154`
    // both put the code after the last colon.
    rest.rsplit(':').next()?.trim().parse().ok()
}
