//! Reprojection of boundary coordinates to WGS 84 longitude/latitude.
//!
//! Lambert-93 uses the ellipsoidal Lambert Conformal Conic (two standard
//! parallels) on GRS 80, following Snyder, *Map Projections: A Working
//! Manual*, eqs. 15-1 to 15-11. Web Mercator uses the spherical formulas.

use std::f64::consts::{FRAC_PI_2, FRAC_PI_4};

use fire_map_geography_models::Crs;
use geo::{Coord, MapCoords as _, MultiPolygon};

/// GRS 80 semi-major axis (metres). Also the Web Mercator sphere radius.
const SEMI_MAJOR_AXIS: f64 = 6_378_137.0;

/// GRS 80 first eccentricity.
const ECCENTRICITY: f64 = 0.081_819_191_042_815_8;

const LAMBERT_93_LON0_DEG: f64 = 3.0;
const LAMBERT_93_LAT0_DEG: f64 = 46.5;
const LAMBERT_93_LAT1_DEG: f64 = 49.0;
const LAMBERT_93_LAT2_DEG: f64 = 44.0;
const LAMBERT_93_FALSE_EASTING: f64 = 700_000.0;
const LAMBERT_93_FALSE_NORTHING: f64 = 6_600_000.0;

const LATITUDE_TOLERANCE: f64 = 1e-12;
const MAX_ITERATIONS: usize = 15;

/// Derived Lambert Conformal Conic constants.
struct LambertConic {
    lon0: f64,
    n: f64,
    scaled_f: f64,
    rho0: f64,
}

impl LambertConic {
    fn lambert_93() -> Self {
        let lat1 = LAMBERT_93_LAT1_DEG.to_radians();
        let lat2 = LAMBERT_93_LAT2_DEG.to_radians();
        let m1 = m(lat1);
        let t1 = t(lat1);

        let n = (m1.ln() - m(lat2).ln()) / (t1.ln() - t(lat2).ln());
        let scaled_f = SEMI_MAJOR_AXIS * m1 / (n * t1.powf(n));
        let rho0 = scaled_f * t(LAMBERT_93_LAT0_DEG.to_radians()).powf(n);

        Self {
            lon0: LAMBERT_93_LON0_DEG.to_radians(),
            n,
            scaled_f,
            rho0,
        }
    }

    fn inverse(&self, coord: Coord<f64>) -> Coord<f64> {
        let dx = coord.x - LAMBERT_93_FALSE_EASTING;
        let dy = self.rho0 - (coord.y - LAMBERT_93_FALSE_NORTHING);
        let rho = dx.hypot(dy).copysign(self.n);
        let theta = dx.atan2(dy);
        let t = (rho / self.scaled_f).powf(1.0 / self.n);

        let lon = theta / self.n + self.lon0;

        let mut lat = 2.0f64.mul_add(-t.atan(), FRAC_PI_2);
        for _ in 0..MAX_ITERATIONS {
            let es = ECCENTRICITY * lat.sin();
            let factor = ((1.0 - es) / (1.0 + es)).powf(ECCENTRICITY / 2.0);
            let next = 2.0f64.mul_add(-(t * factor).atan(), FRAC_PI_2);
            let done = (next - lat).abs() < LATITUDE_TOLERANCE;
            lat = next;
            if done {
                break;
            }
        }

        Coord {
            x: lon.to_degrees(),
            y: lat.to_degrees(),
        }
    }

    fn forward(&self, coord: Coord<f64>) -> Coord<f64> {
        let rho = self.scaled_f * t(coord.y.to_radians()).powf(self.n);
        let theta = self.n * (coord.x.to_radians() - self.lon0);

        Coord {
            x: rho.mul_add(theta.sin(), LAMBERT_93_FALSE_EASTING),
            y: rho.mul_add(-theta.cos(), LAMBERT_93_FALSE_NORTHING + self.rho0),
        }
    }
}

/// Snyder eq. 14-15.
fn m(lat: f64) -> f64 {
    let es = ECCENTRICITY * lat.sin();
    lat.cos() / es.mul_add(-es, 1.0).sqrt()
}

/// Snyder eq. 15-9.
fn t(lat: f64) -> f64 {
    let es = ECCENTRICITY * lat.sin();
    (FRAC_PI_4 - lat / 2.0).tan() / ((1.0 - es) / (1.0 + es)).powf(ECCENTRICITY / 2.0)
}

/// Converts one coordinate from `crs` into WGS 84 degrees.
///
/// Returns `None` if the result is non-finite or outside
/// longitude [-180, 180] / latitude [-90, 90].
#[must_use]
pub fn to_wgs84(coord: Coord<f64>, crs: Crs) -> Option<Coord<f64>> {
    let converted = match crs {
        Crs::Wgs84 => coord,
        Crs::Lambert93 => LambertConic::lambert_93().inverse(coord),
        Crs::WebMercator => Coord {
            x: (coord.x / SEMI_MAJOR_AXIS).to_degrees(),
            y: (coord.y / SEMI_MAJOR_AXIS).sinh().atan().to_degrees(),
        },
    };
    in_wgs84_range(converted).then_some(converted)
}

/// Converts one WGS 84 coordinate into `crs`.
#[must_use]
pub fn from_wgs84(coord: Coord<f64>, crs: Crs) -> Coord<f64> {
    match crs {
        Crs::Wgs84 => coord,
        Crs::Lambert93 => LambertConic::lambert_93().forward(coord),
        Crs::WebMercator => Coord {
            x: SEMI_MAJOR_AXIS * coord.x.to_radians(),
            y: SEMI_MAJOR_AXIS * (FRAC_PI_4 + coord.y.to_radians() / 2.0).tan().ln(),
        },
    }
}

/// Whether a coordinate is a finite WGS 84 longitude/latitude.
#[must_use]
pub fn in_wgs84_range(coord: Coord<f64>) -> bool {
    coord.x.is_finite()
        && coord.y.is_finite()
        && (-180.0..=180.0).contains(&coord.x)
        && (-90.0..=90.0).contains(&coord.y)
}

/// Reprojects a boundary outline into WGS 84.
///
/// Returns `None` if any coordinate falls outside the WGS 84 range.
#[must_use]
pub fn reproject_to_wgs84(geometry: &MultiPolygon<f64>, crs: Crs) -> Option<MultiPolygon<f64>> {
    geometry
        .try_map_coords(|coord| to_wgs84(coord, crs).ok_or(()))
        .ok()
}
