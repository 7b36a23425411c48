#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Aggregation filter and result types.
//!
//! Every aggregation takes an optional year and an optional region name.
//! Empty selections are a normal state: results are empty maps, empty
//! series, a zero count and `null` floats, never errors.

use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// Bubble-size scaling applied to category counts.
pub const IMPACT_PER_INCIDENT: f64 = 10.0;

/// Optional restrictions applied before aggregating.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregationFilter {
    /// Keep only alerts raised in this calendar year.
    pub year: Option<i32>,
    /// Keep only rows whose region name equals this value.
    pub region: Option<String>,
}

impl AggregationFilter {
    /// A filter that keeps everything.
    #[must_use]
    pub const fn all() -> Self {
        Self {
            year: None,
            region: None,
        }
    }

    /// Restricts to one year.
    #[must_use]
    pub const fn with_year(mut self, year: i32) -> Self {
        self.year = Some(year);
        self
    }

    /// Restricts to one region name.
    #[must_use]
    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }

    /// Whether a row with this year and region name passes the filter.
    #[must_use]
    pub fn matches(&self, year: Option<i32>, region_name: &str) -> bool {
        self.year.is_none_or(|wanted| year == Some(wanted))
            && self
                .region
                .as_deref()
                .is_none_or(|wanted| wanted == region_name)
    }
}

/// Scalar summary of the filtered incidents.
///
/// Areas in hectares are rounded to two decimals. Extremes stay in
/// square metres.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScalarSummary {
    /// Number of distinct alert timestamps.
    pub fire_count: u64,
    /// Total burned area in hectares.
    pub total_area_ha: Option<f64>,
    /// Mean burned area in hectares.
    pub mean_area_ha: Option<f64>,
    /// Largest burned area in square metres.
    pub max_area_m2: Option<f64>,
    /// Smallest burned area in square metres.
    pub min_area_m2: Option<f64>,
}

/// Frequency of one category value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryFrequency {
    /// Number of incidents.
    pub count: u64,
    /// `count` scaled by [`IMPACT_PER_INCIDENT`].
    pub impact: f64,
}

impl CategoryFrequency {
    /// Builds the frequency for `count` incidents.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn from_count(count: u64) -> Self {
        Self {
            count,
            impact: count as f64 * IMPACT_PER_INCIDENT,
        }
    }
}

/// Temporal bucket size for trend series.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum TimeGranularity {
    /// Calendar month (`"2019-07"`).
    Month,
    /// Hour of day (`"00"` to `"23"`).
    Hour,
    /// Calendar year (`"2019"`).
    Year,
}

/// A time-series data point.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeSeriesPoint {
    /// Bucket label.
    pub period: String,
    /// Number of incidents in the bucket.
    pub count: u64,
}

/// Population intensity of one commune.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegionDensity {
    /// Population divided by surface area. `None` when either is
    /// missing or the surface area is zero.
    pub population_intensity: Option<f64>,
    /// `ln(1 + population_intensity)`, the value used for colouring.
    pub log_intensity: Option<f64>,
}

impl RegionDensity {
    /// Derives the density from raw population and surface area.
    #[must_use]
    pub fn from_population(population: Option<f64>, surface_area: Option<f64>) -> Self {
        let population_intensity = population
            .zip(surface_area)
            .filter(|(_, surface)| *surface != 0.0)
            .map(|(population, surface)| population / surface)
            .filter(|intensity| intensity.is_finite());

        Self {
            population_intensity,
            log_intensity: population_intensity.map(f64::ln_1p),
        }
    }
}

/// Values available for the year and region selectors.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterOptions {
    /// Distinct alert years, ascending.
    pub years: Vec<i32>,
    /// Distinct region names, sorted.
    pub regions: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filter_matches() {
        let all = AggregationFilter::all();
        assert!(all.matches(Some(2019), "Aix"));
        assert!(all.matches(None, ""));

        let year = AggregationFilter::all().with_year(2019);
        assert!(year.matches(Some(2019), "Aix"));
        assert!(!year.matches(Some(2020), "Aix"));
        assert!(!year.matches(None, "Aix"));

        let region = AggregationFilter::all().with_region("Aix");
        assert!(region.matches(Some(2019), "Aix"));
        assert!(!region.matches(Some(2019), "Allauch"));
    }

    #[test]
    fn impact_is_ten_per_incident() {
        let frequency = CategoryFrequency::from_count(7);
        assert_eq!(frequency.count, 7);
        assert!((frequency.impact - 70.0).abs() < f64::EPSILON);
    }

    #[test]
    fn density_guards_zero_surface() {
        let defined = RegionDensity::from_population(Some(1_000.0), Some(10.0));
        assert_eq!(defined.population_intensity, Some(100.0));
        assert!((defined.log_intensity.unwrap() - 101.0_f64.ln()).abs() < 1e-12);

        let zero = RegionDensity::from_population(Some(1_000.0), Some(0.0));
        assert_eq!(zero.population_intensity, None);
        assert_eq!(zero.log_intensity, None);

        assert_eq!(
            RegionDensity::from_population(None, Some(10.0)).population_intensity,
            None
        );
    }

    #[test]
    fn granularity_parses_path_segment() {
        assert_eq!("month".parse::<TimeGranularity>().unwrap(), TimeGranularity::Month);
        assert_eq!("hour".parse::<TimeGranularity>().unwrap(), TimeGranularity::Hour);
        assert!("week".parse::<TimeGranularity>().is_err());
        assert_eq!(TimeGranularity::Year.to_string(), "year");
    }

    #[test]
    fn empty_summary_serializes_nulls() {
        let json = serde_json::to_value(ScalarSummary::default()).unwrap();
        assert_eq!(json["fireCount"], 0);
        assert!(json["totalAreaHa"].is_null());
        assert!(json["minAreaM2"].is_null());
    }
}
