#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Filtered aggregations over the joined incident table.
//!
//! Every function is a pure read of a [`JoinedTable`] snapshot: it
//! allocates its own intermediate state and never mutates the table, so
//! concurrent requests can share one table without locking. Apart from
//! [`density`], only rows that carry an incident are considered.

use std::collections::{BTreeMap, BTreeSet};

use fire_map_analytics_models::{
    AggregationFilter, CategoryFrequency, FilterOptions, RegionDensity, ScalarSummary,
    TimeGranularity, TimeSeriesPoint,
};
use fire_map_geography_models::{JoinedRow, JoinedTable};
use fire_map_incident_models::{CategoryField, IncidentRecord, SQUARE_METRES_PER_HECTARE};

/// Incident rows passing `filter`.
fn filtered<'a>(
    table: &'a JoinedTable,
    filter: &'a AggregationFilter,
) -> impl Iterator<Item = (&'a JoinedRow, &'a IncidentRecord)> + 'a {
    table
        .incidents()
        .filter(move |(row, incident)| filter.matches(Some(incident.year()), row.region_name()))
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Counts, sum, mean and extremes of burned area for the filtered
/// incidents.
///
/// The fire count is the number of distinct alert timestamps. On an
/// empty selection the count is zero and every area is `None`.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn summarize(table: &JoinedTable, filter: &AggregationFilter) -> ScalarSummary {
    let mut timestamps = BTreeSet::new();
    let mut total_m2 = 0.0;
    let mut rows = 0_usize;
    let mut max_m2: Option<f64> = None;
    let mut min_m2: Option<f64> = None;

    for (_, incident) in filtered(table, filter) {
        timestamps.insert(incident.alert_time);
        total_m2 += incident.burned_area_m2;
        rows += 1;
        max_m2 = Some(max_m2.map_or(incident.burned_area_m2, |m| m.max(incident.burned_area_m2)));
        min_m2 = Some(min_m2.map_or(incident.burned_area_m2, |m| m.min(incident.burned_area_m2)));
    }

    if rows == 0 {
        log::debug!("summarize: empty selection for {filter:?}");
        return ScalarSummary::default();
    }

    let total_ha = total_m2 / SQUARE_METRES_PER_HECTARE;

    ScalarSummary {
        fire_count: timestamps.len() as u64,
        total_area_ha: Some(round2(total_ha)),
        mean_area_ha: Some(round2(total_ha / rows as f64)),
        max_area_m2: max_m2,
        min_area_m2: min_m2,
    }
}

/// Total burned area in hectares per region name.
#[must_use]
pub fn by_region(table: &JoinedTable, filter: &AggregationFilter) -> BTreeMap<String, f64> {
    let mut totals = BTreeMap::new();
    for (row, incident) in filtered(table, filter) {
        *totals.entry(row.region_name().to_string()).or_insert(0.0) += incident.burned_area_ha();
    }
    totals
}

/// Frequency and impact per value of a categorical field.
#[must_use]
pub fn by_category(
    table: &JoinedTable,
    field: CategoryField,
    filter: &AggregationFilter,
) -> BTreeMap<String, CategoryFrequency> {
    let mut counts: BTreeMap<String, u64> = BTreeMap::new();
    for (_, incident) in filtered(table, filter) {
        *counts.entry(incident.category(field).to_string()).or_insert(0) += 1;
    }
    counts
        .into_iter()
        .map(|(value, count)| (value, CategoryFrequency::from_count(count)))
        .collect()
}

/// Incident counts per bucket, in chronological (or hour) order.
#[must_use]
pub fn trend(
    table: &JoinedTable,
    granularity: TimeGranularity,
    filter: &AggregationFilter,
) -> Vec<TimeSeriesPoint> {
    // Keys are zero-padded so lexical order is numeric order.
    let mut counts: BTreeMap<String, u64> = BTreeMap::new();
    for (_, incident) in filtered(table, filter) {
        let period = match granularity {
            TimeGranularity::Month => incident.month_label(),
            TimeGranularity::Hour => format!("{:02}", incident.hour()),
            TimeGranularity::Year => format!("{:04}", incident.year()),
        };
        *counts.entry(period).or_insert(0) += 1;
    }
    counts
        .into_iter()
        .map(|(period, count)| TimeSeriesPoint { period, count })
        .collect()
}

/// Incident counts per calendar month.
#[must_use]
pub fn by_month(table: &JoinedTable, filter: &AggregationFilter) -> Vec<TimeSeriesPoint> {
    trend(table, TimeGranularity::Month, filter)
}

/// Incident counts per hour of day.
#[must_use]
pub fn by_hour(table: &JoinedTable, filter: &AggregationFilter) -> Vec<TimeSeriesPoint> {
    trend(table, TimeGranularity::Hour, filter)
}

/// Incident counts per calendar year.
#[must_use]
pub fn by_year(table: &JoinedTable, filter: &AggregationFilter) -> Vec<TimeSeriesPoint> {
    trend(table, TimeGranularity::Year, filter)
}

/// Population intensity per commune, keyed by the boundary's region
/// name.
///
/// Every boundary counts once however many incidents it carries. With a
/// region, only boundaries having a row with that region name are kept.
#[must_use]
pub fn density(table: &JoinedTable, region: Option<&str>) -> BTreeMap<String, RegionDensity> {
    let mut seen = BTreeSet::new();
    let mut densities = BTreeMap::new();

    for row in table.rows() {
        if region.is_some_and(|wanted| wanted != row.region_name()) {
            continue;
        }
        if !seen.insert(row.administrative_id.as_str()) {
            continue;
        }
        let boundary = &row.boundary;
        densities.insert(
            boundary.region_name.clone(),
            RegionDensity::from_population(boundary.population, boundary.surface_area),
        );
    }

    densities
}

/// Sorted distinct alert years.
#[must_use]
pub fn available_years(table: &JoinedTable) -> Vec<i32> {
    table
        .incidents()
        .map(|(_, incident)| incident.year())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Sorted distinct incident region names.
#[must_use]
pub fn available_regions(table: &JoinedTable) -> Vec<String> {
    table
        .incidents()
        .map(|(row, _)| row.region_name())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .map(str::to_string)
        .collect()
}

/// Both selector lists.
#[must_use]
pub fn filter_options(table: &JoinedTable) -> FilterOptions {
    FilterOptions {
        years: available_years(table),
        regions: available_regions(table),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::NaiveDate;
    use fire_map_geography_models::BoundaryPolygon;
    use fire_map_incident_models::AdministrativeId;
    use geo::MultiPolygon;

    use super::*;

    fn boundary(id: &str, name: &str, population: f64, surface: f64) -> Arc<BoundaryPolygon> {
        Arc::new(BoundaryPolygon {
            administrative_id: id.to_string(),
            region_name: name.to_string(),
            department_name: "BOUCHES-DU-RHONE".to_string(),
            population: Some(population),
            surface_area: Some(surface),
            geometry: MultiPolygon(vec![]),
            attributes: BTreeMap::new(),
        })
    }

    fn incident(
        id: &str,
        commune: &str,
        (year, month, day, hour): (i32, u32, u32, u32),
        area_m2: f64,
        origin: &str,
    ) -> IncidentRecord {
        IncidentRecord {
            alert_time: NaiveDate::from_ymd_opt(year, month, day)
                .unwrap()
                .and_hms_opt(hour, 0, 0)
                .unwrap(),
            administrative_id: AdministrativeId::parse(id).unwrap(),
            commune_name: commune.to_string(),
            burned_area_m2: area_m2,
            alert_origin: origin.to_string(),
            grid_code: format!("KD{hour}"),
            attributes: BTreeMap::new(),
        }
    }

    fn matched(boundary: &Arc<BoundaryPolygon>, incident: IncidentRecord) -> JoinedRow {
        JoinedRow {
            administrative_id: incident.administrative_id.to_string(),
            boundary: Arc::clone(boundary),
            incident: Some(incident),
        }
    }

    fn unmatched(boundary: &Arc<BoundaryPolygon>) -> JoinedRow {
        JoinedRow {
            administrative_id: boundary.administrative_id.clone(),
            boundary: Arc::clone(boundary),
            incident: None,
        }
    }

    /// Region "A": two fires of 5 000 and 15 000 m² in 2019.
    /// Region "C": one fire of 30 000 m² in 2020, at the same hour of day
    /// as one of A's. Region "B": no fires, zero surface.
    fn table() -> JoinedTable {
        let a = boundary("13001", "A", 1_000.0, 10.0);
        let b = boundary("13002", "B", 1_000.0, 0.0);
        let c = boundary("13003", "C", 500.0, 50.0);
        JoinedTable::from_rows(vec![
            matched(&a, incident("13001", "A", (2019, 7, 14, 16), 5_000.0, "Vigie")),
            matched(&a, incident("13001", "A", (2019, 8, 2, 9), 15_000.0, "Patrouille")),
            unmatched(&b),
            matched(&c, incident("13003", "C", (2020, 7, 14, 16), 30_000.0, "Vigie")),
        ])
    }

    #[test]
    fn summarize_two_fires_in_region_a() {
        let summary = summarize(&table(), &AggregationFilter::all().with_region("A"));
        assert_eq!(summary.fire_count, 2);
        assert_eq!(summary.total_area_ha, Some(2.0));
        assert_eq!(summary.mean_area_ha, Some(1.0));
        assert_eq!(summary.max_area_m2, Some(15_000.0));
        assert_eq!(summary.min_area_m2, Some(5_000.0));
    }

    #[test]
    fn summarize_unfiltered() {
        let summary = summarize(&table(), &AggregationFilter::all());
        assert_eq!(summary.fire_count, 3);
        assert_eq!(summary.total_area_ha, Some(5.0));
        assert_eq!(summary.mean_area_ha, Some(1.67));
        assert_eq!(summary.max_area_m2, Some(30_000.0));
    }

    #[test]
    fn fire_count_counts_distinct_timestamps() {
        let a = boundary("13001", "A", 1.0, 1.0);
        let same_time = (2019, 7, 14, 16);
        let table = JoinedTable::from_rows(vec![
            matched(&a, incident("13001", "A", same_time, 1.0, "Vigie")),
            matched(&a, incident("13001", "A", same_time, 2.0, "Vigie")),
        ]);
        assert_eq!(summarize(&table, &AggregationFilter::all()).fire_count, 1);
    }

    #[test]
    fn empty_selection_is_not_an_error() {
        let table = table();
        let filter = AggregationFilter::all().with_year(1999);

        assert_eq!(summarize(&table, &filter), ScalarSummary::default());
        assert!(by_region(&table, &filter).is_empty());
        assert!(by_category(&table, CategoryField::AlertOrigin, &filter).is_empty());
        assert!(by_month(&table, &filter).is_empty());
        assert!(by_hour(&table, &filter).is_empty());
        assert!(by_year(&table, &filter).is_empty());

        let unknown = AggregationFilter::all().with_region("Nowhere");
        assert_eq!(summarize(&table, &unknown).fire_count, 0);
        assert!(density(&table, Some("Nowhere")).is_empty());
    }

    #[test]
    fn by_region_sums_hectares() {
        let totals = by_region(&table(), &AggregationFilter::all());
        assert_eq!(totals.len(), 2);
        assert!((totals["A"] - 2.0).abs() < 1e-9);
        assert!((totals["C"] - 3.0).abs() < 1e-9);
        assert!(!totals.contains_key("B"));
    }

    #[test]
    fn by_category_counts_and_scales_impact() {
        let origins = by_category(&table(), CategoryField::AlertOrigin, &AggregationFilter::all());
        assert_eq!(origins["Vigie"].count, 2);
        assert!((origins["Vigie"].impact - 20.0).abs() < f64::EPSILON);
        assert_eq!(origins["Patrouille"].count, 1);

        let grid = by_category(
            &table(),
            CategoryField::GridCode,
            &AggregationFilter::all().with_year(2019),
        );
        assert_eq!(grid.len(), 2);
    }

    #[test]
    fn trends_are_ordered() {
        let table = table();
        let all = AggregationFilter::all();

        let months: Vec<_> = by_month(&table, &all).into_iter().map(|p| p.period).collect();
        assert_eq!(months, vec!["2019-07", "2019-08", "2020-07"]);

        let hours = by_hour(&table, &all);
        assert_eq!(
            hours,
            vec![
                TimeSeriesPoint { period: "09".to_string(), count: 1 },
                TimeSeriesPoint { period: "16".to_string(), count: 2 },
            ]
        );

        let years = by_year(&table, &AggregationFilter::all().with_region("A"));
        assert_eq!(years, vec![TimeSeriesPoint { period: "2019".to_string(), count: 2 }]);
    }

    #[test]
    fn density_is_undefined_for_zero_surface() {
        let densities = density(&table(), None);
        assert_eq!(densities.len(), 3);
        assert_eq!(densities["A"].population_intensity, Some(100.0));
        assert!(densities["A"].log_intensity.is_some());
        assert_eq!(densities["B"].population_intensity, None);
        assert_eq!(densities["B"].log_intensity, None);

        let only_a = density(&table(), Some("A"));
        assert_eq!(only_a.keys().collect::<Vec<_>>(), vec!["A"]);
    }

    #[test]
    fn selector_options() {
        let options = filter_options(&table());
        assert_eq!(options.years, vec![2019, 2020]);
        assert_eq!(options.regions, vec!["A", "C"]);
    }
}
