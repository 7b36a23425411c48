#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! API request and response types for the fire map server.
//!
//! Aggregation results are served as the analytics model types directly.
//! This crate only holds the query parameters and the small envelopes the
//! handlers add around them.

use fire_map_analytics_models::AggregationFilter;
use serde::{Deserialize, Deserializer, Serialize};

/// Query parameters shared by the aggregation endpoints.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterParams {
    /// Calendar year of the alert. Empty means no filter.
    #[serde(default, deserialize_with = "blank_year")]
    pub year: Option<i32>,
    /// Region (commune) name. Empty means no filter.
    pub region: Option<String>,
}

impl From<FilterParams> for AggregationFilter {
    fn from(params: FilterParams) -> Self {
        Self {
            year: params.year,
            region: non_blank(params.region),
        }
    }
}

/// Query parameters for the density endpoint.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DensityParams {
    /// Region name. Empty means every commune.
    pub region: Option<String>,
}

impl DensityParams {
    /// The region to restrict to, if any.
    #[must_use]
    pub fn region(&self) -> Option<&str> {
        self.region
            .as_deref()
            .map(str::trim)
            .filter(|region| !region.is_empty())
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum YearValue {
    Number(i32),
    Text(String),
}

/// Reads a year given as a number or as text, with blank text as `None`.
fn blank_year<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<i32>, D::Error> {
    match Option::<YearValue>::deserialize(deserializer)? {
        None => Ok(None),
        Some(YearValue::Number(year)) => Ok(Some(year)),
        Some(YearValue::Text(text)) => {
            let text = text.trim();
            if text.is_empty() {
                Ok(None)
            } else {
                text.parse()
                    .map(Some)
                    .map_err(|_| serde::de::Error::custom(format!("invalid year '{text}'")))
            }
        }
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiHealth {
    /// Whether the server is healthy.
    pub healthy: bool,
    /// Server version.
    pub version: String,
}

/// Error body returned with 4xx and 5xx responses.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiError {
    /// Human-readable description.
    pub error: String,
}

impl ApiError {
    /// Wraps any displayable error.
    #[must_use]
    pub fn new(error: impl ToString) -> Self {
        Self {
            error: error.to_string(),
        }
    }
}

/// Result of writing the joined `GeoJSON` artifact at startup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportStatus {
    /// Destination path.
    pub path: String,
    /// Features written, when the export succeeded.
    pub features: Option<usize>,
    /// Failure description, when it did not.
    pub error: Option<String>,
}

impl ExportStatus {
    /// Whether the artifact was written.
    #[must_use]
    pub const fn succeeded(&self) -> bool {
        self.features.is_some()
    }
}
