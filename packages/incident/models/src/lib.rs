#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Forest-fire incident record types.
//!
//! One [`IncidentRecord`] is produced per reported fire alert that survives
//! loading. Field-level parse failures are represented as small typed
//! errors so the loader can decide explicitly whether to drop a row.

use std::collections::BTreeMap;

use chrono::{Datelike as _, NaiveDateTime, Timelike as _};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// Number of square metres in one hectare.
pub const SQUARE_METRES_PER_HECTARE: f64 = 10_000.0;

/// An administrative (INSEE) identifier, trimmed and non-empty.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AdministrativeId(String);

impl AdministrativeId {
    /// Normalizes a raw identifier cell by trimming surrounding whitespace.
    ///
    /// # Errors
    ///
    /// Returns [`IdentifierError::Empty`] if nothing remains after trimming.
    pub fn parse(raw: &str) -> Result<Self, IdentifierError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(IdentifierError::Empty);
        }
        Ok(Self(trimmed.to_string()))
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Department code: the first two characters of the identifier.
    #[must_use]
    pub fn department_code(&self) -> Option<&str> {
        self.0.char_indices().nth(2).map_or_else(
            || (self.0.chars().count() == 2).then_some(self.0.as_str()),
            |(end, _)| Some(&self.0[..end]),
        )
    }

    /// Returns `true` if the identifier belongs to the department `prefix`.
    #[must_use]
    pub fn in_department(&self, prefix: &str) -> bool {
        self.department_code() == Some(prefix)
    }
}

impl std::fmt::Display for AdministrativeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<AdministrativeId> for String {
    fn from(id: AdministrativeId) -> Self {
        id.0
    }
}

/// Why an identifier cell could not be used.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentifierError {
    /// The cell was empty or whitespace only.
    Empty,
}

impl std::fmt::Display for IdentifierError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Empty => write!(f, "identifier is empty"),
        }
    }
}

impl std::error::Error for IdentifierError {}

/// Why an alert timestamp cell could not be parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TimestampError {
    /// The cell was empty.
    Empty,
    /// The cell did not match any accepted date/time layout.
    Unrecognized {
        /// The offending (trimmed) value.
        value: String,
    },
}

impl std::fmt::Display for TimestampError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Empty => write!(f, "timestamp is empty"),
            Self::Unrecognized { value } => write!(f, "unrecognized timestamp '{value}'"),
        }
    }
}

impl std::error::Error for TimestampError {}

/// Why a burned-area cell could not be parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AreaError {
    /// The cell was empty.
    Empty,
    /// The cell was not a finite number.
    Invalid {
        /// The offending (trimmed) value.
        value: String,
    },
}

impl std::fmt::Display for AreaError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Empty => write!(f, "burned area is empty"),
            Self::Invalid { value } => write!(f, "invalid burned area '{value}'"),
        }
    }
}

impl std::error::Error for AreaError {}

/// A single reported fire alert.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IncidentRecord {
    /// When the alert was raised.
    pub alert_time: NaiveDateTime,
    /// INSEE code of the commune the fire was reported in.
    pub administrative_id: AdministrativeId,
    /// Human-readable commune name.
    pub commune_name: String,
    /// Area affected by the fire in square metres.
    pub burned_area_m2: f64,
    /// Cause or origin of the alert.
    pub alert_origin: String,
    /// DFCI grid-cell code.
    pub grid_code: String,
    /// Remaining source columns, keyed by their (trimmed) header name.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attributes: BTreeMap<String, String>,
}

impl IncidentRecord {
    /// Calendar year of the alert.
    #[must_use]
    pub fn year(&self) -> i32 {
        self.alert_time.year()
    }

    /// Hour of day of the alert (0-23).
    #[must_use]
    pub fn hour(&self) -> u32 {
        self.alert_time.hour()
    }

    /// Year-month label of the alert, e.g. `"2019-07"`.
    #[must_use]
    pub fn month_label(&self) -> String {
        self.alert_time.format("%Y-%m").to_string()
    }

    /// Burned area converted to hectares.
    #[must_use]
    pub fn burned_area_ha(&self) -> f64 {
        self.burned_area_m2 / SQUARE_METRES_PER_HECTARE
    }

    /// Returns the value of a categorical field.
    #[must_use]
    pub fn category(&self, field: CategoryField) -> &str {
        match field {
            CategoryField::AlertOrigin => &self.alert_origin,
            CategoryField::GridCode => &self.grid_code,
        }
    }
}

/// Categorical incident fields that can be frequency-counted.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum CategoryField {
    /// Cause/origin of the alert.
    AlertOrigin,
    /// DFCI grid-cell code.
    GridCode,
}
