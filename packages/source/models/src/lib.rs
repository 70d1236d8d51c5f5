#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Source configuration types and the canonical disaster record format.
//!
//! Every disaster feed (document-store collection, JSON endpoint, local
//! dump) produces [`NormalizedDisaster`] values. Only those that pass the
//! visibility filter become [`DisasterRecord`]s, which is the shape every
//! consumer (map layer, card list, HTTP API) sees.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use disaster_feed_disaster_models::{DisasterCategory, Severity};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// Location text used when a source omits any place description.
pub const UNKNOWN_LOCATION: &str = "Unknown Location";

/// The type of backing store a source reads from.
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
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum SourceType {
    /// Firestore REST collection listing
    Firestore,
    /// Plain JSON endpoint returning an array of records
    JsonUrl,
    /// Local JSON file (offline dumps, fixtures)
    File,
}

/// A WGS84 latitude/longitude pair.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Coordinates {
    /// Latitude in decimal degrees, `-90..=90`.
    pub latitude: f64,
    /// Longitude in decimal degrees, `-180..=180`.
    pub longitude: f64,
}

impl Coordinates {
    /// Builds a coordinate pair, returning `None` when either component is
    /// non-finite or outside the WGS84 range.
    #[must_use]
    pub fn checked(latitude: f64, longitude: f64) -> Option<Self> {
        if latitude.is_finite()
            && longitude.is_finite()
            && (-90.0..=90.0).contains(&latitude)
            && (-180.0..=180.0).contains(&longitude)
        {
            Some(Self {
                latitude,
                longitude,
            })
        } else {
            None
        }
    }

    /// Returns the pair in `GeoJSON` order, `[lng, lat]`.
    #[must_use]
    pub const fn to_lng_lat(self) -> [f64; 2] {
        [self.longitude, self.latitude]
    }
}

/// Configuration summary for a disaster source, as listed by the API and CLI.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceConfig {
    /// Unique identifier for this source.
    pub id: String,
    /// Human-readable name (e.g. "Earthquake reports").
    pub name: String,
    /// Which category every record from this source is assigned.
    pub category: DisasterCategory,
    /// What kind of store backs this source.
    pub source_type: SourceType,
    /// Endpoint or collection reference, for display.
    pub endpoint: String,
}

/// A disaster record normalized to the canonical schema, before
/// visibility filtering.
///
/// Coordinates are optional here: records without usable coordinates are
/// counted and dropped by the visibility filter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedDisaster {
    /// Source-scoped identifier.
    pub id: String,
    /// Which adapter produced this record.
    pub source_id: String,
    /// Category assigned by the adapter.
    pub category: DisasterCategory,
    /// Human-readable name (source value or generated fallback).
    pub title: String,
    /// Free-text place description.
    pub location_text: String,
    /// Position, `None` when the source lacks usable coordinates.
    pub coordinates: Option<Coordinates>,
    /// Danger level.
    pub severity: Severity,
    /// When the disaster occurred, `None` when no candidate field parsed.
    pub occurred_at: Option<DateTime<Utc>>,
    /// Normalized visibility flag.
    pub visible: bool,
    /// Category-specific extra fields (magnitude, wind speed, ...).
    pub details: BTreeMap<String, serde_json::Value>,
}

/// Why a [`NormalizedDisaster`] could not become a [`DisasterRecord`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum Rejection {
    /// The record is not marked visible.
    #[strum(to_string = "record is not visible")]
    Hidden,
    /// The record has no usable coordinates.
    #[strum(to_string = "record has no usable coordinates")]
    MissingCoordinates,
}

/// A disaster record as delivered to consumers.
///
/// Always has coordinates and is always visible. Deserializing goes
/// through the same checks as [`TryFrom<NormalizedDisaster>`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "NormalizedDisaster")]
pub struct DisasterRecord {
    /// Source-scoped identifier; `(category, id)` is unique.
    pub id: String,
    /// Which adapter produced this record.
    pub source_id: String,
    /// Category assigned by the adapter.
    pub category: DisasterCategory,
    /// Human-readable name.
    pub title: String,
    /// Free-text place description.
    pub location_text: String,
    /// Position.
    pub coordinates: Coordinates,
    /// Danger level.
    pub severity: Severity,
    /// When the disaster occurred.
    pub occurred_at: Option<DateTime<Utc>>,
    /// Always `true` for consumer-facing records.
    pub visible: bool,
    /// Category-specific extra fields.
    pub details: BTreeMap<String, serde_json::Value>,
}

impl TryFrom<NormalizedDisaster> for DisasterRecord {
    type Error = Rejection;

    fn try_from(value: NormalizedDisaster) -> Result<Self, Self::Error> {
        let Some(coordinates) = value.coordinates else {
            return Err(Rejection::MissingCoordinates);
        };
        if !value.visible {
            return Err(Rejection::Hidden);
        }
        Ok(Self {
            id: value.id,
            source_id: value.source_id,
            category: value.category,
            title: value.title,
            location_text: value.location_text,
            coordinates,
            severity: value.severity,
            occurred_at: value.occurred_at,
            visible: true,
            details: value.details,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn normalized(coordinates: Option<Coordinates>, visible: bool) -> NormalizedDisaster {
        NormalizedDisaster {
            id: "abc".to_string(),
            source_id: "earthquakes".to_string(),
            category: DisasterCategory::Earthquake,
            title: "Magnitude 5.1 Earthquake".to_string(),
            location_text: UNKNOWN_LOCATION.to_string(),
            coordinates,
            severity: Severity::clamped(8),
            occurred_at: None,
            visible,
            details: BTreeMap::new(),
        }
    }

    #[test]
    fn rejects_out_of_range_coordinates() {
        assert!(Coordinates::checked(91.0, 92.0).is_none());
        assert!(Coordinates::checked(23.0, -181.0).is_none());
        assert!(Coordinates::checked(f64::NAN, 90.0).is_none());
        assert!(Coordinates::checked(23.81, 90.41).is_some());
    }

    #[test]
    fn converts_visible_record_with_coordinates() {
        let coords = Coordinates::checked(23.81, 90.41).unwrap();
        let record = DisasterRecord::try_from(normalized(Some(coords), true)).unwrap();
        assert!(record.visible);
        assert_eq!(record.coordinates, coords);
    }

    #[test]
    fn rejects_hidden_record() {
        let coords = Coordinates::checked(23.81, 90.41).unwrap();
        assert_eq!(
            DisasterRecord::try_from(normalized(Some(coords), false)),
            Err(Rejection::Hidden)
        );
    }

    #[test]
    fn missing_coordinates_takes_precedence() {
        assert_eq!(
            DisasterRecord::try_from(normalized(None, false)),
            Err(Rejection::MissingCoordinates)
        );
    }

    #[test]
    fn deserializing_enforces_visibility_and_coordinates() {
        let coords = Coordinates::checked(23.81, 90.41).unwrap();
        let record = DisasterRecord::try_from(normalized(Some(coords), true)).unwrap();
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(
            serde_json::from_value::<DisasterRecord>(json.clone()).unwrap(),
            record
        );

        let mut hidden = json.clone();
        hidden["visible"] = false.into();
        let err = serde_json::from_value::<DisasterRecord>(hidden).unwrap_err();
        assert!(err.to_string().contains("not visible"));

        let mut unlocated = json;
        unlocated["coordinates"] = serde_json::Value::Null;
        assert!(serde_json::from_value::<DisasterRecord>(unlocated).is_err());
    }

    #[test]
    fn geojson_order_is_lng_lat() {
        let coords = Coordinates::checked(23.81, 90.41).unwrap();
        assert_eq!(coords.to_lng_lat(), [90.41, 23.81]);
    }
}
