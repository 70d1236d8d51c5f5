#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! API request and response types for the disaster feed server.
//!
//! These types are serialized to JSON for the REST API. They are separate
//! from the aggregated record types to allow independent evolution of the
//! API contract. [`disasters_geojson`] builds the map marker layer.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use disaster_feed_disaster_models::{DisasterCategory, MarkerColor};
use disaster_feed_source_models::DisasterRecord;
use serde::{Deserialize, Serialize};

/// A disaster as returned by the API.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiDisaster {
    /// Source-scoped identifier.
    pub id: String,
    /// Source that produced the record.
    pub source_id: String,
    /// Disaster category.
    pub category: DisasterCategory,
    /// Human-readable category name.
    pub category_label: String,
    /// Marker icon key for the category.
    pub icon: String,
    /// Title.
    pub title: String,
    /// Place description.
    pub location_text: String,
    /// Latitude.
    pub latitude: f64,
    /// Longitude.
    pub longitude: f64,
    /// Danger level (1-10).
    pub severity: u8,
    /// Marker colour band.
    pub marker_color: MarkerColor,
    /// Marker colour as a hex string.
    pub marker_hex: String,
    /// When the disaster occurred (ISO 8601).
    pub occurred_at: Option<DateTime<Utc>>,
    /// Category-specific extra fields.
    pub details: BTreeMap<String, serde_json::Value>,
}

impl From<&DisasterRecord> for ApiDisaster {
    fn from(record: &DisasterRecord) -> Self {
        let marker_color = record.severity.marker_color();
        Self {
            id: record.id.clone(),
            source_id: record.source_id.clone(),
            category: record.category,
            category_label: record.category.label().to_string(),
            icon: record.category.icon().to_string(),
            title: record.title.clone(),
            location_text: record.location_text.clone(),
            latitude: record.coordinates.latitude,
            longitude: record.coordinates.longitude,
            severity: record.severity.value(),
            marker_color,
            marker_hex: marker_color.hex().to_string(),
            occurred_at: record.occurred_at,
            details: record.details.clone(),
        }
    }
}

/// Query parameters for the disasters endpoint.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DisasterQueryParams {
    /// Category name to include (all when omitted).
    pub category: Option<String>,
    /// Must be `true` when given; hidden records are never served.
    pub visible_only: Option<bool>,
    /// Minimum severity value (1-10).
    pub min_severity: Option<u8>,
}

/// Query parameters for the `GeoJSON` marker layer.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeoJsonQueryParams {
    /// Category name to include (all when omitted).
    pub category: Option<String>,
}

/// Query parameters carrying a point.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PointQueryParams {
    /// Latitude.
    pub lat: Option<f64>,
    /// Longitude.
    pub lng: Option<f64>,
}

/// Query parameters for the geocode search endpoint.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeocodeSearchParams {
    /// Free-text place query.
    pub q: String,
}

/// A category as returned by the API.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiCategory {
    /// Category id.
    pub id: DisasterCategory,
    /// Human-readable name.
    pub label: String,
    /// Marker icon key.
    pub icon: String,
}

impl From<DisasterCategory> for ApiCategory {
    fn from(category: DisasterCategory) -> Self {
        Self {
            id: category,
            label: category.label().to_string(),
            icon: category.icon().to_string(),
        }
    }
}

/// Per-source diagnostics as returned by the API.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiSourceReport {
    /// Source id.
    pub source_id: String,
    /// Category the source feeds.
    pub category: DisasterCategory,
    /// Raw records read.
    pub fetched: usize,
    /// Records served.
    pub kept: usize,
    /// Records dropped as not visible.
    pub hidden: usize,
    /// Records dropped for lacking coordinates.
    pub missing_coordinates: usize,
    /// Failure message, if the source failed.
    pub error: Option<String>,
    /// Time spent on the source.
    pub elapsed_ms: u64,
}

/// Snapshot metadata as returned by the API.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiSnapshot {
    /// Refresh cycle number.
    pub cycle: u64,
    /// When the served records were aggregated.
    pub refreshed_at: Option<DateTime<Utc>>,
    /// Whether the latest refresh failed and the records are older.
    pub stale: bool,
    /// Number of records served.
    pub record_count: usize,
    /// Diagnostics from the latest refresh.
    pub sources: Vec<ApiSourceReport>,
}

/// Health check response.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiHealth {
    /// Whether the service is healthy.
    pub healthy: bool,
    /// Service version.
    pub version: String,
}

/// Builds the map marker layer: one `GeoJSON` Point feature per record.
#[must_use]
pub fn disasters_geojson<'a>(
    records: impl IntoIterator<Item = &'a DisasterRecord>,
) -> geojson::FeatureCollection {
    let features = records
        .into_iter()
        .map(|record| {
            let api = ApiDisaster::from(record);
            let mut properties = geojson::JsonObject::new();
            properties.insert("id".to_string(), api.id.clone().into());
            properties.insert("category".to_string(), api.category.as_ref().into());
            properties.insert("icon".to_string(), api.icon.into());
            properties.insert("title".to_string(), api.title.into());
            properties.insert("locationText".to_string(), api.location_text.into());
            properties.insert("severity".to_string(), api.severity.into());
            properties.insert("markerColor".to_string(), api.marker_color.as_ref().into());
            properties.insert("markerHex".to_string(), api.marker_hex.into());
            if let Some(occurred_at) = api.occurred_at {
                properties.insert("occurredAt".to_string(), occurred_at.to_rfc3339().into());
            }

            geojson::Feature {
                bbox: None,
                geometry: Some(geojson::Geometry::new(geojson::Value::Point(
                    record.coordinates.to_lng_lat().to_vec(),
                ))),
                id: Some(geojson::feature::Id::String(format!(
                    "{}:{}",
                    api.category, api.id
                ))),
                properties: Some(properties),
                foreign_members: None,
            }
        })
        .collect();

    geojson::FeatureCollection {
        bbox: None,
        features,
        foreign_members: None,
    }
}

#[cfg(test)]
mod tests {
    use disaster_feed_disaster_models::Severity;
    use disaster_feed_source_models::Coordinates;

    use super::*;

    fn record(severity: u8) -> DisasterRecord {
        DisasterRecord {
            id: "eq-1".to_string(),
            source_id: "earthquakes".to_string(),
            category: DisasterCategory::Earthquake,
            title: "Magnitude 6.0 Earthquake".to_string(),
            location_text: "Sylhet".to_string(),
            coordinates: Coordinates {
                latitude: 24.9,
                longitude: 91.87,
            },
            severity: Severity::from(severity),
            occurred_at: None,
            visible: true,
            details: BTreeMap::new(),
        }
    }

    #[test]
    fn api_disaster_carries_marker_band() {
        let api = ApiDisaster::from(&record(9));
        assert_eq!(api.marker_color, MarkerColor::Red);
        assert_eq!(api.icon, DisasterCategory::Earthquake.icon());
        assert_eq!(api.category_label, "Earthquake");

        let json = serde_json::to_value(&api).unwrap();
        assert_eq!(json["markerColor"], "red");
        assert_eq!(json["locationText"], "Sylhet");
    }

    #[test]
    fn geojson_points_are_lng_lat() {
        let records = [record(3), record(6)];
        let collection = disasters_geojson(&records);
        assert_eq!(collection.features.len(), 2);

        let json = serde_json::to_value(&collection).unwrap();
        assert_eq!(json["type"], "FeatureCollection");
        let feature = &json["features"][0];
        assert_eq!(feature["geometry"]["type"], "Point");
        assert_eq!(feature["geometry"]["coordinates"][0], 91.87);
        assert_eq!(feature["geometry"]["coordinates"][1], 24.9);
        assert_eq!(feature["properties"]["markerColor"], "yellow");
        assert_eq!(json["features"][1]["properties"]["markerColor"], "orange");
        assert_eq!(feature["id"], "earthquake:eq-1");
    }

    #[test]
    fn lists_categories() {
        let categories: Vec<ApiCategory> = DisasterCategory::all()
            .iter()
            .copied()
            .map(ApiCategory::from)
            .collect();
        assert_eq!(categories.len(), 7);
        assert_eq!(categories[0].label, "Earthquake");
    }
}
