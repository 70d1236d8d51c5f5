//! Config-driven disaster source definition.
//!
//! [`SourceDefinition`] captures everything unique about a disaster
//! collection in a serializable config struct: where to read it and how
//! its field names map onto the canonical record. A single generic
//! implementation handles every category, so adding a source is a TOML
//! file, not code.

use std::collections::BTreeMap;
use std::path::PathBuf;

use async_trait::async_trait;
use disaster_feed_disaster_models::{DisasterCategory, Severity};
use disaster_feed_source_models::{
    Coordinates, NormalizedDisaster, SourceConfig, SourceType, UNKNOWN_LOCATION,
};
use serde::Deserialize;

use crate::firestore::{FirestoreConfig, fetch_firestore};
use crate::json_url::{fetch_json_url, load_json_file};
use crate::parsing::{
    first_f64, first_present, first_string, first_timestamp, lookup, parse_visibility,
    value_as_f64, value_as_string,
};
use crate::{DisasterSource, FetchOptions, RawRecord, SourceError};

// ── Top-level source definition ──────────────────────────────────────────

/// A complete, config-driven disaster source definition.
#[derive(Debug, Clone, Deserialize)]
pub struct SourceDefinition {
    /// Unique identifier (e.g. `"earthquakes"`).
    pub id: String,
    /// Human-readable name (e.g. `"Earthquake reports"`).
    pub name: String,
    /// Category assigned to every record from this source.
    pub category: DisasterCategory,
    /// How to fetch raw records.
    pub fetcher: FetcherConfig,
    /// Field name mappings for normalization.
    #[serde(default)]
    pub fields: FieldMapping,
}

// ── Fetcher config ───────────────────────────────────────────────────────

/// How to fetch raw records from the backing store.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FetcherConfig {
    /// Firestore REST collection listing.
    Firestore {
        /// REST API root.
        #[serde(default = "default_firestore_url")]
        base_url: String,
        /// Google Cloud project id.
        project_id: String,
        /// Collection name.
        collection: String,
        /// Documents per page.
        #[serde(default = "default_page_size")]
        page_size: u64,
        /// Name of an environment variable holding a web API key.
        api_key_env: Option<String>,
    },
    /// JSON endpoint returning records as an array.
    JsonUrl {
        /// Endpoint URL.
        url: String,
        /// Dot-path to the records array (bare array when omitted).
        records_path: Option<String>,
    },
    /// Local JSON file.
    File {
        /// Path to the file.
        path: PathBuf,
        /// Dot-path to the records array (bare array when omitted).
        records_path: Option<String>,
    },
}

fn default_firestore_url() -> String {
    "https://firestore.googleapis.com/v1".to_string()
}

const fn default_page_size() -> u64 {
    300
}

impl FetcherConfig {
    /// Returns the store type this fetcher reads from.
    #[must_use]
    pub const fn source_type(&self) -> SourceType {
        match self {
            Self::Firestore { .. } => SourceType::Firestore,
            Self::JsonUrl { .. } => SourceType::JsonUrl,
            Self::File { .. } => SourceType::File,
        }
    }

    /// Returns a display form of the endpoint or collection reference.
    #[must_use]
    pub fn endpoint(&self) -> String {
        match self {
            Self::Firestore {
                project_id,
                collection,
                ..
            } => format!("firestore://{project_id}/{collection}"),
            Self::JsonUrl { url, .. } => url.clone(),
            Self::File { path, .. } => path.display().to_string(),
        }
    }
}

// ── Field mapping ────────────────────────────────────────────────────────

/// Maps source-specific JSON field names to canonical record fields.
///
/// Every list is an alias table tried in order; the first usable value
/// wins.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FieldMapping {
    /// Fields holding the record id. Falls back to the store document id.
    pub id: Vec<String>,
    /// Fields holding the title.
    pub title: Vec<String>,
    /// Title generated when no title field is present, with `{field}`
    /// placeholders (e.g. `"Magnitude {magnitude} Earthquake"`). When a
    /// placeholder cannot be filled, the category label is used instead.
    pub title_template: Option<String>,
    /// Fields holding the place description.
    pub location: Vec<String>,
    /// Coordinate strategies, tried in order.
    pub coordinates: Vec<CoordinateField>,
    /// How to obtain the danger level.
    pub severity: SeverityMapping,
    /// Timestamp fields in fallback order (explicit time, then creation,
    /// then update time).
    pub occurred_at: Vec<String>,
    /// Legacy visibility flag fields.
    pub visibility: Vec<String>,
    /// Extra category-specific fields, keyed by output name.
    pub details: BTreeMap<String, Vec<String>>,
}

fn names(fields: &[&str]) -> Vec<String> {
    fields.iter().map(ToString::to_string).collect()
}

impl Default for FieldMapping {
    fn default() -> Self {
        Self {
            id: names(&["id"]),
            title: names(&["title", "name"]),
            title_template: None,
            location: names(&["location", "locationName", "place"]),
            coordinates: vec![CoordinateField::LatLng {
                lat: "latitude".to_string(),
                lng: "longitude".to_string(),
            }],
            severity: SeverityMapping::default(),
            occurred_at: names(&["dateTime", "time", "createdAt", "updatedAt"]),
            visibility: names(&["isVisible", "visible"]),
            details: BTreeMap::new(),
        }
    }
}

// ── Strategy enums ───────────────────────────────────────────────────────

/// One way of reading a coordinate pair from a raw record.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CoordinateField {
    /// Separate latitude and longitude fields.
    LatLng {
        /// Latitude field.
        lat: String,
        /// Longitude field.
        lng: String,
    },
    /// A `[lng, lat]` pair in `GeoJSON` order, either as a bare array or
    /// inside a `GeoJSON` Point object.
    GeojsonPair {
        /// Field holding the pair or the Point.
        field: String,
    },
    /// A `[lat, lng]` pair.
    LatLngPair {
        /// Field holding the pair.
        field: String,
    },
    /// An object with `latitude`/`longitude` (or `_latitude`/`_longitude`).
    GeoPoint {
        /// Field holding the object.
        field: String,
    },
}

/// How to obtain a record's severity.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SeverityMapping {
    /// Fields holding an explicit danger level.
    pub fields: Vec<String>,
    /// Derivation used when no explicit level exists.
    pub derive: Option<SeverityDerivation>,
    /// Level used when neither an explicit nor a derived value exists.
    pub default: u8,
}

impl Default for SeverityMapping {
    fn default() -> Self {
        Self {
            fields: names(&["dangerLevel", "severity"]),
            derive: None,
            default: 5,
        }
    }
}

/// Derives a danger level from another measurement.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SeverityDerivation {
    /// `min(ceil(value × factor), 10)` over the first available field.
    Scaled {
        /// Measurement fields (e.g. `["magnitude", "mag"]`).
        fields: Vec<String>,
        /// Multiplier (1.5 for earthquake magnitude).
        factor: f64,
    },
}

// ── Helper methods on extractors ─────────────────────────────────────────

impl CoordinateField {
    /// Extracts a validated coordinate pair from a JSON record.
    fn extract(&self, record: &serde_json::Value) -> Option<Coordinates> {
        let (lat, lng) = match self {
            Self::LatLng { lat, lng } => (
                value_as_f64(lookup(record, lat)?)?,
                value_as_f64(lookup(record, lng)?)?,
            ),
            Self::GeojsonPair { field } => {
                let value = lookup(record, field)?;
                // GeoJSON Point: {"type":"Point","coordinates":[lng, lat]}
                let pair = value.get("coordinates").unwrap_or(value).as_array()?;
                (value_as_f64(pair.get(1)?)?, value_as_f64(pair.first()?)?)
            }
            Self::LatLngPair { field } => {
                let pair = lookup(record, field)?.as_array()?;
                (value_as_f64(pair.first()?)?, value_as_f64(pair.get(1)?)?)
            }
            Self::GeoPoint { field } => {
                let obj = lookup(record, field)?;
                let lat = obj.get("latitude").or_else(|| obj.get("_latitude"))?;
                let lng = obj.get("longitude").or_else(|| obj.get("_longitude"))?;
                (value_as_f64(lat)?, value_as_f64(lng)?)
            }
        };

        // (0, 0) is a placeholder, not a location
        if lat == 0.0 && lng == 0.0 {
            return None;
        }
        Coordinates::checked(lat, lng)
    }
}

impl SeverityMapping {
    /// Extracts the severity, falling back to derivation then default.
    fn extract(&self, record: &serde_json::Value) -> Severity {
        if let Some(level) = first_f64(record, &self.fields) {
            #[allow(clippy::cast_possible_truncation)]
            return Severity::clamped(level.round().clamp(-1000.0, 1000.0) as i64);
        }
        if let Some(SeverityDerivation::Scaled { fields, factor }) = &self.derive
            && let Some(value) = first_f64(record, fields)
        {
            return Severity::from_scaled(value, *factor);
        }
        Severity::clamped(i64::from(self.default))
    }
}

/// Fills `{field}` placeholders through `resolve`. Returns `None` if any
/// placeholder has no value.
fn render_template<'a>(
    template: &str,
    resolve: impl Fn(&str) -> Option<&'a serde_json::Value>,
) -> Option<String> {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find('{') {
        out.push_str(&rest[..start]);
        let after = &rest[start + 1..];
        let end = after.find('}')?;
        let field = &after[..end];
        out.push_str(&value_as_string(resolve(field)?)?);
        rest = &after[end + 1..];
    }
    out.push_str(rest);

    Some(out)
}

// ── Fetch + normalize ────────────────────────────────────────────────────

impl SourceDefinition {
    /// Returns the summary shown by the API and CLI.
    #[must_use]
    pub fn config(&self) -> SourceConfig {
        SourceConfig {
            id: self.id.clone(),
            name: self.name.clone(),
            category: self.category,
            source_type: self.fetcher.source_type(),
            endpoint: self.fetcher.endpoint(),
        }
    }

    /// Normalizes a single raw record, or `None` when it carries no id.
    #[must_use]
    pub fn normalize_record(&self, raw: &RawRecord) -> Option<NormalizedDisaster> {
        let fields = &self.fields;
        let record = &raw.data;

        // ── Id ───────────────────────────────────────────────────
        let Some(id) = first_string(record, &fields.id).or_else(|| raw.document_id.clone()) else {
            log::debug!("{}: skipping record without an id", self.id);
            return None;
        };

        // ── Details ──────────────────────────────────────────────
        let details: BTreeMap<String, serde_json::Value> = fields
            .details
            .iter()
            .filter_map(|(name, aliases)| {
                first_present(record, aliases).map(|v| (name.clone(), v.clone()))
            })
            .collect();

        // ── Title ────────────────────────────────────────────────
        // Placeholders name a detail (resolved through its aliases) or a
        // raw field.
        let title = first_string(record, &fields.title)
            .or_else(|| {
                fields.title_template.as_deref().and_then(|t| {
                    render_template(t, |field| {
                        details.get(field).or_else(|| lookup(record, field))
                    })
                })
            })
            .unwrap_or_else(|| self.category.label().to_string());

        // ── Location ─────────────────────────────────────────────
        let location_text =
            first_string(record, &fields.location).unwrap_or_else(|| UNKNOWN_LOCATION.to_string());

        // ── Coordinates ──────────────────────────────────────────
        let coordinates = fields.coordinates.iter().find_map(|c| c.extract(record));

        // ── Dates ────────────────────────────────────────────────
        let occurred_at = first_timestamp(record, &fields.occurred_at);
        if occurred_at.is_none() {
            log::debug!("{}: no parseable timestamp for {id}", self.id);
        }

        Some(NormalizedDisaster {
            id,
            source_id: self.id.clone(),
            category: self.category,
            title,
            location_text,
            coordinates,
            severity: fields.severity.extract(record),
            occurred_at,
            visible: parse_visibility(record, &fields.visibility),
            details,
        })
    }
}

#[async_trait]
impl DisasterSource for SourceDefinition {
    fn id(&self) -> &str {
        &self.id
    }

    fn category(&self) -> DisasterCategory {
        self.category
    }

    async fn fetch_raw(&self, options: &FetchOptions) -> Result<Vec<RawRecord>, SourceError> {
        match &self.fetcher {
            FetcherConfig::Firestore {
                base_url,
                project_id,
                collection,
                page_size,
                api_key_env,
            } => {
                let api_key = api_key_env
                    .as_deref()
                    .and_then(|var| std::env::var(var).ok());
                fetch_firestore(
                    &FirestoreConfig {
                        base_url,
                        project_id,
                        collection,
                        page_size: *page_size,
                        api_key: api_key.as_deref(),
                        label: &self.name,
                    },
                    options,
                )
                .await
            }
            FetcherConfig::JsonUrl { url, records_path } => {
                fetch_json_url(url, records_path.as_deref(), options).await
            }
            FetcherConfig::File { path, records_path } => {
                load_json_file(path, records_path.as_deref(), options).await
            }
        }
    }

    fn normalize(&self, records: &[RawRecord]) -> Vec<NormalizedDisaster> {
        records
            .iter()
            .filter_map(|raw| self.normalize_record(raw))
            .collect()
    }
}

/// Parses a [`SourceDefinition`] from a TOML string.
///
/// # Errors
///
/// Returns an error if the TOML is malformed or missing required fields.
pub fn parse_source_toml(toml_str: &str) -> Result<SourceDefinition, SourceError> {
    Ok(toml::de::from_str(toml_str)?)
}
