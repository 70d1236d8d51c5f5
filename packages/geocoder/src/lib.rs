#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Geocoding lookups for disaster locations.
//!
//! Turns coordinates into a readable address (reverse) and free text into
//! candidate points (search). Lookups are best-effort: callers fall back to
//! showing raw coordinates via [`coordinate_label`] when a lookup fails.

pub mod nominatim;

use async_trait::async_trait;
use disaster_feed_source_models::Coordinates;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Structured address parts of a reverse lookup.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddressComponents {
    /// Street or road name.
    pub road: Option<String>,
    /// Neighbourhood or suburb.
    pub suburb: Option<String>,
    /// City, town or village.
    pub city: Option<String>,
    /// District or county.
    pub district: Option<String>,
    /// State or division.
    pub state: Option<String>,
    /// Country name.
    pub country: Option<String>,
    /// Postal code.
    pub postcode: Option<String>,
}

/// Result of a reverse lookup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReverseGeocode {
    /// Full display address.
    pub display_address: String,
    /// Structured parts of the address.
    pub components: AddressComponents,
}

/// One candidate from a forward search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeocodeCandidate {
    /// Matched point.
    pub coordinates: Coordinates,
    /// Display name of the match.
    pub display_name: String,
    /// Kind of place (e.g. `"city"`, `"village"`), when known.
    pub kind: Option<String>,
}

/// Errors from geocoding operations.
#[derive(Debug, Error)]
pub enum GeocodeError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Response parsing failed.
    #[error("Parse error: {message}")]
    Parse {
        /// Description of the parsing failure.
        message: String,
    },

    /// Rate limit exceeded.
    #[error("Rate limit exceeded")]
    RateLimited,
}

/// A geocoding provider.
#[async_trait]
pub trait Geocoder: Send + Sync {
    /// Looks up the address at a point. `Ok(None)` means nothing is there.
    ///
    /// # Errors
    ///
    /// Returns [`GeocodeError`] if the provider cannot be reached or its
    /// response cannot be parsed.
    async fn reverse(&self, coordinates: Coordinates)
    -> Result<Option<ReverseGeocode>, GeocodeError>;

    /// Searches for places matching free text.
    ///
    /// # Errors
    ///
    /// Returns [`GeocodeError`] if the provider cannot be reached or its
    /// response cannot be parsed.
    async fn search(&self, query: &str) -> Result<Vec<GeocodeCandidate>, GeocodeError>;
}

/// Coordinate-only display used when no address is available.
#[must_use]
pub fn coordinate_label(coordinates: Coordinates) -> String {
    format!("{:.4}, {:.4}", coordinates.latitude, coordinates.longitude)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_coordinate_label() {
        let label = coordinate_label(Coordinates {
            latitude: 23.810_332,
            longitude: 90.412_518,
        });
        assert_eq!(label, "23.8103, 90.4125");
    }
}
