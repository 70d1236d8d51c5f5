#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Disaster category taxonomy and severity definitions.
//!
//! Every disaster feed, whatever its raw shape, is normalized into one of
//! the fixed [`DisasterCategory`] variants with a [`Severity`] on the 1-10
//! "danger level" scale. Consumers key marker icons on the category and
//! marker colour on the severity band.

use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// Lowest possible danger level.
pub const MIN_SEVERITY: u8 = 1;

/// Highest possible danger level.
pub const MAX_SEVERITY: u8 = 10;

/// The kind of disaster a record describes.
///
/// Assigned once by the source adapter that produced the record and never
/// re-derived afterwards.
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
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum DisasterCategory {
    /// Seismic events
    Earthquake,
    /// River, flash, and coastal flooding
    Flood,
    /// Cyclones, hurricanes, typhoons
    Cyclone,
    /// Landslides and mudslides
    Landslide,
    /// Tsunami warnings and events
    Tsunami,
    /// Wildfires and urban fires
    Fire,
    /// Anything not fitting the categories above
    Other,
}

impl DisasterCategory {
    /// Returns the human-readable label (e.g. `"Earthquake"`).
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Earthquake => "Earthquake",
            Self::Flood => "Flood",
            Self::Cyclone => "Cyclone",
            Self::Landslide => "Landslide",
            Self::Tsunami => "Tsunami",
            Self::Fire => "Fire",
            Self::Other => "Other Disaster",
        }
    }

    /// Returns the marker icon key the map layer uses for this category.
    #[must_use]
    pub const fn icon(self) -> &'static str {
        match self {
            Self::Earthquake => "earthquake-marker",
            Self::Flood => "flood-marker",
            Self::Cyclone => "cyclone-marker",
            Self::Landslide => "landslide-marker",
            Self::Tsunami => "tsunami-marker",
            Self::Fire => "fire-marker",
            Self::Other => "alert-marker",
        }
    }

    /// Returns all variants of this enum.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[
            Self::Earthquake,
            Self::Flood,
            Self::Cyclone,
            Self::Landslide,
            Self::Tsunami,
            Self::Fire,
            Self::Other,
        ]
    }
}

/// Danger level on a 1-10 scale.
///
/// The value is clamped on every construction path (including
/// deserialization), so a `Severity` is always within
/// [`MIN_SEVERITY`]..=[`MAX_SEVERITY`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "u8", into = "u8")]
pub struct Severity(u8);

impl Severity {
    /// Clamps an arbitrary integer into the 1-10 range.
    #[must_use]
    pub fn clamped(value: i64) -> Self {
        let clamped = value.clamp(i64::from(MIN_SEVERITY), i64::from(MAX_SEVERITY));
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        Self(clamped as u8)
    }

    /// Derives a severity by scaling a source measurement and rounding up.
    ///
    /// Earthquakes use a factor of 1.5 on magnitude, so magnitude 6.0
    /// becomes `min(ceil(9.0), 10) = 9`. Non-finite inputs yield the
    /// minimum severity.
    #[must_use]
    pub fn from_scaled(value: f64, factor: f64) -> Self {
        let scaled = (value * factor).ceil();
        if !scaled.is_finite() {
            return Self(MIN_SEVERITY);
        }
        #[allow(clippy::cast_possible_truncation)]
        Self::clamped(scaled.clamp(0.0, f64::from(MAX_SEVERITY)) as i64)
    }

    /// Returns the numeric danger level.
    #[must_use]
    pub const fn value(self) -> u8 {
        self.0
    }

    /// Returns the marker colour band for this severity.
    #[must_use]
    pub const fn marker_color(self) -> MarkerColor {
        if self.0 >= 8 {
            MarkerColor::Red
        } else if self.0 >= 5 {
            MarkerColor::Orange
        } else {
            MarkerColor::Yellow
        }
    }
}

impl Default for Severity {
    fn default() -> Self {
        Self(MIN_SEVERITY)
    }
}

impl From<u8> for Severity {
    fn from(value: u8) -> Self {
        Self::clamped(i64::from(value))
    }
}

impl From<Severity> for u8 {
    fn from(value: Severity) -> Self {
        value.0
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Severity-based colour band used for map markers and cards.
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
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum MarkerColor {
    /// Severity 1-4
    Yellow,
    /// Severity 5-7
    Orange,
    /// Severity 8-10
    Red,
}

impl MarkerColor {
    /// Returns the CSS hex colour for this band.
    #[must_use]
    pub const fn hex(self) -> &'static str {
        match self {
            Self::Yellow => "#facc15",
            Self::Orange => "#f97316",
            Self::Red => "#dc2626",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_categories_case_insensitively() {
        assert_eq!(
            "Earthquake".parse::<DisasterCategory>().unwrap(),
            DisasterCategory::Earthquake
        );
        assert_eq!(
            "FIRE".parse::<DisasterCategory>().unwrap(),
            DisasterCategory::Fire
        );
        assert!("volcano".parse::<DisasterCategory>().is_err());
    }

    #[test]
    fn category_round_trips_through_display() {
        for category in DisasterCategory::all() {
            let parsed: DisasterCategory = category.to_string().parse().unwrap();
            assert_eq!(parsed, *category);
        }
    }

    #[test]
    fn magnitude_six_is_severity_nine() {
        assert_eq!(Severity::from_scaled(6.0, 1.5).value(), 9);
    }

    #[test]
    fn scaled_severity_caps_at_ten() {
        assert_eq!(Severity::from_scaled(8.2, 1.5).value(), 10);
        assert_eq!(Severity::from_scaled(0.0, 1.5).value(), 1);
        assert_eq!(Severity::from_scaled(f64::NAN, 1.5).value(), 1);
    }

    #[test]
    fn clamps_out_of_range_values() {
        assert_eq!(Severity::clamped(-4).value(), 1);
        assert_eq!(Severity::clamped(0).value(), 1);
        assert_eq!(Severity::clamped(7).value(), 7);
        assert_eq!(Severity::clamped(42).value(), 10);
    }

    #[test]
    fn deserialization_clamps() {
        let severity: Severity = serde_json::from_str("15").unwrap();
        assert_eq!(severity.value(), 10);
        let severity: Severity = serde_json::from_str("0").unwrap();
        assert_eq!(severity.value(), 1);
    }

    #[test]
    fn marker_color_bands() {
        assert_eq!(Severity::clamped(10).marker_color(), MarkerColor::Red);
        assert_eq!(Severity::clamped(8).marker_color(), MarkerColor::Red);
        assert_eq!(Severity::clamped(7).marker_color(), MarkerColor::Orange);
        assert_eq!(Severity::clamped(5).marker_color(), MarkerColor::Orange);
        assert_eq!(Severity::clamped(4).marker_color(), MarkerColor::Yellow);
        assert_eq!(Severity::clamped(1).marker_color(), MarkerColor::Yellow);
    }
}
