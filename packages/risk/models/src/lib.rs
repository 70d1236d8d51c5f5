#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Hazard region and risk assessment types.
//!
//! A [`RegionRiskAssessment`] is computed per query and never stored.

use disaster_feed_source_models::Coordinates;
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// Lowest hazard score.
pub const MIN_SCORE: u8 = 1;

/// Highest hazard score.
pub const MAX_SCORE: u8 = 10;

/// A hazard-prone region, identified by a fixed bounding box.
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
pub enum Region {
    /// Low-lying southern coast exposed to cyclones and surges.
    Coastal,
    /// Brahmaputra-Jamuna river basin.
    BrahmaputraBasin,
    /// Meghna river basin.
    MeghnaBasin,
    /// Ganges-Padma river basin.
    GangesBasin,
    /// South-eastern hill tracts.
    Hilly,
}

impl Region {
    /// Returns every region.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[
            Self::Coastal,
            Self::BrahmaputraBasin,
            Self::MeghnaBasin,
            Self::GangesBasin,
            Self::Hilly,
        ]
    }

    /// Returns `true` for the three river basins.
    #[must_use]
    pub const fn is_river_basin(self) -> bool {
        matches!(
            self,
            Self::BrahmaputraBasin | Self::MeghnaBasin | Self::GangesBasin
        )
    }

    /// Returns the hazard this region is prone to.
    #[must_use]
    pub const fn hazard(self) -> Hazard {
        match self {
            Self::Coastal => Hazard::Cyclone,
            Self::BrahmaputraBasin | Self::MeghnaBasin | Self::GangesBasin => Hazard::Flood,
            Self::Hilly => Hazard::Landslide,
        }
    }

    /// Human-readable name.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Coastal => "Coastal belt",
            Self::BrahmaputraBasin => "Brahmaputra basin",
            Self::MeghnaBasin => "Meghna basin",
            Self::GangesBasin => "Ganges basin",
            Self::Hilly => "Hill tracts",
        }
    }
}

/// A scored hazard.
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
pub enum Hazard {
    /// River flooding.
    Flood,
    /// Tropical cyclone and storm surge.
    Cyclone,
    /// Landslide.
    Landslide,
}

/// Overall risk band.
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
pub enum RiskLevel {
    /// Overall score below 4.
    Low,
    /// Overall score 4 to 6.
    Medium,
    /// Overall score 7 and above.
    High,
}

impl RiskLevel {
    /// Bands an overall score.
    #[must_use]
    pub const fn from_overall(overall: u8) -> Self {
        if overall >= 7 {
            Self::High
        } else if overall >= 4 {
            Self::Medium
        } else {
            Self::Low
        }
    }
}

/// Hazard assessment for a single point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegionRiskAssessment {
    /// The assessed point.
    pub coordinates: Coordinates,
    /// Flood score, 1 to 10.
    pub flood_risk: u8,
    /// Cyclone score, 1 to 10.
    pub cyclone_risk: u8,
    /// Landslide score, 1 to 10.
    pub landslide_risk: u8,
    /// Estimated elevation.
    pub elevation_meters: u16,
    /// Rounded mean of the three hazard scores.
    pub overall_risk: u8,
    /// Band of `overall_risk`.
    pub risk_level: RiskLevel,
    /// Regions the point falls in.
    pub regions: Vec<Region>,
    /// Safety guidance for the point.
    pub guidance: Vec<String>,
}

impl RegionRiskAssessment {
    /// Returns the score for one hazard.
    #[must_use]
    pub const fn score(&self, hazard: Hazard) -> u8 {
        match hazard {
            Hazard::Flood => self.flood_risk,
            Hazard::Cyclone => self.cyclone_risk,
            Hazard::Landslide => self.landslide_risk,
        }
    }
}
