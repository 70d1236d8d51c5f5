//! Per-point hazard assessment.

use std::ops::RangeInclusive;
use std::sync::Arc;

use disaster_feed_risk_models::{Region, RegionRiskAssessment, RiskLevel};
use disaster_feed_source_models::Coordinates;

use crate::RiskError;
use crate::guidance::guidance;
use crate::regions::classify;
use crate::scorer::{DrawKey, HazardScorer, RandomScorer, SeededScorer};

const IN_REGION: RangeInclusive<u16> = 6..=10;
const OUT_OF_REGION: RangeInclusive<u16> = 1..=5;
const OUT_OF_REGION_LANDSLIDE: RangeInclusive<u16> = 1..=3;
const HILLY_ELEVATION: RangeInclusive<u16> = 100..=399;
const LOWLAND_ELEVATION: RangeInclusive<u16> = 0..=99;

/// Computes [`RegionRiskAssessment`]s from region membership and a
/// [`HazardScorer`].
#[derive(Clone)]
pub struct RiskEngine {
    scorer: Arc<dyn HazardScorer>,
}

impl Default for RiskEngine {
    fn default() -> Self {
        Self::new(Arc::new(SeededScorer::default()))
    }
}

impl std::fmt::Debug for RiskEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RiskEngine").finish_non_exhaustive()
    }
}

impl RiskEngine {
    /// Creates an engine drawing from the given scorer.
    #[must_use]
    pub fn new(scorer: Arc<dyn HazardScorer>) -> Self {
        Self { scorer }
    }

    /// Creates a deterministic engine.
    #[must_use]
    pub fn seeded(seed: u64) -> Self {
        Self::new(Arc::new(SeededScorer::new(seed)))
    }

    /// Creates an engine whose draws vary from call to call.
    #[must_use]
    pub fn random() -> Self {
        Self::new(Arc::new(RandomScorer))
    }

    /// Assesses the point `(latitude, longitude)`.
    ///
    /// # Errors
    ///
    /// Returns [`RiskError::InvalidQuery`] if either component is
    /// non-finite or out of range.
    pub fn assess(&self, latitude: f64, longitude: f64) -> Result<RegionRiskAssessment, RiskError> {
        let coordinates =
            Coordinates::checked(latitude, longitude).ok_or_else(|| RiskError::InvalidQuery {
                message: format!("coordinates ({latitude}, {longitude}) are out of range"),
            })?;
        Ok(self.assess_coordinates(coordinates))
    }

    /// Assesses an already validated point.
    #[must_use]
    pub fn assess_coordinates(&self, coordinates: Coordinates) -> RegionRiskAssessment {
        let regions = classify(coordinates);
        let in_basin = regions.iter().any(|r| r.is_river_basin());
        let coastal = regions.contains(&Region::Coastal);
        let hilly = regions.contains(&Region::Hilly);

        let score = |key, elevated: bool, otherwise: RangeInclusive<u16>| {
            let range = if elevated { IN_REGION } else { otherwise };
            to_score(self.scorer.draw(coordinates, key, range))
        };

        let flood_risk = score(DrawKey::Flood, in_basin, OUT_OF_REGION);
        let cyclone_risk = score(DrawKey::Cyclone, coastal, OUT_OF_REGION);
        let landslide_risk = score(DrawKey::Landslide, hilly, OUT_OF_REGION_LANDSLIDE);

        let elevation_meters = self.scorer.draw(
            coordinates,
            DrawKey::Elevation,
            if hilly {
                HILLY_ELEVATION
            } else {
                LOWLAND_ELEVATION
            },
        );

        // A sum of three integers divided by 3 never lands on .5
        let sum = u16::from(flood_risk) + u16::from(cyclone_risk) + u16::from(landslide_risk);
        let overall_risk = to_score((sum + 1) / 3);

        let mut assessment = RegionRiskAssessment {
            coordinates,
            flood_risk,
            cyclone_risk,
            landslide_risk,
            elevation_meters,
            overall_risk,
            risk_level: RiskLevel::from_overall(overall_risk),
            regions,
            guidance: Vec::new(),
        };
        assessment.guidance = guidance(&assessment);

        log::debug!(
            "Assessed ({}, {}): overall {} ({})",
            coordinates.latitude,
            coordinates.longitude,
            assessment.overall_risk,
            assessment.risk_level
        );

        assessment
    }
}

fn to_score(value: u16) -> u8 {
    u8::try_from(value).unwrap_or(u8::MAX).clamp(
        disaster_feed_risk_models::MIN_SCORE,
        disaster_feed_risk_models::MAX_SCORE,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn coastal_point_scores_cyclone_high() {
        let engine = RiskEngine::seeded(42);
        let assessment = engine.assess(22.0, 89.5).unwrap();

        assert_eq!(assessment.regions, vec![Region::Coastal]);
        assert!((6..=10).contains(&assessment.cyclone_risk));
        assert!((1..=3).contains(&assessment.landslide_risk));
        assert!((1..=5).contains(&assessment.flood_risk));
        assert!(assessment.elevation_meters <= 99);
        assert!(!assessment.guidance.is_empty());
    }

    #[test]
    fn seeded_assessments_are_reproducible() {
        let engine = RiskEngine::seeded(42);
        let first = engine.assess(22.0, 89.5).unwrap();
        let second = engine.assess(22.0, 89.5).unwrap();
        assert_eq!(first, second);
        assert_eq!(first, RiskEngine::seeded(42).assess(22.0, 89.5).unwrap());
    }

    #[test]
    fn rejects_out_of_range_coordinates() {
        let engine = RiskEngine::default();
        assert!(matches!(
            engine.assess(91.0, 92.0),
            Err(RiskError::InvalidQuery { .. })
        ));
        assert!(engine.assess(23.0, 181.0).is_err());
        assert!(engine.assess(f64::NAN, 90.0).is_err());
        assert!(engine.assess(23.0, f64::INFINITY).is_err());
    }

    #[test]
    fn hilly_point_has_high_landslide_and_elevation() {
        let assessment = RiskEngine::seeded(3).assess(22.3, 92.2).unwrap();
        assert!(assessment.regions.contains(&Region::Hilly));
        assert!((6..=10).contains(&assessment.landslide_risk));
        assert!((100..=399).contains(&assessment.elevation_meters));
    }

    #[test]
    fn overall_risk_is_rounded_mean_and_banded() {
        let engine = RiskEngine::random();
        for _ in 0..50 {
            let a = engine.assess(24.0, 90.0).unwrap();
            let mean = f64::from(
                u16::from(a.flood_risk) + u16::from(a.cyclone_risk) + u16::from(a.landslide_risk),
            ) / 3.0;
            assert!((f64::from(a.overall_risk) - mean.round()).abs() < f64::EPSILON);
            assert_eq!(a.risk_level, RiskLevel::from_overall(a.overall_risk));
            assert!((6..=10).contains(&a.flood_risk));
        }
    }

    #[test]
    fn unclassified_point_uses_low_ranges() {
        let a = RiskEngine::seeded(9).assess(51.5, -0.12).unwrap();
        assert!(a.regions.is_empty());
        assert!(a.flood_risk <= 5 && a.cyclone_risk <= 5 && a.landslide_risk <= 3);
        assert_ne!(a.risk_level, RiskLevel::High);
    }
}
