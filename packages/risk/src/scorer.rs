//! Pluggable sources of hazard draws.
//!
//! Scores are estimates drawn from fixed ranges. [`SeededScorer`] derives
//! each draw from the seed, the query point and the draw key, so the same
//! question always gets the same answer. [`RandomScorer`] draws from the
//! thread RNG and varies from call to call.

use std::ops::RangeInclusive;

use disaster_feed_source_models::Coordinates;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Seed used when none is configured.
pub const DEFAULT_SEED: u64 = 42;

/// Which quantity a draw is for. Part of the seeded draw's input, so
/// different quantities at the same point are independent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DrawKey {
    /// Flood score.
    Flood,
    /// Cyclone score.
    Cyclone,
    /// Landslide score.
    Landslide,
    /// Elevation in meters.
    Elevation,
}

impl DrawKey {
    const fn salt(self) -> u64 {
        match self {
            Self::Flood => 0x9e37_79b9_7f4a_7c15,
            Self::Cyclone => 0xbf58_476d_1ce4_e5b9,
            Self::Landslide => 0x94d0_49bb_1331_11eb,
            Self::Elevation => 0x2545_f491_4f6c_dd1d,
        }
    }
}

/// Produces a value within `range` for one quantity at one point.
pub trait HazardScorer: Send + Sync {
    /// Draws a value in `range`.
    fn draw(&self, coordinates: Coordinates, key: DrawKey, range: RangeInclusive<u16>) -> u16;
}

/// Deterministic scorer backed by `ChaCha8Rng`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeededScorer {
    seed: u64,
}

impl SeededScorer {
    /// Creates a scorer with the given seed.
    #[must_use]
    pub const fn new(seed: u64) -> Self {
        Self { seed }
    }

    fn stream_seed(&self, coordinates: Coordinates, key: DrawKey) -> u64 {
        let mut state = self.seed ^ key.salt();
        for part in [coordinates.latitude.to_bits(), coordinates.longitude.to_bits()] {
            state = mix(state ^ part);
        }
        state
    }
}

impl Default for SeededScorer {
    fn default() -> Self {
        Self::new(DEFAULT_SEED)
    }
}

impl HazardScorer for SeededScorer {
    fn draw(&self, coordinates: Coordinates, key: DrawKey, range: RangeInclusive<u16>) -> u16 {
        let mut rng = ChaCha8Rng::seed_from_u64(self.stream_seed(coordinates, key));
        rng.gen_range(range)
    }
}

/// Non-deterministic scorer backed by the thread RNG.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RandomScorer;

impl HazardScorer for RandomScorer {
    fn draw(&self, _coordinates: Coordinates, _key: DrawKey, range: RangeInclusive<u16>) -> u16 {
        rand::thread_rng().gen_range(range)
    }
}

/// `SplitMix64` finalizer.
const fn mix(mut z: u64) -> u64 {
    z = z.wrapping_add(0x9e37_79b9_7f4a_7c15);
    z = (z ^ (z >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
    z ^ (z >> 31)
}
