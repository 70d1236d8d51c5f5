//! Fixed bounding boxes used as a proxy for hazard propensity.

use disaster_feed_risk_models::Region;
use disaster_feed_source_models::Coordinates;

/// An axis-aligned box with strict (exclusive) bounds. Open sides use
/// infinities.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    /// Southern bound.
    pub min_lat: f64,
    /// Northern bound.
    pub max_lat: f64,
    /// Western bound.
    pub min_lng: f64,
    /// Eastern bound.
    pub max_lng: f64,
}

impl BoundingBox {
    /// Returns `true` if the point lies strictly inside the box.
    #[must_use]
    pub fn contains(&self, coordinates: Coordinates) -> bool {
        self.min_lat < coordinates.latitude
            && coordinates.latitude < self.max_lat
            && self.min_lng < coordinates.longitude
            && coordinates.longitude < self.max_lng
    }
}

/// Returns the bounding box of a region.
#[must_use]
pub const fn bounds(region: Region) -> BoundingBox {
    match region {
        Region::Coastal => BoundingBox {
            min_lat: f64::NEG_INFINITY,
            max_lat: 23.0,
            min_lng: 89.0,
            max_lng: f64::INFINITY,
        },
        Region::BrahmaputraBasin => BoundingBox {
            min_lat: 23.5,
            max_lat: 25.5,
            min_lng: 89.0,
            max_lng: 90.5,
        },
        Region::MeghnaBasin => BoundingBox {
            min_lat: 23.0,
            max_lat: 24.5,
            min_lng: 90.5,
            max_lng: 92.0,
        },
        Region::GangesBasin => BoundingBox {
            min_lat: 22.5,
            max_lat: 24.5,
            min_lng: 88.0,
            max_lng: 89.5,
        },
        Region::Hilly => BoundingBox {
            min_lat: f64::NEG_INFINITY,
            max_lat: 24.0,
            min_lng: 91.5,
            max_lng: f64::INFINITY,
        },
    }
}

/// Returns every region containing the point, in [`Region::all`] order.
#[must_use]
pub fn classify(coordinates: Coordinates) -> Vec<Region> {
    Region::all()
        .iter()
        .copied()
        .filter(|&region| bounds(region).contains(coordinates))
        .collect()
}
