//! Geographical bounding box used to restrict station selection.

use rstar::AABB;
use thiserror::Error;

/// Error returned for a malformed bounding box.
#[derive(Debug, Clone, Error)]
pub enum BoundingBoxError {
    #[error("latitude {0} is outside [-90, 90]")]
    LatitudeOutOfRange(f64),
    #[error("longitude {0} is outside [-180, 180]")]
    LongitudeOutOfRange(f64),
    #[error("minimum corner ({min_lat}, {min_lon}) exceeds maximum corner ({max_lat}, {max_lon})")]
    InvertedCorners {
        min_lat: f64,
        max_lat: f64,
        min_lon: f64,
        max_lon: f64,
    },
}

/// An axis-aligned latitude/longitude box, inclusive on all edges.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    min_lat: f64,
    max_lat: f64,
    min_lon: f64,
    max_lon: f64,
}

impl BoundingBox {
    /// Builds a bounding box from its corner coordinates, validating the
    /// coordinate ranges and corner ordering.
    pub fn new(
        min_lat: f64,
        max_lat: f64,
        min_lon: f64,
        max_lon: f64,
    ) -> Result<Self, BoundingBoxError> {
        for lat in [min_lat, max_lat] {
            if !(-90.0..=90.0).contains(&lat) {
                return Err(BoundingBoxError::LatitudeOutOfRange(lat));
            }
        }
        for lon in [min_lon, max_lon] {
            if !(-180.0..=180.0).contains(&lon) {
                return Err(BoundingBoxError::LongitudeOutOfRange(lon));
            }
        }
        if min_lat > max_lat || min_lon > max_lon {
            return Err(BoundingBoxError::InvertedCorners {
                min_lat,
                max_lat,
                min_lon,
                max_lon,
            });
        }
        Ok(Self {
            min_lat,
            max_lat,
            min_lon,
            max_lon,
        })
    }

    /// The R-tree envelope covering this box.
    pub(crate) fn envelope(&self) -> AABB<[f64; 2]> {
        AABB::from_corners([self.min_lat, self.min_lon], [self.max_lat, self.max_lon])
    }
}
