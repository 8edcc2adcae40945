//! Geofence definitions.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::coord::Point;

/// Geometry of a fence region, in GeoJSON shape.
///
/// Polygon coordinates are a list of linear rings; only the first
/// (exterior) ring is evaluated for containment. Interior rings (holes)
/// are carried but ignored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum FenceRegion {
    Point { coordinates: Vec<f64> },
    Polygon { coordinates: Vec<Vec<Vec<f64>>> },
}

impl FenceRegion {
    /// Exterior ring of a polygon region.
    pub fn exterior_ring(&self) -> Option<&[Vec<f64>]> {
        match self {
            FenceRegion::Polygon { coordinates } => coordinates.first().map(|r| r.as_slice()),
            FenceRegion::Point { .. } => None,
        }
    }

    /// Center of a point region.
    pub fn center(&self) -> Option<Point> {
        match self {
            FenceRegion::Point { coordinates } => {
                let x = coordinates.first().copied()?;
                let y = coordinates.get(1).copied()?;
                Some(Point::new(x, y))
            }
            FenceRegion::Polygon { .. } => None,
        }
    }
}

/// Reasons a fence definition is rejected at load time.
#[derive(Debug, Error)]
pub enum FenceGeometryError {
    #[error("point region needs at least 2 coordinates, got {0}")]
    ShortPoint(usize),

    #[error("polygon region has no rings")]
    EmptyPolygon,

    #[error("polygon ring needs at least 4 positions, got {0}")]
    ShortRing(usize),

    #[error("polygon ring position needs at least 2 coordinates")]
    ShortPosition,

    #[error("polygon ring is not closed (first and last position differ)")]
    OpenRing,

    #[error("radius must be non-negative, got {0}")]
    NegativeRadius(f64),
}

/// A geofence region entities can be inside or outside of.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fence {
    pub id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    pub region: FenceRegion,

    /// Radius in local units; turns a point region into a circle.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub radius: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub crs: Option<String>,
}

impl Fence {
    /// A circular fence around a center point.
    pub fn circle(id: impl Into<String>, center: Point, radius: f64) -> Self {
        Self {
            id: id.into(),
            name: None,
            region: FenceRegion::Point {
                coordinates: center.coordinates,
            },
            radius: Some(radius),
            crs: None,
        }
    }

    /// A polygonal fence from its exterior ring.
    pub fn polygon(id: impl Into<String>, exterior: Vec<Vec<f64>>) -> Self {
        Self {
            id: id.into(),
            name: None,
            region: FenceRegion::Polygon {
                coordinates: vec![exterior],
            },
            radius: None,
            crs: None,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Validate the fence geometry. Called at configuration load; a
    /// malformed definition is fatal at boot rather than skipped.
    pub fn validate(&self) -> Result<(), FenceGeometryError> {
        if let Some(r) = self.radius {
            if r < 0.0 {
                return Err(FenceGeometryError::NegativeRadius(r));
            }
        }
        match &self.region {
            FenceRegion::Point { coordinates } => {
                if coordinates.len() < 2 {
                    return Err(FenceGeometryError::ShortPoint(coordinates.len()));
                }
                Ok(())
            }
            FenceRegion::Polygon { coordinates } => {
                let exterior = coordinates.first().ok_or(FenceGeometryError::EmptyPolygon)?;
                if exterior.len() < 4 {
                    return Err(FenceGeometryError::ShortRing(exterior.len()));
                }
                for position in exterior {
                    if position.len() < 2 {
                        return Err(FenceGeometryError::ShortPosition);
                    }
                }
                let first = &exterior[0];
                let last = &exterior[exterior.len() - 1];
                if first[0] != last[0] || first[1] != last[1] {
                    return Err(FenceGeometryError::OpenRing);
                }
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_circle_fence_validates() {
        let fence = Fence::circle("f1", Point::new(10.0, 10.0), 5.0);
        fence.validate().unwrap();
    }

    #[test]
    fn test_negative_radius_rejected() {
        let fence = Fence::circle("f1", Point::new(0.0, 0.0), -1.0);
        assert!(matches!(
            fence.validate(),
            Err(FenceGeometryError::NegativeRadius(_))
        ));
    }

    #[test]
    fn test_open_ring_rejected() {
        let fence = Fence::polygon(
            "f1",
            vec![
                vec![0.0, 0.0],
                vec![10.0, 0.0],
                vec![10.0, 10.0],
                vec![0.0, 10.0],
            ],
        );
        assert!(matches!(fence.validate(), Err(FenceGeometryError::OpenRing)));
    }

    #[test]
    fn test_short_ring_rejected() {
        let fence = Fence::polygon("f1", vec![vec![0.0, 0.0], vec![1.0, 1.0], vec![0.0, 0.0]]);
        assert!(matches!(
            fence.validate(),
            Err(FenceGeometryError::ShortRing(3))
        ));
    }

    #[test]
    fn test_fence_geojson_round_trip() {
        let json = r#"{
            "id": "dock",
            "name": "Loading dock",
            "region": {
                "type": "Polygon",
                "coordinates": [[[15,5],[35,5],[35,15],[15,15],[15,5]]]
            },
            "crs": "local"
        }"#;
        let fence: Fence = serde_json::from_str(json).unwrap();
        fence.validate().unwrap();
        assert_eq!(fence.id, "dock");
        assert_eq!(fence.region.exterior_ring().unwrap().len(), 5);
    }
}
