//! Core types for the georeferencing transform.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Meters per degree of latitude (spherical approximation).
pub const METERS_PER_DEGREE_LAT: f64 = 111_320.0;

/// Minimum angular separation (in degrees) for a ground control point to
/// anchor an axis. Deltas at or below this threshold cannot resolve the
/// axis direction.
pub const AXIS_EPSILON_DEG: f64 = 1e-9;

/// Axis identifier used in transform errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    X,
    Y,
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Axis::X => write!(f, "x"),
            Axis::Y => write!(f, "y"),
        }
    }
}

/// Errors that can occur while deriving or applying a georeference.
#[derive(Debug, Error)]
pub enum CoordError {
    /// Fewer than two ground control points were supplied.
    #[error("georeference requires at least 2 ground control points, got {0}")]
    InsufficientControlPoints(usize),

    /// No control point spans the given axis, so the axis scale and
    /// direction cannot be resolved.
    #[error("ground control points do not span the {0} axis")]
    DegenerateAxis(Axis),

    /// The derived axis scale is zero; the local frame cannot be
    /// inverted back to WGS84.
    #[error("{0} axis scale is zero, local frame is not invertible")]
    ZeroScale(Axis),

    /// The transform produced a non-finite coordinate.
    #[error("transform produced a non-finite {0} coordinate")]
    NonFinite(Axis),
}

/// A 2D (optionally 3D) position.
///
/// The unit and meaning of the coordinates depend on the CRS tag of the
/// record carrying the point: local floor-plan units, or `[lon, lat]`
/// degrees for WGS84. Serialized in GeoJSON shape:
/// `{"type": "Point", "coordinates": [x, y]}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename = "Point")]
pub struct Point {
    pub coordinates: Vec<f64>,
}

impl Point {
    /// Create a 2D point.
    pub fn new(x: f64, y: f64) -> Self {
        Self {
            coordinates: vec![x, y],
        }
    }

    /// Create a 3D point.
    pub fn new_3d(x: f64, y: f64, z: f64) -> Self {
        Self {
            coordinates: vec![x, y, z],
        }
    }

    /// First coordinate (x, or longitude under WGS84). NaN if absent.
    pub fn x(&self) -> f64 {
        self.coordinates.first().copied().unwrap_or(f64::NAN)
    }

    /// Second coordinate (y, or latitude under WGS84). NaN if absent.
    pub fn y(&self) -> f64 {
        self.coordinates.get(1).copied().unwrap_or(f64::NAN)
    }

    /// Optional third coordinate (altitude / height).
    pub fn z(&self) -> Option<f64> {
        self.coordinates.get(2).copied()
    }

    /// True when both planar coordinates are present and finite.
    pub fn is_finite_2d(&self) -> bool {
        self.coordinates.len() >= 2 && self.x().is_finite() && self.y().is_finite()
    }

    /// Planar Euclidean distance to another point (z is ignored).
    pub fn distance_2d(&self, other: &Point) -> f64 {
        let dx = self.x() - other.x();
        let dy = self.y() - other.y();
        (dx * dx + dy * dy).sqrt()
    }
}

/// A paired (WGS84, local) coordinate anchoring the georeference.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroundControlPoint {
    /// `[longitude, latitude]` in degrees.
    pub wgs84: [f64; 2],
    /// `[x, y]` in local floor-plan units.
    pub local: [f64; 2],
}

impl GroundControlPoint {
    pub fn new(wgs84: [f64; 2], local: [f64; 2]) -> Self {
        Self { wgs84, local }
    }

    pub fn lon(&self) -> f64 {
        self.wgs84[0]
    }

    pub fn lat(&self) -> f64 {
        self.wgs84[1]
    }
}

/// Georeference configuration: the set of ground control points tying the
/// local floor-plan frame to WGS84, plus an optional zone identifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Georeference {
    #[serde(rename = "groundControlPoints")]
    ground_control_points: Vec<GroundControlPoint>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    zone: Option<String>,
}

impl Georeference {
    /// Create a georeference, requiring at least two control points.
    pub fn new(
        ground_control_points: Vec<GroundControlPoint>,
        zone: Option<String>,
    ) -> Result<Self, CoordError> {
        if ground_control_points.len() < 2 {
            return Err(CoordError::InsufficientControlPoints(
                ground_control_points.len(),
            ));
        }
        Ok(Self {
            ground_control_points,
            zone,
        })
    }

    /// Re-check invariants after deserialization.
    pub fn validate(&self) -> Result<(), CoordError> {
        if self.ground_control_points.len() < 2 {
            return Err(CoordError::InsufficientControlPoints(
                self.ground_control_points.len(),
            ));
        }
        Ok(())
    }

    pub fn ground_control_points(&self) -> &[GroundControlPoint] {
        &self.ground_control_points
    }

    pub fn zone(&self) -> Option<&str> {
        self.zone.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_point_accessors() {
        let p = Point::new_3d(1.0, 2.0, 3.0);
        assert_eq!(p.x(), 1.0);
        assert_eq!(p.y(), 2.0);
        assert_eq!(p.z(), Some(3.0));
        assert!(p.is_finite_2d());
    }

    #[test]
    fn test_point_missing_coordinates_are_nan() {
        let p = Point {
            coordinates: vec![5.0],
        };
        assert!(p.y().is_nan());
        assert!(!p.is_finite_2d());
    }

    #[test]
    fn test_point_distance_ignores_altitude() {
        let a = Point::new_3d(0.0, 0.0, 100.0);
        let b = Point::new_3d(3.0, 4.0, -50.0);
        assert_eq!(a.distance_2d(&b), 5.0);
    }

    #[test]
    fn test_point_geojson_shape() {
        let p = Point::new(12.5, -3.0);
        let json = serde_json::to_value(&p).unwrap();
        assert_eq!(json["type"], "Point");
        assert_eq!(json["coordinates"][0], 12.5);

        let back: Point = serde_json::from_value(json).unwrap();
        assert_eq!(back, p);
    }

    #[test]
    fn test_georeference_requires_two_points() {
        let err = Georeference::new(vec![GroundControlPoint::new([0.0, 0.0], [0.0, 0.0])], None)
            .unwrap_err();
        assert!(matches!(err, CoordError::InsufficientControlPoints(1)));
    }

    #[test]
    fn test_georeference_config_shape() {
        let json = r#"{
            "groundControlPoints": [
                {"wgs84": [0.0, 0.0], "local": [0.0, 0.0]},
                {"wgs84": [1.0, 1.0], "local": [100.0, 100.0]}
            ],
            "zone": "floor-2"
        }"#;
        let georef: Georeference = serde_json::from_str(json).unwrap();
        georef.validate().unwrap();
        assert_eq!(georef.ground_control_points().len(), 2);
        assert_eq!(georef.zone(), Some("floor-2"));
    }
}
