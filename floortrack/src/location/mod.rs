//! Location records and CRS normalization.
//!
//! Every location entering the system is normalized into the local
//! floor-plan frame before it reaches the registry. Normalization is
//! fail-open: a location that cannot be transformed (insufficient control
//! points, non-finite output) is logged and passed through unchanged
//! rather than rejected, so a misconfigured georeference degrades the
//! display instead of dropping updates.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::coord::{wgs84_to_local, Georeference, Point};
use crate::registry::ProviderType;

/// CRS tag for the local floor-plan frame.
pub const CRS_LOCAL: &str = "local";

/// CRS tags accepted as WGS84 designators.
const WGS84_TAGS: &[&str] = &[
    "wgs84",
    "WGS84",
    "EPSG:4326",
    "epsg:4326",
    "CRS84",
    "urn:ogc:def:crs:OGC:1.3:CRS84",
];

/// A position report for an entity.
///
/// Locations are replaced wholesale on every update; successive records
/// for the same entity are never field-merged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub position: Point,

    /// Coordinate reference system tag. `None` means the source did not
    /// declare one and classification falls back to the magnitude
    /// heuristic.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub crs: Option<String>,

    /// Provider that emitted this location.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider_type: Option<ProviderType>,

    /// Trackables this location should be propagated to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trackables: Option<Vec<String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,

    /// Reported accuracy in the position's units.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accuracy: Option<f64>,
}

impl Location {
    /// Create a minimal location in the given CRS.
    pub fn new(position: Point, crs: impl Into<String>) -> Self {
        Self {
            position,
            crs: Some(crs.into()),
            provider_id: None,
            provider_type: None,
            trackables: None,
            timestamp: None,
            accuracy: None,
        }
    }

    pub fn is_local(&self) -> bool {
        self.crs.as_deref() == Some(CRS_LOCAL)
    }
}

/// What the normalizer did with a location.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NormalizeStatus {
    /// Already in the local frame (or assumed local); returned unchanged.
    AlreadyLocal,
    /// Transformed from WGS84 into the local frame.
    Normalized,
    /// Transform failed; the original location was passed through.
    FailedOpen,
    /// CRS tag is neither local nor a WGS84 designator.
    Unsupported,
}

/// Whether a CRS tag names WGS84.
pub fn is_wgs84_tag(tag: &str) -> bool {
    WGS84_TAGS.contains(&tag)
}

/// Best-effort WGS84 classifier.
///
/// An explicit CRS tag is authoritative. Without one, coordinates are
/// classified by magnitude bounds: longitude in [-180, 180], latitude in
/// [-90, 90], both with absolute value above 1 to exclude small local
/// coordinates. The heuristic is ambiguous for points that are plausible
/// both as small lon/lat and as small local meters; such untagged points
/// are treated as local.
pub fn is_wgs84_coordinates(point: &Point, crs: Option<&str>) -> bool {
    match crs {
        Some(tag) if tag == CRS_LOCAL => false,
        Some(tag) => is_wgs84_tag(tag),
        None => {
            let lon = point.x();
            let lat = point.y();
            lon.abs() <= 180.0 && lat.abs() <= 90.0 && lon.abs() > 1.0 && lat.abs() > 1.0
        }
    }
}

/// Normalize a location into the local frame, reporting what happened.
///
/// Never fails: transform problems are logged and the original location
/// is returned unchanged (fail-open).
pub fn normalize_with_status(
    location: &Location,
    georef: &Georeference,
) -> (Location, NormalizeStatus) {
    match location.crs.as_deref() {
        Some(CRS_LOCAL) => (location.clone(), NormalizeStatus::AlreadyLocal),
        Some(tag) if is_wgs84_tag(tag) => transform_fail_open(location, georef),
        Some(tag) => {
            warn!(crs = %tag, "Unsupported CRS tag, passing location through unchanged");
            (location.clone(), NormalizeStatus::Unsupported)
        }
        None => {
            if is_wgs84_coordinates(&location.position, None) {
                transform_fail_open(location, georef)
            } else {
                // Untagged and not plausibly geographic: assume local and
                // canonicalize the tag.
                let mut local = location.clone();
                local.crs = Some(CRS_LOCAL.to_string());
                (local, NormalizeStatus::AlreadyLocal)
            }
        }
    }
}

/// Normalize a location into the local frame.
///
/// Already-local locations are returned unchanged. See
/// [`normalize_with_status`] for the fail-open contract.
pub fn normalize_to_local(location: &Location, georef: &Georeference) -> Location {
    normalize_with_status(location, georef).0
}

fn transform_fail_open(
    location: &Location,
    georef: &Georeference,
) -> (Location, NormalizeStatus) {
    match wgs84_to_local(&location.position, georef) {
        Ok(position) if position.is_finite_2d() => {
            let mut local = location.clone();
            local.position = position;
            local.crs = Some(CRS_LOCAL.to_string());
            (local, NormalizeStatus::Normalized)
        }
        Ok(_) => {
            warn!("Georeference transform produced non-finite coordinates, keeping original");
            (location.clone(), NormalizeStatus::FailedOpen)
        }
        Err(e) => {
            warn!(error = %e, "Georeference transform failed, keeping original location");
            (location.clone(), NormalizeStatus::FailedOpen)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coord::GroundControlPoint;

    fn unit_georef() -> Georeference {
        Georeference::new(
            vec![
                GroundControlPoint::new([0.0, 0.0], [0.0, 0.0]),
                GroundControlPoint::new([1.0, 0.0], [100.0, 0.0]),
                GroundControlPoint::new([0.0, 1.0], [0.0, 100.0]),
            ],
            None,
        )
        .unwrap()
    }

    fn degenerate_georef() -> Georeference {
        Georeference::new(
            vec![
                GroundControlPoint::new([0.0, 0.0], [0.0, 0.0]),
                GroundControlPoint::new([1.0, 0.0], [100.0, 0.0]),
            ],
            None,
        )
        .unwrap()
    }

    #[test]
    fn test_local_location_returned_unchanged() {
        let location = Location::new(Point::new(10.0, 20.0), CRS_LOCAL);
        let (normalized, status) = normalize_with_status(&location, &unit_georef());
        assert_eq!(status, NormalizeStatus::AlreadyLocal);
        assert_eq!(normalized, location);
    }

    #[test]
    fn test_wgs84_location_is_transformed() {
        let location = Location::new(Point::new(0.5, 0.5), "EPSG:4326");
        let (normalized, status) = normalize_with_status(&location, &unit_georef());
        assert_eq!(status, NormalizeStatus::Normalized);
        assert!(normalized.is_local());
        assert!((normalized.position.x() - 50.0).abs() < 1e-9);
        assert!((normalized.position.y() - 50.0).abs() < 1e-9);
    }

    #[test]
    fn test_transform_failure_fails_open() {
        let location = Location::new(Point::new(0.5, 0.5), "wgs84");
        let (normalized, status) = normalize_with_status(&location, &degenerate_georef());
        assert_eq!(status, NormalizeStatus::FailedOpen);
        // Original coordinates and CRS tag preserved.
        assert_eq!(normalized, location);
    }

    #[test]
    fn test_unsupported_crs_passes_through() {
        let location = Location::new(Point::new(1000.0, 2000.0), "EPSG:25832");
        let (normalized, status) = normalize_with_status(&location, &unit_georef());
        assert_eq!(status, NormalizeStatus::Unsupported);
        assert_eq!(normalized, location);
    }

    #[test]
    fn test_untagged_geographic_magnitude_is_classified_wgs84() {
        let mut location = Location::new(Point::new(11.57, 48.13), "x");
        location.crs = None;

        // Reference frame spanning the same area.
        let georef = Georeference::new(
            vec![
                GroundControlPoint::new([11.0, 48.0], [0.0, 0.0]),
                GroundControlPoint::new([12.0, 48.0], [100.0, 0.0]),
                GroundControlPoint::new([11.0, 49.0], [0.0, 100.0]),
            ],
            None,
        )
        .unwrap();

        let (normalized, status) = normalize_with_status(&location, &georef);
        assert_eq!(status, NormalizeStatus::Normalized);
        assert!(normalized.is_local());
    }

    #[test]
    fn test_untagged_small_magnitude_assumed_local() {
        let mut location = Location::new(Point::new(0.5, 0.7), "x");
        location.crs = None;

        let (normalized, status) = normalize_with_status(&location, &unit_georef());
        assert_eq!(status, NormalizeStatus::AlreadyLocal);
        // Position untouched, tag canonicalized.
        assert_eq!(normalized.position, location.position);
        assert!(normalized.is_local());
    }

    #[test]
    fn test_heuristic_bounds() {
        // Plausible lon/lat.
        assert!(is_wgs84_coordinates(&Point::new(11.5, 48.1), None));
        // Magnitudes beyond geographic bounds.
        assert!(!is_wgs84_coordinates(&Point::new(500.0, 48.0), None));
        assert!(!is_wgs84_coordinates(&Point::new(11.5, 95.0), None));
        // Small magnitudes read as local meters.
        assert!(!is_wgs84_coordinates(&Point::new(0.5, 0.5), None));
        // Explicit tags are authoritative regardless of magnitude.
        assert!(is_wgs84_coordinates(&Point::new(0.5, 0.5), Some("wgs84")));
        assert!(!is_wgs84_coordinates(&Point::new(11.5, 48.1), Some("local")));
    }

    #[test]
    fn test_normalize_preserves_payload_fields() {
        let mut location = Location::new(Point::new(0.5, 0.5), "wgs84");
        location.provider_id = Some("p1".to_string());
        location.trackables = Some(vec!["t1".to_string()]);
        location.accuracy = Some(2.5);

        let normalized = normalize_to_local(&location, &unit_georef());
        assert_eq!(normalized.provider_id.as_deref(), Some("p1"));
        assert_eq!(normalized.trackables, location.trackables);
        assert_eq!(normalized.accuracy, Some(2.5));
    }
}
