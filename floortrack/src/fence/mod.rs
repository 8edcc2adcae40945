//! Geofence containment evaluation
//!
//! Pure geometry over the fence set: circular fences use an inclusive
//! Euclidean distance check, bare point fences require exact coordinate
//! equality, and polygonal fences use ray casting over the exterior ring
//! only.
//!
//! Evaluation is O(fences) per point and runs independently for every
//! entity on every update, so a full update cycle is O(entities × fences).
//! That is acceptable at floor-plan scale (tens of entities, tens of
//! fences) and is a known scaling limit, not a defect.

mod types;

pub use types::{Fence, FenceGeometryError, FenceRegion};

use std::collections::BTreeSet;

use crate::coord::Point;

/// Whether a point lies inside a fence.
///
/// The circular boundary is inclusive: a point at exactly `radius` from
/// the center is inside.
pub fn is_point_in_fence(point: &Point, fence: &Fence) -> bool {
    match &fence.region {
        FenceRegion::Point { .. } => {
            let Some(center) = fence.region.center() else {
                return false;
            };
            match fence.radius {
                Some(radius) => point.distance_2d(&center) <= radius,
                None => point.x() == center.x() && point.y() == center.y(),
            }
        }
        FenceRegion::Polygon { .. } => match fence.region.exterior_ring() {
            Some(ring) => point_in_ring(point.x(), point.y(), ring),
            None => false,
        },
    }
}

/// Ids of all fences containing the point, in sorted order.
pub fn fences_containing_point(point: &Point, fences: &[Fence]) -> BTreeSet<String> {
    fences
        .iter()
        .filter(|fence| is_point_in_fence(point, fence))
        .map(|fence| fence.id.clone())
        .collect()
}

/// Even-odd ray casting against a linear ring.
///
/// Positions with fewer than two coordinates and rings with fewer than
/// four positions never match (such rings are rejected at load time).
fn point_in_ring(x: f64, y: f64, ring: &[Vec<f64>]) -> bool {
    if ring.len() < 4 || ring.iter().any(|p| p.len() < 2) {
        return false;
    }

    let mut inside = false;
    let mut j = ring.len() - 1;
    for i in 0..ring.len() {
        let (xi, yi) = (ring[i][0], ring[i][1]);
        let (xj, yj) = (ring[j][0], ring[j][1]);
        if (yi > y) != (yj > y) && x < (xj - xi) * (y - yi) / (yj - yi) + xi {
            inside = !inside;
        }
        j = i;
    }
    inside
}
