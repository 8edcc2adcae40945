//! Coordinate georeferencing module
//!
//! Provides conversions between WGS84 geographic coordinates and the local
//! floor-plan frame, anchored on ground control points (GCPs).
//!
//! # Design
//!
//! The transform is an equirectangular approximation: meters per degree of
//! latitude is a fixed constant, meters per degree of longitude is scaled
//! by the cosine of the control points' mean latitude. Scales are derived
//! independently per axis from the control points, which yields an
//! axis-aligned affine map: rotation between the frames is not supported,
//! and no least-squares fit over all points is attempted. The selection
//! policy is kept behind this module boundary so a full affine fit could
//! replace it without an API change.

mod types;

pub use types::{
    Axis, CoordError, Georeference, GroundControlPoint, Point, AXIS_EPSILON_DEG,
    METERS_PER_DEGREE_LAT,
};

/// Derived per-frame transform parameters.
///
/// Origin is the first control point. The x axis is anchored on a control
/// point whose longitude differs meaningfully from the origin, the y axis
/// on one whose latitude does, falling back to positional control points
/// when no such point exists. Scales are in local units per meter.
struct FrameParams {
    origin_wgs: [f64; 2],
    origin_local: [f64; 2],
    meters_per_degree_lon: f64,
    scale_x: f64,
    scale_y: f64,
}

fn frame_params(georef: &Georeference) -> Result<FrameParams, CoordError> {
    let gcps = georef.ground_control_points();
    if gcps.len() < 2 {
        return Err(CoordError::InsufficientControlPoints(gcps.len()));
    }

    let mean_lat = gcps.iter().map(|g| g.lat()).sum::<f64>() / gcps.len() as f64;
    let meters_per_degree_lon = METERS_PER_DEGREE_LAT * mean_lat.to_radians().cos();

    let origin = &gcps[0];

    // Axis references: prefer a control point that meaningfully spans the
    // axis, fall back to positional points. A fallback that still does not
    // span the axis is a degenerate configuration and must fail rather
    // than produce an unresolvable direction.
    let x_ref = gcps[1..]
        .iter()
        .find(|g| (g.lon() - origin.lon()).abs() > AXIS_EPSILON_DEG)
        .unwrap_or(&gcps[1]);
    let y_fallback = if gcps.len() > 2 { &gcps[2] } else { &gcps[1] };
    let y_ref = gcps[1..]
        .iter()
        .find(|g| (g.lat() - origin.lat()).abs() > AXIS_EPSILON_DEG)
        .unwrap_or(y_fallback);

    let dlon = x_ref.lon() - origin.lon();
    if dlon.abs() <= AXIS_EPSILON_DEG {
        return Err(CoordError::DegenerateAxis(Axis::X));
    }
    let dlat = y_ref.lat() - origin.lat();
    if dlat.abs() <= AXIS_EPSILON_DEG {
        return Err(CoordError::DegenerateAxis(Axis::Y));
    }

    let scale_x = (x_ref.local[0] - origin.local[0]) / (dlon * meters_per_degree_lon);
    let scale_y = (y_ref.local[1] - origin.local[1]) / (dlat * METERS_PER_DEGREE_LAT);

    Ok(FrameParams {
        origin_wgs: origin.wgs84,
        origin_local: origin.local,
        meters_per_degree_lon,
        scale_x,
        scale_y,
    })
}

/// Converts a WGS84 `[lon, lat]` point to the local floor-plan frame.
///
/// An optional third coordinate (altitude) is passed through unchanged.
///
/// # Errors
///
/// Fails for fewer than two control points, for control point sets that do
/// not span both axes, and when the transform produces a non-finite
/// coordinate. It never silently returns a wrong result for a degenerate
/// configuration.
pub fn wgs84_to_local(point: &Point, georef: &Georeference) -> Result<Point, CoordError> {
    let params = frame_params(georef)?;

    let east_m = (point.x() - params.origin_wgs[0]) * params.meters_per_degree_lon;
    let north_m = (point.y() - params.origin_wgs[1]) * METERS_PER_DEGREE_LAT;

    let x = params.origin_local[0] + east_m * params.scale_x;
    let y = params.origin_local[1] + north_m * params.scale_y;

    if !x.is_finite() {
        return Err(CoordError::NonFinite(Axis::X));
    }
    if !y.is_finite() {
        return Err(CoordError::NonFinite(Axis::Y));
    }

    Ok(match point.z() {
        Some(z) => Point::new_3d(x, y, z),
        None => Point::new(x, y),
    })
}

/// Converts a local floor-plan point back to WGS84 `[lon, lat]`.
///
/// Uses the same origin and axis-selection policy as [`wgs84_to_local`]
/// with inverse per-axis scale factors, so the two functions form an
/// approximate round-trip pair for well-conditioned control point sets.
pub fn local_to_wgs84(point: &Point, georef: &Georeference) -> Result<Point, CoordError> {
    let params = frame_params(georef)?;

    if params.scale_x == 0.0 {
        return Err(CoordError::ZeroScale(Axis::X));
    }
    if params.scale_y == 0.0 {
        return Err(CoordError::ZeroScale(Axis::Y));
    }

    let east_m = (point.x() - params.origin_local[0]) / params.scale_x;
    let north_m = (point.y() - params.origin_local[1]) / params.scale_y;

    let lon = params.origin_wgs[0] + east_m / params.meters_per_degree_lon;
    let lat = params.origin_wgs[1] + north_m / METERS_PER_DEGREE_LAT;

    if !lon.is_finite() {
        return Err(CoordError::NonFinite(Axis::X));
    }
    if !lat.is_finite() {
        return Err(CoordError::NonFinite(Axis::Y));
    }

    Ok(match point.z() {
        Some(z) => Point::new_3d(lon, lat, z),
        None => Point::new(lon, lat),
    })
}
