//! # Geographic Utilities
//!
//! Shared geographic computations used by the visibility and clustering engines.
//!
//! ## Overview
//!
//! | Function | Description |
//! |----------|-------------|
//! | [`haversine_distance`] | Great-circle distance between two points |
//! | [`compute_center`] | Arithmetic-mean centroid of a set of points |
//! | [`compute_bounds`] | Bounding box of a set of points |
//! | [`cap_half_widths`] | Degree extent of a circle around a point |
//!
//! ## Example
//!
//! ```rust
//! use nearby_core::{GeoPoint, geo_utils};
//!
//! let cafe = GeoPoint::new(37.7749, -122.4194);
//! let bookshop = GeoPoint::new(37.7751, -122.4190);
//!
//! let dist = geo_utils::haversine_distance(&cafe, &bookshop);
//! assert!(dist > 30.0 && dist < 50.0);
//!
//! let center = geo_utils::compute_center(&[cafe, bookshop]);
//! assert!((center.latitude - 37.7750).abs() < 1e-9);
//! ```
//!
//! ## Coordinate System
//!
//! All functions expect WGS84 coordinates (latitude/longitude in degrees).
//! Distances use the haversine formula on a spherical Earth, which is
//! accurate to well under a meter at the venue scale this crate works at.

use geo::{Distance, Haversine, Point};

use crate::{Bounds, GeoPoint};

// =============================================================================
// Distance Functions
// =============================================================================

/// Great-circle distance in meters between two points.
///
/// The result is exactly symmetric: `haversine_distance(a, b)` and
/// `haversine_distance(b, a)` return the same bit pattern, because the pair
/// is put into a canonical order before the formula is evaluated. Radius
/// checks at an inclusive boundary depend on this.
///
/// ```rust
/// use nearby_core::{GeoPoint, geo_utils};
///
/// let london = GeoPoint::new(51.5074, -0.1278);
/// let paris = GeoPoint::new(48.8566, 2.3522);
///
/// let distance = geo_utils::haversine_distance(&london, &paris);
/// assert!((distance - 343_560.0).abs() < 1000.0);
/// assert_eq!(distance, geo_utils::haversine_distance(&paris, &london));
/// ```
#[inline]
pub fn haversine_distance(p1: &GeoPoint, p2: &GeoPoint) -> f64 {
    let (a, b) = if (p1.latitude, p1.longitude) <= (p2.latitude, p2.longitude) {
        (p1, p2)
    } else {
        (p2, p1)
    };
    let point1 = Point::new(a.longitude, a.latitude);
    let point2 = Point::new(b.longitude, b.latitude);
    Haversine::distance(point1, point2)
}

/// Mean Earth radius in meters, the radius [`haversine_distance`] measures on.
pub const EARTH_RADIUS_METERS: f64 = 6_371_008.8;

/// Degree half-widths `(lat, lng)` of the smallest lat/lng box containing
/// every point within `meters` of `center` on the sphere.
///
/// Returns `None` when the circle reaches a pole, where no such box exists
/// short of the full longitude range.
///
/// ```rust
/// use nearby_core::{GeoPoint, geo_utils};
///
/// let (lat, lng) = geo_utils::cap_half_widths(&GeoPoint::new(60.0, 0.0), 1_000.0).unwrap();
/// assert!(lng > lat * 1.9);
/// assert!(geo_utils::cap_half_widths(&GeoPoint::new(89.99, 0.0), 5_000.0).is_none());
/// ```
pub fn cap_half_widths(center: &GeoPoint, meters: f64) -> Option<(f64, f64)> {
    let angle = meters / EARTH_RADIUS_METERS;
    let lat_half = angle.to_degrees();
    if center.latitude.abs() + lat_half >= 90.0 {
        return None;
    }
    let ratio = angle.sin() / center.latitude.to_radians().cos();
    Some((lat_half, ratio.min(1.0).asin().to_degrees()))
}

// =============================================================================
// Bounding Box Functions
// =============================================================================

/// Compute the bounding box of a set of points.
///
/// Returns `None` for empty input.
///
/// ```rust
/// use nearby_core::{GeoPoint, geo_utils};
///
/// let points = vec![
///     GeoPoint::new(51.5000, -0.1300),
///     GeoPoint::new(51.5100, -0.1200),
/// ];
/// let bounds = geo_utils::compute_bounds(&points).unwrap();
/// assert_eq!(bounds.min_lat, 51.5000);
/// assert_eq!(bounds.max_lng, -0.1200);
/// ```
pub fn compute_bounds(points: &[GeoPoint]) -> Option<Bounds> {
    if points.is_empty() {
        return None;
    }

    let mut min_lat = f64::MAX;
    let mut max_lat = f64::MIN;
    let mut min_lng = f64::MAX;
    let mut max_lng = f64::MIN;

    for p in points {
        min_lat = min_lat.min(p.latitude);
        max_lat = max_lat.max(p.latitude);
        min_lng = min_lng.min(p.longitude);
        max_lng = max_lng.max(p.longitude);
    }

    Some(Bounds { min_lat, max_lat, min_lng, max_lng })
}

// =============================================================================
// Center/Centroid Functions
// =============================================================================

/// Arithmetic mean of latitudes and longitudes.
///
/// Returns (0, 0) for empty input. Fine for venue-sized groups; groups
/// straddling the antimeridian would need a spherical centroid instead.
pub fn compute_center(points: &[GeoPoint]) -> GeoPoint {
    if points.is_empty() {
        return GeoPoint::new(0.0, 0.0);
    }

    let sum_lat: f64 = points.iter().map(|p| p.latitude).sum();
    let sum_lng: f64 = points.iter().map(|p| p.longitude).sum();
    let n = points.len() as f64;

    GeoPoint::new(sum_lat / n, sum_lng / n)
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn approx_eq(a: f64, b: f64, epsilon: f64) -> bool {
        (a - b).abs() < epsilon
    }

    #[test]
    fn test_haversine_distance_same_point() {
        let p = GeoPoint::new(37.7749, -122.4194);
        assert_eq!(haversine_distance(&p, &p), 0.0);
    }

    #[test]
    fn test_haversine_distance_known_value() {
        let london = GeoPoint::new(51.5074, -0.1278);
        let paris = GeoPoint::new(48.8566, 2.3522);
        let dist = haversine_distance(&london, &paris);
        assert!(approx_eq(dist, 343_560.0, 5000.0));
    }

    #[test]
    fn test_haversine_distance_is_symmetric() {
        let pairs = [
            (GeoPoint::new(37.7749, -122.4194), GeoPoint::new(37.7758, -122.4183)),
            (GeoPoint::new(-33.8688, 151.2093), GeoPoint::new(-33.8690, 151.2101)),
            (GeoPoint::new(0.0, 179.9999), GeoPoint::new(0.0001, -179.9999)),
        ];
        for (a, b) in pairs {
            assert_eq!(haversine_distance(&a, &b), haversine_distance(&b, &a));
        }
    }

    #[test]
    fn test_compute_bounds() {
        let points = vec![
            GeoPoint::new(51.50, -0.13),
            GeoPoint::new(51.51, -0.12),
            GeoPoint::new(51.505, -0.125),
        ];
        let bounds = compute_bounds(&points).unwrap();
        assert_eq!(bounds.min_lat, 51.50);
        assert_eq!(bounds.max_lat, 51.51);
        assert_eq!(bounds.min_lng, -0.13);
        assert_eq!(bounds.max_lng, -0.12);
    }

    #[test]
    fn test_compute_bounds_empty() {
        assert!(compute_bounds(&[]).is_none());
    }

    #[test]
    fn test_compute_center() {
        let points = vec![
            GeoPoint::new(51.50, -0.10),
            GeoPoint::new(51.52, -0.12),
        ];
        let center = compute_center(&points);
        assert!(approx_eq(center.latitude, 51.51, 0.001));
        assert!(approx_eq(center.longitude, -0.11, 0.001));
    }

    #[test]
    fn test_compute_center_empty() {
        let center = compute_center(&[]);
        assert_eq!(center.latitude, 0.0);
        assert_eq!(center.longitude, 0.0);
    }

    #[test]
    fn test_cap_half_widths_equator() {
        let (lat, lng) = cap_half_widths(&GeoPoint::new(0.0, 0.0), 111_195.0).unwrap();
        assert!(approx_eq(lat, 1.0, 0.001));
        assert!(approx_eq(lng, 1.0, 0.001));
    }

    #[test]
    fn test_cap_half_widths_cover_far_points_at_high_latitude() {
        // The widest longitude of a circle lies poleward of its center
        let center = GeoPoint::new(60.0, 0.0);
        let edge = GeoPoint::new(61.27, 18.18);
        let radius = 1_000_000.0;
        assert!(haversine_distance(&center, &edge) < radius);

        let (lat, lng) = cap_half_widths(&center, radius).unwrap();
        assert!(edge.latitude - center.latitude <= lat);
        assert!(edge.longitude - center.longitude <= lng);
    }

    #[test]
    fn test_cap_half_widths_pole_inside() {
        assert!(cap_half_widths(&GeoPoint::new(85.0, 0.0), 600_000.0).is_none());
        assert!(cap_half_widths(&GeoPoint::new(-85.0, 0.0), 600_000.0).is_none());
        assert!(cap_half_widths(&GeoPoint::new(85.0, 0.0), 100.0).is_some());
    }
}
