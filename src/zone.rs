//! The reference "visibility zone" a user must be inside to go visible.
//!
//! Which place counts as the zone is up to the host app (a recognized
//! venue, a saved favourite place, ...). The engine only asks a
//! [`ZoneProvider`] for the current center and radius.

use crate::geo_utils::haversine_distance;
use crate::GeoPoint;

/// A geofence: center coordinate plus radius in meters.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "ffi", derive(uniffi::Record))]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct VisibilityZone {
    pub center: GeoPoint,
    pub radius_meters: f64,
}

impl VisibilityZone {
    pub fn new(center: GeoPoint, radius_meters: f64) -> Self {
        Self { center, radius_meters }
    }

    /// Distance in meters from the zone center.
    pub fn distance_to(&self, point: &GeoPoint) -> f64 {
        haversine_distance(point, &self.center)
    }

    /// Boundary inclusive.
    pub fn contains(&self, point: &GeoPoint) -> bool {
        self.distance_to(point) <= self.radius_meters
    }
}

/// Supplies the zone currently in effect.
///
/// `None` means there is no recognized place right now, so no location
/// counts as inside.
pub trait ZoneProvider {
    fn current_zone(&self) -> Option<VisibilityZone>;
}

impl ZoneProvider for VisibilityZone {
    fn current_zone(&self) -> Option<VisibilityZone> {
        Some(*self)
    }
}

impl ZoneProvider for Option<VisibilityZone> {
    fn current_zone(&self) -> Option<VisibilityZone> {
        *self
    }
}

impl<T: ZoneProvider + ?Sized> ZoneProvider for Box<T> {
    fn current_zone(&self) -> Option<VisibilityZone> {
        (**self).current_zone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zone_contains_center() {
        let zone = VisibilityZone::new(GeoPoint::new(37.7749, -122.4194), 50.0);
        assert!(zone.contains(&zone.center));
        assert_eq!(zone.distance_to(&zone.center), 0.0);
    }

    #[test]
    fn test_zone_excludes_far_point() {
        let zone = VisibilityZone::new(GeoPoint::new(37.7749, -122.4194), 50.0);
        // ~1.1km north
        assert!(!zone.contains(&GeoPoint::new(37.7849, -122.4194)));
    }

    #[test]
    fn test_optional_zone_provider() {
        let none: Option<VisibilityZone> = None;
        assert!(none.current_zone().is_none());

        let zone = VisibilityZone::new(GeoPoint::new(0.0, 0.0), 10.0);
        assert_eq!(Some(zone).current_zone(), Some(zone));
        assert_eq!(zone.current_zone(), Some(zone));
    }
}
