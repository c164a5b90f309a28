//! # Nearby Core
//!
//! Proximity-gated visibility and zoom-adaptive map clustering for a
//! location-based discovery app.
//!
//! This library provides:
//! - A visibility state machine: a user can only become discoverable while
//!   inside a visibility zone, and is hidden automatically on leaving it
//! - Greedy, seed-based clustering of nearby visible users whose merge
//!   radius follows the map zoom
//! - Viewport zoom handling and a per-user presence registry that feeds
//!   the clustering pass
//!
//! ## Features
//!
//! - **`parallel`** - Enable parallel cluster computation with rayon
//! - **`serde`** - Serde derives and JSON config loading
//! - **`ffi`** - Enable FFI bindings for mobile platforms (iOS/Android)
//! - **`full`** - Enable all features
//!
//! ## Quick Start
//!
//! ```rust
//! use nearby_core::{
//!     ClusterEngine, GeoPoint, LocationSample, PresenceRegistry, ProximityConfig,
//!     ScriptedLocations, UserPosition, VisibilityEngine, ViewportState,
//! };
//!
//! let config = ProximityConfig { radius_meters: 200.0, ..Default::default() };
//! let venue = GeoPoint::new(37.7749, -122.4194);
//!
//! // The local user walks into the venue and turns visibility on
//! let mut me = VisibilityEngine::with_reference(&config, venue, ScriptedLocations::default());
//! me.on_location_update(LocationSample::new(37.7750, -122.4194, 1_000)).unwrap();
//! me.request_visible_here().unwrap();
//!
//! // Everyone's presence, including ours
//! let mut registry = PresenceRegistry::new(config.active_window_seconds);
//! registry.upsert(UserPosition::visible("me", GeoPoint::new(37.7750, -122.4194), 1_000));
//! registry.upsert(UserPosition::visible("sam", GeoPoint::new(37.77502, -122.4194), 990));
//! registry.upsert(UserPosition::visible("riley", GeoPoint::new(37.7760, -122.4194), 980));
//!
//! // Cluster for the current map zoom
//! let viewport = ViewportState::from_config(venue, 0.003, &config);
//! let clusters = ClusterEngine::new(config.cluster.clone())
//!     .compute(&registry.snapshot(1_000), viewport.span);
//!
//! assert_eq!(clusters.len(), 2);
//! assert_eq!(clusters[0].member_ids(), vec!["me", "sam"]);
//! ```

pub mod cluster;
pub mod config;
pub mod error;
pub mod geo_utils;
pub mod location;
pub mod registry;
pub mod viewport;
pub mod visibility;
pub mod zone;

pub use cluster::{merge_radius, cluster_users, Cluster, ClusterConfig, ClusterEngine};
#[cfg(feature = "parallel")]
pub use cluster::cluster_users_parallel;
pub use config::ProximityConfig;
pub use error::{ProximityError, Result};
pub use location::{LocationSample, LocationSource, ScriptedLocations};
pub use registry::PresenceRegistry;
pub use viewport::{ClusterFocus, ViewportState, ZoomBand};
pub use visibility::{
    evaluate_radius, TransitionCause, VisibilityEngine, VisibilityState, VisibilityTransition,
    LEFT_ZONE_REASON,
};
pub use zone::{VisibilityZone, ZoneProvider};

#[cfg(feature = "ffi")]
uniffi::setup_scaffolding!();

/// Initialize logging for Android (only used in FFI)
#[cfg(all(feature = "ffi", target_os = "android"))]
fn init_logging() {
    use android_logger::Config;
    use log::LevelFilter;

    android_logger::init_once(
        Config::default()
            .with_max_level(LevelFilter::Debug)
            .with_tag("NearbyCoreRust")
    );
}

#[cfg(all(feature = "ffi", not(target_os = "android")))]
fn init_logging() {
    // No-op on non-Android platforms
}

// ============================================================================
// Core Types
// ============================================================================

/// A WGS84 coordinate in degrees.
///
/// # Example
/// ```
/// use nearby_core::GeoPoint;
/// let point = GeoPoint::new(37.7749, -122.4194); // San Francisco
/// assert!(point.is_valid());
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "ffi", derive(uniffi::Record))]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GeoPoint {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self { latitude, longitude }
    }

    /// Finite and within latitude/longitude range.
    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && self.latitude >= -90.0
            && self.latitude <= 90.0
            && self.longitude >= -180.0
            && self.longitude <= 180.0
    }
}

/// Latitude/longitude bounding box.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "ffi", derive(uniffi::Record))]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Bounds {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lng: f64,
    pub max_lng: f64,
}

impl Bounds {
    /// Edges inclusive.
    pub fn contains(&self, point: &GeoPoint) -> bool {
        point.latitude >= self.min_lat
            && point.latitude <= self.max_lat
            && point.longitude >= self.min_lng
            && point.longitude <= self.max_lng
    }
}

/// A user as seen by the map: identity, optional location, visibility flag
/// and last activity.
///
/// A user without a location is never clustered, whatever `is_visible` says.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "ffi", derive(uniffi::Record))]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct UserPosition {
    /// Opaque unique identifier
    pub user_id: String,
    /// `None` until a fix is known, or when location permission is denied
    pub location: Option<GeoPoint>,
    pub is_visible: bool,
    /// Unix timestamp (seconds) of the last location tick or visibility change
    pub last_active: i64,
}

impl UserPosition {
    pub fn new(user_id: &str, location: Option<GeoPoint>, is_visible: bool, last_active: i64) -> Self {
        Self {
            user_id: user_id.to_string(),
            location,
            is_visible,
            last_active,
        }
    }

    /// A visible user at `location`.
    pub fn visible(user_id: &str, location: GeoPoint, last_active: i64) -> Self {
        Self::new(user_id, Some(location), true, last_active)
    }

    /// The location to cluster at, if this user may appear on the map at all.
    pub fn clusterable_location(&self) -> Option<GeoPoint> {
        if !self.is_visible {
            return None;
        }
        self.location.filter(GeoPoint::is_valid)
    }

    /// Seen less than `window_seconds` before `now`.
    pub fn is_active(&self, now: i64, window_seconds: u32) -> bool {
        now.saturating_sub(self.last_active) < i64::from(window_seconds)
    }
}

// ============================================================================
// FFI Exports (only when feature enabled)
// ============================================================================

#[cfg(feature = "ffi")]
mod ffi {
    use super::*;
    use log::{debug, info};
    use std::sync::{Arc, Mutex, MutexGuard};

    /// Crowd size from which clustering runs on the rayon pool.
    const PARALLEL_MIN_USERS: usize = 2_000;

    type FfiResult<T> = std::result::Result<T, ProximityError>;

    /// Platform location service, implemented in Kotlin/Swift.
    #[uniffi::export(callback_interface)]
    pub trait LocationProvider: Send + Sync {
        /// Latest fix, or `None` while unknown or permission is denied.
        fn latest_location(&self) -> Option<LocationSample>;
    }

    struct ForeignLocationSource(Box<dyn LocationProvider>);

    impl LocationSource for ForeignLocationSource {
        fn latest(&mut self) -> Option<LocationSample> {
            self.0.latest_location()
        }
    }

    /// Visibility engine handle for the mobile app.
    #[derive(uniffi::Object)]
    pub struct VisibilitySession {
        engine: Mutex<VisibilityEngine<ForeignLocationSource>>,
    }

    impl VisibilitySession {
        fn engine(&self) -> MutexGuard<'_, VisibilityEngine<ForeignLocationSource>> {
            // Engine state stays consistent even if a caller panicked mid-call
            self.engine.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
        }
    }

    #[uniffi::export]
    impl VisibilitySession {
        #[uniffi::constructor]
        pub fn new(
            config: ProximityConfig,
            zone: VisibilityZone,
            provider: Box<dyn LocationProvider>,
        ) -> FfiResult<Arc<Self>> {
            init_logging();
            config.validate()?;
            info!(
                "[NearbyCoreRust] session created: zone ({:.5}, {:.5}) r={:.0}m",
                zone.center.latitude, zone.center.longitude, zone.radius_meters
            );
            let engine = VisibilityEngine::new(&config, zone, ForeignLocationSource(provider));
            Ok(Arc::new(Self { engine: Mutex::new(engine) }))
        }

        pub fn state(&self) -> VisibilityState {
            self.engine().state().clone()
        }

        pub fn is_within_zone(&self) -> bool {
            self.engine().is_within_zone()
        }

        pub fn request_visible(&self, currently_within_radius: bool) -> FfiResult<Option<VisibilityTransition>> {
            self.engine().request_visible(currently_within_radius)
        }

        pub fn request_visible_here(&self) -> FfiResult<Option<VisibilityTransition>> {
            self.engine().request_visible_here()
        }

        pub fn set_invisible(&self, reason: Option<String>) -> Option<VisibilityTransition> {
            self.engine().set_invisible(reason)
        }

        pub fn on_location_update(&self, sample: LocationSample) -> FfiResult<Option<VisibilityTransition>> {
            self.engine().on_location_update(sample)
        }

        /// Call from the app's timer; polls the provider at the configured interval.
        pub fn tick(&self, now: i64) -> FfiResult<Option<VisibilityTransition>> {
            self.engine().tick(now)
        }

        /// Switch to a different reference place and re-check the last fix.
        pub fn set_zone(&self, zone: VisibilityZone) -> Option<VisibilityTransition> {
            let mut engine = self.engine();
            *engine.zone_mut() = zone;
            engine.reevaluate_zone()
        }
    }

    /// Viewport plus what a cluster tap did to it.
    #[derive(Debug, Clone, uniffi::Record)]
    pub struct FocusResult {
        pub viewport: ViewportState,
        pub focus: ClusterFocus,
    }

    /// Get default configuration.
    #[uniffi::export]
    pub fn default_proximity_config() -> ProximityConfig {
        init_logging();
        ProximityConfig::default()
    }

    #[uniffi::export]
    pub fn evaluate_radius_meters(current: GeoPoint, reference: GeoPoint, radius_meters: f64) -> bool {
        evaluate_radius(&current, &reference, radius_meters)
    }

    #[uniffi::export]
    pub fn cluster_merge_radius(zoom_span: f64, config: ClusterConfig) -> f64 {
        merge_radius(zoom_span, &config)
    }

    /// Cluster users for the current map zoom.
    #[uniffi::export]
    pub fn cluster_nearby_users(users: Vec<UserPosition>, zoom_span: f64, config: ClusterConfig) -> Vec<Cluster> {
        init_logging();
        let start = std::time::Instant::now();

        let clusters = if users.len() >= PARALLEL_MIN_USERS {
            debug!("[NearbyCoreRust] using parallel clustering for {} users", users.len());
            cluster_users_parallel(&users, zoom_span, &config)
        } else {
            cluster_users(&users, zoom_span, &config)
        };

        debug!(
            "[NearbyCoreRust] {} users -> {} clusters in {:?}",
            users.len(),
            clusters.len(),
            start.elapsed()
        );
        clusters
    }

    #[uniffi::export]
    pub fn viewport_zoom_in(viewport: ViewportState) -> ViewportState {
        let mut viewport = viewport;
        viewport.zoom_in();
        viewport
    }

    #[uniffi::export]
    pub fn viewport_zoom_out(viewport: ViewportState) -> ViewportState {
        let mut viewport = viewport;
        viewport.zoom_out();
        viewport
    }

    #[uniffi::export]
    pub fn viewport_magnify(viewport: ViewportState, scale: f64) -> ViewportState {
        let mut viewport = viewport;
        viewport.magnify(scale);
        viewport
    }

    #[uniffi::export]
    pub fn viewport_zoom_band(viewport: ViewportState) -> ZoomBand {
        viewport.zoom_band()
    }

    #[uniffi::export]
    pub fn viewport_focus_cluster(viewport: ViewportState, cluster: Cluster) -> FocusResult {
        let mut viewport = viewport;
        let focus = viewport.focus_cluster(&cluster);
        FocusResult { viewport, focus }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gps_point_validation() {
        assert!(GeoPoint::new(37.7749, -122.4194).is_valid());
        assert!(!GeoPoint::new(91.0, 0.0).is_valid());
        assert!(!GeoPoint::new(0.0, 181.0).is_valid());
        assert!(!GeoPoint::new(f64::NAN, 0.0).is_valid());
        assert!(!GeoPoint::new(0.0, f64::INFINITY).is_valid());
    }

    #[test]
    fn test_clusterable_location() {
        let p = GeoPoint::new(37.7749, -122.4194);
        assert_eq!(UserPosition::visible("a", p, 0).clusterable_location(), Some(p));
        assert_eq!(UserPosition::new("b", Some(p), false, 0).clusterable_location(), None);
        assert_eq!(UserPosition::new("c", None, true, 0).clusterable_location(), None);
        assert_eq!(
            UserPosition::visible("d", GeoPoint::new(0.0, 200.0), 0).clusterable_location(),
            None
        );
    }

    #[test]
    fn test_is_active_window() {
        let user = UserPosition::visible("a", GeoPoint::new(0.0, 0.0), 1_000);
        assert!(user.is_active(1_000, 300));
        assert!(user.is_active(1_299, 300));
        assert!(!user.is_active(1_300, 300));
    }

    #[test]
    fn test_is_active_extreme_timestamps() {
        let ancient = UserPosition::visible("a", GeoPoint::new(0.0, 0.0), i64::MIN);
        assert!(!ancient.is_active(1_000, 300));
        assert!(!ancient.is_active(i64::MAX, 300));

        let future = UserPosition::visible("b", GeoPoint::new(0.0, 0.0), i64::MAX);
        assert!(future.is_active(i64::MIN, 300));
    }

    #[test]
    fn test_bounds_contains() {
        let b = Bounds { min_lat: 1.0, max_lat: 2.0, min_lng: 3.0, max_lng: 4.0 };
        assert!(b.contains(&GeoPoint::new(1.0, 4.0)));
        assert!(!b.contains(&GeoPoint::new(0.9, 3.5)));
    }
}
