//! # Visibility Engine
//!
//! Decides whether the local user is discoverable by others, enforcing the
//! geofence rule.
//!
//! ## State machine
//!
//! ```text
//!              request_visible (inside zone)
//!   Invisible ------------------------------> Visible
//!       ^                                        |
//!       |  set_invisible / left the zone          |
//!       +----------------------------------------+
//! ```
//!
//! `Invisible -> Visible` only happens through an explicit request while
//! inside the zone. `Visible -> Invisible` happens either on request or
//! autonomously when a location update lands outside the zone. The
//! autonomous transition fires once; further updates outside the zone are
//! no-ops because the user is already invisible.
//!
//! ## Example
//!
//! ```rust
//! use nearby_core::{
//!     GeoPoint, LocationSample, ProximityConfig, ScriptedLocations,
//!     VisibilityEngine, VisibilityZone,
//! };
//!
//! let zone = VisibilityZone::new(GeoPoint::new(37.7749, -122.4194), 100.0);
//! let mut engine = VisibilityEngine::new(
//!     &ProximityConfig::default(),
//!     zone,
//!     ScriptedLocations::default(),
//! );
//!
//! engine.on_location_update(LocationSample::new(37.7749, -122.4194, 0)).unwrap();
//! assert!(engine.request_visible_here().is_ok());
//! assert!(engine.state().enabled);
//!
//! // Walk ~1km away: the engine hides the profile on its own
//! let t = engine.on_location_update(LocationSample::new(37.7849, -122.4194, 30)).unwrap();
//! assert!(t.is_some());
//! assert!(!engine.state().enabled);
//! ```

use log::{debug, info, warn};

use crate::config::ProximityConfig;
use crate::error::{ProximityError, Result};
use crate::geo_utils::haversine_distance;
use crate::location::{LocationSample, LocationSource};
use crate::zone::{VisibilityZone, ZoneProvider};
use crate::GeoPoint;

/// Reason recorded when the engine hides the user because they left the zone.
pub const LEFT_ZONE_REASON: &str = "left visibility zone";

/// True iff `current` is within `radius_meters` of `reference` (inclusive).
///
/// Symmetric in argument order.
///
/// ```
/// use nearby_core::{evaluate_radius, GeoPoint};
///
/// let here = GeoPoint::new(37.7749, -122.4194);
/// let there = GeoPoint::new(37.7750, -122.4194); // ~11m north
/// assert!(evaluate_radius(&here, &there, 20.0));
/// assert!(!evaluate_radius(&here, &there, 5.0));
/// ```
#[inline]
pub fn evaluate_radius(current: &GeoPoint, reference: &GeoPoint, radius_meters: f64) -> bool {
    haversine_distance(current, reference) <= radius_meters
}

/// Visibility of the local user.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "ffi", derive(uniffi::Record))]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct VisibilityState {
    pub enabled: bool,
    /// Why the last change to invisible happened, if a reason was given
    pub reason: Option<String>,
}

/// What caused a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "ffi", derive(uniffi::Enum))]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum TransitionCause {
    /// `request_visible` or `set_invisible` from the caller
    UserRequest,
    /// Engine-initiated after a location update outside the zone
    LeftZone,
}

/// A change of visibility, handed to the presentation layer.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "ffi", derive(uniffi::Record))]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct VisibilityTransition {
    pub enabled: bool,
    pub reason: Option<String>,
    pub cause: TransitionCause,
    /// Timestamp of the location fix that caused it (autonomous transitions only)
    pub timestamp: Option<i64>,
}

/// Tracks and enforces the local user's visibility.
///
/// Owns its location source and zone provider; all state changes go through
/// the methods below.
#[derive(Debug)]
pub struct VisibilityEngine<S, Z = VisibilityZone> {
    source: S,
    zone: Z,
    state: VisibilityState,
    last_location: Option<LocationSample>,
    within_zone: bool,
    update_interval_seconds: i64,
    last_poll: Option<i64>,
}

impl<S: LocationSource, Z: ZoneProvider> VisibilityEngine<S, Z> {
    /// Create an engine that starts invisible with no known location.
    pub fn new(config: &ProximityConfig, zone: Z, source: S) -> Self {
        Self {
            source,
            zone,
            state: VisibilityState::default(),
            last_location: None,
            within_zone: false,
            update_interval_seconds: i64::from(config.update_interval_seconds),
            last_poll: None,
        }
    }

    pub fn state(&self) -> &VisibilityState {
        &self.state
    }

    pub fn is_visible(&self) -> bool {
        self.state.enabled
    }

    /// Result of the most recent zone evaluation. False until a valid fix
    /// has been seen.
    pub fn is_within_zone(&self) -> bool {
        self.within_zone
    }

    pub fn last_location(&self) -> Option<&LocationSample> {
        self.last_location.as_ref()
    }

    pub fn zone(&self) -> &Z {
        &self.zone
    }

    /// Mutable access to the zone provider. Call [`Self::reevaluate_zone`]
    /// after changing it.
    pub fn zone_mut(&mut self) -> &mut Z {
        &mut self.zone
    }

    pub fn source_mut(&mut self) -> &mut S {
        &mut self.source
    }

    /// Distance from the last known location to the current zone center.
    pub fn distance_to_zone(&self) -> Option<f64> {
        let zone = self.zone.current_zone()?;
        let location = self.last_location.as_ref()?;
        Some(zone.distance_to(&location.point))
    }

    /// Go visible. Fails with [`ProximityError::OutsideVisibilityZone`] and
    /// leaves state untouched if `currently_within_radius` is false.
    ///
    /// Returns `Ok(None)` if already visible.
    pub fn request_visible(
        &mut self,
        currently_within_radius: bool,
    ) -> Result<Option<VisibilityTransition>> {
        if !currently_within_radius {
            debug!("visibility request refused: outside zone");
            return Err(ProximityError::OutsideVisibilityZone {
                distance_meters: self.distance_to_zone(),
                radius_meters: self.zone.current_zone().map_or(0.0, |z| z.radius_meters),
            });
        }

        if self.state.enabled {
            return Ok(None);
        }

        self.state = VisibilityState { enabled: true, reason: None };
        info!("visibility enabled");
        Ok(Some(VisibilityTransition {
            enabled: true,
            reason: None,
            cause: TransitionCause::UserRequest,
            timestamp: None,
        }))
    }

    /// Go visible using the engine's own latest zone evaluation.
    pub fn request_visible_here(&mut self) -> Result<Option<VisibilityTransition>> {
        self.request_visible(self.within_zone)
    }

    /// Go invisible unconditionally and record `reason`.
    ///
    /// Returns a transition only if the user was visible.
    pub fn set_invisible(&mut self, reason: Option<String>) -> Option<VisibilityTransition> {
        let was_visible = self.state.enabled;
        self.state = VisibilityState { enabled: false, reason: reason.clone() };

        if !was_visible {
            return None;
        }
        info!("visibility disabled ({})", reason.as_deref().unwrap_or("no reason"));
        Some(VisibilityTransition {
            enabled: false,
            reason,
            cause: TransitionCause::UserRequest,
            timestamp: None,
        })
    }

    /// Feed a new fix. Invalid fixes are rejected with
    /// [`ProximityError::InvalidLocation`]; the previous location is kept and
    /// nothing transitions.
    pub fn on_location_update(
        &mut self,
        sample: LocationSample,
    ) -> Result<Option<VisibilityTransition>> {
        if !sample.point.is_valid() {
            warn!(
                "rejected location sample ({}, {})",
                sample.point.latitude, sample.point.longitude
            );
            return Err(ProximityError::InvalidLocation {
                latitude: sample.point.latitude,
                longitude: sample.point.longitude,
            });
        }

        self.last_location = Some(sample);
        Ok(self.apply_zone_rule())
    }

    /// Re-run the zone rule against the last known location, e.g. after the
    /// zone provider switched to a different place. No-op without a location.
    pub fn reevaluate_zone(&mut self) -> Option<VisibilityTransition> {
        if self.last_location.is_none() {
            return None;
        }
        self.apply_zone_rule()
    }

    /// Poll the location source if at least `update_interval_seconds` have
    /// passed since the previous poll (the first call always polls).
    ///
    /// An unknown location from the source is not an error: nothing changes.
    pub fn tick(&mut self, now: i64) -> Result<Option<VisibilityTransition>> {
        if let Some(last) = self.last_poll {
            if now.saturating_sub(last) < self.update_interval_seconds {
                return Ok(None);
            }
        }
        self.last_poll = Some(now);

        match self.source.latest() {
            Some(sample) => self.on_location_update(sample),
            None => {
                debug!("location unknown at t={}", now);
                Ok(None)
            }
        }
    }

    fn apply_zone_rule(&mut self) -> Option<VisibilityTransition> {
        let sample = self.last_location?;
        self.within_zone = self
            .zone
            .current_zone()
            .map_or(false, |zone| zone.contains(&sample.point));

        if !self.state.enabled || self.within_zone {
            return None;
        }

        self.state = VisibilityState {
            enabled: false,
            reason: Some(LEFT_ZONE_REASON.to_string()),
        };
        info!("visibility disabled: {} at t={}", LEFT_ZONE_REASON, sample.timestamp);
        Some(VisibilityTransition {
            enabled: false,
            reason: Some(LEFT_ZONE_REASON.to_string()),
            cause: TransitionCause::LeftZone,
            timestamp: Some(sample.timestamp),
        })
    }
}

impl<S: LocationSource> VisibilityEngine<S, VisibilityZone> {
    /// Engine with a fixed zone of `config.radius_meters` around `reference`.
    pub fn with_reference(config: &ProximityConfig, reference: GeoPoint, source: S) -> Self {
        Self::new(config, VisibilityZone::new(reference, config.radius_meters), source)
    }
}
