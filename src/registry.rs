//! Per-user presence store feeding the clustering pass.
//!
//! Each mutation touches exactly one user's record, so a host serving many
//! clients can route every user's own update stream to it (one writer per
//! user) and hand [`PresenceRegistry::snapshot`] results to
//! [`crate::ClusterEngine`] as read-only input.

use std::collections::HashMap;

use log::debug;

use crate::config::ProximityConfig;
use crate::visibility::VisibilityTransition;
use crate::{GeoPoint, UserPosition};

#[derive(Debug, Clone)]
pub struct PresenceRegistry {
    users: HashMap<String, UserPosition>,
    active_window_seconds: u32,
}

impl Default for PresenceRegistry {
    fn default() -> Self {
        Self::from_config(&ProximityConfig::default())
    }
}

impl PresenceRegistry {
    pub fn new(active_window_seconds: u32) -> Self {
        Self { users: HashMap::new(), active_window_seconds }
    }

    pub fn from_config(config: &ProximityConfig) -> Self {
        Self::new(config.active_window_seconds)
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }

    pub fn get(&self, user_id: &str) -> Option<&UserPosition> {
        self.users.get(user_id)
    }

    /// Insert or replace a user's record.
    pub fn upsert(&mut self, user: UserPosition) {
        self.users.insert(user.user_id.clone(), user);
    }

    pub fn remove(&mut self, user_id: &str) -> Option<UserPosition> {
        self.users.remove(user_id)
    }

    /// Record a location tick. Unknown users are created invisible.
    /// Invalid coordinates are stored as "no location".
    pub fn update_location(&mut self, user_id: &str, location: Option<GeoPoint>, timestamp: i64) {
        let location = location.filter(GeoPoint::is_valid);
        let user = self.entry(user_id, timestamp);
        user.location = location;
        user.last_active = user.last_active.max(timestamp);
    }

    /// Set a user's visibility flag. Returns false for unknown users.
    pub fn set_visible(&mut self, user_id: &str, visible: bool, timestamp: i64) -> bool {
        match self.users.get_mut(user_id) {
            Some(user) => {
                user.is_visible = visible;
                user.last_active = user.last_active.max(timestamp);
                true
            }
            None => false,
        }
    }

    /// Mirror a visibility engine transition onto the user's record.
    pub fn apply_transition(&mut self, user_id: &str, transition: &VisibilityTransition) -> bool {
        let timestamp = transition
            .timestamp
            .or_else(|| self.users.get(user_id).map(|u| u.last_active))
            .unwrap_or_default();
        self.set_visible(user_id, transition.enabled, timestamp)
    }

    /// Number of users flagged visible, located or not.
    pub fn visible_count(&self) -> usize {
        self.users.values().filter(|u| u.is_visible).count()
    }

    /// Visible, located users active within the window at `now`, ordered by id.
    pub fn snapshot(&self, now: i64) -> Vec<UserPosition> {
        let mut users: Vec<UserPosition> = self
            .users
            .values()
            .filter(|u| u.clusterable_location().is_some())
            .filter(|u| u.is_active(now, self.active_window_seconds))
            .cloned()
            .collect();
        users.sort_by(|a, b| a.user_id.cmp(&b.user_id));
        debug!("snapshot at t={}: {} of {} users", now, users.len(), self.users.len());
        users
    }

    fn entry(&mut self, user_id: &str, timestamp: i64) -> &mut UserPosition {
        self.users
            .entry(user_id.to_string())
            .or_insert_with(|| UserPosition::new(user_id, None, false, timestamp))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::visibility::TransitionCause;

    fn point() -> GeoPoint {
        GeoPoint::new(37.7749, -122.4194)
    }

    #[test]
    fn test_snapshot_filters_and_sorts() {
        let mut registry = PresenceRegistry::default();
        registry.upsert(UserPosition::visible("casey", point(), 1000));
        registry.upsert(UserPosition::visible("alex", point(), 1000));
        registry.upsert(UserPosition::new("hidden", Some(point()), false, 1000));
        registry.upsert(UserPosition::new("lost", None, true, 1000));
        registry.upsert(UserPosition::visible("stale", point(), 600));

        let snapshot = registry.snapshot(1000);
        let ids: Vec<&str> = snapshot.iter().map(|u| u.user_id.as_str()).collect();
        assert_eq!(ids, vec!["alex", "casey"]);
        assert_eq!(registry.visible_count(), 4);
    }

    #[test]
    fn test_update_location_creates_invisible_user() {
        let mut registry = PresenceRegistry::default();
        registry.update_location("new", Some(point()), 50);

        let user = registry.get("new").unwrap();
        assert!(!user.is_visible);
        assert_eq!(user.location, Some(point()));
        assert_eq!(user.last_active, 50);
        assert!(registry.snapshot(50).is_empty());

        assert!(registry.set_visible("new", true, 60));
        assert_eq!(registry.snapshot(60).len(), 1);
    }

    #[test]
    fn test_invalid_location_stored_as_absent() {
        let mut registry = PresenceRegistry::default();
        registry.upsert(UserPosition::visible("a", point(), 0));
        registry.update_location("a", Some(GeoPoint::new(200.0, 0.0)), 10);
        assert_eq!(registry.get("a").unwrap().location, None);
        assert!(registry.snapshot(10).is_empty());
    }

    #[test]
    fn test_apply_left_zone_transition() {
        let mut registry = PresenceRegistry::default();
        registry.upsert(UserPosition::visible("me", point(), 0));

        let transition = VisibilityTransition {
            enabled: false,
            reason: Some("left visibility zone".into()),
            cause: TransitionCause::LeftZone,
            timestamp: Some(90),
        };
        assert!(registry.apply_transition("me", &transition));
        let me = registry.get("me").unwrap();
        assert!(!me.is_visible);
        assert_eq!(me.last_active, 90);

        assert!(!registry.apply_transition("nobody", &transition));
    }

    #[test]
    fn test_set_visible_unknown_user() {
        let mut registry = PresenceRegistry::new(60);
        assert!(!registry.set_visible("ghost", true, 0));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_default_window_follows_config() {
        let config = ProximityConfig::default();
        let mut registry = PresenceRegistry::default();
        registry.upsert(UserPosition::visible("a", point(), 0));

        let window = i64::from(config.active_window_seconds);
        assert_eq!(registry.snapshot(window - 1).len(), 1);
        assert!(registry.snapshot(window).is_empty());
    }

    #[test]
    fn test_remove() {
        let mut registry = PresenceRegistry::default();
        registry.upsert(UserPosition::visible("a", point(), 0));
        assert_eq!(registry.len(), 1);
        assert!(registry.remove("a").is_some());
        assert!(registry.remove("a").is_none());
    }
}
