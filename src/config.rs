//! Configuration for the visibility engine, clustering and map viewport.

use crate::cluster::ClusterConfig;
use crate::error::{ProximityError, Result};

/// All recognized options of the core.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "ffi", derive(uniffi::Record))]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct ProximityConfig {
    /// Visibility geofence radius in meters.
    /// Default: 8046.72 (5 miles)
    pub radius_meters: f64,

    /// Zoom-dependent clustering parameters.
    pub cluster: ClusterConfig,

    /// Smallest allowed viewport span (most zoomed in), in degrees.
    /// Default: 0.0005
    pub min_zoom_span: f64,

    /// Largest allowed viewport span (most zoomed out), in degrees.
    /// Default: 0.003
    pub max_zoom_span: f64,

    /// Minimum seconds between location polls.
    /// Default: 30
    pub update_interval_seconds: u32,

    /// A user is "active" if seen within this many seconds.
    /// Default: 300 (5 minutes)
    pub active_window_seconds: u32,
}

impl Default for ProximityConfig {
    fn default() -> Self {
        Self {
            radius_meters: 8046.72,
            cluster: ClusterConfig::default(),
            min_zoom_span: 0.0005,
            max_zoom_span: 0.003,
            update_interval_seconds: 30,
            active_window_seconds: 300,
        }
    }
}

impl ProximityConfig {
    /// Check that every option is usable.
    ///
    /// ```
    /// use nearby_core::ProximityConfig;
    ///
    /// assert!(ProximityConfig::default().validate().is_ok());
    ///
    /// let bad = ProximityConfig { min_zoom_span: 0.01, ..Default::default() };
    /// assert!(bad.validate().is_err());
    /// ```
    pub fn validate(&self) -> Result<()> {
        positive("radius_meters", self.radius_meters)?;
        positive("min_zoom_span", self.min_zoom_span)?;
        positive("max_zoom_span", self.max_zoom_span)?;
        if self.min_zoom_span > self.max_zoom_span {
            return Err(invalid("min_zoom_span must not exceed max_zoom_span"));
        }
        if self.update_interval_seconds == 0 {
            return Err(invalid("update_interval_seconds must be at least 1"));
        }

        let c = &self.cluster;
        if !c.cluster_threshold.is_finite() || c.cluster_threshold < 0.0 {
            return Err(invalid("cluster_threshold must be a non-negative number"));
        }
        positive("scale_factor", c.scale_factor)?;
        positive("min_radius", c.min_radius)?;
        positive("max_radius", c.max_radius)?;
        if c.min_radius > c.max_radius {
            return Err(invalid("min_radius must not exceed max_radius"));
        }
        Ok(())
    }

    /// Parse a JSON config. Missing fields take their defaults.
    ///
    /// ```
    /// use nearby_core::ProximityConfig;
    ///
    /// let config = ProximityConfig::from_json(r#"{"radius_meters": 150.0}"#).unwrap();
    /// assert_eq!(config.radius_meters, 150.0);
    /// assert_eq!(config.update_interval_seconds, 30);
    /// ```
    #[cfg(feature = "serde")]
    pub fn from_json(json: &str) -> Result<Self> {
        let config: ProximityConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }
}

fn positive(name: &str, value: f64) -> Result<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(invalid(&format!("{} must be a positive number, got {}", name, value)))
    }
}

fn invalid(reason: &str) -> ProximityError {
    ProximityError::InvalidConfig { reason: reason.to_string() }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = ProximityConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.cluster.scale_factor, 30000.0);
        assert_eq!(config.cluster.min_radius, 25.0);
        assert_eq!(config.cluster.max_radius, 100.0);
    }

    #[test]
    fn test_rejects_inverted_radius_bounds() {
        let mut config = ProximityConfig::default();
        config.cluster.min_radius = 200.0;
        let err = config.validate().unwrap_err();
        assert!(matches!(err, ProximityError::InvalidConfig { .. }));
    }

    #[test]
    fn test_rejects_non_finite_radius() {
        let config = ProximityConfig { radius_meters: f64::NAN, ..Default::default() };
        assert!(config.validate().is_err());

        let config = ProximityConfig { radius_meters: -5.0, ..Default::default() };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_zero_update_interval() {
        let config = ProximityConfig { update_interval_seconds: 0, ..Default::default() };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_cluster_threshold_allowed() {
        let mut config = ProximityConfig::default();
        config.cluster.cluster_threshold = 0.0;
        assert!(config.validate().is_ok());
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_from_json_nested_cluster_section() {
        let json = r#"{
            "radius_meters": 100.0,
            "cluster": { "cluster_threshold": 0.002, "max_radius": 80.0 }
        }"#;
        let config = ProximityConfig::from_json(json).unwrap();
        assert_eq!(config.radius_meters, 100.0);
        assert_eq!(config.cluster.cluster_threshold, 0.002);
        assert_eq!(config.cluster.max_radius, 80.0);
        assert_eq!(config.cluster.min_radius, 25.0);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_from_json_rejects_invalid_values() {
        let err = ProximityConfig::from_json(r#"{"min_zoom_span": 1.0}"#).unwrap_err();
        assert!(err.to_string().contains("min_zoom_span"));

        assert!(ProximityConfig::from_json("not json").is_err());
    }
}
