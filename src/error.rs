//! Error types for visibility and configuration operations.
//!
//! Clustering never fails, so nothing here is produced by [`crate::ClusterEngine`].

use thiserror::Error;

/// Result type for fallible core operations.
pub type Result<T> = std::result::Result<T, ProximityError>;

/// Errors surfaced by the core. None of them are fatal: each describes an
/// expected steady-state condition of a location-based app.
#[derive(Debug, Clone, PartialEq, Error)]
#[cfg_attr(feature = "ffi", derive(uniffi::Error))]
pub enum ProximityError {
    /// Visibility was requested while outside the visibility zone.
    /// `distance_meters` is `None` when no location or zone is known.
    #[error("outside visibility zone (radius {radius_meters:.0}m)")]
    OutsideVisibilityZone {
        distance_meters: Option<f64>,
        radius_meters: f64,
    },

    /// A location sample with non-finite or out-of-range coordinates.
    #[error("invalid location: ({latitude}, {longitude})")]
    InvalidLocation { latitude: f64, longitude: f64 },

    /// Configuration failed validation or could not be parsed.
    #[error("invalid config: {reason}")]
    InvalidConfig { reason: String },
}

#[cfg(feature = "serde")]
impl From<serde_json::Error> for ProximityError {
    fn from(e: serde_json::Error) -> Self {
        ProximityError::InvalidConfig { reason: e.to_string() }
    }
}
