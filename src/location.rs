//! Location input for the visibility engine.
//!
//! The engine owns a [`LocationSource`] handle instead of reaching for a
//! process-wide location manager. Production code adapts the platform's
//! location service; tests replay synthetic sequences with
//! [`ScriptedLocations`].

use std::collections::VecDeque;

use crate::GeoPoint;

/// A single location fix.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "ffi", derive(uniffi::Record))]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LocationSample {
    pub point: GeoPoint,
    /// Unix timestamp (seconds)
    pub timestamp: i64,
}

impl LocationSample {
    pub fn new(latitude: f64, longitude: f64, timestamp: i64) -> Self {
        Self { point: GeoPoint::new(latitude, longitude), timestamp }
    }
}

/// Supplies the most recent location fix.
///
/// `None` means the location is unknown: not yet acquired at startup, or
/// permission was denied. Callers must tolerate it.
pub trait LocationSource {
    fn latest(&mut self) -> Option<LocationSample>;
}

impl<T: LocationSource + ?Sized> LocationSource for Box<T> {
    fn latest(&mut self) -> Option<LocationSample> {
        (**self).latest()
    }
}

/// Replays a fixed sequence of fixes, one per poll.
///
/// Entries may be `None` to simulate gaps. Once the script runs out the
/// last known fix keeps being reported, like a stationary device.
///
/// ```
/// use nearby_core::{LocationSample, LocationSource, ScriptedLocations};
///
/// let mut source = ScriptedLocations::new(vec![
///     None,
///     Some(LocationSample::new(37.7749, -122.4194, 100)),
/// ]);
/// assert_eq!(source.latest(), None);
/// assert_eq!(source.latest().unwrap().timestamp, 100);
/// assert_eq!(source.latest().unwrap().timestamp, 100);
/// ```
#[derive(Debug, Clone, Default)]
pub struct ScriptedLocations {
    pending: VecDeque<Option<LocationSample>>,
    last: Option<LocationSample>,
}

impl ScriptedLocations {
    pub fn new(samples: impl IntoIterator<Item = Option<LocationSample>>) -> Self {
        Self { pending: samples.into_iter().collect(), last: None }
    }

    /// Script of fixes with no gaps.
    pub fn from_samples(samples: impl IntoIterator<Item = LocationSample>) -> Self {
        Self::new(samples.into_iter().map(Some))
    }

    /// Append a fix to the end of the script.
    pub fn push(&mut self, sample: Option<LocationSample>) {
        self.pending.push_back(sample);
    }

    pub fn remaining(&self) -> usize {
        self.pending.len()
    }
}

impl LocationSource for ScriptedLocations {
    fn latest(&mut self) -> Option<LocationSample> {
        match self.pending.pop_front() {
            Some(Some(sample)) => {
                self.last = Some(sample);
                Some(sample)
            }
            Some(None) => None,
            None => self.last,
        }
    }
}
