//! Map viewport state: center plus a zoom span clamped to configured bounds.
//!
//! The span is the latitude/longitude delta of the visible region in
//! degrees; smaller means more zoomed in. It is the value fed to
//! [`crate::ClusterEngine::compute`].

use crate::cluster::Cluster;
use crate::config::ProximityConfig;
use crate::{Bounds, GeoPoint};

/// Span multiplier for one zoom-in step.
const ZOOM_IN_FACTOR: f64 = 0.6;
/// Span multiplier for one zoom-out step.
const ZOOM_OUT_FACTOR: f64 = 1.6;
/// Span multiplier when tapping into a cluster to break it up.
const FOCUS_FACTOR: f64 = 0.4;
/// Above this span, tapping a cluster zooms in; at or below it, shows details.
const FOCUS_ZOOM_SPAN: f64 = 0.0008;

/// Coarse label for the current zoom.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "ffi", derive(uniffi::Enum))]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ZoomBand {
    MaxZoom,
    Close,
    Medium,
    Far,
}

/// What happened when a cluster was tapped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "ffi", derive(uniffi::Enum))]
pub enum ClusterFocus {
    /// The viewport moved onto the cluster and zoomed in.
    Zoomed,
    /// Already close enough; the host should list the members instead.
    ShowDetail,
}

#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "ffi", derive(uniffi::Record))]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ViewportState {
    pub center: GeoPoint,
    pub span: f64,
    pub min_span: f64,
    pub max_span: f64,
}

impl ViewportState {
    /// Create a viewport, clamping `span` into `[min_span, max_span]`.
    pub fn new(center: GeoPoint, span: f64, min_span: f64, max_span: f64) -> Self {
        let mut viewport = Self { center, span: min_span, min_span, max_span };
        viewport.set_span(span);
        viewport
    }

    pub fn from_config(center: GeoPoint, span: f64, config: &ProximityConfig) -> Self {
        Self::new(center, span, config.min_zoom_span, config.max_zoom_span)
    }

    /// Set the span, clamped. Non-finite input leaves the span unchanged.
    pub fn set_span(&mut self, span: f64) {
        if span.is_finite() {
            self.span = span.max(self.min_span).min(self.max_span);
        }
    }

    pub fn zoom_in(&mut self) {
        self.set_span(self.span * ZOOM_IN_FACTOR);
    }

    pub fn zoom_out(&mut self) {
        self.set_span(self.span * ZOOM_OUT_FACTOR);
    }

    /// Apply a pinch gesture: `scale > 1` zooms in.
    pub fn magnify(&mut self, scale: f64) {
        if scale > 0.0 {
            self.set_span(self.span / scale);
        }
    }

    pub fn recenter(&mut self, center: GeoPoint) {
        if center.is_valid() {
            self.center = center;
        }
    }

    pub fn can_zoom_in(&self) -> bool {
        self.span > self.min_span
    }

    pub fn can_zoom_out(&self) -> bool {
        self.span < self.max_span
    }

    pub fn zoom_band(&self) -> ZoomBand {
        if self.span <= 0.0007 {
            ZoomBand::MaxZoom
        } else if self.span <= 0.001 {
            ZoomBand::Close
        } else if self.span <= 0.002 {
            ZoomBand::Medium
        } else {
            ZoomBand::Far
        }
    }

    /// React to a tap on `cluster`: zoom in on its centroid while still
    /// zoomed out, otherwise ask the host to show the member list.
    pub fn focus_cluster(&mut self, cluster: &Cluster) -> ClusterFocus {
        if self.span > FOCUS_ZOOM_SPAN {
            self.recenter(cluster.centroid);
            self.set_span(self.span * FOCUS_FACTOR);
            ClusterFocus::Zoomed
        } else {
            ClusterFocus::ShowDetail
        }
    }

    /// The visible region.
    pub fn bounds(&self) -> Bounds {
        let half = self.span / 2.0;
        Bounds {
            min_lat: self.center.latitude - half,
            max_lat: self.center.latitude + half,
            min_lng: self.center.longitude - half,
            max_lng: self.center.longitude + half,
        }
    }

    pub fn contains(&self, point: &GeoPoint) -> bool {
        self.bounds().contains(point)
    }
}
