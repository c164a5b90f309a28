//! # Zoom-Adaptive User Clustering
//!
//! Groups visible, located users into map clusters whose granularity follows
//! the viewport zoom span.
//!
//! ## Algorithm
//!
//! 1. Drop users that are not visible or have no (valid) location, and
//!    de-duplicate by id. Order the rest by id.
//! 2. If `zoom_span <= cluster_threshold`, every user is its own cluster.
//! 3. Otherwise the merge radius is `zoom_span * scale_factor`, clamped to
//!    `[min_radius, max_radius]` meters.
//! 4. Single greedy pass: the first unprocessed user seeds a cluster and
//!    absorbs every unprocessed user strictly closer than the merge radius
//!    **to the seed**. Membership is not transitive: a user near an absorbed
//!    member but not near the seed starts or joins another cluster. With
//!    overlapping radii the outcome therefore depends on the id order, which
//!    is fixed, so results are deterministic.
//! 5. A cluster's centroid is the arithmetic mean of member coordinates.
//!
//! Seed neighbourhoods are looked up through an R-tree with a padded
//! envelope and then confirmed with the exact haversine distance, so the
//! output is identical to a full pairwise scan.
//!
//! ## Example
//!
//! ```rust
//! use nearby_core::{ClusterConfig, ClusterEngine, GeoPoint, UserPosition};
//!
//! let users = vec![
//!     UserPosition::visible("alex", GeoPoint::new(37.77490, -122.4194), 0),
//!     UserPosition::visible("sam", GeoPoint::new(37.77495, -122.4194), 0),  // ~5.6m away
//!     UserPosition::visible("jordan", GeoPoint::new(37.77600, -122.4194), 0), // ~120m away
//! ];
//!
//! let engine = ClusterEngine::new(ClusterConfig::default());
//!
//! // Zoomed out: nearby users collapse into one marker
//! let clusters = engine.compute(&users, 0.003);
//! assert_eq!(clusters.len(), 2);
//!
//! // Zoomed in: everyone is shown individually
//! let clusters = engine.compute(&users, 0.001);
//! assert_eq!(clusters.len(), 3);
//! ```

use log::debug;
use rstar::primitives::GeomWithData;
use rstar::{RTree, AABB};

use crate::geo_utils::{cap_half_widths, compute_center, haversine_distance};
use crate::{GeoPoint, UserPosition};

/// Envelope padding over the merge radius for the R-tree lookup.
const ENVELOPE_PADDING: f64 = 1.01;

/// Configuration for zoom-dependent clustering.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "ffi", derive(uniffi::Record))]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct ClusterConfig {
    /// Zoom span (degrees) above which clustering activates.
    /// Default: 0.0015
    pub cluster_threshold: f64,

    /// Meters of merge radius per degree of zoom span.
    /// Default: 30000.0
    pub scale_factor: f64,

    /// Lower bound of the merge radius in meters.
    /// Default: 25.0
    pub min_radius: f64,

    /// Upper bound of the merge radius in meters. Keeps separate venues
    /// from fusing when zoomed far out.
    /// Default: 100.0
    pub max_radius: f64,
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            cluster_threshold: 0.0015,
            scale_factor: 30_000.0,
            min_radius: 25.0,
            max_radius: 100.0,
        }
    }
}

/// A map marker grouping one or more users.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "ffi", derive(uniffi::Record))]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Cluster {
    /// The seed's user id, which is the smallest id among the members.
    /// Stable across recomputation as long as membership is.
    pub id: String,
    /// Members in ascending id order, seed first. Never empty.
    pub members: Vec<UserPosition>,
    /// Mean of member coordinates
    pub centroid: GeoPoint,
}

impl Cluster {
    fn from_members(members: Vec<(UserPosition, GeoPoint)>) -> Self {
        let points: Vec<GeoPoint> = members.iter().map(|(_, p)| *p).collect();
        let members: Vec<UserPosition> = members.into_iter().map(|(u, _)| u).collect();
        Self {
            id: members.first().map(|u| u.user_id.clone()).unwrap_or_default(),
            centroid: compute_center(&points),
            members,
        }
    }

    /// Marker badge count. Always at least 1.
    pub fn member_count(&self) -> usize {
        self.members.len()
    }

    pub fn is_singleton(&self) -> bool {
        self.members.len() == 1
    }

    pub fn member_ids(&self) -> Vec<&str> {
        self.members.iter().map(|u| u.user_id.as_str()).collect()
    }

    pub fn contains(&self, user_id: &str) -> bool {
        self.members.iter().any(|u| u.user_id == user_id)
    }
}

/// Merge radius in meters for a zoom span, clamped to the configured bounds.
///
/// ```
/// use nearby_core::{merge_radius, ClusterConfig};
///
/// let config = ClusterConfig::default();
/// assert_eq!(merge_radius(0.0001, &config), 25.0);
/// assert!((merge_radius(0.002, &config) - 60.0).abs() < 1e-9);
/// assert_eq!(merge_radius(0.01, &config), 100.0);
/// ```
#[inline]
pub fn merge_radius(zoom_span: f64, config: &ClusterConfig) -> f64 {
    (zoom_span * config.scale_factor)
        .max(config.min_radius)
        .min(config.max_radius)
}

/// Stateless clustering over a snapshot of users.
#[derive(Debug, Clone, Default)]
pub struct ClusterEngine {
    config: ClusterConfig,
}

impl ClusterEngine {
    pub fn new(config: ClusterConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ClusterConfig {
        &self.config
    }

    /// Whether users are merged at this zoom span. A NaN span never clusters.
    pub fn is_clustering(&self, zoom_span: f64) -> bool {
        clustering_enabled(zoom_span, &self.config)
    }

    pub fn merge_radius(&self, zoom_span: f64) -> f64 {
        merge_radius(zoom_span, &self.config)
    }

    /// Partition `users` into clusters for `zoom_span`.
    ///
    /// Never fails: users without a usable location or not visible are
    /// skipped silently. Clusters are returned in seed order (ascending id).
    pub fn compute(&self, users: &[UserPosition], zoom_span: f64) -> Vec<Cluster> {
        cluster_users(users, zoom_span, &self.config)
    }

    /// Same result as [`Self::compute`], scanning each seed's neighbourhood
    /// with rayon. Worth it for crowds in the thousands.
    #[cfg(feature = "parallel")]
    pub fn compute_parallel(&self, users: &[UserPosition], zoom_span: f64) -> Vec<Cluster> {
        cluster_users_parallel(users, zoom_span, &self.config)
    }
}

/// Cluster users for a zoom span. See the module docs for the algorithm.
pub fn cluster_users(users: &[UserPosition], zoom_span: f64, config: &ClusterConfig) -> Vec<Cluster> {
    let candidates = prepare(users);
    if candidates.is_empty() {
        return vec![];
    }

    if !clustering_enabled(zoom_span, config) {
        debug!("span {:.5} at or below threshold: {} singletons", zoom_span, candidates.len());
        return singletons(candidates);
    }

    let radius = merge_radius(zoom_span, config);
    let entries: Vec<GeomWithData<[f64; 2], usize>> = candidates
        .iter()
        .enumerate()
        .map(|(i, (_, p))| GeomWithData::new([p.longitude, p.latitude], i))
        .collect();
    let tree = RTree::bulk_load(entries);

    let mut processed = vec![false; candidates.len()];
    let mut groups: Vec<Vec<usize>> = Vec::new();

    for seed in 0..candidates.len() {
        if processed[seed] {
            continue;
        }
        processed[seed] = true;
        let seed_point = candidates[seed].1;

        let mut nearby: Vec<usize> = match search_envelope(&seed_point, radius) {
            Some(envelope) => tree
                .locate_in_envelope(&envelope)
                .map(|entry| entry.data)
                .filter(|&i| !processed[i])
                .collect(),
            None => (seed + 1..candidates.len()).filter(|&i| !processed[i]).collect(),
        };
        nearby.sort_unstable();

        let mut group = vec![seed];
        for i in nearby {
            if haversine_distance(&seed_point, &candidates[i].1) < radius {
                processed[i] = true;
                group.push(i);
            }
        }
        groups.push(group);
    }

    debug!(
        "clustered {} users at span {:.5} (radius {:.1}m) into {} clusters",
        candidates.len(),
        zoom_span,
        radius,
        groups.len()
    );
    assemble(candidates, groups)
}

/// Parallel variant of [`cluster_users`] with identical output.
#[cfg(feature = "parallel")]
pub fn cluster_users_parallel(
    users: &[UserPosition],
    zoom_span: f64,
    config: &ClusterConfig,
) -> Vec<Cluster> {
    use rayon::prelude::*;

    let candidates = prepare(users);
    if candidates.is_empty() {
        return vec![];
    }
    if !clustering_enabled(zoom_span, config) {
        return singletons(candidates);
    }

    let radius = merge_radius(zoom_span, config);
    let mut processed = vec![false; candidates.len()];
    let mut groups: Vec<Vec<usize>> = Vec::new();

    // Every index below the current seed is already processed
    for seed in 0..candidates.len() {
        if processed[seed] {
            continue;
        }
        processed[seed] = true;
        let seed_point = candidates[seed].1;

        let absorbed: Vec<usize> = (seed + 1..candidates.len())
            .into_par_iter()
            .filter(|&i| {
                !processed[i] && haversine_distance(&seed_point, &candidates[i].1) < radius
            })
            .collect();

        for &i in &absorbed {
            processed[i] = true;
        }
        let mut group = Vec::with_capacity(absorbed.len() + 1);
        group.push(seed);
        group.extend(absorbed);
        groups.push(group);
    }

    debug!(
        "parallel clustered {} users (radius {:.1}m) into {} clusters",
        candidates.len(),
        radius,
        groups.len()
    );
    assemble(candidates, groups)
}

// ============================================================================
// Helper Functions
// ============================================================================

#[inline]
fn clustering_enabled(zoom_span: f64, config: &ClusterConfig) -> bool {
    zoom_span > config.cluster_threshold
}

/// Visible, validly located users, ordered by id, first occurrence of each id.
fn prepare(users: &[UserPosition]) -> Vec<(UserPosition, GeoPoint)> {
    let mut candidates: Vec<(UserPosition, GeoPoint)> = users
        .iter()
        .filter_map(|u| u.clusterable_location().map(|p| (u.clone(), p)))
        .collect();

    let dropped = users.len() - candidates.len();
    if dropped > 0 {
        debug!("skipped {} users without visibility or a valid location", dropped);
    }

    // Stable sort keeps the first occurrence of a duplicated id in front
    candidates.sort_by(|a, b| a.0.user_id.cmp(&b.0.user_id));
    candidates.dedup_by(|later, earlier| later.0.user_id == earlier.0.user_id);
    candidates
}

fn singletons(candidates: Vec<(UserPosition, GeoPoint)>) -> Vec<Cluster> {
    candidates
        .into_iter()
        .map(|member| Cluster::from_members(vec![member]))
        .collect()
}

/// Lon/lat envelope around `center` covering every point within `radius`
/// meters, or `None` when the circle reaches a pole or crosses the
/// antimeridian.
fn search_envelope(center: &GeoPoint, radius: f64) -> Option<AABB<[f64; 2]>> {
    let (lat_half, lng_half) = cap_half_widths(center, radius * ENVELOPE_PADDING)?;
    if center.longitude - lng_half < -180.0 || center.longitude + lng_half > 180.0 {
        return None;
    }
    Some(AABB::from_corners(
        [center.longitude - lng_half, center.latitude - lat_half],
        [center.longitude + lng_half, center.latitude + lat_half],
    ))
}

fn assemble(candidates: Vec<(UserPosition, GeoPoint)>, groups: Vec<Vec<usize>>) -> Vec<Cluster> {
    let mut slots: Vec<Option<(UserPosition, GeoPoint)>> = candidates.into_iter().map(Some).collect();
    groups
        .into_iter()
        .map(|group| {
            let mut indices = group;
            indices.sort_unstable();
            let members = indices.into_iter().filter_map(|i| slots[i].take()).collect();
            Cluster::from_members(members)
        })
        .collect()
}

// ============================================================================
// Tests
// ============================================================================
