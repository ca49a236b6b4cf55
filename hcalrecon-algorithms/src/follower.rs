//! Layer-by-layer track following from a seed cluster.
//!
//! Starting at the seed, each following layer is searched for a cluster
//! within a window of `TrackWidth` strips centred on the track's current
//! centerline. A match moves the centerline to the matched centroid; after
//! `SearchConeDepth` consecutive empty layers (or at the last layer of the
//! section) the track terminates.

use crate::clustering::{ClusterId, ClusterMap};
use hcalrecon_core::track::Track;
use log::trace;
use std::collections::HashSet;

/// Search state of a candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FollowState {
    /// Last searched layer produced a match.
    Extending,
    /// The last `misses` layers produced no match.
    Seeking {
        /// Consecutive layers without a match.
        misses: u32,
    },
    /// No further layers will be searched.
    Terminated,
}

/// A followed candidate and the clusters it used.
#[derive(Debug, Clone)]
pub struct Candidate {
    /// The candidate track.
    pub track: Track,
    /// Clusters making up the track, seed first.
    pub members: Vec<ClusterId>,
}

/// Cone search track follower.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConeTrackFollower {
    depth: u32,
    width: u32,
    max_energy: f64,
}

impl Default for ConeTrackFollower {
    fn default() -> Self {
        Self {
            depth: 3,
            width: 6,
            max_energy: 4000.0,
        }
    }
}

impl ConeTrackFollower {
    /// Creates a follower from `SearchConeDepth`, `TrackWidth` and
    /// `MaximumEnergy`.
    pub fn new(depth: u32, width: u32, max_energy: f64) -> Self {
        Self {
            depth,
            width,
            max_energy,
        }
    }

    /// Strip window `[low, high]` searched around `center`.
    #[allow(clippy::cast_possible_truncation)]
    pub fn window(&self, center: f64) -> (i32, i32) {
        let half = f64::from(self.width) / 2.0;
        (
            (center - half).floor() as i32,
            (center + half).ceil() as i32,
        )
    }

    /// Follows a seed upward through the section.
    ///
    /// Clusters in `consumed` are not considered. Returns `None` if the seed
    /// does not exist or the accumulated energy exceeds `MaximumEnergy`.
    pub fn follow(
        &self,
        seed: ClusterId,
        clusters: &ClusterMap,
        consumed: &HashSet<ClusterId>,
        last_layer: i32,
    ) -> Option<Candidate> {
        let seed_cluster = clusters.get(seed)?;
        let mut energy = seed_cluster.energy();
        if energy > self.max_energy {
            return None;
        }

        let mut center = seed_cluster.centroid();
        let mut track = Track::from_seed(seed_cluster.clone());
        let mut members = vec![seed];
        let mut state = FollowState::Extending;
        let mut layer = seed.layer;

        while state != FollowState::Terminated {
            layer += 1;
            if layer > last_layer {
                state = FollowState::Terminated;
                continue;
            }

            let Some(id) = self.best_match(clusters, consumed, seed, layer, center) else {
                let misses = match state {
                    FollowState::Seeking { misses } => misses + 1,
                    _ => 1,
                };
                state = if misses >= self.depth {
                    FollowState::Terminated
                } else {
                    FollowState::Seeking { misses }
                };
                continue;
            };

            let cluster = clusters.get(id)?;
            energy += cluster.energy();
            if energy > self.max_energy {
                trace!(
                    "abandoning candidate seeded at layer {}: energy {energy:.1} above {:.1}",
                    seed.layer,
                    self.max_energy
                );
                return None;
            }
            center = cluster.centroid();
            track.push(cluster.clone());
            members.push(id);
            state = FollowState::Extending;
        }

        Some(Candidate { track, members })
    }

    /// Cluster in `layer` overlapping the window whose centroid is closest to
    /// `center`; ties go to the lower strip.
    fn best_match(
        &self,
        clusters: &ClusterMap,
        consumed: &HashSet<ClusterId>,
        seed: ClusterId,
        layer: i32,
        center: f64,
    ) -> Option<ClusterId> {
        let (low, high) = self.window(center);
        let mut best: Option<(ClusterId, f64)> = None;
        for (index, cluster) in clusters.layer(seed.section, layer).iter().enumerate() {
            let id = ClusterId {
                section: seed.section,
                layer,
                index,
            };
            if consumed.contains(&id) || !cluster.overlaps(low, high) {
                continue;
            }
            let distance = (cluster.centroid() - center).abs();
            if best.map_or(true, |(_, d)| distance < d) {
                best = Some((id, distance));
            }
        }
        best.map(|(id, _)| id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clustering::Clusterer;
    use hcalrecon_core::hit::{HcalHit, Section};

    fn clusters(points: &[(i32, i32)], energy: f32) -> ClusterMap {
        let hits: Vec<HcalHit> = points
            .iter()
            .map(|&(layer, strip)| HcalHit::new(Section::Back, layer, strip, 10.0, energy))
            .collect();
        Clusterer::new(1, 1).cluster_event(&hits)
    }

    fn seed(layer: i32) -> ClusterId {
        ClusterId {
            section: Section::Back,
            layer,
            index: 0,
        }
    }

    #[test]
    fn test_window() {
        let follower = ConeTrackFollower::default();
        assert_eq!(follower.window(10.0), (7, 13));
        assert_eq!(follower.window(10.5), (7, 14));
    }

    #[test]
    fn test_follows_straight_line() {
        let points: Vec<_> = (1..=10).map(|l| (l, 12)).collect();
        let map = clusters(&points, 1.0);
        let candidate = ConeTrackFollower::default()
            .follow(seed(1), &map, &HashSet::new(), 81)
            .unwrap();
        assert_eq!(candidate.track.num_layers(), 10);
        assert_eq!(candidate.members.len(), 10);
    }

    #[test]
    fn test_follows_drifting_line() {
        // moves two strips per layer; window of +-3 keeps up
        let points: Vec<_> = (1..=8).map(|l| (l, 2 * l)).collect();
        let map = clusters(&points, 1.0);
        let candidate = ConeTrackFollower::default()
            .follow(seed(1), &map, &HashSet::new(), 81)
            .unwrap();
        assert_eq!(candidate.track.last_layer(), Some(8));
    }

    #[test]
    fn test_gap_shorter_than_depth_is_bridged() {
        let map = clusters(&[(1, 5), (2, 5), (5, 5), (6, 5)], 1.0);
        let candidate = ConeTrackFollower::default()
            .follow(seed(1), &map, &HashSet::new(), 81)
            .unwrap();
        assert_eq!(candidate.track.num_layers(), 4);
    }

    #[test]
    fn test_terminates_after_depth_misses() {
        let map = clusters(&[(1, 5), (2, 5), (6, 5), (7, 5)], 1.0);
        let candidate = ConeTrackFollower::default()
            .follow(seed(1), &map, &HashSet::new(), 81)
            .unwrap();
        assert_eq!(candidate.track.num_layers(), 2);
    }

    #[test]
    fn test_stops_at_last_layer() {
        let points: Vec<_> = (1..=10).map(|l| (l, 12)).collect();
        let map = clusters(&points, 1.0);
        let candidate = ConeTrackFollower::default()
            .follow(seed(1), &map, &HashSet::new(), 6)
            .unwrap();
        assert_eq!(candidate.track.last_layer(), Some(6));
    }

    #[test]
    fn test_prefers_closest_cluster() {
        let map = clusters(&[(1, 10), (2, 7), (2, 11)], 1.0);
        let candidate = ConeTrackFollower::default()
            .follow(seed(1), &map, &HashSet::new(), 81)
            .unwrap();
        assert_eq!(candidate.track.layers[1].cluster.low_strip(), Some(11));
    }

    #[test]
    fn test_consumed_clusters_skipped() {
        let map = clusters(&[(1, 10), (2, 10), (3, 10)], 1.0);
        let consumed: HashSet<_> = [seed(2)].into_iter().collect();
        let candidate = ConeTrackFollower::default()
            .follow(seed(1), &map, &consumed, 81)
            .unwrap();
        let layers: Vec<_> = candidate.track.layers.iter().map(|l| l.layer).collect();
        assert_eq!(layers, vec![1, 3]);
    }

    #[test]
    fn test_energy_guard_abandons() {
        let points: Vec<_> = (1..=10).map(|l| (l, 12)).collect();
        let map = clusters(&points, 500.0);
        let follower = ConeTrackFollower::new(3, 6, 4000.0);
        assert!(follower
            .follow(seed(1), &map, &HashSet::new(), 81)
            .is_none());
    }
}
