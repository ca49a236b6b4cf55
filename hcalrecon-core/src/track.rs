//! Reconstructed tracks.

use crate::cluster::Cluster;
use crate::hit::Section;
use serde::{Deserialize, Serialize};

/// One layer of a track and the cluster matched in it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackLayer {
    /// Layer number.
    pub layer: i32,
    /// Cluster matched in this layer.
    pub cluster: Cluster,
}

/// A track through one Hcal section.
///
/// Layers are strictly increasing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Track {
    /// Section the track was found in.
    pub section: Section,
    /// Matched layers, in increasing layer order.
    pub layers: Vec<TrackLayer>,
}

impl Track {
    /// Starts a track at a seed cluster.
    pub fn from_seed(seed: Cluster) -> Self {
        Self {
            section: seed.section,
            layers: vec![TrackLayer {
                layer: seed.layer,
                cluster: seed,
            }],
        }
    }

    /// Appends a cluster from a later layer.
    pub fn push(&mut self, cluster: Cluster) {
        debug_assert!(self.last_layer().map_or(true, |last| cluster.layer > last));
        self.layers.push(TrackLayer {
            layer: cluster.layer,
            cluster,
        });
    }

    /// Number of layers with a matched cluster.
    pub fn num_layers(&self) -> usize {
        self.layers.len()
    }

    /// Number of hits summed over all clusters.
    pub fn num_hits(&self) -> usize {
        self.layers.iter().map(|l| l.cluster.len()).sum()
    }

    /// Summed energy over all clusters.
    pub fn energy(&self) -> f64 {
        self.layers.iter().map(|l| l.cluster.energy()).sum()
    }

    /// First layer of the track.
    pub fn first_layer(&self) -> Option<i32> {
        self.layers.first().map(|l| l.layer)
    }

    /// Last layer of the track.
    pub fn last_layer(&self) -> Option<i32> {
        self.layers.last().map(|l| l.layer)
    }

    /// `(layer, strip)` positions referenced by the track.
    pub fn strips(&self) -> impl Iterator<Item = (i32, i32)> + '_ {
        self.layers
            .iter()
            .flat_map(|l| l.cluster.hits.iter().map(|hit| (hit.layer, hit.strip)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hit::HcalHit;
    use approx::assert_relative_eq;

    fn cluster(layer: i32, strips: &[i32]) -> Cluster {
        Cluster::new(
            Section::Back,
            layer,
            strips
                .iter()
                .map(|&s| HcalHit::new(Section::Back, layer, s, 10.0, 2.0))
                .collect(),
        )
    }

    #[test]
    fn test_track_accumulates() {
        let mut track = Track::from_seed(cluster(3, &[9, 10]));
        track.push(cluster(4, &[10]));
        track.push(cluster(6, &[11, 12]));

        assert_eq!(track.section, Section::Back);
        assert_eq!(track.num_layers(), 3);
        assert_eq!(track.num_hits(), 5);
        assert_eq!(track.first_layer(), Some(3));
        assert_eq!(track.last_layer(), Some(6));
        assert_relative_eq!(track.energy(), 10.0);

        let strips: Vec<_> = track.strips().collect();
        assert_eq!(strips, vec![(3, 9), (3, 10), (4, 10), (6, 11), (6, 12)]);
    }
}
