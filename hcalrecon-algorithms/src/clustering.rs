//! Per-layer strip clustering.
//!
//! Hits in one layer are sorted by strip and merged greedily while the gap to
//! the next strip is at most `max_gap` (`SearchConeAngle`). Groups with fewer
//! than `min_hits` members (`MinConeHits`) are discarded.

use hcalrecon_core::cluster::Cluster;
use hcalrecon_core::hit::{HcalHit, Section};
use std::collections::BTreeMap;

/// Identifies one cluster of a [`ClusterMap`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ClusterId {
    /// Section of the cluster.
    pub section: Section,
    /// Layer of the cluster.
    pub layer: i32,
    /// Position within the layer, in strip order.
    pub index: usize,
}

/// Clusters of one event keyed by section and layer.
///
/// Clusters within a layer are ordered by strip.
#[derive(Debug, Clone, Default)]
pub struct ClusterMap {
    layers: BTreeMap<(Section, i32), Vec<Cluster>>,
}

impl ClusterMap {
    /// Clusters of one layer (empty if the layer has none).
    pub fn layer(&self, section: Section, layer: i32) -> &[Cluster] {
        self.layers
            .get(&(section, layer))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Looks up a cluster.
    pub fn get(&self, id: ClusterId) -> Option<&Cluster> {
        self.layers.get(&(id.section, id.layer))?.get(id.index)
    }

    /// Cluster ids of a section whose layer lies in `first..=last`, ordered
    /// by layer then strip.
    pub fn ids_in_layers(
        &self,
        section: Section,
        first: i32,
        last: i32,
    ) -> impl Iterator<Item = ClusterId> + '_ {
        let range = if first <= last {
            Some((section, first)..=(section, last))
        } else {
            None
        };
        range
            .into_iter()
            .flat_map(move |r| self.layers.range(r))
            .flat_map(|(&(section, layer), clusters)| {
                (0..clusters.len()).map(move |index| ClusterId {
                    section,
                    layer,
                    index,
                })
            })
    }

    /// Total number of clusters.
    pub fn len(&self) -> usize {
        self.layers.values().map(Vec::len).sum()
    }

    /// Returns true if there are no clusters.
    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    fn insert(&mut self, section: Section, layer: i32, clusters: Vec<Cluster>) {
        if !clusters.is_empty() {
            self.layers.insert((section, layer), clusters);
        }
    }
}

/// Greedy strip-gap clusterer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Clusterer {
    max_gap: u32,
    min_hits: usize,
}

impl Default for Clusterer {
    fn default() -> Self {
        Self {
            max_gap: 3,
            min_hits: 3,
        }
    }
}

impl Clusterer {
    /// Creates a clusterer from `SearchConeAngle` and `MinConeHits`.
    pub fn new(max_gap: u32, min_hits: usize) -> Self {
        Self { max_gap, min_hits }
    }

    /// Clusters the hits of a single layer.
    ///
    /// All hits must belong to `section` and `layer`.
    pub fn cluster_layer(&self, section: Section, layer: i32, hits: &[HcalHit]) -> Vec<Cluster> {
        let mut sorted = hits.to_vec();
        sorted.sort_by_key(|hit| hit.strip);

        let mut clusters = Vec::new();
        let mut current: Vec<HcalHit> = Vec::new();
        for hit in sorted {
            if let Some(last) = current.last() {
                if i64::from(hit.strip) - i64::from(last.strip) > i64::from(self.max_gap) {
                    self.close(section, layer, &mut current, &mut clusters);
                }
            }
            current.push(hit);
        }
        self.close(section, layer, &mut current, &mut clusters);
        clusters
    }

    /// Groups filtered hits by section and layer and clusters each layer.
    pub fn cluster_event(&self, hits: &[HcalHit]) -> ClusterMap {
        let mut by_layer: BTreeMap<(Section, i32), Vec<HcalHit>> = BTreeMap::new();
        for hit in hits {
            by_layer
                .entry((hit.section, hit.layer))
                .or_default()
                .push(*hit);
        }

        let mut map = ClusterMap::default();
        for ((section, layer), layer_hits) in by_layer {
            map.insert(section, layer, self.cluster_layer(section, layer, &layer_hits));
        }
        map
    }

    fn close(
        &self,
        section: Section,
        layer: i32,
        current: &mut Vec<HcalHit>,
        clusters: &mut Vec<Cluster>,
    ) {
        let hits = std::mem::take(current);
        if !hits.is_empty() && hits.len() >= self.min_hits {
            clusters.push(Cluster::new(section, layer, hits));
        }
    }
}
