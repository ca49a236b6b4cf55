//! Clusters of adjacent strips within one layer.

use crate::hit::{HcalHit, Section};
use serde::{Deserialize, Serialize};

/// Co-layer hits grouped into a single track point.
///
/// Hits are kept sorted by strip.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cluster {
    /// Section of every hit in the cluster.
    pub section: Section,
    /// Layer of every hit in the cluster.
    pub layer: i32,
    /// Member hits, ordered by strip.
    pub hits: Vec<HcalHit>,
}

impl Cluster {
    /// Creates a cluster from hits that share a section and layer.
    ///
    /// The hits are sorted by strip (stable, so equal strips keep input order).
    pub fn new(section: Section, layer: i32, mut hits: Vec<HcalHit>) -> Self {
        hits.sort_by_key(|hit| hit.strip);
        Self {
            section,
            layer,
            hits,
        }
    }

    /// Number of hits in the cluster.
    pub fn len(&self) -> usize {
        self.hits.len()
    }

    /// Returns true if the cluster has no hits.
    pub fn is_empty(&self) -> bool {
        self.hits.is_empty()
    }

    /// Lowest strip in the cluster.
    pub fn low_strip(&self) -> Option<i32> {
        self.hits.first().map(|hit| hit.strip)
    }

    /// Highest strip in the cluster.
    pub fn high_strip(&self) -> Option<i32> {
        self.hits.last().map(|hit| hit.strip)
    }

    /// Mean strip of the member hits.
    #[allow(clippy::cast_precision_loss)]
    pub fn centroid(&self) -> f64 {
        if self.hits.is_empty() {
            return 0.0;
        }
        let sum: f64 = self.hits.iter().map(|hit| f64::from(hit.strip)).sum();
        sum / self.hits.len() as f64
    }

    /// Summed energy of the member hits.
    pub fn energy(&self) -> f64 {
        self.hits.iter().map(|hit| f64::from(hit.energy)).sum()
    }

    /// Summed photo-electrons of the member hits.
    pub fn pe(&self) -> f64 {
        self.hits.iter().map(|hit| f64::from(hit.pe)).sum()
    }

    /// Whether any member strip lies in `[low, high]`.
    pub fn overlaps(&self, low: i32, high: i32) -> bool {
        self.hits
            .iter()
            .any(|hit| hit.strip >= low && hit.strip <= high)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn hit(strip: i32, energy: f32) -> HcalHit {
        HcalHit::new(Section::Back, 4, strip, 10.0, energy)
    }

    #[test]
    fn test_cluster_sorted_and_bounds() {
        let cluster = Cluster::new(Section::Back, 4, vec![hit(7, 1.0), hit(5, 2.0), hit(6, 0.5)]);
        assert_eq!(cluster.len(), 3);
        assert_eq!(cluster.low_strip(), Some(5));
        assert_eq!(cluster.high_strip(), Some(7));
        assert_relative_eq!(cluster.centroid(), 6.0);
        assert_relative_eq!(cluster.energy(), 3.5);
        assert_relative_eq!(cluster.pe(), 30.0);
    }

    #[test]
    fn test_cluster_overlap() {
        let cluster = Cluster::new(Section::Back, 4, vec![hit(10, 1.0), hit(11, 1.0)]);
        assert!(cluster.overlaps(11, 14));
        assert!(cluster.overlaps(0, 10));
        assert!(!cluster.overlaps(12, 20));
    }

    #[test]
    fn test_empty_cluster() {
        let cluster = Cluster::new(Section::Top, 1, Vec::new());
        assert!(cluster.is_empty());
        assert_eq!(cluster.low_strip(), None);
        assert_relative_eq!(cluster.centroid(), 0.0);
    }
}
