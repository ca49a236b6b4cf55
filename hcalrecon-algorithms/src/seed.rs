//! Track seeding.

use crate::clustering::{ClusterId, ClusterMap};
use hcalrecon_core::hit::Section;

/// Picks the lowest layer (at or above `FirstSeedLayer`) holding an eligible
/// cluster.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeedFinder {
    first_seed_layer: i32,
}

impl Default for SeedFinder {
    fn default() -> Self {
        Self {
            first_seed_layer: 1,
        }
    }
}

impl SeedFinder {
    /// Creates a seed finder starting at `first_seed_layer`.
    pub fn new(first_seed_layer: i32) -> Self {
        Self { first_seed_layer }
    }

    /// First layer searched for seeds.
    pub fn first_seed_layer(&self) -> i32 {
        self.first_seed_layer
    }

    /// Seeds of the first layer in `FirstSeedLayer..=last_layer` that has at
    /// least one cluster passing `eligible`.
    ///
    /// Every eligible cluster in that layer is returned, in strip order.
    /// `None` means no layer qualified.
    pub fn find<F>(
        &self,
        clusters: &ClusterMap,
        section: Section,
        last_layer: i32,
        eligible: F,
    ) -> Option<Vec<ClusterId>>
    where
        F: Fn(&ClusterId) -> bool,
    {
        let mut ids = clusters
            .ids_in_layers(section, self.first_seed_layer, last_layer)
            .filter(|id| eligible(id));
        let first = ids.next()?;
        let mut seeds = vec![first];
        seeds.extend(ids.take_while(|id| id.layer == first.layer));
        Some(seeds)
    }
}
