//! Noise rejection.

use hcalrecon_core::hit::{HcalGeometry, HcalHit};
use log::warn;

/// Counts of hits removed by [`HitFilter::partition`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FilterStatistics {
    /// Hits read from the collection.
    pub hits_read: usize,
    /// Hits below the photo-electron threshold.
    pub noise_hits: usize,
    /// Hits whose layer or strip is outside the geometry.
    pub out_of_range_hits: usize,
}

/// Keeps hits with at least `min_pe` photo-electrons.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HitFilter {
    min_pe: f32,
}

impl Default for HitFilter {
    fn default() -> Self {
        Self { min_pe: 5.5 }
    }
}

impl HitFilter {
    /// Creates a filter with the given `MinimumPE`.
    pub fn new(min_pe: f32) -> Self {
        Self { min_pe }
    }

    /// Photo-electron threshold.
    pub fn min_pe(&self) -> f32 {
        self.min_pe
    }

    /// Whether a hit survives the filter.
    #[inline]
    pub fn accepts(&self, hit: &HcalHit) -> bool {
        !hit.is_noise(self.min_pe)
    }

    /// Non-noise subsequence of `hits`, in input order.
    pub fn filter(&self, hits: &[HcalHit]) -> Vec<HcalHit> {
        hits.iter().filter(|hit| self.accepts(hit)).copied().collect()
    }

    /// Filters noise and drops hits that do not fit `geometry`.
    ///
    /// Out-of-range hits are logged and skipped; they never fail the event.
    pub fn partition(
        &self,
        hits: &[HcalHit],
        geometry: &HcalGeometry,
    ) -> (Vec<HcalHit>, FilterStatistics) {
        let mut stats = FilterStatistics {
            hits_read: hits.len(),
            ..FilterStatistics::default()
        };
        let mut kept = Vec::with_capacity(hits.len());
        for hit in hits {
            if !self.accepts(hit) {
                stats.noise_hits += 1;
            } else if !geometry.contains(hit) {
                warn!(
                    "dropping hit outside {} Hcal geometry: layer {} strip {}",
                    hit.section, hit.layer, hit.strip
                );
                stats.out_of_range_hits += 1;
            } else {
                kept.push(*hit);
            }
        }
        (kept, stats)
    }
}
