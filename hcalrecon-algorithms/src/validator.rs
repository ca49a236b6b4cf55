//! Candidate acceptance.

use hcalrecon_core::track::Track;

/// Accepts tracks spanning at least `MinTrackLayerHits` layers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrackValidator {
    min_layer_hits: usize,
}

impl Default for TrackValidator {
    fn default() -> Self {
        Self { min_layer_hits: 20 }
    }
}

impl TrackValidator {
    /// Creates a validator with the given minimum number of layers.
    pub fn new(min_layer_hits: usize) -> Self {
        Self { min_layer_hits }
    }

    /// Whether the candidate is a valid track.
    #[inline]
    pub fn accepts(&self, track: &Track) -> bool {
        track.num_layers() >= self.min_layer_hits
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hcalrecon_core::cluster::Cluster;
    use hcalrecon_core::hit::{HcalHit, Section};

    fn track(layers: i32) -> Track {
        let cluster = |layer| {
            Cluster::new(
                Section::Back,
                layer,
                vec![HcalHit::new(Section::Back, layer, 4, 10.0, 1.0)],
            )
        };
        let mut track = Track::from_seed(cluster(1));
        for layer in 2..=layers {
            track.push(cluster(layer));
        }
        track
    }

    #[test]
    fn test_threshold_inclusive() {
        let validator = TrackValidator::default();
        assert!(!validator.accepts(&track(19)));
        assert!(validator.accepts(&track(20)));
        assert!(validator.accepts(&track(25)));
    }
}
