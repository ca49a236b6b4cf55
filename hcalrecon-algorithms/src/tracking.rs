//! Full track finding for one event: filter, cluster, seed, follow, validate.

use crate::clustering::{ClusterId, Clusterer};
use crate::filter::{FilterStatistics, HitFilter};
use crate::follower::ConeTrackFollower;
use crate::seed::SeedFinder;
use crate::validator::TrackValidator;
use hcalrecon_core::config::{ConfigResult, ParameterSet};
use hcalrecon_core::hit::{HcalGeometry, HcalHit, Section};
use hcalrecon_core::track::Track;
use log::debug;
use std::collections::HashSet;

/// Configuration for cone track finding.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackingConfig {
    /// Minimum photo-electrons for a hit to be considered non-noise.
    pub min_pe: f32,
    /// Maximum energy of a candidate to still be considered a MIP.
    pub max_energy: f64,
    /// First layer searched for a seed.
    pub first_seed_layer: u32,
    /// Consecutive empty layers tolerated before a candidate terminates.
    pub search_cone_depth: u32,
    /// Largest strip gap merged into one cluster.
    pub search_cone_angle: u32,
    /// Minimum hits in a cluster.
    pub min_cone_hits: u32,
    /// Width (in strips) of the window searched when extending a track.
    pub track_width: u32,
    /// Minimum layers in a track for it to be accepted.
    pub min_track_layer_hits: u32,
    /// Maximum number of candidates followed per event.
    pub max_track_count: u32,
    /// Layer and strip counts.
    pub geometry: HcalGeometry,
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self {
            min_pe: 5.5,
            max_energy: 4000.0,
            first_seed_layer: 1,
            search_cone_depth: 3,
            search_cone_angle: 3,
            min_cone_hits: 3,
            track_width: 6,
            min_track_layer_hits: 20,
            max_track_count: 100,
            geometry: HcalGeometry::default(),
        }
    }
}

impl TrackingConfig {
    /// Creates a configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the noise threshold.
    #[must_use]
    pub fn with_min_pe(mut self, min_pe: f32) -> Self {
        self.min_pe = min_pe;
        self
    }

    /// Sets the energy cap.
    #[must_use]
    pub fn with_max_energy(mut self, max_energy: f64) -> Self {
        self.max_energy = max_energy;
        self
    }

    /// Sets the minimum number of layers in an accepted track.
    #[must_use]
    pub fn with_min_track_layer_hits(mut self, layers: u32) -> Self {
        self.min_track_layer_hits = layers;
        self
    }

    /// Sets the cap on candidates per event.
    #[must_use]
    pub fn with_max_track_count(mut self, count: u32) -> Self {
        self.max_track_count = count;
        self
    }

    /// Sets the detector geometry.
    #[must_use]
    pub fn with_geometry(mut self, geometry: HcalGeometry) -> Self {
        self.geometry = geometry;
        self
    }

    /// Reads a configuration, taking defaults for missing keys.
    #[allow(clippy::cast_possible_truncation)]
    pub fn from_parameters(ps: &ParameterSet) -> ConfigResult<Self> {
        let d = Self::default();
        Ok(Self {
            min_pe: ps.get_non_negative("MinimumPE", f64::from(d.min_pe))? as f32,
            max_energy: ps.get_non_negative("MaximumEnergy", d.max_energy)?,
            first_seed_layer: ps.get_count("FirstSeedLayer", d.first_seed_layer)?,
            search_cone_depth: ps.get_positive_count("SearchConeDepth", d.search_cone_depth)?,
            search_cone_angle: ps.get_count("SearchConeAngle", d.search_cone_angle)?,
            min_cone_hits: ps.get_count("MinConeHits", d.min_cone_hits)?,
            track_width: ps.get_count("TrackWidth", d.track_width)?,
            min_track_layer_hits: ps.get_count("MinTrackLayerHits", d.min_track_layer_hits)?,
            max_track_count: ps.get_positive_count("MaxTrackCount", d.max_track_count)?,
            geometry: HcalGeometry::from_parameters(ps)?,
        })
    }

    /// Writes every parameter.
    pub fn write_parameters(&self, ps: &mut ParameterSet) {
        ps.insert("MinimumPE", f64::from(self.min_pe));
        ps.insert("MaximumEnergy", self.max_energy);
        ps.insert("FirstSeedLayer", self.first_seed_layer);
        ps.insert("SearchConeDepth", self.search_cone_depth);
        ps.insert("SearchConeAngle", self.search_cone_angle);
        ps.insert("MinConeHits", self.min_cone_hits);
        ps.insert("TrackWidth", self.track_width);
        ps.insert("MinTrackLayerHits", self.min_track_layer_hits);
        ps.insert("MaxTrackCount", self.max_track_count);
        self.geometry.write_parameters(ps);
    }
}

/// Counters from one call to [`TrackFinder::find`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TrackingStatistics {
    /// Hit filtering counters.
    pub filter: FilterStatistics,
    /// Clusters built from the surviving hits.
    pub clusters_found: usize,
    /// Seeds followed (bounded by `MaxTrackCount`).
    pub candidates: usize,
    /// Candidates abandoned by the energy guard.
    pub abandoned: usize,
    /// Candidates too short to be accepted.
    pub rejected: usize,
    /// Tracks accepted.
    pub tracks_found: usize,
    /// Whether the candidate cap stopped the search.
    pub cap_reached: bool,
}

/// Seeded cone-search track finder.
#[derive(Debug, Clone)]
pub struct TrackFinder {
    config: TrackingConfig,
    filter: HitFilter,
    clusterer: Clusterer,
    seeds: SeedFinder,
    follower: ConeTrackFollower,
    validator: TrackValidator,
}

impl Default for TrackFinder {
    fn default() -> Self {
        Self::new(TrackingConfig::default())
    }
}

impl TrackFinder {
    /// Builds the pipeline stages from a configuration.
    pub fn new(config: TrackingConfig) -> Self {
        Self {
            filter: HitFilter::new(config.min_pe),
            clusterer: Clusterer::new(config.search_cone_angle, config.min_cone_hits as usize),
            seeds: SeedFinder::new(i32::try_from(config.first_seed_layer).unwrap_or(i32::MAX)),
            follower: ConeTrackFollower::new(
                config.search_cone_depth,
                config.track_width,
                config.max_energy,
            ),
            validator: TrackValidator::new(config.min_track_layer_hits as usize),
            config,
        }
    }

    /// Current configuration.
    pub fn config(&self) -> &TrackingConfig {
        &self.config
    }

    /// Finds the tracks in one event's hits.
    ///
    /// Sections are searched in section order. Accepted tracks consume their
    /// clusters; a tried seed is never used as a seed again. At most
    /// `MaxTrackCount` candidates are followed.
    pub fn find(&self, hits: &[HcalHit]) -> (Vec<Track>, TrackingStatistics) {
        let (filtered, filter_stats) = self.filter.partition(hits, &self.config.geometry);
        let clusters = self.clusterer.cluster_event(&filtered);
        let mut stats = TrackingStatistics {
            filter: filter_stats,
            clusters_found: clusters.len(),
            ..TrackingStatistics::default()
        };

        let max_candidates = self.config.max_track_count as usize;
        let mut tracks = Vec::new();
        let mut consumed: HashSet<ClusterId> = HashSet::new();
        let mut tried: HashSet<ClusterId> = HashSet::new();

        'sections: for section in Section::ALL {
            let last_layer = self.config.geometry.last_layer(section);
            loop {
                let eligible = |id: &ClusterId| !consumed.contains(id) && !tried.contains(id);
                let Some(seeds) = self.seeds.find(&clusters, section, last_layer, eligible) else {
                    break;
                };
                for seed in seeds {
                    if stats.candidates >= max_candidates {
                        stats.cap_reached = true;
                        break 'sections;
                    }
                    tried.insert(seed);
                    stats.candidates += 1;

                    let Some(candidate) = self.follower.follow(seed, &clusters, &consumed, last_layer)
                    else {
                        stats.abandoned += 1;
                        continue;
                    };
                    if self.validator.accepts(&candidate.track) {
                        consumed.extend(candidate.members);
                        tracks.push(candidate.track);
                    } else {
                        stats.rejected += 1;
                    }
                }
            }
        }

        stats.tracks_found = tracks.len();
        debug!(
            "{} hits -> {} clusters, {} candidates, {} tracks{}",
            stats.filter.hits_read,
            stats.clusters_found,
            stats.candidates,
            stats.tracks_found,
            if stats.cap_reached { " (candidate cap reached)" } else { "" }
        );
        (tracks, stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hcalrecon_core::error::ConfigError;

    fn line(section: Section, layers: std::ops::RangeInclusive<i32>, strip: i32) -> Vec<HcalHit> {
        layers
            .flat_map(|layer| {
                (strip - 1..=strip + 1).map(move |s| HcalHit::new(section, layer, s, 10.0, 1.0))
            })
            .collect()
    }

    #[test]
    fn test_parameters_roundtrip() {
        let config = TrackingConfig::new()
            .with_min_pe(4.0)
            .with_max_track_count(7);
        let mut ps = ParameterSet::new();
        config.write_parameters(&mut ps);
        assert_eq!(TrackingConfig::from_parameters(&ps).unwrap(), config);
    }

    #[test]
    fn test_partial_override() {
        let ps = ParameterSet::new()
            .with("TrackWidth", 4)
            .with("NumHcalLayers", 60);
        let config = TrackingConfig::from_parameters(&ps).unwrap();
        assert_eq!(config.track_width, 4);
        assert_eq!(config.search_cone_depth, 3);
        assert_eq!(config.geometry.last_layer(Section::Back), 60);
    }

    #[test]
    fn test_invalid_parameters() {
        for (name, value) in [
            ("MaxTrackCount", 0),
            ("MaxTrackCount", -4),
            ("MinTrackLayerHits", -1),
            ("SearchConeDepth", 0),
        ] {
            let ps = ParameterSet::new().with(name, value);
            assert!(TrackingConfig::from_parameters(&ps).is_err(), "{name}={value}");
        }
        let ps = ParameterSet::new().with("MinimumPE", -0.5);
        assert!(matches!(
            TrackingConfig::from_parameters(&ps),
            Err(ConfigError::Negative { .. })
        ));
    }

    #[test]
    fn test_single_track() {
        let (tracks, stats) = TrackFinder::default().find(&line(Section::Back, 1..=25, 15));
        assert_eq!(tracks.len(), 1);
        assert_eq!(tracks[0].num_layers(), 25);
        assert_eq!(stats.candidates, 1);
        assert!(!stats.cap_reached);
    }

    #[test]
    fn test_two_separated_tracks() {
        let mut hits = line(Section::Back, 1..=30, 5);
        hits.extend(line(Section::Back, 3..=30, 25));
        let (tracks, _) = TrackFinder::default().find(&hits);
        assert_eq!(tracks.len(), 2);
        assert_eq!(tracks[0].first_layer(), Some(1));
        assert_eq!(tracks[1].first_layer(), Some(3));
    }

    #[test]
    fn test_tracks_in_side_sections() {
        let config = TrackingConfig::new().with_min_track_layer_hits(10);
        let (tracks, _) = TrackFinder::new(config).find(&line(Section::Top, 2..=17, 12));
        assert_eq!(tracks.len(), 1);
        assert_eq!(tracks[0].section, Section::Top);
    }

    #[test]
    fn test_short_track_rejected() {
        let (tracks, stats) = TrackFinder::default().find(&line(Section::Back, 1..=10, 15));
        assert!(tracks.is_empty());
        assert!(stats.rejected > 0);
    }

    #[test]
    fn test_out_of_range_hits_dropped() {
        let mut hits = line(Section::Back, 1..=25, 15);
        hits.push(HcalHit::new(Section::Back, 90, 15, 10.0, 1.0));
        hits.push(HcalHit::new(Section::Back, 5, 40, 10.0, 1.0));
        let (tracks, stats) = TrackFinder::default().find(&hits);
        assert_eq!(tracks.len(), 1);
        assert_eq!(stats.filter.out_of_range_hits, 2);
    }
}
