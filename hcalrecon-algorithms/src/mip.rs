//! Single-track MIP trigger.
//!
//! Within each section the non-noise hits are walked layer by layer along a
//! running centerline seeded at the first hit. Hits within `TrackRadius`
//! strips of the centerline are on track. The section passes when enough hits
//! are on track, both in absolute number and as a fraction.
//!
//! Odd and even Back layers have crossed strips, so each of those two planes
//! gets its own centerline.

use crate::filter::HitFilter;
use hcalrecon_core::cluster::Cluster;
use hcalrecon_core::config::{ConfigResult, ParameterSet};
use hcalrecon_core::error::ConfigError;
use hcalrecon_core::hit::{HcalGeometry, HcalHit, PerSection, Section};
use hcalrecon_core::track::Track;
use hcalrecon_core::trigger::TriggerDecision;
use log::trace;
use std::collections::BTreeSet;

const MIN_FRACTION_HIT: &str = "MinFractionHit";
const MIN_FRACTION_LAYERS_HIT: &str = "MinFractionLayersHit";
const MIN_HITS: &str = "AbsoluteMinNumberHits";
const MIN_HITS_TO_LOOK: &str = "AbsoluteMinNumberHitsToLook";
const MIN_HITS_TO_ACCEPT: &str = "AbsoluteMinNumberHitsToAccept";

/// What the on-track fraction is measured against.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FractionPolicy {
    /// On-track hits over all non-noise hits of the section
    /// (`MinFractionHit`).
    Hits(f64),
    /// Layers with an on-track hit over the layers spanned by the track
    /// (`MinFractionLayersHit`).
    Layers(f64),
}

impl FractionPolicy {
    /// Minimum fraction required.
    pub fn minimum(self) -> f64 {
        match self {
            FractionPolicy::Hits(min) | FractionPolicy::Layers(min) => min,
        }
    }
}

/// Hit-count thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HitCountPolicy {
    /// One threshold used both to start looking and to accept
    /// (`AbsoluteMinNumberHits`).
    Single(u32),
    /// Section hit count needed to look for a track and on-track count
    /// needed to accept it.
    TwoStage {
        /// `AbsoluteMinNumberHitsToLook`.
        look: u32,
        /// `AbsoluteMinNumberHitsToAccept`.
        accept: u32,
    },
}

impl HitCountPolicy {
    /// Section hits needed before a track is searched for.
    pub fn look(self) -> u32 {
        match self {
            HitCountPolicy::Single(min) | HitCountPolicy::TwoStage { look: min, .. } => min,
        }
    }

    /// On-track hits needed to accept the track.
    pub fn accept(self) -> u32 {
        match self {
            HitCountPolicy::Single(min) | HitCountPolicy::TwoStage { accept: min, .. } => min,
        }
    }
}

/// Configuration of the MIP trigger.
#[derive(Debug, Clone, PartialEq)]
pub struct MipTriggerConfig {
    /// Minimum photo-electrons for a hit to be considered non-noise.
    pub min_pe: f32,
    /// Maximum on-track energy of a MIP.
    pub max_energy: f64,
    /// Maximum strip distance between a hit and the centerline.
    pub track_radius: f64,
    /// Fraction test.
    pub fraction: FractionPolicy,
    /// Absolute hit-count test.
    pub hit_count: HitCountPolicy,
    /// Layer and strip counts.
    pub geometry: HcalGeometry,
}

impl Default for MipTriggerConfig {
    fn default() -> Self {
        Self {
            min_pe: 5.5,
            max_energy: 4000.0,
            track_radius: 4.0,
            fraction: FractionPolicy::Layers(0.8),
            hit_count: HitCountPolicy::Single(3),
            geometry: HcalGeometry::default(),
        }
    }
}

impl MipTriggerConfig {
    /// Cosmic muon variant: fraction of all hits, at least two hits.
    pub fn cosmic_muon() -> Self {
        Self {
            fraction: FractionPolicy::Hits(0.8),
            hit_count: HitCountPolicy::Single(2),
            ..Self::default()
        }
    }

    /// Sets the fraction test.
    #[must_use]
    pub fn with_fraction(mut self, fraction: FractionPolicy) -> Self {
        self.fraction = fraction;
        self
    }

    /// Sets the hit-count test.
    #[must_use]
    pub fn with_hit_count(mut self, hit_count: HitCountPolicy) -> Self {
        self.hit_count = hit_count;
        self
    }

    /// Sets the centerline radius.
    #[must_use]
    pub fn with_track_radius(mut self, radius: f64) -> Self {
        self.track_radius = radius;
        self
    }

    /// Reads a configuration, taking defaults for missing keys.
    ///
    /// `MinFractionHit` and `MinFractionLayersHit` are exclusive, as are
    /// `AbsoluteMinNumberHits` and the two-stage `...ToLook` / `...ToAccept`
    /// pair.
    #[allow(clippy::cast_possible_truncation)]
    pub fn from_parameters(ps: &ParameterSet) -> ConfigResult<Self> {
        let d = Self::default();
        Ok(Self {
            min_pe: ps.get_non_negative("MinimumPE", f64::from(d.min_pe))? as f32,
            max_energy: ps.get_non_negative("MaximumEnergy", d.max_energy)?,
            track_radius: ps.get_non_negative("TrackRadius", d.track_radius)?,
            fraction: fraction_policy(ps, d.fraction)?,
            hit_count: hit_count_policy(ps, d.hit_count)?,
            geometry: HcalGeometry::from_parameters(ps)?,
        })
    }

    /// Writes every parameter.
    pub fn write_parameters(&self, ps: &mut ParameterSet) {
        ps.insert("MinimumPE", f64::from(self.min_pe));
        ps.insert("MaximumEnergy", self.max_energy);
        ps.insert("TrackRadius", self.track_radius);
        match self.fraction {
            FractionPolicy::Hits(min) => ps.insert(MIN_FRACTION_HIT, min),
            FractionPolicy::Layers(min) => ps.insert(MIN_FRACTION_LAYERS_HIT, min),
        }
        match self.hit_count {
            HitCountPolicy::Single(min) => ps.insert(MIN_HITS, min),
            HitCountPolicy::TwoStage { look, accept } => {
                ps.insert(MIN_HITS_TO_LOOK, look);
                ps.insert(MIN_HITS_TO_ACCEPT, accept);
            }
        }
        self.geometry.write_parameters(ps);
    }
}

fn fraction_policy(ps: &ParameterSet, default: FractionPolicy) -> ConfigResult<FractionPolicy> {
    match (ps.contains(MIN_FRACTION_HIT), ps.contains(MIN_FRACTION_LAYERS_HIT)) {
        (true, true) => Err(ConfigError::Conflicting {
            first: MIN_FRACTION_HIT.to_string(),
            second: MIN_FRACTION_LAYERS_HIT.to_string(),
        }),
        (true, false) => Ok(FractionPolicy::Hits(
            ps.get_fraction(MIN_FRACTION_HIT, default.minimum())?,
        )),
        (false, true) => Ok(FractionPolicy::Layers(
            ps.get_fraction(MIN_FRACTION_LAYERS_HIT, default.minimum())?,
        )),
        (false, false) => Ok(default),
    }
}

fn hit_count_policy(ps: &ParameterSet, default: HitCountPolicy) -> ConfigResult<HitCountPolicy> {
    let staged = [MIN_HITS_TO_LOOK, MIN_HITS_TO_ACCEPT]
        .into_iter()
        .find(|key| ps.contains(key));
    match (ps.contains(MIN_HITS), staged) {
        (true, Some(key)) => Err(ConfigError::Conflicting {
            first: MIN_HITS.to_string(),
            second: key.to_string(),
        }),
        (true, None) => Ok(HitCountPolicy::Single(
            ps.get_count(MIN_HITS, default.accept())?,
        )),
        (false, Some(_)) => {
            let look = ps.get_count(MIN_HITS_TO_LOOK, default.look())?;
            let accept = ps.get_count(MIN_HITS_TO_ACCEPT, default.accept())?;
            if look > accept {
                return Err(ConfigError::LookAboveAccept { look, accept });
            }
            Ok(HitCountPolicy::TwoStage { look, accept })
        }
        (false, None) => Ok(default),
    }
}

/// Outcome of the centerline walk in one section.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SectionScan {
    /// Non-noise hits in the section.
    pub hits: usize,
    /// Hits found on the centerline, in (layer, strip) order.
    pub on_track: Vec<HcalHit>,
    /// On-track fraction under the configured policy.
    pub fraction: f64,
    /// Summed energy of the on-track hits.
    pub energy: f64,
    /// Whether the section passed every stage.
    pub passed: bool,
}

/// Trigger decision plus the on-track hits of the first passing section.
#[derive(Debug, Clone, PartialEq)]
pub struct MipTriggerResult {
    /// The decision.
    pub decision: TriggerDecision,
    /// Track through the first passing section, if any.
    pub track: Option<Track>,
}

/// Single-track MIP trigger.
#[derive(Debug, Clone)]
pub struct MipTriggerEvaluator {
    config: MipTriggerConfig,
    filter: HitFilter,
}

impl Default for MipTriggerEvaluator {
    fn default() -> Self {
        Self::new(MipTriggerConfig::default())
    }
}

impl MipTriggerEvaluator {
    /// Creates an evaluator from a validated configuration.
    pub fn new(config: MipTriggerConfig) -> Self {
        Self {
            filter: HitFilter::new(config.min_pe),
            config,
        }
    }

    /// Current configuration.
    pub fn config(&self) -> &MipTriggerConfig {
        &self.config
    }

    /// Walks the centerline through one section's non-noise hits, one
    /// centerline per strip orientation.
    ///
    /// `hits` must all belong to the same section.
    pub fn scan_section(&self, hits: &[HcalHit]) -> SectionScan {
        let mut scan = SectionScan {
            hits: hits.len(),
            ..SectionScan::default()
        };
        if hits.is_empty() || (hits.len() as u64) < u64::from(self.config.hit_count.look()) {
            return scan;
        }

        let mut sorted = hits.to_vec();
        sorted.sort_by_key(|hit| (plane(hit), hit.layer, hit.strip));
        for plane_hits in sorted.chunk_by(|a, b| plane(a) == plane(b)) {
            self.follow_centerline(plane_hits, &mut scan.on_track);
        }
        scan.on_track.sort_by_key(|hit| (hit.layer, hit.strip));

        scan.energy = scan.on_track.iter().map(|hit| f64::from(hit.energy)).sum();
        scan.fraction = self.fraction(&scan);
        if scan.energy > self.config.max_energy {
            trace!(
                "on-track energy {:.1} above {:.1}, not a MIP",
                scan.energy,
                self.config.max_energy
            );
            return scan;
        }
        scan.passed = scan.on_track.len() as u64 >= u64::from(self.config.hit_count.accept())
            && scan.fraction >= self.config.fraction.minimum();
        scan
    }

    /// Appends the hits of one plane (sorted by layer and strip) that stay
    /// within the radius of the running centerline.
    fn follow_centerline(&self, hits: &[HcalHit], on_track: &mut Vec<HcalHit>) {
        let Some(first) = hits.first() else {
            return;
        };
        let mut center = f64::from(first.strip);
        for layer_hits in hits.chunk_by(|a, b| a.layer == b.layer) {
            let start = on_track.len();
            on_track.extend(
                layer_hits
                    .iter()
                    .filter(|hit| (f64::from(hit.strip) - center).abs() <= self.config.track_radius),
            );
            let matched = &on_track[start..];
            if !matched.is_empty() {
                center = mean_strip(matched);
            }
        }
    }

    #[allow(clippy::cast_precision_loss)]
    fn fraction(&self, scan: &SectionScan) -> f64 {
        match self.config.fraction {
            FractionPolicy::Hits(_) => {
                if scan.hits == 0 {
                    0.0
                } else {
                    scan.on_track.len() as f64 / scan.hits as f64
                }
            }
            FractionPolicy::Layers(_) => {
                let layers: BTreeSet<i32> = scan.on_track.iter().map(|hit| hit.layer).collect();
                match (layers.first(), layers.last()) {
                    (Some(first), Some(last)) => {
                        layers.len() as f64 / f64::from(last - first + 1)
                    }
                    _ => 0.0,
                }
            }
        }
    }

    /// Evaluates the trigger on one event's hits.
    ///
    /// Per section the variables `<Section>.Hits`, `<Section>.OnTrackHits`,
    /// `<Section>.Fraction` and `<Section>.Energy` are recorded.
    #[allow(clippy::cast_precision_loss)]
    pub fn evaluate(&self, name: &str, hits: &[HcalHit]) -> MipTriggerResult {
        let (filtered, _) = self.filter.partition(hits, &self.config.geometry);
        let mut by_section: PerSection<Vec<HcalHit>> = PerSection::default();
        for hit in filtered {
            by_section[hit.section].push(hit);
        }

        let mut decision = TriggerDecision::rejected(name);
        let mut track = None;
        for (section, section_hits) in by_section.iter() {
            let scan = self.scan_section(section_hits);
            decision.set_variable(format!("{section}.Hits"), scan.hits as f64);
            decision.set_variable(format!("{section}.OnTrackHits"), scan.on_track.len() as f64);
            decision.set_variable(format!("{section}.Fraction"), scan.fraction);
            decision.set_variable(format!("{section}.Energy"), scan.energy);
            if scan.passed && !decision.fired {
                decision.fire(section);
                track = track_from_hits(section, &scan.on_track);
            }
        }
        MipTriggerResult { decision, track }
    }
}

/// Strip orientation of a hit within its section.
fn plane(hit: &HcalHit) -> i32 {
    match hit.section {
        Section::Back => hit.layer.rem_euclid(2),
        _ => 0,
    }
}

#[allow(clippy::cast_precision_loss)]
fn mean_strip(hits: &[HcalHit]) -> f64 {
    hits.iter().map(|hit| f64::from(hit.strip)).sum::<f64>() / hits.len() as f64
}

/// Groups on-track hits (sorted by layer) into one cluster per layer.
fn track_from_hits(section: Section, hits: &[HcalHit]) -> Option<Track> {
    let mut layers = hits
        .chunk_by(|a, b| a.layer == b.layer)
        .map(|group| Cluster::new(section, group[0].layer, group.to_vec()));
    let mut track = Track::from_seed(layers.next()?);
    for cluster in layers {
        track.push(cluster);
    }
    Some(track)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn hit(section: Section, layer: i32, strip: i32) -> HcalHit {
        HcalHit::new(section, layer, strip, 10.0, 2.0)
    }

    fn line(layers: std::ops::RangeInclusive<i32>, strip: i32) -> Vec<HcalHit> {
        layers.map(|layer| hit(Section::Back, layer, strip)).collect()
    }

    #[test]
    fn test_parameters_policies() {
        let ps = ParameterSet::new()
            .with("MinFractionHit", 0.6)
            .with("AbsoluteMinNumberHitsToLook", 3)
            .with("AbsoluteMinNumberHitsToAccept", 8);
        let config = MipTriggerConfig::from_parameters(&ps).unwrap();
        assert_eq!(config.fraction, FractionPolicy::Hits(0.6));
        assert_eq!(
            config.hit_count,
            HitCountPolicy::TwoStage { look: 3, accept: 8 }
        );

        let mut written = ParameterSet::new();
        config.write_parameters(&mut written);
        assert_eq!(MipTriggerConfig::from_parameters(&written).unwrap(), config);

        let defaults = MipTriggerConfig::from_parameters(&ParameterSet::new()).unwrap();
        assert_eq!(defaults, MipTriggerConfig::default());
    }

    #[test]
    fn test_parameter_conflicts() {
        let both_fractions = ParameterSet::new()
            .with("MinFractionHit", 0.6)
            .with("MinFractionLayersHit", 0.6);
        assert!(matches!(
            MipTriggerConfig::from_parameters(&both_fractions),
            Err(ConfigError::Conflicting { .. })
        ));

        let both_counts = ParameterSet::new()
            .with("AbsoluteMinNumberHits", 3)
            .with("AbsoluteMinNumberHitsToAccept", 5);
        assert!(matches!(
            MipTriggerConfig::from_parameters(&both_counts),
            Err(ConfigError::Conflicting { .. })
        ));

        let inverted = ParameterSet::new()
            .with("AbsoluteMinNumberHitsToLook", 9)
            .with("AbsoluteMinNumberHitsToAccept", 5);
        assert_eq!(
            MipTriggerConfig::from_parameters(&inverted),
            Err(ConfigError::LookAboveAccept { look: 9, accept: 5 })
        );

        let bad_fraction = ParameterSet::new().with("MinFractionLayersHit", 1.2);
        assert!(MipTriggerConfig::from_parameters(&bad_fraction).is_err());
    }

    #[test]
    fn test_straight_track_fires() {
        let result = MipTriggerEvaluator::default().evaluate("hcalMipTrigger", &line(1..=10, 12));
        assert!(result.decision.fired);
        assert_eq!(result.decision.section, Some(Section::Back));
        assert_eq!(result.decision.variable("Back.OnTrackHits"), Some(10.0));
        let track = result.track.unwrap();
        assert_eq!(track.num_layers(), 10);
        assert_relative_eq!(track.energy(), 20.0);
    }

    #[test]
    fn test_centerline_follows_drift() {
        // one strip per layer stays within the radius of the moving center
        let hits: Vec<_> = (1..=20).map(|l| hit(Section::Back, l, l)).collect();
        let scan = MipTriggerEvaluator::default().scan_section(&hits);
        assert_eq!(scan.on_track.len(), 20);
        assert_relative_eq!(scan.fraction, 1.0);
        assert!(scan.passed);
    }

    #[test]
    fn test_back_planes_have_own_centerlines() {
        // odd layers measure one coordinate, even layers the crossed one
        let hits: Vec<_> = (1..=10)
            .map(|l| hit(Section::Back, l, if l % 2 == 1 { 5 } else { 20 }))
            .collect();
        let scan = MipTriggerEvaluator::new(MipTriggerConfig::cosmic_muon()).scan_section(&hits);
        assert_eq!(scan.on_track.len(), 10);
        assert_relative_eq!(scan.fraction, 1.0);
        assert!(scan.passed);
        assert!(scan.on_track.windows(2).all(|w| w[0].layer < w[1].layer));

        let result = MipTriggerEvaluator::default().evaluate("t", &hits);
        assert_eq!(result.decision.section, Some(Section::Back));
        assert_eq!(result.track.as_ref().map(Track::num_layers), Some(10));

        // side sections have a single orientation
        let side: Vec<_> = hits
            .iter()
            .map(|h| HcalHit { section: Section::Top, ..*h })
            .collect();
        let scan = MipTriggerEvaluator::new(MipTriggerConfig::cosmic_muon()).scan_section(&side);
        assert_eq!(scan.on_track.len(), 5);
        assert!(!scan.passed);
    }

    #[test]
    fn test_off_track_hits_lower_hit_fraction() {
        let config = MipTriggerConfig::cosmic_muon();
        let mut hits = line(1..=6, 5);
        hits.extend([hit(Section::Back, 2, 20), hit(Section::Back, 4, 25)]);
        let scan = MipTriggerEvaluator::new(config).scan_section(&hits);
        assert_eq!(scan.on_track.len(), 6);
        assert_relative_eq!(scan.fraction, 0.75);
        assert!(!scan.passed);
    }

    #[test]
    fn test_layer_fraction_counts_gaps() {
        let mut hits = line(1..=4, 5);
        hits.extend(line(9..=10, 5));
        let scan = MipTriggerEvaluator::default().scan_section(&hits);
        assert_relative_eq!(scan.fraction, 0.6);
        assert!(!scan.passed);
    }

    #[test]
    fn test_energy_cap() {
        let hits: Vec<_> = (1..=10)
            .map(|l| HcalHit::new(Section::Back, l, 4, 10.0, 500.0))
            .collect();
        let scan = MipTriggerEvaluator::default().scan_section(&hits);
        assert_relative_eq!(scan.energy, 5000.0);
        assert!(!scan.passed);
    }

    #[test]
    fn test_two_stage_acceptance() {
        let config = MipTriggerConfig::default()
            .with_hit_count(HitCountPolicy::TwoStage { look: 3, accept: 6 });
        let evaluator = MipTriggerEvaluator::new(config);
        assert!(!evaluator.evaluate("t", &line(1..=2, 4)).decision.fired);
        assert!(!evaluator.evaluate("t", &line(1..=5, 4)).decision.fired);
        assert!(evaluator.evaluate("t", &line(1..=6, 4)).decision.fired);
    }

    #[test]
    fn test_or_over_sections() {
        let mut hits = vec![hit(Section::Back, 1, 4)];
        hits.extend((3..=8).map(|l| hit(Section::Right, l, 9)));
        let result = MipTriggerEvaluator::default().evaluate("t", &hits);
        assert!(result.decision.fired);
        assert_eq!(result.decision.section, Some(Section::Right));
        assert_eq!(result.track.map(|t| t.section), Some(Section::Right));
    }

    #[test]
    fn test_noise_never_fires() {
        let hits: Vec<_> = line(1..=30, 4)
            .into_iter()
            .map(|h| HcalHit { pe: 1.0, ..h })
            .collect();
        let result = MipTriggerEvaluator::default().evaluate("t", &hits);
        assert!(!result.decision.fired);
        assert!(result.track.is_none());
    }
}
