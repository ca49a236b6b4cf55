//! Consecutive layer/strip muon trigger.
//!
//! Each section is scanned independently for its longest run of consecutive
//! layers holding a non-noise hit and its longest run of consecutive strips
//! within one layer. The event passes if any section reaches both of its
//! thresholds.

use crate::filter::HitFilter;
use hcalrecon_core::config::{ConfigResult, ParameterSet};
use hcalrecon_core::hit::{HcalGeometry, HcalHit, PerSection, Section};
use hcalrecon_core::trigger::TriggerDecision;
use std::collections::{BTreeMap, BTreeSet};

const LAYERS_PREFIX: &str = "MinConsecutiveLayersHit";
const STRIPS_PREFIX: &str = "MinConsecutiveStripsHit";
const KEY_SUFFIX: &str = "Hcal";

/// Thresholds of the consecutive-hit trigger.
///
/// A threshold of zero is always satisfied.
#[derive(Debug, Clone, PartialEq)]
pub struct ConsecutiveHitConfig {
    /// Minimum photo-electrons for a hit to count.
    pub min_pe: f32,
    /// Minimum run of consecutive hit layers, per section.
    pub min_layers: PerSection<u32>,
    /// Minimum run of consecutive hit strips in one layer, per section.
    pub min_strips: PerSection<u32>,
    /// Layer and strip counts; hits outside them are dropped.
    pub geometry: HcalGeometry,
}

impl Default for ConsecutiveHitConfig {
    fn default() -> Self {
        Self::cosmic_muon()
    }
}

impl ConsecutiveHitConfig {
    /// Cosmic muon preset: 20 layers and 10 strips in Back, 10 layers in
    /// each side section.
    pub fn cosmic_muon() -> Self {
        Self {
            min_pe: 5.5,
            min_layers: PerSection::back_and_sides(20, 10),
            min_strips: PerSection::back_and_sides(10, 0),
            geometry: HcalGeometry::default(),
        }
    }

    /// Target muon preset: 60 layers in Back, 10 layers in each side section.
    pub fn target_muon() -> Self {
        Self {
            min_pe: 5.5,
            min_layers: PerSection::back_and_sides(60, 10),
            min_strips: PerSection::splat(0),
            geometry: HcalGeometry::default(),
        }
    }

    /// Sets both thresholds of one section.
    #[must_use]
    pub fn with_section(mut self, section: Section, min_layers: u32, min_strips: u32) -> Self {
        self.min_layers[section] = min_layers;
        self.min_strips[section] = min_strips;
        self
    }

    /// Reads thresholds on top of `base`.
    ///
    /// Section keys follow `MinConsecutiveLayersHit<Section>Hcal`; a key with
    /// that shape naming an unknown section is an error.
    #[allow(clippy::cast_possible_truncation)]
    pub fn from_parameters_with(base: Self, ps: &ParameterSet) -> ConfigResult<Self> {
        let mut config = base;
        config.min_pe = ps.get_non_negative("MinimumPE", f64::from(config.min_pe))? as f32;
        config.geometry = HcalGeometry::from_parameters_with(config.geometry, ps)?;

        for key in ps.keys() {
            let (prefix, table) = if key.starts_with(LAYERS_PREFIX) {
                (LAYERS_PREFIX, &mut config.min_layers)
            } else if key.starts_with(STRIPS_PREFIX) {
                (STRIPS_PREFIX, &mut config.min_strips)
            } else {
                continue;
            };
            let name = &key[prefix.len()..];
            let name = name.strip_suffix(KEY_SUFFIX).unwrap_or(name);
            let section: Section = name.parse()?;
            table[section] = ps.get_count(key, table[section])?;
        }
        Ok(config)
    }

    /// Reads thresholds on top of the cosmic muon preset.
    pub fn from_parameters(ps: &ParameterSet) -> ConfigResult<Self> {
        Self::from_parameters_with(Self::cosmic_muon(), ps)
    }

    /// Writes every threshold.
    pub fn write_parameters(&self, ps: &mut ParameterSet) {
        ps.insert("MinimumPE", f64::from(self.min_pe));
        for section in Section::ALL {
            ps.insert(
                format!("{LAYERS_PREFIX}{section}{KEY_SUFFIX}"),
                self.min_layers[section],
            );
            ps.insert(
                format!("{STRIPS_PREFIX}{section}{KEY_SUFFIX}"),
                self.min_strips[section],
            );
        }
        self.geometry.write_parameters(ps);
    }
}

/// Longest runs observed in one section.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SectionRuns {
    /// Non-noise hits in the section.
    pub hits: usize,
    /// Longest run of consecutive layers with a hit.
    pub layers: u32,
    /// Longest run of consecutive strips within a single layer.
    pub strips: u32,
}

/// Consecutive-hit trigger.
#[derive(Debug, Clone)]
pub struct ConsecutiveHitTrigger {
    config: ConsecutiveHitConfig,
    filter: HitFilter,
}

impl Default for ConsecutiveHitTrigger {
    fn default() -> Self {
        Self::new(ConsecutiveHitConfig::default())
    }
}

impl ConsecutiveHitTrigger {
    /// Creates a trigger from validated thresholds.
    pub fn new(config: ConsecutiveHitConfig) -> Self {
        Self {
            filter: HitFilter::new(config.min_pe),
            config,
        }
    }

    /// Current thresholds.
    pub fn config(&self) -> &ConsecutiveHitConfig {
        &self.config
    }

    /// Longest runs per section over the non-noise hits inside the geometry.
    pub fn runs(&self, hits: &[HcalHit]) -> PerSection<SectionRuns> {
        let (kept, _) = self.filter.partition(hits, &self.config.geometry);
        let mut strips: PerSection<BTreeMap<i32, BTreeSet<i32>>> = PerSection::default();
        let mut counts = PerSection::splat(0usize);
        for hit in &kept {
            counts[hit.section] += 1;
            strips[hit.section]
                .entry(hit.layer)
                .or_default()
                .insert(hit.strip);
        }

        let mut runs = PerSection::<SectionRuns>::default();
        for section in Section::ALL {
            let layers = &strips[section];
            runs[section] = SectionRuns {
                hits: counts[section],
                layers: longest_run(layers.keys().copied()),
                strips: layers
                    .values()
                    .map(|s| longest_run(s.iter().copied()))
                    .max()
                    .unwrap_or(0),
            };
        }
        runs
    }

    /// Whether a section with the given runs passes its thresholds.
    pub fn section_fires(&self, section: Section, runs: &SectionRuns) -> bool {
        runs.hits > 0
            && runs.layers >= self.config.min_layers[section]
            && runs.strips >= self.config.min_strips[section]
    }

    /// Evaluates the trigger on one event's hits.
    ///
    /// Thresholds and observed runs of each section are recorded as
    /// `<Section>.MinLayers`, `<Section>.MinStrips`, `<Section>.ConsecLayers`
    /// and `<Section>.ConsecStrips`.
    pub fn decide(&self, name: &str, hits: &[HcalHit]) -> TriggerDecision {
        let runs = self.runs(hits);
        let mut decision = TriggerDecision::rejected(name);
        for (section, observed) in runs.iter() {
            decision.set_variable(
                format!("{section}.MinLayers"),
                f64::from(self.config.min_layers[section]),
            );
            decision.set_variable(
                format!("{section}.MinStrips"),
                f64::from(self.config.min_strips[section]),
            );
            decision.set_variable(format!("{section}.ConsecLayers"), f64::from(observed.layers));
            decision.set_variable(format!("{section}.ConsecStrips"), f64::from(observed.strips));
            if self.section_fires(section, observed) {
                decision.fire(section);
            }
        }
        decision
    }
}

/// Length of the longest run of consecutive integers in an ascending,
/// duplicate-free sequence.
fn longest_run(values: impl Iterator<Item = i32>) -> u32 {
    let mut best = 0;
    let mut current = 0;
    let mut previous: Option<i32> = None;
    for value in values {
        current = match previous {
            Some(p) if i64::from(value) - i64::from(p) == 1 => current + 1,
            _ => 1,
        };
        best = best.max(current);
        previous = Some(value);
    }
    best
}
