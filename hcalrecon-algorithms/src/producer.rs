//! Event producers wrapping the reconstruction algorithms.
//!
//! A producer reads one hit collection from the [`Event`], runs its
//! algorithm and adds the result under its configured output name.
//! Producers are built once from a [`ProducerSpec`] and shared read-only
//! between worker threads.

use crate::consecutive::{ConsecutiveHitConfig, ConsecutiveHitTrigger};
use crate::mip::{MipTriggerConfig, MipTriggerEvaluator};
use crate::tracking::{TrackFinder, TrackingConfig};
use hcalrecon_core::config::{ConfigResult, ParameterSet};
use hcalrecon_core::error::{ConfigError, Error, Result};
use hcalrecon_core::event::{Event, InputTag, Product};
use log::debug;
use serde::{Deserialize, Serialize};

/// Class name of [`TrackProducer`].
pub const TRACK_PRODUCER: &str = "HcalTrackProducer";
/// Class name of [`MuonTriggerProducer`].
pub const MUON_TRIGGER: &str = "MuonTrigger";
/// Class name of [`MipTriggerProducer`].
pub const MIP_TRIGGER_PRODUCER: &str = "HcalMipTriggerProducer";

/// A configured processing step run on every event.
pub trait Producer: Send + Sync {
    /// Instance name, used in log messages.
    fn name(&self) -> &str;

    /// Class name, e.g. `HcalTrackProducer`.
    fn class(&self) -> &'static str;

    /// Processes one event, adding products to it.
    ///
    /// # Errors
    /// Returns an error if the input collection is missing or a product of
    /// the same name already exists.
    fn produce(&self, event: &mut Event) -> Result<()>;

    /// Complete parameter set of this instance, defaults included.
    fn parameters(&self) -> ParameterSet;
}

/// One producer entry of a process configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProducerSpec {
    /// Instance name.
    pub name: String,
    /// Producer class.
    pub class: String,
    /// Parameter overrides.
    #[serde(default)]
    pub parameters: ParameterSet,
}

impl ProducerSpec {
    /// Creates a spec with no parameter overrides.
    pub fn new(name: impl Into<String>, class: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            class: class.into(),
            parameters: ParameterSet::new(),
        }
    }

    /// Builds the producer described by this spec.
    ///
    /// # Errors
    /// Returns an error for an unknown class or invalid parameters.
    pub fn build(&self) -> ConfigResult<Box<dyn Producer>> {
        let ps = &self.parameters;
        Ok(match self.class.as_str() {
            TRACK_PRODUCER => Box::new(TrackProducer::from_parameters(&self.name, ps)?),
            MUON_TRIGGER => Box::new(MuonTriggerProducer::from_parameters(&self.name, ps)?),
            MIP_TRIGGER_PRODUCER => Box::new(MipTriggerProducer::from_parameters(&self.name, ps)?),
            other => return Err(ConfigError::UnknownClass(other.to_string())),
        })
    }
}

/// Every producer class with its default parameters.
pub fn default_specs() -> Vec<ProducerSpec> {
    [
        TrackProducer::default().spec(),
        MuonTriggerProducer::default().spec(),
        MuonTriggerProducer::new("targetMuonTrigger", MuonOrigin::Target).spec(),
        MipTriggerProducer::default().spec(),
    ]
    .into()
}

fn input_tag(ps: &ParameterSet, collection_key: &str, pass_key: &str) -> ConfigResult<InputTag> {
    let default = InputTag::default();
    Ok(InputTag::new(
        ps.get_string(collection_key, &default.collection)?,
        ps.get_string(pass_key, &default.pass)?,
    ))
}

/// Runs the [`TrackFinder`] and stores the accepted tracks.
#[derive(Debug, Clone)]
pub struct TrackProducer {
    name: String,
    input: InputTag,
    output: String,
    finder: TrackFinder,
}

impl Default for TrackProducer {
    fn default() -> Self {
        Self {
            name: "hcalTracks".to_string(),
            input: InputTag::default(),
            output: "HcalTracks".to_string(),
            finder: TrackFinder::default(),
        }
    }
}

impl TrackProducer {
    /// Builds the producer from `HitCollectionName`, `HitPassName`,
    /// `HcalTrackCollectionName` and the tracking parameters.
    pub fn from_parameters(name: &str, ps: &ParameterSet) -> ConfigResult<Self> {
        Ok(Self {
            name: name.to_string(),
            input: input_tag(ps, "HitCollectionName", "HitPassName")?,
            output: ps.get_string("HcalTrackCollectionName", "HcalTracks")?,
            finder: TrackFinder::new(TrackingConfig::from_parameters(ps)?),
        })
    }

    /// The underlying track finder.
    pub fn finder(&self) -> &TrackFinder {
        &self.finder
    }

    fn spec(&self) -> ProducerSpec {
        ProducerSpec {
            parameters: self.parameters(),
            ..ProducerSpec::new(&self.name, TRACK_PRODUCER)
        }
    }
}

impl Producer for TrackProducer {
    fn name(&self) -> &str {
        &self.name
    }

    fn class(&self) -> &'static str {
        TRACK_PRODUCER
    }

    fn produce(&self, event: &mut Event) -> Result<()> {
        let (tracks, stats) = self.finder.find(event.collection(&self.input)?);
        debug!(
            "[{}] event {}: {} tracks from {} candidates",
            self.name,
            event.number(),
            stats.tracks_found,
            stats.candidates
        );
        event.add(self.output.clone(), Product::Tracks(tracks))
    }

    fn parameters(&self) -> ParameterSet {
        let mut ps = ParameterSet::new();
        ps.insert("HitCollectionName", self.input.collection.clone());
        ps.insert("HitPassName", self.input.pass.clone());
        ps.insert("HcalTrackCollectionName", self.output.clone());
        self.finder.config().write_parameters(&mut ps);
        ps
    }
}

/// Threshold preset of a [`MuonTriggerProducer`], chosen with
/// `HcalMuonOrigin`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MuonOrigin {
    /// Cosmic muons, see [`ConsecutiveHitConfig::cosmic_muon`].
    Cosmic,
    /// Muons from the target, see [`ConsecutiveHitConfig::target_muon`].
    Target,
}

impl MuonOrigin {
    fn parse(value: &str) -> ConfigResult<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "cosmic" => Ok(MuonOrigin::Cosmic),
            "target" => Ok(MuonOrigin::Target),
            _ => Err(ConfigError::WrongType {
                name: "HcalMuonOrigin".to_string(),
                expected: "\"Cosmic\" or \"Target\"",
            }),
        }
    }

    fn name(self) -> &'static str {
        match self {
            MuonOrigin::Cosmic => "Cosmic",
            MuonOrigin::Target => "Target",
        }
    }

    fn preset(self) -> ConsecutiveHitConfig {
        match self {
            MuonOrigin::Cosmic => ConsecutiveHitConfig::cosmic_muon(),
            MuonOrigin::Target => ConsecutiveHitConfig::target_muon(),
        }
    }

    fn default_output(self) -> &'static str {
        match self {
            MuonOrigin::Cosmic => "cosmicMuonTrigger",
            MuonOrigin::Target => "targetMuonTrigger",
        }
    }
}

/// Runs the [`ConsecutiveHitTrigger`] and stores its decision.
#[derive(Debug, Clone)]
pub struct MuonTriggerProducer {
    name: String,
    origin: MuonOrigin,
    input: InputTag,
    output: String,
    trigger: ConsecutiveHitTrigger,
}

impl Default for MuonTriggerProducer {
    fn default() -> Self {
        Self::new("cosmicMuonTrigger", MuonOrigin::Cosmic)
    }
}

impl MuonTriggerProducer {
    /// Creates a producer with the preset thresholds of `origin`.
    pub fn new(name: &str, origin: MuonOrigin) -> Self {
        Self {
            name: name.to_string(),
            origin,
            input: InputTag::default(),
            output: origin.default_output().to_string(),
            trigger: ConsecutiveHitTrigger::new(origin.preset()),
        }
    }

    /// Builds the producer from `HcalHitCollectionName`, `HcalHitPassName`,
    /// `TriggerObjectName`, `HcalMuonOrigin` and the section thresholds.
    pub fn from_parameters(name: &str, ps: &ParameterSet) -> ConfigResult<Self> {
        let origin = MuonOrigin::parse(&ps.get_string("HcalMuonOrigin", "Cosmic")?)?;
        Ok(Self {
            name: name.to_string(),
            origin,
            input: input_tag(ps, "HcalHitCollectionName", "HcalHitPassName")?,
            output: ps.get_string("TriggerObjectName", origin.default_output())?,
            trigger: ConsecutiveHitTrigger::new(ConsecutiveHitConfig::from_parameters_with(
                origin.preset(),
                ps,
            )?),
        })
    }

    /// The underlying trigger.
    pub fn trigger(&self) -> &ConsecutiveHitTrigger {
        &self.trigger
    }

    fn spec(&self) -> ProducerSpec {
        ProducerSpec {
            parameters: self.parameters(),
            ..ProducerSpec::new(&self.name, MUON_TRIGGER)
        }
    }
}

impl Producer for MuonTriggerProducer {
    fn name(&self) -> &str {
        &self.name
    }

    fn class(&self) -> &'static str {
        MUON_TRIGGER
    }

    fn produce(&self, event: &mut Event) -> Result<()> {
        let decision = self
            .trigger
            .decide(&self.output, event.collection(&self.input)?);
        if decision.fired {
            debug!(
                "[{}] event {} passed in {:?} Hcal",
                self.name,
                event.number(),
                decision.section
            );
        }
        event.add(self.output.clone(), Product::Trigger(decision))
    }

    fn parameters(&self) -> ParameterSet {
        let mut ps = ParameterSet::new();
        ps.insert("HcalHitCollectionName", self.input.collection.clone());
        ps.insert("HcalHitPassName", self.input.pass.clone());
        ps.insert("TriggerObjectName", self.output.clone());
        ps.insert("HcalMuonOrigin", self.origin.name());
        self.trigger.config().write_parameters(&mut ps);
        ps
    }
}

/// Runs the [`MipTriggerEvaluator`], storing the decision and the track it
/// found.
#[derive(Debug, Clone)]
pub struct MipTriggerProducer {
    name: String,
    input: InputTag,
    trigger_output: String,
    track_output: String,
    evaluator: MipTriggerEvaluator,
}

impl Default for MipTriggerProducer {
    fn default() -> Self {
        Self {
            name: "hcalMipTrigger".to_string(),
            input: InputTag::default(),
            trigger_output: "hcalMipTrigger".to_string(),
            track_output: "hcalMipTracks".to_string(),
            evaluator: MipTriggerEvaluator::default(),
        }
    }
}

impl MipTriggerProducer {
    /// Builds the producer from `HcalHitCollectionName`, `HcalHitPassName`,
    /// `HcalMipTriggerObjectName`, `HcalMipTrackCollectionName` and the MIP
    /// parameters.
    ///
    /// The track collection defaults to the trigger name with its `Trigger`
    /// suffix replaced by `Tracks`.
    pub fn from_parameters(name: &str, ps: &ParameterSet) -> ConfigResult<Self> {
        let trigger_output = ps.get_string("HcalMipTriggerObjectName", "hcalMipTrigger")?;
        let track_output =
            ps.get_string("HcalMipTrackCollectionName", &track_name(&trigger_output))?;
        if track_output == trigger_output {
            return Err(ConfigError::Conflicting {
                first: "HcalMipTriggerObjectName".to_string(),
                second: "HcalMipTrackCollectionName".to_string(),
            });
        }
        Ok(Self {
            name: name.to_string(),
            input: input_tag(ps, "HcalHitCollectionName", "HcalHitPassName")?,
            trigger_output,
            track_output,
            evaluator: MipTriggerEvaluator::new(MipTriggerConfig::from_parameters(ps)?),
        })
    }

    /// The underlying evaluator.
    pub fn evaluator(&self) -> &MipTriggerEvaluator {
        &self.evaluator
    }

    fn spec(&self) -> ProducerSpec {
        ProducerSpec {
            parameters: self.parameters(),
            ..ProducerSpec::new(&self.name, MIP_TRIGGER_PRODUCER)
        }
    }
}

impl Producer for MipTriggerProducer {
    fn name(&self) -> &str {
        &self.name
    }

    fn class(&self) -> &'static str {
        MIP_TRIGGER_PRODUCER
    }

    fn produce(&self, event: &mut Event) -> Result<()> {
        let hits = event.collection(&self.input)?;
        if let Some(taken) = [&self.trigger_output, &self.track_output]
            .into_iter()
            .find(|name| event.contains_product(name))
        {
            return Err(Error::DuplicateProduct(taken.clone()));
        }
        let result = self.evaluator.evaluate(&self.trigger_output, hits);
        event.add(self.trigger_output.clone(), Product::Trigger(result.decision))?;
        event.add(
            self.track_output.clone(),
            Product::Tracks(result.track.into_iter().collect()),
        )
    }

    fn parameters(&self) -> ParameterSet {
        let mut ps = ParameterSet::new();
        ps.insert("HcalHitCollectionName", self.input.collection.clone());
        ps.insert("HcalHitPassName", self.input.pass.clone());
        ps.insert("HcalMipTriggerObjectName", self.trigger_output.clone());
        ps.insert("HcalMipTrackCollectionName", self.track_output.clone());
        self.evaluator.config().write_parameters(&mut ps);
        ps
    }
}

fn track_name(trigger_output: &str) -> String {
    let stem = trigger_output
        .strip_suffix("Trigger")
        .unwrap_or(trigger_output);
    format!("{stem}Tracks")
}
