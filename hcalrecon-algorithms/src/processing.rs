//! Event loop running a sequence of producers.

use crate::producer::{Producer, ProducerSpec};
use hcalrecon_core::config::ConfigResult;
use hcalrecon_core::event::Event;
use log::warn;
use rayon::prelude::*;

/// Counters from [`Process::run`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProcessStatistics {
    /// Events processed.
    pub events: usize,
    /// Producer runs that completed.
    pub producer_runs: usize,
    /// Producer runs skipped because of an error.
    pub producer_failures: usize,
}

impl ProcessStatistics {
    /// Sums two sets of counters.
    #[must_use]
    pub fn merge(self, other: Self) -> Self {
        Self {
            events: self.events + other.events,
            producer_runs: self.producer_runs + other.producer_runs,
            producer_failures: self.producer_failures + other.producer_failures,
        }
    }
}

/// Ordered list of producers applied to every event.
#[derive(Default)]
pub struct Process {
    producers: Vec<Box<dyn Producer>>,
}

impl Process {
    /// Creates an empty process.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds every producer of a configuration, in order.
    ///
    /// # Errors
    /// Returns the first configuration error encountered.
    pub fn from_specs(specs: &[ProducerSpec]) -> ConfigResult<Self> {
        let producers = specs
            .iter()
            .map(ProducerSpec::build)
            .collect::<ConfigResult<Vec<_>>>()?;
        Ok(Self { producers })
    }

    /// Appends a producer.
    pub fn push(&mut self, producer: Box<dyn Producer>) {
        self.producers.push(producer);
    }

    /// Configured producers, in run order.
    pub fn producers(&self) -> impl Iterator<Item = &dyn Producer> {
        self.producers.iter().map(Box::as_ref)
    }

    /// Runs every producer on one event.
    ///
    /// A failing producer is logged and skipped; the remaining producers
    /// still run.
    pub fn process_event(&self, event: &mut Event) -> ProcessStatistics {
        let mut stats = ProcessStatistics {
            events: 1,
            ..ProcessStatistics::default()
        };
        for producer in &self.producers {
            match producer.produce(event) {
                Ok(()) => stats.producer_runs += 1,
                Err(err) => {
                    warn!("[{}] skipping event {}: {err}", producer.name(), event.number());
                    stats.producer_failures += 1;
                }
            }
        }
        stats
    }

    /// Processes independent events in parallel.
    pub fn run(&self, events: &mut [Event]) -> ProcessStatistics {
        events
            .par_iter_mut()
            .map(|event| self.process_event(event))
            .reduce(ProcessStatistics::default, ProcessStatistics::merge)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::producer::{default_specs, MIP_TRIGGER_PRODUCER, MUON_TRIGGER};
    use hcalrecon_core::config::ParameterSet;
    use hcalrecon_core::error::ConfigError;
    use hcalrecon_core::event::InputTag;
    use hcalrecon_core::hit::{HcalHit, Section};

    #[test]
    fn test_from_specs() {
        let process = Process::from_specs(&default_specs()).unwrap();
        assert_eq!(process.producers().count(), 4);

        let bad = ProducerSpec {
            parameters: ParameterSet::new().with("MinConsecutiveLayersHitFrontHcal", 2),
            ..ProducerSpec::new("m", MUON_TRIGGER)
        };
        assert!(matches!(
            Process::from_specs(&[bad]),
            Err(ConfigError::UnknownSection(_))
        ));
    }

    #[test]
    fn test_missing_collection_skips_producer_only() {
        let process = Process::from_specs(&default_specs()).unwrap();
        let mut with_hits = Event::new(1);
        with_hits.insert_collection(
            InputTag::default(),
            vec![HcalHit::new(Section::Back, 1, 3, 10.0, 1.0)],
        );
        let mut events = vec![Event::new(0), with_hits];

        let stats = process.run(&mut events);
        assert_eq!(stats.events, 2);
        assert_eq!(stats.producer_failures, 4);
        assert_eq!(stats.producer_runs, 4);
        assert!(events[0].products().is_empty());
        assert_eq!(events[1].products().len(), 5);
    }

    #[test]
    fn test_two_mip_triggers_in_one_process() {
        let mip = |name: &str, trigger: &str| ProducerSpec {
            parameters: ParameterSet::new().with("HcalMipTriggerObjectName", trigger),
            ..ProducerSpec::new(name, MIP_TRIGGER_PRODUCER)
        };
        let process = Process::from_specs(&[
            mip("cosmicMip", "hcalCosmicMuonTrigger"),
            mip("targetMip", "hcalTargetMuonTrigger"),
        ])
        .unwrap();
        let mut event = Event::new(3);
        event.insert_collection(
            InputTag::default(),
            (1..=12)
                .map(|layer| HcalHit::new(Section::Left, layer, 6, 10.0, 1.0))
                .collect(),
        );
        let mut events = vec![event];

        let stats = process.run(&mut events);
        assert_eq!(stats.producer_failures, 0);
        assert_eq!(stats.producer_runs, 2);
        let names: Vec<&str> = events[0].products().keys().map(String::as_str).collect();
        assert_eq!(
            names,
            [
                "hcalCosmicMuonTracks",
                "hcalCosmicMuonTrigger",
                "hcalTargetMuonTracks",
                "hcalTargetMuonTrigger"
            ]
        );
    }

    #[test]
    fn test_statistics_merge() {
        let a = ProcessStatistics {
            events: 3,
            producer_runs: 10,
            producer_failures: 2,
        };
        let b = ProcessStatistics {
            events: 1,
            producer_runs: 4,
            producer_failures: 0,
        };
        assert_eq!(
            a.merge(b),
            ProcessStatistics {
                events: 4,
                producer_runs: 14,
                producer_failures: 2,
            }
        );
        assert_eq!(ProcessStatistics::default().merge(a), a);
    }
}
