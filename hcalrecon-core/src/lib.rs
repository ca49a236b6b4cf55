//! hcalrecon-core: Core types for Hcal reconstruction.
//!
//! This crate provides the data model shared by the reconstruction
//! algorithms: sections and hits, clusters, tracks, trigger decisions,
//! the per-event container and the parameter-set configuration surface.
//!

pub mod cluster;
pub mod config;
pub mod error;
pub mod event;
pub mod hit;
pub mod track;
pub mod trigger;

pub use cluster::Cluster;
pub use config::{ConfigResult, ParameterSet};
pub use error::{ConfigError, Error, Result};
pub use event::{Event, InputTag, Product};
pub use hit::{HcalGeometry, HcalHit, PerSection, Section};
pub use track::{Track, TrackLayer};
pub use trigger::TriggerDecision;
