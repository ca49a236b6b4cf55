//! hcalrecon-algorithms: Hcal reconstruction algorithms.
//!
//! This crate provides:
//! - **Track finding** - noise filter, strip clustering, seeded cone search
//!   and layer-count validation ([`TrackFinder`])
//! - **Consecutive-hit trigger** - per-section layer/strip run thresholds for
//!   cosmic and target muons ([`ConsecutiveHitTrigger`])
//! - **MIP trigger** - single centerline track with fraction and hit-count
//!   tests ([`MipTriggerEvaluator`])
//! - **Producers** - event-level wrappers and a parallel event loop
//!   ([`Process`])
//!
#![warn(missing_docs)]

pub mod clustering;
mod consecutive;
mod filter;
pub mod follower;
mod mip;
mod processing;
pub mod producer;
mod seed;
mod tracking;
mod validator;

pub use clustering::{ClusterId, ClusterMap, Clusterer};
pub use consecutive::{ConsecutiveHitConfig, ConsecutiveHitTrigger, SectionRuns};
pub use filter::{FilterStatistics, HitFilter};
pub use follower::{Candidate, ConeTrackFollower, FollowState};
pub use mip::{
    FractionPolicy, HitCountPolicy, MipTriggerConfig, MipTriggerEvaluator, MipTriggerResult,
    SectionScan,
};
pub use processing::{Process, ProcessStatistics};
pub use producer::{
    default_specs, MipTriggerProducer, MuonOrigin, MuonTriggerProducer, Producer, ProducerSpec,
    TrackProducer,
};
pub use seed::SeedFinder;
pub use tracking::{TrackFinder, TrackingConfig, TrackingStatistics};
pub use validator::TrackValidator;
