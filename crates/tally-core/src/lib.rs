//! # tally-core
//! Foundation types, scoring and case rules for vote-abuse detection.
//!
//! Everything in this crate is pure computation: no storage, no locks, no IO.
//! Storage and counters are reached through the traits in [`traits`].

pub mod clock;
pub mod config;
pub mod constants;
pub mod error;
pub mod health;
pub mod reward;
pub mod scoring;
pub mod stats;
pub mod traits;
pub mod types;
pub mod workflow;

pub use config::EngineConfig;
pub use error::{ConfigError, StoreError, TallyError, WorkflowError};
pub use reward::RewardPolicy;
pub use scoring::{RiskAssessment, RiskScorer};
