//! # tally-engine
//! Composes scoring, reward gating, case storage and the investigation
//! workflow behind [`AbuseEngine`].
//!
//! - [`engine`]: the `Evaluate` / `Investigate` / statistics / health facade
//! - [`store`]: in-memory [`CaseStore`](tally_core::traits::CaseStore)
//! - [`workflow`]: applies lifecycle transitions with compare-and-set
//! - [`monitor`]: live vote and active-case counters
//! - [`plans`]: in-memory [`PlanDirectory`](tally_core::traits::PlanDirectory)
//! - [`settings`]: configuration loading from file and environment

pub mod engine;
pub mod monitor;
pub mod plans;
pub mod settings;
pub mod store;
pub mod workflow;

pub use engine::{AbuseEngine, EngineBuilder};
pub use monitor::HealthMonitor;
pub use plans::StaticPlanDirectory;
pub use store::MemoryCaseStore;
pub use workflow::InvestigationWorkflow;
