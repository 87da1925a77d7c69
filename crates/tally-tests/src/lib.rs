//! Cross-crate test suite for Tally.
//!
//! Integration tests drive the full vote pipeline through [`AbuseEngine`]
//! with in-memory collaborators and a manual clock, covering abuse
//! scenarios, racing operators and randomized invariants.
//!
//! [`AbuseEngine`]: tally_engine::AbuseEngine

pub mod helpers;
