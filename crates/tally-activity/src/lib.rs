//! # tally-activity
//! Rolling vote counters.
//!
//! [`RateWindowTracker`] keeps per-voter, per-(voter, author) and per-IP
//! sliding windows and implements [`ActivityStore`](tally_core::traits::ActivityStore).
//! Each key is updated under its own map entry lock, so record-then-read is
//! atomic per key and different keys never contend on shared state.

pub mod tracker;

pub use tracker::RateWindowTracker;
