//! Live counters for system health.
//!
//! Vote throughput and the active-case gauge are updated on the hot path
//! with atomics. Case-derived figures (false-positive rate, resolution time)
//! are recomputed from the store on read by [`tally_core::health::assess`].

use std::sync::atomic::{AtomicU64, Ordering};

use tracing::warn;

use tally_core::health::{self, SystemHealthSnapshot, VoteCounters};
use tally_core::types::AbuseCase;

#[derive(Debug, Default)]
pub struct HealthMonitor {
    evaluated: AtomicU64,
    flagged: AtomicU64,
    active: AtomicU64,
}

impl HealthMonitor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start the active-case gauge at `active`, e.g. from cases already in
    /// a persistent store.
    pub fn with_active_cases(active: u64) -> Self {
        Self {
            active: AtomicU64::new(active),
            ..Self::default()
        }
    }

    pub fn record_evaluation(&self, flagged: bool) {
        self.evaluated.fetch_add(1, Ordering::Relaxed);
        if flagged {
            self.flagged.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// A case is about to be stored. Counted before the store sees it so a
    /// close racing the creation never finds the gauge at zero.
    pub fn case_opened(&self) {
        self.active.fetch_add(1, Ordering::AcqRel);
    }

    /// The store refused a case counted by [`case_opened`](Self::case_opened).
    pub fn case_discarded(&self) {
        if !self.decrement() {
            warn!("monitor: case discarded with active gauge already at zero");
        }
    }

    /// A case reached a terminal state. Called once per case, after the
    /// store accepted the transition.
    pub fn case_closed(&self) {
        if !self.decrement() {
            warn!("monitor: case closed with active gauge already at zero");
        }
    }

    fn decrement(&self) -> bool {
        self.active
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| n.checked_sub(1))
            .is_ok()
    }

    /// Current value of the active-case gauge.
    pub fn active_cases(&self) -> u64 {
        self.active.load(Ordering::Acquire)
    }

    pub fn counters(&self) -> VoteCounters {
        VoteCounters {
            evaluated: self.evaluated.load(Ordering::Relaxed),
            flagged: self.flagged.load(Ordering::Relaxed),
        }
    }

    pub fn snapshot(&self, cases: &[AbuseCase]) -> SystemHealthSnapshot {
        health::assess(cases, self.counters())
    }
}
