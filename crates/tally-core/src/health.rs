//! Operational health derived from the case set.

use serde::{Deserialize, Serialize};

use crate::constants::SECS_PER_HOUR;
use crate::types::{AbuseCase, CaseStatus};

/// Vote throughput counters kept by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct VoteCounters {
    pub evaluated: u64,
    /// Votes for which at least one heuristic fired.
    pub flagged: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SystemHealthSnapshot {
    /// Cases not yet in a terminal state.
    pub active_cases: u64,
    pub pending_cases: u64,
    pub investigating_cases: u64,
    pub total_cases: u64,
    pub votes_evaluated: u64,
    pub votes_flagged: u64,
    /// `flagged / evaluated`, zero before the first vote.
    pub detection_rate: f64,
    /// FALSE_POSITIVE over all terminal cases, zero when none are terminal.
    pub false_positive_rate: f64,
    /// Mean hours from detection to resolution over terminal cases.
    pub average_resolution_hours: f64,
}

/// Derive a health snapshot from `cases` and the engine's vote counters.
pub fn assess(cases: &[AbuseCase], votes: VoteCounters) -> SystemHealthSnapshot {
    let mut pending = 0u64;
    let mut investigating = 0u64;
    let mut false_positives = 0u64;
    let mut terminal = 0u64;
    let mut resolution_secs = 0i64;
    let mut timed = 0u64;

    for case in cases {
        match case.status {
            CaseStatus::Pending => pending += 1,
            CaseStatus::Investigating => investigating += 1,
            CaseStatus::Resolved | CaseStatus::FalsePositive => {
                terminal += 1;
                if case.status == CaseStatus::FalsePositive {
                    false_positives += 1;
                }
                if let Some(took) = case.resolution_time() {
                    resolution_secs = resolution_secs.saturating_add(took.num_seconds());
                    timed += 1;
                }
            }
        }
    }

    SystemHealthSnapshot {
        active_cases: pending + investigating,
        pending_cases: pending,
        investigating_cases: investigating,
        total_cases: cases.len() as u64,
        votes_evaluated: votes.evaluated,
        votes_flagged: votes.flagged,
        detection_rate: ratio(votes.flagged, votes.evaluated),
        false_positive_rate: ratio(false_positives, terminal),
        average_resolution_hours: if timed == 0 {
            0.0
        } else {
            resolution_secs as f64 / timed as f64 / SECS_PER_HOUR as f64
        },
    }
}

fn ratio(part: u64, whole: u64) -> f64 {
    if whole == 0 { 0.0 } else { part as f64 / whole as f64 }
}
