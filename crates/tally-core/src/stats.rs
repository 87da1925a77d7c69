//! Aggregate statistics over abuse cases.
//!
//! Recomputed from the case list on every read; nothing here is stored.
//! Kind and severity counts are per detection (a case with three detections
//! counts three times); status counts are per case.

use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{AbuseCase, CaseStatus, DetectionKind, Severity, UserId};

/// Detection-time restriction applied before summarizing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatsWindow {
    #[default]
    All,
    Last24Hours,
    Last7Days,
    Last30Days,
}

impl StatsWindow {
    /// Lower bound on detection time, or `None` for no restriction.
    pub fn since(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        match self {
            Self::All => None,
            Self::Last24Hours => Some(now - Duration::hours(24)),
            Self::Last7Days => Some(now - Duration::days(7)),
            Self::Last30Days => Some(now - Duration::days(30)),
        }
    }
}

/// Cases detected within trailing windows ending at `now`, inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TrendCounts {
    pub last_24h: u64,
    pub last_7d: u64,
    pub last_30d: u64,
}

/// One voter in the top-offender ranking.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Offender {
    pub voter: UserId,
    pub detection_count: u64,
    pub case_count: u64,
    pub worst_severity: Severity,
    pub last_detected_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AbuseStatistics {
    pub total_cases: u64,
    pub total_detections: u64,
    /// Mean case risk score; zero when there are no cases.
    pub average_risk_score: f64,
    pub by_kind: BTreeMap<DetectionKind, u64>,
    pub by_severity: BTreeMap<Severity, u64>,
    pub by_status: BTreeMap<CaseStatus, u64>,
    pub trends: TrendCounts,
    pub top_offenders: Vec<Offender>,
}

/// Summarize `cases` as of `now`, keeping the `top_n` worst offenders.
///
/// Every kind, severity and status appears in its map, zero if unseen.
/// Offenders rank by detection count, then worst severity, then most recent
/// detection; remaining ties fall back to voter id so output is stable.
pub fn summarize(cases: &[AbuseCase], now: DateTime<Utc>, top_n: usize) -> AbuseStatistics {
    let mut by_kind: BTreeMap<DetectionKind, u64> = DetectionKind::ALL.iter().map(|k| (*k, 0)).collect();
    let mut by_severity: BTreeMap<Severity, u64> = Severity::ALL.iter().map(|s| (*s, 0)).collect();
    let mut by_status: BTreeMap<CaseStatus, u64> = CaseStatus::ALL.iter().map(|s| (*s, 0)).collect();
    let mut trends = TrendCounts::default();
    let mut offenders: HashMap<&UserId, Offender> = HashMap::new();
    let mut total_detections = 0u64;
    let mut risk_sum = 0.0;

    for case in cases {
        *by_status.entry(case.status).or_default() += 1;
        risk_sum += case.risk_score;

        for d in &case.detections {
            *by_kind.entry(d.kind).or_default() += 1;
            *by_severity.entry(d.severity).or_default() += 1;
        }
        let detections = case.detections.len() as u64;
        total_detections += detections;

        if case.detected_at <= now {
            let age = now - case.detected_at;
            if age <= Duration::hours(24) {
                trends.last_24h += 1;
            }
            if age <= Duration::days(7) {
                trends.last_7d += 1;
            }
            if age <= Duration::days(30) {
                trends.last_30d += 1;
            }
        }

        let worst = case.highest_severity().unwrap_or(Severity::Low);
        offenders
            .entry(&case.voter)
            .and_modify(|o| {
                o.detection_count += detections;
                o.case_count += 1;
                o.worst_severity = o.worst_severity.max(worst);
                o.last_detected_at = o.last_detected_at.max(case.detected_at);
            })
            .or_insert_with(|| Offender {
                voter: case.voter.clone(),
                detection_count: detections,
                case_count: 1,
                worst_severity: worst,
                last_detected_at: case.detected_at,
            });
    }

    let mut top_offenders: Vec<Offender> = offenders.into_values().collect();
    top_offenders.sort_by(rank_offenders);
    top_offenders.truncate(top_n);

    let total_cases = cases.len() as u64;
    AbuseStatistics {
        total_cases,
        total_detections,
        average_risk_score: if total_cases == 0 { 0.0 } else { risk_sum / total_cases as f64 },
        by_kind,
        by_severity,
        by_status,
        trends,
        top_offenders,
    }
}

fn rank_offenders(a: &Offender, b: &Offender) -> Ordering {
    b.detection_count
        .cmp(&a.detection_count)
        .then_with(|| b.worst_severity.cmp(&a.worst_severity))
        .then_with(|| b.last_detected_at.cmp(&a.last_detected_at))
        .then_with(|| a.voter.cmp(&b.voter))
}
