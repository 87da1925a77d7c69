//! Risk scoring engine.
//!
//! Pure computation: no storage, no IO, no clock. The instant a vote is
//! scored against is the vote's own timestamp, so scoring the same event
//! with the same activity snapshot always yields the same result.
//!
//! Every heuristic is evaluated independently and unconditionally. Each one
//! that fires appends its own [`Detection`] and contributes its weight once;
//! the sum is clamped to [`MAX_RISK_SCORE`].
//!
//! | Heuristic                  | Fires when                                   | Severity | Weight |
//! |----------------------------|----------------------------------------------|----------|--------|
//! | Self-vote                  | voter == author                              | MEDIUM   | 0.3    |
//! | Suspicious account age     | account younger than 3 days                  | MEDIUM   | 0.3    |
//! | Excessive rate (hourly)    | votes in last hour > 20                      | HIGH     | 0.6    |
//! | Excessive rate (daily)     | votes in last day > 100                      | HIGH     | 0.6    |
//! | IP clustering (volume)     | votes from IP > 50                           | HIGH     | 0.6    |
//! | IP clustering (coordinated)| distinct users from IP > 5                   | HIGH     | 0.6    |
//! | Rapid voting burst         | > 5 recent votes in the trailing 30 seconds  | HIGH     | 0.6    |
//! | Vote manipulation          | votes on this author > 10                    | MEDIUM   | 0.3    |
//!
//! The limits and weights above are the defaults in [`ScoringConfig`].

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::config::ScoringConfig;
use crate::constants::MAX_RISK_SCORE;
use crate::types::{ActivitySnapshot, Detection, DetectionKind, VoteEvent};

/// Result of scoring one vote.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskAssessment {
    /// Composite score in `[0, 1]`.
    pub risk_score: f64,
    /// `risk_score` strictly above the configured high-risk line.
    pub high_risk: bool,
    /// Fired heuristics in evaluation order.
    pub detections: Vec<Detection>,
}

impl RiskAssessment {
    pub fn abuse_detected(&self) -> bool {
        !self.detections.is_empty()
    }
}

/// Scores vote events against a fixed set of heuristics.
#[derive(Debug, Clone, Default)]
pub struct RiskScorer {
    config: ScoringConfig,
}

impl RiskScorer {
    pub fn new(config: ScoringConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ScoringConfig {
        &self.config
    }

    /// Evaluate every heuristic against `event` and `activity`.
    ///
    /// Never fails: counters the caller could not supply are zero in
    /// [`ActivitySnapshot::default`], which reads as a quiet voter.
    pub fn score(&self, event: &VoteEvent, activity: &ActivitySnapshot) -> RiskAssessment {
        let cfg = &self.config;
        let now = event.timestamp;

        let detections: Vec<Detection> = [
            self.self_vote(event),
            self.account_age(event, now),
            exceeds(
                DetectionKind::ExcessiveVotingRate,
                "votes_last_hour",
                cfg.hourly_vote_limit,
                activity.votes_last_hour,
                cfg.excessive_rate_weight,
            ),
            exceeds(
                DetectionKind::ExcessiveVotingRate,
                "votes_last_day",
                cfg.daily_vote_limit,
                activity.votes_last_day,
                cfg.excessive_rate_weight,
            ),
            exceeds(
                DetectionKind::IpClustering,
                "votes_from_ip",
                cfg.ip_vote_limit,
                activity.votes_from_ip,
                cfg.ip_cluster_weight,
            ),
            exceeds(
                DetectionKind::CoordinatedVoting,
                "distinct_users_from_ip",
                cfg.ip_user_limit,
                activity.distinct_users_from_ip,
                cfg.coordinated_weight,
            ),
            exceeds(
                DetectionKind::RapidVotingPattern,
                "votes_in_burst_window",
                cfg.burst_vote_limit,
                self.burst_count(&activity.recent_votes, now),
                cfg.burst_weight,
            ),
            exceeds(
                DetectionKind::VoteManipulation,
                "votes_on_author",
                cfg.author_vote_limit,
                activity.votes_on_author,
                cfg.manipulation_weight,
            ),
        ]
        .into_iter()
        .flatten()
        .collect();

        let sum: f64 = detections.iter().map(|d| d.weight).sum();
        let risk_score = sum.clamp(0.0, MAX_RISK_SCORE);

        RiskAssessment {
            risk_score,
            high_risk: risk_score > cfg.high_risk_threshold,
            detections,
        }
    }

    fn self_vote(&self, event: &VoteEvent) -> Option<Detection> {
        event.is_self_vote().then(|| {
            Detection::new(DetectionKind::SelfVoteAttempt, self.config.self_vote_weight, "self_vote", 0, 1)
        })
    }

    fn account_age(&self, event: &VoteEvent, now: DateTime<Utc>) -> Option<Detection> {
        // An account created "after" the vote is clock skew or forgery; treat
        // it as brand new.
        let age_secs = (now - event.account_created_at).num_seconds().max(0) as u64;
        (age_secs < self.config.min_account_age_secs).then(|| {
            Detection::new(
                DetectionKind::SuspiciousAccountAge,
                self.config.account_age_weight,
                "account_age_secs",
                self.config.min_account_age_secs,
                age_secs,
            )
        })
    }

    /// Votes falling inside `[now - window, now]`. Measured from the vote
    /// instant, not between consecutive votes. A window reaching past the
    /// representable range covers every earlier vote.
    fn burst_count(&self, recent: &[DateTime<Utc>], now: DateTime<Utc>) -> u64 {
        let cutoff = i64::try_from(self.config.burst_window_secs)
            .ok()
            .and_then(Duration::try_seconds)
            .and_then(|window| now.checked_sub_signed(window));
        recent
            .iter()
            .filter(|t| **t <= now && cutoff.is_none_or(|c| **t >= c))
            .count() as u64
    }
}

fn exceeds(kind: DetectionKind, metric: &str, limit: u64, observed: u64, weight: f64) -> Option<Detection> {
    (observed > limit).then(|| Detection::new(kind, weight, metric, limit, observed))
}
