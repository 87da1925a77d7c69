//! Engine configuration.
//!
//! Every threshold and weight the engine uses lives here so it can be tuned
//! without a code change. All sections deserialize with `#[serde(default)]`,
//! so a configuration source only needs to name the values it overrides.
//! Loading from files and the environment happens in `tally-engine`; this
//! module owns the shape and [`EngineConfig::validate`].

use serde::{Deserialize, Serialize};

use crate::constants::*;
use crate::error::ConfigError;
use crate::types::PlanTier;

/// Thresholds and weights for the risk heuristics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    pub self_vote_weight: f64,
    pub min_account_age_secs: u64,
    pub account_age_weight: f64,
    pub hourly_vote_limit: u64,
    pub daily_vote_limit: u64,
    pub excessive_rate_weight: f64,
    pub ip_vote_limit: u64,
    pub ip_cluster_weight: f64,
    pub ip_user_limit: u64,
    pub coordinated_weight: f64,
    pub burst_window_secs: u64,
    pub burst_vote_limit: u64,
    pub burst_weight: f64,
    pub author_vote_limit: u64,
    pub manipulation_weight: f64,
    /// Votes scoring strictly above this line are high-risk.
    pub high_risk_threshold: f64,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            self_vote_weight: DEFAULT_SELF_VOTE_WEIGHT,
            min_account_age_secs: DEFAULT_MIN_ACCOUNT_AGE_SECS,
            account_age_weight: DEFAULT_ACCOUNT_AGE_WEIGHT,
            hourly_vote_limit: DEFAULT_HOURLY_VOTE_LIMIT,
            daily_vote_limit: DEFAULT_DAILY_VOTE_LIMIT,
            excessive_rate_weight: DEFAULT_EXCESSIVE_RATE_WEIGHT,
            ip_vote_limit: DEFAULT_IP_VOTE_LIMIT,
            ip_cluster_weight: DEFAULT_IP_CLUSTER_WEIGHT,
            ip_user_limit: DEFAULT_IP_USER_LIMIT,
            coordinated_weight: DEFAULT_COORDINATED_WEIGHT,
            burst_window_secs: DEFAULT_BURST_WINDOW_SECS,
            burst_vote_limit: DEFAULT_BURST_VOTE_LIMIT,
            burst_weight: DEFAULT_BURST_WEIGHT,
            author_vote_limit: DEFAULT_AUTHOR_VOTE_LIMIT,
            manipulation_weight: DEFAULT_MANIPULATION_WEIGHT,
            high_risk_threshold: DEFAULT_HIGH_RISK_THRESHOLD,
        }
    }
}

impl ScoringConfig {
    fn weights(&self) -> [(&'static str, f64); 8] {
        [
            ("scoring.self_vote_weight", self.self_vote_weight),
            ("scoring.account_age_weight", self.account_age_weight),
            ("scoring.excessive_rate_weight", self.excessive_rate_weight),
            ("scoring.ip_cluster_weight", self.ip_cluster_weight),
            ("scoring.coordinated_weight", self.coordinated_weight),
            ("scoring.burst_weight", self.burst_weight),
            ("scoring.manipulation_weight", self.manipulation_weight),
            ("scoring.high_risk_threshold", self.high_risk_threshold),
        ]
    }
}

/// Credits granted per upvote, by plan tier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RewardConfig {
    pub free: u32,
    pub starter: u32,
    pub pro: u32,
    pub enterprise: u32,
}

impl Default for RewardConfig {
    fn default() -> Self {
        Self {
            free: DEFAULT_FREE_CREDITS,
            starter: DEFAULT_STARTER_CREDITS,
            pro: DEFAULT_PRO_CREDITS,
            enterprise: DEFAULT_ENTERPRISE_CREDITS,
        }
    }
}

impl RewardConfig {
    pub fn credits_for(&self, tier: PlanTier) -> u32 {
        match tier {
            PlanTier::Free => self.free,
            PlanTier::Starter => self.starter,
            PlanTier::Pro => self.pro,
            PlanTier::Enterprise => self.enterprise,
        }
    }
}

/// Rolling-window sizes for the activity tracker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ActivityConfig {
    pub ip_window_secs: u64,
    pub max_tracked_votes: usize,
    pub recent_vote_sample: usize,
    pub max_ip_votes: usize,
    /// Observations between idle-key sweeps.
    pub eviction_interval: u64,
}

impl Default for ActivityConfig {
    fn default() -> Self {
        Self {
            ip_window_secs: DEFAULT_IP_WINDOW_SECS,
            max_tracked_votes: DEFAULT_MAX_TRACKED_VOTES,
            recent_vote_sample: DEFAULT_RECENT_VOTE_SAMPLE,
            max_ip_votes: DEFAULT_MAX_IP_VOTES,
            eviction_interval: DEFAULT_EVICTION_INTERVAL,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StatisticsConfig {
    pub top_offenders: usize,
}

impl Default for StatisticsConfig {
    fn default() -> Self {
        Self {
            top_offenders: DEFAULT_TOP_OFFENDERS,
        }
    }
}

/// Complete engine configuration.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub scoring: ScoringConfig,
    pub rewards: RewardConfig,
    pub activity: ActivityConfig,
    pub statistics: StatisticsConfig,
}

impl EngineConfig {
    /// Reject configurations the engine cannot run with.
    ///
    /// Called before the engine accepts any vote; a failure here is fatal.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (field, value) in self.scoring.weights() {
            if !value.is_finite() || value < 0.0 {
                return Err(invalid(field, format!("must be a finite non-negative number, got {value}")));
            }
        }
        if self.scoring.high_risk_threshold > MAX_RISK_SCORE {
            return Err(invalid(
                "scoring.high_risk_threshold",
                format!("must not exceed {MAX_RISK_SCORE}"),
            ));
        }
        check_window("scoring.burst_window_secs", self.scoring.burst_window_secs)?;

        let credits: Vec<u32> = PlanTier::ALL
            .iter()
            .map(|t| self.rewards.credits_for(*t))
            .collect();
        if credits.windows(2).any(|w| w[0] > w[1]) {
            return Err(invalid(
                "rewards",
                format!("credits must not decrease with plan rank, got {credits:?}"),
            ));
        }

        check_window("activity.ip_window_secs", self.activity.ip_window_secs)?;
        if self.activity.eviction_interval == 0 {
            return Err(invalid("activity.eviction_interval", "must be positive".into()));
        }

        // A limit at or above the tracker's cap can never be exceeded.
        let scoring = &self.scoring;
        let activity = &self.activity;
        for (field, limit, cap_field, cap) in [
            ("scoring.hourly_vote_limit", scoring.hourly_vote_limit, "activity.max_tracked_votes", activity.max_tracked_votes),
            ("scoring.daily_vote_limit", scoring.daily_vote_limit, "activity.max_tracked_votes", activity.max_tracked_votes),
            ("scoring.burst_vote_limit", scoring.burst_vote_limit, "activity.recent_vote_sample", activity.recent_vote_sample),
            ("scoring.ip_vote_limit", scoring.ip_vote_limit, "activity.max_ip_votes", activity.max_ip_votes),
        ] {
            if limit >= u64::try_from(cap).unwrap_or(u64::MAX) {
                return Err(invalid(field, format!("must be below {cap_field} ({cap}), got {limit}")));
            }
        }
        if self.statistics.top_offenders == 0 {
            return Err(invalid("statistics.top_offenders", "must be positive".into()));
        }
        Ok(())
    }
}

fn check_window(field: &'static str, secs: u64) -> Result<(), ConfigError> {
    if secs == 0 || secs > MAX_WINDOW_SECS {
        return Err(invalid(field, format!("must be between 1 and {MAX_WINDOW_SECS} seconds, got {secs}")));
    }
    Ok(())
}

fn invalid(field: &'static str, reason: String) -> ConfigError {
    ConfigError::Invalid { field, reason }
}
