//! Credit gating for votes.
//!
//! Only upvotes earn credits. A high-risk vote (risk score strictly above
//! the configured line, 0.5 by default) earns nothing whatever the plan.
//! Every other upvote earns the plan's fixed amount, even when low or
//! medium-severity heuristics fired: a single noisy signal such as one
//! self-vote attempt is tolerated rather than zeroing the reward.

use crate::config::{RewardConfig, ScoringConfig};
use crate::types::{PlanTier, Polarity, VoteEvent};

#[derive(Debug, Clone)]
pub struct RewardPolicy {
    credits: RewardConfig,
    high_risk_threshold: f64,
}

impl Default for RewardPolicy {
    fn default() -> Self {
        Self::new(RewardConfig::default(), &ScoringConfig::default())
    }
}

impl RewardPolicy {
    /// The high-risk line is shared with the scorer so both agree on what
    /// "high-risk" means.
    pub fn new(credits: RewardConfig, scoring: &ScoringConfig) -> Self {
        Self {
            credits,
            high_risk_threshold: scoring.high_risk_threshold,
        }
    }

    /// Credits to grant for a vote of `polarity` by a voter on `tier`.
    pub fn decide(&self, polarity: Polarity, tier: PlanTier, risk_score: f64) -> u32 {
        if polarity != Polarity::Up || risk_score > self.high_risk_threshold {
            return 0;
        }
        self.credits.credits_for(tier)
    }

    /// [`decide`](Self::decide) using the plan carried on the event.
    pub fn decide_for(&self, event: &VoteEvent, risk_score: f64) -> u32 {
        self.decide(event.polarity, event.plan, risk_score)
    }
}
