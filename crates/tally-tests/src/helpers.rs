//! Shared builders for integration tests.

use std::net::IpAddr;
use std::sync::Arc;

use chrono::{DateTime, Duration, TimeZone, Utc};

use tally_core::clock::ManualClock;
use tally_core::config::EngineConfig;
use tally_core::types::{ActivitySnapshot, CaseId, PlanTier, Polarity, VoteEvent};
use tally_engine::AbuseEngine;

/// Fixed reference instant used by every test.
pub fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
}

/// A clean upvote at [`t0`]: Pro plan, 30-day-old account, distinct voter
/// and author.
pub fn vote(voter: &str, author: &str) -> VoteEvent {
    VoteEvent {
        voter: voter.into(),
        author: author.into(),
        polarity: Polarity::Up,
        plan: PlanTier::Pro,
        account_created_at: t0() - Duration::days(30),
        ip: IpAddr::from([203, 0, 113, 5]),
        user_agent: "Mozilla/5.0".into(),
        timestamp: t0(),
    }
}

/// [`vote`] cast at `at`.
pub fn vote_at(voter: &str, author: &str, at: DateTime<Utc>) -> VoteEvent {
    VoteEvent {
        timestamp: at,
        ..vote(voter, author)
    }
}

/// [`vote_at`] from `ip`.
pub fn vote_from(voter: &str, author: &str, ip: [u8; 4], at: DateTime<Utc>) -> VoteEvent {
    VoteEvent {
        ip: IpAddr::from(ip),
        ..vote_at(voter, author, at)
    }
}

/// Activity counters that trip every rate heuristic at once.
pub fn hostile_activity(now: DateTime<Utc>) -> ActivitySnapshot {
    ActivitySnapshot {
        votes_last_hour: 25,
        votes_last_day: 120,
        votes_last_week: 300,
        votes_on_author: 11,
        votes_from_ip: 60,
        distinct_users_from_ip: 8,
        recent_votes: (0..6).map(|i| now - Duration::seconds(i * 4)).collect(),
    }
}

/// An engine with default configuration and a manual clock at [`t0`].
pub fn engine() -> (AbuseEngine, Arc<ManualClock>) {
    engine_with(EngineConfig::default())
}

pub fn engine_with(config: EngineConfig) -> (AbuseEngine, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::new(t0()));
    let engine = AbuseEngine::builder(config)
        .clock(clock.clone())
        .build()
        .unwrap();
    (engine, clock)
}

/// Open a self-vote case for `voter` and return its id.
pub fn open_self_vote_case(engine: &AbuseEngine, voter: &str, at: DateTime<Utc>) -> CaseId {
    engine
        .evaluate(&vote_at(voter, voter, at))
        .unwrap()
        .case
        .expect("self-vote opens a case")
        .id
}
