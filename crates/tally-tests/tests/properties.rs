//! Randomized invariants for scoring, reward gating and the case lifecycle.
//!
//! Each property runs 256 cases with proptest shrinking.

use std::net::IpAddr;

use chrono::Duration;
use proptest::prelude::*;

use tally_core::config::RewardConfig;
use tally_core::error::{TallyError, WorkflowError};
use tally_core::reward::RewardPolicy;
use tally_core::scoring::RiskScorer;
use tally_core::types::{ActivitySnapshot, CaseStatus, DetectionKind, PlanTier, Polarity, VoteEvent};
use tally_tests::helpers::*;

fn arb_tier() -> impl Strategy<Value = PlanTier> {
    prop::sample::select(PlanTier::ALL.to_vec())
}

fn arb_polarity() -> impl Strategy<Value = Polarity> {
    prop_oneof![Just(Polarity::Up), Just(Polarity::Down)]
}

fn arb_activity() -> impl Strategy<Value = ActivitySnapshot> {
    (
        0u64..200,
        0u64..500,
        0u64..30,
        0u64..120,
        0u64..15,
        prop::collection::vec(-120i64..120, 0..20),
    )
        .prop_map(|(hour, day, author, ip_votes, ip_users, offsets)| ActivitySnapshot {
            votes_last_hour: hour,
            votes_last_day: day,
            votes_last_week: day,
            votes_on_author: author,
            votes_from_ip: ip_votes,
            distinct_users_from_ip: ip_users,
            recent_votes: offsets.into_iter().map(|s| t0() + Duration::seconds(s)).collect(),
        })
}

fn arb_event() -> impl Strategy<Value = VoteEvent> {
    (
        prop::sample::select(vec!["alice", "bob", "carol"]),
        prop::sample::select(vec!["alice", "bob", "carol"]),
        arb_polarity(),
        arb_tier(),
        -30i64..400,
        any::<[u8; 4]>(),
    )
        .prop_map(|(voter, author, polarity, plan, age_hours, ip)| VoteEvent {
            polarity,
            plan,
            account_created_at: t0() - Duration::hours(age_hours),
            ip: IpAddr::from(ip),
            ..vote(voter, author)
        })
}

// ---------------------------------------------------------------------------
// Scoring
// ---------------------------------------------------------------------------

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    #[test]
    fn risk_score_stays_in_unit_interval(event in arb_event(), activity in arb_activity()) {
        let a = RiskScorer::default().score(&event, &activity);
        prop_assert!((0.0..=1.0).contains(&a.risk_score));
        prop_assert_eq!(a.high_risk, a.risk_score > 0.5);
        prop_assert!(a.detections.len() <= 8);
        prop_assert_eq!(a.abuse_detected(), a.risk_score > 0.0);
    }

    #[test]
    fn self_vote_always_detected(event in arb_event(), activity in arb_activity()) {
        let event = VoteEvent { author: event.voter.clone(), ..event };
        let a = RiskScorer::default().score(&event, &activity);
        let first = &a.detections[0];
        prop_assert_eq!(first.kind, DetectionKind::SelfVoteAttempt);
        prop_assert!((first.weight - 0.3).abs() < 1e-9);
        prop_assert_eq!(
            a.detections.iter().filter(|d| d.kind == DetectionKind::SelfVoteAttempt).count(),
            1
        );
    }

    #[test]
    fn detections_follow_evaluation_order(event in arb_event(), activity in arb_activity()) {
        let a = RiskScorer::default().score(&event, &activity);
        prop_assert!(a.detections.windows(2).all(|w| w[0].kind <= w[1].kind));
        prop_assert!(a.detections.iter().all(|d| d.severity == d.kind.severity()));
    }
}

// ---------------------------------------------------------------------------
// Reward gating
// ---------------------------------------------------------------------------

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    #[test]
    fn credits_only_for_low_risk_upvotes(
        polarity in arb_polarity(),
        tier in arb_tier(),
        risk in 0.0f64..=1.0,
    ) {
        let credits = RewardPolicy::default().decide(polarity, tier, risk);
        if polarity == Polarity::Up && risk <= 0.5 {
            prop_assert_eq!(credits, tier.rank() as u32);
        } else {
            prop_assert_eq!(credits, 0);
        }
    }

    #[test]
    fn credits_never_decrease_with_tier(
        polarity in arb_polarity(),
        risk in 0.0f64..=1.0,
        free in 0u32..5,
        steps in prop::collection::vec(0u32..5, 3),
    ) {
        let rewards = RewardConfig {
            free,
            starter: free + steps[0],
            pro: free + steps[0] + steps[1],
            enterprise: free + steps[0] + steps[1] + steps[2],
        };
        let policy = RewardPolicy::new(rewards, &Default::default());
        let credits: Vec<u32> = PlanTier::ALL.iter().map(|t| policy.decide(polarity, *t, risk)).collect();
        prop_assert!(credits.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn engine_reward_matches_policy(event in arb_event()) {
        let (engine, _) = engine();
        let decision = engine.evaluate(&event).unwrap();
        let expected = RewardPolicy::default().decide_for(&event, decision.risk_score);
        prop_assert_eq!(decision.credits, expected);
        prop_assert_eq!(decision.case.is_some(), decision.abuse_detected);
    }
}

// ---------------------------------------------------------------------------
// Case lifecycle
// ---------------------------------------------------------------------------

fn arb_terminal() -> impl Strategy<Value = CaseStatus> {
    prop_oneof![Just(CaseStatus::Resolved), Just(CaseStatus::FalsePositive)]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    #[test]
    fn second_terminal_transition_always_fails(
        review_first in any::<bool>(),
        first in arb_terminal(),
        second in arb_terminal(),
        note in "[a-z]{1,12}",
        later_note in "[a-z ]{0,12}",
    ) {
        let (engine, clock) = engine();
        let id = open_self_vote_case(&engine, "alice", t0());
        if review_first {
            engine.begin_investigation(id, "mod".into()).unwrap();
        }
        clock.advance(Duration::minutes(10));
        let closed = engine.investigate(id, &note, first).unwrap();
        prop_assert_eq!(engine.monitor().active_cases(), 0);

        clock.advance(Duration::minutes(10));
        let err = engine.investigate(id, &later_note, second).unwrap_err();
        prop_assert_eq!(
            err,
            TallyError::Workflow(WorkflowError::InvalidTransition { id, from: first, to: second })
        );
        prop_assert_eq!(engine.get_case(id).unwrap(), closed);
        prop_assert_eq!(engine.monitor().active_cases(), 0);
    }

    #[test]
    fn blank_notes_never_close(target in arb_terminal(), note in "[ \t\n]{0,6}") {
        let (engine, _) = engine();
        let id = open_self_vote_case(&engine, "alice", t0());
        let err = engine.investigate(id, &note, target).unwrap_err();
        prop_assert_eq!(err, TallyError::Workflow(WorkflowError::InvalidResolution { id }));
        prop_assert_eq!(engine.get_case(id).unwrap().status, CaseStatus::Pending);
        prop_assert_eq!(engine.monitor().active_cases(), 1);
    }
}
