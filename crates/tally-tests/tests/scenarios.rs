//! End-to-end abuse scenarios through the full vote pipeline.
//!
//! Each test drives [`AbuseEngine`] with in-memory collaborators and a
//! manual clock, or the scorer directly where the scenario is stated in
//! terms of activity counters.

use std::sync::Arc;

use chrono::Duration;

use tally_core::error::{StoreError, TallyError, WorkflowError};
use tally_core::reward::RewardPolicy;
use tally_core::scoring::RiskScorer;
use tally_core::stats::StatsWindow;
use tally_core::traits::{ActivityStore, CaseStore};
use tally_core::types::{
    AbuseCase, ActivitySnapshot, CaseFilter, CaseId, CaseStatus, CaseUpdate, DetectionKind, NewCase,
    PlanTier, Polarity, Severity, UserId, VoteEvent,
};
use tally_core::EngineConfig;
use tally_engine::AbuseEngine;
use tally_tests::helpers::*;

const EPS: f64 = 1e-9;

fn kinds(detections: &[tally_core::types::Detection]) -> Vec<DetectionKind> {
    detections.iter().map(|d| d.kind).collect()
}

// ---------------------------------------------------------------------------
// Scoring scenarios
// ---------------------------------------------------------------------------

#[test]
fn self_vote_on_established_account_keeps_base_reward() {
    let (engine, _) = engine();
    let decision = engine.evaluate(&vote("alice", "alice")).unwrap();

    assert!((decision.risk_score - 0.3).abs() < EPS);
    assert_eq!(kinds(&decision.detections), vec![DetectionKind::SelfVoteAttempt]);
    assert_eq!(decision.detections[0].severity, Severity::Medium);
    assert!(!decision.high_risk);
    assert_eq!(decision.credits, 2);
    assert_eq!(decision.case.unwrap().status, CaseStatus::Pending);
}

#[test]
fn excessive_hourly_and_daily_rates_withhold_credits() {
    let scorer = RiskScorer::default();
    let event = vote("alice", "bob");
    let activity = ActivitySnapshot {
        votes_last_hour: 25,
        votes_last_day: 120,
        ..ActivitySnapshot::default()
    };
    let assessment = scorer.score(&event, &activity);

    assert!(assessment.risk_score >= 0.6);
    assert_eq!(
        kinds(&assessment.detections),
        vec![DetectionKind::ExcessiveVotingRate, DetectionKind::ExcessiveVotingRate]
    );
    assert_eq!(RewardPolicy::default().decide_for(&event, assessment.risk_score), 0);
}

#[test]
fn hourly_limit_trips_on_the_twenty_first_vote() {
    let (engine, _) = engine();
    let mut last = None;
    for i in 0..21 {
        let at = t0() + Duration::minutes(2 * i);
        let decision = engine.evaluate(&vote_at("alice", &format!("author-{i}"), at)).unwrap();
        if i < 20 {
            assert!(!decision.abuse_detected, "vote {i} flagged early");
        }
        last = Some(decision);
    }
    let decision = last.unwrap();
    assert_eq!(kinds(&decision.detections), vec![DetectionKind::ExcessiveVotingRate]);
    assert!((decision.risk_score - 0.6).abs() < EPS);
    assert!(decision.high_risk);
    assert_eq!(decision.credits, 0);
}

#[test]
fn shared_ip_volume_and_users_clamp_to_one() {
    let scorer = RiskScorer::default();
    let activity = ActivitySnapshot {
        votes_from_ip: 60,
        distinct_users_from_ip: 8,
        ..ActivitySnapshot::default()
    };
    let event = vote("alice", "bob");
    let assessment = scorer.score(&event, &activity);

    assert_eq!(
        kinds(&assessment.detections),
        vec![DetectionKind::IpClustering, DetectionKind::CoordinatedVoting]
    );
    assert!(assessment.detections.iter().all(|d| (d.weight - 0.6).abs() < EPS));
    assert!((assessment.risk_score - 1.0).abs() < EPS);
    assert_eq!(RewardPolicy::default().decide_for(&event, assessment.risk_score), 0);
}

#[test]
fn six_distinct_voters_on_one_ip_look_coordinated() {
    let (engine, _) = engine();
    for i in 0..5 {
        let d = engine
            .evaluate(&vote_from(&format!("sock-{i}"), "target", [10, 9, 9, 9], t0() + Duration::minutes(i)))
            .unwrap();
        assert!(!d.abuse_detected);
    }
    let d = engine
        .evaluate(&vote_from("sock-5", "target", [10, 9, 9, 9], t0() + Duration::minutes(5)))
        .unwrap();
    assert_eq!(kinds(&d.detections), vec![DetectionKind::CoordinatedVoting]);
    assert_eq!(d.detections[0].details.observed, 6);
}

#[test]
fn six_votes_within_thirty_seconds_is_a_burst() {
    let (engine, _) = engine();
    let mut decisions = Vec::new();
    for i in 0..6 {
        let at = t0() + Duration::seconds(5 * i);
        decisions.push(engine.evaluate(&vote_at("alice", &format!("author-{i}"), at)).unwrap());
    }
    assert!(decisions[..5].iter().all(|d| !d.abuse_detected));

    let burst = &decisions[5];
    assert_eq!(kinds(&burst.detections), vec![DetectionKind::RapidVotingPattern]);
    assert_eq!(burst.detections[0].severity, Severity::High);
    assert_eq!(burst.detections[0].details.observed, 6);
}

#[test]
fn votes_spread_over_a_minute_are_not_a_burst() {
    let (engine, _) = engine();
    for i in 0..10 {
        let at = t0() + Duration::seconds(7 * i);
        let d = engine.evaluate(&vote_at("alice", &format!("author-{i}"), at)).unwrap();
        assert!(!d.abuse_detected, "vote {i} flagged");
    }
}

#[test]
fn every_heuristic_fires_together() {
    let scorer = RiskScorer::default();
    let event = VoteEvent {
        account_created_at: t0() - Duration::hours(1),
        ..vote("mallory", "mallory")
    };
    let assessment = scorer.score(&event, &hostile_activity(t0()));

    assert_eq!(assessment.detections.len(), 8);
    assert_eq!(
        kinds(&assessment.detections),
        vec![
            DetectionKind::SelfVoteAttempt,
            DetectionKind::SuspiciousAccountAge,
            DetectionKind::ExcessiveVotingRate,
            DetectionKind::ExcessiveVotingRate,
            DetectionKind::IpClustering,
            DetectionKind::CoordinatedVoting,
            DetectionKind::RapidVotingPattern,
            DetectionKind::VoteManipulation,
        ]
    );
    assert!((assessment.risk_score - 1.0).abs() < EPS);
    assert!(assessment.high_risk);
}

#[test]
fn downvotes_never_earn_credits() {
    let (engine, _) = engine();
    let event = VoteEvent {
        polarity: Polarity::Down,
        ..vote("alice", "bob")
    };
    let decision = engine.evaluate(&event).unwrap();
    assert!(!decision.abuse_detected);
    assert_eq!(decision.credits, 0);
}

#[test]
fn brand_new_account_is_flagged_but_still_rewarded() {
    let (engine, _) = engine();
    let event = VoteEvent {
        account_created_at: t0() - Duration::hours(5),
        plan: PlanTier::Enterprise,
        ..vote("newbie", "bob")
    };
    let decision = engine.evaluate(&event).unwrap();
    assert_eq!(kinds(&decision.detections), vec![DetectionKind::SuspiciousAccountAge]);
    assert_eq!(decision.credits, 3);
}

// ---------------------------------------------------------------------------
// Investigation scenarios
// ---------------------------------------------------------------------------

#[test]
fn false_positive_resolution_shows_up_in_statistics() {
    let (engine, clock) = engine();
    let id = open_self_vote_case(&engine, "alice", t0());
    let case = engine.get_case(id).unwrap();
    assert_eq!(case.highest_severity(), Some(Severity::Medium));
    assert!((case.risk_score - 0.3).abs() < EPS);

    let before = engine.get_statistics(StatsWindow::All).unwrap();
    assert_eq!(before.by_status[&CaseStatus::FalsePositive], 0);
    assert_eq!(before.by_status[&CaseStatus::Pending], 1);

    clock.advance(Duration::minutes(45));
    let resolved = engine
        .investigate(id, "author's alt account is a shared family login", CaseStatus::FalsePositive)
        .unwrap();
    assert_eq!(resolved.status, CaseStatus::FalsePositive);
    assert_eq!(resolved.resolved_at, Some(t0() + Duration::minutes(45)));

    let after = engine.get_statistics(StatsWindow::All).unwrap();
    assert_eq!(after.by_status[&CaseStatus::FalsePositive], 1);
    assert_eq!(after.by_status[&CaseStatus::Pending], 0);
    assert_eq!(after.by_kind[&DetectionKind::SelfVoteAttempt], 1);
}

#[test]
fn health_active_count_drops_by_exactly_one() {
    let (engine, _) = engine();
    let ids: Vec<CaseId> = ["a", "b", "c"]
        .iter()
        .map(|v| open_self_vote_case(&engine, v, t0()))
        .collect();
    assert_eq!(engine.get_health().unwrap().active_cases, 3);
    assert_eq!(engine.monitor().active_cases(), 3);

    engine.investigate(ids[1], "confirmed", CaseStatus::Resolved).unwrap();
    assert_eq!(engine.get_health().unwrap().active_cases, 2);
    assert_eq!(engine.monitor().active_cases(), 2);

    let err = engine.investigate(ids[1], "again", CaseStatus::Resolved).unwrap_err();
    assert!(matches!(err, TallyError::Workflow(WorkflowError::InvalidTransition { .. })));
    assert_eq!(engine.get_health().unwrap().active_cases, 2);
    assert_eq!(engine.monitor().active_cases(), 2);
}

#[test]
fn second_resolution_leaves_resolution_fields_alone() {
    let (engine, clock) = engine();
    let id = open_self_vote_case(&engine, "alice", t0());
    engine.begin_investigation(id, "mod-1".into()).unwrap();
    clock.advance(Duration::hours(1));
    let first = engine.investigate(id, "sock puppet ring", CaseStatus::Resolved).unwrap();

    clock.advance(Duration::hours(1));
    for target in [CaseStatus::Resolved, CaseStatus::FalsePositive, CaseStatus::Investigating] {
        let err = engine.investigate(id, "changed my mind", target).unwrap_err();
        assert_eq!(
            err,
            TallyError::Workflow(WorkflowError::InvalidTransition {
                id,
                from: CaseStatus::Resolved,
                to: target,
            })
        );
    }
    assert_eq!(engine.get_case(id).unwrap(), first);
}

#[test]
fn blank_note_and_unknown_case_are_rejected() {
    let (engine, _) = engine();
    let id = open_self_vote_case(&engine, "alice", t0());
    assert_eq!(
        engine.investigate(id, "", CaseStatus::Resolved).unwrap_err(),
        TallyError::Workflow(WorkflowError::InvalidResolution { id })
    );
    assert_eq!(
        engine.investigate(CaseId(404), "note", CaseStatus::Resolved).unwrap_err(),
        TallyError::Workflow(WorkflowError::CaseNotFound(CaseId(404)))
    );
    assert_eq!(engine.get_case(id).unwrap().status, CaseStatus::Pending);
}

#[test]
fn cases_list_newest_first_and_filter() {
    let (engine, clock) = engine();
    let first = open_self_vote_case(&engine, "alice", t0());
    clock.advance(Duration::minutes(1));
    let second = open_self_vote_case(&engine, "bob", t0() + Duration::minutes(1));
    clock.advance(Duration::minutes(1));
    let third = open_self_vote_case(&engine, "alice", t0() + Duration::minutes(2));
    engine.investigate(second, "ok", CaseStatus::Resolved).unwrap();

    let all: Vec<CaseId> = engine.list_cases(&CaseFilter::all()).unwrap().iter().map(|c| c.id).collect();
    assert_eq!(all, vec![third, second, first]);

    let alice_pending = engine
        .list_cases(&CaseFilter::all().with_voter("alice".into()).with_status(CaseStatus::Pending))
        .unwrap();
    assert_eq!(alice_pending.len(), 2);

    let top = engine.get_statistics(StatsWindow::All).unwrap().top_offenders;
    assert_eq!(top[0].voter, UserId::from("alice"));
    assert_eq!(top[0].case_count, 2);
}

// ---------------------------------------------------------------------------
// Collaborator failures
// ---------------------------------------------------------------------------

/// A case store whose backend is down for writes.
struct ReadOnlyStore;

impl CaseStore for ReadOnlyStore {
    fn create(&self, _case: NewCase) -> Result<CaseId, StoreError> {
        Err(StoreError::Unavailable("primary is read-only".into()))
    }
    fn get(&self, _id: CaseId) -> Result<Option<AbuseCase>, StoreError> {
        Ok(None)
    }
    fn update(&self, id: CaseId, _update: &CaseUpdate) -> Result<AbuseCase, StoreError> {
        Err(StoreError::NotFound(id))
    }
    fn list(&self, _filter: &CaseFilter) -> Result<Vec<AbuseCase>, StoreError> {
        Ok(Vec::new())
    }
}

struct DownActivity;

impl ActivityStore for DownActivity {
    fn observe(&self, _event: &VoteEvent) -> Result<ActivitySnapshot, StoreError> {
        Err(StoreError::Unavailable("counter cluster unreachable".into()))
    }
    fn peek(&self, _event: &VoteEvent) -> Result<ActivitySnapshot, StoreError> {
        Err(StoreError::Unavailable("counter cluster unreachable".into()))
    }
}

#[test]
fn store_failure_surfaces_unchanged() {
    let engine = AbuseEngine::builder(EngineConfig::default())
        .cases(Arc::new(ReadOnlyStore))
        .build()
        .unwrap();

    // Clean votes never touch the case store.
    assert_eq!(engine.evaluate(&vote("alice", "bob")).unwrap().credits, 2);

    let err = engine.evaluate(&vote("alice", "alice")).unwrap_err();
    assert_eq!(err, TallyError::Store(StoreError::Unavailable("primary is read-only".into())));
    assert_eq!(engine.monitor().active_cases(), 0);
}

#[test]
fn activity_failure_surfaces_unchanged() {
    let engine = AbuseEngine::builder(EngineConfig::default())
        .activity(Arc::new(DownActivity))
        .build()
        .unwrap();
    let err = engine.evaluate(&vote("alice", "bob")).unwrap_err();
    assert!(matches!(err, TallyError::Store(StoreError::Unavailable(_))));
    assert_eq!(engine.get_health().unwrap().votes_evaluated, 0);
}
