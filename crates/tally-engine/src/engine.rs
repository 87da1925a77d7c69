//! The vote pipeline and its operator-facing operations.
//!
//! `evaluate` runs one vote through plan lookup, activity counters, scoring
//! and reward gating, and opens a case when any heuristic fired. Everything
//! else on [`AbuseEngine`] reads or moves existing cases.
//!
//! Collaborator failures are returned to the caller unchanged. Nothing here
//! retries: a fired detection must either be stored or reported as an error.

use std::sync::Arc;

use tracing::{debug, error, info, warn};

use tally_activity::RateWindowTracker;
use tally_core::clock::{Clock, SystemClock};
use tally_core::config::EngineConfig;
use tally_core::error::{StoreError, TallyError, WorkflowError};
use tally_core::health::SystemHealthSnapshot;
use tally_core::reward::RewardPolicy;
use tally_core::scoring::RiskScorer;
use tally_core::stats::{self, AbuseStatistics, StatsWindow};
use tally_core::traits::{ActivityStore, CaseStore, PlanDirectory};
use tally_core::types::{AbuseCase, CaseFilter, CaseId, CaseStatus, NewCase, RewardDecision, UserId, VoteEvent};
use tally_core::workflow::TransitionRequest;

use crate::monitor::HealthMonitor;
use crate::plans::StaticPlanDirectory;
use crate::store::MemoryCaseStore;
use crate::workflow::InvestigationWorkflow;

/// Assembles an [`AbuseEngine`]. Collaborators left unset get the in-memory
/// defaults.
pub struct EngineBuilder {
    config: EngineConfig,
    activity: Option<Arc<dyn ActivityStore>>,
    cases: Option<Arc<dyn CaseStore>>,
    plans: Option<Arc<dyn PlanDirectory>>,
    clock: Option<Arc<dyn Clock>>,
}

impl EngineBuilder {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            config,
            activity: None,
            cases: None,
            plans: None,
            clock: None,
        }
    }

    pub fn activity(mut self, activity: Arc<dyn ActivityStore>) -> Self {
        self.activity = Some(activity);
        self
    }

    pub fn cases(mut self, cases: Arc<dyn CaseStore>) -> Self {
        self.cases = Some(cases);
        self
    }

    pub fn plans(mut self, plans: Arc<dyn PlanDirectory>) -> Self {
        self.plans = Some(plans);
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Validate the configuration and wire the engine.
    ///
    /// The active-case gauge starts at the number of non-terminal cases the
    /// store already holds.
    pub fn build(self) -> Result<AbuseEngine, TallyError> {
        self.config.validate()?;

        let activity = self
            .activity
            .unwrap_or_else(|| Arc::new(RateWindowTracker::new(self.config.activity.clone())));
        let cases = self.cases.unwrap_or_else(|| Arc::new(MemoryCaseStore::new()));
        let plans = self.plans.unwrap_or_else(|| Arc::new(StaticPlanDirectory::new()));
        let clock = self.clock.unwrap_or_else(|| Arc::new(SystemClock));

        let active = cases
            .list(&CaseFilter::all())?
            .iter()
            .filter(|c| c.is_active())
            .count() as u64;
        let monitor = Arc::new(HealthMonitor::with_active_cases(active));
        let workflow = InvestigationWorkflow::new(cases.clone(), monitor.clone(), clock.clone());

        info!(active_cases = active, "engine: ready");
        Ok(AbuseEngine {
            scorer: RiskScorer::new(self.config.scoring.clone()),
            rewards: RewardPolicy::new(self.config.rewards.clone(), &self.config.scoring),
            config: self.config,
            activity,
            cases,
            plans,
            clock,
            monitor,
            workflow,
        })
    }
}

pub struct AbuseEngine {
    config: EngineConfig,
    scorer: RiskScorer,
    rewards: RewardPolicy,
    activity: Arc<dyn ActivityStore>,
    cases: Arc<dyn CaseStore>,
    plans: Arc<dyn PlanDirectory>,
    clock: Arc<dyn Clock>,
    monitor: Arc<HealthMonitor>,
    workflow: InvestigationWorkflow,
}

impl AbuseEngine {
    /// An engine with in-memory collaborators and the system clock.
    pub fn new(config: EngineConfig) -> Result<Self, TallyError> {
        EngineBuilder::new(config).build()
    }

    pub fn builder(config: EngineConfig) -> EngineBuilder {
        EngineBuilder::new(config)
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn monitor(&self) -> &HealthMonitor {
        &self.monitor
    }

    /// Score one vote and decide its reward.
    ///
    /// When any heuristic fires a case is opened in PENDING and returned on
    /// the decision. Evaluating the same event again returns the case it
    /// opened the first time.
    pub fn evaluate(&self, event: &VoteEvent) -> Result<RewardDecision, TallyError> {
        let tier = match self.plans.plan_tier(&event.voter) {
            Ok(tier) => tier.unwrap_or(event.plan),
            Err(e) => {
                error!(voter = %event.voter, error = %e, "engine: plan lookup failed");
                return Err(e.into());
            }
        };

        let activity = self.activity.observe(event).inspect_err(|e| {
            error!(voter = %event.voter, error = %e, "engine: activity store failed");
        })?;

        let assessment = self.scorer.score(event, &activity);
        let credits = self.rewards.decide(event.polarity, tier, assessment.risk_score);
        self.monitor.record_evaluation(assessment.abuse_detected());
        debug!(
            voter = %event.voter,
            author = %event.author,
            risk = assessment.risk_score,
            detections = assessment.detections.len(),
            credits,
            "engine: vote scored"
        );

        let case = match NewCase::new(
            event,
            assessment.detections.clone(),
            assessment.risk_score,
            self.clock.now(),
        ) {
            Some(new_case) => Some(self.open_case(new_case)?),
            None => None,
        };

        if assessment.high_risk {
            warn!(
                voter = %event.voter,
                risk = assessment.risk_score,
                case = ?case.as_ref().map(|c| c.id),
                "engine: high-risk vote, reward withheld"
            );
        }

        Ok(RewardDecision {
            credits,
            abuse_detected: assessment.abuse_detected(),
            high_risk: assessment.high_risk,
            risk_score: assessment.risk_score,
            detections: assessment.detections,
            case,
        })
    }

    fn open_case(&self, new_case: NewCase) -> Result<AbuseCase, TallyError> {
        self.monitor.case_opened();
        match self.cases.create(new_case.clone()) {
            Ok(id) => {
                let case = new_case.into_case(id);
                info!(
                    %id,
                    voter = %case.voter,
                    kind = ?case.primary_kind(),
                    risk = case.risk_score,
                    "engine: case opened"
                );
                Ok(case)
            }
            Err(StoreError::DuplicateEvent { existing, fingerprint }) => {
                self.monitor.case_discarded();
                debug!(%existing, %fingerprint, "engine: vote already evaluated");
                Ok(self.cases.get(existing)?.ok_or(StoreError::NotFound(existing))?)
            }
            Err(e) => {
                self.monitor.case_discarded();
                error!(voter = %new_case.voter(), error = %e, "engine: failed to store case");
                Err(e.into())
            }
        }
    }

    /// Move a case to a terminal (or review) state with a resolution note.
    pub fn investigate(&self, id: CaseId, note: &str, target: CaseStatus) -> Result<AbuseCase, TallyError> {
        self.workflow.investigate(id, note, target)
    }

    pub fn begin_investigation(&self, id: CaseId, investigator: UserId) -> Result<AbuseCase, TallyError> {
        self.workflow.begin_review(id, investigator)
    }

    pub fn transition(&self, id: CaseId, request: &TransitionRequest) -> Result<AbuseCase, TallyError> {
        self.workflow.transition(id, request)
    }

    pub fn get_case(&self, id: CaseId) -> Result<AbuseCase, TallyError> {
        Ok(self.cases.get(id)?.ok_or(WorkflowError::CaseNotFound(id))?)
    }

    pub fn list_cases(&self, filter: &CaseFilter) -> Result<Vec<AbuseCase>, TallyError> {
        Ok(self.cases.list(filter)?)
    }

    /// Statistics over cases detected within `window` of now.
    pub fn get_statistics(&self, window: StatsWindow) -> Result<AbuseStatistics, TallyError> {
        let now = self.clock.now();
        let filter = CaseFilter {
            detected_since: window.since(now),
            ..CaseFilter::all()
        };
        let cases = self.cases.list(&filter)?;
        Ok(stats::summarize(&cases, now, self.config.statistics.top_offenders))
    }

    pub fn get_health(&self) -> Result<SystemHealthSnapshot, TallyError> {
        let cases = self.cases.list(&CaseFilter::all())?;
        Ok(self.monitor.snapshot(&cases))
    }
}
