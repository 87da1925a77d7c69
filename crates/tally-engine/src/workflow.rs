//! Applies investigation transitions to stored cases.
//!
//! The rule check lives in [`tally_core::workflow::plan_transition`]; this
//! module reads the case, plans the update and hands it to the store as a
//! compare-and-set. If another operator moved the case in between, the store
//! reports a status conflict and the caller sees
//! [`WorkflowError::InvalidTransition`] with the status the case actually has.

use std::sync::Arc;

use tracing::{info, warn};

use tally_core::clock::Clock;
use tally_core::error::{StoreError, TallyError, WorkflowError};
use tally_core::traits::CaseStore;
use tally_core::types::{AbuseCase, CaseId, CaseStatus, UserId};
use tally_core::workflow::{plan_transition, TransitionRequest};

use crate::monitor::HealthMonitor;

pub struct InvestigationWorkflow {
    cases: Arc<dyn CaseStore>,
    monitor: Arc<HealthMonitor>,
    clock: Arc<dyn Clock>,
}

impl InvestigationWorkflow {
    pub fn new(cases: Arc<dyn CaseStore>, monitor: Arc<HealthMonitor>, clock: Arc<dyn Clock>) -> Self {
        Self { cases, monitor, clock }
    }

    /// PENDING → INVESTIGATING.
    pub fn begin_review(&self, id: CaseId, investigator: UserId) -> Result<AbuseCase, TallyError> {
        self.transition(id, &TransitionRequest::begin_review(investigator))
    }

    /// Move a case to `target` with a resolution note.
    pub fn investigate(&self, id: CaseId, note: &str, target: CaseStatus) -> Result<AbuseCase, TallyError> {
        self.transition(id, &TransitionRequest::close(target, note))
    }

    pub fn transition(&self, id: CaseId, request: &TransitionRequest) -> Result<AbuseCase, TallyError> {
        let case = self.cases.get(id)?.ok_or(WorkflowError::CaseNotFound(id))?;

        let update = match plan_transition(&case, request, self.clock.now()) {
            Ok(update) => update,
            Err(e) => {
                warn!(%id, from = %case.status, to = %request.target, error = %e, "workflow: transition rejected");
                return Err(e.into());
            }
        };

        let updated = match self.cases.update(id, &update) {
            Ok(updated) => updated,
            Err(StoreError::StatusConflict { actual, .. }) => {
                warn!(%id, expected = %update.expected, %actual, "workflow: case moved by a concurrent writer");
                return Err(WorkflowError::InvalidTransition {
                    id,
                    from: actual,
                    to: request.target,
                }
                .into());
            }
            Err(StoreError::NotFound(id)) => return Err(WorkflowError::CaseNotFound(id).into()),
            Err(e) => return Err(e.into()),
        };

        if updated.status.is_terminal() {
            self.monitor.case_closed();
            info!(
                %id,
                status = %updated.status,
                investigator = ?updated.investigator,
                "workflow: case closed"
            );
        } else {
            info!(%id, investigator = ?updated.investigator, "workflow: review started");
        }
        Ok(updated)
    }
}
