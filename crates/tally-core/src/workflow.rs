//! Investigation lifecycle rules.
//!
//! [`plan_transition`] validates a requested status change against a case
//! snapshot and produces the compare-and-set [`CaseUpdate`] a store applies.
//! Applying it is the engine's job; keeping the rule here means every store
//! and every caller agrees on what is allowed.

use chrono::{DateTime, Utc};

use crate::error::WorkflowError;
use crate::types::{AbuseCase, CaseStatus, CaseUpdate, UserId};

/// A requested move of a case to `target`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitionRequest {
    pub target: CaseStatus,
    /// Required (non-blank) for terminal targets, ignored otherwise.
    pub note: Option<String>,
    pub investigator: Option<UserId>,
}

impl TransitionRequest {
    pub fn begin_review(investigator: UserId) -> Self {
        Self {
            target: CaseStatus::Investigating,
            note: None,
            investigator: Some(investigator),
        }
    }

    pub fn close(target: CaseStatus, note: impl Into<String>) -> Self {
        Self {
            target,
            note: Some(note.into()),
            investigator: None,
        }
    }

    pub fn by(mut self, investigator: UserId) -> Self {
        self.investigator = Some(investigator);
        self
    }
}

/// Check `request` against the current state of `case`.
///
/// The lifecycle is checked before the note, so a second attempt to close an
/// already-closed case reports [`WorkflowError::InvalidTransition`] whatever
/// note it carries.
pub fn plan_transition(
    case: &AbuseCase,
    request: &TransitionRequest,
    now: DateTime<Utc>,
) -> Result<CaseUpdate, WorkflowError> {
    if !case.status.can_transition_to(request.target) {
        return Err(WorkflowError::InvalidTransition {
            id: case.id,
            from: case.status,
            to: request.target,
        });
    }

    if !request.target.is_terminal() {
        return Ok(CaseUpdate {
            expected: case.status,
            status: request.target,
            investigator: request.investigator.clone(),
            resolution: None,
            resolved_at: None,
        });
    }

    let note = request
        .note
        .as_deref()
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .ok_or(WorkflowError::InvalidResolution { id: case.id })?;

    Ok(CaseUpdate {
        expected: case.status,
        status: request.target,
        investigator: request.investigator.clone(),
        resolution: Some(note.to_string()),
        resolved_at: Some(now),
    })
}
