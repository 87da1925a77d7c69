//! Error types for Tally.
use thiserror::Error;

use crate::types::{CaseId, CaseStatus, EventFingerprint};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WorkflowError {
    #[error("case not found: {0}")] CaseNotFound(CaseId),
    #[error("invalid transition for {id}: {from} -> {to}")] InvalidTransition { id: CaseId, from: CaseStatus, to: CaseStatus },
    #[error("resolution note required to close {id}")] InvalidResolution { id: CaseId },
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("store unavailable: {0}")] Unavailable(String),
    #[error("case not found: {0}")] NotFound(CaseId),
    #[error("status conflict on {id}: expected {expected}, found {actual}")] StatusConflict { id: CaseId, expected: CaseStatus, actual: CaseStatus },
    #[error("vote event {fingerprint} already opened {existing}")] DuplicateEvent { fingerprint: EventFingerprint, existing: CaseId },
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")] Load(String),
    #[error("invalid configuration `{field}`: {reason}")] Invalid { field: &'static str, reason: String },
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TallyError {
    #[error(transparent)] Workflow(#[from] WorkflowError),
    #[error(transparent)] Store(#[from] StoreError),
    #[error(transparent)] Config(#[from] ConfigError),
}
