//! Trait interfaces for the collaborators the engine depends on.
//!
//! - [`CaseStore`]: persistence for abuse cases (tally-engine ships an in-memory one)
//! - [`ActivityStore`]: rolling vote counters (tally-activity implements)
//! - [`PlanDirectory`]: current plan tier of a user (billing system implements)
//!
//! Implementations must be safe to share across threads. Failures of the
//! backing system surface as [`StoreError::Unavailable`] and are returned to
//! the caller unchanged; the engine never retries.

use crate::error::StoreError;
use crate::types::{AbuseCase, ActivitySnapshot, CaseFilter, CaseId, CaseUpdate, NewCase, PlanTier, UserId, VoteEvent};

/// Storage for abuse cases. Cases are append-only; only status-related
/// fields change, and only through [`CaseStore::update`].
pub trait CaseStore: Send + Sync {
    /// Persist a new case in PENDING and return its identifier.
    ///
    /// Must create at most one case per vote fingerprint. A second create for
    /// the same fingerprint fails with [`StoreError::DuplicateEvent`] naming
    /// the existing case.
    fn create(&self, case: NewCase) -> Result<CaseId, StoreError>;

    /// Look up a case. Returns `None` if no such case exists.
    fn get(&self, id: CaseId) -> Result<Option<AbuseCase>, StoreError>;

    /// Apply a compare-and-set status update and return the updated case.
    ///
    /// Fails with [`StoreError::StatusConflict`] if the case is no longer in
    /// `update.expected`, and [`StoreError::NotFound`] if it does not exist.
    /// Updates to the same case must be mutually exclusive.
    fn update(&self, id: CaseId, update: &CaseUpdate) -> Result<AbuseCase, StoreError>;

    /// All cases matching `filter`, newest detection first.
    fn list(&self, filter: &CaseFilter) -> Result<Vec<AbuseCase>, StoreError>;
}

/// Rolling activity counters for voters and IPs.
pub trait ActivityStore: Send + Sync {
    /// Record `event` and return the counters including it.
    ///
    /// Record-then-read must be atomic per voter key and per IP key.
    fn observe(&self, event: &VoteEvent) -> Result<ActivitySnapshot, StoreError>;

    /// Read the counters for `event` without recording it.
    fn peek(&self, event: &VoteEvent) -> Result<ActivitySnapshot, StoreError>;
}

/// Source of truth for a user's subscription plan.
pub trait PlanDirectory: Send + Sync {
    /// Current plan of `user`, or `None` if the directory has no record.
    fn plan_tier(&self, user: &UserId) -> Result<Option<PlanTier>, StoreError>;
}
