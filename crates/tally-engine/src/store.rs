//! In-memory case store.
//!
//! Implements [`CaseStore`] with concurrent maps. Suitable for tests and
//! single-process deployments; a database-backed store implements the same
//! trait.
//!
//! Per-case exclusivity comes from the map's entry lock: a status update
//! reads, checks and writes the case while holding it. Creation is guarded
//! by the fingerprint index entry, so one vote event opens at most one case.

use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use tracing::debug;

use tally_core::error::StoreError;
use tally_core::traits::CaseStore;
use tally_core::types::{AbuseCase, CaseFilter, CaseId, CaseUpdate, EventFingerprint, NewCase};

pub struct MemoryCaseStore {
    /// Last identifier handed out; identifiers start at 1.
    last_id: AtomicU64,
    cases: DashMap<CaseId, AbuseCase>,
    by_fingerprint: DashMap<EventFingerprint, CaseId>,
}

impl MemoryCaseStore {
    pub fn new() -> Self {
        Self {
            last_id: AtomicU64::new(0),
            cases: DashMap::new(),
            by_fingerprint: DashMap::new(),
        }
    }

    /// Number of stored cases.
    pub fn len(&self) -> usize {
        self.cases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cases.is_empty()
    }
}

impl Default for MemoryCaseStore {
    fn default() -> Self {
        Self::new()
    }
}

impl CaseStore for MemoryCaseStore {
    fn create(&self, case: NewCase) -> Result<CaseId, StoreError> {
        let fingerprint = case.fingerprint();
        match self.by_fingerprint.entry(fingerprint) {
            Entry::Occupied(existing) => Err(StoreError::DuplicateEvent {
                fingerprint,
                existing: *existing.get(),
            }),
            Entry::Vacant(slot) => {
                let id = CaseId(self.last_id.fetch_add(1, Ordering::Relaxed) + 1);
                // Insert the case before releasing the index entry so a
                // concurrent duplicate never sees an id without a case.
                self.cases.insert(id, case.into_case(id));
                slot.insert(id);
                debug!(%id, %fingerprint, "store: case created");
                Ok(id)
            }
        }
    }

    fn get(&self, id: CaseId) -> Result<Option<AbuseCase>, StoreError> {
        Ok(self.cases.get(&id).map(|c| c.clone()))
    }

    fn update(&self, id: CaseId, update: &CaseUpdate) -> Result<AbuseCase, StoreError> {
        let mut case = self.cases.get_mut(&id).ok_or(StoreError::NotFound(id))?;
        if case.status != update.expected {
            return Err(StoreError::StatusConflict {
                id,
                expected: update.expected,
                actual: case.status,
            });
        }
        update.apply(&mut case);
        debug!(%id, status = %case.status, "store: case updated");
        Ok(case.clone())
    }

    fn list(&self, filter: &CaseFilter) -> Result<Vec<AbuseCase>, StoreError> {
        let mut cases: Vec<AbuseCase> = self
            .cases
            .iter()
            .filter(|c| filter.matches(c.value()))
            .map(|c| c.value().clone())
            .collect();
        cases.sort_by(|a, b| b.detected_at.cmp(&a.detected_at).then(b.id.cmp(&a.id)));
        Ok(cases)
    }
}
