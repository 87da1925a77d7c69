//! In-memory plan directory.

use std::collections::HashMap;

use parking_lot::RwLock;

use tally_core::error::StoreError;
use tally_core::traits::PlanDirectory;
use tally_core::types::{PlanTier, UserId};

/// Plan tiers held in a map. Users without an entry fall back to the tier
/// carried on their vote event.
#[derive(Debug, Default)]
pub struct StaticPlanDirectory {
    plans: RwLock<HashMap<UserId, PlanTier>>,
}

impl StaticPlanDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, user: UserId, tier: PlanTier) {
        self.plans.write().insert(user, tier);
    }

    pub fn remove(&self, user: &UserId) -> Option<PlanTier> {
        self.plans.write().remove(user)
    }
}

impl FromIterator<(UserId, PlanTier)> for StaticPlanDirectory {
    fn from_iter<I: IntoIterator<Item = (UserId, PlanTier)>>(iter: I) -> Self {
        Self {
            plans: RwLock::new(iter.into_iter().collect()),
        }
    }
}

impl PlanDirectory for StaticPlanDirectory {
    fn plan_tier(&self, user: &UserId) -> Result<Option<PlanTier>, StoreError> {
        Ok(self.plans.read().get(user).copied())
    }
}
