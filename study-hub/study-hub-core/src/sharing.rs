//! Share-grant synchronization planning. The planner is pure; the store
//! applies plans and owns the actual grant rows.

use std::collections::HashSet;

use uuid::Uuid;

use crate::error::HubError;
use crate::visibility::Visibility;

/// Grant mutations needed to reach a desired sharing state.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SharePlan {
    pub to_add: Vec<Uuid>,
    pub to_remove: Vec<Uuid>,
}

impl SharePlan {
    pub fn is_noop(&self) -> bool {
        self.to_add.is_empty() && self.to_remove.is_empty()
    }
}

/// Compute the grant diff for a settings save.
///
/// Any tier other than shared tears down every existing grant. Shared saves
/// diff the requested set against the existing one, so the same save issued
/// twice is a no-op and grants untouched by the change survive without a
/// delete/reinsert gap. A shared save with no groups selected is rejected
/// here, before anything is mutated.
pub fn plan_sync(
    desired: Visibility,
    desired_groups: &[Uuid],
    existing: &[Uuid],
) -> Result<SharePlan, HubError> {
    if desired != Visibility::Shared {
        return Ok(SharePlan {
            to_add: Vec::new(),
            to_remove: existing.to_vec(),
        });
    }

    let wanted = unique(desired_groups);
    if wanted.is_empty() {
        return Err(HubError::Validation(
            "select at least one group to share with".to_string(),
        ));
    }

    let have: HashSet<Uuid> = existing.iter().copied().collect();
    let keep: HashSet<Uuid> = wanted.iter().copied().collect();

    Ok(SharePlan {
        to_add: wanted.into_iter().filter(|g| !have.contains(g)).collect(),
        to_remove: existing
            .iter()
            .copied()
            .filter(|g| !keep.contains(g))
            .collect(),
    })
}

/// Order-preserving dedup of requested group ids.
pub fn unique(ids: &[Uuid]) -> Vec<Uuid> {
    let mut seen = HashSet::new();
    ids.iter().copied().filter(|id| seen.insert(*id)).collect()
}
