//! Step synchronization against the current configuration.
//!
//! Configuration can change at any time after enrollments exist. Sync keeps
//! an enrollment's step records congruent with the category's active step
//! definitions without ever touching a decided record.

use std::collections::HashSet;

use uuid::Uuid;

use crate::workflow::types::{StepDefinition, StepRecord};

/// Changes that bring an enrollment's records in line with configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncPlan {
    /// Definitions that need a new pending record, in chain order.
    pub to_create: Vec<Uuid>,
    /// Undecided records to soft-delete.
    pub to_delete: Vec<Uuid>,
}

impl SyncPlan {
    /// Returns true if the records are already congruent.
    #[must_use]
    pub fn is_noop(&self) -> bool {
        self.to_create.is_empty() && self.to_delete.is_empty()
    }
}

/// Stateless planner for step reconciliation.
pub struct StepSyncEngine;

impl StepSyncEngine {
    /// Computes the set difference between records and active definitions.
    ///
    /// # Arguments
    /// * `records` - The enrollment's step records (deleted ones are ignored)
    /// * `definitions` - The category's definitions as of this sync pass
    ///
    /// # Returns
    /// A plan that creates a record for every active definition lacking a
    /// live one, and deletes undecided records whose definition is inactive
    /// or gone. Duplicate undecided records for the same definition are
    /// deleted too, keeping a decided one when present.
    #[must_use]
    pub fn plan(records: &[StepRecord], definitions: &[StepDefinition]) -> SyncPlan {
        let mut active: Vec<&StepDefinition> =
            definitions.iter().filter(|d| d.is_active).collect();
        active.sort_by_key(|d| d.order);
        let active_ids: HashSet<Uuid> = active.iter().map(|d| d.id).collect();

        let mut live: Vec<&StepRecord> = records.iter().filter(|r| !r.is_deleted).collect();
        // Decided records first so they win over undecided duplicates
        live.sort_by_key(|r| !r.is_decided());

        let mut covered = HashSet::new();
        let mut to_delete = Vec::new();

        for record in live {
            let keep = active_ids.contains(&record.step_definition_id)
                && covered.insert(record.step_definition_id);

            if !keep && !record.is_decided() {
                to_delete.push(record.id);
            }
        }

        let to_create = active
            .iter()
            .filter(|d| !covered.contains(&d.id))
            .map(|d| d.id)
            .collect();

        SyncPlan {
            to_create,
            to_delete,
        }
    }

    /// Applies a plan to an in-memory record set.
    ///
    /// Mirrors what the persistence layer writes, so callers can evaluate the
    /// resulting chain before committing. `new_record` builds each created
    /// record.
    pub fn apply<F>(records: &mut Vec<StepRecord>, plan: &SyncPlan, mut new_record: F)
    where
        F: FnMut(Uuid) -> StepRecord,
    {
        for record in records.iter_mut() {
            if plan.to_delete.contains(&record.id) {
                record.is_deleted = true;
            }
        }
        records.extend(plan.to_create.iter().map(|id| new_record(*id)));
    }
}
