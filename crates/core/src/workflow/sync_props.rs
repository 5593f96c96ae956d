//! Property-based tests for StepSyncEngine.
//!
//! Record sets are generated against a random configuration, including stale
//! records, duplicates and decided records for deactivated steps.

use std::collections::HashMap;

use proptest::prelude::*;
use uuid::Uuid;

use crate::workflow::sync::StepSyncEngine;
use crate::workflow::types::{StepDefinition, StepRecord, StepRequirement};

/// One generated record: (definition index, decision 0..3, deleted).
type RecordSeed = (usize, u8, bool);

fn arb_scenario() -> impl Strategy<Value = (Vec<bool>, Vec<RecordSeed>)> {
    prop::collection::vec(any::<bool>(), 1..6).prop_flat_map(|active| {
        let n = active.len();
        let records = prop::collection::vec((0..n, 0u8..3, any::<bool>()), 0..10);
        (Just(active), records)
    })
}

fn build(active: &[bool], seeds: &[RecordSeed]) -> (Vec<StepDefinition>, Vec<StepRecord>) {
    let definitions: Vec<StepDefinition> = active
        .iter()
        .zip(1..)
        .map(|(is_active, order)| StepDefinition {
            id: Uuid::new_v4(),
            category_id: Uuid::nil(),
            order,
            requirement: StepRequirement::HeadApproval,
            is_active: *is_active,
        })
        .collect();

    let records = seeds
        .iter()
        .map(|(def, decision, deleted)| new_record(definitions[*def].id, *decision, *deleted))
        .collect();

    (definitions, records)
}

fn new_record(step_definition_id: Uuid, decision: u8, deleted: bool) -> StepRecord {
    StepRecord {
        id: Uuid::new_v4(),
        enrollment_id: Uuid::nil(),
        step_definition_id,
        approved_by: None,
        decided_at: None,
        approved: decision == 1,
        rejected: decision == 2,
        comments: None,
        is_deleted: deleted,
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// Applying a plan and planning again yields no further changes.
    #[test]
    fn prop_sync_is_idempotent((active, seeds) in arb_scenario()) {
        let (definitions, mut records) = build(&active, &seeds);

        let plan = StepSyncEngine::plan(&records, &definitions);
        StepSyncEngine::apply(&mut records, &plan, |id| new_record(id, 0, false));

        prop_assert!(StepSyncEngine::plan(&records, &definitions).is_noop());
    }

    /// Decided records are never scheduled for deletion.
    #[test]
    fn prop_sync_never_deletes_decided_records((active, seeds) in arb_scenario()) {
        let (definitions, records) = build(&active, &seeds);
        let plan = StepSyncEngine::plan(&records, &definitions);

        for id in &plan.to_delete {
            let record = records.iter().find(|r| r.id == *id);
            prop_assert!(record.is_some_and(|r| !r.is_decided() && !r.is_deleted));
        }
    }

    /// After sync every active definition has at least one live record, and
    /// at most one undecided live record.
    #[test]
    fn prop_sync_covers_every_active_definition((active, seeds) in arb_scenario()) {
        let (definitions, mut records) = build(&active, &seeds);

        let plan = StepSyncEngine::plan(&records, &definitions);
        StepSyncEngine::apply(&mut records, &plan, |id| new_record(id, 0, false));

        let mut live: HashMap<Uuid, (usize, usize)> = HashMap::new();
        for record in records.iter().filter(|r| !r.is_deleted) {
            let entry = live.entry(record.step_definition_id).or_default();
            entry.0 += 1;
            if !record.is_decided() {
                entry.1 += 1;
            }
        }

        for definition in definitions.iter().filter(|d| d.is_active) {
            let (total, undecided) = live.get(&definition.id).copied().unwrap_or_default();
            prop_assert!(total >= 1);
            prop_assert!(undecided <= 1);
        }
        for definition in definitions.iter().filter(|d| !d.is_active) {
            let (_, undecided) = live.get(&definition.id).copied().unwrap_or_default();
            prop_assert_eq!(undecided, 0);
        }
    }
}
