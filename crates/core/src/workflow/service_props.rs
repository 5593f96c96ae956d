//! Property-based tests for WorkflowService.

use chrono::{Duration, TimeZone, Utc};
use proptest::prelude::*;
use uuid::Uuid;

use crate::workflow::error::WorkflowError;
use crate::workflow::service::WorkflowService;
use crate::workflow::types::{
    ApprovalChain, EnrollmentState, EnrollmentStatus, StepDefinition, StepRecord, StepRequirement,
};

/// Strategy for generating random EnrollmentStatus values.
fn arb_status() -> impl Strategy<Value = EnrollmentStatus> {
    prop_oneof![
        Just(EnrollmentStatus::Pending),
        Just(EnrollmentStatus::Approved),
        Just(EnrollmentStatus::Rejected),
        Just(EnrollmentStatus::Excused),
    ]
}

/// Strategy for a step outcome: 0 pending, 1 approved, 2 rejected.
fn arb_outcomes() -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(0u8..3, 0..8)
}

fn chain_from(outcomes: &[u8]) -> ApprovalChain {
    let definitions: Vec<StepDefinition> = (1..)
        .take(outcomes.len())
        .map(|order| StepDefinition {
            id: Uuid::new_v4(),
            category_id: Uuid::nil(),
            order,
            requirement: StepRequirement::HeadApproval,
            is_active: true,
        })
        .collect();
    let records: Vec<StepRecord> = definitions
        .iter()
        .zip(outcomes)
        .map(|(d, outcome)| StepRecord {
            id: Uuid::new_v4(),
            enrollment_id: Uuid::nil(),
            step_definition_id: d.id,
            approved_by: None,
            decided_at: None,
            approved: *outcome == 1,
            rejected: *outcome == 2,
            comments: None,
            is_deleted: false,
        })
        .collect();
    ApprovalChain::build(&records, &definitions)
}

fn enrollment(status: EnrollmentStatus) -> EnrollmentState {
    EnrollmentState {
        id: Uuid::new_v4(),
        course_id: Uuid::new_v4(),
        user_id: Uuid::new_v4(),
        status,
        final_approval: status.is_final(),
        is_deleted: false,
        notification_sent: false,
        version: 1,
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// Any rejected step rejects the enrollment; otherwise it is approved
    /// only once every step is approved.
    #[test]
    fn prop_resolve_matches_step_outcomes(outcomes in arb_outcomes()) {
        let resolved = WorkflowService::resolve(&chain_from(&outcomes));

        if outcomes.contains(&2) {
            prop_assert_eq!(resolved, Some(EnrollmentStatus::Rejected));
        } else if outcomes.iter().all(|o| *o == 1) {
            prop_assert_eq!(resolved, Some(EnrollmentStatus::Approved));
        } else {
            prop_assert_eq!(resolved, None);
        }
    }

    /// Nothing ever transitions back to Pending, and only Approved can be
    /// excused.
    #[test]
    fn prop_transitions_are_forward_only(from in arb_status(), to in arb_status()) {
        let valid = WorkflowService::is_valid_transition(from, to);

        if to == EnrollmentStatus::Pending {
            prop_assert!(!valid);
        }
        if to == EnrollmentStatus::Excused {
            prop_assert_eq!(valid, from == EnrollmentStatus::Approved);
        }
        if from.is_final() && from != EnrollmentStatus::Approved {
            prop_assert!(!valid);
        }
    }

    /// The excuse window closes exactly `window_hours` before the course
    /// starts.
    #[test]
    fn prop_excuse_window_boundary(
        window_hours in 0i64..240,
        offset_minutes in -20_000i64..20_000,
    ) {
        let starts_at = Utc.with_ymd_and_hms(2026, 9, 1, 9, 0, 0).unwrap();
        let deadline = WorkflowService::excuse_deadline(starts_at, window_hours);
        let now = deadline + Duration::minutes(offset_minutes);
        let approved = enrollment(EnrollmentStatus::Approved);

        let result = WorkflowService::excuse(&approved, approved.user_id, starts_at, window_hours, now);

        if now < deadline {
            prop_assert_eq!(result.ok(), Some(EnrollmentStatus::Excused));
        } else {
            let closed = matches!(result, Err(WorkflowError::ExcuseWindowClosed { .. }));
            prop_assert!(closed);
        }
    }

    /// The terminal flag is set for every status except Pending.
    #[test]
    fn prop_final_approval_flag(status in arb_status()) {
        prop_assert_eq!(
            WorkflowService::final_approval_for(status),
            status != EnrollmentStatus::Pending
        );
    }
}
