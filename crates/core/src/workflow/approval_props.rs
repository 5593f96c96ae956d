//! Property-based tests for ApprovalAuthorizer.
//!
//! Chains are generated with a random mix of head and role steps and a random
//! approved prefix, then checked against the authorization rules.

use proptest::prelude::*;
use uuid::Uuid;

use crate::workflow::approval::{ApprovalAuthorizer, DecisionContext};
use crate::workflow::error::WorkflowError;
use crate::workflow::types::{
    Actor, ApprovalChain, EnrollmentState, EnrollmentStatus, StepDefinition, StepRecord,
    StepRequirement, Subject, Verdict,
};

/// Strategy for generating random UUIDs.
fn arb_uuid() -> impl Strategy<Value = Uuid> {
    any::<u128>().prop_map(Uuid::from_u128)
}

/// Strategy for a chain shape: one flag per step, true for head steps.
fn arb_chain_shape() -> impl Strategy<Value = Vec<bool>> {
    prop::collection::vec(any::<bool>(), 1..6)
}

struct Generated {
    enrollment: EnrollmentState,
    subject: Subject,
    definitions: Vec<StepDefinition>,
    records: Vec<StepRecord>,
    role_id: Uuid,
}

impl Generated {
    fn new(shape: &[bool], approved_prefix: usize, subject_id: Uuid, department_id: Uuid) -> Self {
        let role_id = Uuid::new_v4();
        let enrollment = EnrollmentState {
            id: Uuid::new_v4(),
            course_id: Uuid::new_v4(),
            user_id: subject_id,
            status: EnrollmentStatus::Pending,
            final_approval: false,
            is_deleted: false,
            notification_sent: false,
            version: 1,
        };

        let definitions: Vec<StepDefinition> = shape
            .iter()
            .zip(1..)
            .map(|(head, order)| StepDefinition {
                id: Uuid::new_v4(),
                category_id: Uuid::nil(),
                order: order * 10,
                requirement: if *head {
                    StepRequirement::HeadApproval
                } else {
                    StepRequirement::RoleApproval { role_id }
                },
                is_active: true,
            })
            .collect();

        let records = definitions
            .iter()
            .enumerate()
            .map(|(i, d)| StepRecord {
                id: Uuid::new_v4(),
                enrollment_id: enrollment.id,
                step_definition_id: d.id,
                approved_by: None,
                decided_at: None,
                approved: i < approved_prefix,
                rejected: false,
                comments: None,
                is_deleted: false,
            })
            .collect();

        Self {
            enrollment,
            subject: Subject {
                user_id: subject_id,
                department_id: Some(department_id),
            },
            definitions,
            records,
            role_id,
        }
    }

    /// An actor that satisfies every step requirement of the chain.
    fn universal_approver(&self, user_id: Uuid) -> Actor {
        Actor {
            user_id,
            name: "Approver".to_string(),
            department_id: self.subject.department_id,
            is_department_head: true,
            roles: vec![self.role_id],
        }
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// The subject can never approve or reject their own steps, whatever
    /// roles or headship they hold.
    #[test]
    fn prop_self_approval_is_never_allowed(
        shape in arb_chain_shape(),
        subject_id in arb_uuid(),
        department_id in arb_uuid(),
        reject in any::<bool>(),
    ) {
        let generated = Generated::new(&shape, 0, subject_id, department_id);
        let chain = ApprovalChain::build(&generated.records, &generated.definitions);
        let ctx = DecisionContext {
            enrollment: &generated.enrollment,
            subject: generated.subject,
            chain: &chain,
        };
        let actor = generated.universal_approver(subject_id);
        let verdict = if reject { Verdict::Reject } else { Verdict::Approve };

        let result = ApprovalAuthorizer::authorize(&ctx, generated.definitions[0].id, verdict, &actor);
        prop_assert!(matches!(result, Err(WorkflowError::SelfApproval)));
    }

    /// Approving a step succeeds exactly when every earlier step is approved,
    /// and otherwise names the first pending order.
    #[test]
    fn prop_approval_respects_chain_order(
        shape in arb_chain_shape(),
        prefix_seed in any::<usize>(),
        target_seed in any::<usize>(),
    ) {
        let approved_prefix = prefix_seed % shape.len();
        let generated = Generated::new(&shape, approved_prefix, Uuid::new_v4(), Uuid::new_v4());
        let chain = ApprovalChain::build(&generated.records, &generated.definitions);
        let ctx = DecisionContext {
            enrollment: &generated.enrollment,
            subject: generated.subject,
            chain: &chain,
        };
        let actor = generated.universal_approver(Uuid::new_v4());

        // Only undecided steps are interesting here
        let target = approved_prefix + target_seed % (shape.len() - approved_prefix);
        let result = ApprovalAuthorizer::authorize(
            &ctx,
            generated.definitions[target].id,
            Verdict::Approve,
            &actor,
        );

        if target == approved_prefix {
            prop_assert!(result.is_ok());
        } else {
            let expected = generated.definitions[approved_prefix].order;
            match result {
                Err(WorkflowError::PredecessorIncomplete { pending_order }) => {
                    prop_assert_eq!(pending_order, expected);
                }
                other => prop_assert!(false, "Expected PredecessorIncomplete, got {:?}", other),
            }
        }
    }

    /// Rejection is not bound by ordering: any undecided step may be rejected
    /// by an eligible approver.
    #[test]
    fn prop_rejection_ignores_ordering(
        shape in arb_chain_shape(),
        target_seed in any::<usize>(),
    ) {
        let generated = Generated::new(&shape, 0, Uuid::new_v4(), Uuid::new_v4());
        let chain = ApprovalChain::build(&generated.records, &generated.definitions);
        let ctx = DecisionContext {
            enrollment: &generated.enrollment,
            subject: generated.subject,
            chain: &chain,
        };
        let actor = generated.universal_approver(Uuid::new_v4());
        let target = target_seed % shape.len();

        let result = ApprovalAuthorizer::authorize(
            &ctx,
            generated.definitions[target].id,
            Verdict::Reject,
            &actor,
        );
        prop_assert!(result.is_ok());
    }

    /// A head from another department never satisfies a head step.
    #[test]
    fn prop_head_of_other_department_is_refused(
        subject_department in arb_uuid(),
        actor_department in arb_uuid(),
    ) {
        prop_assume!(subject_department != actor_department);

        let subject = Subject {
            user_id: Uuid::new_v4(),
            department_id: Some(subject_department),
        };
        let actor = Actor {
            user_id: Uuid::new_v4(),
            name: "Head".to_string(),
            department_id: Some(actor_department),
            is_department_head: true,
            roles: vec![],
        };

        let result = ApprovalAuthorizer::check_eligibility(&StepRequirement::HeadApproval, subject, &actor);
        prop_assert!(matches!(result, Err(WorkflowError::WrongDepartment)));
    }
}
