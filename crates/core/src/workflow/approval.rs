//! Approval authorization for enrollment steps.
//!
//! Decides whether an actor may decide a given step right now. Checks run in
//! a fixed order and the first failure wins, so the caller always gets the
//! most fundamental reason first.

use uuid::Uuid;

use crate::workflow::error::WorkflowError;
use crate::workflow::types::{
    Actor, ApprovalChain, ChainStep, EnrollmentState, StepRequirement, Subject, Verdict,
};

/// Everything the authorizer needs to know about one enrollment.
#[derive(Debug, Clone)]
pub struct DecisionContext<'a> {
    /// The enrollment being decided.
    pub enrollment: &'a EnrollmentState,
    /// The enrolled user.
    pub subject: Subject,
    /// Live steps of the enrollment.
    pub chain: &'a ApprovalChain,
}

/// Stateless authorizer for step decisions.
pub struct ApprovalAuthorizer;

impl ApprovalAuthorizer {
    /// Check whether `actor` may give `verdict` on the step tracking
    /// `step_definition_id`.
    ///
    /// Checks, in order:
    /// 1. The enrollment is not finalized.
    /// 2. The step is live and undecided.
    /// 3. For approvals only, every lower-ordered live step is approved.
    ///    Rejections skip this because a rejection closes the whole chain.
    /// 4. The actor is not the subject.
    /// 5. The actor satisfies the step's requirement.
    ///
    /// # Returns
    /// The live step on success.
    pub fn authorize<'c>(
        ctx: &DecisionContext<'c>,
        step_definition_id: Uuid,
        verdict: Verdict,
        actor: &Actor,
    ) -> Result<&'c ChainStep, WorkflowError> {
        if ctx.enrollment.final_approval || ctx.enrollment.status.is_final() {
            return Err(WorkflowError::AlreadyFinalized);
        }

        let step = ctx
            .chain
            .find(step_definition_id)
            .ok_or(WorkflowError::StepNotFound {
                enrollment_id: ctx.enrollment.id,
                step_definition_id,
            })?;

        if step.record.is_decided() {
            return Err(WorkflowError::AlreadyDecided);
        }

        if verdict == Verdict::Approve {
            Self::check_ordering(ctx.chain, step)?;
        }

        Self::check_not_self(ctx.subject, actor)?;
        Self::check_eligibility(&step.definition.requirement, ctx.subject, actor)?;

        Ok(step)
    }

    /// Every live step ordered before `step` must be approved.
    pub fn check_ordering(chain: &ApprovalChain, step: &ChainStep) -> Result<(), WorkflowError> {
        match chain.unapproved_before(step.order()).next() {
            Some(pending) => Err(WorkflowError::PredecessorIncomplete {
                pending_order: pending.order(),
            }),
            None => Ok(()),
        }
    }

    /// The subject may never decide their own enrollment.
    pub fn check_not_self(subject: Subject, actor: &Actor) -> Result<(), WorkflowError> {
        if actor.user_id == subject.user_id {
            return Err(WorkflowError::SelfApproval);
        }
        Ok(())
    }

    /// Head steps need the head of the subject's department; role steps need
    /// the role.
    pub fn check_eligibility(
        requirement: &StepRequirement,
        subject: Subject,
        actor: &Actor,
    ) -> Result<(), WorkflowError> {
        match requirement {
            StepRequirement::HeadApproval => {
                let same_department = match (actor.department_id, subject.department_id) {
                    (Some(a), Some(s)) => a == s,
                    _ => false,
                };
                if !same_department {
                    return Err(WorkflowError::WrongDepartment);
                }
                if !actor.is_department_head {
                    return Err(WorkflowError::NotHead);
                }
                Ok(())
            }
            StepRequirement::RoleApproval { role_id } => {
                if actor.has_role(*role_id) {
                    Ok(())
                } else {
                    Err(WorkflowError::MissingRole { role_id: *role_id })
                }
            }
        }
    }

    /// Returns true if `actor` could approve the chain's next pending step.
    ///
    /// Used to annotate listings; never a substitute for [`Self::authorize`].
    #[must_use]
    pub fn can_act_on_next(ctx: &DecisionContext<'_>, actor: &Actor) -> bool {
        ctx.chain.next_pending().is_some_and(|next| {
            Self::authorize(ctx, next.definition.id, Verdict::Approve, actor).is_ok()
        })
    }
}
