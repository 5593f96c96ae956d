//! Workflow service for enrollment state transitions.
//!
//! This module implements the state machine logic for moving an enrollment
//! through its approval chain. Everything here is pure: the persistence layer
//! loads a snapshot, asks the service what should happen, then writes the
//! returned action.

use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use crate::workflow::approval::{ApprovalAuthorizer, DecisionContext};
use crate::workflow::error::WorkflowError;
use crate::workflow::types::{
    Actor, ApprovalChain, ChainStatus, EnrollmentState, EnrollmentStatus, Verdict,
};

/// A validated decision on one step record, ready to persist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepDecision {
    /// Record to update.
    pub step_record_id: Uuid,
    /// Definition the record tracks.
    pub step_definition_id: Uuid,
    /// Approve or reject.
    pub verdict: Verdict,
    /// The deciding actor.
    pub decided_by: Uuid,
    /// Decision time.
    pub decided_at: DateTime<Utc>,
    /// Approver comments.
    pub comments: Option<String>,
}

/// Stateless service for enrollment workflow transitions.
pub struct WorkflowService;

impl WorkflowService {
    /// Validate a step decision.
    ///
    /// # Arguments
    /// * `ctx` - Enrollment, subject and live chain
    /// * `step_definition_id` - The step being decided
    /// * `verdict` - Approve or reject
    /// * `actor` - The approver
    /// * `comments` - Optional comments (blank comments are dropped)
    /// * `now` - Decision time
    ///
    /// # Returns
    /// * `Ok(StepDecision)` if the actor may decide the step
    /// * `Err(WorkflowError)` with the first failing authorization check
    pub fn decide(
        ctx: &DecisionContext<'_>,
        step_definition_id: Uuid,
        verdict: Verdict,
        actor: &Actor,
        comments: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<StepDecision, WorkflowError> {
        let step = ApprovalAuthorizer::authorize(ctx, step_definition_id, verdict, actor)?;

        Ok(StepDecision {
            step_record_id: step.record.id,
            step_definition_id,
            verdict,
            decided_by: actor.user_id,
            decided_at: now,
            comments: comments.filter(|c| !c.trim().is_empty()),
        })
    }

    /// Final status the enrollment should move to given its live chain.
    ///
    /// # Returns
    /// * `Some(Rejected)` if any live step is rejected
    /// * `Some(Approved)` if every live step is approved, including when
    ///   there are none
    /// * `None` while steps are still pending
    #[must_use]
    pub fn resolve(chain: &ApprovalChain) -> Option<EnrollmentStatus> {
        match chain.status() {
            ChainStatus::InProgress => None,
            ChainStatus::Complete => Some(EnrollmentStatus::Approved),
            ChainStatus::Rejected => Some(EnrollmentStatus::Rejected),
        }
    }

    /// Validate a direct decision that bypasses the step chain.
    ///
    /// Only enrollments without any live step record may use this path.
    ///
    /// # Returns
    /// The status to finalize with.
    pub fn legacy_decide(
        enrollment: &EnrollmentState,
        has_live_steps: bool,
        verdict: Verdict,
        actor: &Actor,
    ) -> Result<EnrollmentStatus, WorkflowError> {
        if enrollment.final_approval || enrollment.status.is_final() {
            return Err(WorkflowError::AlreadyFinalized);
        }
        if has_live_steps {
            return Err(WorkflowError::InvalidLegacyPath);
        }
        if actor.user_id == enrollment.user_id {
            return Err(WorkflowError::SelfApproval);
        }

        Ok(match verdict {
            Verdict::Approve => EnrollmentStatus::Approved,
            Verdict::Reject => EnrollmentStatus::Rejected,
        })
    }

    /// Last instant at which an approved enrollment may still be excused.
    ///
    /// Saturates at the representable range instead of overflowing.
    #[must_use]
    pub fn excuse_deadline(course_starts_at: DateTime<Utc>, window_hours: i64) -> DateTime<Utc> {
        Duration::try_hours(window_hours)
            .and_then(|window| course_starts_at.checked_sub_signed(window))
            .unwrap_or(if window_hours >= 0 {
                DateTime::<Utc>::MIN_UTC
            } else {
                DateTime::<Utc>::MAX_UTC
            })
    }

    /// Validate an excuse request.
    ///
    /// # Returns
    /// * `Ok(EnrollmentStatus::Excused)` if the subject excuses an approved
    ///   enrollment strictly before the deadline
    /// * `Err(WorkflowError::NotEnrollmentOwner)` for anyone else
    /// * `Err(WorkflowError::NotExcusable)` unless approved
    /// * `Err(WorkflowError::ExcuseWindowClosed)` at or after the deadline
    pub fn excuse(
        enrollment: &EnrollmentState,
        actor_id: Uuid,
        course_starts_at: DateTime<Utc>,
        window_hours: i64,
        now: DateTime<Utc>,
    ) -> Result<EnrollmentStatus, WorkflowError> {
        if actor_id != enrollment.user_id {
            return Err(WorkflowError::NotEnrollmentOwner);
        }
        if enrollment.status != EnrollmentStatus::Approved {
            return Err(WorkflowError::NotExcusable {
                status: enrollment.status,
            });
        }

        let deadline = Self::excuse_deadline(course_starts_at, window_hours);
        if now >= deadline {
            return Err(WorkflowError::ExcuseWindowClosed { deadline });
        }

        Ok(EnrollmentStatus::Excused)
    }

    /// Check that a notification can be re-sent for this enrollment.
    pub fn ensure_resendable(enrollment: &EnrollmentState) -> Result<(), WorkflowError> {
        if enrollment.status == EnrollmentStatus::Approved {
            Ok(())
        } else {
            Err(WorkflowError::NotApproved {
                status: enrollment.status,
            })
        }
    }

    /// Check if a status transition is valid.
    ///
    /// Valid transitions:
    /// - Pending → Approved
    /// - Pending → Rejected
    /// - Approved → Excused
    #[must_use]
    pub fn is_valid_transition(from: EnrollmentStatus, to: EnrollmentStatus) -> bool {
        matches!(
            (from, to),
            (
                EnrollmentStatus::Pending,
                EnrollmentStatus::Approved | EnrollmentStatus::Rejected
            ) | (EnrollmentStatus::Approved, EnrollmentStatus::Excused)
        )
    }

    /// Whether the terminal flag must be set for a status.
    #[must_use]
    pub fn final_approval_for(status: EnrollmentStatus) -> bool {
        status.is_final()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflow::types::{StepDefinition, StepRecord, StepRequirement, Subject};
    use chrono::TimeZone;

    fn enrollment(status: EnrollmentStatus) -> EnrollmentState {
        EnrollmentState {
            id: Uuid::new_v4(),
            course_id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            status,
            final_approval: status.is_final(),
            is_deleted: false,
            notification_sent: false,
            version: 0,
        }
    }

    fn approver(role: Uuid) -> Actor {
        Actor {
            user_id: Uuid::new_v4(),
            name: "approver".to_string(),
            department_id: None,
            is_department_head: false,
            roles: vec![role],
        }
    }

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 10, 9, 0, 0).unwrap()
    }

    #[test]
    fn test_decide_drops_blank_comments() {
        let role = Uuid::new_v4();
        let state = enrollment(EnrollmentStatus::Pending);
        let def = StepDefinition {
            id: Uuid::new_v4(),
            category_id: Uuid::nil(),
            order: 1,
            requirement: StepRequirement::RoleApproval { role_id: role },
            is_active: true,
        };
        let record = StepRecord {
            id: Uuid::new_v4(),
            enrollment_id: state.id,
            step_definition_id: def.id,
            approved_by: None,
            decided_at: None,
            approved: false,
            rejected: false,
            comments: None,
            is_deleted: false,
        };
        let chain = ApprovalChain::build(&[record.clone()], &[def.clone()]);
        let ctx = DecisionContext {
            enrollment: &state,
            subject: Subject {
                user_id: state.user_id,
                department_id: None,
            },
            chain: &chain,
        };
        let actor = approver(role);

        let decision = WorkflowService::decide(
            &ctx,
            def.id,
            Verdict::Approve,
            &actor,
            Some("   ".to_string()),
            start(),
        )
        .unwrap();

        assert_eq!(decision.step_record_id, record.id);
        assert_eq!(decision.decided_by, actor.user_id);
        assert_eq!(decision.comments, None);
    }

    #[test]
    fn test_resolve_empty_chain_approves() {
        assert_eq!(
            WorkflowService::resolve(&ApprovalChain::default()),
            Some(EnrollmentStatus::Approved)
        );
    }

    #[test]
    fn test_legacy_decide() {
        let state = enrollment(EnrollmentStatus::Pending);
        let actor = approver(Uuid::new_v4());

        assert_eq!(
            WorkflowService::legacy_decide(&state, false, Verdict::Approve, &actor).unwrap(),
            EnrollmentStatus::Approved
        );
        assert_eq!(
            WorkflowService::legacy_decide(&state, false, Verdict::Reject, &actor).unwrap(),
            EnrollmentStatus::Rejected
        );
    }

    #[test]
    fn test_legacy_decide_blocked_by_live_steps() {
        let state = enrollment(EnrollmentStatus::Pending);
        assert!(matches!(
            WorkflowService::legacy_decide(&state, true, Verdict::Approve, &approver(Uuid::nil())),
            Err(WorkflowError::InvalidLegacyPath)
        ));
    }

    #[test]
    fn test_legacy_decide_self() {
        let state = enrollment(EnrollmentStatus::Pending);
        let mut me = approver(Uuid::nil());
        me.user_id = state.user_id;
        assert!(matches!(
            WorkflowService::legacy_decide(&state, false, Verdict::Approve, &me),
            Err(WorkflowError::SelfApproval)
        ));
    }

    #[test]
    fn test_legacy_decide_finalized() {
        let state = enrollment(EnrollmentStatus::Approved);
        assert!(matches!(
            WorkflowService::legacy_decide(&state, false, Verdict::Reject, &approver(Uuid::nil())),
            Err(WorkflowError::AlreadyFinalized)
        ));
    }

    #[test]
    fn test_excuse_before_deadline() {
        let state = enrollment(EnrollmentStatus::Approved);
        let now = start() - Duration::hours(25);
        assert_eq!(
            WorkflowService::excuse(&state, state.user_id, start(), 24, now).unwrap(),
            EnrollmentStatus::Excused
        );
    }

    #[test]
    fn test_excuse_at_deadline_is_closed() {
        let state = enrollment(EnrollmentStatus::Approved);
        let now = start() - Duration::hours(24);
        assert!(matches!(
            WorkflowService::excuse(&state, state.user_id, start(), 24, now),
            Err(WorkflowError::ExcuseWindowClosed { deadline }) if deadline == now
        ));
    }

    #[test]
    fn test_excuse_deadline_saturates_on_huge_windows() {
        assert_eq!(
            WorkflowService::excuse_deadline(start(), i64::MAX),
            DateTime::<Utc>::MIN_UTC
        );
        assert_eq!(
            WorkflowService::excuse_deadline(start(), i64::MIN),
            DateTime::<Utc>::MAX_UTC
        );

        let state = enrollment(EnrollmentStatus::Approved);
        assert!(matches!(
            WorkflowService::excuse(&state, state.user_id, start(), i64::MAX, start() - Duration::days(7)),
            Err(WorkflowError::ExcuseWindowClosed { .. })
        ));
    }

    #[test]
    fn test_excuse_requires_owner() {
        let state = enrollment(EnrollmentStatus::Approved);
        assert!(matches!(
            WorkflowService::excuse(&state, Uuid::new_v4(), start(), 24, start() - Duration::days(7)),
            Err(WorkflowError::NotEnrollmentOwner)
        ));
    }

    #[test]
    fn test_excuse_requires_approved() {
        for status in [
            EnrollmentStatus::Pending,
            EnrollmentStatus::Rejected,
            EnrollmentStatus::Excused,
        ] {
            let state = enrollment(status);
            assert!(matches!(
                WorkflowService::excuse(&state, state.user_id, start(), 24, start() - Duration::days(7)),
                Err(WorkflowError::NotExcusable { .. })
            ));
        }
    }

    #[test]
    fn test_ensure_resendable() {
        assert!(WorkflowService::ensure_resendable(&enrollment(EnrollmentStatus::Approved)).is_ok());
        assert!(matches!(
            WorkflowService::ensure_resendable(&enrollment(EnrollmentStatus::Excused)),
            Err(WorkflowError::NotApproved { .. })
        ));
    }

    #[test]
    fn test_is_valid_transition() {
        assert!(WorkflowService::is_valid_transition(
            EnrollmentStatus::Pending,
            EnrollmentStatus::Approved
        ));
        assert!(WorkflowService::is_valid_transition(
            EnrollmentStatus::Pending,
            EnrollmentStatus::Rejected
        ));
        assert!(WorkflowService::is_valid_transition(
            EnrollmentStatus::Approved,
            EnrollmentStatus::Excused
        ));

        assert!(!WorkflowService::is_valid_transition(
            EnrollmentStatus::Pending,
            EnrollmentStatus::Excused
        ));
        assert!(!WorkflowService::is_valid_transition(
            EnrollmentStatus::Rejected,
            EnrollmentStatus::Approved
        ));
        assert!(!WorkflowService::is_valid_transition(
            EnrollmentStatus::Excused,
            EnrollmentStatus::Pending
        ));
    }

    #[test]
    fn test_final_approval_tracks_status() {
        assert!(!WorkflowService::final_approval_for(EnrollmentStatus::Pending));
        assert!(WorkflowService::final_approval_for(EnrollmentStatus::Approved));
        assert!(WorkflowService::final_approval_for(EnrollmentStatus::Rejected));
        assert!(WorkflowService::final_approval_for(EnrollmentStatus::Excused));
    }
}
