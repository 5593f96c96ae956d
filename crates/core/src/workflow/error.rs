//! Workflow error types for enrollment approval.
//!
//! Every authorization and state check maps to its own variant so that
//! clients can tell "earlier approvers still pending" apart from "you cannot
//! approve your own request" without parsing messages.

use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

use crate::workflow::types::EnrollmentStatus;

/// Errors that can occur during workflow operations.
#[derive(Debug, Error)]
pub enum WorkflowError {
    /// Enrollment not found (or soft-deleted).
    #[error("Enrollment {0} not found")]
    EnrollmentNotFound(Uuid),

    /// No live step for the given definition on this enrollment.
    #[error("Approval step {step_definition_id} not found on enrollment {enrollment_id}")]
    StepNotFound {
        /// The enrollment.
        enrollment_id: Uuid,
        /// The requested step definition.
        step_definition_id: Uuid,
    },

    /// Course not found.
    #[error("Course {0} not found")]
    CourseNotFound(Uuid),

    /// Course exists but is not open for enrollment.
    #[error("Course {0} is not published")]
    CourseNotPublished(Uuid),

    /// The enrollment already reached a final decision.
    #[error("Enrollment has already been finalized")]
    AlreadyFinalized,

    /// The step already carries an approval or rejection.
    #[error("This step has already been approved or rejected")]
    AlreadyDecided,

    /// A lower-ordered step is still awaiting approval.
    #[error("Earlier approval step {pending_order} is still pending")]
    PredecessorIncomplete {
        /// Order of the first unapproved predecessor.
        pending_order: i32,
    },

    /// The actor is the enrollment's subject.
    #[error("You cannot approve or reject your own enrollment")]
    SelfApproval,

    /// Head step, but the actor is outside the subject's department.
    #[error("Only the head of the enrollee's department can decide this step")]
    WrongDepartment,

    /// Head step, but the actor is not a department head.
    #[error("Only a department head can decide this step")]
    NotHead,

    /// Role step, but the actor lacks the role.
    #[error("Role {role_id} is required to decide this step")]
    MissingRole {
        /// The role the step requires.
        role_id: Uuid,
    },

    /// All seats are taken by approved enrollments.
    #[error("Course is full ({available_seats} seats)")]
    CapacityExceeded {
        /// Configured seat count.
        available_seats: i32,
    },

    /// The user already has an active enrollment for this course.
    #[error("User is already enrolled in this course")]
    DuplicateEnrollment,

    /// Direct approve/reject attempted while step records exist.
    #[error("Enrollment has approval steps; decide them step by step")]
    InvalidLegacyPath,

    /// Too close to course start to excuse.
    #[error("Excuse window closed at {deadline}")]
    ExcuseWindowClosed {
        /// Last instant an excuse was accepted.
        deadline: DateTime<Utc>,
    },

    /// Only approved enrollments can be excused.
    #[error("Enrollment in status {status} cannot be excused")]
    NotExcusable {
        /// The current status.
        status: EnrollmentStatus,
    },

    /// Only the enrolled user may perform this action.
    #[error("Only the enrolled user can perform this action")]
    NotEnrollmentOwner,

    /// The action requires an approved enrollment.
    #[error("Enrollment in status {status} is not approved")]
    NotApproved {
        /// The current status.
        status: EnrollmentStatus,
    },

    /// Stored step configuration violates its invariants.
    #[error("Invalid step definition: {0}")]
    InvalidStepDefinition(String),

    /// Lost the optimistic concurrency race too many times.
    #[error("Enrollment {0} was modified concurrently, please retry")]
    ConcurrentModification(Uuid),

    /// The notification collaborator reported a failure.
    #[error("Notification for enrollment {0} could not be sent")]
    NotificationFailed(Uuid),

    /// Database error.
    #[error("Database error: {0}")]
    Database(String),
}

impl WorkflowError {
    /// Returns the HTTP status code for this error.
    #[must_use]
    pub fn status_code(&self) -> u16 {
        match self {
            Self::EnrollmentNotFound(_) | Self::StepNotFound { .. } | Self::CourseNotFound(_) => {
                404
            }

            Self::SelfApproval
            | Self::WrongDepartment
            | Self::NotHead
            | Self::MissingRole { .. }
            | Self::NotEnrollmentOwner => 403,

            Self::AlreadyFinalized
            | Self::AlreadyDecided
            | Self::DuplicateEnrollment
            | Self::ConcurrentModification(_) => 409,

            Self::CourseNotPublished(_)
            | Self::PredecessorIncomplete { .. }
            | Self::CapacityExceeded { .. }
            | Self::InvalidLegacyPath
            | Self::ExcuseWindowClosed { .. }
            | Self::NotExcusable { .. }
            | Self::NotApproved { .. } => 422,

            Self::NotificationFailed(_) => 502,

            Self::InvalidStepDefinition(_) | Self::Database(_) => 500,
        }
    }

    /// Returns the error code for API responses.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::EnrollmentNotFound(_) => "ENROLLMENT_NOT_FOUND",
            Self::StepNotFound { .. } => "STEP_NOT_FOUND",
            Self::CourseNotFound(_) => "COURSE_NOT_FOUND",
            Self::CourseNotPublished(_) => "COURSE_NOT_PUBLISHED",
            Self::AlreadyFinalized => "ALREADY_FINALIZED",
            Self::AlreadyDecided => "ALREADY_DECIDED",
            Self::PredecessorIncomplete { .. } => "PREDECESSOR_INCOMPLETE",
            Self::SelfApproval => "SELF_APPROVAL",
            Self::WrongDepartment => "WRONG_DEPARTMENT",
            Self::NotHead => "NOT_HEAD",
            Self::MissingRole { .. } => "MISSING_ROLE",
            Self::CapacityExceeded { .. } => "CAPACITY_EXCEEDED",
            Self::DuplicateEnrollment => "DUPLICATE_ENROLLMENT",
            Self::InvalidLegacyPath => "INVALID_LEGACY_PATH",
            Self::ExcuseWindowClosed { .. } => "EXCUSE_WINDOW_CLOSED",
            Self::NotExcusable { .. } => "NOT_EXCUSABLE",
            Self::NotEnrollmentOwner => "NOT_ENROLLMENT_OWNER",
            Self::NotApproved { .. } => "NOT_APPROVED",
            Self::InvalidStepDefinition(_) => "INVALID_STEP_DEFINITION",
            Self::ConcurrentModification(_) => "CONCURRENT_MODIFICATION",
            Self::NotificationFailed(_) => "NOTIFICATION_FAILED",
            Self::Database(_) => "DATABASE_ERROR",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(WorkflowError::EnrollmentNotFound(Uuid::nil()), 404, "ENROLLMENT_NOT_FOUND")]
    #[case(
        WorkflowError::StepNotFound { enrollment_id: Uuid::nil(), step_definition_id: Uuid::nil() },
        404,
        "STEP_NOT_FOUND"
    )]
    #[case(WorkflowError::CourseNotFound(Uuid::nil()), 404, "COURSE_NOT_FOUND")]
    #[case(WorkflowError::AlreadyFinalized, 409, "ALREADY_FINALIZED")]
    #[case(WorkflowError::AlreadyDecided, 409, "ALREADY_DECIDED")]
    #[case(
        WorkflowError::PredecessorIncomplete { pending_order: 1 },
        422,
        "PREDECESSOR_INCOMPLETE"
    )]
    #[case(WorkflowError::SelfApproval, 403, "SELF_APPROVAL")]
    #[case(WorkflowError::WrongDepartment, 403, "WRONG_DEPARTMENT")]
    #[case(WorkflowError::NotHead, 403, "NOT_HEAD")]
    #[case(WorkflowError::MissingRole { role_id: Uuid::nil() }, 403, "MISSING_ROLE")]
    #[case(WorkflowError::CapacityExceeded { available_seats: 3 }, 422, "CAPACITY_EXCEEDED")]
    #[case(WorkflowError::DuplicateEnrollment, 409, "DUPLICATE_ENROLLMENT")]
    #[case(WorkflowError::InvalidLegacyPath, 422, "INVALID_LEGACY_PATH")]
    #[case(
        WorkflowError::NotExcusable { status: EnrollmentStatus::Pending },
        422,
        "NOT_EXCUSABLE"
    )]
    #[case(WorkflowError::ConcurrentModification(Uuid::nil()), 409, "CONCURRENT_MODIFICATION")]
    #[case(WorkflowError::NotificationFailed(Uuid::nil()), 502, "NOTIFICATION_FAILED")]
    #[case(WorkflowError::Database("boom".to_string()), 500, "DATABASE_ERROR")]
    fn test_error_mapping(
        #[case] err: WorkflowError,
        #[case] status: u16,
        #[case] code: &'static str,
    ) {
        assert_eq!(err.status_code(), status);
        assert_eq!(err.error_code(), code);
    }

    #[test]
    fn test_messages_are_user_facing() {
        assert_eq!(
            WorkflowError::PredecessorIncomplete { pending_order: 2 }.to_string(),
            "Earlier approval step 2 is still pending"
        );
        assert_eq!(
            WorkflowError::SelfApproval.to_string(),
            "You cannot approve or reject your own enrollment"
        );
        assert!(
            WorkflowError::NotExcusable {
                status: EnrollmentStatus::Rejected
            }
            .to_string()
            .contains("rejected")
        );
    }
}
