//! Enrollment admission and withdrawal rules.
//!
//! A (course, user) pair owns at most one enrollment row for its whole life.
//! Withdrawal soft-deletes it and a later request restores the same row.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::workflow::error::WorkflowError;
use crate::workflow::types::EnrollmentState;

/// Course facts the lifecycle needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CourseSnapshot {
    /// Course ID.
    pub id: Uuid,
    /// Course category (course tab) whose step configuration applies.
    pub category_id: Uuid,
    /// Only published courses accept enrollments.
    pub is_published: bool,
    /// Seats available to approved enrollments.
    pub available_seats: i32,
    /// When the course starts.
    pub starts_at: DateTime<Utc>,
}

/// What to do with an enrollment request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// Insert a new enrollment row.
    Create,
    /// Un-delete the existing row and regenerate its steps.
    Restore {
        /// The soft-deleted enrollment to restore.
        enrollment_id: Uuid,
    },
}

/// Stateless rules for creating, restoring and withdrawing enrollments.
pub struct EnrollmentLifecycle;

impl EnrollmentLifecycle {
    /// Decide how to admit an enrollment request.
    ///
    /// # Arguments
    /// * `course` - The target course
    /// * `existing` - The (course, user) row, including soft-deleted ones
    /// * `approved_count` - Non-deleted approved enrollments on the course
    ///
    /// Pending, rejected and excused enrollments never occupy a seat.
    pub fn admit(
        course: &CourseSnapshot,
        existing: Option<&EnrollmentState>,
        approved_count: u64,
    ) -> Result<Admission, WorkflowError> {
        if !course.is_published {
            return Err(WorkflowError::CourseNotPublished(course.id));
        }

        if existing.is_some_and(|e| !e.is_deleted) {
            return Err(WorkflowError::DuplicateEnrollment);
        }

        let seats = u64::try_from(course.available_seats.max(0)).unwrap_or_default();
        if approved_count >= seats {
            return Err(WorkflowError::CapacityExceeded {
                available_seats: course.available_seats,
            });
        }

        Ok(match existing {
            Some(e) => Admission::Restore { enrollment_id: e.id },
            None => Admission::Create,
        })
    }

    /// Only the enrolled user may withdraw.
    pub fn ensure_can_withdraw(
        enrollment: &EnrollmentState,
        actor_id: Uuid,
    ) -> Result<(), WorkflowError> {
        if enrollment.user_id != actor_id {
            return Err(WorkflowError::NotEnrollmentOwner);
        }
        Ok(())
    }
}
