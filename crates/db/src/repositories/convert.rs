//! Conversions between stored rows and workflow domain types.

use chrono::{DateTime, Utc};
use sea_orm::prelude::DateTimeWithTimeZone;

use campus_core::workflow::{
    CourseSnapshot, EnrollmentState, EnrollmentStatus, StepDefinition, StepKind, StepRecord,
    StepRequirement, WorkflowError,
};

use crate::entities::{
    approval_step_definitions, courses, enrollment_approval_steps, enrollments,
    sea_orm_active_enums,
};

/// Converts a stored timestamp to UTC.
pub(crate) fn to_utc(at: DateTimeWithTimeZone) -> DateTime<Utc> {
    at.with_timezone(&Utc)
}

/// Converts database EnrollmentStatus to the workflow status.
pub(crate) const fn status_to_core(status: sea_orm_active_enums::EnrollmentStatus) -> EnrollmentStatus {
    match status {
        sea_orm_active_enums::EnrollmentStatus::Pending => EnrollmentStatus::Pending,
        sea_orm_active_enums::EnrollmentStatus::Approved => EnrollmentStatus::Approved,
        sea_orm_active_enums::EnrollmentStatus::Rejected => EnrollmentStatus::Rejected,
        sea_orm_active_enums::EnrollmentStatus::Excused => EnrollmentStatus::Excused,
    }
}

/// Converts a workflow status to its database column value.
pub(crate) const fn status_to_db(status: EnrollmentStatus) -> sea_orm_active_enums::EnrollmentStatus {
    match status {
        EnrollmentStatus::Pending => sea_orm_active_enums::EnrollmentStatus::Pending,
        EnrollmentStatus::Approved => sea_orm_active_enums::EnrollmentStatus::Approved,
        EnrollmentStatus::Rejected => sea_orm_active_enums::EnrollmentStatus::Rejected,
        EnrollmentStatus::Excused => sea_orm_active_enums::EnrollmentStatus::Excused,
    }
}

const fn kind_to_core(kind: sea_orm_active_enums::StepKind) -> StepKind {
    match kind {
        sea_orm_active_enums::StepKind::HeadApproval => StepKind::HeadApproval,
        sea_orm_active_enums::StepKind::RoleApproval => StepKind::RoleApproval,
    }
}

pub(crate) fn enrollment_state(model: &enrollments::Model) -> EnrollmentState {
    EnrollmentState {
        id: model.id,
        course_id: model.course_id,
        user_id: model.user_id,
        status: status_to_core(model.status),
        final_approval: model.final_approval,
        is_deleted: model.is_deleted,
        notification_sent: model.notification_sent,
        version: model.version,
    }
}

pub(crate) fn step_definition(
    model: &approval_step_definitions::Model,
) -> Result<StepDefinition, WorkflowError> {
    Ok(StepDefinition {
        id: model.id,
        category_id: model.course_tab_id,
        order: model.step_order,
        requirement: StepRequirement::from_parts(kind_to_core(model.kind), model.role_id)?,
        is_active: model.is_active,
    })
}

pub(crate) fn step_record(model: &enrollment_approval_steps::Model) -> StepRecord {
    StepRecord {
        id: model.id,
        enrollment_id: model.enrollment_id,
        step_definition_id: model.step_definition_id,
        approved_by: model.approved_by,
        decided_at: model.decided_at.map(to_utc),
        approved: model.approved,
        rejected: model.rejected,
        comments: model.comments.clone(),
        is_deleted: model.is_deleted,
    }
}

pub(crate) fn course_snapshot(model: &courses::Model) -> CourseSnapshot {
    CourseSnapshot {
        id: model.id,
        category_id: model.course_tab_id,
        is_published: model.is_published,
        available_seats: model.available_seats,
        starts_at: to_utc(model.starts_at),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(EnrollmentStatus::Pending)]
    #[case(EnrollmentStatus::Approved)]
    #[case(EnrollmentStatus::Rejected)]
    #[case(EnrollmentStatus::Excused)]
    fn test_status_column_mapping(#[case] status: EnrollmentStatus) {
        assert_eq!(status_to_core(status_to_db(status)), status);
    }

    #[test]
    fn test_invalid_role_step_is_reported() {
        let model = approval_step_definitions::Model {
            id: uuid::Uuid::new_v4(),
            course_tab_id: uuid::Uuid::new_v4(),
            step_order: 1,
            kind: sea_orm_active_enums::StepKind::RoleApproval,
            role_id: None,
            is_active: true,
            created_at: Utc::now().into(),
        };
        assert!(matches!(
            step_definition(&model),
            Err(WorkflowError::InvalidStepDefinition(_))
        ));
    }
}
