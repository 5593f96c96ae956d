//! Enrollment snapshots and the shared write helpers every workflow
//! operation goes through.
//!
//! All helpers take a generic connection so they run the same on the pool
//! and inside a transaction. Inside a transaction, always pass the
//! transaction: with a single-connection pool, reaching back to the pool
//! would wait forever.

use chrono::{DateTime, Utc};
use sea_orm::prelude::DateTimeWithTimeZone;
use sea_orm::sea_query::Expr;
use sea_orm::{ActiveEnum, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder, Set};
use serde::Serialize;
use uuid::Uuid;

use campus_core::workflow::{
    Actor, ApprovalAuthorizer, ApprovalChain, DecisionContext, EnrollmentState, EnrollmentStatus,
    StepDefinition, StepKind, StepRecord, Subject, WorkflowError,
};

use crate::entities::{
    approval_step_definitions, courses, enrollment_approval_steps, enrollments, users,
};

use super::convert::{enrollment_state, status_to_db, step_definition, step_record, to_utc};

// ============================================================================
// Views
// ============================================================================

/// One live step of an enrollment, as shown in listings.
#[derive(Debug, Clone, Serialize)]
pub struct StepView {
    /// Step record ID.
    pub record_id: Uuid,
    /// Definition the record tracks.
    pub step_definition_id: Uuid,
    /// Position in the chain.
    pub order: i32,
    /// Head or role step.
    pub kind: StepKind,
    /// Required role, for role steps.
    pub role_id: Option<Uuid>,
    /// Step approved.
    pub approved: bool,
    /// Step rejected.
    pub rejected: bool,
    /// Deciding actor.
    pub approved_by: Option<Uuid>,
    /// Decision time.
    pub decided_at: Option<DateTime<Utc>>,
    /// Approver comments.
    pub comments: Option<String>,
    /// True for the step that must be decided next.
    pub is_next: bool,
}

/// An enrollment with its live approval chain.
#[derive(Debug, Clone, Serialize)]
pub struct EnrollmentView {
    /// Enrollment row.
    pub enrollment: enrollments::Model,
    /// Live steps in chain order.
    pub steps: Vec<StepView>,
    /// Whether the requesting actor could approve the next step now.
    pub can_approve: bool,
}

// ============================================================================
// Snapshot
// ============================================================================

/// Everything needed to authorize and apply a decision on one enrollment.
#[derive(Debug, Clone)]
pub(crate) struct EnrollmentSnapshot {
    pub model: enrollments::Model,
    pub state: EnrollmentState,
    pub course: courses::Model,
    pub subject: Subject,
    pub definitions: Vec<StepDefinition>,
    pub records: Vec<StepRecord>,
}

impl EnrollmentSnapshot {
    /// Loads a non-deleted enrollment with its course, subject and steps.
    pub async fn load<C: ConnectionTrait>(
        conn: &C,
        enrollment_id: Uuid,
    ) -> Result<Self, WorkflowError> {
        let model = enrollments::Entity::find_by_id(enrollment_id)
            .filter(enrollments::Column::IsDeleted.eq(false))
            .one(conn)
            .await
            .map_err(|e| WorkflowError::Database(e.to_string()))?
            .ok_or(WorkflowError::EnrollmentNotFound(enrollment_id))?;

        Self::for_model(conn, model).await
    }

    /// Builds a snapshot around an already loaded enrollment row.
    pub async fn for_model<C: ConnectionTrait>(
        conn: &C,
        model: enrollments::Model,
    ) -> Result<Self, WorkflowError> {
        let course = courses::Entity::find_by_id(model.course_id)
            .one(conn)
            .await
            .map_err(|e| WorkflowError::Database(e.to_string()))?
            .ok_or(WorkflowError::CourseNotFound(model.course_id))?;

        let subject_user = users::Entity::find_by_id(model.user_id)
            .one(conn)
            .await
            .map_err(|e| WorkflowError::Database(e.to_string()))?;

        let definitions = load_definitions(conn, course.course_tab_id).await?;
        let records = load_live_records(conn, model.id).await?;

        Ok(Self {
            state: enrollment_state(&model),
            subject: Subject {
                user_id: model.user_id,
                department_id: subject_user.and_then(|u| u.department_id),
            },
            model,
            course,
            definitions,
            records,
        })
    }

    /// Live steps in chain order.
    pub fn chain(&self) -> ApprovalChain {
        ApprovalChain::build(&self.records, &self.definitions)
    }

    /// Listing view, annotated for `actor` when given.
    pub fn view(&self, actor: Option<&Actor>) -> EnrollmentView {
        let chain = self.chain();
        let next = if self.state.final_approval {
            None
        } else {
            chain.next_pending().map(|s| s.record.id)
        };

        let steps = chain
            .steps()
            .iter()
            .map(|s| StepView {
                record_id: s.record.id,
                step_definition_id: s.definition.id,
                order: s.order(),
                kind: s.definition.requirement.kind(),
                role_id: s.definition.requirement.role_id(),
                approved: s.record.approved,
                rejected: s.record.rejected,
                approved_by: s.record.approved_by,
                decided_at: s.record.decided_at,
                comments: s.record.comments.clone(),
                is_next: Some(s.record.id) == next,
            })
            .collect();

        let ctx = DecisionContext {
            enrollment: &self.state,
            subject: self.subject,
            chain: &chain,
        };
        let can_approve = actor.is_some_and(|a| ApprovalAuthorizer::can_act_on_next(&ctx, a));

        EnrollmentView {
            enrollment: self.model.clone(),
            steps,
            can_approve,
        }
    }
}

// ============================================================================
// Read helpers
// ============================================================================

/// All step definitions of a category, active or not, in chain order.
pub(crate) async fn load_definitions<C: ConnectionTrait>(
    conn: &C,
    course_tab_id: Uuid,
) -> Result<Vec<StepDefinition>, WorkflowError> {
    approval_step_definitions::Entity::find()
        .filter(approval_step_definitions::Column::CourseTabId.eq(course_tab_id))
        .order_by_asc(approval_step_definitions::Column::StepOrder)
        .all(conn)
        .await
        .map_err(|e| WorkflowError::Database(e.to_string()))?
        .iter()
        .map(step_definition)
        .collect()
}

/// Non-deleted step records of an enrollment.
pub(crate) async fn load_live_records<C: ConnectionTrait>(
    conn: &C,
    enrollment_id: Uuid,
) -> Result<Vec<StepRecord>, WorkflowError> {
    let records = enrollment_approval_steps::Entity::find()
        .filter(enrollment_approval_steps::Column::EnrollmentId.eq(enrollment_id))
        .filter(enrollment_approval_steps::Column::IsDeleted.eq(false))
        .order_by_asc(enrollment_approval_steps::Column::CreatedAt)
        .all(conn)
        .await
        .map_err(|e| WorkflowError::Database(e.to_string()))?;

    Ok(records.iter().map(step_record).collect())
}

/// A fresh undecided record for `step_definition_id`.
pub(crate) fn pending_record(enrollment_id: Uuid, step_definition_id: Uuid) -> StepRecord {
    StepRecord {
        id: Uuid::new_v4(),
        enrollment_id,
        step_definition_id,
        approved_by: None,
        decided_at: None,
        approved: false,
        rejected: false,
        comments: None,
        is_deleted: false,
    }
}

// ============================================================================
// Write helpers
// ============================================================================

/// Claims the enrollment for one write by bumping its version.
///
/// Returns false when another writer got there first, or when the
/// enrollment was finalized or withdrawn meanwhile.
pub(crate) async fn bump_version<C: ConnectionTrait>(
    conn: &C,
    enrollment_id: Uuid,
    version: i32,
    now: DateTime<Utc>,
) -> Result<bool, WorkflowError> {
    let result = enrollments::Entity::update_many()
        .col_expr(
            enrollments::Column::Version,
            Expr::col(enrollments::Column::Version).add(1),
        )
        .col_expr(
            enrollments::Column::UpdatedAt,
            Expr::value(DateTimeWithTimeZone::from(now)),
        )
        .filter(enrollments::Column::Id.eq(enrollment_id))
        .filter(enrollments::Column::Version.eq(version))
        .filter(enrollments::Column::FinalApproval.eq(false))
        .filter(enrollments::Column::IsDeleted.eq(false))
        .exec(conn)
        .await
        .map_err(|e| WorkflowError::Database(e.to_string()))?;

    Ok(result.rows_affected == 1)
}

/// Moves the enrollment to a terminal status.
pub(crate) async fn finalize<C: ConnectionTrait>(
    conn: &C,
    enrollment_id: Uuid,
    status: EnrollmentStatus,
    now: DateTime<Utc>,
) -> Result<(), WorkflowError> {
    enrollments::Entity::update_many()
        .col_expr(
            enrollments::Column::Status,
            Expr::value(status_to_db(status).to_value()),
        )
        .col_expr(
            enrollments::Column::FinalApproval,
            Expr::value(status.is_final()),
        )
        .col_expr(
            enrollments::Column::UpdatedAt,
            Expr::value(DateTimeWithTimeZone::from(now)),
        )
        .filter(enrollments::Column::Id.eq(enrollment_id))
        .exec(conn)
        .await
        .map_err(|e| WorkflowError::Database(e.to_string()))?;

    Ok(())
}

/// Inserts freshly planned pending records.
pub(crate) async fn insert_records<C: ConnectionTrait>(
    conn: &C,
    records: &[StepRecord],
    now: DateTime<Utc>,
) -> Result<(), WorkflowError> {
    if records.is_empty() {
        return Ok(());
    }

    let created_at = DateTimeWithTimeZone::from(now);
    let models = records
        .iter()
        .map(|r| enrollment_approval_steps::ActiveModel {
            id: Set(r.id),
            enrollment_id: Set(r.enrollment_id),
            step_definition_id: Set(r.step_definition_id),
            approved_by: Set(None),
            decided_at: Set(None),
            approved: Set(false),
            rejected: Set(false),
            comments: Set(None),
            is_deleted: Set(false),
            created_at: Set(created_at),
        });

    enrollment_approval_steps::Entity::insert_many(models)
        .exec_without_returning(conn)
        .await
        .map_err(|e| WorkflowError::Database(e.to_string()))?;

    Ok(())
}

/// Soft-deletes the given records, skipping any that carry a decision.
pub(crate) async fn soft_delete_undecided<C: ConnectionTrait>(
    conn: &C,
    record_ids: &[Uuid],
) -> Result<u64, WorkflowError> {
    if record_ids.is_empty() {
        return Ok(0);
    }

    let result = enrollment_approval_steps::Entity::update_many()
        .col_expr(enrollment_approval_steps::Column::IsDeleted, Expr::value(true))
        .filter(enrollment_approval_steps::Column::Id.is_in(record_ids.iter().copied()))
        .filter(enrollment_approval_steps::Column::Approved.eq(false))
        .filter(enrollment_approval_steps::Column::Rejected.eq(false))
        .exec(conn)
        .await
        .map_err(|e| WorkflowError::Database(e.to_string()))?;

    Ok(result.rows_affected)
}

/// Soft-deletes every live record of an enrollment.
pub(crate) async fn soft_delete_all_records<C: ConnectionTrait>(
    conn: &C,
    enrollment_id: Uuid,
) -> Result<u64, WorkflowError> {
    let result = enrollment_approval_steps::Entity::update_many()
        .col_expr(enrollment_approval_steps::Column::IsDeleted, Expr::value(true))
        .filter(enrollment_approval_steps::Column::EnrollmentId.eq(enrollment_id))
        .filter(enrollment_approval_steps::Column::IsDeleted.eq(false))
        .exec(conn)
        .await
        .map_err(|e| WorkflowError::Database(e.to_string()))?;

    Ok(result.rows_affected)
}

/// Re-reads an enrollment row by ID, deleted or not.
pub(crate) async fn reload<C: ConnectionTrait>(
    conn: &C,
    enrollment_id: Uuid,
) -> Result<enrollments::Model, WorkflowError> {
    enrollments::Entity::find_by_id(enrollment_id)
        .one(conn)
        .await
        .map_err(|e| WorkflowError::Database(e.to_string()))?
        .ok_or(WorkflowError::EnrollmentNotFound(enrollment_id))
}

/// Course start, for deadline checks.
pub(crate) fn course_start(course: &courses::Model) -> DateTime<Utc> {
    to_utc(course.starts_at)
}
