//! Enrollment repository: admission, restore, withdrawal and listings.
//!
//! A (course, user) pair owns one row for its whole life. Lookups come in two
//! flavours on purpose: [`EnrollmentRepository::find_active`] hides
//! soft-deleted rows, [`EnrollmentRepository::find_including_deleted`] does
//! not and feeds the restore path.

use sea_orm::prelude::DateTimeWithTimeZone;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveEnum, ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, Set, SqlErr, TransactionTrait,
};
use tracing::info;
use uuid::Uuid;

use campus_core::workflow::{
    Actor, Admission, EnrollmentLifecycle, EnrollmentStatus, StepSyncEngine, WorkflowError,
};

use crate::entities::{courses, enrollments, sea_orm_active_enums};

use super::convert::{course_snapshot, enrollment_state, status_to_db};
use super::snapshot::{
    EnrollmentSnapshot, EnrollmentView, finalize, insert_records, load_definitions,
    pending_record, reload, soft_delete_all_records,
};
use super::workflow::WorkflowRepository;

/// Filter for course enrollment listings.
///
/// Every field is optional and the present ones are AND-ed together.
#[derive(Debug, Clone, Default)]
pub struct EnrollmentQuery {
    /// Only enrollments with this status.
    pub status: Option<EnrollmentStatus>,
    /// Only this user's enrollment.
    pub user_id: Option<Uuid>,
    /// Include approved, rejected and excused enrollments.
    pub include_finalized: bool,
}

impl EnrollmentQuery {
    /// Builds the SQL condition for one course.
    #[must_use]
    pub fn condition(&self, course_id: Uuid) -> Condition {
        Condition::all()
            .add(enrollments::Column::CourseId.eq(course_id))
            .add(enrollments::Column::IsDeleted.eq(false))
            .add_option(
                self.status
                    .map(|s| enrollments::Column::Status.eq(status_to_db(s))),
            )
            .add_option(self.user_id.map(|u| enrollments::Column::UserId.eq(u)))
            .add_option(
                (!self.include_finalized).then(|| enrollments::Column::FinalApproval.eq(false)),
            )
    }
}

/// Enrollment repository.
#[derive(Clone)]
pub struct EnrollmentRepository {
    db: DatabaseConnection,
    workflow: WorkflowRepository,
}

impl EnrollmentRepository {
    /// Creates a new enrollment repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection, workflow: WorkflowRepository) -> Self {
        Self { db, workflow }
    }

    /// Finds a non-deleted enrollment by ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn find_active(
        &self,
        enrollment_id: Uuid,
    ) -> Result<Option<enrollments::Model>, WorkflowError> {
        enrollments::Entity::find_by_id(enrollment_id)
            .filter(enrollments::Column::IsDeleted.eq(false))
            .one(&self.db)
            .await
            .map_err(|e| WorkflowError::Database(e.to_string()))
    }

    /// Finds the enrollment row for a (course, user) pair, soft-deleted or not.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn find_including_deleted(
        &self,
        course_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<enrollments::Model>, WorkflowError> {
        enrollments::Entity::find()
            .filter(enrollments::Column::CourseId.eq(course_id))
            .filter(enrollments::Column::UserId.eq(user_id))
            .one(&self.db)
            .await
            .map_err(|e| WorkflowError::Database(e.to_string()))
    }

    /// Counts the seats taken on a course: non-deleted approved enrollments.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn approved_count(&self, course_id: Uuid) -> Result<u64, WorkflowError> {
        enrollments::Entity::find()
            .filter(enrollments::Column::CourseId.eq(course_id))
            .filter(enrollments::Column::IsDeleted.eq(false))
            .filter(enrollments::Column::Status.eq(sea_orm_active_enums::EnrollmentStatus::Approved))
            .count(&self.db)
            .await
            .map_err(|e| WorkflowError::Database(e.to_string()))
    }

    /// Enrolls a user in a course, or restores their withdrawn enrollment.
    ///
    /// The enrollment starts Pending with a full set of step records for the
    /// course category's active definitions. With no active definitions it
    /// is approved immediately and the approval notification fires.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Course is not found or not published
    /// - The user already holds a live enrollment
    /// - The course is full
    /// - Database operation fails
    pub async fn enroll(
        &self,
        course_id: Uuid,
        user_id: Uuid,
    ) -> Result<enrollments::Model, WorkflowError> {
        let course = courses::Entity::find_by_id(course_id)
            .filter(courses::Column::IsDeleted.eq(false))
            .one(&self.db)
            .await
            .map_err(|e| WorkflowError::Database(e.to_string()))?
            .ok_or(WorkflowError::CourseNotFound(course_id))?;

        let existing = self.find_including_deleted(course_id, user_id).await?;
        let approved_count = self.approved_count(course_id).await?;
        let admission = EnrollmentLifecycle::admit(
            &course_snapshot(&course),
            existing.as_ref().map(enrollment_state).as_ref(),
            approved_count,
        )?;

        let definitions = load_definitions(&self.db, course.course_tab_id).await?;
        let now = self.workflow.clock().now();
        let enrolled_at = DateTimeWithTimeZone::from(now);

        let txn = self
            .db
            .begin()
            .await
            .map_err(|e| WorkflowError::Database(e.to_string()))?;

        let enrollment_id = match admission {
            Admission::Create => {
                let enrollment = enrollments::ActiveModel {
                    id: Set(Uuid::new_v4()),
                    course_id: Set(course_id),
                    user_id: Set(user_id),
                    enrolled_at: Set(enrolled_at),
                    status: Set(sea_orm_active_enums::EnrollmentStatus::Pending),
                    final_approval: Set(false),
                    is_deleted: Set(false),
                    notification_sent: Set(false),
                    notification_sent_at: Set(None),
                    version: Set(1),
                    updated_at: Set(enrolled_at),
                };
                let inserted = enrollment.insert(&txn).await.map_err(|e| {
                    if matches!(e.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) {
                        WorkflowError::DuplicateEnrollment
                    } else {
                        WorkflowError::Database(e.to_string())
                    }
                })?;
                inserted.id
            }
            Admission::Restore { enrollment_id } => {
                let restored = enrollments::Entity::update_many()
                    .col_expr(enrollments::Column::IsDeleted, Expr::value(false))
                    .col_expr(
                        enrollments::Column::Status,
                        Expr::value(sea_orm_active_enums::EnrollmentStatus::Pending.to_value()),
                    )
                    .col_expr(enrollments::Column::FinalApproval, Expr::value(false))
                    .col_expr(enrollments::Column::NotificationSent, Expr::value(false))
                    .col_expr(
                        enrollments::Column::NotificationSentAt,
                        Expr::value(None::<DateTimeWithTimeZone>),
                    )
                    .col_expr(enrollments::Column::EnrolledAt, Expr::value(enrolled_at))
                    .col_expr(enrollments::Column::UpdatedAt, Expr::value(enrolled_at))
                    .col_expr(
                        enrollments::Column::Version,
                        Expr::col(enrollments::Column::Version).add(1),
                    )
                    .filter(enrollments::Column::Id.eq(enrollment_id))
                    .filter(enrollments::Column::IsDeleted.eq(true))
                    .exec(&txn)
                    .await
                    .map_err(|e| WorkflowError::Database(e.to_string()))?;

                if restored.rows_affected == 0 {
                    // Someone else restored it first
                    return Err(WorkflowError::DuplicateEnrollment);
                }

                // Regenerate from scratch; leftovers from before withdrawal go
                soft_delete_all_records(&txn, enrollment_id).await?;
                enrollment_id
            }
        };

        let plan = StepSyncEngine::plan(&[], &definitions);
        let mut records = Vec::with_capacity(plan.to_create.len());
        StepSyncEngine::apply(&mut records, &plan, |definition_id| {
            pending_record(enrollment_id, definition_id)
        });
        insert_records(&txn, &records, now).await?;

        let auto_approved = records.is_empty();
        if auto_approved {
            finalize(&txn, enrollment_id, EnrollmentStatus::Approved, now).await?;
        }

        txn.commit()
            .await
            .map_err(|e| WorkflowError::Database(e.to_string()))?;

        info!(
            %enrollment_id,
            %course_id,
            %user_id,
            restored = matches!(admission, Admission::Restore { .. }),
            steps = records.len(),
            "Enrollment created"
        );

        if auto_approved {
            self.workflow
                .announce(enrollment_id, EnrollmentStatus::Approved, None)
                .await;
        }

        reload(&self.db, enrollment_id).await
    }

    /// Withdraws an enrollment: soft-deletes it and all its step records.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Enrollment is not found
    /// - The actor is not the enrolled user
    /// - Database operation fails
    pub async fn withdraw(&self, enrollment_id: Uuid, actor_id: Uuid) -> Result<(), WorkflowError> {
        let enrollment = self
            .find_active(enrollment_id)
            .await?
            .ok_or(WorkflowError::EnrollmentNotFound(enrollment_id))?;

        EnrollmentLifecycle::ensure_can_withdraw(&enrollment_state(&enrollment), actor_id)?;

        let now = DateTimeWithTimeZone::from(self.workflow.clock().now());
        let txn = self
            .db
            .begin()
            .await
            .map_err(|e| WorkflowError::Database(e.to_string()))?;

        let result = enrollments::Entity::update_many()
            .col_expr(enrollments::Column::IsDeleted, Expr::value(true))
            .col_expr(
                enrollments::Column::Version,
                Expr::col(enrollments::Column::Version).add(1),
            )
            .col_expr(enrollments::Column::UpdatedAt, Expr::value(now))
            .filter(enrollments::Column::Id.eq(enrollment_id))
            .filter(enrollments::Column::IsDeleted.eq(false))
            .exec(&txn)
            .await
            .map_err(|e| WorkflowError::Database(e.to_string()))?;

        if result.rows_affected == 0 {
            txn.rollback()
                .await
                .map_err(|e| WorkflowError::Database(e.to_string()))?;
            return Err(WorkflowError::EnrollmentNotFound(enrollment_id));
        }

        let steps = soft_delete_all_records(&txn, enrollment_id).await?;

        txn.commit()
            .await
            .map_err(|e| WorkflowError::Database(e.to_string()))?;

        info!(%enrollment_id, steps, "Enrollment withdrawn");
        Ok(())
    }

    /// Lists a course's enrollments with their live approval chains.
    ///
    /// Pending enrollments are lazily synced with the current configuration
    /// first. Each view is annotated with whether `actor` could approve its
    /// next step.
    ///
    /// # Errors
    ///
    /// Returns an error if the course is not found or a query fails.
    pub async fn list_for_course(
        &self,
        course_id: Uuid,
        query: &EnrollmentQuery,
        actor: &Actor,
    ) -> Result<Vec<EnrollmentView>, WorkflowError> {
        courses::Entity::find_by_id(course_id)
            .one(&self.db)
            .await
            .map_err(|e| WorkflowError::Database(e.to_string()))?
            .ok_or(WorkflowError::CourseNotFound(course_id))?;

        self.workflow.sync_pending_for_course(course_id).await?;

        let rows = enrollments::Entity::find()
            .filter(query.condition(course_id))
            .order_by_asc(enrollments::Column::EnrolledAt)
            .all(&self.db)
            .await
            .map_err(|e| WorkflowError::Database(e.to_string()))?;

        let mut views = Vec::with_capacity(rows.len());
        for row in rows {
            let snapshot = EnrollmentSnapshot::for_model(&self.db, row).await?;
            views.push(snapshot.view(Some(actor)));
        }
        Ok(views)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sea_orm::{DbBackend, QueryTrait};

    fn sql(query: &EnrollmentQuery) -> String {
        enrollments::Entity::find()
            .filter(query.condition(Uuid::nil()))
            .build(DbBackend::Postgres)
            .to_string()
    }

    #[test]
    fn test_default_query_hides_finalized() {
        let sql = sql(&EnrollmentQuery::default());
        assert!(sql.contains(r#""final_approval" = FALSE"#));
        assert!(sql.contains(r#""is_deleted" = FALSE"#));
        assert!(!sql.contains(r#""status" ="#));
    }

    #[test]
    fn test_query_adds_only_present_predicates() {
        let user_id = Uuid::new_v4();
        let sql = sql(&EnrollmentQuery {
            status: Some(EnrollmentStatus::Approved),
            user_id: Some(user_id),
            include_finalized: true,
        });
        assert!(sql.contains(r#""status" = 'approved'"#));
        assert!(sql.contains(&user_id.to_string()));
        assert!(!sql.contains(r#""final_approval" ="#));
    }
}
