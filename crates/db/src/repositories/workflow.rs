//! Workflow repository for enrollment approval decisions.
//!
//! Every write goes through the enrollment's optimistic version: the write
//! transaction first bumps `version` where it still matches the snapshot the
//! decision was authorized against. Losing that race re-reads and
//! re-authorizes the whole decision, up to `max_conflict_retries` times.

use std::sync::Arc;

use sea_orm::prelude::DateTimeWithTimeZone;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveEnum, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder,
    QuerySelect, TransactionTrait,
};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use campus_core::clock::Clock;
use campus_core::workflow::{
    Actor, ApprovalChain, DecisionContext, EnrollmentNotice, EnrollmentStatus,
    NotificationDispatcher, StepDecision, StepKind, StepSyncEngine, Verdict, WorkflowError,
    WorkflowService,
};
use campus_shared::EnrollmentConfig;

use crate::entities::{
    courses, enrollment_approval_steps, enrollments, sea_orm_active_enums, users,
};

use super::convert::{enrollment_state, status_to_db, to_utc};
use super::organization::OrganizationDirectory;
use super::snapshot::{
    EnrollmentSnapshot, EnrollmentView, bump_version, course_start, finalize, insert_records,
    load_definitions, load_live_records, pending_record, reload, soft_delete_undecided,
};

/// Result of reconciling one enrollment with its configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOutcome {
    /// Records were already congruent, or the enrollment is finalized.
    Unchanged,
    /// Records were created or soft-deleted.
    Synced {
        /// Pending records created.
        created: usize,
        /// Undecided records soft-deleted.
        deleted: usize,
    },
    /// The reconciled chain finalized the enrollment.
    Finalized(EnrollmentStatus),
}

/// Result of a bulk sync over one course.
#[derive(Debug, Clone)]
pub struct BulkSyncResult {
    /// Results for each enrollment.
    pub results: Vec<BulkSyncItemResult>,
    /// Number of enrollments synced without error.
    pub success_count: usize,
    /// Number of enrollments that failed.
    pub failure_count: usize,
}

/// Result for a single enrollment in a bulk sync.
#[derive(Debug, Clone)]
pub struct BulkSyncItemResult {
    /// Enrollment ID.
    pub enrollment_id: Uuid,
    /// Outcome if the sync succeeded.
    pub outcome: Option<SyncOutcome>,
    /// Error message if failed.
    pub error: Option<String>,
}

/// Result of a step decision.
#[derive(Debug, Clone)]
pub struct DecisionOutcome {
    /// Enrollment after the decision.
    pub enrollment: enrollments::Model,
    /// The decided step record.
    pub step: enrollment_approval_steps::Model,
    /// Terminal status reached by this decision, if any.
    pub finalized: Option<EnrollmentStatus>,
}

/// Workflow repository for enrollment approval decisions.
#[derive(Clone)]
pub struct WorkflowRepository {
    db: DatabaseConnection,
    dispatcher: Arc<dyn NotificationDispatcher>,
    clock: Arc<dyn Clock>,
    organizations: OrganizationDirectory,
    settings: EnrollmentConfig,
}

impl WorkflowRepository {
    /// Creates a new workflow repository.
    #[must_use]
    pub fn new(
        db: DatabaseConnection,
        dispatcher: Arc<dyn NotificationDispatcher>,
        clock: Arc<dyn Clock>,
        organizations: OrganizationDirectory,
        settings: EnrollmentConfig,
    ) -> Self {
        Self {
            db,
            dispatcher,
            clock,
            organizations,
            settings,
        }
    }

    /// Time source shared with the enrollment lifecycle.
    #[must_use]
    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    // ========================================================================
    // Step sync
    // ========================================================================

    /// Reconciles one enrollment's step records with its category's active
    /// definitions.
    ///
    /// Creates a pending record for every active definition without one and
    /// soft-deletes undecided records whose definition is inactive. If the
    /// resulting chain is complete (including when it is empty) the
    /// enrollment finalizes as Approved and the approval notification fires.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Enrollment is not found
    /// - The version race is lost more than `max_conflict_retries` times
    /// - Database operation fails
    pub async fn sync_enrollment(&self, enrollment_id: Uuid) -> Result<SyncOutcome, WorkflowError> {
        for attempt in 0..=self.settings.max_conflict_retries {
            let snapshot = EnrollmentSnapshot::load(&self.db, enrollment_id).await?;
            if snapshot.state.final_approval {
                return Ok(SyncOutcome::Unchanged);
            }

            // Configuration snapshot for this pass
            let plan = StepSyncEngine::plan(&snapshot.records, &snapshot.definitions);
            let mut records = snapshot.records.clone();
            let mut created = Vec::with_capacity(plan.to_create.len());
            StepSyncEngine::apply(&mut records, &plan, |definition_id| {
                let record = pending_record(enrollment_id, definition_id);
                created.push(record.clone());
                record
            });
            let finalized =
                WorkflowService::resolve(&ApprovalChain::build(&records, &snapshot.definitions));

            if plan.is_noop() && finalized.is_none() {
                return Ok(SyncOutcome::Unchanged);
            }

            let now = self.clock.now();
            let txn = self
                .db
                .begin()
                .await
                .map_err(|e| WorkflowError::Database(e.to_string()))?;

            if !bump_version(&txn, enrollment_id, snapshot.state.version, now).await? {
                txn.rollback()
                    .await
                    .map_err(|e| WorkflowError::Database(e.to_string()))?;
                warn!(%enrollment_id, attempt, "Version conflict during step sync, retrying");
                continue;
            }

            soft_delete_undecided(&txn, &plan.to_delete).await?;
            insert_records(&txn, &created, now).await?;
            if let Some(status) = finalized {
                finalize(&txn, enrollment_id, status, now).await?;
            }

            txn.commit()
                .await
                .map_err(|e| WorkflowError::Database(e.to_string()))?;

            info!(
                %enrollment_id,
                created = created.len(),
                deleted = plan.to_delete.len(),
                "Synchronized approval steps"
            );

            if let Some(status) = finalized {
                self.announce(enrollment_id, status, None).await;
                return Ok(SyncOutcome::Finalized(status));
            }

            return Ok(SyncOutcome::Synced {
                created: created.len(),
                deleted: plan.to_delete.len(),
            });
        }

        Err(WorkflowError::ConcurrentModification(enrollment_id))
    }

    /// Re-syncs every pending enrollment of a course.
    ///
    /// Each enrollment is synced on its own; a failure is logged and does not
    /// stop the others.
    ///
    /// # Errors
    ///
    /// Returns an error if the course is not found or the enrollment query
    /// fails.
    pub async fn bulk_sync_course(&self, course_id: Uuid) -> Result<BulkSyncResult, WorkflowError> {
        courses::Entity::find_by_id(course_id)
            .filter(courses::Column::IsDeleted.eq(false))
            .one(&self.db)
            .await
            .map_err(|e| WorkflowError::Database(e.to_string()))?
            .ok_or(WorkflowError::CourseNotFound(course_id))?;

        let enrollment_ids = self.pending_enrollment_ids(course_id).await?;

        let mut results = Vec::with_capacity(enrollment_ids.len());
        let mut success_count = 0;
        let mut failure_count = 0;

        for enrollment_id in enrollment_ids {
            match self.sync_enrollment(enrollment_id).await {
                Ok(outcome) => {
                    success_count += 1;
                    results.push(BulkSyncItemResult {
                        enrollment_id,
                        outcome: Some(outcome),
                        error: None,
                    });
                }
                Err(e) => {
                    error!(%enrollment_id, %course_id, error = %e, "Failed to sync enrollment");
                    failure_count += 1;
                    results.push(BulkSyncItemResult {
                        enrollment_id,
                        outcome: None,
                        error: Some(e.to_string()),
                    });
                }
            }
        }

        info!(%course_id, success_count, failure_count, "Bulk step sync finished");

        Ok(BulkSyncResult {
            results,
            success_count,
            failure_count,
        })
    }

    /// Lazily syncs the pending enrollments of a course before a listing.
    ///
    /// Failures are logged; a listing never fails because of sync.
    pub(crate) async fn sync_pending_for_course(&self, course_id: Uuid) -> Result<(), WorkflowError> {
        for enrollment_id in self.pending_enrollment_ids(course_id).await? {
            if let Err(e) = self.sync_enrollment(enrollment_id).await {
                warn!(%enrollment_id, error = %e, "Lazy step sync failed");
            }
        }
        Ok(())
    }

    async fn pending_enrollment_ids(&self, course_id: Uuid) -> Result<Vec<Uuid>, WorkflowError> {
        enrollments::Entity::find()
            .select_only()
            .column(enrollments::Column::Id)
            .filter(enrollments::Column::CourseId.eq(course_id))
            .filter(enrollments::Column::IsDeleted.eq(false))
            .filter(enrollments::Column::FinalApproval.eq(false))
            .order_by_asc(enrollments::Column::EnrolledAt)
            .into_tuple()
            .all(&self.db)
            .await
            .map_err(|e| WorkflowError::Database(e.to_string()))
    }

    // ========================================================================
    // Step decisions
    // ========================================================================

    /// Approves or rejects one step of an enrollment.
    ///
    /// Approving the last pending live step finalizes the enrollment as
    /// Approved and fires the approval notification once. Rejecting any step
    /// finalizes it as Rejected and fires the rejection notification.
    /// Notification failures are logged and never fail the decision.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Enrollment or step is not found
    /// - The actor fails an authorization check
    /// - The version race is lost more than `max_conflict_retries` times
    /// - Database operation fails
    pub async fn decide_step(
        &self,
        enrollment_id: Uuid,
        step_definition_id: Uuid,
        verdict: Verdict,
        actor: &Actor,
        comments: Option<String>,
    ) -> Result<DecisionOutcome, WorkflowError> {
        for attempt in 0..=self.settings.max_conflict_retries {
            let mut snapshot = EnrollmentSnapshot::load(&self.db, enrollment_id).await?;

            // Decisions are authorized against the current configuration
            if !snapshot.state.final_approval
                && !StepSyncEngine::plan(&snapshot.records, &snapshot.definitions).is_noop()
            {
                self.sync_enrollment(enrollment_id).await?;
                snapshot = EnrollmentSnapshot::load(&self.db, enrollment_id).await?;
            }

            let chain = snapshot.chain();
            let ctx = DecisionContext {
                enrollment: &snapshot.state,
                subject: snapshot.subject,
                chain: &chain,
            };

            let decision = WorkflowService::decide(
                &ctx,
                step_definition_id,
                verdict,
                actor,
                comments.clone(),
                self.clock.now(),
            )?;

            let Some(outcome) = self.apply_decision(&snapshot, &decision).await? else {
                warn!(%enrollment_id, attempt, "Version conflict while deciding step, retrying");
                continue;
            };

            info!(
                %enrollment_id,
                %step_definition_id,
                actor_id = %actor.user_id,
                ?verdict,
                finalized = ?outcome.finalized,
                "Step decided"
            );

            if let Some(status) = outcome.finalized {
                self.announce(enrollment_id, status, decision.comments.clone())
                    .await;
            }

            let enrollment = reload(&self.db, enrollment_id).await?;
            return Ok(DecisionOutcome {
                enrollment,
                ..outcome
            });
        }

        Err(WorkflowError::ConcurrentModification(enrollment_id))
    }

    /// Approves one step. See [`Self::decide_step`].
    ///
    /// # Errors
    ///
    /// Same as [`Self::decide_step`].
    pub async fn approve_step(
        &self,
        enrollment_id: Uuid,
        step_definition_id: Uuid,
        actor: &Actor,
        comments: Option<String>,
    ) -> Result<DecisionOutcome, WorkflowError> {
        self.decide_step(enrollment_id, step_definition_id, Verdict::Approve, actor, comments)
            .await
    }

    /// Rejects one step. See [`Self::decide_step`].
    ///
    /// # Errors
    ///
    /// Same as [`Self::decide_step`].
    pub async fn reject_step(
        &self,
        enrollment_id: Uuid,
        step_definition_id: Uuid,
        actor: &Actor,
        comments: Option<String>,
    ) -> Result<DecisionOutcome, WorkflowError> {
        self.decide_step(enrollment_id, step_definition_id, Verdict::Reject, actor, comments)
            .await
    }

    /// Writes an authorized decision. Returns `None` if the version race was
    /// lost and nothing was written.
    async fn apply_decision(
        &self,
        snapshot: &EnrollmentSnapshot,
        decision: &StepDecision,
    ) -> Result<Option<DecisionOutcome>, WorkflowError> {
        let enrollment_id = snapshot.state.id;
        let txn = self
            .db
            .begin()
            .await
            .map_err(|e| WorkflowError::Database(e.to_string()))?;

        if !bump_version(&txn, enrollment_id, snapshot.state.version, decision.decided_at).await? {
            txn.rollback()
                .await
                .map_err(|e| WorkflowError::Database(e.to_string()))?;
            return Ok(None);
        }

        let updated = enrollment_approval_steps::Entity::update_many()
            .col_expr(
                enrollment_approval_steps::Column::Approved,
                Expr::value(decision.verdict == Verdict::Approve),
            )
            .col_expr(
                enrollment_approval_steps::Column::Rejected,
                Expr::value(decision.verdict == Verdict::Reject),
            )
            .col_expr(
                enrollment_approval_steps::Column::ApprovedBy,
                Expr::value(Some(decision.decided_by)),
            )
            .col_expr(
                enrollment_approval_steps::Column::DecidedAt,
                Expr::value(Some(DateTimeWithTimeZone::from(decision.decided_at))),
            )
            .col_expr(
                enrollment_approval_steps::Column::Comments,
                Expr::value(decision.comments.clone()),
            )
            .filter(enrollment_approval_steps::Column::Id.eq(decision.step_record_id))
            .filter(enrollment_approval_steps::Column::Approved.eq(false))
            .filter(enrollment_approval_steps::Column::Rejected.eq(false))
            .filter(enrollment_approval_steps::Column::IsDeleted.eq(false))
            .exec(&txn)
            .await
            .map_err(|e| WorkflowError::Database(e.to_string()))?;

        if updated.rows_affected == 0 {
            txn.rollback()
                .await
                .map_err(|e| WorkflowError::Database(e.to_string()))?;
            return Err(WorkflowError::AlreadyDecided);
        }

        // Re-read inside the transaction so the last-step check sees this write
        // and any step configured after the snapshot was taken
        let mut records = load_live_records(&txn, enrollment_id).await?;
        let definitions = load_definitions(&txn, snapshot.course.course_tab_id).await?;
        let plan = StepSyncEngine::plan(&records, &definitions);
        if !plan.is_noop() {
            let mut created = Vec::with_capacity(plan.to_create.len());
            StepSyncEngine::apply(&mut records, &plan, |definition_id| {
                let record = pending_record(enrollment_id, definition_id);
                created.push(record.clone());
                record
            });
            soft_delete_undecided(&txn, &plan.to_delete).await?;
            insert_records(&txn, &created, decision.decided_at).await?;
            debug!(
                %enrollment_id,
                created = created.len(),
                deleted = plan.to_delete.len(),
                "Synchronized approval steps while deciding"
            );
        }
        let finalized = WorkflowService::resolve(&ApprovalChain::build(&records, &definitions));
        if let Some(status) = finalized {
            finalize(&txn, enrollment_id, status, decision.decided_at).await?;
        }

        let step = enrollment_approval_steps::Entity::find_by_id(decision.step_record_id)
            .one(&txn)
            .await
            .map_err(|e| WorkflowError::Database(e.to_string()))?
            .ok_or(WorkflowError::StepNotFound {
                enrollment_id,
                step_definition_id: decision.step_definition_id,
            })?;
        let enrollment = reload(&txn, enrollment_id).await?;

        txn.commit()
            .await
            .map_err(|e| WorkflowError::Database(e.to_string()))?;

        Ok(Some(DecisionOutcome {
            enrollment,
            step,
            finalized,
        }))
    }

    /// Approves or rejects an enrollment directly, bypassing the step chain.
    ///
    /// Only allowed while the enrollment has no live step records.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Enrollment is not found
    /// - Enrollment is finalized or has live steps
    /// - The actor is the subject
    /// - Database operation fails
    pub async fn legacy_decide(
        &self,
        enrollment_id: Uuid,
        verdict: Verdict,
        actor: &Actor,
        comments: Option<String>,
    ) -> Result<enrollments::Model, WorkflowError> {
        for attempt in 0..=self.settings.max_conflict_retries {
            let snapshot = EnrollmentSnapshot::load(&self.db, enrollment_id).await?;
            let has_live_steps = !snapshot.chain().is_empty();
            let status =
                WorkflowService::legacy_decide(&snapshot.state, has_live_steps, verdict, actor)?;

            let now = self.clock.now();
            let txn = self
                .db
                .begin()
                .await
                .map_err(|e| WorkflowError::Database(e.to_string()))?;

            if !bump_version(&txn, enrollment_id, snapshot.state.version, now).await? {
                txn.rollback()
                    .await
                    .map_err(|e| WorkflowError::Database(e.to_string()))?;
                warn!(%enrollment_id, attempt, "Version conflict on direct decision, retrying");
                continue;
            }

            finalize(&txn, enrollment_id, status, now).await?;
            txn.commit()
                .await
                .map_err(|e| WorkflowError::Database(e.to_string()))?;

            info!(%enrollment_id, actor_id = %actor.user_id, %status, "Enrollment decided directly");
            let comments = comments.filter(|c| !c.trim().is_empty());
            self.announce(enrollment_id, status, comments).await;

            return reload(&self.db, enrollment_id).await;
        }

        Err(WorkflowError::ConcurrentModification(enrollment_id))
    }

    // ========================================================================
    // Excuse
    // ========================================================================

    /// Excuses the subject from an approved enrollment.
    ///
    /// Allowed only strictly before `course start - excuse_window_hours`.
    /// The enrollment stays final.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Enrollment is not found
    /// - The actor is not the subject
    /// - Enrollment is not approved, or the window has closed
    /// - The version race is lost more than `max_conflict_retries` times
    /// - Database operation fails
    pub async fn excuse(
        &self,
        enrollment_id: Uuid,
        actor: &Actor,
    ) -> Result<enrollments::Model, WorkflowError> {
        for attempt in 0..=self.settings.max_conflict_retries {
            let snapshot = EnrollmentSnapshot::load(&self.db, enrollment_id).await?;
            let now = self.clock.now();

            let status = WorkflowService::excuse(
                &snapshot.state,
                actor.user_id,
                course_start(&snapshot.course),
                self.settings.excuse_window_hours,
                now,
            )?;

            let result = enrollments::Entity::update_many()
                .col_expr(
                    enrollments::Column::Status,
                    Expr::value(status_to_db(status).to_value()),
                )
                .col_expr(
                    enrollments::Column::Version,
                    Expr::col(enrollments::Column::Version).add(1),
                )
                .col_expr(
                    enrollments::Column::UpdatedAt,
                    Expr::value(DateTimeWithTimeZone::from(now)),
                )
                .filter(enrollments::Column::Id.eq(enrollment_id))
                .filter(enrollments::Column::Version.eq(snapshot.state.version))
                .filter(
                    enrollments::Column::Status.eq(sea_orm_active_enums::EnrollmentStatus::Approved),
                )
                .exec(&self.db)
                .await
                .map_err(|e| WorkflowError::Database(e.to_string()))?;

            if result.rows_affected == 0 {
                warn!(%enrollment_id, attempt, "Version conflict on excuse, retrying");
                continue;
            }

            info!(%enrollment_id, "Enrollment excused");
            return reload(&self.db, enrollment_id).await;
        }

        Err(WorkflowError::ConcurrentModification(enrollment_id))
    }

    // ========================================================================
    // Head approval inbox
    // ========================================================================

    /// Lists pending enrollments whose next step is a head approval for the
    /// actor's department.
    ///
    /// Enrollments are lazily synced first. The actor's own enrollments are
    /// never listed, and non-heads get an empty list.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn pending_head_approvals(
        &self,
        actor: &Actor,
    ) -> Result<Vec<EnrollmentView>, WorkflowError> {
        let Some(department_id) = actor.department_id.filter(|_| actor.is_department_head) else {
            return Ok(vec![]);
        };

        let members: Vec<Uuid> = users::Entity::find()
            .select_only()
            .column(users::Column::Id)
            .filter(users::Column::DepartmentId.eq(department_id))
            .filter(users::Column::Id.ne(actor.user_id))
            .into_tuple()
            .all(&self.db)
            .await
            .map_err(|e| WorkflowError::Database(e.to_string()))?;

        if members.is_empty() {
            return Ok(vec![]);
        }

        let pending: Vec<Uuid> = enrollments::Entity::find()
            .select_only()
            .column(enrollments::Column::Id)
            .filter(enrollments::Column::UserId.is_in(members))
            .filter(enrollments::Column::IsDeleted.eq(false))
            .filter(enrollments::Column::FinalApproval.eq(false))
            .order_by_asc(enrollments::Column::EnrolledAt)
            .into_tuple()
            .all(&self.db)
            .await
            .map_err(|e| WorkflowError::Database(e.to_string()))?;

        let mut views = Vec::new();
        for enrollment_id in pending {
            if let Err(e) = self.sync_enrollment(enrollment_id).await {
                warn!(%enrollment_id, error = %e, "Lazy step sync failed");
            }

            let snapshot = EnrollmentSnapshot::load(&self.db, enrollment_id).await?;
            if snapshot.state.final_approval {
                continue;
            }

            let awaiting_head = snapshot
                .chain()
                .next_pending()
                .is_some_and(|s| s.definition.requirement.kind() == StepKind::HeadApproval);
            if awaiting_head {
                views.push(snapshot.view(Some(actor)));
            }
        }

        Ok(views)
    }

    // ========================================================================
    // Notifications
    // ========================================================================

    /// Re-sends the approval notification of an approved enrollment.
    ///
    /// Re-fires even if a notification was already sent and re-sets the
    /// sent timestamp.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Enrollment is not found
    /// - Enrollment is not approved
    /// - The dispatcher reports a failure
    /// - Database operation fails
    pub async fn resend_notification(
        &self,
        enrollment_id: Uuid,
    ) -> Result<enrollments::Model, WorkflowError> {
        let model = enrollments::Entity::find_by_id(enrollment_id)
            .filter(enrollments::Column::IsDeleted.eq(false))
            .one(&self.db)
            .await
            .map_err(|e| WorkflowError::Database(e.to_string()))?
            .ok_or(WorkflowError::EnrollmentNotFound(enrollment_id))?;

        WorkflowService::ensure_resendable(&enrollment_state(&model))?;

        let notice = self.build_notice(&model, None).await?;
        if !self.dispatcher.send_approval_email(&notice).await {
            warn!(%enrollment_id, "Approval notification resend failed");
            return Err(WorkflowError::NotificationFailed(enrollment_id));
        }

        let now = DateTimeWithTimeZone::from(self.clock.now());
        enrollments::Entity::update_many()
            .col_expr(enrollments::Column::NotificationSent, Expr::value(true))
            .col_expr(enrollments::Column::NotificationSentAt, Expr::value(Some(now)))
            .filter(enrollments::Column::Id.eq(enrollment_id))
            .exec(&self.db)
            .await
            .map_err(|e| WorkflowError::Database(e.to_string()))?;

        info!(%enrollment_id, "Approval notification re-sent");
        reload(&self.db, enrollment_id).await
    }

    /// Fires the notification for a freshly finalized enrollment.
    ///
    /// Never fails: errors are logged and the approval notification stays
    /// retryable through [`Self::resend_notification`].
    pub(crate) async fn announce(
        &self,
        enrollment_id: Uuid,
        status: EnrollmentStatus,
        comments: Option<String>,
    ) {
        let result = match status {
            EnrollmentStatus::Approved => self.notify_approved(enrollment_id).await.map(|_| ()),
            EnrollmentStatus::Rejected => self.notify_rejected(enrollment_id, comments).await,
            EnrollmentStatus::Pending | EnrollmentStatus::Excused => Ok(()),
        };

        if let Err(e) = result {
            error!(%enrollment_id, %status, error = %e, "Failed to dispatch enrollment notification");
        }
    }

    /// Sends the approval email at most once per enrollment.
    ///
    /// The send is claimed by flipping `notification_sent` from false to
    /// true, so concurrent callers cannot both dispatch. A failed send
    /// releases the claim.
    ///
    /// Returns true if this call delivered the email.
    async fn notify_approved(&self, enrollment_id: Uuid) -> Result<bool, WorkflowError> {
        let claimed = enrollments::Entity::update_many()
            .col_expr(enrollments::Column::NotificationSent, Expr::value(true))
            .filter(enrollments::Column::Id.eq(enrollment_id))
            .filter(enrollments::Column::NotificationSent.eq(false))
            .filter(enrollments::Column::Status.eq(sea_orm_active_enums::EnrollmentStatus::Approved))
            .filter(enrollments::Column::IsDeleted.eq(false))
            .exec(&self.db)
            .await
            .map_err(|e| WorkflowError::Database(e.to_string()))?;

        if claimed.rows_affected == 0 {
            debug!(%enrollment_id, "Approval notification already sent");
            return Ok(false);
        }

        let delivered = match reload(&self.db, enrollment_id).await {
            Ok(model) => match self.build_notice(&model, None).await {
                Ok(notice) => self.dispatcher.send_approval_email(&notice).await,
                Err(e) => {
                    error!(%enrollment_id, error = %e, "Could not build approval notice");
                    false
                }
            },
            Err(e) => {
                error!(%enrollment_id, error = %e, "Could not reload enrollment for notice");
                false
            }
        };

        let update = enrollments::Entity::update_many().filter(enrollments::Column::Id.eq(enrollment_id));
        let update = if delivered {
            update.col_expr(
                enrollments::Column::NotificationSentAt,
                Expr::value(Some(DateTimeWithTimeZone::from(self.clock.now()))),
            )
        } else {
            warn!(%enrollment_id, "Approval notification failed; left retryable");
            update.col_expr(enrollments::Column::NotificationSent, Expr::value(false))
        };
        update
            .exec(&self.db)
            .await
            .map_err(|e| WorkflowError::Database(e.to_string()))?;

        if delivered {
            info!(%enrollment_id, "Approval notification sent");
        }
        Ok(delivered)
    }

    async fn notify_rejected(
        &self,
        enrollment_id: Uuid,
        comments: Option<String>,
    ) -> Result<(), WorkflowError> {
        let model = reload(&self.db, enrollment_id).await?;
        let notice = self.build_notice(&model, comments).await?;

        if self.dispatcher.send_rejection_email(&notice).await {
            info!(%enrollment_id, "Rejection notification sent");
        } else {
            warn!(%enrollment_id, "Rejection notification failed");
        }
        Ok(())
    }

    async fn build_notice(
        &self,
        enrollment: &enrollments::Model,
        comments: Option<String>,
    ) -> Result<EnrollmentNotice, WorkflowError> {
        let subject = users::Entity::find_by_id(enrollment.user_id)
            .one(&self.db)
            .await
            .map_err(|e| WorkflowError::Database(e.to_string()))?
            .ok_or_else(|| {
                WorkflowError::Database(format!("User not found: {}", enrollment.user_id))
            })?;

        let course = courses::Entity::find_by_id(enrollment.course_id)
            .one(&self.db)
            .await
            .map_err(|e| WorkflowError::Database(e.to_string()))?
            .ok_or(WorkflowError::CourseNotFound(enrollment.course_id))?;

        let organization_name = match self.organizations.main_organization_name().await {
            Ok(name) => name,
            Err(e) => {
                warn!(error = %e, "Main organization lookup failed; sending unsigned notice");
                None
            }
        };

        Ok(EnrollmentNotice {
            enrollment_id: enrollment.id,
            subject_name: subject.full_name,
            subject_email: subject.email,
            course_title: course.title,
            course_starts_at: to_utc(course.starts_at),
            organization_name,
            comments,
        })
    }
}
