//! Enrollment routes.
//!
//! The caller is always the actor: the subject when enrolling, withdrawing
//! or excusing, the approver when deciding.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get, post},
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use campus_core::workflow::{EnrollmentStatus, Verdict};
use campus_db::EnrollmentQuery;
use campus_db::entities::{enrollment_approval_steps, enrollments};
use campus_db::repositories::{BulkSyncResult, SyncOutcome};

use crate::error::bad_request;
use crate::{ApiError, AppState, middleware::AuthUser};

/// Creates the enrollment routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route(
            "/courses/{course_id}/enrollments",
            get(list_course_enrollments).post(enroll),
        )
        .route("/courses/{course_id}/enrollments/sync", post(sync_course))
        .route("/enrollments/pending-head-approvals", get(pending_head_approvals))
        .route("/enrollments/{enrollment_id}", delete(withdraw))
        .route(
            "/enrollments/{enrollment_id}/steps/{step_definition_id}/approve",
            post(approve_step),
        )
        .route(
            "/enrollments/{enrollment_id}/steps/{step_definition_id}/reject",
            post(reject_step),
        )
        .route("/enrollments/{enrollment_id}/approve", post(approve_directly))
        .route("/enrollments/{enrollment_id}/reject", post(reject_directly))
        .route("/enrollments/{enrollment_id}/excuse", post(excuse))
        .route(
            "/enrollments/{enrollment_id}/resend-notification",
            post(resend_notification),
        )
}

// ============================================================================
// Request/Response Types
// ============================================================================

/// Query parameters for listing a course's enrollments.
#[derive(Debug, Default, Deserialize)]
pub struct ListEnrollmentsQuery {
    /// Filter by status (pending, approved, rejected, excused).
    pub status: Option<String>,
    /// Filter by enrolled user.
    pub user_id: Option<Uuid>,
    /// Include finalized enrollments.
    #[serde(default)]
    pub include_finalized: bool,
}

/// Optional body of a decision request.
#[derive(Debug, Default, Deserialize)]
pub struct DecisionRequest {
    /// Free-text comment stored with the step and sent with rejections.
    pub comments: Option<String>,
}

/// Response for a step decision.
#[derive(Debug, Serialize)]
pub struct DecisionResponse {
    /// Enrollment after the decision.
    pub enrollment: enrollments::Model,
    /// The decided step record.
    pub step: enrollment_approval_steps::Model,
    /// Terminal status reached, if the decision closed the chain.
    pub finalized: Option<EnrollmentStatus>,
}

/// Per-enrollment line of a bulk sync.
#[derive(Debug, Serialize)]
pub struct SyncItemResponse {
    /// Enrollment ID.
    pub enrollment_id: Uuid,
    /// unchanged, synced, finalized or failed.
    pub outcome: &'static str,
    /// Pending records created.
    pub created: usize,
    /// Undecided records soft-deleted.
    pub deleted: usize,
    /// Terminal status reached during sync.
    pub finalized: Option<EnrollmentStatus>,
    /// Error message for failed enrollments.
    pub error: Option<String>,
}

/// Response for a bulk sync.
#[derive(Debug, Serialize)]
pub struct SyncResponse {
    /// Enrollments synced without error.
    pub success_count: usize,
    /// Enrollments that failed.
    pub failure_count: usize,
    /// One line per enrollment.
    pub results: Vec<SyncItemResponse>,
}

impl From<BulkSyncResult> for SyncResponse {
    fn from(value: BulkSyncResult) -> Self {
        let results = value
            .results
            .into_iter()
            .map(|item| {
                let (outcome, created, deleted, finalized) = match item.outcome {
                    Some(SyncOutcome::Unchanged) => ("unchanged", 0, 0, None),
                    Some(SyncOutcome::Synced { created, deleted }) => {
                        ("synced", created, deleted, None)
                    }
                    Some(SyncOutcome::Finalized(status)) => ("finalized", 0, 0, Some(status)),
                    None => ("failed", 0, 0, None),
                };
                SyncItemResponse {
                    enrollment_id: item.enrollment_id,
                    outcome,
                    created,
                    deleted,
                    finalized,
                    error: item.error,
                }
            })
            .collect();

        Self {
            success_count: value.success_count,
            failure_count: value.failure_count,
            results,
        }
    }
}

fn comments_of(body: Option<Json<DecisionRequest>>) -> Option<String> {
    body.and_then(|Json(request)| request.comments)
}

// ============================================================================
// Handlers
// ============================================================================

/// GET `/courses/{course_id}/enrollments` - List enrollments with their chains.
async fn list_course_enrollments(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(course_id): Path<Uuid>,
    Query(query): Query<ListEnrollmentsQuery>,
) -> Result<Response, ApiError> {
    let status = match query.status.as_deref().map(EnrollmentStatus::parse) {
        Some(None) => {
            return Ok(bad_request(
                "invalid_status",
                "Status must be one of: pending, approved, rejected, excused",
            ));
        }
        parsed => parsed.flatten(),
    };

    let filter = EnrollmentQuery {
        status,
        user_id: query.user_id,
        include_finalized: query.include_finalized,
    };
    let views = state
        .enrollments
        .list_for_course(course_id, &filter, &auth.actor())
        .await?;

    Ok(Json(views).into_response())
}

/// POST `/courses/{course_id}/enrollments` - Enroll the caller.
async fn enroll(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(course_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let enrollment = state.enrollments.enroll(course_id, auth.user_id()).await?;
    Ok((StatusCode::CREATED, Json(enrollment)))
}

/// POST `/courses/{course_id}/enrollments/sync` - Reconcile every pending
/// enrollment of a course with its step configuration.
async fn sync_course(
    State(state): State<AppState>,
    _auth: AuthUser,
    Path(course_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let result = state.workflow.bulk_sync_course(course_id).await?;
    Ok(Json(SyncResponse::from(result)))
}

/// GET `/enrollments/pending-head-approvals` - Head approval inbox.
async fn pending_head_approvals(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<impl IntoResponse, ApiError> {
    let views = state.workflow.pending_head_approvals(&auth.actor()).await?;
    Ok(Json(views))
}

/// DELETE `/enrollments/{enrollment_id}` - Withdraw the caller's enrollment.
async fn withdraw(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(enrollment_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    state
        .enrollments
        .withdraw(enrollment_id, auth.user_id())
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST `/enrollments/{enrollment_id}/steps/{step_definition_id}/approve`
async fn approve_step(
    State(state): State<AppState>,
    auth: AuthUser,
    Path((enrollment_id, step_definition_id)): Path<(Uuid, Uuid)>,
    body: Option<Json<DecisionRequest>>,
) -> Result<impl IntoResponse, ApiError> {
    decide_step(&state, &auth, enrollment_id, step_definition_id, Verdict::Approve, body).await
}

/// POST `/enrollments/{enrollment_id}/steps/{step_definition_id}/reject`
async fn reject_step(
    State(state): State<AppState>,
    auth: AuthUser,
    Path((enrollment_id, step_definition_id)): Path<(Uuid, Uuid)>,
    body: Option<Json<DecisionRequest>>,
) -> Result<impl IntoResponse, ApiError> {
    decide_step(&state, &auth, enrollment_id, step_definition_id, Verdict::Reject, body).await
}

async fn decide_step(
    state: &AppState,
    auth: &AuthUser,
    enrollment_id: Uuid,
    step_definition_id: Uuid,
    verdict: Verdict,
    body: Option<Json<DecisionRequest>>,
) -> Result<Json<DecisionResponse>, ApiError> {
    let outcome = state
        .workflow
        .decide_step(
            enrollment_id,
            step_definition_id,
            verdict,
            &auth.actor(),
            comments_of(body),
        )
        .await?;

    Ok(Json(DecisionResponse {
        enrollment: outcome.enrollment,
        step: outcome.step,
        finalized: outcome.finalized,
    }))
}

/// POST `/enrollments/{enrollment_id}/approve` - Direct decision for
/// enrollments without a step chain.
async fn approve_directly(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(enrollment_id): Path<Uuid>,
    body: Option<Json<DecisionRequest>>,
) -> Result<impl IntoResponse, ApiError> {
    let enrollment = state
        .workflow
        .legacy_decide(enrollment_id, Verdict::Approve, &auth.actor(), comments_of(body))
        .await?;
    Ok(Json(enrollment))
}

/// POST `/enrollments/{enrollment_id}/reject`
async fn reject_directly(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(enrollment_id): Path<Uuid>,
    body: Option<Json<DecisionRequest>>,
) -> Result<impl IntoResponse, ApiError> {
    let enrollment = state
        .workflow
        .legacy_decide(enrollment_id, Verdict::Reject, &auth.actor(), comments_of(body))
        .await?;
    Ok(Json(enrollment))
}

/// POST `/enrollments/{enrollment_id}/excuse`
async fn excuse(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(enrollment_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let enrollment = state.workflow.excuse(enrollment_id, &auth.actor()).await?;
    Ok(Json(enrollment))
}

/// POST `/enrollments/{enrollment_id}/resend-notification`
async fn resend_notification(
    State(state): State<AppState>,
    _auth: AuthUser,
    Path(enrollment_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let enrollment = state.workflow.resend_notification(enrollment_id).await?;
    Ok(Json(enrollment))
}
