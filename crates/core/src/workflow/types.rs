//! Workflow domain types for enrollment approval.
//!
//! This module defines the enrollment status machine, the configured
//! approval step definitions, the per-enrollment step records and the
//! ordered [`ApprovalChain`] view the authorizer and engine reason about.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use campus_shared::Claims;

use crate::workflow::error::WorkflowError;

/// Enrollment status in the approval workflow.
///
/// The valid transitions are:
/// - Pending → Approved (last step approved, or no steps configured)
/// - Pending → Rejected (any step rejected)
/// - Approved → Excused (subject excuses themselves before the deadline)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EnrollmentStatus {
    /// Waiting on one or more approval steps.
    Pending,
    /// Every configured step approved.
    Approved,
    /// A step was rejected.
    Rejected,
    /// The subject withdrew from an approved enrollment in time.
    Excused,
}

impl EnrollmentStatus {
    /// Returns the string representation of the status.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
            Self::Excused => "excused",
        }
    }

    /// Parses a status from a string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "pending" => Some(Self::Pending),
            "approved" => Some(Self::Approved),
            "rejected" => Some(Self::Rejected),
            "excused" => Some(Self::Excused),
            _ => None,
        }
    }

    /// Returns true if the approval chain is closed for this status.
    #[must_use]
    pub fn is_final(&self) -> bool {
        !matches!(self, Self::Pending)
    }
}

impl fmt::Display for EnrollmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Kind of approval a step requires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepKind {
    /// The subject's own department head must approve.
    HeadApproval,
    /// Any holder of a given role may approve.
    RoleApproval,
}

impl StepKind {
    /// Returns the string representation of the kind.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::HeadApproval => "head_approval",
            Self::RoleApproval => "role_approval",
        }
    }
}

/// What an approver must be to satisfy a step.
///
/// A step is either a head step or a role step, never both, so the role id
/// only exists on the role variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StepRequirement {
    /// Head of the subject's department.
    HeadApproval,
    /// Holder of the given role.
    RoleApproval {
        /// Role the approver must hold.
        role_id: Uuid,
    },
}

impl StepRequirement {
    /// Builds a requirement from its stored columns.
    ///
    /// # Errors
    ///
    /// Returns `WorkflowError::InvalidStepDefinition` when a head step
    /// carries a role or a role step lacks one.
    pub fn from_parts(kind: StepKind, role_id: Option<Uuid>) -> Result<Self, WorkflowError> {
        match (kind, role_id) {
            (StepKind::HeadApproval, None) => Ok(Self::HeadApproval),
            (StepKind::RoleApproval, Some(role_id)) => Ok(Self::RoleApproval { role_id }),
            (StepKind::HeadApproval, Some(_)) => Err(WorkflowError::InvalidStepDefinition(
                "head approval step must not reference a role".to_string(),
            )),
            (StepKind::RoleApproval, None) => Err(WorkflowError::InvalidStepDefinition(
                "role approval step requires a role".to_string(),
            )),
        }
    }

    /// Returns the step kind.
    #[must_use]
    pub const fn kind(&self) -> StepKind {
        match self {
            Self::HeadApproval => StepKind::HeadApproval,
            Self::RoleApproval { .. } => StepKind::RoleApproval,
        }
    }

    /// Returns the required role, for role steps.
    #[must_use]
    pub const fn role_id(&self) -> Option<Uuid> {
        match self {
            Self::HeadApproval => None,
            Self::RoleApproval { role_id } => Some(*role_id),
        }
    }
}

/// A configured approval step for a course category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepDefinition {
    /// Unique identifier for the definition.
    pub id: Uuid,
    /// Course category (course tab) the step belongs to.
    pub category_id: Uuid,
    /// Position in the chain; unique per category, lower runs first.
    pub order: i32,
    /// Who may approve this step.
    pub requirement: StepRequirement,
    /// Inactive definitions are ignored by sync and by the chain.
    pub is_active: bool,
}

/// Decision state of one step definition for one enrollment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepRecord {
    /// Unique identifier for the record.
    pub id: Uuid,
    /// Owning enrollment.
    pub enrollment_id: Uuid,
    /// Definition this record tracks.
    pub step_definition_id: Uuid,
    /// Actor who decided the step.
    pub approved_by: Option<Uuid>,
    /// When the step was decided.
    pub decided_at: Option<DateTime<Utc>>,
    /// Step approved.
    pub approved: bool,
    /// Step rejected.
    pub rejected: bool,
    /// Approver comments.
    pub comments: Option<String>,
    /// Soft-deleted by sync or withdrawal.
    pub is_deleted: bool,
}

impl StepRecord {
    /// Returns true once the step carries a decision.
    #[must_use]
    pub const fn is_decided(&self) -> bool {
        self.approved || self.rejected
    }
}

/// Snapshot of the enrollment aggregate as seen by the workflow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnrollmentState {
    /// Enrollment ID.
    pub id: Uuid,
    /// Course the enrollment targets.
    pub course_id: Uuid,
    /// The enrolled user (the subject of the approvals).
    pub user_id: Uuid,
    /// Current status.
    pub status: EnrollmentStatus,
    /// Terminal flag; set together with Approved or Rejected.
    pub final_approval: bool,
    /// Soft-delete flag.
    pub is_deleted: bool,
    /// Approval email already delivered.
    pub notification_sent: bool,
    /// Optimistic concurrency version.
    pub version: i32,
}

/// The user an enrollment belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Subject {
    /// User ID.
    pub user_id: Uuid,
    /// Department the user belongs to.
    pub department_id: Option<Uuid>,
}

/// The authenticated user performing a workflow action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Actor {
    /// User ID.
    pub user_id: Uuid,
    /// Display name.
    pub name: String,
    /// Department the actor belongs to.
    pub department_id: Option<Uuid>,
    /// True when the actor's department role is "Head".
    pub is_department_head: bool,
    /// Roles assigned to the actor.
    pub roles: Vec<Uuid>,
}

impl Actor {
    /// Returns true if the actor holds the given role.
    #[must_use]
    pub fn has_role(&self, role_id: Uuid) -> bool {
        self.roles.contains(&role_id)
    }
}

impl From<&Claims> for Actor {
    fn from(claims: &Claims) -> Self {
        Self {
            user_id: claims.user_id(),
            name: claims.name.clone(),
            department_id: claims.department_id(),
            is_department_head: claims.is_department_head(),
            roles: claims.roles.clone(),
        }
    }
}

/// Decision an approver makes on a step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Verdict {
    /// Approve the step.
    Approve,
    /// Reject the step, and with it the enrollment.
    Reject,
}

/// A live step: an undeleted record whose definition is currently active.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainStep {
    /// The per-enrollment record.
    pub record: StepRecord,
    /// The definition the record tracks.
    pub definition: StepDefinition,
}

impl ChainStep {
    /// Position of the step in the chain.
    #[must_use]
    pub const fn order(&self) -> i32 {
        self.definition.order
    }
}

/// Aggregate state of an approval chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChainStatus {
    /// At least one live step is still undecided.
    InProgress,
    /// Every live step is approved (vacuously true for an empty chain).
    Complete,
    /// A live step was rejected.
    Rejected,
}

/// Ordered view of an enrollment's live steps.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApprovalChain {
    steps: Vec<ChainStep>,
}

impl ApprovalChain {
    /// Joins records with definitions, keeping only live steps ordered by
    /// definition order.
    ///
    /// Records that are soft-deleted, or whose definition is missing or
    /// inactive, are left out.
    #[must_use]
    pub fn build(records: &[StepRecord], definitions: &[StepDefinition]) -> Self {
        let mut steps: Vec<ChainStep> = records
            .iter()
            .filter(|r| !r.is_deleted)
            .filter_map(|r| {
                definitions
                    .iter()
                    .find(|d| d.id == r.step_definition_id && d.is_active)
                    .map(|d| ChainStep {
                        record: r.clone(),
                        definition: d.clone(),
                    })
            })
            .collect();

        steps.sort_by_key(ChainStep::order);
        Self { steps }
    }

    /// Returns the live steps in order.
    #[must_use]
    pub fn steps(&self) -> &[ChainStep] {
        &self.steps
    }

    /// Returns true if no live steps exist.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Finds the live step tracking the given definition.
    #[must_use]
    pub fn find(&self, step_definition_id: Uuid) -> Option<&ChainStep> {
        self.steps
            .iter()
            .find(|s| s.definition.id == step_definition_id)
    }

    /// Returns the first live step not yet approved.
    #[must_use]
    pub fn next_pending(&self) -> Option<&ChainStep> {
        self.steps.iter().find(|s| !s.record.approved)
    }

    /// Returns the live steps ordered before `order` that are not approved.
    pub fn unapproved_before(&self, order: i32) -> impl Iterator<Item = &ChainStep> {
        self.steps
            .iter()
            .filter(move |s| s.order() < order && !s.record.approved)
    }

    /// Aggregate status of the chain.
    #[must_use]
    pub fn status(&self) -> ChainStatus {
        if self.steps.iter().any(|s| s.record.rejected) {
            ChainStatus::Rejected
        } else if self.steps.iter().all(|s| s.record.approved) {
            ChainStatus::Complete
        } else {
            ChainStatus::InProgress
        }
    }
}
