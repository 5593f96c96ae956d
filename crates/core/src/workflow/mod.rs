//! Enrollment approval workflow for Campus.
//!
//! This module implements the per-enrollment approval chain: which steps an
//! enrollment carries, who may decide them and in what order, and how the
//! enrollment status follows from its steps.
//!
//! # Modules
//!
//! - `types` - Workflow domain types (EnrollmentStatus, StepDefinition, ApprovalChain)
//! - `error` - Workflow-specific error types
//! - `approval` - Step authorization checks
//! - `sync` - Reconciliation of step records with configuration
//! - `service` - State transition logic
//! - `lifecycle` - Enrollment admission and withdrawal
//! - `notify` - Notification trigger contract

pub mod approval;
pub mod error;
pub mod lifecycle;
pub mod notify;
pub mod service;
pub mod sync;
pub mod types;

#[cfg(test)]
mod approval_props;
#[cfg(test)]
mod service_props;
#[cfg(test)]
mod sync_props;

pub use approval::{ApprovalAuthorizer, DecisionContext};
pub use error::WorkflowError;
pub use lifecycle::{Admission, CourseSnapshot, EnrollmentLifecycle};
pub use notify::{EnrollmentNotice, NotificationDispatcher};
pub use service::{StepDecision, WorkflowService};
pub use sync::{StepSyncEngine, SyncPlan};
pub use types::{
    Actor, ApprovalChain, ChainStatus, ChainStep, EnrollmentState, EnrollmentStatus,
    StepDefinition, StepKind, StepRecord, StepRequirement, Subject, Verdict,
};
