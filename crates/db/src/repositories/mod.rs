//! Repository abstractions for data access.
//!
//! Repositories provide a clean interface for database operations,
//! hiding the `SeaORM` implementation details from the rest of the application.

mod convert;
mod snapshot;

pub mod enrollment;
pub mod organization;
pub mod workflow;

pub use enrollment::{EnrollmentQuery, EnrollmentRepository};
pub use organization::OrganizationDirectory;
pub use snapshot::{EnrollmentView, StepView};
pub use workflow::{
    BulkSyncItemResult, BulkSyncResult, DecisionOutcome, SyncOutcome, WorkflowRepository,
};
