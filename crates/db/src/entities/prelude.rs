//! `SeaORM` entity prelude.

pub use super::approval_step_definitions::Entity as ApprovalStepDefinitions;
pub use super::course_tabs::Entity as CourseTabs;
pub use super::courses::Entity as Courses;
pub use super::enrollment_approval_steps::Entity as EnrollmentApprovalSteps;
pub use super::enrollments::Entity as Enrollments;
pub use super::organizations::Entity as Organizations;
pub use super::users::Entity as Users;
