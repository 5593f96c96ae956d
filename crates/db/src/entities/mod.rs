//! `SeaORM` entity definitions.

pub mod prelude;

pub mod approval_step_definitions;
pub mod course_tabs;
pub mod courses;
pub mod enrollment_approval_steps;
pub mod enrollments;
pub mod organizations;
pub mod sea_orm_active_enums;
pub mod users;
