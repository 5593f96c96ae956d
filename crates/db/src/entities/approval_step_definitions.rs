//! `SeaORM` Entity for approval_step_definitions table.

use super::sea_orm_active_enums::StepKind;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "approval_step_definitions")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub course_tab_id: Uuid,
    pub step_order: i32,
    pub kind: StepKind,
    pub role_id: Option<Uuid>,
    pub is_active: bool,
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::course_tabs::Entity",
        from = "Column::CourseTabId",
        to = "super::course_tabs::Column::Id"
    )]
    CourseTabs,
    #[sea_orm(has_many = "super::enrollment_approval_steps::Entity")]
    EnrollmentApprovalSteps,
}

impl Related<super::course_tabs::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::CourseTabs.def()
    }
}

impl Related<super::enrollment_approval_steps::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::EnrollmentApprovalSteps.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
