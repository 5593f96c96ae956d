//! `SeaORM` Entity for enrollments table.

use super::sea_orm_active_enums::EnrollmentStatus;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "enrollments")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub course_id: Uuid,
    pub user_id: Uuid,
    pub enrolled_at: DateTimeWithTimeZone,
    pub status: EnrollmentStatus,
    pub final_approval: bool,
    pub is_deleted: bool,
    pub notification_sent: bool,
    pub notification_sent_at: Option<DateTimeWithTimeZone>,
    pub version: i32,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::courses::Entity",
        from = "Column::CourseId",
        to = "super::courses::Column::Id"
    )]
    Courses,
    #[sea_orm(
        belongs_to = "super::users::Entity",
        from = "Column::UserId",
        to = "super::users::Column::Id"
    )]
    Users,
    #[sea_orm(has_many = "super::enrollment_approval_steps::Entity")]
    EnrollmentApprovalSteps,
}

impl Related<super::courses::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Courses.def()
    }
}

impl Related<super::users::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Users.def()
    }
}

impl Related<super::enrollment_approval_steps::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::EnrollmentApprovalSteps.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
