//! `SeaORM` Entity for enrollment_approval_steps table.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "enrollment_approval_steps")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub enrollment_id: Uuid,
    pub step_definition_id: Uuid,
    pub approved_by: Option<Uuid>,
    pub decided_at: Option<DateTimeWithTimeZone>,
    pub approved: bool,
    pub rejected: bool,
    #[sea_orm(column_type = "Text", nullable)]
    pub comments: Option<String>,
    pub is_deleted: bool,
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::enrollments::Entity",
        from = "Column::EnrollmentId",
        to = "super::enrollments::Column::Id"
    )]
    Enrollments,
    #[sea_orm(
        belongs_to = "super::approval_step_definitions::Entity",
        from = "Column::StepDefinitionId",
        to = "super::approval_step_definitions::Column::Id"
    )]
    ApprovalStepDefinitions,
}

impl Related<super::enrollments::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Enrollments.def()
    }
}

impl Related<super::approval_step_definitions::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ApprovalStepDefinitions.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
