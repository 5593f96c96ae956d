//! `SeaORM` Entity for course_tabs table.
//!
//! A course tab is the course category that owns an approval step
//! configuration.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "course_tabs")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub name: String,
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::courses::Entity")]
    Courses,
    #[sea_orm(has_many = "super::approval_step_definitions::Entity")]
    ApprovalStepDefinitions,
}

impl Related<super::courses::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Courses.def()
    }
}

impl Related<super::approval_step_definitions::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ApprovalStepDefinitions.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
