//! Enrollment approval workflow tables.
//!
//! Creates step definitions, enrollments and per-enrollment step records.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    #[allow(clippy::too_many_lines)]
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(ApprovalStepDefinitions::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ApprovalStepDefinitions::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(ApprovalStepDefinitions::CourseTabId)
                            .uuid()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ApprovalStepDefinitions::StepOrder)
                            .integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ApprovalStepDefinitions::Kind)
                            .string_len(32)
                            .not_null(),
                    )
                    .col(ColumnDef::new(ApprovalStepDefinitions::RoleId).uuid().null())
                    .col(
                        ColumnDef::new(ApprovalStepDefinitions::IsActive)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(
                        ColumnDef::new(ApprovalStepDefinitions::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_approval_step_definitions_course_tab")
                            .from(
                                ApprovalStepDefinitions::Table,
                                ApprovalStepDefinitions::CourseTabId,
                            )
                            .to(CourseTabs::Table, CourseTabs::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Step order is unique within a category
        manager
            .create_index(
                Index::create()
                    .name("uq_approval_step_definitions_tab_order")
                    .table(ApprovalStepDefinitions::Table)
                    .col(ApprovalStepDefinitions::CourseTabId)
                    .col(ApprovalStepDefinitions::StepOrder)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Enrollments::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Enrollments::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Enrollments::CourseId).uuid().not_null())
                    .col(ColumnDef::new(Enrollments::UserId).uuid().not_null())
                    .col(
                        ColumnDef::new(Enrollments::EnrolledAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Enrollments::Status)
                            .string_len(16)
                            .not_null()
                            .default("pending"),
                    )
                    .col(
                        ColumnDef::new(Enrollments::FinalApproval)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(Enrollments::IsDeleted)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(Enrollments::NotificationSent)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(Enrollments::NotificationSentAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(Enrollments::Version)
                            .integer()
                            .not_null()
                            .default(1),
                    )
                    .col(
                        ColumnDef::new(Enrollments::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_enrollments_course")
                            .from(Enrollments::Table, Enrollments::CourseId)
                            .to(Courses::Table, Courses::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_enrollments_user")
                            .from(Enrollments::Table, Enrollments::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // One row per (course, user), soft-deleted rows included
        manager
            .create_index(
                Index::create()
                    .name("uq_enrollments_course_user")
                    .table(Enrollments::Table)
                    .col(Enrollments::CourseId)
                    .col(Enrollments::UserId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(EnrollmentApprovalSteps::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(EnrollmentApprovalSteps::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(EnrollmentApprovalSteps::EnrollmentId)
                            .uuid()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(EnrollmentApprovalSteps::StepDefinitionId)
                            .uuid()
                            .not_null(),
                    )
                    .col(ColumnDef::new(EnrollmentApprovalSteps::ApprovedBy).uuid().null())
                    .col(
                        ColumnDef::new(EnrollmentApprovalSteps::DecidedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(EnrollmentApprovalSteps::Approved)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(EnrollmentApprovalSteps::Rejected)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(ColumnDef::new(EnrollmentApprovalSteps::Comments).text().null())
                    .col(
                        ColumnDef::new(EnrollmentApprovalSteps::IsDeleted)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(EnrollmentApprovalSteps::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_enrollment_approval_steps_enrollment")
                            .from(
                                EnrollmentApprovalSteps::Table,
                                EnrollmentApprovalSteps::EnrollmentId,
                            )
                            .to(Enrollments::Table, Enrollments::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_enrollment_approval_steps_definition")
                            .from(
                                EnrollmentApprovalSteps::Table,
                                EnrollmentApprovalSteps::StepDefinitionId,
                            )
                            .to(ApprovalStepDefinitions::Table, ApprovalStepDefinitions::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .to_owned(),
            )
            .await?;

        // Not unique: regeneration keeps soft-deleted history rows
        manager
            .create_index(
                Index::create()
                    .name("idx_enrollment_approval_steps_enrollment")
                    .table(EnrollmentApprovalSteps::Table)
                    .col(EnrollmentApprovalSteps::EnrollmentId)
                    .col(EnrollmentApprovalSteps::StepDefinitionId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(EnrollmentApprovalSteps::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Enrollments::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(ApprovalStepDefinitions::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum ApprovalStepDefinitions {
    Table,
    Id,
    CourseTabId,
    StepOrder,
    Kind,
    RoleId,
    IsActive,
    CreatedAt,
}

#[derive(DeriveIden)]
enum Enrollments {
    Table,
    Id,
    CourseId,
    UserId,
    EnrolledAt,
    Status,
    FinalApproval,
    IsDeleted,
    NotificationSent,
    NotificationSentAt,
    Version,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum EnrollmentApprovalSteps {
    Table,
    Id,
    EnrollmentId,
    StepDefinitionId,
    ApprovedBy,
    DecidedAt,
    Approved,
    Rejected,
    Comments,
    IsDeleted,
    CreatedAt,
}

#[derive(DeriveIden)]
enum CourseTabs {
    Table,
    Id,
}

#[derive(DeriveIden)]
enum Courses {
    Table,
    Id,
}

#[derive(DeriveIden)]
enum Users {
    Table,
    Id,
}
