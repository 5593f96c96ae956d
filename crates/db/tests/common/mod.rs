//! Shared fixtures for repository integration tests.
//!
//! Each test gets its own in-memory SQLite database, migrated with the
//! production migrator. The pool holds exactly one connection: every
//! connection to `sqlite::memory:` would otherwise see a different database.

#![allow(dead_code)]

use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectOptions, Database, DatabaseConnection, EntityTrait,
    QueryFilter, Set,
};
use uuid::Uuid;

use campus_core::clock::FixedClock;
use campus_core::workflow::{Actor, EnrollmentNotice, NotificationDispatcher};
use campus_db::entities::{
    approval_step_definitions, course_tabs, courses, enrollment_approval_steps, organizations,
    sea_orm_active_enums::StepKind, users,
};
use campus_db::migration::{Migrator, MigratorTrait};
use campus_db::{EnrollmentRepository, OrganizationDirectory, WorkflowRepository};
use campus_shared::{CacheConfig, EnrollmentConfig};

/// Dispatcher that records every notice and can be told to fail.
#[derive(Default)]
pub struct RecordingDispatcher {
    approvals: Mutex<Vec<EnrollmentNotice>>,
    rejections: Mutex<Vec<EnrollmentNotice>>,
    failing: AtomicBool,
}

impl RecordingDispatcher {
    pub fn approvals(&self) -> Vec<EnrollmentNotice> {
        self.approvals.lock().unwrap().clone()
    }

    pub fn rejections(&self) -> Vec<EnrollmentNotice> {
        self.rejections.lock().unwrap().clone()
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }
}

#[async_trait]
impl NotificationDispatcher for RecordingDispatcher {
    async fn send_approval_email(&self, notice: &EnrollmentNotice) -> bool {
        if self.failing.load(Ordering::SeqCst) {
            return false;
        }
        self.approvals.lock().unwrap().push(notice.clone());
        true
    }

    async fn send_rejection_email(&self, notice: &EnrollmentNotice) -> bool {
        if self.failing.load(Ordering::SeqCst) {
            return false;
        }
        self.rejections.lock().unwrap().push(notice.clone());
        true
    }
}

/// Requirement of a configured step.
#[derive(Debug, Clone, Copy)]
pub enum Step {
    Head,
    Role(Uuid),
}

pub struct TestEnv {
    pub db: DatabaseConnection,
    pub clock: Arc<FixedClock>,
    pub dispatcher: Arc<RecordingDispatcher>,
    pub workflow: WorkflowRepository,
    pub enrollments: EnrollmentRepository,
}

pub fn start_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 2, 9, 0, 0).unwrap()
}

pub async fn setup() -> TestEnv {
    let mut options = ConnectOptions::new("sqlite::memory:");
    options
        .max_connections(1)
        .min_connections(1)
        .sqlx_logging(false);
    let db = Database::connect(options)
        .await
        .expect("Failed to open in-memory database");

    Migrator::up(&db, None)
        .await
        .expect("Failed to run migrations");

    let clock = Arc::new(FixedClock::new(start_time()));
    let dispatcher = Arc::new(RecordingDispatcher::default());
    let organizations = OrganizationDirectory::new(db.clone(), clock.clone(), &CacheConfig::default());
    let workflow = WorkflowRepository::new(
        db.clone(),
        dispatcher.clone(),
        clock.clone(),
        organizations,
        EnrollmentConfig::default(),
    );
    let enrollments = EnrollmentRepository::new(db.clone(), workflow.clone());

    TestEnv {
        db,
        clock,
        dispatcher,
        workflow,
        enrollments,
    }
}

impl TestEnv {
    pub async fn main_organization(&self, name: &str) {
        organizations::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(name.to_string()),
            is_main: Set(true),
            created_at: Set(start_time().into()),
        }
        .insert(&self.db)
        .await
        .expect("Failed to create organization");
    }

    pub async fn user(&self, name: &str, department_id: Option<Uuid>) -> Uuid {
        let id = Uuid::new_v4();
        users::ActiveModel {
            id: Set(id),
            full_name: Set(name.to_string()),
            email: Set(format!("{}@campus.test", name.to_lowercase().replace(' ', "."))),
            department_id: Set(department_id),
            department_role: Set(None),
            created_at: Set(start_time().into()),
        }
        .insert(&self.db)
        .await
        .expect("Failed to create user");
        id
    }

    pub async fn course_tab(&self, steps: &[Step]) -> (Uuid, Vec<Uuid>) {
        let tab_id = Uuid::new_v4();
        course_tabs::ActiveModel {
            id: Set(tab_id),
            name: Set("Leadership".to_string()),
            created_at: Set(start_time().into()),
        }
        .insert(&self.db)
        .await
        .expect("Failed to create course tab");

        let mut definition_ids = Vec::with_capacity(steps.len());
        for (step, order) in steps.iter().zip(1..) {
            definition_ids.push(self.add_step(tab_id, order, *step).await);
        }
        (tab_id, definition_ids)
    }

    pub async fn add_step(&self, tab_id: Uuid, order: i32, step: Step) -> Uuid {
        let id = Uuid::new_v4();
        let (kind, role_id) = match step {
            Step::Head => (StepKind::HeadApproval, None),
            Step::Role(role_id) => (StepKind::RoleApproval, Some(role_id)),
        };
        approval_step_definitions::ActiveModel {
            id: Set(id),
            course_tab_id: Set(tab_id),
            step_order: Set(order),
            kind: Set(kind),
            role_id: Set(role_id),
            is_active: Set(true),
            created_at: Set(start_time().into()),
        }
        .insert(&self.db)
        .await
        .expect("Failed to create step definition");
        id
    }

    pub async fn deactivate_step(&self, definition_id: Uuid) {
        let definition = approval_step_definitions::Entity::find_by_id(definition_id)
            .one(&self.db)
            .await
            .unwrap()
            .unwrap();
        let mut active: approval_step_definitions::ActiveModel = definition.into();
        active.is_active = Set(false);
        active.update(&self.db).await.expect("Failed to deactivate step");
    }

    pub async fn course(&self, tab_id: Uuid, seats: i32, published: bool) -> Uuid {
        let id = Uuid::new_v4();
        courses::ActiveModel {
            id: Set(id),
            course_tab_id: Set(tab_id),
            title: Set("Negotiation Basics".to_string()),
            is_published: Set(published),
            available_seats: Set(seats),
            starts_at: Set((start_time() + Duration::days(7)).into()),
            is_deleted: Set(false),
            created_at: Set(start_time().into()),
        }
        .insert(&self.db)
        .await
        .expect("Failed to create course");
        id
    }

    pub async fn live_steps(&self, enrollment_id: Uuid) -> Vec<enrollment_approval_steps::Model> {
        enrollment_approval_steps::Entity::find()
            .filter(enrollment_approval_steps::Column::EnrollmentId.eq(enrollment_id))
            .filter(enrollment_approval_steps::Column::IsDeleted.eq(false))
            .all(&self.db)
            .await
            .unwrap()
    }
}

pub fn member(user_id: Uuid, department_id: Option<Uuid>) -> Actor {
    Actor {
        user_id,
        name: "Member".to_string(),
        department_id,
        is_department_head: false,
        roles: vec![],
    }
}

pub fn head(user_id: Uuid, department_id: Uuid) -> Actor {
    Actor {
        user_id,
        name: "Head".to_string(),
        department_id: Some(department_id),
        is_department_head: true,
        roles: vec![],
    }
}

pub fn role_holder(user_id: Uuid, role_id: Uuid) -> Actor {
    Actor {
        user_id,
        name: "Coordinator".to_string(),
        department_id: None,
        is_department_head: false,
        roles: vec![role_id],
    }
}
