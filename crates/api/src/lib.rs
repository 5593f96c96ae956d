//! HTTP API layer with Axum routes and middleware.
//!
//! This crate provides:
//! - REST API routes for the enrollment workflow
//! - Authentication middleware
//! - Error responses
//! - The email-backed notification dispatcher

pub mod error;
pub mod middleware;
pub mod notify;
pub mod routes;

use std::sync::Arc;

use axum::Router;
use sea_orm::DatabaseConnection;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use campus_core::clock::Clock;
use campus_core::workflow::NotificationDispatcher;
use campus_db::{EnrollmentRepository, OrganizationDirectory, WorkflowRepository};
use campus_shared::{CacheConfig, EnrollmentConfig, JwtService};

pub use error::ApiError;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    /// JWT service for token validation.
    pub jwt_service: Arc<JwtService>,
    /// Enrollment lifecycle and listings.
    pub enrollments: Arc<EnrollmentRepository>,
    /// Step decisions, sync and notifications.
    pub workflow: Arc<WorkflowRepository>,
}

impl AppState {
    /// Wires the repositories over one connection pool.
    #[must_use]
    pub fn new(
        db: DatabaseConnection,
        jwt_service: JwtService,
        dispatcher: Arc<dyn NotificationDispatcher>,
        clock: Arc<dyn Clock>,
        enrollment: EnrollmentConfig,
        cache: &CacheConfig,
    ) -> Self {
        let organizations = OrganizationDirectory::new(db.clone(), clock.clone(), cache);
        let workflow = WorkflowRepository::new(db.clone(), dispatcher, clock, organizations, enrollment);
        let enrollments = EnrollmentRepository::new(db, workflow.clone());

        Self {
            jwt_service: Arc::new(jwt_service),
            enrollments: Arc::new(enrollments),
            workflow: Arc::new(workflow),
        }
    }
}

/// Creates the main application router.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .nest("/api/v1", routes::api_routes_with_state(state.clone()))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}
