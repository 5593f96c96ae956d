//! Notification trigger contract.
//!
//! Delivery is an external concern. The workflow only needs to know whether a
//! send succeeded; it never fails a decision because of a notification.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Everything a notification needs to describe an enrollment decision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnrollmentNotice {
    /// Enrollment ID.
    pub enrollment_id: Uuid,
    /// Recipient display name.
    pub subject_name: String,
    /// Recipient email address.
    pub subject_email: String,
    /// Course title.
    pub course_title: String,
    /// Course start.
    pub course_starts_at: DateTime<Utc>,
    /// Name of the organization sending the notice.
    pub organization_name: Option<String>,
    /// Approver comments attached to a rejection.
    pub comments: Option<String>,
}

/// Sends enrollment decision emails.
#[async_trait]
pub trait NotificationDispatcher: Send + Sync {
    /// Announce a fully approved enrollment. Returns false on failure.
    async fn send_approval_email(&self, notice: &EnrollmentNotice) -> bool;

    /// Announce a rejected enrollment. Returns false on failure.
    async fn send_rejection_email(&self, notice: &EnrollmentNotice) -> bool;
}
