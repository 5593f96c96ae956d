//! Email-backed notification dispatcher.

use async_trait::async_trait;
use tracing::{info, warn};

use campus_core::workflow::{EnrollmentNotice, NotificationDispatcher};
use campus_shared::EmailService;

/// Sends enrollment decisions over SMTP.
#[derive(Clone)]
pub struct EmailNotificationDispatcher {
    email: EmailService,
}

impl EmailNotificationDispatcher {
    /// Creates a dispatcher on top of the email service.
    #[must_use]
    pub const fn new(email: EmailService) -> Self {
        Self { email }
    }

    async fn deliver(&self, notice: &EnrollmentNotice, subject: &str, body: &str) -> bool {
        match self
            .email
            .send_email(&notice.subject_email, subject, body)
            .await
        {
            Ok(()) => {
                info!(enrollment_id = %notice.enrollment_id, subject, "Notification sent");
                true
            }
            Err(e) => {
                warn!(
                    enrollment_id = %notice.enrollment_id,
                    error = %e,
                    "Notification delivery failed"
                );
                false
            }
        }
    }
}

#[async_trait]
impl NotificationDispatcher for EmailNotificationDispatcher {
    async fn send_approval_email(&self, notice: &EnrollmentNotice) -> bool {
        let (subject, body) = approval_message(notice, self.email.frontend_url());
        self.deliver(notice, &subject, &body).await
    }

    async fn send_rejection_email(&self, notice: &EnrollmentNotice) -> bool {
        let (subject, body) = rejection_message(notice);
        self.deliver(notice, &subject, &body).await
    }
}

fn signature(notice: &EnrollmentNotice) -> &str {
    notice.organization_name.as_deref().unwrap_or("The training team")
}

/// Subject and body of the approval email.
pub(crate) fn approval_message(notice: &EnrollmentNotice, frontend_url: &str) -> (String, String) {
    let subject = format!("Enrollment approved: {}", notice.course_title);
    let body = format!(
        "Hello {name},\n\n\
         Your enrollment in \"{course}\" has been approved.\n\
         The course starts on {starts}.\n\n\
         Details: {url}/enrollments/{id}\n\n\
         {signature}",
        name = notice.subject_name,
        course = notice.course_title,
        starts = notice.course_starts_at.format("%Y-%m-%d %H:%M UTC"),
        url = frontend_url.trim_end_matches('/'),
        id = notice.enrollment_id,
        signature = signature(notice),
    );
    (subject, body)
}

/// Subject and body of the rejection email.
pub(crate) fn rejection_message(notice: &EnrollmentNotice) -> (String, String) {
    let subject = format!("Enrollment not approved: {}", notice.course_title);
    let reason = notice
        .comments
        .as_deref()
        .map(|c| format!("\nComments from the approver: {c}\n"))
        .unwrap_or_default();
    let body = format!(
        "Hello {name},\n\n\
         Your enrollment in \"{course}\" was not approved.\n{reason}\n\
         {signature}",
        name = notice.subject_name,
        course = notice.course_title,
        signature = signature(notice),
    );
    (subject, body)
}
