//! Identity claims carried by access tokens.
//!
//! Tokens are issued by the external identity provider (LDAP/AD bridge).
//! This service only consumes them: every field the approval workflow needs
//! to authorize an actor travels in the claims.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Department role that qualifies an actor for head-approval steps.
pub const HEAD_DEPARTMENT_ROLE: &str = "Head";

/// JWT claims for access tokens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (user ID).
    pub sub: Uuid,
    /// Display name of the user.
    pub name: String,
    /// Department the user belongs to, if any.
    #[serde(default)]
    pub dept: Option<Uuid>,
    /// The user's role within their department (e.g. "Head", "Member").
    #[serde(default)]
    pub dept_role: Option<String>,
    /// Roles assigned to the user.
    #[serde(default)]
    pub roles: Vec<Uuid>,
    /// Issued at timestamp.
    pub iat: i64,
    /// Expiration timestamp.
    pub exp: i64,
}

impl Claims {
    /// Creates new claims for a user.
    #[must_use]
    pub fn new(
        user_id: Uuid,
        name: &str,
        department_id: Option<Uuid>,
        department_role: Option<&str>,
        roles: Vec<Uuid>,
        expires_at: DateTime<Utc>,
    ) -> Self {
        Self {
            sub: user_id,
            name: name.to_string(),
            dept: department_id,
            dept_role: department_role.map(str::to_string),
            roles,
            iat: Utc::now().timestamp(),
            exp: expires_at.timestamp(),
        }
    }

    /// Returns the user ID from claims.
    #[must_use]
    pub const fn user_id(&self) -> Uuid {
        self.sub
    }

    /// Returns the department ID from claims.
    #[must_use]
    pub const fn department_id(&self) -> Option<Uuid> {
        self.dept
    }

    /// Returns true when the user heads their department.
    #[must_use]
    pub fn is_department_head(&self) -> bool {
        self.dept_role.as_deref() == Some(HEAD_DEPARTMENT_ROLE)
    }
}
