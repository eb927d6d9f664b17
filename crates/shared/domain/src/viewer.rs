//! The resolved identity behind a request.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{DomainError, DomainResult};
use crate::user::UserRole;

/// Who is asking. Absence of `user_id` means anonymous.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Viewer {
    pub user_id: Option<Uuid>,
    pub role: Option<UserRole>,
}

impl Viewer {
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn user(id: Uuid) -> Self {
        Self {
            user_id: Some(id),
            role: Some(UserRole::User),
        }
    }

    pub fn admin(id: Uuid) -> Self {
        Self {
            user_id: Some(id),
            role: Some(UserRole::Admin),
        }
    }

    pub fn is_anonymous(&self) -> bool {
        self.user_id.is_none()
    }

    pub fn is_admin(&self) -> bool {
        matches!(self.role, Some(UserRole::Admin))
    }

    /// The signed-in user's id, or `Unauthorized`.
    pub fn require_user(&self) -> DomainResult<Uuid> {
        self.user_id.ok_or(DomainError::Unauthorized)
    }
}
