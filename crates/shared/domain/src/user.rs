//! User domain entity and related types.
//!
//! Users are synced from an external identity provider. They are never removed;
//! deletion redacts personal fields in place so purchases keep a valid owner.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::constants::{
    REDACTED_EMAIL, REDACTED_EXTERNAL_ID_PREFIX, REDACTED_NAME, ROLE_ADMIN, ROLE_USER,
};

/// Role claimed by the identity provider. Anything unrecognised is a plain user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    User,
    Admin,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::Admin => ROLE_ADMIN,
            UserRole::User => ROLE_USER,
        }
    }
}

impl From<&str> for UserRole {
    fn from(s: &str) -> Self {
        match s {
            ROLE_ADMIN => UserRole::Admin,
            _ => UserRole::User,
        }
    }
}

impl From<String> for UserRole {
    fn from(s: String) -> Self {
        UserRole::from(s.as_str())
    }
}

/// A synced identity-provider account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct User {
    pub id: Uuid,
    /// Identifier assigned by the identity provider
    pub external_id: String,
    pub email: String,
    pub name: String,
    pub role: UserRole,
    pub image_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Set once the account is redacted
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<DateTime<Utc>>,
}

impl User {
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }
}

/// Profile fields delivered by the identity provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub external_id: String,
    pub email: String,
    pub name: String,
    pub image_url: Option<String>,
    /// Role override; `None` keeps the stored role (or `user` for new rows)
    pub role: Option<UserRole>,
}

/// Replacement values written over a user row on deletion.
#[derive(Debug, Clone, PartialEq)]
pub struct Redaction {
    pub external_id: String,
    pub email: String,
    pub name: String,
    pub deleted_at: DateTime<Utc>,
}

impl Redaction {
    pub fn for_external_id(external_id: &str, at: DateTime<Utc>) -> Self {
        Self {
            external_id: format!("{REDACTED_EXTERNAL_ID_PREFIX}{external_id}"),
            email: REDACTED_EMAIL.to_string(),
            name: REDACTED_NAME.to_string(),
            deleted_at: at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_parsing_defaults_to_user() {
        assert_eq!(UserRole::from("admin"), UserRole::Admin);
        assert_eq!(UserRole::from("user"), UserRole::User);
        assert_eq!(UserRole::from("superuser"), UserRole::User);
        assert_eq!(UserRole::from(String::from("admin")).as_str(), "admin");
    }

    #[test]
    fn test_redaction_replaces_identity_fields() {
        let now = Utc::now();
        let redaction = Redaction::for_external_id("user_2abc", now);

        assert_eq!(redaction.external_id, "deleted-user_2abc");
        assert_eq!(redaction.email, "redacted@deleted.com");
        assert_eq!(redaction.name, "Deleted User");
        assert_eq!(redaction.deleted_at, now);
    }
}
