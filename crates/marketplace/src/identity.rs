//! Identity provider integration: viewer resolution and user sync events.

use std::sync::Arc;

use async_trait::async_trait;
use hmac::{Hmac, Mac};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::Deserialize;
use sha2::Sha256;
use uuid::Uuid;

#[cfg(any(test, feature = "test-utils"))]
use mockall::automock;

use common::{AppError, AppResult, JwtConfig};
use domain::{UserProfile, UserRole, Viewer};

use crate::service::UserService;

/// Claims carried by identity-provider session tokens.
#[derive(Debug, Clone, Deserialize)]
pub struct SessionClaims {
    /// Identity-provider user id
    pub sub: String,
    /// Local user id, present once the user has been synced
    #[serde(rename = "dbId")]
    pub db_id: Option<Uuid>,
    /// Informational only; the role is taken from the stored user
    pub role: Option<String>,
    pub exp: usize,
}

/// Turns request credentials into a [`Viewer`].
#[cfg_attr(any(test, feature = "test-utils"), automock)]
#[async_trait]
pub trait IdentityResolver: Send + Sync {
    /// No token is anonymous. An unverifiable token is an error; callers
    /// degrade to anonymous.
    async fn resolve_viewer(&self, token: Option<String>) -> AppResult<Viewer>;
}

/// Verifies HS256 session tokens signed with the shared secret and
/// resolves them against the stored user.
pub struct JwtIdentityResolver {
    key: DecodingKey,
    validation: Validation,
    users: Arc<dyn UserService>,
}

impl JwtIdentityResolver {
    pub fn new(config: &JwtConfig, users: Arc<dyn UserService>) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = config.leeway_seconds;
        Self {
            key: DecodingKey::from_secret(config.secret.as_bytes()),
            validation,
            users,
        }
    }

    pub fn verify(&self, token: &str) -> AppResult<SessionClaims> {
        Ok(decode::<SessionClaims>(token, &self.key, &self.validation)?.claims)
    }
}

#[async_trait]
impl IdentityResolver for JwtIdentityResolver {
    async fn resolve_viewer(&self, token: Option<String>) -> AppResult<Viewer> {
        let Some(token) = token else {
            return Ok(Viewer::anonymous());
        };
        let claims = self.verify(&token)?;

        // Not yet synced: signed in upstream but unknown here.
        let Some(user_id) = claims.db_id else {
            return Ok(Viewer::anonymous());
        };
        // Redacted users are filtered out by the lookup.
        let Some(user) = self.users.find_active_user(user_id).await? else {
            tracing::debug!(%user_id, "Token for unknown or deleted user");
            return Ok(Viewer::anonymous());
        };
        Ok(Viewer {
            user_id: Some(user.id),
            role: Some(user.role),
        })
    }
}

// =============================================================================
// User sync webhooks
// =============================================================================

type HmacSha256 = Hmac<Sha256>;

/// Check a hex HMAC-SHA256 signature over the raw body.
pub fn verify_webhook_signature(payload: &[u8], signature: &str, secret: &str) -> bool {
    let Ok(expected) = hex::decode(signature.trim()) else {
        return false;
    };
    let Ok(mut mac) = HmacSha256::new_from_slice(secret.as_bytes()) else {
        return false;
    };
    mac.update(payload);
    mac.verify_slice(&expected).is_ok()
}

#[derive(Debug, Clone, Deserialize)]
struct EmailAddress {
    id: String,
    email_address: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct PublicMetadata {
    role: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct IdentityUser {
    id: String,
    #[serde(default)]
    email_addresses: Vec<EmailAddress>,
    primary_email_address_id: Option<String>,
    first_name: Option<String>,
    last_name: Option<String>,
    image_url: Option<String>,
    #[serde(default)]
    public_metadata: PublicMetadata,
}

#[derive(Debug, Clone, Deserialize)]
struct IdentityEnvelope {
    #[serde(rename = "type")]
    event_type: String,
    data: serde_json::Value,
}

/// A user sync event from the identity provider.
#[derive(Debug, Clone, PartialEq)]
pub enum IdentityEvent {
    Upsert(UserProfile),
    Deleted { external_id: String },
    Ignored(String),
}

impl IdentityUser {
    fn into_profile(self) -> AppResult<UserProfile> {
        let email = self
            .email_addresses
            .iter()
            .find(|e| Some(&e.id) == self.primary_email_address_id.as_ref())
            .or_else(|| self.email_addresses.first())
            .map(|e| e.email_address.clone())
            .ok_or_else(|| AppError::bad_request("User has no email address"))?;
        let name = [self.first_name.as_deref(), self.last_name.as_deref()]
            .into_iter()
            .flatten()
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join(" ");
        if name.is_empty() {
            return Err(AppError::bad_request("User has no name"));
        }

        Ok(UserProfile {
            external_id: self.id,
            email,
            name,
            image_url: self.image_url,
            role: self.public_metadata.role.map(UserRole::from),
        })
    }
}

/// Parse a verified user sync event body.
pub fn parse_identity_event(payload: &[u8]) -> AppResult<IdentityEvent> {
    let envelope: IdentityEnvelope = serde_json::from_slice(payload)
        .map_err(|e| AppError::bad_request(format!("Malformed event: {e}")))?;

    match envelope.event_type.as_str() {
        "user.created" | "user.updated" => {
            let user: IdentityUser = serde_json::from_value(envelope.data)
                .map_err(|e| AppError::bad_request(format!("Malformed user: {e}")))?;
            Ok(IdentityEvent::Upsert(user.into_profile()?))
        }
        "user.deleted" => {
            let external_id = envelope
                .data
                .get("id")
                .and_then(|id| id.as_str())
                .ok_or_else(|| AppError::bad_request("Deleted user has no id"))?;
            Ok(IdentityEvent::Deleted {
                external_id: external_id.to_string(),
            })
        }
        _ => Ok(IdentityEvent::Ignored(envelope.event_type)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::MockUserService;
    use chrono::Utc;
    use domain::User;
    use jsonwebtoken::{encode, EncodingKey, Header};
    use mockall::predicate::eq;
    use serde::Serialize;
    use tokio_test::{assert_err, assert_ok};

    #[derive(Serialize)]
    struct TestClaims {
        sub: String,
        #[serde(rename = "dbId", skip_serializing_if = "Option::is_none")]
        db_id: Option<Uuid>,
        role: Option<String>,
        exp: usize,
    }

    fn token(db_id: Option<Uuid>, role: Option<&str>, secret: &str) -> String {
        let claims = TestClaims {
            sub: "user_2abc".into(),
            db_id,
            role: role.map(String::from),
            exp: (chrono::Utc::now().timestamp() + 3600) as usize,
        };
        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .unwrap()
    }

    fn stored_user(id: Uuid, role: UserRole) -> User {
        User {
            id,
            external_id: "user_2abc".into(),
            email: "ada@example.com".into(),
            name: "Ada".into(),
            role,
            image_url: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
            deleted_at: None,
        }
    }

    fn resolver(users: MockUserService) -> JwtIdentityResolver {
        JwtIdentityResolver::new(
            &JwtConfig {
                secret: "test-secret".into(),
                leeway_seconds: 0,
            },
            Arc::new(users),
        )
    }

    #[tokio::test]
    async fn test_role_comes_from_the_stored_user() {
        let id = Uuid::new_v4();
        let mut users = MockUserService::new();
        users
            .expect_find_active_user()
            .with(eq(id))
            .times(2)
            .returning(|id| Ok(Some(stored_user(id, UserRole::Admin))));
        let resolver = resolver(users);

        let viewer = assert_ok!(
            resolver
                .resolve_viewer(Some(token(Some(id), Some("admin"), "test-secret")))
                .await
        );
        assert_eq!(viewer, Viewer::admin(id));

        // A stale claim does not downgrade or elevate the stored role.
        let viewer = assert_ok!(
            resolver
                .resolve_viewer(Some(token(Some(id), Some("user"), "test-secret")))
                .await
        );
        assert_eq!(viewer, Viewer::admin(id));
    }

    #[tokio::test]
    async fn test_admin_claim_for_plain_user_is_not_admin() {
        let id = Uuid::new_v4();
        let mut users = MockUserService::new();
        users
            .expect_find_active_user()
            .returning(|id| Ok(Some(stored_user(id, UserRole::User))));

        let viewer = assert_ok!(
            resolver(users)
                .resolve_viewer(Some(token(Some(id), Some("admin"), "test-secret")))
                .await
        );
        assert_eq!(viewer, Viewer::user(id));
    }

    #[tokio::test]
    async fn test_redacted_user_token_is_anonymous() {
        let mut users = MockUserService::new();
        users.expect_find_active_user().returning(|_| Ok(None));

        let viewer = assert_ok!(
            resolver(users)
                .resolve_viewer(Some(token(Some(Uuid::new_v4()), Some("admin"), "test-secret")))
                .await
        );
        assert!(viewer.is_anonymous());
    }

    #[tokio::test]
    async fn test_missing_token_and_unsynced_user_are_anonymous() {
        let mut users = MockUserService::new();
        users.expect_find_active_user().never();
        let resolver = resolver(users);

        assert!(resolver.resolve_viewer(None).await.unwrap().is_anonymous());
        let unsynced = resolver
            .resolve_viewer(Some(token(None, Some("user"), "test-secret")))
            .await
            .unwrap();
        assert!(unsynced.is_anonymous());
    }

    #[tokio::test]
    async fn test_foreign_signature_is_rejected() {
        let mut users = MockUserService::new();
        users.expect_find_active_user().never();

        let error = assert_err!(
            resolver(users)
                .resolve_viewer(Some(token(Some(Uuid::new_v4()), None, "other-secret")))
                .await
        );
        assert!(matches!(error, AppError::Jwt(_)));
    }

    #[test]
    fn test_webhook_signature_verification() {
        let payload = br#"{"type":"user.created"}"#;
        let mut mac = HmacSha256::new_from_slice(b"hook-secret").unwrap();
        mac.update(payload);
        let signature = hex::encode(mac.finalize().into_bytes());

        assert!(verify_webhook_signature(payload, &signature, "hook-secret"));
        assert!(!verify_webhook_signature(payload, &signature, "wrong"));
        assert!(!verify_webhook_signature(payload, "not-hex", "hook-secret"));
    }

    #[test]
    fn test_created_event_uses_primary_email_and_full_name() {
        let payload = br#"{
            "type": "user.created",
            "data": {
                "id": "user_2abc",
                "email_addresses": [
                    {"id": "e1", "email_address": "old@example.com"},
                    {"id": "e2", "email_address": "ada@example.com"}
                ],
                "primary_email_address_id": "e2",
                "first_name": "Ada",
                "last_name": "Lovelace",
                "image_url": null,
                "public_metadata": {}
            }
        }"#;

        let IdentityEvent::Upsert(profile) = parse_identity_event(payload).unwrap() else {
            panic!("expected upsert");
        };
        assert_eq!(profile.email, "ada@example.com");
        assert_eq!(profile.name, "Ada Lovelace");
        assert_eq!(profile.role, None);
    }

    #[test]
    fn test_deleted_event_carries_external_id() {
        let payload = br#"{"type":"user.deleted","data":{"id":"user_2abc","deleted":true}}"#;

        assert_eq!(
            parse_identity_event(payload).unwrap(),
            IdentityEvent::Deleted {
                external_id: "user_2abc".into()
            }
        );
    }
}
