//! User service - identity-provider sync and the current user.

use std::sync::Arc;

use async_trait::async_trait;

#[cfg(any(test, feature = "test-utils"))]
use mockall::automock;

use super::queries::CachedQueries;
use crate::infra::{Invalidation, UnitOfWork};
use common::{AppResult, OptionExt};
use domain::{User, UserProfile, Viewer};
use uuid::Uuid;

/// User service trait for dependency injection.
///
/// Users are never removed: deletion redacts the row in place so purchases
/// keep their customer.
#[cfg_attr(any(test, feature = "test-utils"), automock)]
#[async_trait]
pub trait UserService: Send + Sync {
    /// Create or update a user from identity-provider data
    async fn sync_user(&self, profile: UserProfile) -> AppResult<User>;

    /// Soft delete and redact a user; `None` if the external id is unknown
    async fn delete_user(&self, external_id: String) -> AppResult<Option<User>>;

    /// The signed-in viewer's user record
    async fn current_user(&self, viewer: Viewer) -> AppResult<User>;

    /// Active user by local id; `None` once redacted
    async fn find_active_user(&self, id: Uuid) -> AppResult<Option<User>>;
}

pub struct UserManager<U: UnitOfWork> {
    uow: Arc<U>,
    queries: CachedQueries<U>,
}

impl<U: UnitOfWork + 'static> UserManager<U> {
    pub fn new(uow: Arc<U>, queries: CachedQueries<U>) -> Self {
        Self { uow, queries }
    }
}

#[async_trait]
impl<U: UnitOfWork + 'static> UserService for UserManager<U> {
    async fn sync_user(&self, profile: UserProfile) -> AppResult<User> {
        let user = self
            .uow
            .transaction(move |ctx| Box::pin(async move { ctx.users().upsert(&profile).await }))
            .await?;

        tracing::info!(user_id = %user.id, role = ?user.role, "User synced");
        self.queries
            .cache()
            .invalidate(Invalidation::new().user(user.id).into_tags())
            .await;
        Ok(user)
    }

    async fn delete_user(&self, external_id: String) -> AppResult<Option<User>> {
        let redacted = self
            .uow
            .transaction(move |ctx| {
                Box::pin(async move { ctx.users().redact(&external_id).await })
            })
            .await?;

        if let Some(user) = &redacted {
            tracing::info!(user_id = %user.id, "User redacted");
            self.queries
                .cache()
                .invalidate(Invalidation::new().user(user.id).into_tags())
                .await;
        }
        Ok(redacted)
    }

    async fn current_user(&self, viewer: Viewer) -> AppResult<User> {
        let user_id = viewer.require_user()?;
        self.queries.user(user_id).await?.ok_or_not_found()
    }

    async fn find_active_user(&self, id: Uuid) -> AppResult<Option<User>> {
        self.queries.user(id).await
    }
}
