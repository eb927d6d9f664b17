//! User repository with soft delete support.
//!
//! Users are never removed; deletion redacts the row in place so purchases
//! keep a valid owner.

use async_trait::async_trait;
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DatabaseTransaction,
    EntityTrait, QueryFilter, Set,
};
use uuid::Uuid;

use super::entities::user::{self, ActiveModel, Entity as UserEntity};
use common::AppResult;
use domain::{Redaction, User, UserProfile, UserRole};

#[cfg(any(test, feature = "test-utils"))]
use mockall::automock;

/// User repository trait for dependency injection.
///
/// Query methods exclude soft-deleted records unless named otherwise.
#[cfg_attr(any(test, feature = "test-utils"), automock)]
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Find active user by ID (excludes soft-deleted)
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<User>>;

    /// Find user by ID including soft-deleted
    async fn find_by_id_with_deleted(&self, id: Uuid) -> AppResult<Option<User>>;

    /// Find active user by identity-provider id
    async fn find_by_external_id(&self, external_id: &str) -> AppResult<Option<User>>;
}

/// Concrete implementation of UserRepository
pub struct UserStore {
    db: DatabaseConnection,
}

impl UserStore {
    /// Create new repository instance
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl UserRepository for UserStore {
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<User>> {
        find_active(&self.db, id).await
    }

    async fn find_by_id_with_deleted(&self, id: Uuid) -> AppResult<Option<User>> {
        let result = UserEntity::find_by_id(id).one(&self.db).await?;
        Ok(result.map(User::from))
    }

    async fn find_by_external_id(&self, external_id: &str) -> AppResult<Option<User>> {
        let result = UserEntity::find()
            .filter(user::Column::ExternalId.eq(external_id))
            .filter(user::Column::DeletedAt.is_null())
            .one(&self.db)
            .await?;
        Ok(result.map(User::from))
    }
}

/// Transaction-aware user repository.
pub struct TxUserRepository<'a> {
    txn: &'a DatabaseTransaction,
}

impl<'a> TxUserRepository<'a> {
    pub(crate) fn new(txn: &'a DatabaseTransaction) -> Self {
        Self { txn }
    }

    /// Find active user by ID (excludes soft-deleted)
    pub async fn find_by_id(&self, id: Uuid) -> AppResult<Option<User>> {
        find_active(self.txn, id).await
    }

    /// Insert or refresh a user from identity-provider data, keyed by external id.
    ///
    /// New users default to the `user` role; an existing role is only replaced
    /// when the profile carries one.
    pub async fn upsert(&self, profile: &UserProfile) -> AppResult<User> {
        let now = Utc::now();
        let existing = UserEntity::find()
            .filter(user::Column::ExternalId.eq(profile.external_id.as_str()))
            .one(self.txn)
            .await?;

        let model = match existing {
            Some(model) => {
                let mut active: ActiveModel = model.into();
                active.email = Set(profile.email.clone());
                active.name = Set(profile.name.clone());
                active.image_url = Set(profile.image_url.clone());
                if let Some(role) = profile.role {
                    active.role = Set(role.as_str().to_string());
                }
                active.updated_at = Set(now);
                active.update(self.txn).await?
            }
            None => {
                ActiveModel {
                    id: Set(Uuid::new_v4()),
                    external_id: Set(profile.external_id.clone()),
                    email: Set(profile.email.clone()),
                    name: Set(profile.name.clone()),
                    role: Set(profile.role.unwrap_or(UserRole::User).as_str().to_string()),
                    image_url: Set(profile.image_url.clone()),
                    created_at: Set(now),
                    updated_at: Set(now),
                    deleted_at: Set(None),
                }
                .insert(self.txn)
                .await?
            }
        };

        Ok(User::from(model))
    }

    /// Soft delete: overwrite identity fields and stamp `deleted_at`.
    ///
    /// Returns `None` when no active user carries the external id.
    pub async fn redact(&self, external_id: &str) -> AppResult<Option<User>> {
        let Some(model) = UserEntity::find()
            .filter(user::Column::ExternalId.eq(external_id))
            .filter(user::Column::DeletedAt.is_null())
            .one(self.txn)
            .await?
        else {
            return Ok(None);
        };

        let redaction = Redaction::for_external_id(external_id, Utc::now());
        let mut active: ActiveModel = model.into();
        active.external_id = Set(redaction.external_id);
        active.email = Set(redaction.email);
        active.name = Set(redaction.name);
        active.image_url = Set(None);
        active.deleted_at = Set(Some(redaction.deleted_at));
        active.updated_at = Set(redaction.deleted_at);

        let model = active.update(self.txn).await?;
        Ok(Some(User::from(model)))
    }
}

async fn find_active<C: ConnectionTrait>(db: &C, id: Uuid) -> AppResult<Option<User>> {
    let result = UserEntity::find_by_id(id)
        .filter(user::Column::DeletedAt.is_null())
        .one(db)
        .await?;
    Ok(result.map(User::from))
}
