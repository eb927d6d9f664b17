//! Course access grants and lesson completion marks.
//!
//! Both tables are pure existence flags keyed by a composite primary key, so
//! inserts use do-nothing-on-conflict and deletes tolerate missing rows.

use async_trait::async_trait;
use chrono::Utc;
use sea_orm::sea_query::OnConflict;
use sea_orm::{
    ColumnTrait, DatabaseConnection, DatabaseTransaction, EntityTrait, QueryFilter, QueryOrder,
    QuerySelect, Set,
};
use uuid::Uuid;

use super::entities::{user_course_access, user_lesson_complete};
use common::AppResult;

#[cfg(any(test, feature = "test-utils"))]
use mockall::automock;

#[cfg_attr(any(test, feature = "test-utils"), automock)]
#[async_trait]
pub trait AccessRepository: Send + Sync {
    async fn has_access(&self, user_id: Uuid, course_id: Uuid) -> AppResult<bool>;

    /// Ids of every course the user may view in full.
    async fn course_ids_for_user(&self, user_id: Uuid) -> AppResult<Vec<Uuid>>;
}

pub struct AccessStore {
    db: DatabaseConnection,
}

impl AccessStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl AccessRepository for AccessStore {
    async fn has_access(&self, user_id: Uuid, course_id: Uuid) -> AppResult<bool> {
        let grant = user_course_access::Entity::find_by_id((user_id, course_id))
            .one(&self.db)
            .await?;
        Ok(grant.is_some())
    }

    async fn course_ids_for_user(&self, user_id: Uuid) -> AppResult<Vec<Uuid>> {
        let ids: Vec<Uuid> = user_course_access::Entity::find()
            .select_only()
            .column(user_course_access::Column::CourseId)
            .filter(user_course_access::Column::UserId.eq(user_id))
            .order_by_asc(user_course_access::Column::CreatedAt)
            .into_tuple()
            .all(&self.db)
            .await?;
        Ok(ids)
    }
}

/// Access grant writes bound to an open transaction.
pub struct TxAccessRepository<'a> {
    txn: &'a DatabaseTransaction,
}

impl<'a> TxAccessRepository<'a> {
    pub(crate) fn new(txn: &'a DatabaseTransaction) -> Self {
        Self { txn }
    }

    /// Grants access; an existing grant is left untouched.
    pub async fn grant(&self, user_id: Uuid, course_id: Uuid) -> AppResult<()> {
        let model = user_course_access::ActiveModel {
            user_id: Set(user_id),
            course_id: Set(course_id),
            created_at: Set(Utc::now()),
        };

        user_course_access::Entity::insert(model)
            .on_conflict(
                OnConflict::columns([
                    user_course_access::Column::UserId,
                    user_course_access::Column::CourseId,
                ])
                .do_nothing()
                .to_owned(),
            )
            .exec_without_returning(self.txn)
            .await?;
        Ok(())
    }

    /// Users holding access to a course.
    pub async fn user_ids_for_course(&self, course_id: Uuid) -> AppResult<Vec<Uuid>> {
        let ids: Vec<Uuid> = user_course_access::Entity::find()
            .select_only()
            .column(user_course_access::Column::UserId)
            .filter(user_course_access::Column::CourseId.eq(course_id))
            .into_tuple()
            .all(self.txn)
            .await?;
        Ok(ids)
    }
}

#[cfg_attr(any(test, feature = "test-utils"), automock)]
#[async_trait]
pub trait CompletionRepository: Send + Sync {
    async fn is_complete(&self, user_id: Uuid, lesson_id: Uuid) -> AppResult<bool>;

    async fn completed_lesson_ids(&self, user_id: Uuid) -> AppResult<Vec<Uuid>>;
}

pub struct CompletionStore {
    db: DatabaseConnection,
}

impl CompletionStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl CompletionRepository for CompletionStore {
    async fn is_complete(&self, user_id: Uuid, lesson_id: Uuid) -> AppResult<bool> {
        let mark = user_lesson_complete::Entity::find_by_id((user_id, lesson_id))
            .one(&self.db)
            .await?;
        Ok(mark.is_some())
    }

    async fn completed_lesson_ids(&self, user_id: Uuid) -> AppResult<Vec<Uuid>> {
        let ids: Vec<Uuid> = user_lesson_complete::Entity::find()
            .select_only()
            .column(user_lesson_complete::Column::LessonId)
            .filter(user_lesson_complete::Column::UserId.eq(user_id))
            .into_tuple()
            .all(&self.db)
            .await?;
        Ok(ids)
    }
}

/// Completion writes bound to an open transaction.
pub struct TxCompletionRepository<'a> {
    txn: &'a DatabaseTransaction,
}

impl<'a> TxCompletionRepository<'a> {
    pub(crate) fn new(txn: &'a DatabaseTransaction) -> Self {
        Self { txn }
    }

    pub async fn mark(&self, user_id: Uuid, lesson_id: Uuid) -> AppResult<()> {
        let model = user_lesson_complete::ActiveModel {
            user_id: Set(user_id),
            lesson_id: Set(lesson_id),
            created_at: Set(Utc::now()),
        };

        user_lesson_complete::Entity::insert(model)
            .on_conflict(
                OnConflict::columns([
                    user_lesson_complete::Column::UserId,
                    user_lesson_complete::Column::LessonId,
                ])
                .do_nothing()
                .to_owned(),
            )
            .exec_without_returning(self.txn)
            .await?;
        Ok(())
    }

    pub async fn unmark(&self, user_id: Uuid, lesson_id: Uuid) -> AppResult<()> {
        user_lesson_complete::Entity::delete_by_id((user_id, lesson_id))
            .exec(self.txn)
            .await?;
        Ok(())
    }

    /// (lesson, user) pairs for every mark on the given lessons.
    pub async fn marks_for_lessons(&self, lesson_ids: &[Uuid]) -> AppResult<Vec<(Uuid, Uuid)>> {
        if lesson_ids.is_empty() {
            return Ok(Vec::new());
        }
        let pairs: Vec<(Uuid, Uuid)> = user_lesson_complete::Entity::find()
            .select_only()
            .column(user_lesson_complete::Column::LessonId)
            .column(user_lesson_complete::Column::UserId)
            .filter(user_lesson_complete::Column::LessonId.is_in(lesson_ids.iter().copied()))
            .into_tuple()
            .all(self.txn)
            .await?;
        Ok(pairs)
    }
}
