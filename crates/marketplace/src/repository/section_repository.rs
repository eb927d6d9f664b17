//! Course section repository.

use async_trait::async_trait;
use chrono::Utc;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DatabaseTransaction,
    EntityTrait, QueryFilter, QuerySelect, Set,
};
use uuid::Uuid;

use super::entities::course_section;
use common::{AppError, AppResult};
use domain::{CourseSection, SectionInput};

#[cfg(any(test, feature = "test-utils"))]
use mockall::automock;

#[cfg_attr(any(test, feature = "test-utils"), automock)]
#[async_trait]
pub trait SectionRepository: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<CourseSection>>;
}

pub struct SectionStore {
    db: DatabaseConnection,
}

impl SectionStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl SectionRepository for SectionStore {
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<CourseSection>> {
        find_section(&self.db, id).await
    }
}

/// Section writes bound to an open transaction.
pub struct TxSectionRepository<'a> {
    txn: &'a DatabaseTransaction,
}

impl<'a> TxSectionRepository<'a> {
    pub(crate) fn new(txn: &'a DatabaseTransaction) -> Self {
        Self { txn }
    }

    pub async fn find_by_id(&self, id: Uuid) -> AppResult<Option<CourseSection>> {
        find_section(self.txn, id).await
    }

    /// Owning course of a section, or `NotFound`.
    pub async fn course_id_of(&self, id: Uuid) -> AppResult<Uuid> {
        self.find_by_id(id)
            .await?
            .map(|s| s.course_id)
            .ok_or(AppError::NotFound)
    }

    pub async fn ids_for_course(&self, course_id: Uuid) -> AppResult<Vec<Uuid>> {
        let ids: Vec<Uuid> = course_section::Entity::find()
            .select_only()
            .column(course_section::Column::Id)
            .filter(course_section::Column::CourseId.eq(course_id))
            .into_tuple()
            .all(self.txn)
            .await?;
        Ok(ids)
    }

    /// Appends a section after the last one in the course.
    pub async fn create(&self, course_id: Uuid, input: &SectionInput) -> AppResult<CourseSection> {
        let order = self.next_order(course_id).await?;
        let now = Utc::now();

        let model = course_section::ActiveModel {
            id: Set(Uuid::new_v4()),
            course_id: Set(course_id),
            name: Set(input.name.trim().to_string()),
            status: Set(input.status.as_str().to_string()),
            order: Set(order),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(self.txn)
        .await?;

        Ok(CourseSection::from(model))
    }

    pub async fn update(&self, id: Uuid, input: &SectionInput) -> AppResult<CourseSection> {
        let existing = course_section::Entity::find_by_id(id)
            .one(self.txn)
            .await?
            .ok_or(AppError::NotFound)?;

        let mut active: course_section::ActiveModel = existing.into();
        active.name = Set(input.name.trim().to_string());
        active.status = Set(input.status.as_str().to_string());
        active.updated_at = Set(Utc::now());

        let model = active.update(self.txn).await?;
        Ok(CourseSection::from(model))
    }

    pub async fn delete(&self, id: Uuid) -> AppResult<()> {
        let result = course_section::Entity::delete_by_id(id)
            .exec(self.txn)
            .await?;
        if result.rows_affected == 0 {
            return Err(AppError::NotFound);
        }
        Ok(())
    }

    /// Assigns `order = index` to each id. Every id must exist.
    pub async fn reorder(&self, ids: &[Uuid]) -> AppResult<()> {
        let now = Utc::now();
        for (index, id) in ids.iter().enumerate() {
            let result = course_section::Entity::update_many()
                .col_expr(course_section::Column::Order, Expr::value(index as i32))
                .col_expr(course_section::Column::UpdatedAt, Expr::value(now))
                .filter(course_section::Column::Id.eq(*id))
                .exec(self.txn)
                .await?;
            if result.rows_affected == 0 {
                return Err(AppError::NotFound);
            }
        }
        Ok(())
    }

    async fn next_order(&self, course_id: Uuid) -> AppResult<i32> {
        let max: Option<Option<i32>> = course_section::Entity::find()
            .select_only()
            .column_as(Expr::col(course_section::Column::Order).max(), "max_order")
            .filter(course_section::Column::CourseId.eq(course_id))
            .into_tuple()
            .one(self.txn)
            .await?;
        Ok(max.flatten().map_or(0, |m| m + 1))
    }
}

async fn find_section<C: ConnectionTrait>(db: &C, id: Uuid) -> AppResult<Option<CourseSection>> {
    let result = course_section::Entity::find_by_id(id).one(db).await?;
    Ok(result.map(CourseSection::from))
}
