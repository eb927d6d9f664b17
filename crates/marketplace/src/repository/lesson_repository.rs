//! Lesson repository, including previous/next traversal.

use async_trait::async_trait;
use chrono::Utc;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DatabaseTransaction,
    EntityTrait, JoinType, QueryFilter, QueryOrder, QuerySelect, RelationTrait, Set,
};
use uuid::Uuid;

use super::entities::{course_section, lesson};
use common::{AppError, AppResult};
use domain::{ContentScope, Direction, Lesson, LessonInput, LessonPosition};

#[cfg(any(test, feature = "test-utils"))]
use mockall::automock;

#[cfg_attr(any(test, feature = "test-utils"), automock)]
#[async_trait]
pub trait LessonRepository: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Lesson>>;

    /// Nearest lesson visible to `scope` before or after `position`.
    ///
    /// Looks inside the lesson's own section first, then across the course in
    /// section order. Sections with nothing visible are skipped. Gaps in `order`
    /// values are irrelevant; only relative order is compared.
    async fn neighbor(
        &self,
        position: LessonPosition,
        direction: Direction,
        scope: ContentScope,
    ) -> AppResult<Option<Uuid>>;
}

pub struct LessonStore {
    db: DatabaseConnection,
}

impl LessonStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl LessonRepository for LessonStore {
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Lesson>> {
        find_lesson(&self.db, id).await
    }

    async fn neighbor(
        &self,
        position: LessonPosition,
        direction: Direction,
        scope: ContentScope,
    ) -> AppResult<Option<Uuid>> {
        if let Some(id) = neighbor_in_section(&self.db, &position, direction, scope).await? {
            return Ok(Some(id));
        }
        neighbor_across_sections(&self.db, &position, direction, scope).await
    }
}

/// Lesson writes bound to an open transaction.
pub struct TxLessonRepository<'a> {
    txn: &'a DatabaseTransaction,
}

impl<'a> TxLessonRepository<'a> {
    pub(crate) fn new(txn: &'a DatabaseTransaction) -> Self {
        Self { txn }
    }

    pub async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Lesson>> {
        find_lesson(self.txn, id).await
    }

    pub async fn ids_for_sections(&self, section_ids: &[Uuid]) -> AppResult<Vec<Uuid>> {
        if section_ids.is_empty() {
            return Ok(Vec::new());
        }
        let ids: Vec<Uuid> = lesson::Entity::find()
            .select_only()
            .column(lesson::Column::Id)
            .filter(lesson::Column::SectionId.is_in(section_ids.iter().copied()))
            .into_tuple()
            .all(self.txn)
            .await?;
        Ok(ids)
    }

    /// Appends a lesson after the last one in its section.
    pub async fn create(&self, input: &LessonInput) -> AppResult<Lesson> {
        let order = self.next_order(input.section_id).await?;
        let now = Utc::now();

        let model = lesson::ActiveModel {
            id: Set(Uuid::new_v4()),
            section_id: Set(input.section_id),
            name: Set(input.name.trim().to_string()),
            description: Set(input.normalized_description()),
            status: Set(input.status.as_str().to_string()),
            youtube_video_id: Set(input.youtube_video_id.trim().to_string()),
            order: Set(order),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(self.txn)
        .await?;

        Ok(Lesson::from(model))
    }

    /// Updates a lesson. Moving it to another section appends it there.
    pub async fn update(&self, id: Uuid, input: &LessonInput) -> AppResult<Lesson> {
        let existing = lesson::Entity::find_by_id(id)
            .one(self.txn)
            .await?
            .ok_or(AppError::NotFound)?;
        let moved = existing.section_id != input.section_id;

        let mut active: lesson::ActiveModel = existing.into();
        if moved {
            active.order = Set(self.next_order(input.section_id).await?);
            active.section_id = Set(input.section_id);
        }
        active.name = Set(input.name.trim().to_string());
        active.description = Set(input.normalized_description());
        active.status = Set(input.status.as_str().to_string());
        active.youtube_video_id = Set(input.youtube_video_id.trim().to_string());
        active.updated_at = Set(Utc::now());

        let model = active.update(self.txn).await?;
        Ok(Lesson::from(model))
    }

    pub async fn delete(&self, id: Uuid) -> AppResult<()> {
        let result = lesson::Entity::delete_by_id(id).exec(self.txn).await?;
        if result.rows_affected == 0 {
            return Err(AppError::NotFound);
        }
        Ok(())
    }

    /// Assigns `order = index` to each id. Every id must exist.
    pub async fn reorder(&self, ids: &[Uuid]) -> AppResult<()> {
        let now = Utc::now();
        for (index, id) in ids.iter().enumerate() {
            let result = lesson::Entity::update_many()
                .col_expr(lesson::Column::Order, Expr::value(index as i32))
                .col_expr(lesson::Column::UpdatedAt, Expr::value(now))
                .filter(lesson::Column::Id.eq(*id))
                .exec(self.txn)
                .await?;
            if result.rows_affected == 0 {
                return Err(AppError::NotFound);
            }
        }
        Ok(())
    }

    async fn next_order(&self, section_id: Uuid) -> AppResult<i32> {
        let max: Option<Option<i32>> = lesson::Entity::find()
            .select_only()
            .column_as(Expr::col(lesson::Column::Order).max(), "max_order")
            .filter(lesson::Column::SectionId.eq(section_id))
            .into_tuple()
            .one(self.txn)
            .await?;
        Ok(max.flatten().map_or(0, |m| m + 1))
    }
}

async fn find_lesson<C: ConnectionTrait>(db: &C, id: Uuid) -> AppResult<Option<Lesson>> {
    let result = lesson::Entity::find_by_id(id).one(db).await?;
    Ok(result.map(Lesson::from))
}

fn lesson_statuses(scope: ContentScope) -> impl Iterator<Item = &'static str> {
    scope.lesson_statuses().iter().map(|s| s.as_str())
}

fn section_statuses(scope: ContentScope) -> impl Iterator<Item = &'static str> {
    scope.section_statuses().iter().map(|s| s.as_str())
}

async fn neighbor_in_section<C: ConnectionTrait>(
    db: &C,
    position: &LessonPosition,
    direction: Direction,
    scope: ContentScope,
) -> AppResult<Option<Uuid>> {
    let query = lesson::Entity::find()
        .select_only()
        .column(lesson::Column::Id)
        .filter(lesson::Column::SectionId.eq(position.section_id))
        .filter(lesson::Column::Status.is_in(lesson_statuses(scope)));

    let query = match direction {
        Direction::Previous => query
            .filter(lesson::Column::Order.lt(position.order))
            .order_by_desc(lesson::Column::Order),
        Direction::Next => query
            .filter(lesson::Column::Order.gt(position.order))
            .order_by_asc(lesson::Column::Order),
    };

    let id: Option<Uuid> = query.into_tuple().one(db).await?;
    Ok(id)
}

async fn neighbor_across_sections<C: ConnectionTrait>(
    db: &C,
    position: &LessonPosition,
    direction: Direction,
    scope: ContentScope,
) -> AppResult<Option<Uuid>> {
    let query = lesson::Entity::find()
        .select_only()
        .column(lesson::Column::Id)
        .join(JoinType::InnerJoin, lesson::Relation::CourseSection.def())
        .filter(course_section::Column::CourseId.eq(position.course_id))
        .filter(course_section::Column::Status.is_in(section_statuses(scope)))
        .filter(lesson::Column::Status.is_in(lesson_statuses(scope)));

    // Entering the next section lands on its first lesson, the previous on its last.
    let query = match direction {
        Direction::Previous => query
            .filter(course_section::Column::Order.lt(position.section_order))
            .order_by_desc(course_section::Column::Order)
            .order_by_desc(lesson::Column::Order),
        Direction::Next => query
            .filter(course_section::Column::Order.gt(position.section_order))
            .order_by_asc(course_section::Column::Order)
            .order_by_asc(lesson::Column::Order),
    };

    let id: Option<Uuid> = query.into_tuple().one(db).await?;
    Ok(id)
}
