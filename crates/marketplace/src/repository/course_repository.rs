//! Course repository: course rows, outlines and per-course aggregates.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DatabaseTransaction,
    EntityTrait, JoinType, QueryFilter, QueryOrder, QuerySelect, RelationTrait, Set,
};
use uuid::Uuid;

use super::entities::{course, course_section, lesson, user_course_access, user_lesson_complete};
use common::{AppError, AppResult};
use domain::{
    ContentScope, Course, CourseInput, CourseOutline, CourseSummary, CourseTableRow, Lesson,
    SectionOutline, UserCourseProgress,
};

#[cfg(any(test, feature = "test-utils"))]
use mockall::automock;

/// Read access to courses.
#[cfg_attr(any(test, feature = "test-utils"), automock)]
#[async_trait]
pub trait CourseRepository: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Course>>;

    /// Every course with section, lesson and student counts, ordered by name.
    async fn list_table(&self) -> AppResult<Vec<CourseTableRow>>;

    async fn list_summaries(&self) -> AppResult<Vec<CourseSummary>>;

    /// Course with the sections and lessons `scope` may see, each ordered by `order`.
    async fn outline(&self, id: Uuid, scope: ContentScope) -> AppResult<Option<CourseOutline>>;

    /// Counts for one course as seen by an enrolled user.
    async fn progress(&self, course_id: Uuid, user_id: Uuid)
        -> AppResult<Option<UserCourseProgress>>;
}

/// Pool-backed course reads.
pub struct CourseStore {
    db: DatabaseConnection,
}

impl CourseStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl CourseRepository for CourseStore {
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Course>> {
        find_course(&self.db, id).await
    }

    async fn list_table(&self) -> AppResult<Vec<CourseTableRow>> {
        let courses = course::Entity::find()
            .order_by_asc(course::Column::Name)
            .all(&self.db)
            .await?;

        let sections = count_by_course(
            course_section::Entity::find()
                .select_only()
                .column(course_section::Column::CourseId)
                .column_as(Expr::col(course_section::Column::Id).count(), "count")
                .group_by(course_section::Column::CourseId),
            &self.db,
        )
        .await?;

        let lessons = count_by_course(
            lesson::Entity::find()
                .select_only()
                .column(course_section::Column::CourseId)
                .column_as(Expr::col((lesson::Entity, lesson::Column::Id)).count(), "count")
                .join(JoinType::InnerJoin, lesson::Relation::CourseSection.def())
                .group_by(course_section::Column::CourseId),
            &self.db,
        )
        .await?;

        let students = count_by_course(
            user_course_access::Entity::find()
                .select_only()
                .column(user_course_access::Column::CourseId)
                .column_as(Expr::col(user_course_access::Column::UserId).count(), "count")
                .group_by(user_course_access::Column::CourseId),
            &self.db,
        )
        .await?;

        Ok(courses
            .into_iter()
            .map(|c| CourseTableRow {
                id: c.id,
                name: c.name,
                sections_count: sections.get(&c.id).copied().unwrap_or(0),
                lessons_count: lessons.get(&c.id).copied().unwrap_or(0),
                students_count: students.get(&c.id).copied().unwrap_or(0),
            })
            .collect())
    }

    async fn list_summaries(&self) -> AppResult<Vec<CourseSummary>> {
        let courses = course::Entity::find()
            .order_by_asc(course::Column::Name)
            .all(&self.db)
            .await?;

        Ok(courses
            .into_iter()
            .map(|c| CourseSummary { id: c.id, name: c.name })
            .collect())
    }

    async fn outline(&self, id: Uuid, scope: ContentScope) -> AppResult<Option<CourseOutline>> {
        load_outline(&self.db, id, scope).await
    }

    async fn progress(
        &self,
        course_id: Uuid,
        user_id: Uuid,
    ) -> AppResult<Option<UserCourseProgress>> {
        let Some(outline) = load_outline(&self.db, course_id, ContentScope::Full).await? else {
            return Ok(None);
        };

        let lesson_ids: Vec<Uuid> = outline
            .sections
            .iter()
            .flat_map(|s| s.lessons.iter().map(|l| l.id))
            .collect();

        let lessons_complete = if lesson_ids.is_empty() {
            0
        } else {
            user_lesson_complete::Entity::find()
                .filter(user_lesson_complete::Column::UserId.eq(user_id))
                .filter(user_lesson_complete::Column::LessonId.is_in(lesson_ids))
                .all(&self.db)
                .await?
                .len() as u64
        };

        Ok(Some(UserCourseProgress {
            id: outline.course.id,
            name: outline.course.name.clone(),
            description: outline.course.description.clone(),
            sections_count: outline.sections.len() as u64,
            lessons_count: outline.lesson_count() as u64,
            lessons_complete,
        }))
    }
}

/// Course writes bound to an open transaction.
pub struct TxCourseRepository<'a> {
    txn: &'a DatabaseTransaction,
}

impl<'a> TxCourseRepository<'a> {
    pub(crate) fn new(txn: &'a DatabaseTransaction) -> Self {
        Self { txn }
    }

    pub async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Course>> {
        find_course(self.txn, id).await
    }

    pub async fn create(&self, input: &CourseInput) -> AppResult<Course> {
        let now = Utc::now();
        let model = course::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(input.name.trim().to_string()),
            description: Set(input.description.trim().to_string()),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(self.txn)
        .await?;

        Ok(Course::from(model))
    }

    pub async fn update(&self, id: Uuid, input: &CourseInput) -> AppResult<Course> {
        let existing = course::Entity::find_by_id(id)
            .one(self.txn)
            .await?
            .ok_or(AppError::NotFound)?;

        let mut active: course::ActiveModel = existing.into();
        active.name = Set(input.name.trim().to_string());
        active.description = Set(input.description.trim().to_string());
        active.updated_at = Set(Utc::now());

        let model = active.update(self.txn).await?;
        Ok(Course::from(model))
    }

    pub async fn delete(&self, id: Uuid) -> AppResult<()> {
        let result = course::Entity::delete_by_id(id).exec(self.txn).await?;
        if result.rows_affected == 0 {
            return Err(AppError::NotFound);
        }
        Ok(())
    }
}

async fn find_course<C: ConnectionTrait>(db: &C, id: Uuid) -> AppResult<Option<Course>> {
    let result = course::Entity::find_by_id(id).one(db).await?;
    Ok(result.map(Course::from))
}

async fn count_by_course<C: ConnectionTrait, E: EntityTrait>(
    select: sea_orm::Select<E>,
    db: &C,
) -> AppResult<HashMap<Uuid, u64>> {
    let rows: Vec<(Uuid, i64)> = select.into_tuple().all(db).await?;
    Ok(rows
        .into_iter()
        .map(|(id, count)| (id, count.max(0) as u64))
        .collect())
}

pub(crate) async fn load_outline<C: ConnectionTrait>(
    db: &C,
    id: Uuid,
    scope: ContentScope,
) -> AppResult<Option<CourseOutline>> {
    let Some(course) = course::Entity::find_by_id(id).one(db).await? else {
        return Ok(None);
    };

    let sections = course_section::Entity::find()
        .filter(course_section::Column::CourseId.eq(id))
        .filter(
            course_section::Column::Status
                .is_in(scope.section_statuses().iter().map(|s| s.as_str())),
        )
        .order_by_asc(course_section::Column::Order)
        .all(db)
        .await?;

    let section_ids: Vec<Uuid> = sections.iter().map(|s| s.id).collect();
    let lessons = if section_ids.is_empty() {
        Vec::new()
    } else {
        lesson::Entity::find()
            .filter(lesson::Column::SectionId.is_in(section_ids))
            .filter(lesson::Column::Status.is_in(scope.lesson_statuses().iter().map(|s| s.as_str())))
            .order_by_asc(lesson::Column::Order)
            .all(db)
            .await?
    };

    let mut by_section: HashMap<Uuid, Vec<Lesson>> = HashMap::new();
    for model in lessons {
        by_section
            .entry(model.section_id)
            .or_default()
            .push(Lesson::from(model));
    }

    let sections = sections
        .into_iter()
        .map(|model| {
            let lessons = by_section.remove(&model.id).unwrap_or_default();
            SectionOutline {
                section: model.into(),
                lessons,
            }
        })
        .collect();

    Ok(Some(CourseOutline {
        course: Course::from(course),
        sections,
    }))
}
