//! Course service - course and section authoring plus consumer course views.

use std::sync::Arc;

use async_trait::async_trait;
use uuid::Uuid;

#[cfg(any(test, feature = "test-utils"))]
use mockall::automock;

use super::container::parallel;
use super::queries::CachedQueries;
use super::require_catalog_manager;
use crate::infra::{Invalidation, UnitOfWork};
use crate::repository::CascadeFootprint;
use common::{AppError, AppResult, OptionExt};
use domain::{
    ContentScope, Course, CourseInput, CourseLayout, CourseOutline, CourseSection, CourseSummary,
    CourseTableRow, SectionInput, UserCourseProgress, Viewer,
};

#[cfg_attr(any(test, feature = "test-utils"), automock)]
#[async_trait]
pub trait CourseService: Send + Sync {
    /// Admin table with section, lesson and student counts
    async fn list_course_table(&self, viewer: Viewer) -> AppResult<Vec<CourseTableRow>>;

    /// Id and name of every course, for product forms
    async fn list_course_summaries(&self, viewer: Viewer) -> AppResult<Vec<CourseSummary>>;

    /// Course with every section and lesson, private included
    async fn get_course_for_edit(&self, viewer: Viewer, id: Uuid) -> AppResult<CourseOutline>;

    async fn create_course(&self, viewer: Viewer, input: CourseInput) -> AppResult<Course>;

    async fn update_course(&self, viewer: Viewer, id: Uuid, input: CourseInput)
        -> AppResult<Course>;

    /// Delete a course with its sections, lessons, grants and marks
    async fn delete_course(&self, viewer: Viewer, id: Uuid) -> AppResult<()>;

    /// Append a section to a course
    async fn create_section(
        &self,
        viewer: Viewer,
        course_id: Uuid,
        input: SectionInput,
    ) -> AppResult<CourseSection>;

    async fn update_section(
        &self,
        viewer: Viewer,
        id: Uuid,
        input: SectionInput,
    ) -> AppResult<CourseSection>;

    async fn delete_section(&self, viewer: Viewer, id: Uuid) -> AppResult<()>;

    /// Rewrite section order to match the given id sequence
    async fn reorder_sections(&self, viewer: Viewer, ids: Vec<Uuid>) -> AppResult<()>;

    /// Course content visible to the viewer plus their completed lessons
    async fn get_course_layout(&self, viewer: Viewer, id: Uuid) -> AppResult<CourseLayout>;

    /// Courses the signed-in viewer holds access to, with progress
    async fn list_user_courses(&self, viewer: Viewer) -> AppResult<Vec<UserCourseProgress>>;
}

pub struct CourseManager<U: UnitOfWork> {
    uow: Arc<U>,
    queries: CachedQueries<U>,
}

impl<U: UnitOfWork + 'static> CourseManager<U> {
    pub fn new(uow: Arc<U>, queries: CachedQueries<U>) -> Self {
        Self { uow, queries }
    }

    async fn scope_for(&self, viewer: &Viewer, course_id: Uuid) -> AppResult<ContentScope> {
        let has_access = match viewer.user_id {
            Some(user_id) => self.queries.has_access(user_id, course_id).await?,
            None => false,
        };
        Ok(ContentScope::resolve(viewer, has_access))
    }
}

#[async_trait]
impl<U: UnitOfWork + 'static> CourseService for CourseManager<U> {
    async fn list_course_table(&self, viewer: Viewer) -> AppResult<Vec<CourseTableRow>> {
        require_catalog_manager(&viewer)?;
        self.queries.course_table().await
    }

    async fn list_course_summaries(&self, viewer: Viewer) -> AppResult<Vec<CourseSummary>> {
        require_catalog_manager(&viewer)?;
        self.queries.course_summaries().await
    }

    async fn get_course_for_edit(&self, viewer: Viewer, id: Uuid) -> AppResult<CourseOutline> {
        require_catalog_manager(&viewer)?;
        self.queries
            .outline(id, ContentScope::Full)
            .await?
            .ok_or_not_found()
    }

    async fn create_course(&self, viewer: Viewer, input: CourseInput) -> AppResult<Course> {
        require_catalog_manager(&viewer)?;
        input.validate()?;

        let course = self
            .uow
            .transaction(move |ctx| Box::pin(async move { ctx.courses().create(&input).await }))
            .await?;

        tracing::info!(course_id = %course.id, "Course created");
        self.queries
            .cache()
            .invalidate(Invalidation::new().course(course.id).into_tags())
            .await;
        Ok(course)
    }

    async fn update_course(
        &self,
        viewer: Viewer,
        id: Uuid,
        input: CourseInput,
    ) -> AppResult<Course> {
        require_catalog_manager(&viewer)?;
        input.validate()?;

        let course = self
            .uow
            .transaction(move |ctx| {
                Box::pin(async move { ctx.courses().update(id, &input).await })
            })
            .await?;

        self.queries
            .cache()
            .invalidate(Invalidation::new().course(id).into_tags())
            .await;
        Ok(course)
    }

    async fn delete_course(&self, viewer: Viewer, id: Uuid) -> AppResult<()> {
        require_catalog_manager(&viewer)?;

        let footprint = self
            .uow
            .transaction(move |ctx| {
                Box::pin(async move {
                    ctx.courses().find_by_id(id).await?.ok_or_not_found()?;
                    let footprint = CascadeFootprint::for_course(&ctx, id).await?;
                    ctx.courses().delete(id).await?;
                    Ok(footprint)
                })
            })
            .await?;

        tracing::info!(
            course_id = %id,
            sections = footprint.section_ids.len(),
            lessons = footprint.lesson_ids.len(),
            grants = footprint.access.len(),
            "Course deleted"
        );
        let invalidation = Invalidation::new().course(id).merge(footprint.invalidation());
        self.queries.cache().invalidate(invalidation.into_tags()).await;
        Ok(())
    }

    async fn create_section(
        &self,
        viewer: Viewer,
        course_id: Uuid,
        input: SectionInput,
    ) -> AppResult<CourseSection> {
        require_catalog_manager(&viewer)?;
        input.validate()?;

        let section = self
            .uow
            .transaction(move |ctx| {
                Box::pin(async move {
                    ctx.courses().find_by_id(course_id).await?.ok_or_not_found()?;
                    ctx.sections().create(course_id, &input).await
                })
            })
            .await?;

        self.queries
            .cache()
            .invalidate(Invalidation::new().section(section.id, course_id).into_tags())
            .await;
        Ok(section)
    }

    async fn update_section(
        &self,
        viewer: Viewer,
        id: Uuid,
        input: SectionInput,
    ) -> AppResult<CourseSection> {
        require_catalog_manager(&viewer)?;
        input.validate()?;

        let section = self
            .uow
            .transaction(move |ctx| {
                Box::pin(async move { ctx.sections().update(id, &input).await })
            })
            .await?;

        self.queries
            .cache()
            .invalidate(
                Invalidation::new()
                    .section(section.id, section.course_id)
                    .into_tags(),
            )
            .await;
        Ok(section)
    }

    async fn delete_section(&self, viewer: Viewer, id: Uuid) -> AppResult<()> {
        require_catalog_manager(&viewer)?;

        let footprint = self
            .uow
            .transaction(move |ctx| {
                Box::pin(async move {
                    let course_id = ctx.sections().course_id_of(id).await?;
                    let footprint = CascadeFootprint::for_section(&ctx, course_id, id).await?;
                    ctx.sections().delete(id).await?;
                    Ok(footprint)
                })
            })
            .await?;

        self.queries
            .cache()
            .invalidate(footprint.invalidation().into_tags())
            .await;
        Ok(())
    }

    async fn reorder_sections(&self, viewer: Viewer, ids: Vec<Uuid>) -> AppResult<()> {
        require_catalog_manager(&viewer)?;
        let Some(first) = ids.first().copied() else {
            return Err(AppError::validation("No sections to reorder"));
        };

        let (course_id, ids) = self
            .uow
            .transaction(move |ctx| {
                Box::pin(async move {
                    let course_id = ctx.sections().course_id_of(first).await?;
                    ctx.sections().reorder(&ids).await?;
                    Ok((course_id, ids))
                })
            })
            .await?;

        let invalidation = ids
            .iter()
            .fold(Invalidation::new(), |inv, id| inv.section(*id, course_id));
        self.queries.cache().invalidate(invalidation.into_tags()).await;
        Ok(())
    }

    async fn get_course_layout(&self, viewer: Viewer, id: Uuid) -> AppResult<CourseLayout> {
        let scope = self.scope_for(&viewer, id).await?;
        let outline = self.queries.outline(id, scope).await?.ok_or_not_found()?;

        let completed_lesson_ids = match viewer.user_id {
            Some(user_id) => {
                let completed = self.queries.completed_lesson_ids(user_id).await?;
                let in_course: std::collections::HashSet<Uuid> = outline
                    .sections
                    .iter()
                    .flat_map(|s| s.lessons.iter().map(|l| l.id))
                    .collect();
                completed
                    .into_iter()
                    .filter(|id| in_course.contains(id))
                    .collect()
            }
            None => Vec::new(),
        };

        Ok(CourseLayout {
            outline,
            completed_lesson_ids,
        })
    }

    async fn list_user_courses(&self, viewer: Viewer) -> AppResult<Vec<UserCourseProgress>> {
        let user_id = viewer.require_user()?;
        let course_ids = self.queries.accessible_course_ids(user_id).await?;

        let progress = parallel::join_all(
            course_ids
                .into_iter()
                .map(|course_id| self.queries.progress(course_id, user_id))
                .collect(),
        )
        .await?;

        let mut courses: Vec<UserCourseProgress> = progress.into_iter().flatten().collect();
        courses.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(courses)
    }
}
