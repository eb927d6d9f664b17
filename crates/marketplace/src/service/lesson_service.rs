//! Lesson service - lesson authoring, the lesson page and completion marks.

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
use domain::permissions::resolve_lesson_capabilities;
use domain::{
    ContentScope, CourseSection, Direction, Lesson, LessonCapabilities, LessonInput, LessonPage,
    LessonPosition, Viewer,
};

#[cfg_attr(any(test, feature = "test-utils"), automock)]
#[async_trait]
pub trait LessonService: Send + Sync {
    /// Append a lesson to its section
    async fn create_lesson(&self, viewer: Viewer, input: LessonInput) -> AppResult<Lesson>;

    /// Update a lesson; a new section id moves it to the end of that section
    async fn update_lesson(&self, viewer: Viewer, id: Uuid, input: LessonInput)
        -> AppResult<Lesson>;

    async fn delete_lesson(&self, viewer: Viewer, id: Uuid) -> AppResult<()>;

    /// Rewrite lesson order to match the given id sequence
    async fn reorder_lessons(&self, viewer: Viewer, ids: Vec<Uuid>) -> AppResult<()>;

    /// Lesson with capabilities, completion flag and visible neighbors
    async fn get_lesson_page(&self, viewer: Viewer, id: Uuid) -> AppResult<LessonPage>;

    async fn set_lesson_complete(
        &self,
        viewer: Viewer,
        lesson_id: Uuid,
        complete: bool,
    ) -> AppResult<()>;
}

/// Facts needed to decide what a viewer may do with one lesson.
struct LessonContext {
    lesson: Lesson,
    section: CourseSection,
    has_access: bool,
    capabilities: LessonCapabilities,
}

pub struct LessonManager<U: UnitOfWork> {
    uow: Arc<U>,
    queries: CachedQueries<U>,
}

impl<U: UnitOfWork + 'static> LessonManager<U> {
    pub fn new(uow: Arc<U>, queries: CachedQueries<U>) -> Self {
        Self { uow, queries }
    }

    async fn load_context(&self, viewer: &Viewer, lesson_id: Uuid) -> AppResult<LessonContext> {
        let lesson = self.queries.lesson(lesson_id).await?.ok_or_not_found()?;
        let section = self
            .queries
            .section(lesson.section_id)
            .await?
            .ok_or_not_found()?;
        let has_access = match viewer.user_id {
            Some(user_id) => self.queries.has_access(user_id, section.course_id).await?,
            None => false,
        };
        let capabilities =
            resolve_lesson_capabilities(viewer, has_access, section.status, lesson.status);

        Ok(LessonContext {
            lesson,
            section,
            has_access,
            capabilities,
        })
    }
}

#[async_trait]
impl<U: UnitOfWork + 'static> LessonService for LessonManager<U> {
    async fn create_lesson(&self, viewer: Viewer, input: LessonInput) -> AppResult<Lesson> {
        require_catalog_manager(&viewer)?;
        input.validate()?;

        let (lesson, course_id) = self
            .uow
            .transaction(move |ctx| {
                Box::pin(async move {
                    let course_id = ctx.sections().course_id_of(input.section_id).await?;
                    let lesson = ctx.lessons().create(&input).await?;
                    Ok((lesson, course_id))
                })
            })
            .await?;

        self.queries
            .cache()
            .invalidate(Invalidation::new().lesson(lesson.id, course_id).into_tags())
            .await;
        Ok(lesson)
    }

    async fn update_lesson(
        &self,
        viewer: Viewer,
        id: Uuid,
        input: LessonInput,
    ) -> AppResult<Lesson> {
        require_catalog_manager(&viewer)?;
        input.validate()?;

        let (lesson, old_course_id, new_course_id) = self
            .uow
            .transaction(move |ctx| {
                Box::pin(async move {
                    let existing = ctx.lessons().find_by_id(id).await?.ok_or_not_found()?;
                    let old_course_id = ctx.sections().course_id_of(existing.section_id).await?;
                    let new_course_id = if existing.section_id == input.section_id {
                        old_course_id
                    } else {
                        ctx.sections().course_id_of(input.section_id).await?
                    };
                    let lesson = ctx.lessons().update(id, &input).await?;
                    Ok((lesson, old_course_id, new_course_id))
                })
            })
            .await?;

        let invalidation = Invalidation::new()
            .lesson(id, old_course_id)
            .lesson(id, new_course_id);
        self.queries.cache().invalidate(invalidation.into_tags()).await;
        Ok(lesson)
    }

    async fn delete_lesson(&self, viewer: Viewer, id: Uuid) -> AppResult<()> {
        require_catalog_manager(&viewer)?;

        let footprint = self
            .uow
            .transaction(move |ctx| {
                Box::pin(async move {
                    let existing = ctx.lessons().find_by_id(id).await?.ok_or_not_found()?;
                    let course_id = ctx.sections().course_id_of(existing.section_id).await?;
                    let footprint = CascadeFootprint::for_lesson(&ctx, course_id, id).await?;
                    ctx.lessons().delete(id).await?;
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

    async fn reorder_lessons(&self, viewer: Viewer, ids: Vec<Uuid>) -> AppResult<()> {
        require_catalog_manager(&viewer)?;
        let Some(first) = ids.first().copied() else {
            return Err(AppError::validation("No lessons to reorder"));
        };

        let (course_id, ids) = self
            .uow
            .transaction(move |ctx| {
                Box::pin(async move {
                    let lesson = ctx.lessons().find_by_id(first).await?.ok_or_not_found()?;
                    let course_id = ctx.sections().course_id_of(lesson.section_id).await?;
                    ctx.lessons().reorder(&ids).await?;
                    Ok((course_id, ids))
                })
            })
            .await?;

        let invalidation = ids
            .iter()
            .fold(Invalidation::new(), |inv, id| inv.lesson(*id, course_id));
        self.queries.cache().invalidate(invalidation.into_tags()).await;
        Ok(())
    }

    async fn get_lesson_page(&self, viewer: Viewer, id: Uuid) -> AppResult<LessonPage> {
        let facts = self.load_context(&viewer, id).await?;
        if !facts.capabilities.can_view {
            return Err(AppError::PermissionDenied);
        }

        let scope = ContentScope::resolve(&viewer, facts.has_access);
        let position = LessonPosition {
            lesson_id: facts.lesson.id,
            section_id: facts.section.id,
            course_id: facts.section.course_id,
            order: facts.lesson.order,
            section_order: facts.section.order,
        };

        let (previous_lesson_id, next_lesson_id) = parallel::join2(
            self.queries.neighbor(position, Direction::Previous, scope),
            self.queries.neighbor(position, Direction::Next, scope),
        )
        .await?;

        let is_complete = match viewer.user_id {
            Some(user_id) => self.queries.is_complete(user_id, id).await?,
            None => false,
        };

        Ok(LessonPage {
            lesson: facts.lesson,
            course_id: facts.section.course_id,
            capabilities: facts.capabilities,
            is_complete,
            previous_lesson_id,
            next_lesson_id,
        })
    }

    async fn set_lesson_complete(
        &self,
        viewer: Viewer,
        lesson_id: Uuid,
        complete: bool,
    ) -> AppResult<()> {
        let user_id = viewer.require_user()?;
        let facts = self.load_context(&viewer, lesson_id).await?;
        if !facts.capabilities.can_complete {
            return Err(AppError::PermissionDenied);
        }

        self.uow
            .transaction(move |ctx| {
                Box::pin(async move {
                    if complete {
                        ctx.completions().mark(user_id, lesson_id).await
                    } else {
                        ctx.completions().unmark(user_id, lesson_id).await
                    }
                })
            })
            .await?;

        tracing::debug!(%user_id, %lesson_id, complete, "Lesson completion updated");
        self.queries
            .cache()
            .invalidate(Invalidation::new().completion(lesson_id, user_id).into_tags())
            .await;
        Ok(())
    }
}
