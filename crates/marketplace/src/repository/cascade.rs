//! Rows removed by cascading deletes.
//!
//! The database removes dependants on its own; these lookups run inside the
//! deleting transaction, before the delete, so every cached result that
//! referenced a removed row can be invalidated afterwards.

use uuid::Uuid;

use crate::infra::{Invalidation, TransactionContext};
use common::AppResult;

/// Ids of the rows a delete takes with it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CascadeFootprint {
    pub course_id: Uuid,
    pub section_ids: Vec<Uuid>,
    pub lesson_ids: Vec<Uuid>,
    /// (course, user) access grants
    pub access: Vec<(Uuid, Uuid)>,
    /// (lesson, user) completion marks
    pub completions: Vec<(Uuid, Uuid)>,
    /// Products that bundled a deleted course
    pub product_ids: Vec<Uuid>,
}

impl CascadeFootprint {
    /// Everything under a course: sections, lessons, grants, marks, product links.
    pub async fn for_course(ctx: &TransactionContext<'_>, course_id: Uuid) -> AppResult<Self> {
        let section_ids = ctx.sections().ids_for_course(course_id).await?;
        let lesson_ids = ctx.lessons().ids_for_sections(&section_ids).await?;
        let completions = ctx.completions().marks_for_lessons(&lesson_ids).await?;
        let access = ctx
            .access()
            .user_ids_for_course(course_id)
            .await?
            .into_iter()
            .map(|user_id| (course_id, user_id))
            .collect();
        let product_ids = ctx.products().ids_for_course(course_id).await?;

        Ok(Self {
            course_id,
            section_ids,
            lesson_ids,
            access,
            completions,
            product_ids,
        })
    }

    pub async fn for_section(
        ctx: &TransactionContext<'_>,
        course_id: Uuid,
        section_id: Uuid,
    ) -> AppResult<Self> {
        let lesson_ids = ctx.lessons().ids_for_sections(&[section_id]).await?;
        let completions = ctx.completions().marks_for_lessons(&lesson_ids).await?;

        Ok(Self {
            course_id,
            section_ids: vec![section_id],
            lesson_ids,
            completions,
            ..Self::default()
        })
    }

    pub async fn for_lesson(
        ctx: &TransactionContext<'_>,
        course_id: Uuid,
        lesson_id: Uuid,
    ) -> AppResult<Self> {
        let completions = ctx.completions().marks_for_lessons(&[lesson_id]).await?;

        Ok(Self {
            course_id,
            lesson_ids: vec![lesson_id],
            completions,
            ..Self::default()
        })
    }

    /// Tags covering every removed row.
    pub fn invalidation(&self) -> Invalidation {
        let mut invalidation = Invalidation::new();
        for id in &self.section_ids {
            invalidation = invalidation.section(*id, self.course_id);
        }
        for id in &self.lesson_ids {
            invalidation = invalidation.lesson(*id, self.course_id);
        }
        for (course_id, user_id) in &self.access {
            invalidation = invalidation.access(*course_id, *user_id);
        }
        for (lesson_id, user_id) in &self.completions {
            invalidation = invalidation.completion(*lesson_id, *user_id);
        }
        for id in &self.product_ids {
            invalidation = invalidation.product(*id);
        }
        invalidation
    }
}
