//! Cached reads shared by the services.
//!
//! Each read is registered under tags computed from its arguments alone, so
//! the tag set is known before the store is queried. Results that depend on
//! several entities are assembled from smaller cached pieces rather than
//! cached whole under tags derived from their own contents.

use std::sync::Arc;

use uuid::Uuid;

use crate::infra::{DataCache, UnitOfWork};
use common::AppResult;
use domain::tags::{
    course_tag, course_user_key, global_tag, id_tag, lesson_user_key, user_tag, CacheEntity,
};
use domain::{
    ContentScope, Course, CourseOutline, CourseSection, CourseSummary, CourseTableRow, Direction,
    Lesson, LessonPosition, Product, ProductTableRow, ProductWithCourses, Purchase, SaleRow,
    TagSet, User, UserCourseProgress,
};

/// Read-through access to the store.
pub struct CachedQueries<U: UnitOfWork> {
    uow: Arc<U>,
    cache: DataCache,
}

impl<U: UnitOfWork> Clone for CachedQueries<U> {
    fn clone(&self) -> Self {
        Self {
            uow: self.uow.clone(),
            cache: self.cache.clone(),
        }
    }
}

fn course_graph_tags(course_id: Uuid) -> TagSet {
    TagSet::new()
        .with(id_tag(CacheEntity::Courses, course_id))
        .with(course_tag(CacheEntity::CourseSections, course_id))
        .with(course_tag(CacheEntity::Lessons, course_id))
}

impl<U: UnitOfWork + 'static> CachedQueries<U> {
    pub fn new(uow: Arc<U>, cache: DataCache) -> Self {
        Self { uow, cache }
    }

    pub fn cache(&self) -> &DataCache {
        &self.cache
    }

    // ---- courses ---------------------------------------------------------

    pub async fn course(&self, id: Uuid) -> AppResult<Option<Course>> {
        let uow = self.uow.clone();
        self.cache
            .cached(
                &format!("course:{id}"),
                TagSet::new().with(id_tag(CacheEntity::Courses, id)),
                move || async move { uow.courses().find_by_id(id).await },
            )
            .await
    }

    pub async fn course_table(&self) -> AppResult<Vec<CourseTableRow>> {
        let uow = self.uow.clone();
        let tags = TagSet::new()
            .with(global_tag(CacheEntity::Courses))
            .with(global_tag(CacheEntity::UserCourseAccess))
            .with(global_tag(CacheEntity::CourseSections))
            .with(global_tag(CacheEntity::Lessons));
        self.cache
            .cached("courses:table", tags, move || async move {
                uow.courses().list_table().await
            })
            .await
    }

    pub async fn course_summaries(&self) -> AppResult<Vec<CourseSummary>> {
        let uow = self.uow.clone();
        self.cache
            .cached(
                "courses:summaries",
                TagSet::new().with(global_tag(CacheEntity::Courses)),
                move || async move { uow.courses().list_summaries().await },
            )
            .await
    }

    pub async fn outline(&self, id: Uuid, scope: ContentScope) -> AppResult<Option<CourseOutline>> {
        let uow = self.uow.clone();
        self.cache
            .cached(
                &format!("course:{id}:outline:{}", scope.as_str()),
                course_graph_tags(id),
                move || async move { uow.courses().outline(id, scope).await },
            )
            .await
    }

    pub async fn progress(
        &self,
        course_id: Uuid,
        user_id: Uuid,
    ) -> AppResult<Option<UserCourseProgress>> {
        let uow = self.uow.clone();
        let tags = course_graph_tags(course_id)
            .with(user_tag(CacheEntity::UserLessonComplete, user_id));
        self.cache
            .cached(
                &format!("user:{user_id}:progress:{course_id}"),
                tags,
                move || async move { uow.courses().progress(course_id, user_id).await },
            )
            .await
    }

    // ---- sections and lessons ---------------------------------------------

    pub async fn section(&self, id: Uuid) -> AppResult<Option<CourseSection>> {
        let uow = self.uow.clone();
        self.cache
            .cached(
                &format!("section:{id}"),
                TagSet::new().with(id_tag(CacheEntity::CourseSections, id)),
                move || async move { uow.sections().find_by_id(id).await },
            )
            .await
    }

    pub async fn lesson(&self, id: Uuid) -> AppResult<Option<Lesson>> {
        let uow = self.uow.clone();
        self.cache
            .cached(
                &format!("lesson:{id}"),
                TagSet::new().with(id_tag(CacheEntity::Lessons, id)),
                move || async move { uow.lessons().find_by_id(id).await },
            )
            .await
    }

    /// Adjacent visible lesson. Any lesson or section change in the course can
    /// move it, so it is tagged with both course scopes.
    pub async fn neighbor(
        &self,
        position: LessonPosition,
        direction: Direction,
        scope: ContentScope,
    ) -> AppResult<Option<Uuid>> {
        let uow = self.uow.clone();
        let tags = TagSet::new()
            .with(course_tag(CacheEntity::Lessons, position.course_id))
            .with(course_tag(CacheEntity::CourseSections, position.course_id));
        self.cache
            .cached(
                &format!(
                    "lesson:{}:{}:{}",
                    position.lesson_id,
                    direction.as_str(),
                    scope.as_str()
                ),
                tags,
                move || async move { uow.lessons().neighbor(position, direction, scope).await },
            )
            .await
    }

    // ---- access and completion ----------------------------------------------

    pub async fn has_access(&self, user_id: Uuid, course_id: Uuid) -> AppResult<bool> {
        let uow = self.uow.clone();
        let key = course_user_key(course_id, user_id);
        self.cache
            .cached(
                &format!("access:{key}"),
                TagSet::new().with(id_tag(CacheEntity::UserCourseAccess, &key)),
                move || async move { uow.access().has_access(user_id, course_id).await },
            )
            .await
    }

    pub async fn accessible_course_ids(&self, user_id: Uuid) -> AppResult<Vec<Uuid>> {
        let uow = self.uow.clone();
        self.cache
            .cached(
                &format!("user:{user_id}:access"),
                TagSet::new().with(user_tag(CacheEntity::UserCourseAccess, user_id)),
                move || async move { uow.access().course_ids_for_user(user_id).await },
            )
            .await
    }

    pub async fn completed_lesson_ids(&self, user_id: Uuid) -> AppResult<Vec<Uuid>> {
        let uow = self.uow.clone();
        self.cache
            .cached(
                &format!("user:{user_id}:completed"),
                TagSet::new().with(user_tag(CacheEntity::UserLessonComplete, user_id)),
                move || async move { uow.completions().completed_lesson_ids(user_id).await },
            )
            .await
    }

    pub async fn is_complete(&self, user_id: Uuid, lesson_id: Uuid) -> AppResult<bool> {
        let uow = self.uow.clone();
        let key = lesson_user_key(lesson_id, user_id);
        self.cache
            .cached(
                &format!("completion:{key}"),
                TagSet::new().with(id_tag(CacheEntity::UserLessonComplete, &key)),
                move || async move { uow.completions().is_complete(user_id, lesson_id).await },
            )
            .await
    }

    // ---- products -------------------------------------------------------------

    pub async fn product(&self, id: Uuid) -> AppResult<Option<ProductWithCourses>> {
        let uow = self.uow.clone();
        self.cache
            .cached(
                &format!("product:{id}"),
                TagSet::new().with(id_tag(CacheEntity::Products, id)),
                move || async move { uow.products().find_with_courses(id).await },
            )
            .await
    }

    pub async fn product_table(&self) -> AppResult<Vec<ProductTableRow>> {
        let uow = self.uow.clone();
        let tags = TagSet::new()
            .with(global_tag(CacheEntity::Products))
            .with(global_tag(CacheEntity::Purchases));
        self.cache
            .cached("products:table", tags, move || async move {
                uow.products().list_table().await
            })
            .await
    }

    pub async fn public_products(&self) -> AppResult<Vec<Product>> {
        let uow = self.uow.clone();
        self.cache
            .cached(
                "products:public",
                TagSet::new().with(global_tag(CacheEntity::Products)),
                move || async move { uow.products().list_public().await },
            )
            .await
    }

    // ---- purchases and users -----------------------------------------------------

    pub async fn owns_product(&self, user_id: Uuid, product_id: Uuid) -> AppResult<bool> {
        let uow = self.uow.clone();
        self.cache
            .cached(
                &format!("user:{user_id}:owns:{product_id}"),
                TagSet::new().with(user_tag(CacheEntity::Purchases, user_id)),
                move || async move { uow.purchases().user_owns_product(user_id, product_id).await },
            )
            .await
    }

    pub async fn user_purchases(&self, user_id: Uuid) -> AppResult<Vec<Purchase>> {
        let uow = self.uow.clone();
        self.cache
            .cached(
                &format!("user:{user_id}:purchases"),
                TagSet::new().with(user_tag(CacheEntity::Purchases, user_id)),
                move || async move { uow.purchases().list_for_user(user_id).await },
            )
            .await
    }

    pub async fn purchase(&self, id: Uuid) -> AppResult<Option<Purchase>> {
        let uow = self.uow.clone();
        self.cache
            .cached(
                &format!("purchase:{id}"),
                TagSet::new().with(id_tag(CacheEntity::Purchases, id)),
                move || async move { uow.purchases().find_by_id(id).await },
            )
            .await
    }

    pub async fn sales(&self) -> AppResult<Vec<SaleRow>> {
        let uow = self.uow.clone();
        let tags = TagSet::new()
            .with(global_tag(CacheEntity::Purchases))
            .with(global_tag(CacheEntity::Users));
        self.cache
            .cached("sales", tags, move || async move {
                uow.purchases().list_sales().await
            })
            .await
    }

    pub async fn user(&self, id: Uuid) -> AppResult<Option<User>> {
        let uow = self.uow.clone();
        self.cache
            .cached(
                &format!("user:{id}"),
                TagSet::new().with(id_tag(CacheEntity::Users, id)),
                move || async move { uow.users().find_by_id(id).await },
            )
            .await
    }
}
