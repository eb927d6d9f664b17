//! Tags made stale by each kind of write.
//!
//! Every write touches its entity's global tag and id tag. Rows that hang off a
//! course also touch the course-scoped tag of their type, and relationship rows
//! touch the user-scoped tag of their type.

use uuid::Uuid;

use domain::tags::{
    course_tag, course_user_key, global_tag, id_tag, lesson_user_key, user_tag, CacheEntity,
};
use domain::TagSet;

/// Accumulates the tags one logical write must invalidate.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Invalidation {
    tags: TagSet,
}

impl Invalidation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn course(mut self, id: Uuid) -> Self {
        self.entity(CacheEntity::Courses, id);
        self
    }

    pub fn section(mut self, id: Uuid, course_id: Uuid) -> Self {
        self.entity(CacheEntity::CourseSections, id);
        self.tags
            .insert(course_tag(CacheEntity::CourseSections, course_id));
        self
    }

    pub fn lesson(mut self, id: Uuid, course_id: Uuid) -> Self {
        self.entity(CacheEntity::Lessons, id);
        self.tags.insert(course_tag(CacheEntity::Lessons, course_id));
        self
    }

    pub fn product(mut self, id: Uuid) -> Self {
        self.entity(CacheEntity::Products, id);
        self
    }

    pub fn purchase(mut self, id: Uuid, user_id: Uuid) -> Self {
        self.entity(CacheEntity::Purchases, id);
        self.tags.insert(user_tag(CacheEntity::Purchases, user_id));
        self
    }

    pub fn access(mut self, course_id: Uuid, user_id: Uuid) -> Self {
        self.entity(
            CacheEntity::UserCourseAccess,
            course_user_key(course_id, user_id),
        );
        self.tags
            .insert(user_tag(CacheEntity::UserCourseAccess, user_id));
        self.tags
            .insert(course_tag(CacheEntity::UserCourseAccess, course_id));
        self
    }

    pub fn completion(mut self, lesson_id: Uuid, user_id: Uuid) -> Self {
        self.entity(
            CacheEntity::UserLessonComplete,
            lesson_user_key(lesson_id, user_id),
        );
        self.tags
            .insert(user_tag(CacheEntity::UserLessonComplete, user_id));
        self
    }

    pub fn user(mut self, id: Uuid) -> Self {
        self.entity(CacheEntity::Users, id);
        self
    }

    pub fn merge(mut self, other: Invalidation) -> Self {
        self.tags.merge(other.tags);
        self
    }

    pub fn tags(&self) -> &TagSet {
        &self.tags
    }

    pub fn into_tags(self) -> TagSet {
        self.tags
    }

    fn entity(&mut self, entity: CacheEntity, key: impl std::fmt::Display) {
        self.tags.insert(global_tag(entity));
        self.tags.insert(id_tag(entity, key));
    }
}
