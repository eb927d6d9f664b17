//! Cache tag naming.
//!
//! A tag names a set of cached results that must be dropped together. There are
//! two kinds: one global tag per entity type, and id tags scoped to one instance
//! or to a relationship key such as `course:{course_id}-user:{user_id}`.
//!
//! Entity names are snake_case without dashes, so the text after the last `-` of
//! an id tag is always the entity name. Two tags are equal only when both the
//! entity and the key are equal.

use std::collections::BTreeSet;
use std::fmt::Display;

use uuid::Uuid;

/// Entity types that own cache tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CacheEntity {
    Courses,
    CourseSections,
    Lessons,
    Products,
    Purchases,
    Users,
    UserCourseAccess,
    UserLessonComplete,
}

impl CacheEntity {
    pub const ALL: [CacheEntity; 8] = [
        CacheEntity::Courses,
        CacheEntity::CourseSections,
        CacheEntity::Lessons,
        CacheEntity::Products,
        CacheEntity::Purchases,
        CacheEntity::Users,
        CacheEntity::UserCourseAccess,
        CacheEntity::UserLessonComplete,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            CacheEntity::Courses => "courses",
            CacheEntity::CourseSections => "course_sections",
            CacheEntity::Lessons => "lessons",
            CacheEntity::Products => "products",
            CacheEntity::Purchases => "purchases",
            CacheEntity::Users => "users",
            CacheEntity::UserCourseAccess => "user_course_access",
            CacheEntity::UserLessonComplete => "user_lesson_complete",
        }
    }
}

/// Tag invalidated whenever any instance of `entity` changes.
pub fn global_tag(entity: CacheEntity) -> String {
    format!("global:{}", entity.name())
}

/// Tag for one instance (or one relationship key) of `entity`.
pub fn id_tag(entity: CacheEntity, key: impl Display) -> String {
    format!("id:{}-{}", key, entity.name())
}

/// Rows of `entity` that belong to a user.
pub fn user_tag(entity: CacheEntity, user_id: Uuid) -> String {
    id_tag(entity, format!("user:{user_id}"))
}

/// Rows of `entity` that belong to a course, directly or through a section.
pub fn course_tag(entity: CacheEntity, course_id: Uuid) -> String {
    id_tag(entity, format!("course:{course_id}"))
}

pub fn course_user_key(course_id: Uuid, user_id: Uuid) -> String {
    format!("course:{course_id}-user:{user_id}")
}

pub fn lesson_user_key(lesson_id: Uuid, user_id: Uuid) -> String {
    format!("lesson:{lesson_id}-user:{user_id}")
}

/// Ordered, de-duplicated set of tags.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagSet(BTreeSet<String>);

impl TagSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, tag: String) -> Self {
        self.0.insert(tag);
        self
    }

    pub fn insert(&mut self, tag: String) {
        self.0.insert(tag);
    }

    pub fn merge(&mut self, other: TagSet) {
        self.0.extend(other.0);
    }

    pub fn contains(&self, tag: &str) -> bool {
        self.0.contains(tag)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &String> {
        self.0.iter()
    }
}

impl FromIterator<String> for TagSet {
    fn from_iter<I: IntoIterator<Item = String>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl IntoIterator for TagSet {
    type Item = String;
    type IntoIter = std::collections::btree_set::IntoIter<String>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tags_are_deterministic() {
        let id = Uuid::new_v4();
        assert_eq!(id_tag(CacheEntity::Lessons, id), id_tag(CacheEntity::Lessons, id));
        assert_eq!(global_tag(CacheEntity::Courses), "global:courses");
        assert_eq!(id_tag(CacheEntity::Courses, "abc"), "id:abc-courses");
    }

    #[test]
    fn test_tags_differ_across_entities_with_same_key() {
        let id = Uuid::new_v4();
        let mut seen = std::collections::HashSet::new();
        for entity in CacheEntity::ALL {
            assert!(seen.insert(id_tag(entity, id)));
            assert!(seen.insert(global_tag(entity)));
            assert!(seen.insert(user_tag(entity, id)));
            assert!(seen.insert(course_tag(entity, id)));
        }
    }

    #[test]
    fn test_entity_names_never_contain_separator() {
        for entity in CacheEntity::ALL {
            assert!(!entity.name().contains('-'));
        }
    }

    #[test]
    fn test_compound_keys_do_not_collide() {
        let course = Uuid::new_v4();
        let user = Uuid::new_v4();
        let access = id_tag(CacheEntity::UserCourseAccess, course_user_key(course, user));
        let swapped = id_tag(CacheEntity::UserCourseAccess, course_user_key(user, course));
        assert_ne!(access, swapped);
        assert_eq!(
            access,
            format!("id:course:{course}-user:{user}-user_course_access")
        );
    }

    #[test]
    fn test_tag_set_deduplicates() {
        let mut tags = TagSet::new()
            .with(global_tag(CacheEntity::Lessons))
            .with(global_tag(CacheEntity::Lessons));
        tags.insert(global_tag(CacheEntity::Courses));
        assert_eq!(tags.len(), 2);
    }
}
