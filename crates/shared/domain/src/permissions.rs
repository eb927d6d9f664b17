//! Access predicates and capability resolution.
//!
//! Everything here is pure: callers load the facts (viewer, access grant, record
//! statuses) and these functions decide.

use serde::{Deserialize, Serialize};

use crate::course::{LessonStatus, SectionStatus};
use crate::product::ProductStatus;
use crate::purchase::Purchase;
use crate::viewer::Viewer;

/// How much of a course's content a viewer may see.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentScope {
    /// Public sections; public and preview lessons.
    Public,
    /// Everything, private included.
    Full,
}

impl ContentScope {
    /// Admins and holders of the course's access grant see everything.
    pub fn resolve(viewer: &Viewer, has_course_access: bool) -> Self {
        if viewer.is_admin() || has_course_access {
            ContentScope::Full
        } else {
            ContentScope::Public
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ContentScope::Public => "public",
            ContentScope::Full => "full",
        }
    }

    pub fn section_statuses(&self) -> &'static [SectionStatus] {
        match self {
            ContentScope::Public => &[SectionStatus::Public],
            ContentScope::Full => &SectionStatus::ALL,
        }
    }

    pub fn lesson_statuses(&self) -> &'static [LessonStatus] {
        match self {
            ContentScope::Public => &[LessonStatus::Public, LessonStatus::Preview],
            ContentScope::Full => &LessonStatus::ALL,
        }
    }

    pub fn allows_section(&self, status: SectionStatus) -> bool {
        self.section_statuses().contains(&status)
    }

    /// A lesson is only as visible as the section that holds it.
    pub fn allows_lesson(&self, section: SectionStatus, lesson: LessonStatus) -> bool {
        self.allows_section(section) && self.lesson_statuses().contains(&lesson)
    }
}

/// Course, section, lesson, product and sales administration.
pub fn can_manage_catalog(viewer: &Viewer) -> bool {
    viewer.is_admin()
}

pub fn can_view_product(viewer: &Viewer, status: ProductStatus) -> bool {
    status == ProductStatus::Public || viewer.is_admin()
}

/// Receipts are visible to their owner only.
pub fn can_view_purchase(viewer: &Viewer, purchase: &Purchase) -> bool {
    viewer.user_id == Some(purchase.user_id)
}

/// What a viewer may do with one lesson.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct LessonCapabilities {
    pub can_view: bool,
    pub can_edit: bool,
    pub can_complete: bool,
}

/// Resolve lesson capabilities from the viewer and the lesson's context.
///
/// Seeing a preview lesson does not confer completion tracking; that requires a
/// signed-in viewer holding the course's access grant.
pub fn resolve_lesson_capabilities(
    viewer: &Viewer,
    has_course_access: bool,
    section: SectionStatus,
    lesson: LessonStatus,
) -> LessonCapabilities {
    let can_view = ContentScope::resolve(viewer, has_course_access).allows_lesson(section, lesson);

    LessonCapabilities {
        can_view,
        can_edit: can_manage_catalog(viewer),
        can_complete: can_view && viewer.user_id.is_some() && has_course_access,
    }
}
