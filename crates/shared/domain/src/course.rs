//! Course catalog entities: courses, their sections, and lessons.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::constants::{STATUS_PREVIEW, STATUS_PRIVATE, STATUS_PUBLIC};
use crate::error::{require_text, DomainError, DomainResult};

/// Visibility of a course section.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "lowercase")]
pub enum SectionStatus {
    Public,
    Private,
}

impl SectionStatus {
    pub const ALL: [SectionStatus; 2] = [SectionStatus::Public, SectionStatus::Private];

    pub fn as_str(&self) -> &'static str {
        match self {
            SectionStatus::Public => STATUS_PUBLIC,
            SectionStatus::Private => STATUS_PRIVATE,
        }
    }
}

impl TryFrom<&str> for SectionStatus {
    type Error = DomainError;

    fn try_from(value: &str) -> DomainResult<Self> {
        match value {
            STATUS_PUBLIC => Ok(SectionStatus::Public),
            STATUS_PRIVATE => Ok(SectionStatus::Private),
            other => Err(DomainError::validation(format!(
                "Unknown section status '{other}'"
            ))),
        }
    }
}

/// Visibility of a lesson. `Preview` lessons are free samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "lowercase")]
pub enum LessonStatus {
    Public,
    Preview,
    Private,
}

impl LessonStatus {
    pub const ALL: [LessonStatus; 3] = [
        LessonStatus::Public,
        LessonStatus::Preview,
        LessonStatus::Private,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            LessonStatus::Public => STATUS_PUBLIC,
            LessonStatus::Preview => STATUS_PREVIEW,
            LessonStatus::Private => STATUS_PRIVATE,
        }
    }
}

impl TryFrom<&str> for LessonStatus {
    type Error = DomainError;

    fn try_from(value: &str) -> DomainResult<Self> {
        match value {
            STATUS_PUBLIC => Ok(LessonStatus::Public),
            STATUS_PREVIEW => Ok(LessonStatus::Preview),
            STATUS_PRIVATE => Ok(LessonStatus::Private),
            other => Err(DomainError::validation(format!(
                "Unknown lesson status '{other}'"
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct Course {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct CourseSection {
    pub id: Uuid,
    pub course_id: Uuid,
    pub name: String,
    pub status: SectionStatus,
    pub order: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct Lesson {
    pub id: Uuid,
    pub section_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub status: LessonStatus,
    pub youtube_video_id: String,
    pub order: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// =============================================================================
// Read Models
// =============================================================================

/// Row of the admin course table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct CourseTableRow {
    pub id: Uuid,
    pub name: String,
    pub sections_count: u64,
    pub lessons_count: u64,
    pub students_count: u64,
}

/// Minimal course reference used by product forms.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct CourseSummary {
    pub id: Uuid,
    pub name: String,
}

/// A section with its lessons, both ordered.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct SectionOutline {
    #[serde(flatten)]
    pub section: CourseSection,
    pub lessons: Vec<Lesson>,
}

/// A course with its ordered sections and lessons.
///
/// Used for editing (everything) and for layouts (filtered to what the viewer may see).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct CourseOutline {
    #[serde(flatten)]
    pub course: Course,
    pub sections: Vec<SectionOutline>,
}

impl CourseOutline {
    pub fn lesson_count(&self) -> usize {
        self.sections.iter().map(|s| s.lessons.len()).sum()
    }
}

/// Course layout as rendered for one viewer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct CourseLayout {
    pub outline: CourseOutline,
    pub completed_lesson_ids: Vec<Uuid>,
}

/// Progress summary for a course the viewer holds access to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct UserCourseProgress {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub sections_count: u64,
    pub lessons_count: u64,
    pub lessons_complete: u64,
}

/// Resolved location of a lesson in its course.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LessonPosition {
    pub lesson_id: Uuid,
    pub section_id: Uuid,
    pub course_id: Uuid,
    pub order: i32,
    pub section_order: i32,
}

// =============================================================================
// Write Inputs
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CourseInput {
    pub name: String,
    pub description: String,
}

impl CourseInput {
    pub fn validate(&self) -> DomainResult<()> {
        require_name(&self.name)?;
        require_text(&self.description, "Description is required")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SectionInput {
    pub name: String,
    pub status: SectionStatus,
}

impl SectionInput {
    pub fn validate(&self) -> DomainResult<()> {
        require_name(&self.name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LessonInput {
    pub section_id: Uuid,
    pub name: String,
    pub status: LessonStatus,
    pub youtube_video_id: String,
    pub description: Option<String>,
}

impl LessonInput {
    pub fn validate(&self) -> DomainResult<()> {
        require_name(&self.name)?;
        require_text(&self.youtube_video_id, "Video reference is required")
    }

    /// Blank descriptions are stored as absent.
    pub fn normalized_description(&self) -> Option<String> {
        self.description
            .as_ref()
            .filter(|d| !d.trim().is_empty())
            .cloned()
    }
}

pub(crate) fn require_name(name: &str) -> DomainResult<()> {
    if name.trim().chars().count() < crate::constants::MIN_NAME_LENGTH {
        return Err(DomainError::validation("Name is required"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_round_trip_through_storage_strings() {
        for status in LessonStatus::ALL {
            assert_eq!(LessonStatus::try_from(status.as_str()).unwrap(), status);
        }
        for status in SectionStatus::ALL {
            assert_eq!(SectionStatus::try_from(status.as_str()).unwrap(), status);
        }
        assert!(LessonStatus::try_from("draft").is_err());
    }

    #[test]
    fn test_lesson_input_blank_description_is_absent() {
        let input = LessonInput {
            section_id: Uuid::new_v4(),
            name: "Intro".into(),
            status: LessonStatus::Public,
            youtube_video_id: "abc123".into(),
            description: Some("   ".into()),
        };
        assert_eq!(input.normalized_description(), None);
        assert!(input.validate().is_ok());
    }

    #[test]
    fn test_lesson_input_requires_name_and_video() {
        let input = LessonInput {
            section_id: Uuid::new_v4(),
            name: " ".into(),
            status: LessonStatus::Public,
            youtube_video_id: "abc".into(),
            description: None,
        };
        assert!(input.validate().is_err());

        let input = LessonInput {
            name: "Intro".into(),
            youtube_video_id: String::new(),
            ..input
        };
        assert!(input.validate().is_err());
    }
}
