//! Lesson traversal types.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::course::Lesson;
use crate::permissions::LessonCapabilities;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Previous,
    Next,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Previous => "previous",
            Direction::Next => "next",
        }
    }
}

/// A lesson as rendered for one viewer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct LessonPage {
    pub lesson: Lesson,
    pub course_id: Uuid,
    pub capabilities: LessonCapabilities,
    pub is_complete: bool,
    pub previous_lesson_id: Option<Uuid>,
    pub next_lesson_id: Option<Uuid>,
}
