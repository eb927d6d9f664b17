use sea_orm::entity::prelude::*;

use domain::{Lesson, LessonStatus};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "lessons")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub section_id: Uuid,
    pub name: String,
    #[sea_orm(column_type = "Text", nullable)]
    pub description: Option<String>,
    pub status: String,
    pub youtube_video_id: String,
    pub order: i32,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::course_section::Entity",
        from = "Column::SectionId",
        to = "super::course_section::Column::Id",
        on_delete = "Cascade"
    )]
    CourseSection,
    #[sea_orm(has_many = "super::user_lesson_complete::Entity")]
    UserLessonComplete,
}

impl Related<super::course_section::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::CourseSection.def()
    }
}

impl Related<super::user_lesson_complete::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::UserLessonComplete.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<Model> for Lesson {
    fn from(model: Model) -> Self {
        Lesson {
            id: model.id,
            section_id: model.section_id,
            name: model.name,
            description: model.description,
            status: LessonStatus::try_from(model.status.as_str()).unwrap_or(LessonStatus::Private),
            youtube_video_id: model.youtube_video_id,
            order: model.order,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}
