use sea_orm::entity::prelude::*;

use domain::{CourseSection, SectionStatus};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "course_sections")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub course_id: Uuid,
    pub name: String,
    pub status: String,
    pub order: i32,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::course::Entity",
        from = "Column::CourseId",
        to = "super::course::Column::Id",
        on_delete = "Cascade"
    )]
    Course,
    #[sea_orm(has_many = "super::lesson::Entity")]
    Lesson,
}

impl Related<super::course::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Course.def()
    }
}

impl Related<super::lesson::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Lesson.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<Model> for CourseSection {
    fn from(model: Model) -> Self {
        CourseSection {
            id: model.id,
            course_id: model.course_id,
            name: model.name,
            // Unknown stored values are treated as the most restrictive status
            status: SectionStatus::try_from(model.status.as_str())
                .unwrap_or(SectionStatus::Private),
            order: model.order,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}
