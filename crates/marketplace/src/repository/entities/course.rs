use sea_orm::entity::prelude::*;

use domain::Course;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "courses")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub name: String,
    #[sea_orm(column_type = "Text")]
    pub description: String,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::course_section::Entity")]
    CourseSection,
    #[sea_orm(has_many = "super::course_product::Entity")]
    CourseProduct,
    #[sea_orm(has_many = "super::user_course_access::Entity")]
    UserCourseAccess,
}

impl Related<super::course_section::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::CourseSection.def()
    }
}

impl Related<super::course_product::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::CourseProduct.def()
    }
}

impl Related<super::user_course_access::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::UserCourseAccess.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<Model> for Course {
    fn from(model: Model) -> Self {
        Course {
            id: model.id,
            name: model.name,
            description: model.description,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}
