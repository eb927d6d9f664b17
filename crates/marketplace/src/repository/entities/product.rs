use sea_orm::entity::prelude::*;

use domain::{Product, ProductStatus};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "products")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub name: String,
    #[sea_orm(column_type = "Text")]
    pub description: String,
    pub image_url: String,
    pub price_in_dollars: i32,
    pub status: String,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::course_product::Entity")]
    CourseProduct,
    #[sea_orm(has_many = "super::purchase::Entity")]
    Purchase,
}

impl Related<super::course_product::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::CourseProduct.def()
    }
}

impl Related<super::purchase::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Purchase.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<Model> for Product {
    fn from(model: Model) -> Self {
        Product {
            id: model.id,
            name: model.name,
            description: model.description,
            image_url: model.image_url,
            price_in_dollars: model.price_in_dollars,
            status: ProductStatus::try_from(model.status.as_str())
                .unwrap_or(ProductStatus::Private),
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}
