//! Purchase receipts. Product details are stored as frozen columns.

use sea_orm::entity::prelude::*;

use domain::{ProductSnapshot, Purchase};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "purchases")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub user_id: Uuid,
    pub product_id: Uuid,
    #[sea_orm(unique)]
    pub stripe_session_id: String,
    pub price_paid_in_cents: i32,
    pub product_name: String,
    #[sea_orm(column_type = "Text")]
    pub product_description: String,
    pub product_image_url: String,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
    pub refunded_at: Option<DateTimeUtc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UserId",
        to = "super::user::Column::Id",
        on_delete = "Restrict"
    )]
    User,
    #[sea_orm(
        belongs_to = "super::product::Entity",
        from = "Column::ProductId",
        to = "super::product::Column::Id",
        on_delete = "Restrict"
    )]
    Product,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl Related<super::product::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Product.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<Model> for Purchase {
    fn from(model: Model) -> Self {
        Purchase {
            id: model.id,
            user_id: model.user_id,
            product_id: model.product_id,
            stripe_session_id: model.stripe_session_id,
            price_paid_in_cents: model.price_paid_in_cents,
            product_details: ProductSnapshot {
                name: model.product_name,
                description: model.product_description,
                image_url: model.product_image_url,
            },
            created_at: model.created_at,
            refunded_at: model.refunded_at,
        }
    }
}
