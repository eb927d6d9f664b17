//! Purchase receipts.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use sea_orm::sea_query::OnConflict;
use sea_orm::{
    ColumnTrait, DatabaseConnection, DatabaseTransaction, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, Set,
};
use uuid::Uuid;

use super::entities::{purchase, user};
use common::AppResult;
use domain::{NewPurchase, Purchase, SaleRow};

#[cfg(any(test, feature = "test-utils"))]
use mockall::automock;

#[cfg_attr(any(test, feature = "test-utils"), automock)]
#[async_trait]
pub trait PurchaseRepository: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Purchase>>;

    /// A user's purchases, newest first.
    async fn list_for_user(&self, user_id: Uuid) -> AppResult<Vec<Purchase>>;

    /// True when the user holds a non-refunded purchase of the product.
    async fn user_owns_product(&self, user_id: Uuid, product_id: Uuid) -> AppResult<bool>;

    /// Every purchase, newest first, with the buyer's current name.
    async fn list_sales(&self) -> AppResult<Vec<SaleRow>>;
}

pub struct PurchaseStore {
    db: DatabaseConnection,
}

impl PurchaseStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl PurchaseRepository for PurchaseStore {
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Purchase>> {
        let result = purchase::Entity::find_by_id(id).one(&self.db).await?;
        Ok(result.map(Purchase::from))
    }

    async fn list_for_user(&self, user_id: Uuid) -> AppResult<Vec<Purchase>> {
        let models = purchase::Entity::find()
            .filter(purchase::Column::UserId.eq(user_id))
            .order_by_desc(purchase::Column::CreatedAt)
            .all(&self.db)
            .await?;
        Ok(models.into_iter().map(Purchase::from).collect())
    }

    async fn user_owns_product(&self, user_id: Uuid, product_id: Uuid) -> AppResult<bool> {
        let count = purchase::Entity::find()
            .filter(purchase::Column::UserId.eq(user_id))
            .filter(purchase::Column::ProductId.eq(product_id))
            .filter(purchase::Column::RefundedAt.is_null())
            .count(&self.db)
            .await?;
        Ok(count > 0)
    }

    async fn list_sales(&self) -> AppResult<Vec<SaleRow>> {
        let purchases = purchase::Entity::find()
            .order_by_desc(purchase::Column::CreatedAt)
            .all(&self.db)
            .await?;

        let mut user_ids: Vec<Uuid> = purchases.iter().map(|p| p.user_id).collect();
        user_ids.sort_unstable();
        user_ids.dedup();

        let names: HashMap<Uuid, String> = if user_ids.is_empty() {
            HashMap::new()
        } else {
            user::Entity::find()
                .filter(user::Column::Id.is_in(user_ids))
                .all(&self.db)
                .await?
                .into_iter()
                .map(|u| (u.id, u.name))
                .collect()
        };

        Ok(purchases
            .into_iter()
            .map(|model| {
                let customer_name = names.get(&model.user_id).cloned().unwrap_or_default();
                SaleRow {
                    purchase: Purchase::from(model),
                    customer_name,
                }
            })
            .collect())
    }
}

/// Purchase writes bound to an open transaction.
pub struct TxPurchaseRepository<'a> {
    txn: &'a DatabaseTransaction,
}

impl<'a> TxPurchaseRepository<'a> {
    pub(crate) fn new(txn: &'a DatabaseTransaction) -> Self {
        Self { txn }
    }

    /// Inserts a receipt unless one already exists for the payment session.
    ///
    /// Returns the new purchase id, or `None` when the session was already
    /// recorded.
    pub async fn insert_if_absent(&self, purchase: &NewPurchase) -> AppResult<Option<Uuid>> {
        let id = Uuid::new_v4();
        let now = Utc::now();
        let model = purchase::ActiveModel {
            id: Set(id),
            user_id: Set(purchase.user_id),
            product_id: Set(purchase.product_id),
            stripe_session_id: Set(purchase.stripe_session_id.clone()),
            price_paid_in_cents: Set(purchase.price_paid_in_cents),
            product_name: Set(purchase.product_details.name.clone()),
            product_description: Set(purchase.product_details.description.clone()),
            product_image_url: Set(purchase.product_details.image_url.clone()),
            created_at: Set(now),
            updated_at: Set(now),
            refunded_at: Set(None),
        };

        let inserted = purchase::Entity::insert(model)
            .on_conflict(
                OnConflict::column(purchase::Column::StripeSessionId)
                    .do_nothing()
                    .to_owned(),
            )
            .exec_without_returning(self.txn)
            .await?;

        Ok((inserted > 0).then_some(id))
    }
}
