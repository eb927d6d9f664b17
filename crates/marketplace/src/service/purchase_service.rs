//! Purchase service - ownership checks, receipts and sales.

use std::sync::Arc;

use async_trait::async_trait;
use uuid::Uuid;

#[cfg(any(test, feature = "test-utils"))]
use mockall::automock;

use super::queries::CachedQueries;
use super::require_catalog_manager;
use crate::infra::UnitOfWork;
use crate::payments::PaymentGateway;
use common::{AppError, AppResult, OptionExt};
use domain::permissions::can_view_purchase;
use domain::{Purchase, PurchaseReceipt, SaleRow, Viewer};

#[cfg_attr(any(test, feature = "test-utils"), automock)]
#[async_trait]
pub trait PurchaseService: Send + Sync {
    /// Whether the viewer holds a non-refunded purchase of the product
    async fn user_owns_product(&self, viewer: Viewer, product_id: Uuid) -> AppResult<bool>;

    /// The viewer's purchases, newest first
    async fn list_user_purchases(&self, viewer: Viewer) -> AppResult<Vec<Purchase>>;

    /// One of the viewer's purchases with processor details when available
    async fn get_user_purchase(&self, viewer: Viewer, id: Uuid) -> AppResult<PurchaseReceipt>;

    /// Every purchase with its customer's name
    async fn list_sales(&self, viewer: Viewer) -> AppResult<Vec<SaleRow>>;
}

pub struct PurchaseManager<U: UnitOfWork> {
    queries: CachedQueries<U>,
    gateway: Arc<dyn PaymentGateway>,
}

impl<U: UnitOfWork + 'static> PurchaseManager<U> {
    pub fn new(queries: CachedQueries<U>, gateway: Arc<dyn PaymentGateway>) -> Self {
        Self { queries, gateway }
    }
}

#[async_trait]
impl<U: UnitOfWork + 'static> PurchaseService for PurchaseManager<U> {
    async fn user_owns_product(&self, viewer: Viewer, product_id: Uuid) -> AppResult<bool> {
        match viewer.user_id {
            Some(user_id) => self.queries.owns_product(user_id, product_id).await,
            None => Ok(false),
        }
    }

    async fn list_user_purchases(&self, viewer: Viewer) -> AppResult<Vec<Purchase>> {
        let user_id = viewer.require_user()?;
        self.queries.user_purchases(user_id).await
    }

    async fn get_user_purchase(&self, viewer: Viewer, id: Uuid) -> AppResult<PurchaseReceipt> {
        viewer.require_user()?;
        let purchase = self.queries.purchase(id).await?.ok_or_not_found()?;
        if !can_view_purchase(&viewer, &purchase) {
            return Err(AppError::PermissionDenied);
        }

        let details = match self
            .gateway
            .payment_details(
                &purchase.stripe_session_id,
                purchase.price_paid_in_cents,
                purchase.is_refunded(),
            )
            .await
        {
            Ok(details) => Some(details),
            Err(e) => {
                tracing::warn!(purchase_id = %id, error = %e, "Payment details unavailable");
                None
            }
        };

        Ok(PurchaseReceipt { purchase, details })
    }

    async fn list_sales(&self, viewer: Viewer) -> AppResult<Vec<SaleRow>> {
        require_catalog_manager(&viewer)?;
        self.queries.sales().await
    }
}
