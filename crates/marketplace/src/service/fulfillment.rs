//! Purchase fulfillment - turns a completed payment into access grants and a receipt.
//!
//! Both delivery channels (checkout redirect and processor notification) end
//! up here, possibly several times for one session and in either order. The
//! store's uniqueness constraints make every repeat a no-op:
//!
//! ```text
//! received -> validated -> fulfilling -> fulfilled
//!     \-> rejected
//! ```

use std::sync::Arc;

use async_trait::async_trait;
use uuid::Uuid;

#[cfg(any(test, feature = "test-utils"))]
use mockall::automock;

use crate::infra::{DataCache, Invalidation, UnitOfWork};
use crate::payments::PaymentCompleted;
use common::{AppError, AppResult};
use domain::{NewPurchase, ProductSnapshot};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FulfillmentStage {
    Received,
    Validated,
    Fulfilling,
    Fulfilled,
    Rejected,
}

impl FulfillmentStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            FulfillmentStage::Received => "received",
            FulfillmentStage::Validated => "validated",
            FulfillmentStage::Fulfilling => "fulfilling",
            FulfillmentStage::Fulfilled => "fulfilled",
            FulfillmentStage::Rejected => "rejected",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FulfillmentOutcome {
    /// This delivery created the receipt
    Fulfilled { purchase_id: Uuid, product_id: Uuid },
    /// An earlier delivery already did
    AlreadyFulfilled { product_id: Uuid },
}

impl FulfillmentOutcome {
    pub fn product_id(&self) -> Uuid {
        match self {
            FulfillmentOutcome::Fulfilled { product_id, .. }
            | FulfillmentOutcome::AlreadyFulfilled { product_id } => *product_id,
        }
    }
}

#[cfg_attr(any(test, feature = "test-utils"), automock)]
#[async_trait]
pub trait FulfillmentService: Send + Sync {
    async fn fulfill(&self, event: PaymentCompleted) -> AppResult<FulfillmentOutcome>;
}

pub struct Fulfillment<U: UnitOfWork> {
    uow: Arc<U>,
    cache: DataCache,
}

fn log_stage(event: &PaymentCompleted, stage: FulfillmentStage) {
    tracing::info!(
        session_id = %event.session_id,
        user_id = event.user_id.as_deref().unwrap_or("-"),
        product_id = event.product_id.as_deref().unwrap_or("-"),
        stage = stage.as_str(),
        "Fulfillment stage"
    );
}

fn reject(event: &PaymentCompleted, reason: &str, error: AppError) -> AppError {
    tracing::warn!(
        session_id = %event.session_id,
        user_id = event.user_id.as_deref().unwrap_or("-"),
        product_id = event.product_id.as_deref().unwrap_or("-"),
        stage = FulfillmentStage::Rejected.as_str(),
        reason,
        "Payment event rejected"
    );
    error
}

fn parse_id(value: Option<&str>) -> Option<Uuid> {
    value.and_then(|v| Uuid::parse_str(v).ok())
}

impl<U: UnitOfWork + 'static> Fulfillment<U> {
    pub fn new(uow: Arc<U>, cache: DataCache) -> Self {
        Self { uow, cache }
    }
}

#[async_trait]
impl<U: UnitOfWork + 'static> FulfillmentService for Fulfillment<U> {
    async fn fulfill(&self, event: PaymentCompleted) -> AppResult<FulfillmentOutcome> {
        log_stage(&event, FulfillmentStage::Received);

        let (Some(user_id), Some(product_id)) = (
            parse_id(event.user_id.as_deref()),
            parse_id(event.product_id.as_deref()),
        ) else {
            return Err(reject(
                &event,
                "missing metadata",
                AppError::validation("Payment is missing user or product metadata"),
            ));
        };

        // Product, price and grants are read and written in one transaction so
        // the receipt snapshot matches the courses granted.
        let tx_event = event.clone();
        let inserted = self
            .uow
            .transaction(move |ctx| {
                Box::pin(async move {
                    let event = tx_event;
                    let product = ctx.products().find_with_courses(product_id).await?;
                    let Some(product) = product else {
                        return Err(reject(&event, "unknown product", AppError::NotFound));
                    };
                    if ctx.users().find_by_id(user_id).await?.is_none() {
                        return Err(reject(&event, "unknown user", AppError::NotFound));
                    }

                    let price_paid_in_cents = i32::try_from(
                        event
                            .amount_total
                            .unwrap_or_else(|| product.product.price_in_cents()),
                    )
                    .map_err(|_| {
                        reject(
                            &event,
                            "amount out of range",
                            AppError::validation("Amount out of range"),
                        )
                    })?;
                    log_stage(&event, FulfillmentStage::Validated);

                    let purchase = NewPurchase {
                        user_id,
                        product_id,
                        stripe_session_id: event.session_id.clone(),
                        price_paid_in_cents,
                        product_details: ProductSnapshot::from(&product.product),
                    };

                    log_stage(&event, FulfillmentStage::Fulfilling);
                    for course_id in &product.course_ids {
                        ctx.access().grant(user_id, *course_id).await?;
                    }
                    let purchase_id = ctx.purchases().insert_if_absent(&purchase).await?;
                    Ok(purchase_id.map(|id| (id, product.course_ids)))
                })
            })
            .await?;

        let Some((purchase_id, course_ids)) = inserted else {
            tracing::info!(session_id = %event.session_id, "Payment already fulfilled");
            return Ok(FulfillmentOutcome::AlreadyFulfilled { product_id });
        };

        let invalidation = course_ids
            .iter()
            .fold(Invalidation::new().purchase(purchase_id, user_id), |inv, course_id| {
                inv.access(*course_id, user_id)
            });
        self.cache.invalidate(invalidation.into_tags()).await;

        log_stage(&event, FulfillmentStage::Fulfilled);
        Ok(FulfillmentOutcome::Fulfilled {
            purchase_id,
            product_id,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::test_support::TestUnitOfWork;

    #[test]
    fn test_outcome_exposes_product_id() {
        let product_id = Uuid::new_v4();
        let fulfilled = FulfillmentOutcome::Fulfilled {
            purchase_id: Uuid::new_v4(),
            product_id,
        };
        assert_eq!(fulfilled.product_id(), product_id);
        assert_eq!(
            FulfillmentOutcome::AlreadyFulfilled { product_id }.product_id(),
            product_id
        );
    }

    #[tokio::test]
    async fn test_catalog_reads_happen_inside_the_transaction() {
        // The plain repositories carry no expectations and panic if touched;
        // the only way to the product is through the transaction.
        let (uow, _) = TestUnitOfWork::default().shared();
        let fulfillment = Fulfillment::new(uow, DataCache::in_memory());
        let event = PaymentCompleted {
            session_id: "cs_tx".into(),
            user_id: Some(Uuid::new_v4().to_string()),
            product_id: Some(Uuid::new_v4().to_string()),
            amount_total: Some(1000),
        };

        let result = fulfillment.fulfill(event).await;
        assert!(matches!(
            result,
            Err(AppError::Internal(msg)) if msg == "No transactions in unit tests"
        ));
    }

    #[tokio::test]
    async fn test_missing_metadata_is_rejected_before_the_store() {
        let (uow, _) = TestUnitOfWork::default().shared();
        let fulfillment = Fulfillment::new(uow, DataCache::in_memory());
        let event = PaymentCompleted {
            session_id: "cs_bare".into(),
            user_id: None,
            product_id: Some(Uuid::new_v4().to_string()),
            amount_total: None,
        };

        assert!(matches!(
            fulfillment.fulfill(event).await,
            Err(AppError::Validation(_))
        ));
    }

    #[test]
    fn test_malformed_ids_are_treated_as_missing() {
        assert_eq!(parse_id(Some("not-a-uuid")), None);
        assert_eq!(parse_id(None), None);
        let id = Uuid::new_v4();
        assert_eq!(parse_id(Some(&id.to_string())), Some(id));
    }
}
