//! Checkout service - opening payment sessions and completing them on return.

use std::sync::Arc;

use async_trait::async_trait;
use uuid::Uuid;

#[cfg(any(test, feature = "test-utils"))]
use mockall::automock;

use super::fulfillment::{FulfillmentOutcome, FulfillmentService};
use super::queries::CachedQueries;
use crate::infra::UnitOfWork;
use crate::payments::{CheckoutProduct, Payer, PaymentGateway};
use common::{AppError, AppResult, OptionExt};
use domain::Viewer;

#[cfg_attr(any(test, feature = "test-utils"), automock)]
#[async_trait]
pub trait CheckoutService: Send + Sync {
    /// Open an embedded checkout for a product the viewer does not own yet
    async fn create_checkout(&self, viewer: Viewer, product_id: Uuid) -> AppResult<String>;

    /// Fetch a session from the processor and run it through fulfillment
    async fn complete_checkout_session(&self, session_id: String)
        -> AppResult<FulfillmentOutcome>;
}

pub struct CheckoutManager<U: UnitOfWork> {
    queries: CachedQueries<U>,
    gateway: Arc<dyn PaymentGateway>,
    fulfillment: Arc<dyn FulfillmentService>,
}

impl<U: UnitOfWork + 'static> CheckoutManager<U> {
    pub fn new(
        queries: CachedQueries<U>,
        gateway: Arc<dyn PaymentGateway>,
        fulfillment: Arc<dyn FulfillmentService>,
    ) -> Self {
        Self {
            queries,
            gateway,
            fulfillment,
        }
    }
}

#[async_trait]
impl<U: UnitOfWork + 'static> CheckoutService for CheckoutManager<U> {
    async fn create_checkout(&self, viewer: Viewer, product_id: Uuid) -> AppResult<String> {
        let user_id = viewer.require_user()?;

        let product = self.queries.product(product_id).await?.ok_or_not_found()?;
        if !product.product.is_public() {
            return Err(AppError::PermissionDenied);
        }
        if self.queries.owns_product(user_id, product_id).await? {
            return Err(AppError::conflict("You already own this product"));
        }
        let user = self
            .queries
            .user(user_id)
            .await?
            .ok_or(AppError::Unauthorized)?;

        self.gateway
            .create_checkout_intent(
                &CheckoutProduct::from(&product.product),
                &Payer {
                    user_id,
                    email: user.email,
                },
            )
            .await
    }

    async fn complete_checkout_session(
        &self,
        session_id: String,
    ) -> AppResult<FulfillmentOutcome> {
        let event = self.gateway.retrieve_completed_session(&session_id).await?;
        self.fulfillment.fulfill(event).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::payments::{MockPaymentGateway, PaymentCompleted};
    use crate::service::fulfillment::MockFulfillmentService;
    use crate::service::test_support::TestUnitOfWork;
    use mockall::predicate::eq;

    fn queries() -> CachedQueries<TestUnitOfWork> {
        TestUnitOfWork::default().queries()
    }

    #[tokio::test]
    async fn test_anonymous_checkout_is_unauthorized_without_gateway_call() {
        let mut gateway = MockPaymentGateway::new();
        gateway.expect_create_checkout_intent().never();
        let manager = CheckoutManager::new(
            queries(),
            Arc::new(gateway),
            Arc::new(MockFulfillmentService::new()),
        );

        let result = manager
            .create_checkout(Viewer::anonymous(), Uuid::new_v4())
            .await;
        assert!(matches!(result, Err(AppError::Unauthorized)));
    }

    #[tokio::test]
    async fn test_redirect_session_flows_into_fulfillment() {
        let product_id = Uuid::new_v4();
        let event = PaymentCompleted {
            session_id: "cs_test".into(),
            user_id: Some(Uuid::new_v4().to_string()),
            product_id: Some(product_id.to_string()),
            amount_total: Some(1000),
        };

        let mut gateway = MockPaymentGateway::new();
        let returned = event.clone();
        gateway
            .expect_retrieve_completed_session()
            .withf(|session_id| session_id == "cs_test")
            .times(1)
            .returning(move |_| Ok(returned.clone()));

        let mut fulfillment = MockFulfillmentService::new();
        fulfillment
            .expect_fulfill()
            .with(eq(event))
            .times(1)
            .returning(move |_| Ok(FulfillmentOutcome::AlreadyFulfilled { product_id }));

        let manager = CheckoutManager::new(queries(), Arc::new(gateway), Arc::new(fulfillment));
        let outcome = manager
            .complete_checkout_session("cs_test".into())
            .await
            .unwrap();

        assert_eq!(outcome.product_id(), product_id);
    }
}
