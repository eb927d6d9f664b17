//! Payment processor integration.
//!
//! The services talk to a [`PaymentGateway`]; [`StripeGateway`] is the
//! production implementation over the processor's REST API.

pub mod pricing;
mod stripe;
pub mod webhook;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[cfg(any(test, feature = "test-utils"))]
use mockall::automock;

use common::AppResult;
use domain::{PaymentDetails, Product};

pub use stripe::StripeGateway;

/// What the payer is shown at checkout.
#[derive(Debug, Clone, PartialEq)]
pub struct CheckoutProduct {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub image_url: String,
    pub price_in_cents: i64,
}

impl From<&Product> for CheckoutProduct {
    fn from(product: &Product) -> Self {
        Self {
            id: product.id,
            name: product.name.clone(),
            description: product.description.clone(),
            image_url: product.image_url.clone(),
            price_in_cents: product.price_in_cents(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Payer {
    pub user_id: Uuid,
    pub email: String,
}

/// A completed checkout session as reported by the processor.
///
/// Metadata is kept as delivered; the fulfillment pipeline decides whether it
/// is usable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentCompleted {
    pub session_id: String,
    pub user_id: Option<String>,
    pub product_id: Option<String>,
    pub amount_total: Option<i64>,
}

/// A checkout session that ended without settled funds, e.g. an expired
/// session or a delayed payment method still pending.
#[derive(Debug, Clone, PartialEq)]
pub struct UnpaidSession {
    pub session_id: String,
    pub status: Option<String>,
    pub payment_status: Option<String>,
}

/// Outbound calls to the payment processor.
#[cfg_attr(any(test, feature = "test-utils"), automock)]
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Open an embedded checkout session and return its client secret
    async fn create_checkout_intent(
        &self,
        product: &CheckoutProduct,
        payer: &Payer,
    ) -> AppResult<String>;

    /// Look up a checkout session by id; sessions without settled payment
    /// are rejected
    async fn retrieve_completed_session(&self, session_id: &str) -> AppResult<PaymentCompleted>;

    /// Receipt link and pricing breakdown for display
    async fn payment_details(
        &self,
        session_id: &str,
        price_paid_in_cents: i32,
        refunded: bool,
    ) -> AppResult<PaymentDetails>;
}
