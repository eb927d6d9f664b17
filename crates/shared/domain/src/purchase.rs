//! Purchases: immutable receipts produced by fulfillment.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::product::Product;

/// Product details frozen into a purchase at fulfillment time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct ProductSnapshot {
    pub name: String,
    pub description: String,
    pub image_url: String,
}

impl From<&Product> for ProductSnapshot {
    fn from(product: &Product) -> Self {
        Self {
            name: product.name.clone(),
            description: product.description.clone(),
            image_url: product.image_url.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct Purchase {
    pub id: Uuid,
    pub user_id: Uuid,
    pub product_id: Uuid,
    pub stripe_session_id: String,
    pub price_paid_in_cents: i32,
    pub product_details: ProductSnapshot,
    pub created_at: DateTime<Utc>,
    pub refunded_at: Option<DateTime<Utc>>,
}

impl Purchase {
    pub fn is_refunded(&self) -> bool {
        self.refunded_at.is_some()
    }
}

/// Values for a new receipt row.
#[derive(Debug, Clone, PartialEq)]
pub struct NewPurchase {
    pub user_id: Uuid,
    pub product_id: Uuid,
    pub stripe_session_id: String,
    pub price_paid_in_cents: i32,
    pub product_details: ProductSnapshot,
}

/// Admin sales table row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct SaleRow {
    #[serde(flatten)]
    pub purchase: Purchase,
    pub customer_name: String,
}

/// One line of the pricing breakdown shown on a receipt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct PricingRow {
    pub label: String,
    pub amount_in_dollars: f64,
    pub emphasized: bool,
}

/// Processor-side details for a completed payment. Display only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct PaymentDetails {
    pub receipt_url: Option<String>,
    pub pricing_rows: Vec<PricingRow>,
}

/// A purchase with its processor details, when they could be fetched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct PurchaseReceipt {
    pub purchase: Purchase,
    pub details: Option<PaymentDetails>,
}
