//! Stripe REST client.

use std::collections::HashMap;

use async_trait::async_trait;
use serde::Deserialize;

use super::pricing::{pricing_rows, DiscountLine, SessionAmounts};
use super::{CheckoutProduct, Payer, PaymentCompleted, PaymentGateway, UnpaidSession};
use common::{AppError, AppResult, PaymentConfig};
use domain::PaymentDetails;

/// Placeholder the processor substitutes with the session id on redirect.
const SESSION_ID_TEMPLATE: &str = "{CHECKOUT_SESSION_ID}";

/// A field that is either an id or, when expanded, the full object.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum Expandable<T> {
    Object(Box<T>),
    Id(String),
}

impl<T> Expandable<T> {
    fn as_object(&self) -> Option<&T> {
        match self {
            Expandable::Object(object) => Some(object),
            Expandable::Id(_) => None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
struct Charge {
    receipt_url: Option<String>,
    #[serde(default)]
    amount_refunded: i64,
}

#[derive(Debug, Clone, Deserialize)]
struct PaymentIntent {
    latest_charge: Option<Expandable<Charge>>,
}

#[derive(Debug, Clone, Deserialize)]
struct Coupon {
    name: Option<String>,
    percent_off: Option<f64>,
}

#[derive(Debug, Clone, Deserialize)]
struct Discount {
    coupon: Coupon,
}

#[derive(Debug, Clone, Deserialize)]
struct DiscountAmount {
    amount: i64,
    discount: Discount,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct Breakdown {
    #[serde(default)]
    discounts: Vec<DiscountAmount>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct TotalDetails {
    breakdown: Option<Breakdown>,
}

/// Payment statuses that release the purchased content.
const SETTLED_PAYMENT_STATUSES: &[&str] = &["paid", "no_payment_required"];

/// The subset of a checkout session this service reads.
#[derive(Debug, Clone, Deserialize)]
pub(super) struct CheckoutSession {
    id: String,
    client_secret: Option<String>,
    status: Option<String>,
    payment_status: Option<String>,
    amount_total: Option<i64>,
    amount_subtotal: Option<i64>,
    #[serde(default)]
    metadata: HashMap<String, String>,
    total_details: Option<TotalDetails>,
    payment_intent: Option<Expandable<PaymentIntent>>,
}

impl CheckoutSession {
    fn is_settled(&self) -> bool {
        self.payment_status
            .as_deref()
            .is_some_and(|status| SETTLED_PAYMENT_STATUSES.contains(&status))
    }

    /// The fulfillment request, or why the session cannot be fulfilled yet.
    pub(super) fn into_completed(mut self) -> Result<PaymentCompleted, UnpaidSession> {
        if !self.is_settled() {
            return Err(UnpaidSession {
                session_id: self.id,
                status: self.status,
                payment_status: self.payment_status,
            });
        }
        Ok(PaymentCompleted {
            user_id: self.metadata.remove("userId"),
            product_id: self.metadata.remove("productId"),
            amount_total: self.amount_total,
            session_id: self.id,
        })
    }

    fn latest_charge(&self) -> Option<&Charge> {
        self.payment_intent
            .as_ref()?
            .as_object()?
            .latest_charge
            .as_ref()?
            .as_object()
    }

    fn amounts(&self) -> SessionAmounts {
        let discounts = self
            .total_details
            .as_ref()
            .and_then(|details| details.breakdown.as_ref())
            .map(|breakdown| {
                breakdown
                    .discounts
                    .iter()
                    .map(|d| DiscountLine {
                        coupon_name: d
                            .discount
                            .coupon
                            .name
                            .clone()
                            .unwrap_or_else(|| "Discount".to_string()),
                        percent_off: d.discount.coupon.percent_off,
                        amount_in_cents: d.amount,
                    })
                    .collect()
            })
            .unwrap_or_default();

        SessionAmounts {
            amount_total: self.amount_total,
            amount_subtotal: self.amount_subtotal,
            discounts,
            refunded_in_cents: self.latest_charge().map(|charge| charge.amount_refunded),
        }
    }
}

/// [`PaymentGateway`] backed by the Stripe API.
#[derive(Clone)]
pub struct StripeGateway {
    http_client: reqwest::Client,
    config: PaymentConfig,
    server_url: String,
}

impl StripeGateway {
    pub fn new(config: PaymentConfig, server_url: impl Into<String>) -> Self {
        Self {
            http_client: reqwest::Client::new(),
            config,
            server_url: server_url.into(),
        }
    }

    fn sessions_url(&self) -> String {
        format!("{}/v1/checkout/sessions", self.config.api_base)
    }

    fn absolute_url(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            return path.to_string();
        }
        format!(
            "{}/{}",
            self.server_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    async fn retrieve_session(&self, session_id: &str, expand: &[&str]) -> AppResult<CheckoutSession> {
        let query: Vec<(&str, &str)> = expand.iter().map(|field| ("expand[]", *field)).collect();
        let session = self
            .http_client
            .get(format!("{}/{}", self.sessions_url(), session_id))
            .bearer_auth(&self.config.secret_key)
            .query(&query)
            .send()
            .await?
            .error_for_status()?
            .json::<CheckoutSession>()
            .await?;
        Ok(session)
    }
}

#[async_trait]
impl PaymentGateway for StripeGateway {
    async fn create_checkout_intent(
        &self,
        product: &CheckoutProduct,
        payer: &Payer,
    ) -> AppResult<String> {
        let return_url = format!(
            "{}/api/webhooks/stripe?stripeSessionId={SESSION_ID_TEMPLATE}",
            self.server_url.trim_end_matches('/')
        );
        let form: Vec<(&str, String)> = vec![
            ("ui_mode", "embedded".into()),
            ("mode", "payment".into()),
            ("line_items[0][quantity]", "1".into()),
            ("line_items[0][price_data][currency]", self.config.currency.clone()),
            (
                "line_items[0][price_data][unit_amount]",
                product.price_in_cents.to_string(),
            ),
            ("line_items[0][price_data][product_data][name]", product.name.clone()),
            (
                "line_items[0][price_data][product_data][description]",
                product.description.clone(),
            ),
            (
                "line_items[0][price_data][product_data][images][0]",
                self.absolute_url(&product.image_url),
            ),
            ("return_url", return_url),
            ("customer_email", payer.email.clone()),
            ("payment_intent_data[receipt_email]", payer.email.clone()),
            ("metadata[productId]", product.id.to_string()),
            ("metadata[userId]", payer.user_id.to_string()),
        ];

        let session = self
            .http_client
            .post(self.sessions_url())
            .bearer_auth(&self.config.secret_key)
            .form(&form)
            .send()
            .await?
            .error_for_status()?
            .json::<CheckoutSession>()
            .await?;

        tracing::info!(session_id = %session.id, product_id = %product.id, "Checkout session created");
        session
            .client_secret
            .ok_or_else(|| AppError::internal("Checkout session has no client secret"))
    }

    async fn retrieve_completed_session(&self, session_id: &str) -> AppResult<PaymentCompleted> {
        let session = self.retrieve_session(session_id, &[]).await?;
        require_settled(session)
    }

    async fn payment_details(
        &self,
        session_id: &str,
        price_paid_in_cents: i32,
        refunded: bool,
    ) -> AppResult<PaymentDetails> {
        let session = self
            .retrieve_session(
                session_id,
                &["payment_intent.latest_charge", "total_details.breakdown"],
            )
            .await?;

        Ok(PaymentDetails {
            receipt_url: session
                .latest_charge()
                .and_then(|charge| charge.receipt_url.clone()),
            pricing_rows: pricing_rows(price_paid_in_cents, refunded, &session.amounts()),
        })
    }
}

/// A returning buyer's session must be paid before it is fulfilled.
fn require_settled(session: CheckoutSession) -> AppResult<PaymentCompleted> {
    session.into_completed().map_err(|unpaid| {
        tracing::warn!(
            session_id = %unpaid.session_id,
            status = ?unpaid.status,
            payment_status = ?unpaid.payment_status,
            "Checkout session is not paid"
        );
        AppError::bad_request("Checkout session is not paid")
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expanded_session_yields_charge_and_discounts() {
        let session: CheckoutSession = serde_json::from_value(serde_json::json!({
            "id": "cs_1",
            "amount_total": 4000,
            "amount_subtotal": 5000,
            "metadata": {},
            "total_details": {"breakdown": {"discounts": [
                {"amount": 1000, "discount": {"coupon": {"name": "LAUNCH", "percent_off": 20.0}}}
            ]}},
            "payment_intent": {"latest_charge": {
                "receipt_url": "https://pay.example/receipt",
                "amount_refunded": 0
            }}
        }))
        .unwrap();

        assert_eq!(
            session.latest_charge().and_then(|c| c.receipt_url.as_deref()),
            Some("https://pay.example/receipt")
        );
        let amounts = session.amounts();
        assert_eq!(amounts.discounts.len(), 1);
        assert_eq!(amounts.refunded_in_cents, Some(0));
    }

    #[test]
    fn test_only_settled_sessions_complete() {
        let session = |status: &str, payment_status: &str| -> CheckoutSession {
            serde_json::from_value(serde_json::json!({
                "id": "cs_3",
                "status": status,
                "payment_status": payment_status,
                "amount_total": 0,
                "metadata": {"userId": "u", "productId": "p"}
            }))
            .unwrap()
        };

        let completed = session("complete", "paid").into_completed().unwrap();
        assert_eq!(completed.user_id.as_deref(), Some("u"));
        assert_eq!(completed.product_id.as_deref(), Some("p"));
        assert!(session("complete", "no_payment_required")
            .into_completed()
            .is_ok());

        let unpaid = session("open", "unpaid").into_completed().unwrap_err();
        assert_eq!(unpaid.session_id, "cs_3");
        assert_eq!(unpaid.status.as_deref(), Some("open"));
        assert_eq!(unpaid.payment_status.as_deref(), Some("unpaid"));
        assert!(session("complete", "unpaid").into_completed().is_err());
    }

    #[test]
    fn test_unpaid_return_is_rejected() {
        let session: CheckoutSession = serde_json::from_value(serde_json::json!({
            "id": "cs_5",
            "status": "open",
            "payment_status": "unpaid",
            "metadata": {"userId": "u", "productId": "p"}
        }))
        .unwrap();

        assert!(matches!(
            require_settled(session),
            Err(AppError::BadRequest(msg)) if msg == "Checkout session is not paid"
        ));
    }

    #[test]
    fn test_missing_payment_status_is_not_settled() {
        let session: CheckoutSession =
            serde_json::from_value(serde_json::json!({"id": "cs_4"})).unwrap();

        assert!(session.into_completed().is_err());
    }

    #[test]
    fn test_unexpanded_payment_intent_has_no_charge() {
        let session: CheckoutSession = serde_json::from_value(serde_json::json!({
            "id": "cs_2",
            "payment_intent": "pi_123"
        }))
        .unwrap();

        assert!(session.latest_charge().is_none());
        assert_eq!(session.amounts().refunded_in_cents, None);
    }

    #[test]
    fn test_relative_image_paths_become_absolute() {
        let gateway = StripeGateway::new(PaymentConfig::default(), "https://shop.example/");

        assert_eq!(
            gateway.absolute_url("/images/bundle.png"),
            "https://shop.example/images/bundle.png"
        );
        assert_eq!(
            gateway.absolute_url("https://cdn.example/a.png"),
            "https://cdn.example/a.png"
        );
    }
}
