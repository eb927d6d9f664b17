//! Inbound payment and identity webhooks.

use axum::{
    body::Bytes,
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    response::Redirect,
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use utoipa::IntoParams;

use common::{AppError, AppResult};

use crate::api::AppState;
use crate::identity::{parse_identity_event, verify_webhook_signature, IdentityEvent};
use crate::payments::webhook::{parse_event, verify_signature, PaymentEvent};

const PAYMENT_SIGNATURE_HEADER: &str = "stripe-signature";
const IDENTITY_SIGNATURE_HEADER: &str = "x-webhook-signature";
const PURCHASE_FAILURE_PATH: &str = "/products/purchase-failure";

#[derive(Debug, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query, rename_all = "camelCase")]
pub struct CheckoutReturnQuery {
    /// Checkout session id substituted by the processor
    pub stripe_session_id: String,
}

pub fn webhook_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/webhooks/stripe",
            get(checkout_return).post(payment_notification),
        )
        .route("/webhooks/identity", post(identity_notification))
}

/// Buyer lands here after paying; fulfil and redirect
#[utoipa::path(
    get,
    path = "/api/webhooks/stripe",
    tag = "Webhooks",
    params(CheckoutReturnQuery),
    responses(
        (status = 307, description = "Redirect to the purchase success or failure page")
    )
)]
pub async fn checkout_return(
    State(state): State<AppState>,
    Query(query): Query<CheckoutReturnQuery>,
) -> Redirect {
    match state
        .services
        .checkout()
        .complete_checkout_session(query.stripe_session_id.clone())
        .await
    {
        Ok(outcome) => Redirect::temporary(&format!(
            "/products/{}/purchase/success",
            outcome.product_id()
        )),
        Err(e) => {
            tracing::warn!(
                session_id = %query.stripe_session_id,
                error = %e,
                "Checkout return could not be fulfilled"
            );
            Redirect::temporary(PURCHASE_FAILURE_PATH)
        }
    }
}

/// Signed processor notification
#[utoipa::path(
    post,
    path = "/api/webhooks/stripe",
    tag = "Webhooks",
    responses(
        (status = 200, description = "Event handled or ignored"),
        (status = 400, description = "Signature or payload rejected"),
        (status = 500, description = "Fulfillment failed; the processor will retry")
    )
)]
pub async fn payment_notification(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> AppResult<StatusCode> {
    let signature = headers
        .get(PAYMENT_SIGNATURE_HEADER)
        .and_then(|h| h.to_str().ok())
        .ok_or_else(|| AppError::bad_request("Missing signature header"))?;

    verify_signature(
        &body,
        signature,
        &state.webhooks.payments,
        state.webhooks.payments_tolerance_seconds,
        chrono::Utc::now().timestamp(),
    )?;

    let event = match parse_event(&body)? {
        PaymentEvent::Completed(event) => event,
        PaymentEvent::Unpaid(unpaid) => {
            tracing::info!(
                session_id = %unpaid.session_id,
                payment_status = ?unpaid.payment_status,
                "Checkout session not paid yet; nothing to fulfil"
            );
            return Ok(StatusCode::OK);
        }
        PaymentEvent::Ignored(event_type) => {
            tracing::debug!(event_type = %event_type, "Ignoring payment event");
            return Ok(StatusCode::OK);
        }
    };

    let session_id = event.session_id.clone();
    match state.services.fulfillment().fulfill(event).await {
        Ok(_) => Ok(StatusCode::OK),
        Err(e) => {
            tracing::error!(session_id = %session_id, error = %e, "Payment notification failed");
            Ok(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

/// Signed user sync event from the identity provider
#[utoipa::path(
    post,
    path = "/api/webhooks/identity",
    tag = "Webhooks",
    responses(
        (status = 200, description = "Event applied or ignored"),
        (status = 400, description = "Malformed event"),
        (status = 401, description = "Signature rejected")
    )
)]
pub async fn identity_notification(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> AppResult<StatusCode> {
    let signature = headers
        .get(IDENTITY_SIGNATURE_HEADER)
        .and_then(|h| h.to_str().ok())
        .unwrap_or_default();
    if !verify_webhook_signature(&body, signature, &state.webhooks.identity) {
        return Err(AppError::Unauthorized);
    }

    let users = state.services.users();
    match parse_identity_event(&body)? {
        IdentityEvent::Upsert(profile) => {
            let user = users.sync_user(profile).await?;
            tracing::info!(user_id = %user.id, "User synced");
        }
        IdentityEvent::Deleted { external_id } => {
            if users.delete_user(external_id.clone()).await?.is_none() {
                tracing::debug!(external_id = %external_id, "Delete for unknown user");
            }
        }
        IdentityEvent::Ignored(event_type) => {
            tracing::debug!(event_type = %event_type, "Ignoring identity event");
        }
    }

    Ok(StatusCode::OK)
}
