//! HTTP API tests through the full router.

mod support;

use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{header, Request, StatusCode},
    Router,
};
use hmac::{Hmac, Mac};
use jsonwebtoken::{encode, EncodingKey, Header};
use serde_json::{json, Value};
use sha2::Sha256;
use tower::ServiceExt;
use uuid::Uuid;

use common::JwtConfig;
use domain::{SectionStatus, Viewer};
use marketplace_lib::api::{create_router, AppState, WebhookSecrets};
use marketplace_lib::identity::JwtIdentityResolver;
use marketplace_lib::service::ServiceContainer;

use crate::support::{completed_session, setup, TestApp};

const JWT_SECRET: &str = "test-secret-key-for-testing-only-32chars";
const PAYMENT_SECRET: &str = "whsec_test";
const IDENTITY_SECRET: &str = "identity_test";

fn router(app: &TestApp) -> Router {
    let resolver = JwtIdentityResolver::new(
        &JwtConfig {
            secret: JWT_SECRET.to_string(),
            leeway_seconds: 0,
        },
        app.services.users(),
    );
    let state = AppState::new(
        Arc::new(app.services.clone()),
        Arc::new(resolver),
        app.cache.clone(),
        app.database.clone(),
        WebhookSecrets {
            payments: PAYMENT_SECRET.to_string(),
            payments_tolerance_seconds: 300,
            identity: IDENTITY_SECRET.to_string(),
        },
    );
    create_router(state)
}

fn token(user_id: Uuid, role: &str) -> String {
    let claims = json!({
        "sub": format!("user_{}", user_id.simple()),
        "dbId": user_id,
        "role": role,
        "exp": chrono::Utc::now().timestamp() + 3600,
    });
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(JWT_SECRET.as_bytes()),
    )
    .unwrap()
}

fn hmac_hex(secret: &str, payload: &[u8]) -> String {
    let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes()).unwrap();
    mac.update(payload);
    hex::encode(mac.finalize().into_bytes())
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn get(uri: &str, bearer: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().uri(uri);
    if let Some(token) = bearer {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    builder.body(Body::empty()).unwrap()
}

fn post_json(uri: &str, bearer: Option<&str>, body: Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = bearer {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

#[tokio::test]
async fn test_health_reports_database_and_cache() {
    let app = setup().await;
    let response = router(&app).oneshot(get("/health", None)).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["services"]["database"]["status"], "healthy");
    assert_eq!(body["services"]["cache"]["backend"], "memory");
}

#[tokio::test]
async fn test_me_requires_signed_in_viewer() {
    let app = setup().await;
    let user = app.create_user("Alan").await;

    let anonymous = router(&app).oneshot(get("/api/me", None)).await.unwrap();
    assert_eq!(anonymous.status(), StatusCode::UNAUTHORIZED);

    let garbage = router(&app)
        .oneshot(get("/api/me", Some("not-a-jwt")))
        .await
        .unwrap();
    assert_eq!(garbage.status(), StatusCode::UNAUTHORIZED);

    let signed_in = router(&app)
        .oneshot(get("/api/me", Some(&token(user.id, "user"))))
        .await
        .unwrap();
    assert_eq!(signed_in.status(), StatusCode::OK);
    assert_eq!(body_json(signed_in).await["name"], "Alan");
}

#[tokio::test]
async fn test_redacted_user_token_is_anonymous() {
    let app = setup().await;
    let user = app.create_user("Eve").await;
    let session = token(user.id, "admin");

    let before = router(&app)
        .oneshot(get("/api/me", Some(&session)))
        .await
        .unwrap();
    assert_eq!(before.status(), StatusCode::OK);

    app.services
        .users()
        .delete_user(user.external_id.clone())
        .await
        .unwrap();

    let after = router(&app)
        .oneshot(get("/api/me", Some(&session)))
        .await
        .unwrap();
    assert_eq!(after.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_admin_routes_look_missing_to_non_admins() {
    let app = setup().await;
    let user = app.create_user("Mallory").await;
    let body = json!({ "name": "Sneaky", "description": "Not allowed" });

    let response = router(&app)
        .oneshot(post_json(
            "/api/admin/courses",
            Some(&token(user.id, "user")),
            body.clone(),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_json(response).await["error"]["code"], "NOT_FOUND");

    // The claim alone does not make an admin.
    let claimed = router(&app)
        .oneshot(post_json(
            "/api/admin/courses",
            Some(&token(user.id, "admin")),
            body.clone(),
        ))
        .await
        .unwrap();
    assert_eq!(claimed.status(), StatusCode::NOT_FOUND);

    let admin_user = app.create_admin("Grace").await;
    let admin = router(&app)
        .oneshot(post_json(
            "/api/admin/courses",
            Some(&token(admin_user.id, "admin")),
            body,
        ))
        .await
        .unwrap();
    assert_eq!(admin.status(), StatusCode::CREATED);
    assert_eq!(body_json(admin).await["name"], "Sneaky");
}

#[tokio::test]
async fn test_invalid_body_is_a_validation_error() {
    let app = setup().await;
    let admin = app.create_admin("Grace").await;
    let response = router(&app)
        .oneshot(post_json(
            "/api/admin/courses",
            Some(&token(admin.id, "admin")),
            json!({ "name": "", "description": "Missing name" }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
    assert_eq!(body["error"]["message"], "Name is required");
}

#[tokio::test]
async fn test_private_product_is_not_found_publicly() {
    let app = setup().await;
    let course = app.create_course("Hidden").await;
    app.create_section(course.id, "Only", SectionStatus::Public).await;
    let product = app.create_product("Hidden", 10, vec![course.id]).await;
    let mut input = domain::ProductInput {
        name: "Hidden".to_string(),
        description: "Hidden bundle".to_string(),
        image_url: "/images/bundle.png".to_string(),
        price_in_dollars: 10,
        status: domain::ProductStatus::Private,
        course_ids: vec![course.id],
    };
    app.services
        .products()
        .update_product(app.admin, product.product.id, input.clone())
        .await
        .unwrap();

    let uri = format!("/api/products/{}", product.product.id);
    let response = router(&app).oneshot(get(&uri, None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let listed = router(&app).oneshot(get("/api/products", None)).await.unwrap();
    assert_eq!(body_json(listed).await, json!([]));

    input.status = domain::ProductStatus::Public;
    app.services
        .products()
        .update_product(app.admin, product.product.id, input)
        .await
        .unwrap();
    let response = router(&app).oneshot(get(&uri, None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_payment_notification_requires_valid_signature() {
    let app = setup().await;
    let payload = json!({ "type": "checkout.session.completed", "data": { "object": {} } });
    let request = Request::builder()
        .method("POST")
        .uri("/api/webhooks/stripe")
        .header("stripe-signature", "t=1,v1=deadbeef")
        .body(Body::from(payload.to_string()))
        .unwrap();

    let response = router(&app).oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_signed_payment_notification_fulfils_purchase() {
    let app = setup().await;
    let user = app.create_user("Katherine").await;
    let course = app.create_course("Orbits").await;
    let product = app.create_product("Orbits", 25, vec![course.id]).await;

    let payload = json!({
        "type": "checkout.session.completed",
        "data": { "object": {
            "id": "cs_webhook",
            "status": "complete",
            "payment_status": "paid",
            "amount_total": 2500,
            "metadata": {
                "userId": user.id.to_string(),
                "productId": product.product.id.to_string(),
            },
        }},
    })
    .to_string();
    let timestamp = chrono::Utc::now().timestamp();
    let signature = hmac_hex(PAYMENT_SECRET, format!("{timestamp}.{payload}").as_bytes());

    for _ in 0..2 {
        let request = Request::builder()
            .method("POST")
            .uri("/api/webhooks/stripe")
            .header("stripe-signature", format!("t={timestamp},v1={signature}"))
            .body(Body::from(payload.clone()))
            .unwrap();
        let response = router(&app).oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    let purchases = app
        .services
        .purchases()
        .list_user_purchases(Viewer::user(user.id))
        .await
        .unwrap();
    assert_eq!(purchases.len(), 1);
    assert_eq!(purchases[0].price_paid_in_cents, 2500);
}

#[tokio::test]
async fn test_unpaid_session_notification_is_acknowledged_without_purchase() {
    let app = setup().await;
    let user = app.create_user("Ida").await;
    let course = app.create_course("Looms").await;
    let product = app.create_product("Looms", 30, vec![course.id]).await;

    let payload = json!({
        "type": "checkout.session.completed",
        "data": { "object": {
            "id": "cs_pending",
            "status": "complete",
            "payment_status": "unpaid",
            "amount_total": 3000,
            "metadata": {
                "userId": user.id.to_string(),
                "productId": product.product.id.to_string(),
            },
        }},
    })
    .to_string();
    let timestamp = chrono::Utc::now().timestamp();
    let signature = hmac_hex(PAYMENT_SECRET, format!("{timestamp}.{payload}").as_bytes());

    let request = Request::builder()
        .method("POST")
        .uri("/api/webhooks/stripe")
        .header("stripe-signature", format!("t={timestamp},v1={signature}"))
        .body(Body::from(payload))
        .unwrap();
    let response = router(&app).oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let purchases = app
        .services
        .purchases()
        .list_user_purchases(Viewer::user(user.id))
        .await
        .unwrap();
    assert!(purchases.is_empty());
}

#[tokio::test]
async fn test_unhandled_event_types_are_acknowledged() {
    let app = setup().await;
    let payload = json!({ "type": "charge.refunded", "data": { "object": {} } }).to_string();
    let timestamp = chrono::Utc::now().timestamp();
    let signature = hmac_hex(PAYMENT_SECRET, format!("{timestamp}.{payload}").as_bytes());

    let request = Request::builder()
        .method("POST")
        .uri("/api/webhooks/stripe")
        .header("stripe-signature", format!("t={timestamp},v1={signature}"))
        .body(Body::from(payload))
        .unwrap();
    let response = router(&app).oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_checkout_return_redirects_by_outcome() {
    let app = setup().await;
    let user = app.create_user("Hedy").await;
    let course = app.create_course("Radio").await;
    let product = app.create_product("Radio", 15, vec![course.id]).await;
    let product_id = product.product.id;
    app.gateway
        .sessions
        .lock()
        .unwrap()
        .push(completed_session("cs_return", user.id, product_id));

    let success = router(&app)
        .oneshot(get("/api/webhooks/stripe?stripeSessionId=cs_return", None))
        .await
        .unwrap();
    assert_eq!(success.status(), StatusCode::TEMPORARY_REDIRECT);
    assert_eq!(
        success.headers()[header::LOCATION],
        format!("/products/{product_id}/purchase/success").as_str()
    );

    let failure = router(&app)
        .oneshot(get("/api/webhooks/stripe?stripeSessionId=cs_unknown", None))
        .await
        .unwrap();
    assert_eq!(failure.status(), StatusCode::TEMPORARY_REDIRECT);
    assert_eq!(
        failure.headers()[header::LOCATION],
        "/products/purchase-failure"
    );
}

#[tokio::test]
async fn test_identity_webhook_syncs_and_redacts_users() {
    let app = setup().await;
    let created = json!({
        "type": "user.created",
        "data": {
            "id": "user_remote",
            "email_addresses": [{ "id": "e1", "email_address": "remote@example.com" }],
            "primary_email_address_id": "e1",
            "first_name": "Remote",
            "last_name": "User",
            "image_url": null,
            "public_metadata": {},
        },
    })
    .to_string();

    let unsigned = Request::builder()
        .method("POST")
        .uri("/api/webhooks/identity")
        .header("x-webhook-signature", "00")
        .body(Body::from(created.clone()))
        .unwrap();
    let response = router(&app).oneshot(unsigned).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let signed = Request::builder()
        .method("POST")
        .uri("/api/webhooks/identity")
        .header("x-webhook-signature", hmac_hex(IDENTITY_SECRET, created.as_bytes()))
        .body(Body::from(created))
        .unwrap();
    let response = router(&app).oneshot(signed).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let deleted = json!({ "type": "user.deleted", "data": { "id": "user_remote" } }).to_string();
    let signed = Request::builder()
        .method("POST")
        .uri("/api/webhooks/identity")
        .header("x-webhook-signature", hmac_hex(IDENTITY_SECRET, deleted.as_bytes()))
        .body(Body::from(deleted))
        .unwrap();
    let response = router(&app).oneshot(signed).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    // The external id was rewritten, so a second delete finds nobody
    let again = app
        .services
        .users()
        .delete_user("user_remote".to_string())
        .await
        .unwrap();
    assert!(again.is_none());
}
