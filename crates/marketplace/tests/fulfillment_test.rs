//! Purchase fulfillment against a real schema.

mod support;

use common::AppError;
use domain::{CourseInput, ProductInput, ProductStatus, SectionStatus, Viewer};
use marketplace_lib::service::{FulfillmentOutcome, ServiceContainer};

use crate::support::{completed_session, setup, TestApp};

/// A user and a product bundling two courses.
async fn seed_bundle(app: &TestApp) -> (uuid::Uuid, uuid::Uuid, Vec<uuid::Uuid>) {
    let user = app.create_user("Ada Lovelace").await;
    let first = app.create_course("Rust Basics").await;
    let second = app.create_course("Async Rust").await;
    app.create_section(first.id, "Intro", SectionStatus::Public).await;
    let product = app
        .create_product("Rust Bundle", 49, vec![first.id, second.id])
        .await;
    (user.id, product.product.id, vec![first.id, second.id])
}

async fn owned_course_ids(app: &TestApp, user_id: uuid::Uuid) -> Vec<uuid::Uuid> {
    let mut ids: Vec<_> = app
        .services
        .courses()
        .list_user_courses(Viewer::user(user_id))
        .await
        .expect("user courses should load")
        .into_iter()
        .map(|c| c.id)
        .collect();
    ids.sort();
    ids
}

#[tokio::test]
async fn test_fulfillment_grants_every_course_and_records_purchase() {
    let app = setup().await;
    let (user_id, product_id, mut course_ids) = seed_bundle(&app).await;
    let viewer = Viewer::user(user_id);

    // Warm the cached reads so the test also proves invalidation
    assert!(owned_course_ids(&app, user_id).await.is_empty());
    assert!(!app
        .services
        .purchases()
        .user_owns_product(viewer, product_id)
        .await
        .unwrap());

    let outcome = app
        .services
        .fulfillment()
        .fulfill(completed_session("cs_grant", user_id, product_id))
        .await
        .unwrap();
    assert!(matches!(outcome, FulfillmentOutcome::Fulfilled { .. }));
    assert_eq!(outcome.product_id(), product_id);

    course_ids.sort();
    assert_eq!(owned_course_ids(&app, user_id).await, course_ids);
    assert!(app
        .services
        .purchases()
        .user_owns_product(viewer, product_id)
        .await
        .unwrap());

    let purchases = app.services.purchases().list_user_purchases(viewer).await.unwrap();
    assert_eq!(purchases.len(), 1);
    assert_eq!(purchases[0].price_paid_in_cents, 4900);
    assert_eq!(purchases[0].stripe_session_id, "cs_grant");
}

#[tokio::test]
async fn test_repeated_delivery_is_idempotent() {
    let app = setup().await;
    let (user_id, product_id, _) = seed_bundle(&app).await;
    let fulfillment = app.services.fulfillment();

    let first = fulfillment
        .fulfill(completed_session("cs_repeat", user_id, product_id))
        .await
        .unwrap();
    let second = fulfillment
        .fulfill(completed_session("cs_repeat", user_id, product_id))
        .await
        .unwrap();

    assert!(matches!(first, FulfillmentOutcome::Fulfilled { .. }));
    assert_eq!(second, FulfillmentOutcome::AlreadyFulfilled { product_id });

    let purchases = app
        .services
        .purchases()
        .list_user_purchases(Viewer::user(user_id))
        .await
        .unwrap();
    assert_eq!(purchases.len(), 1);
    assert_eq!(owned_course_ids(&app, user_id).await.len(), 2);
}

#[tokio::test]
async fn test_concurrent_delivery_records_one_purchase() {
    let app = setup().await;
    let (user_id, product_id, _) = seed_bundle(&app).await;
    let fulfillment = app.services.fulfillment();

    let (a, b) = tokio::join!(
        fulfillment.fulfill(completed_session("cs_race", user_id, product_id)),
        fulfillment.fulfill(completed_session("cs_race", user_id, product_id)),
    );
    let outcomes = [a.unwrap(), b.unwrap()];

    let fulfilled = outcomes
        .iter()
        .filter(|o| matches!(o, FulfillmentOutcome::Fulfilled { .. }))
        .count();
    assert_eq!(fulfilled, 1);
    assert!(outcomes.iter().all(|o| o.product_id() == product_id));

    let purchases = app
        .services
        .purchases()
        .list_user_purchases(Viewer::user(user_id))
        .await
        .unwrap();
    assert_eq!(purchases.len(), 1);
}

#[tokio::test]
async fn test_failed_grant_leaves_no_partial_fulfillment() {
    let app = setup().await;
    let (user_id, product_id, mut course_ids) = seed_bundle(&app).await;
    app.execute(
        "CREATE TRIGGER fail_second_grant BEFORE INSERT ON user_course_access \
         WHEN (SELECT COUNT(*) FROM user_course_access WHERE user_id = NEW.user_id) >= 1 \
         BEGIN SELECT RAISE(ABORT, 'simulated grant failure'); END;",
    )
    .await;

    let result = app
        .services
        .fulfillment()
        .fulfill(completed_session("cs_atomic", user_id, product_id))
        .await;
    assert!(result.is_err());

    assert!(owned_course_ids(&app, user_id).await.is_empty());
    let purchases = app
        .services
        .purchases()
        .list_user_purchases(Viewer::user(user_id))
        .await
        .unwrap();
    assert!(purchases.is_empty());

    // The processor retries once the fault is gone
    app.execute("DROP TRIGGER fail_second_grant;").await;
    let retry = app
        .services
        .fulfillment()
        .fulfill(completed_session("cs_atomic", user_id, product_id))
        .await
        .unwrap();
    assert!(matches!(retry, FulfillmentOutcome::Fulfilled { .. }));
    course_ids.sort();
    assert_eq!(owned_course_ids(&app, user_id).await, course_ids);
}

#[tokio::test]
async fn test_purchase_snapshot_survives_product_edits() {
    let app = setup().await;
    let (user_id, product_id, course_ids) = seed_bundle(&app).await;
    let viewer = Viewer::user(user_id);

    app.services
        .fulfillment()
        .fulfill(completed_session("cs_snapshot", user_id, product_id))
        .await
        .unwrap();

    app.services
        .products()
        .update_product(
            app.admin,
            product_id,
            ProductInput {
                name: "Rust Bundle 2.0".to_string(),
                description: "Now with more lifetimes".to_string(),
                image_url: "/images/new.png".to_string(),
                price_in_dollars: 99,
                status: ProductStatus::Public,
                course_ids,
            },
        )
        .await
        .unwrap();

    let purchases = app.services.purchases().list_user_purchases(viewer).await.unwrap();
    let receipt = app
        .services
        .purchases()
        .get_user_purchase(viewer, purchases[0].id)
        .await
        .unwrap();
    assert_eq!(receipt.purchase.product_details.name, "Rust Bundle");
    assert_eq!(receipt.purchase.product_details.description, "Rust Bundle bundle");
    assert_eq!(receipt.purchase.price_paid_in_cents, 4900);
    assert!(receipt.details.is_some());
}

#[tokio::test]
async fn test_amount_total_overrides_list_price() {
    let app = setup().await;
    let (user_id, product_id, _) = seed_bundle(&app).await;

    let mut event = completed_session("cs_discount", user_id, product_id);
    event.amount_total = Some(1234);
    app.services.fulfillment().fulfill(event).await.unwrap();

    let purchases = app
        .services
        .purchases()
        .list_user_purchases(Viewer::user(user_id))
        .await
        .unwrap();
    assert_eq!(purchases[0].price_paid_in_cents, 1234);
}

#[tokio::test]
async fn test_missing_metadata_is_rejected_without_writes() {
    let app = setup().await;
    let (user_id, product_id, _) = seed_bundle(&app).await;

    let mut event = completed_session("cs_partial", user_id, product_id);
    event.user_id = None;
    let result = app.services.fulfillment().fulfill(event).await;
    assert!(matches!(result, Err(AppError::Validation(_))));

    let unknown_product = completed_session("cs_unknown", user_id, uuid::Uuid::new_v4());
    let result = app.services.fulfillment().fulfill(unknown_product).await;
    assert!(matches!(result, Err(AppError::NotFound)));

    assert!(owned_course_ids(&app, user_id).await.is_empty());
}

#[tokio::test]
async fn test_checkout_return_and_notification_share_one_purchase() {
    let app = setup().await;
    let (user_id, product_id, _) = seed_bundle(&app).await;
    app.gateway
        .sessions
        .lock()
        .unwrap()
        .push(completed_session("cs_both", user_id, product_id));

    let redirect = app
        .services
        .checkout()
        .complete_checkout_session("cs_both".to_string())
        .await
        .unwrap();
    let notification = app
        .services
        .fulfillment()
        .fulfill(completed_session("cs_both", user_id, product_id))
        .await
        .unwrap();

    assert!(matches!(redirect, FulfillmentOutcome::Fulfilled { .. }));
    assert_eq!(notification, FulfillmentOutcome::AlreadyFulfilled { product_id });
}

#[tokio::test]
async fn test_checkout_refuses_owned_product() {
    let app = setup().await;
    let (user_id, product_id, _) = seed_bundle(&app).await;
    let viewer = Viewer::user(user_id);

    let secret = app
        .services
        .checkout()
        .create_checkout(viewer, product_id)
        .await
        .unwrap();
    assert_eq!(secret, format!("secret_{product_id}"));

    app.services
        .fulfillment()
        .fulfill(completed_session("cs_owned", user_id, product_id))
        .await
        .unwrap();

    let again = app.services.checkout().create_checkout(viewer, product_id).await;
    assert!(matches!(again, Err(AppError::Conflict(_))));
    assert_eq!(app.gateway.checkouts.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn test_product_with_purchases_cannot_be_deleted() {
    let app = setup().await;
    let (user_id, product_id, _) = seed_bundle(&app).await;
    app.services
        .fulfillment()
        .fulfill(completed_session("cs_keep", user_id, product_id))
        .await
        .unwrap();

    let result = app.services.products().delete_product(app.admin, product_id).await;
    assert!(matches!(result, Err(AppError::Validation(_))));

    let course = app
        .services
        .courses()
        .create_course(
            app.admin,
            CourseInput {
                name: "Unsold".to_string(),
                description: "Nobody bought this".to_string(),
            },
        )
        .await
        .unwrap();
    let unsold = app.create_product("Unsold Bundle", 10, vec![course.id]).await;
    app.services
        .products()
        .delete_product(app.admin, unsold.product.id)
        .await
        .unwrap();
}
