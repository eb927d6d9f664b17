//! Route configuration.

use axum::{middleware, Router};
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::api::handlers::{
    admin_course_routes, admin_lesson_routes, admin_product_routes, admin_sales_routes,
    course_routes, health_routes, lesson_routes, product_routes, purchase_routes, user_routes,
    webhook_routes,
};
use crate::api::middleware::viewer_middleware;
use crate::api::openapi::ApiDoc;
use crate::api::AppState;

/// Create the main router with all routes.
pub fn create_router(state: AppState) -> Router {
    // Admin handlers still check the role; the prefix only groups them
    let admin = Router::new()
        .merge(admin_course_routes())
        .merge(admin_lesson_routes())
        .merge(admin_product_routes())
        .merge(admin_sales_routes());

    let api = Router::new()
        .nest("/admin", admin)
        .merge(course_routes())
        .merge(lesson_routes())
        .merge(product_routes())
        .merge(purchase_routes())
        .merge(user_routes())
        .merge(webhook_routes())
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            viewer_middleware,
        ));

    Router::new()
        .nest("/health", health_routes())
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .nest("/api", api)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
