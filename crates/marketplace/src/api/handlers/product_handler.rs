//! Product and checkout handlers.

use axum::{
    extract::{Extension, Path, State},
    http::StatusCode,
    response::Json,
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use common::AppResult;
use domain::{
    Product, ProductInput, ProductPage, ProductStatus, ProductTableRow, ProductWithCourses,
    Viewer,
};

use crate::api::extractors::ValidatedJson;
use crate::api::AppState;

/// Product create/update request
#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProductRequest {
    #[validate(length(min = 1, message = "Name is required"))]
    #[schema(example = "Rust Bundle")]
    pub name: String,
    #[validate(length(min = 1, message = "Description is required"))]
    pub description: String,
    #[validate(length(min = 1, message = "Image is required"))]
    pub image_url: String,
    #[validate(range(min = 0, message = "Price cannot be negative"))]
    #[schema(example = 49)]
    pub price_in_dollars: i32,
    pub status: ProductStatus,
    #[validate(length(min = 1, message = "At least one course is required"))]
    pub course_ids: Vec<Uuid>,
}

impl From<ProductRequest> for ProductInput {
    fn from(req: ProductRequest) -> Self {
        ProductInput {
            name: req.name,
            description: req.description,
            image_url: req.image_url,
            price_in_dollars: req.price_in_dollars,
            status: req.status,
            course_ids: req.course_ids,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutResponse {
    /// Client secret for the embedded checkout form
    pub client_secret: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OwnershipResponse {
    pub owned: bool,
}

pub fn admin_product_routes() -> Router<AppState> {
    Router::new()
        .route("/products", get(list_product_table).post(create_product))
        .route(
            "/products/:id",
            get(get_product_for_edit)
                .put(update_product)
                .delete(delete_product),
        )
}

pub fn product_routes() -> Router<AppState> {
    Router::new()
        .route("/products", get(list_public_products))
        .route("/products/:id", get(get_public_product))
        .route("/products/:id/checkout", post(create_checkout))
        .route("/products/:id/ownership", get(get_ownership))
}

/// Product table with course and customer counts
#[utoipa::path(
    get,
    path = "/api/admin/products",
    tag = "Admin",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Product table", body = Vec<ProductTableRow>)
    )
)]
pub async fn list_product_table(
    Extension(viewer): Extension<Viewer>,
    State(state): State<AppState>,
) -> AppResult<Json<Vec<ProductTableRow>>> {
    let rows = state.services.products().list_product_table(viewer).await?;
    Ok(Json(rows))
}

#[utoipa::path(
    get,
    path = "/api/admin/products/{id}",
    tag = "Admin",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Product ID")),
    responses(
        (status = 200, description = "Product with course ids", body = ProductWithCourses),
        (status = 404, description = "Product not found")
    )
)]
pub async fn get_product_for_edit(
    Extension(viewer): Extension<Viewer>,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ProductWithCourses>> {
    let product = state
        .services
        .products()
        .get_product_for_edit(viewer, id)
        .await?;
    Ok(Json(product))
}

#[utoipa::path(
    post,
    path = "/api/admin/products",
    tag = "Admin",
    security(("bearer_auth" = [])),
    request_body = ProductRequest,
    responses(
        (status = 201, description = "Product created", body = ProductWithCourses),
        (status = 400, description = "Validation error")
    )
)]
pub async fn create_product(
    Extension(viewer): Extension<Viewer>,
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<ProductRequest>,
) -> AppResult<(StatusCode, Json<ProductWithCourses>)> {
    let product = state
        .services
        .products()
        .create_product(viewer, req.into())
        .await?;
    Ok((StatusCode::CREATED, Json(product)))
}

#[utoipa::path(
    put,
    path = "/api/admin/products/{id}",
    tag = "Admin",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Product ID")),
    request_body = ProductRequest,
    responses(
        (status = 200, description = "Product updated", body = ProductWithCourses),
        (status = 404, description = "Product not found")
    )
)]
pub async fn update_product(
    Extension(viewer): Extension<Viewer>,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    ValidatedJson(req): ValidatedJson<ProductRequest>,
) -> AppResult<Json<ProductWithCourses>> {
    let product = state
        .services
        .products()
        .update_product(viewer, id, req.into())
        .await?;
    Ok(Json(product))
}

/// Delete a product that nobody has bought
#[utoipa::path(
    delete,
    path = "/api/admin/products/{id}",
    tag = "Admin",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Product ID")),
    responses(
        (status = 204, description = "Product deleted"),
        (status = 400, description = "Product has purchases"),
        (status = 404, description = "Product not found")
    )
)]
pub async fn delete_product(
    Extension(viewer): Extension<Viewer>,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<StatusCode> {
    state.services.products().delete_product(viewer, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    get,
    path = "/api/products",
    tag = "Products",
    responses(
        (status = 200, description = "Public products ordered by name", body = Vec<Product>)
    )
)]
pub async fn list_public_products(
    State(state): State<AppState>,
) -> AppResult<Json<Vec<Product>>> {
    let products = state.services.products().list_public_products().await?;
    Ok(Json(products))
}

#[utoipa::path(
    get,
    path = "/api/products/{id}",
    tag = "Products",
    params(("id" = Uuid, Path, description = "Product ID")),
    responses(
        (status = 200, description = "Product with visible course outlines", body = ProductPage),
        (status = 404, description = "Product not found")
    )
)]
pub async fn get_public_product(
    Extension(viewer): Extension<Viewer>,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ProductPage>> {
    let page = state.services.products().get_public_product(viewer, id).await?;
    Ok(Json(page))
}

/// Start an embedded checkout for a product
#[utoipa::path(
    post,
    path = "/api/products/{id}/checkout",
    tag = "Products",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Product ID")),
    responses(
        (status = 200, description = "Checkout session created", body = CheckoutResponse),
        (status = 401, description = "Not signed in"),
        (status = 409, description = "Product already owned")
    )
)]
pub async fn create_checkout(
    Extension(viewer): Extension<Viewer>,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<CheckoutResponse>> {
    let client_secret = state.services.checkout().create_checkout(viewer, id).await?;
    Ok(Json(CheckoutResponse { client_secret }))
}

#[utoipa::path(
    get,
    path = "/api/products/{id}/ownership",
    tag = "Products",
    params(("id" = Uuid, Path, description = "Product ID")),
    responses(
        (status = 200, description = "Whether the viewer owns the product", body = OwnershipResponse)
    )
)]
pub async fn get_ownership(
    Extension(viewer): Extension<Viewer>,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<OwnershipResponse>> {
    let owned = state
        .services
        .purchases()
        .user_owns_product(viewer, id)
        .await?;
    Ok(Json(OwnershipResponse { owned }))
}
