//! Purchase and sales handlers.

use axum::{
    extract::{Extension, Path, State},
    response::Json,
    routing::get,
    Router,
};
use uuid::Uuid;

use common::AppResult;
use domain::{Purchase, PurchaseReceipt, SaleRow, Viewer};

use crate::api::AppState;

pub fn purchase_routes() -> Router<AppState> {
    Router::new()
        .route("/purchases", get(list_user_purchases))
        .route("/purchases/:id", get(get_user_purchase))
}

pub fn admin_sales_routes() -> Router<AppState> {
    Router::new().route("/sales", get(list_sales))
}

/// The viewer's purchase history, newest first
#[utoipa::path(
    get,
    path = "/api/purchases",
    tag = "Purchases",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Purchase history", body = Vec<Purchase>),
        (status = 401, description = "Not signed in")
    )
)]
pub async fn list_user_purchases(
    Extension(viewer): Extension<Viewer>,
    State(state): State<AppState>,
) -> AppResult<Json<Vec<Purchase>>> {
    let purchases = state.services.purchases().list_user_purchases(viewer).await?;
    Ok(Json(purchases))
}

/// A purchase receipt with pricing rows when the processor answers
#[utoipa::path(
    get,
    path = "/api/purchases/{id}",
    tag = "Purchases",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Purchase ID")),
    responses(
        (status = 200, description = "Purchase receipt", body = PurchaseReceipt),
        (status = 404, description = "Purchase not found")
    )
)]
pub async fn get_user_purchase(
    Extension(viewer): Extension<Viewer>,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<PurchaseReceipt>> {
    let receipt = state
        .services
        .purchases()
        .get_user_purchase(viewer, id)
        .await?;
    Ok(Json(receipt))
}

#[utoipa::path(
    get,
    path = "/api/admin/sales",
    tag = "Admin",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "All purchases with customer names", body = Vec<SaleRow>)
    )
)]
pub async fn list_sales(
    Extension(viewer): Extension<Viewer>,
    State(state): State<AppState>,
) -> AppResult<Json<Vec<SaleRow>>> {
    let sales = state.services.purchases().list_sales(viewer).await?;
    Ok(Json(sales))
}
