//! User handlers.

use axum::{
    extract::{Extension, State},
    response::Json,
    routing::get,
    Router,
};

use common::AppResult;
use domain::{User, Viewer};

use crate::api::AppState;

pub fn user_routes() -> Router<AppState> {
    Router::new().route("/me", get(get_current_user))
}

/// Get the signed-in user
#[utoipa::path(
    get,
    path = "/api/me",
    tag = "Users",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Current user", body = User),
        (status = 401, description = "Not signed in")
    )
)]
pub async fn get_current_user(
    Extension(viewer): Extension<Viewer>,
    State(state): State<AppState>,
) -> AppResult<Json<User>> {
    let user = state.services.users().current_user(viewer).await?;
    Ok(Json(user))
}
