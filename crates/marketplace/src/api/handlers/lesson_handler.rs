//! Lesson handlers.

use axum::{
    extract::{Extension, Path, State},
    http::StatusCode,
    response::Json,
    routing::{get, post, put},
    Router,
};
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use common::AppResult;
use domain::{Lesson, LessonInput, LessonPage, LessonStatus, Viewer};

use super::course_handler::ReorderRequest;
use crate::api::extractors::ValidatedJson;
use crate::api::AppState;

/// Lesson create/update request
#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LessonRequest {
    pub section_id: Uuid,
    #[validate(length(min = 1, message = "Name is required"))]
    #[schema(example = "Ownership and borrowing")]
    pub name: String,
    pub status: LessonStatus,
    #[validate(length(min = 1, message = "Video reference is required"))]
    #[schema(example = "dQw4w9WgXcQ")]
    pub youtube_video_id: String,
    pub description: Option<String>,
}

impl From<LessonRequest> for LessonInput {
    fn from(req: LessonRequest) -> Self {
        LessonInput {
            section_id: req.section_id,
            name: req.name,
            status: req.status,
            youtube_video_id: req.youtube_video_id,
            description: req.description,
        }
    }
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CompletionRequest {
    pub complete: bool,
}

pub fn admin_lesson_routes() -> Router<AppState> {
    Router::new()
        .route("/lessons", post(create_lesson))
        .route("/lessons/order", put(reorder_lessons))
        .route("/lessons/:id", put(update_lesson).delete(delete_lesson))
}

pub fn lesson_routes() -> Router<AppState> {
    Router::new()
        .route("/lessons/:id", get(get_lesson_page))
        .route("/lessons/:id/complete", put(set_lesson_complete))
}

#[utoipa::path(
    post,
    path = "/api/admin/lessons",
    tag = "Admin",
    security(("bearer_auth" = [])),
    request_body = LessonRequest,
    responses(
        (status = 201, description = "Lesson appended to its section", body = Lesson),
        (status = 404, description = "Section not found")
    )
)]
pub async fn create_lesson(
    Extension(viewer): Extension<Viewer>,
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<LessonRequest>,
) -> AppResult<(StatusCode, Json<Lesson>)> {
    let lesson = state.services.lessons().create_lesson(viewer, req.into()).await?;
    Ok((StatusCode::CREATED, Json(lesson)))
}

#[utoipa::path(
    put,
    path = "/api/admin/lessons/{id}",
    tag = "Admin",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Lesson ID")),
    request_body = LessonRequest,
    responses(
        (status = 200, description = "Lesson updated", body = Lesson),
        (status = 404, description = "Lesson not found")
    )
)]
pub async fn update_lesson(
    Extension(viewer): Extension<Viewer>,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    ValidatedJson(req): ValidatedJson<LessonRequest>,
) -> AppResult<Json<Lesson>> {
    let lesson = state
        .services
        .lessons()
        .update_lesson(viewer, id, req.into())
        .await?;
    Ok(Json(lesson))
}

#[utoipa::path(
    delete,
    path = "/api/admin/lessons/{id}",
    tag = "Admin",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Lesson ID")),
    responses(
        (status = 204, description = "Lesson deleted"),
        (status = 404, description = "Lesson not found")
    )
)]
pub async fn delete_lesson(
    Extension(viewer): Extension<Viewer>,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<StatusCode> {
    state.services.lessons().delete_lesson(viewer, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    put,
    path = "/api/admin/lessons/order",
    tag = "Admin",
    security(("bearer_auth" = [])),
    request_body = ReorderRequest,
    responses(
        (status = 204, description = "Lessons reordered"),
        (status = 400, description = "Empty id list")
    )
)]
pub async fn reorder_lessons(
    Extension(viewer): Extension<Viewer>,
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<ReorderRequest>,
) -> AppResult<StatusCode> {
    state.services.lessons().reorder_lessons(viewer, req.ids).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Lesson with capabilities and its visible neighbors
#[utoipa::path(
    get,
    path = "/api/lessons/{id}",
    tag = "Lessons",
    params(("id" = Uuid, Path, description = "Lesson ID")),
    responses(
        (status = 200, description = "Lesson page", body = LessonPage),
        (status = 404, description = "Lesson not found or not visible")
    )
)]
pub async fn get_lesson_page(
    Extension(viewer): Extension<Viewer>,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<LessonPage>> {
    let page = state.services.lessons().get_lesson_page(viewer, id).await?;
    Ok(Json(page))
}

#[utoipa::path(
    put,
    path = "/api/lessons/{id}/complete",
    tag = "Lessons",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Lesson ID")),
    request_body = CompletionRequest,
    responses(
        (status = 204, description = "Completion mark updated"),
        (status = 401, description = "Not signed in"),
        (status = 404, description = "Lesson not found or not completable")
    )
)]
pub async fn set_lesson_complete(
    Extension(viewer): Extension<Viewer>,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    ValidatedJson(req): ValidatedJson<CompletionRequest>,
) -> AppResult<StatusCode> {
    state
        .services
        .lessons()
        .set_lesson_complete(viewer, id, req.complete)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
