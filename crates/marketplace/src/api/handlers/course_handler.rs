//! Course and section handlers.

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
use domain::{
    Course, CourseInput, CourseLayout, CourseOutline, CourseSection, CourseSummary,
    CourseTableRow, SectionInput, SectionStatus, UserCourseProgress, Viewer,
};

use crate::api::extractors::ValidatedJson;
use crate::api::AppState;

/// Course create/update request
#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CourseRequest {
    #[validate(length(min = 1, message = "Name is required"))]
    #[schema(example = "Rust for Web Developers")]
    pub name: String,
    #[validate(length(min = 1, message = "Description is required"))]
    pub description: String,
}

impl From<CourseRequest> for CourseInput {
    fn from(req: CourseRequest) -> Self {
        CourseInput {
            name: req.name,
            description: req.description,
        }
    }
}

/// Section create/update request
#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SectionRequest {
    #[validate(length(min = 1, message = "Name is required"))]
    #[schema(example = "Getting started")]
    pub name: String,
    pub status: SectionStatus,
}

impl From<SectionRequest> for SectionInput {
    fn from(req: SectionRequest) -> Self {
        SectionInput {
            name: req.name,
            status: req.status,
        }
    }
}

/// New display order, first id first
#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReorderRequest {
    pub ids: Vec<Uuid>,
}

/// Catalog administration routes for courses and sections
pub fn admin_course_routes() -> Router<AppState> {
    Router::new()
        .route("/courses", get(list_course_table).post(create_course))
        .route("/courses/summaries", get(list_course_summaries))
        .route(
            "/courses/:id",
            get(get_course_for_edit).put(update_course).delete(delete_course),
        )
        .route("/courses/:id/sections", post(create_section))
        .route("/sections/order", put(reorder_sections))
        .route("/sections/:id", put(update_section).delete(delete_section))
}

/// Consumer course routes
pub fn course_routes() -> Router<AppState> {
    Router::new()
        .route("/courses", get(list_user_courses))
        .route("/courses/:id", get(get_course_layout))
}

/// Course table with section, lesson and student counts
#[utoipa::path(
    get,
    path = "/api/admin/courses",
    tag = "Admin",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Course table", body = Vec<CourseTableRow>),
        (status = 404, description = "Not an administrator")
    )
)]
pub async fn list_course_table(
    Extension(viewer): Extension<Viewer>,
    State(state): State<AppState>,
) -> AppResult<Json<Vec<CourseTableRow>>> {
    let rows = state.services.courses().list_course_table(viewer).await?;
    Ok(Json(rows))
}

/// Course names for product forms
#[utoipa::path(
    get,
    path = "/api/admin/courses/summaries",
    tag = "Admin",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Course summaries", body = Vec<CourseSummary>)
    )
)]
pub async fn list_course_summaries(
    Extension(viewer): Extension<Viewer>,
    State(state): State<AppState>,
) -> AppResult<Json<Vec<CourseSummary>>> {
    let summaries = state.services.courses().list_course_summaries(viewer).await?;
    Ok(Json(summaries))
}

/// Course with every section and lesson
#[utoipa::path(
    get,
    path = "/api/admin/courses/{id}",
    tag = "Admin",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Course ID")),
    responses(
        (status = 200, description = "Full course outline", body = CourseOutline),
        (status = 404, description = "Course not found")
    )
)]
pub async fn get_course_for_edit(
    Extension(viewer): Extension<Viewer>,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<CourseOutline>> {
    let outline = state.services.courses().get_course_for_edit(viewer, id).await?;
    Ok(Json(outline))
}

#[utoipa::path(
    post,
    path = "/api/admin/courses",
    tag = "Admin",
    security(("bearer_auth" = [])),
    request_body = CourseRequest,
    responses(
        (status = 201, description = "Course created", body = Course),
        (status = 400, description = "Validation error")
    )
)]
pub async fn create_course(
    Extension(viewer): Extension<Viewer>,
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<CourseRequest>,
) -> AppResult<(StatusCode, Json<Course>)> {
    let course = state.services.courses().create_course(viewer, req.into()).await?;
    Ok((StatusCode::CREATED, Json(course)))
}

#[utoipa::path(
    put,
    path = "/api/admin/courses/{id}",
    tag = "Admin",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Course ID")),
    request_body = CourseRequest,
    responses(
        (status = 200, description = "Course updated", body = Course),
        (status = 404, description = "Course not found")
    )
)]
pub async fn update_course(
    Extension(viewer): Extension<Viewer>,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    ValidatedJson(req): ValidatedJson<CourseRequest>,
) -> AppResult<Json<Course>> {
    let course = state
        .services
        .courses()
        .update_course(viewer, id, req.into())
        .await?;
    Ok(Json(course))
}

/// Delete a course with its sections, lessons and access grants
#[utoipa::path(
    delete,
    path = "/api/admin/courses/{id}",
    tag = "Admin",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Course ID")),
    responses(
        (status = 204, description = "Course deleted"),
        (status = 404, description = "Course not found")
    )
)]
pub async fn delete_course(
    Extension(viewer): Extension<Viewer>,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<StatusCode> {
    state.services.courses().delete_course(viewer, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    post,
    path = "/api/admin/courses/{id}/sections",
    tag = "Admin",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Course ID")),
    request_body = SectionRequest,
    responses(
        (status = 201, description = "Section appended", body = CourseSection),
        (status = 404, description = "Course not found")
    )
)]
pub async fn create_section(
    Extension(viewer): Extension<Viewer>,
    State(state): State<AppState>,
    Path(course_id): Path<Uuid>,
    ValidatedJson(req): ValidatedJson<SectionRequest>,
) -> AppResult<(StatusCode, Json<CourseSection>)> {
    let section = state
        .services
        .courses()
        .create_section(viewer, course_id, req.into())
        .await?;
    Ok((StatusCode::CREATED, Json(section)))
}

#[utoipa::path(
    put,
    path = "/api/admin/sections/{id}",
    tag = "Admin",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Section ID")),
    request_body = SectionRequest,
    responses(
        (status = 200, description = "Section updated", body = CourseSection),
        (status = 404, description = "Section not found")
    )
)]
pub async fn update_section(
    Extension(viewer): Extension<Viewer>,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    ValidatedJson(req): ValidatedJson<SectionRequest>,
) -> AppResult<Json<CourseSection>> {
    let section = state
        .services
        .courses()
        .update_section(viewer, id, req.into())
        .await?;
    Ok(Json(section))
}

#[utoipa::path(
    delete,
    path = "/api/admin/sections/{id}",
    tag = "Admin",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Section ID")),
    responses(
        (status = 204, description = "Section deleted"),
        (status = 404, description = "Section not found")
    )
)]
pub async fn delete_section(
    Extension(viewer): Extension<Viewer>,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<StatusCode> {
    state.services.courses().delete_section(viewer, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    put,
    path = "/api/admin/sections/order",
    tag = "Admin",
    security(("bearer_auth" = [])),
    request_body = ReorderRequest,
    responses(
        (status = 204, description = "Sections reordered"),
        (status = 400, description = "Empty id list")
    )
)]
pub async fn reorder_sections(
    Extension(viewer): Extension<Viewer>,
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<ReorderRequest>,
) -> AppResult<StatusCode> {
    state.services.courses().reorder_sections(viewer, req.ids).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Courses the viewer holds access to, with progress
#[utoipa::path(
    get,
    path = "/api/courses",
    tag = "Courses",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Owned courses", body = Vec<UserCourseProgress>),
        (status = 401, description = "Not signed in")
    )
)]
pub async fn list_user_courses(
    Extension(viewer): Extension<Viewer>,
    State(state): State<AppState>,
) -> AppResult<Json<Vec<UserCourseProgress>>> {
    let courses = state.services.courses().list_user_courses(viewer).await?;
    Ok(Json(courses))
}

/// Course outline as the viewer may see it
#[utoipa::path(
    get,
    path = "/api/courses/{id}",
    tag = "Courses",
    params(("id" = Uuid, Path, description = "Course ID")),
    responses(
        (status = 200, description = "Visible course layout", body = CourseLayout),
        (status = 404, description = "Course not found")
    )
)]
pub async fn get_course_layout(
    Extension(viewer): Extension<Viewer>,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<CourseLayout>> {
    let layout = state.services.courses().get_course_layout(viewer, id).await?;
    Ok(Json(layout))
}
