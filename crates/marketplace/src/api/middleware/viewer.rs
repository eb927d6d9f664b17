//! Viewer resolution middleware.

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use axum_extra::{
    headers::{authorization::Bearer, Authorization},
    TypedHeader,
};

use crate::api::AppState;
use domain::Viewer;

/// Resolve the viewer for every request and store it in the extensions.
///
/// A missing or rejected token yields an anonymous viewer; handlers decide
/// whether that is enough.
pub async fn viewer_middleware(
    State(state): State<AppState>,
    bearer: Option<TypedHeader<Authorization<Bearer>>>,
    mut request: Request,
    next: Next,
) -> Response {
    let token = bearer.map(|TypedHeader(auth)| auth.token().to_string());

    let viewer = match state.identity.resolve_viewer(token).await {
        Ok(viewer) => viewer,
        Err(e) => {
            tracing::debug!(error = %e, "Identity resolution failed, continuing anonymously");
            Viewer::anonymous()
        }
    };

    request.extensions_mut().insert(viewer);
    next.run(request).await
}
