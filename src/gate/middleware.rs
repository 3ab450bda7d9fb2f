use super::{normalize, AccessGate, Verdict};
use axum::{
    extract::{Request, State},
    http::{uri::PathAndQuery, StatusCode, Uri},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use std::sync::Arc;
use tracing::debug;

/// axum middleware running the access gate ahead of every routed handler.
///
/// The path is resolved once (dot segments, encoded dots, backslashes) and the
/// request is rewritten to it, so the gate and the handlers behind it see the
/// same path. Paths outside the inclusion filter skip the gate entirely.
pub async fn enforce(
    State(gate): State<Arc<AccessGate>>,
    mut request: Request,
    next: Next,
) -> Response {
    let Some(path) = normalize(request.uri().path()) else {
        return StatusCode::BAD_REQUEST.into_response();
    };

    if path != request.uri().path() {
        match with_path(request.uri(), &path) {
            Ok(uri) => {
                debug!("resolved path: {} -> {}", request.uri().path(), path);
                *request.uri_mut() = uri;
            }
            Err(err) => {
                debug!("unable to rewrite request path: {err}");
                return StatusCode::BAD_REQUEST.into_response();
            }
        }
    }

    if !gate.applies_to(&path) {
        return next.run(request).await;
    }

    match gate.evaluate(&path, request.headers()) {
        Verdict::Allow => next.run(request).await,
        Verdict::Redirect(location) => {
            debug!("gate redirect: {} -> {}", path, location);
            Redirect::temporary(&location).into_response()
        }
    }
}

/// Same URI with the path replaced and the query kept.
fn with_path(uri: &Uri, path: &str) -> Result<Uri, axum::http::Error> {
    let path_and_query = match uri.query() {
        Some(query) => format!("{path}?{query}"),
        None => path.to_string(),
    };

    let mut parts = uri.clone().into_parts();
    parts.path_and_query = Some(PathAndQuery::try_from(path_and_query)?);

    Ok(Uri::from_parts(parts)?)
}
