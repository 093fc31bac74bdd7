use std::io::ErrorKind;
use std::sync::Arc;

use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};

use crate::state::AppState;

/// Serve the landing page from `server.index_path`.
pub async fn handler(state: Arc<AppState>) -> Response {
    let path = &state.config.server.index_path;
    match tokio::fs::read(path).await {
        Ok(contents) => (
            [(
                header::CONTENT_TYPE,
                HeaderValue::from_static("text/html; charset=utf-8"),
            )],
            contents,
        )
            .into_response(),
        Err(err) if err.kind() == ErrorKind::NotFound => {
            tracing::warn!(path = %path, "landing page not found");
            StatusCode::NOT_FOUND.into_response()
        }
        Err(err) => {
            tracing::error!(path = %path, error = %err, "failed to read landing page");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}
