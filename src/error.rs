use axum::response::{IntoResponse, Response};

/// Error type for one relay session.
///
/// Every variant except [`RelayError::Read`] happens before the first byte is
/// written downstream and is turned into a 500 response. `Read` only occurs
/// once streaming has started and can only end the stream.
#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    #[error("Failed to encode upstream payload: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("Failed to build upstream request: {0}")]
    RequestBuild(String),
    #[error("Upstream dispatch failed: {0}")]
    Dispatch(String),
    #[error("Upstream did not respond before the session deadline")]
    Timeout,
    #[error("Upstream stream read failed: {0}")]
    Read(String),
}

impl RelayError {
    /// Whether this error can still be reported with a status code.
    #[must_use]
    pub fn is_pre_stream(&self) -> bool {
        !matches!(self, RelayError::Read(_))
    }

    #[must_use]
    pub fn status(&self) -> http::StatusCode {
        http::StatusCode::INTERNAL_SERVER_ERROR
    }
}

impl From<RelayError> for std::io::Error {
    fn from(err: RelayError) -> Self {
        let kind = match err {
            RelayError::Timeout => std::io::ErrorKind::TimedOut,
            _ => std::io::ErrorKind::Other,
        };
        std::io::Error::new(kind, err.to_string())
    }
}

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        let status = self.status();
        let mut body = self.to_string();
        body.push('\n');
        (
            status,
            [(
                http::header::CONTENT_TYPE,
                http::HeaderValue::from_static("text/plain; charset=utf-8"),
            )],
            body,
        )
            .into_response()
    }
}
