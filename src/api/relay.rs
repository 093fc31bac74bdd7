use std::sync::Arc;

use axum::body::Body;
use axum::response::{IntoResponse, Response};

use crate::error::RelayError;
use crate::state::AppState;
use crate::stream::{mirror_headers, relay_frames, RelayPhase, RelaySession, Termination};
use crate::transport::UpstreamRequest;

/// Relay handler: open one upstream stream and relay it frame by frame.
///
/// Failures before the upstream answers become a 500; anything after that can
/// only end the stream.
pub async fn handler(state: Arc<AppState>) -> Response {
    let mut session = state.start_session();
    tracing::info!(
        session = session.id(),
        upstream = state.config.upstream.url(),
        "relay session started"
    );

    let opened = open_upstream(&state, &session).await;
    match opened {
        Ok(upstream) => relay_response(session, upstream, state.config.server.max_frame_bytes),
        Err(err) => {
            debug_assert!(err.is_pre_stream());
            tracing::error!(session = session.id(), error = %err, "relay session rejected");
            session.finish(Termination::Failed);
            err.into_response()
        }
    }
}

async fn open_upstream(
    state: &AppState,
    session: &RelaySession,
) -> Result<reqwest::Response, RelayError> {
    let request = UpstreamRequest::from_config(&state.config.upstream)?;
    state
        .transport
        .send_stream(&request, session.deadline())
        .await
}

fn relay_response(
    mut session: RelaySession,
    upstream: reqwest::Response,
    max_frame_bytes: usize,
) -> Response {
    debug_assert_eq!(session.phase(), RelayPhase::AwaitingHeaders);
    session.headers_received(upstream.status());

    let mut response = Response::new(Body::empty());
    mirror_headers(upstream.headers(), response.headers_mut());

    let frames = relay_frames(session, upstream.bytes_stream(), max_frame_bytes);
    *response.body_mut() = Body::from_stream(frames);
    response
}
