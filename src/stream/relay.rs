//! Upstream-to-downstream SSE relay.
//!
//! A [`RelaySession`] moves through `AwaitingHeaders -> RelayingFrames ->
//! Terminated`. [`relay_frames`] turns the upstream body into a stream that
//! yields exactly one item per frame; the server writes each item out as soon
//! as it is produced, so every frame reaches the client without batching.

use std::fmt;
use std::pin::Pin;
use std::time::Duration;

use bytes::Bytes;
use futures_util::{Stream, StreamExt};
use http::HeaderMap;
use tokio::time::Instant;

use super::framing::{contains_sentinel, FrameBuffer};
use crate::error::RelayError;
use crate::observability::log_session_complete;

const INITIAL_BUFFER_CAPACITY: usize = 4096;

/// Why a relay session stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    /// A frame carried the `[DONE]` sentinel.
    Done,
    /// Upstream closed the body without a sentinel.
    Eof,
    /// Reading the upstream body failed.
    ReadError,
    /// The session deadline elapsed.
    TimedOut,
    /// The session ended before upstream headers arrived.
    Failed,
    /// The downstream client went away first.
    Cancelled,
}

impl fmt::Display for Termination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Termination::Done => write!(f, "done"),
            Termination::Eof => write!(f, "eof"),
            Termination::ReadError => write!(f, "read_error"),
            Termination::TimedOut => write!(f, "timed_out"),
            Termination::Failed => write!(f, "failed"),
            Termination::Cancelled => write!(f, "cancelled"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayPhase {
    AwaitingHeaders,
    RelayingFrames,
    Terminated(Termination),
}

/// Per-request relay state. Owned by the handler until headers arrive, then
/// by the downstream body stream.
#[derive(Debug)]
pub struct RelaySession {
    id: u64,
    started: Instant,
    deadline: Instant,
    phase: RelayPhase,
    frames: u64,
    bytes: u64,
}

impl RelaySession {
    #[must_use]
    pub fn start(id: u64, timeout: Duration) -> Self {
        let started = Instant::now();
        Self {
            id,
            started,
            deadline: started + timeout,
            phase: RelayPhase::AwaitingHeaders,
            frames: 0,
            bytes: 0,
        }
    }

    #[must_use]
    pub fn id(&self) -> u64 {
        self.id
    }

    #[must_use]
    pub fn deadline(&self) -> Instant {
        self.deadline
    }

    #[must_use]
    pub fn phase(&self) -> RelayPhase {
        self.phase
    }

    pub fn headers_received(&mut self, status: http::StatusCode) {
        if !status.is_success() {
            tracing::warn!(
                session = self.id,
                status = status.as_u16(),
                "upstream answered with non-success status, relaying body as-is"
            );
        } else {
            tracing::debug!(session = self.id, status = status.as_u16(), "upstream headers received");
        }
        self.phase = RelayPhase::RelayingFrames;
    }

    fn record_frame(&mut self, frame: &[u8]) {
        self.frames += 1;
        self.bytes += frame.len() as u64;
    }

    /// Move to `Terminated(reason)` and log the outcome. Later calls are no-ops.
    pub fn finish(&mut self, reason: Termination) {
        if matches!(self.phase, RelayPhase::Terminated(_)) {
            return;
        }
        self.phase = RelayPhase::Terminated(reason);
        log_session_complete(
            self.id,
            reason,
            self.frames,
            self.bytes,
            self.started.elapsed(),
        );
    }
}

impl Drop for RelaySession {
    fn drop(&mut self) {
        self.finish(Termination::Cancelled);
    }
}

/// Copy upstream response headers onto the downstream response.
///
/// One value per name; the first value seen for a name wins and later values
/// are skipped. `content-length` and `transfer-encoding` describe the upstream
/// body framing and are left for the server to recompute, since the relayed
/// body may stop early at the sentinel.
pub fn mirror_headers(upstream: &HeaderMap, downstream: &mut HeaderMap) {
    for (name, value) in upstream {
        if name == http::header::CONTENT_LENGTH || name == http::header::TRANSFER_ENCODING {
            continue;
        }
        if downstream.contains_key(name) {
            continue;
        }
        downstream.insert(name.clone(), value.clone());
    }
}

type UpstreamBody<E> = Pin<Box<dyn Stream<Item = Result<Bytes, E>> + Send>>;

struct RelayState<E> {
    upstream: Option<UpstreamBody<E>>,
    buffer: FrameBuffer,
    max_frame_bytes: usize,
    session: RelaySession,
}

impl<E> RelayState<E> {
    /// Drop the upstream body, which closes the connection, and end the session.
    fn close_upstream(&mut self, reason: Termination) {
        if self.upstream.take().is_some() {
            tracing::debug!(session = self.session.id, reason = %reason, "upstream body released");
        }
        self.session.finish(reason);
    }

    fn emit(&mut self, frame: Bytes) -> Bytes {
        self.session.record_frame(&frame);
        if contains_sentinel(&frame) {
            self.close_upstream(Termination::Done);
        }
        frame
    }
}

/// Re-frame `upstream` into one downstream chunk per SSE frame.
///
/// The stream ends after the frame containing `[DONE]`, or when upstream
/// closes (any unterminated residue is forwarded as a final frame). A read
/// failure, a pending frame growing past `max_frame_bytes`, or the session
/// deadline ends it with an error item, which makes the server abort the
/// connection; nothing is forwarded after that.
pub fn relay_frames<S, E>(
    session: RelaySession,
    upstream: S,
    max_frame_bytes: usize,
) -> impl Stream<Item = Result<Bytes, std::io::Error>> + Send
where
    S: Stream<Item = Result<Bytes, E>> + Send + 'static,
    E: fmt::Display + Send + 'static,
{
    let body: UpstreamBody<E> = Box::pin(upstream);
    let state = RelayState {
        upstream: Some(body),
        buffer: FrameBuffer::with_capacity(INITIAL_BUFFER_CAPACITY.min(max_frame_bytes)),
        max_frame_bytes,
        session,
    };

    futures_util::stream::unfold(state, |mut state| async move {
        loop {
            if state.upstream.is_none() {
                return None;
            }

            if let Some(frame) = state.buffer.next_frame(false) {
                let frame = state.emit(frame);
                return Some((Ok(frame), state));
            }

            if state.buffer.len() > state.max_frame_bytes {
                tracing::error!(
                    session = state.session.id,
                    buffered = state.buffer.len(),
                    limit = state.max_frame_bytes,
                    "upstream frame exceeds size limit"
                );
                state.close_upstream(Termination::ReadError);
                let err = RelayError::Read(format!(
                    "frame exceeds {} bytes without a delimiter",
                    state.max_frame_bytes
                ));
                return Some((Err(err.into()), state));
            }

            let deadline = state.session.deadline;
            let next = match state.upstream.as_mut() {
                Some(upstream) => tokio::time::timeout_at(deadline, upstream.next()).await,
                None => return None,
            };

            match next {
                Ok(Some(Ok(chunk))) => state.buffer.extend(&chunk),
                Ok(Some(Err(err))) => {
                    tracing::error!(session = state.session.id, error = %err, "failed to read upstream stream");
                    state.close_upstream(Termination::ReadError);
                    let err = RelayError::Read(err.to_string());
                    return Some((Err(err.into()), state));
                }
                Ok(None) => {
                    let residue = state.buffer.next_frame(true);
                    let Some(frame) = residue else {
                        state.close_upstream(Termination::Eof);
                        return None;
                    };
                    let frame = state.emit(frame);
                    state.close_upstream(Termination::Eof);
                    return Some((Ok(frame), state));
                }
                Err(_) => {
                    tracing::error!(
                        session = state.session.id,
                        buffered = state.buffer.len(),
                        "relay session deadline elapsed mid-stream"
                    );
                    state.close_upstream(Termination::TimedOut);
                    return Some((Err(RelayError::Timeout.into()), state));
                }
            }
        }
    })
}
