//! Double-newline SSE frame splitting.
//!
//! A frame is every byte up to and including the first `\n\n`. Bytes that
//! never see a delimiter are emitted as one final frame once the input ends,
//! so concatenating all frames always reproduces the input exactly.

use bytes::{Bytes, BytesMut};
use memchr::memmem;
use std::sync::LazyLock;

const FRAME_DELIMITER: &[u8] = b"\n\n";
const SENTINEL: &[u8] = b"[DONE]";

static DELIMITER_FINDER: LazyLock<memmem::Finder<'static>> =
    LazyLock::new(|| memmem::Finder::new(FRAME_DELIMITER));
static SENTINEL_FINDER: LazyLock<memmem::Finder<'static>> =
    LazyLock::new(|| memmem::Finder::new(SENTINEL));

/// Outcome of one splitter call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Split {
    /// No complete frame yet; read more bytes and call again.
    NeedMore,
    /// `buf[..advance]` is the next frame; drop those bytes from the buffer.
    Frame { advance: usize },
    /// Input ended with nothing buffered.
    Finished,
}

/// Decide how many bytes of `buf` make up the next frame.
///
/// `at_eof` means no more bytes will ever be appended to `buf`.
#[must_use]
pub fn split_frame(buf: &[u8], at_eof: bool) -> Split {
    split_frame_from(buf, 0, at_eof)
}

/// Same as [`split_frame`], but skips the first `scan_from` bytes when
/// looking for the delimiter.
///
/// Callers pass the length of the buffer at the previous `NeedMore` minus one,
/// so a delimiter whose first byte arrived in the earlier read is still found.
#[must_use]
pub fn split_frame_from(buf: &[u8], scan_from: usize, at_eof: bool) -> Split {
    if at_eof && buf.is_empty() {
        return Split::Finished;
    }

    let scan_from = scan_from.min(buf.len());
    if let Some(pos) = DELIMITER_FINDER.find(&buf[scan_from..]) {
        return Split::Frame {
            advance: scan_from + pos + FRAME_DELIMITER.len(),
        };
    }

    if at_eof {
        Split::Frame { advance: buf.len() }
    } else {
        Split::NeedMore
    }
}

/// Whether `frame` carries the `[DONE]` end-of-stream marker anywhere.
#[inline]
#[must_use]
pub fn contains_sentinel(frame: &[u8]) -> bool {
    SENTINEL_FINDER.find(frame).is_some()
}

/// Accumulating read buffer driving [`split_frame_from`].
#[derive(Debug, Default)]
pub struct FrameBuffer {
    buffer: BytesMut,
    scan_from: usize,
}

impl FrameBuffer {
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buffer: BytesMut::with_capacity(capacity),
            scan_from: 0,
        }
    }

    pub fn extend(&mut self, chunk: &[u8]) {
        self.buffer.extend_from_slice(chunk);
    }

    /// Cut the next frame off the front of the buffer, if one is available.
    ///
    /// Returns `None` both when more input is needed and when `at_eof` is set
    /// and the buffer is drained.
    pub fn next_frame(&mut self, at_eof: bool) -> Option<Bytes> {
        match split_frame_from(&self.buffer, self.scan_from, at_eof) {
            Split::Frame { advance } => {
                self.scan_from = 0;
                Some(self.buffer.split_to(advance).freeze())
            }
            Split::NeedMore => {
                self.scan_from = self.buffer.len().saturating_sub(FRAME_DELIMITER.len() - 1);
                None
            }
            Split::Finished => None,
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }
}
