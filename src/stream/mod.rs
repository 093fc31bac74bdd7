pub mod framing;
pub mod relay;

pub use framing::{contains_sentinel, split_frame, split_frame_from, FrameBuffer, Split};
pub use relay::{mirror_headers, relay_frames, RelayPhase, RelaySession, Termination};
