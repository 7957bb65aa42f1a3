//! Recording session management
//!
//! This module provides the `RecordingSession` abstraction that manages:
//! - The recording state machine (idle → recording ⇄ paused → stopped)
//! - Chunk accumulation across pause/resume into one contiguous recording
//! - Elapsed-time ticking, frozen while paused
//! - Exclusive ownership of the capture handle via the arbiter
//! - Blob finalization and retention for resend

mod machine;
mod session;
mod stats;

pub use machine::RecordingState;
pub use session::RecordingSession;
pub use stats::SessionStats;
