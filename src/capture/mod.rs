//! Media capture unit
//!
//! Owns the microphone handle and the underlying capture primitive. Chunks of
//! PCM audio arrive asynchronously over a channel while capturing; pause
//! suspends production without closing the handle; stop flushes the final
//! buffered chunk and closes the channel. A process-wide arbiter guarantees
//! at most one live capture handle at a time.

pub mod arbiter;
pub mod backend;
pub mod blob;
pub mod scripted;

pub use arbiter::{CaptureArbiter, CaptureLease};
pub use backend::{AudioChunk, BackendFactory, CaptureBackend, CaptureConfig};
pub use blob::AudioBlob;
pub use scripted::{ScriptedBackend, ScriptedFeed};
