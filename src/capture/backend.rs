use crate::error::CaptureError;
use std::sync::Arc;
use tokio::sync::mpsc;

/// One fragment of audio delivered incrementally by the capture primitive
/// while recording is active.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioChunk {
    /// Monotonic sequence number within one backend's lifetime
    pub seq: u64,
    /// Raw audio samples (i16 PCM, interleaved)
    pub samples: Vec<i16>,
    /// Sample rate in Hz
    pub sample_rate: u32,
    /// Number of channels
    pub channels: u16,
}

impl AudioChunk {
    pub fn duration_ms(&self) -> u64 {
        if self.sample_rate == 0 || self.channels == 0 {
            return 0;
        }
        let frames = self.samples.len() as u64 / self.channels as u64;
        frames * 1000 / self.sample_rate as u64
    }
}

/// Configuration for a capture backend
#[derive(Debug, Clone)]
pub struct CaptureConfig {
    /// Target sample rate in Hz
    pub sample_rate: u32,
    /// Target channel count (1 = mono)
    pub channels: u16,
    /// Nominal duration of each delivered chunk
    pub chunk_duration_ms: u64,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            sample_rate: 16000, // transcription services expect 16kHz
            channels: 1,        // mono
            chunk_duration_ms: 1000,
        }
    }
}

/// Audio capture backend trait
///
/// Implementations wrap a concrete capture primitive (device capture, a file,
/// or a scripted source for tests). Chunks arrive on the channel returned by
/// `start()`; `stop()` flushes any buffered-but-undelivered data into the
/// channel before closing it, which is why callers must drain the channel to
/// completion after stopping rather than reading a result synchronously.
#[async_trait::async_trait]
pub trait CaptureBackend: Send + Sync {
    /// Request device access and begin capturing.
    ///
    /// Fails with `CaptureError::PermissionDenied` when the platform refuses
    /// access; no handle is retained on that path.
    async fn start(&mut self) -> Result<mpsc::Receiver<AudioChunk>, CaptureError>;

    /// Suspend chunk production without closing the handle.
    fn pause(&mut self);

    /// Continue producing chunks into the same logical recording.
    fn resume(&mut self);

    /// Flush the final buffered chunk, close the handle, and release all
    /// underlying tracks. The chunk channel closes once the flush is in.
    async fn stop(&mut self) -> Result<(), CaptureError>;

    /// Whether the backend currently holds a live handle
    fn is_capturing(&self) -> bool;

    /// Backend name for logging
    fn name(&self) -> &str;
}

/// Constructor for capture backends, so shells can re-create a backend for
/// each recording run (start-fresh, retry after permission denial).
pub type BackendFactory = Arc<dyn Fn(&CaptureConfig) -> Box<dyn CaptureBackend> + Send + Sync>;
