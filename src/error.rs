use crate::session::RecordingState;
use thiserror::Error;

/// Errors raised by the media capture unit.
#[derive(Debug, Error)]
pub enum CaptureError {
    /// Device access was refused, or audio capture is unsupported on this
    /// platform. Recoverable by the user retrying `start()`.
    #[error("microphone permission denied or capture unsupported")]
    PermissionDenied,

    /// Another session already holds the capture device. The arbiter enforces
    /// one active capture handle per domain.
    #[error("another session already holds the capture device")]
    AlreadyActive,

    /// The capture backend was stopped or dropped and can no longer produce
    /// chunks.
    #[error("capture backend is closed")]
    Closed,

    #[error("failed to encode audio: {0}")]
    Encode(#[from] hound::Error),

    #[error("failed to read audio file: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors raised by the transcription submission pipeline.
#[derive(Debug, Error)]
pub enum TranscribeError {
    /// Submission attempted with no recorded or uploaded audio. Local
    /// validation; never reaches the network.
    #[error("no audio data to submit")]
    NoAudioData,

    /// A second submission was attempted while one is in flight.
    #[error("a submission is already in progress")]
    SubmissionInProgress,

    /// Transport-level failure reaching the endpoint (timeout, refused
    /// connection). Retryable with the retained blob.
    #[error("transcription request failed to reach the service: {0}")]
    Network(#[from] reqwest::Error),

    /// The endpoint was reached but reported failure, either as a non-success
    /// HTTP status or as an `error` field inside a 200 payload. Both surface
    /// the same way to the caller.
    #[error("transcription failed (status {status}): {message}")]
    TranscriptionFailed { status: u16, message: String },

    #[error("could not parse transcription response: {0}")]
    InvalidResponse(#[from] serde_json::Error),
}

impl TranscribeError {
    /// Whether `retry` with the retained audio makes sense for this error.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            TranscribeError::Network(_) | TranscribeError::TranscriptionFailed { .. }
        )
    }
}

/// Errors raised by the recording session state machine.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("cannot {action} while session is {state:?}")]
    InvalidState {
        action: &'static str,
        state: RecordingState,
    },

    #[error(transparent)]
    Capture(#[from] CaptureError),
}

/// Top-level error for the recorder shells, which cross the session and
/// submission boundaries.
#[derive(Debug, Error)]
pub enum ScribeError {
    #[error(transparent)]
    Session(#[from] SessionError),

    #[error(transparent)]
    Transcribe(#[from] TranscribeError),
}

impl From<CaptureError> for ScribeError {
    fn from(err: CaptureError) -> Self {
        ScribeError::Session(SessionError::Capture(err))
    }
}
