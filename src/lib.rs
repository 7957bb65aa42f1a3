pub mod capture;
pub mod config;
pub mod dictation;
pub mod error;
pub mod session;
pub mod shell;
pub mod transcribe;

pub use capture::{
    AudioBlob, AudioChunk, BackendFactory, CaptureArbiter, CaptureBackend, CaptureConfig,
    CaptureLease, ScriptedBackend, ScriptedFeed,
};
pub use config::Config;
pub use dictation::{CursorTracker, FieldSurface, RenderScheduler, TextField};
pub use error::{CaptureError, ScribeError, SessionError, TranscribeError};
pub use session::{RecordingSession, RecordingState, SessionStats};
pub use shell::{DictationManager, EncounterRecorder, SubmissionPhase};
pub use transcribe::{
    DocumentFields, EncounterMetadata, EncounterTranscript, SubmissionGate, TranscribeClient,
};
