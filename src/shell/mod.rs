//! Recorder shells: the two configurations of the pipeline
//!
//! `EncounterRecorder` drives one full-encounter recording whose transcript
//! populates multiple structured note fields. `DictationManager` owns one
//! recorder per dictated field and routes transcripts through the
//! cursor-aware insertion engine. Both share one capture-arbiter domain, so
//! at most one microphone handle is live across the whole app, and both
//! surface submission failures through the same recovery phases.

mod dictation;
mod encounter;

pub use dictation::DictationManager;
pub use encounter::{CompletionCallback, EncounterRecorder};

/// User-visible submission status: nothing pending, spinner, or an error
/// with its recovery actions (retry with retained audio, or start fresh).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmissionPhase {
    Ready,
    InProgress,
    Failed { message: String },
}

impl SubmissionPhase {
    pub fn is_failed(&self) -> bool {
        matches!(self, SubmissionPhase::Failed { .. })
    }
}
