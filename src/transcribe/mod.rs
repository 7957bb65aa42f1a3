//! Transcription submission pipeline
//!
//! Packages accumulated audio plus encounter metadata into multipart
//! requests against the transcription service:
//! - POST /api/transcribe/audio — full-encounter, multi-field response
//! - POST /api/transcribe/dictate — per-field dictation, plain transcript
//! - POST /api/transcribe/process-document — document field extraction
//!
//! A request is only ever built from a finalized blob; a 200 payload whose
//! `error` field is set counts as a failed transcription, distinct from
//! transport failure but surfaced identically to the caller.

mod client;
mod gate;
mod types;

pub use client::TranscribeClient;
pub use gate::{SubmissionGate, SubmissionTicket};
pub use types::{DocumentFields, EncounterMetadata, EncounterTranscript};
