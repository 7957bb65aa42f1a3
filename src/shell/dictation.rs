use super::SubmissionPhase;
use crate::capture::{AudioBlob, BackendFactory, CaptureArbiter, CaptureConfig};
use crate::dictation::{CursorTracker, FieldSurface, RenderScheduler};
use crate::error::{ScribeError, SessionError};
use crate::session::{RecordingSession, RecordingState};
use crate::transcribe::TranscribeClient;
use std::collections::HashMap;
use tracing::{info, warn};

/// One dictated field: its own session, cursor tracking, submission gate,
/// and deferred-refocus queue.
struct DictationRecorder {
    session: RecordingSession,
    tracker: CursorTracker,
    client: TranscribeClient,
    pending: RenderScheduler,
    phase: SubmissionPhase,
}

/// Per-field dictation configuration of the pipeline.
///
/// Owns one recorder per field key, created on demand and disposed when the
/// field set changes. All sessions share the manager's arbiter domain, so
/// starting dictation on field B while field A is mid-recording fails fast
/// with the already-active capture error instead of racing for the device.
pub struct DictationManager {
    arbiter: CaptureArbiter,
    factory: BackendFactory,
    capture: CaptureConfig,
    client: TranscribeClient,
    fields: HashMap<String, DictationRecorder>,
}

impl DictationManager {
    pub fn new(
        arbiter: CaptureArbiter,
        factory: BackendFactory,
        capture: CaptureConfig,
        client: TranscribeClient,
    ) -> Self {
        Self {
            arbiter,
            factory,
            capture,
            client,
            fields: HashMap::new(),
        }
    }

    fn recorder_mut(&mut self, field_key: &str) -> &mut DictationRecorder {
        let arbiter = self.arbiter.clone();
        let client = &self.client;
        self.fields
            .entry(field_key.to_string())
            .or_insert_with(|| {
                let mut session = RecordingSession::new(arbiter);
                session.set_identity(field_key);
                DictationRecorder {
                    session,
                    tracker: CursorTracker::new(field_key),
                    client: client.detached(),
                    pending: RenderScheduler::new(),
                    phase: SubmissionPhase::Ready,
                }
            })
    }

    /// Track the caret on field focus.
    pub fn note_focus(&mut self, field_key: &str, surface: &dyn FieldSurface) {
        let recorder = self.recorder_mut(field_key);
        recorder.tracker.note_focus(surface);
    }

    /// Track a selection or manual-edit caret move.
    pub fn note_caret(&mut self, field_key: &str, offset: usize) {
        self.recorder_mut(field_key).tracker.note_caret(offset);
    }

    pub fn state(&self, field_key: &str) -> RecordingState {
        self.fields
            .get(field_key)
            .map(|r| r.session.state())
            .unwrap_or(RecordingState::Idle)
    }

    pub fn phase(&self, field_key: &str) -> SubmissionPhase {
        self.fields
            .get(field_key)
            .map(|r| r.phase.clone())
            .unwrap_or(SubmissionPhase::Ready)
    }

    pub fn elapsed_secs(&self, field_key: &str) -> u64 {
        self.fields
            .get(field_key)
            .map(|r| r.session.elapsed_secs())
            .unwrap_or(0)
    }

    pub fn can_retry(&self, field_key: &str) -> bool {
        self.fields
            .get(field_key)
            .map(|r| r.session.last_blob().is_some())
            .unwrap_or(false)
    }

    /// Begin dictating into a field. Fails with the capture-already-active
    /// error if any other field (or the encounter recorder sharing this
    /// arbiter) holds the microphone.
    pub async fn start(&mut self, field_key: &str) -> Result<(), SessionError> {
        let backend = (self.factory)(&self.capture);
        let recorder = self.recorder_mut(field_key);
        recorder.session.start(backend).await
    }

    pub fn pause(&mut self, field_key: &str) -> Result<(), SessionError> {
        self.recorder_mut(field_key).session.pause()
    }

    pub fn resume(&mut self, field_key: &str) -> Result<(), SessionError> {
        self.recorder_mut(field_key).session.resume()
    }

    pub async fn stop(&mut self, field_key: &str) -> Result<Option<AudioBlob>, SessionError> {
        self.recorder_mut(field_key).session.stop().await
    }

    /// Stop if still capturing, submit the audio for this field, and splice
    /// the transcript into the field at the tracked caret. The caret
    /// restoration runs when the host flushes the render queue.
    pub async fn send(
        &mut self,
        field_key: &str,
        surface: &mut dyn FieldSurface,
    ) -> Result<String, ScribeError> {
        let recorder = self.recorder_mut(field_key);
        if recorder.session.state().is_active() {
            recorder.session.stop().await?;
        }
        Self::submit(recorder, field_key, surface).await
    }

    /// Re-submit the retained blob from a failed attempt for this field.
    pub async fn retry(
        &mut self,
        field_key: &str,
        surface: &mut dyn FieldSurface,
    ) -> Result<String, ScribeError> {
        info!(field_key, "retrying dictation with retained audio");
        let recorder = self.recorder_mut(field_key);
        Self::submit(recorder, field_key, surface).await
    }

    async fn submit(
        recorder: &mut DictationRecorder,
        field_key: &str,
        surface: &mut dyn FieldSurface,
    ) -> Result<String, ScribeError> {
        let blob = recorder.session.begin_submission()?;
        recorder.phase = SubmissionPhase::InProgress;

        match recorder.client.dictate(&blob, field_key).await {
            Ok(transcript) => {
                // Dictation keeps the blob: resend stays possible after
                // success as well as failure.
                recorder.session.finish_submission(false);
                recorder
                    .tracker
                    .insert_transcript(surface, &transcript, &mut recorder.pending);
                recorder.phase = SubmissionPhase::Ready;
                Ok(transcript)
            }
            Err(err) => {
                recorder.session.finish_submission(false);
                warn!(field_key, error = %err, "dictation submission failed");
                recorder.phase = SubmissionPhase::Failed {
                    message: err.to_string(),
                };
                Err(err.into())
            }
        }
    }

    /// Run deferred caret restoration/refocus for a field after the host has
    /// rendered the committed value.
    pub fn flush_render(&mut self, field_key: &str, surface: &mut dyn FieldSurface) {
        if let Some(recorder) = self.fields.get_mut(field_key) {
            recorder.pending.flush(surface);
        }
    }

    /// Discard a field's session and error state entirely.
    pub fn start_fresh(&mut self, field_key: &str) {
        if let Some(recorder) = self.fields.get_mut(field_key) {
            recorder.session.reset();
            recorder.phase = SubmissionPhase::Ready;
        }
    }

    /// Dispose recorders for fields no longer present in the form. Dropping
    /// a session releases its capture handle if held.
    pub fn retain_fields(&mut self, keys: &[&str]) {
        self.fields.retain(|key, _| keys.contains(&key.as_str()));
    }
}
