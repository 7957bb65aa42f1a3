use super::SubmissionPhase;
use crate::capture::{AudioBlob, BackendFactory, CaptureArbiter, CaptureConfig};
use crate::error::{ScribeError, SessionError, TranscribeError};
use crate::session::{RecordingSession, RecordingState, SessionStats};
use crate::transcribe::{EncounterMetadata, EncounterTranscript, TranscribeClient};
use std::path::Path;
use tracing::{info, warn};

/// Called exactly once per submission attempt. The boolean asks the host
/// form to resize its fields, which only matters after a bulk multi-field
/// population.
pub type CompletionCallback =
    Box<dyn Fn(&Result<EncounterTranscript, TranscribeError>, bool) + Send + Sync>;

/// Full-encounter recorder: one audio stream in, multiple structured note
/// fields out.
///
/// Wraps a `RecordingSession` and the submission pipeline with the recovery
/// shell: a failed submission retains the blob for `retry`, `start_fresh`
/// discards everything, and a patient identity change force-resets the
/// session before anything can bleed across patients.
pub struct EncounterRecorder {
    session: RecordingSession,
    factory: BackendFactory,
    capture: CaptureConfig,
    client: TranscribeClient,
    metadata: EncounterMetadata,
    phase: SubmissionPhase,
    on_complete: Option<CompletionCallback>,
}

impl EncounterRecorder {
    pub fn new(
        arbiter: CaptureArbiter,
        factory: BackendFactory,
        capture: CaptureConfig,
        client: TranscribeClient,
    ) -> Self {
        Self {
            session: RecordingSession::new(arbiter),
            factory,
            capture,
            client,
            metadata: EncounterMetadata::default(),
            phase: SubmissionPhase::Ready,
            on_complete: None,
        }
    }

    /// Register the form's completion callback.
    pub fn on_complete(
        &mut self,
        callback: impl Fn(&Result<EncounterTranscript, TranscribeError>, bool) + Send + Sync + 'static,
    ) {
        self.on_complete = Some(Box::new(callback));
    }

    /// Update patient metadata. A change of identity (name+dob+gender)
    /// resets the session, mid-recording included.
    pub fn set_metadata(&mut self, metadata: EncounterMetadata) {
        let identity = metadata.identity_key();
        if self.session.identity() != Some(identity.as_str()) {
            self.phase = SubmissionPhase::Ready;
        }
        self.session.set_identity(identity);
        self.metadata = metadata;
    }

    pub fn state(&self) -> RecordingState {
        self.session.state()
    }

    pub fn phase(&self) -> &SubmissionPhase {
        &self.phase
    }

    pub fn stats(&self) -> SessionStats {
        self.session.stats()
    }

    pub fn elapsed_secs(&self) -> u64 {
        self.session.elapsed_secs()
    }

    /// Retry is only offered while audio from the failed attempt is retained.
    pub fn can_retry(&self) -> bool {
        self.session.last_blob().is_some()
    }

    pub async fn start(&mut self) -> Result<(), SessionError> {
        let backend = (self.factory)(&self.capture);
        self.session.start(backend).await
    }

    pub fn pause(&mut self) -> Result<(), SessionError> {
        self.session.pause()
    }

    pub fn resume(&mut self) -> Result<(), SessionError> {
        self.session.resume()
    }

    pub async fn stop(&mut self) -> Result<Option<AudioBlob>, SessionError> {
        self.session.stop().await
    }

    /// Stop if still capturing, then submit the finalized recording.
    pub async fn send(&mut self) -> Result<EncounterTranscript, ScribeError> {
        if self.session.state().is_active() {
            self.session.stop().await?;
        }
        self.submit().await
    }

    /// Adopt an uploaded WAV file and submit it through the same pipeline.
    pub async fn send_file(&mut self, path: impl AsRef<Path>) -> Result<EncounterTranscript, ScribeError> {
        let blob = AudioBlob::from_wav_file(path).map_err(SessionError::Capture)?;
        self.session.adopt_blob(blob)?;
        self.submit().await
    }

    /// Re-submit the retained blob from a failed attempt; no new recording,
    /// no new capture handle.
    pub async fn retry(&mut self) -> Result<EncounterTranscript, ScribeError> {
        info!("retrying encounter submission with retained audio");
        self.submit().await
    }

    /// Discard the session entirely: release any handle, clear the blob and
    /// the error, return to idle.
    pub fn start_fresh(&mut self) {
        self.session.reset();
        self.phase = SubmissionPhase::Ready;
    }

    async fn submit(&mut self) -> Result<EncounterTranscript, ScribeError> {
        let blob = self.session.begin_submission()?;
        self.phase = SubmissionPhase::InProgress;

        let result = self.client.transcribe_encounter(&blob, &self.metadata).await;
        if let Some(callback) = &self.on_complete {
            callback(&result, result.is_ok());
        }

        match result {
            Ok(transcript) => {
                // Success ends the encounter flow; a fresh recording comes next.
                self.session.finish_submission(true);
                self.phase = SubmissionPhase::Ready;
                Ok(transcript)
            }
            Err(err) => {
                // Blob stays retained so retry can reuse the same bytes.
                self.session.finish_submission(false);
                warn!(error = %err, "encounter submission failed");
                self.phase = SubmissionPhase::Failed {
                    message: err.to_string(),
                };
                Err(err.into())
            }
        }
    }
}
