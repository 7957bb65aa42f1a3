use super::gate::SubmissionGate;
use super::types::{
    DictationEnvelope, DocumentEnvelope, DocumentFields, EncounterEnvelope, EncounterMetadata,
    EncounterTranscript,
};
use crate::capture::AudioBlob;
use crate::error::TranscribeError;
use reqwest::multipart::{Form, Part};
use std::time::Duration;
use tracing::{info, warn};

/// Client for one session's transcription pipeline.
///
/// Packages a finalized blob plus metadata into a multipart request and
/// awaits the structured response. Each instance carries its own submission
/// gate, so one client == one session's "at most one in-flight request"
/// domain; `detached()` clones the connection pool with a fresh gate for a
/// new session.
pub struct TranscribeClient {
    http: reqwest::Client,
    base_url: String,
    gate: SubmissionGate,
}

impl TranscribeClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, TranscribeError> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            gate: SubmissionGate::new(),
        })
    }

    /// Same endpoint and connection pool, independent in-flight gate.
    pub fn detached(&self) -> Self {
        Self {
            http: self.http.clone(),
            base_url: self.base_url.clone(),
            gate: SubmissionGate::new(),
        }
    }

    pub fn is_submitting(&self) -> bool {
        self.gate.is_in_flight()
    }

    /// Submit a full-encounter recording; the response populates multiple
    /// structured note fields. Resend is the same call with the retained
    /// blob.
    pub async fn transcribe_encounter(
        &self,
        blob: &AudioBlob,
        metadata: &EncounterMetadata,
    ) -> Result<EncounterTranscript, TranscribeError> {
        if blob.is_empty() {
            return Err(TranscribeError::NoAudioData);
        }
        let _ticket = self.gate.try_begin()?;

        let mut form = Form::new().part("file", audio_part(blob)?);
        for (key, value) in metadata.form_fields() {
            form = form.text(key, value);
        }

        info!(
            bytes = blob.bytes().len(),
            duration = blob.duration_seconds(),
            "submitting encounter audio"
        );
        let body = self.post_multipart("/api/transcribe/audio", form).await?;

        let envelope: EncounterEnvelope = serde_json::from_str(&body)?;
        if let Some(message) = envelope.error {
            warn!(message, "transcription service reported an error");
            return Err(TranscribeError::TranscriptionFailed { status: 200, message });
        }

        info!(
            fields = envelope.fields.len(),
            transcription_duration = envelope.transcription_duration,
            process_duration = envelope.process_duration,
            "encounter transcription complete"
        );
        Ok(envelope.into())
    }

    /// Submit a per-field dictation recording; the response is plain
    /// transcript text for insertion at the tracked cursor.
    pub async fn dictate(
        &self,
        blob: &AudioBlob,
        field_key: &str,
    ) -> Result<String, TranscribeError> {
        if blob.is_empty() {
            return Err(TranscribeError::NoAudioData);
        }
        let _ticket = self.gate.try_begin()?;

        let form = Form::new()
            .part("file", audio_part(blob)?)
            .text("fieldKey", field_key.to_string());

        info!(field_key, bytes = blob.bytes().len(), "submitting dictation audio");
        let body = self.post_multipart("/api/transcribe/dictate", form).await?;

        let envelope: DictationEnvelope = serde_json::from_str(&body)?;
        if let Some(message) = envelope.error {
            warn!(field_key, message, "dictation service reported an error");
            return Err(TranscribeError::TranscriptionFailed { status: 200, message });
        }

        Ok(envelope.transcription)
    }

    /// Submit an uploaded document for field extraction.
    pub async fn process_document(
        &self,
        bytes: Vec<u8>,
        filename: &str,
        metadata: &EncounterMetadata,
    ) -> Result<DocumentFields, TranscribeError> {
        if bytes.is_empty() {
            return Err(TranscribeError::NoAudioData);
        }
        let _ticket = self.gate.try_begin()?;

        let part = Part::bytes(bytes)
            .file_name(filename.to_string())
            .mime_str("application/octet-stream")?;
        let mut form = Form::new().part("file", part);
        for (key, value) in metadata.form_fields() {
            // templateKey is not part of the document contract
            if key != "templateKey" {
                form = form.text(key, value);
            }
        }

        info!(filename, "submitting document for extraction");
        let body = self
            .post_multipart("/api/transcribe/process-document", form)
            .await?;

        let envelope: DocumentEnvelope = serde_json::from_str(&body)?;
        if let Some(message) = envelope.error {
            return Err(TranscribeError::TranscriptionFailed { status: 200, message });
        }

        Ok(DocumentFields {
            fields: envelope.fields,
        })
    }

    /// POST a multipart form; non-success statuses become
    /// `TranscriptionFailed`, transport failures become `Network`.
    async fn post_multipart(&self, path: &str, form: Form) -> Result<String, TranscribeError> {
        let url = format!("{}{}", self.base_url, path);
        let response = self.http.post(&url).multipart(form).send().await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            warn!(%status, path, "transcription endpoint returned failure");
            return Err(TranscribeError::TranscriptionFailed {
                status: status.as_u16(),
                message: failure_message(&body),
            });
        }

        Ok(body)
    }
}

fn audio_part(blob: &AudioBlob) -> Result<Part, TranscribeError> {
    let part = Part::bytes(blob.bytes().to_vec())
        .file_name("recording.wav")
        .mime_str("audio/wav")?;
    Ok(part)
}

/// Error bodies may be JSON `{"error": "..."}` or plain text; keep whatever
/// message is there, bounded.
fn failure_message(body: &str) -> String {
    #[derive(serde::Deserialize)]
    struct ErrorBody {
        error: String,
    }
    if let Ok(parsed) = serde_json::from_str::<ErrorBody>(body) {
        return parsed.error;
    }
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return "no error detail provided".to_string();
    }
    trimmed.chars().take(500).collect()
}
