use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Optional encounter context attached to a transcription request.
///
/// Only non-empty values are added to the multipart form.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EncounterMetadata {
    pub name: Option<String>,
    pub gender: Option<String>,
    pub dob: Option<String>,
    pub template_key: Option<String>,
}

impl EncounterMetadata {
    /// Multipart text fields, skipping anything empty
    pub fn form_fields(&self) -> Vec<(&'static str, String)> {
        let mut fields = Vec::new();
        push_if_set(&mut fields, "name", &self.name);
        push_if_set(&mut fields, "gender", &self.gender);
        push_if_set(&mut fields, "dob", &self.dob);
        push_if_set(&mut fields, "templateKey", &self.template_key);
        fields
    }

    /// Identity key for patient-switch detection: a recording started for one
    /// patient must never be submitted for another.
    pub fn identity_key(&self) -> String {
        format!(
            "{}|{}|{}",
            self.name.as_deref().unwrap_or(""),
            self.dob.as_deref().unwrap_or(""),
            self.gender.as_deref().unwrap_or("")
        )
    }
}

fn push_if_set(fields: &mut Vec<(&'static str, String)>, key: &'static str, value: &Option<String>) {
    if let Some(value) = value {
        if !value.is_empty() {
            fields.push((key, value.clone()));
        }
    }
}

/// Structured result of a full-encounter transcription
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EncounterTranscript {
    /// Populated note fields, keyed by field name (history, plan, letter, ...)
    pub fields: HashMap<String, String>,
    /// The raw transcript the fields were derived from
    pub raw_transcription: String,
    /// Seconds the service spent transcribing
    pub transcription_duration: f64,
    /// Seconds the service spent structuring the note
    pub process_duration: f64,
}

/// Fields extracted from an uploaded document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentFields {
    pub fields: HashMap<String, String>,
}

// Wire envelopes: a 200 response may still carry a server-reported logical
// error in its `error` field, which callers must see as a failed
// transcription, not a success.

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct EncounterEnvelope {
    pub error: Option<String>,
    #[serde(default)]
    pub fields: HashMap<String, String>,
    #[serde(default)]
    pub raw_transcription: String,
    #[serde(default)]
    pub transcription_duration: f64,
    #[serde(default)]
    pub process_duration: f64,
}

impl From<EncounterEnvelope> for EncounterTranscript {
    fn from(envelope: EncounterEnvelope) -> Self {
        Self {
            fields: envelope.fields,
            raw_transcription: envelope.raw_transcription,
            transcription_duration: envelope.transcription_duration,
            process_duration: envelope.process_duration,
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct DictationEnvelope {
    pub error: Option<String>,
    #[serde(default)]
    pub transcription: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct DocumentEnvelope {
    pub error: Option<String>,
    #[serde(default)]
    pub fields: HashMap<String, String>,
}
