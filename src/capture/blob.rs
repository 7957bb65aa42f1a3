use super::backend::AudioChunk;
use crate::error::CaptureError;
use hound::{SampleFormat, WavReader, WavSpec, WavWriter};
use std::io::Cursor;
use std::path::Path;
use std::sync::Arc;
use tracing::info;

/// An immutable, fully-assembled audio object ready for submission.
///
/// Assembled exactly once, on stop, from the committed and current chunk runs
/// of a session; byte order equals real-time capture order. The bytes are a
/// complete WAV container so the blob can go straight into a multipart form.
#[derive(Debug, Clone)]
pub struct AudioBlob {
    bytes: Arc<Vec<u8>>,
    pub sample_rate: u32,
    pub channels: u16,
    pub sample_count: usize,
    pub chunk_count: usize,
}

impl AudioBlob {
    /// Assemble one contiguous recording from chunks in capture order.
    ///
    /// Returns `None` when nothing was ever recorded.
    pub fn from_chunks(chunks: &[AudioChunk]) -> Result<Option<Self>, CaptureError> {
        let first = match chunks.iter().find(|c| !c.samples.is_empty()) {
            Some(first) => first,
            None => return Ok(None),
        };

        let spec = WavSpec {
            channels: first.channels,
            sample_rate: first.sample_rate,
            bits_per_sample: 16,
            sample_format: SampleFormat::Int,
        };

        let mut cursor = Cursor::new(Vec::new());
        let mut sample_count = 0usize;
        {
            let mut writer = WavWriter::new(&mut cursor, spec)?;
            for chunk in chunks {
                for &sample in &chunk.samples {
                    writer.write_sample(sample)?;
                }
                sample_count += chunk.samples.len();
            }
            writer.finalize()?;
        }

        Ok(Some(Self {
            bytes: Arc::new(cursor.into_inner()),
            sample_rate: first.sample_rate,
            channels: first.channels,
            sample_count,
            chunk_count: chunks.len(),
        }))
    }

    /// Load an uploaded WAV file as a submission-ready blob.
    pub fn from_wav_file(path: impl AsRef<Path>) -> Result<Self, CaptureError> {
        let path = path.as_ref();
        let bytes = std::fs::read(path)?;

        let reader = WavReader::new(Cursor::new(&bytes))?;
        let spec = reader.spec();
        let sample_count = reader.len() as usize;

        info!(
            path = %path.display(),
            sample_rate = spec.sample_rate,
            channels = spec.channels,
            "audio file loaded for submission"
        );

        Ok(Self {
            bytes: Arc::new(bytes),
            sample_rate: spec.sample_rate,
            channels: spec.channels,
            sample_count,
            chunk_count: 1,
        })
    }

    /// Complete WAV container bytes
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn is_empty(&self) -> bool {
        self.sample_count == 0
    }

    pub fn duration_seconds(&self) -> f64 {
        if self.sample_rate == 0 || self.channels == 0 {
            return 0.0;
        }
        self.sample_count as f64 / (self.sample_rate as f64 * self.channels as f64)
    }

    /// Whether two blobs carry the same audio bytes (resend reuses the exact
    /// payload of the original attempt).
    pub fn same_bytes(&self, other: &AudioBlob) -> bool {
        self.bytes == other.bytes || *self.bytes == *other.bytes
    }
}
