use crate::capture::CaptureConfig;
use anyhow::Result;
use serde::Deserialize;
use std::time::Duration;

#[derive(Debug, Deserialize)]
pub struct Config {
    pub service: ServiceConfig,
    pub transcribe: TranscribeSettings,
    pub audio: AudioSettings,
}

#[derive(Debug, Deserialize)]
pub struct ServiceConfig {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct TranscribeSettings {
    /// Base URL of the transcription service
    pub base_url: String,
    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl TranscribeSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Deserialize)]
pub struct AudioSettings {
    pub sample_rate: u32,
    pub channels: u16,
    pub chunk_duration_ms: u64,
}

impl AudioSettings {
    pub fn capture_config(&self) -> CaptureConfig {
        CaptureConfig {
            sample_rate: self.sample_rate,
            channels: self.channels,
            chunk_duration_ms: self.chunk_duration_ms,
        }
    }
}

impl Config {
    pub fn load(path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path))
            .build()?;

        Ok(settings.try_deserialize()?)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            service: ServiceConfig {
                name: "scribe-session".to_string(),
            },
            transcribe: TranscribeSettings {
                base_url: "http://localhost:8000".to_string(),
                timeout_secs: 120,
            },
            audio: AudioSettings {
                sample_rate: 16000,
                channels: 1,
                chunk_duration_ms: 1000,
            },
        }
    }
}
