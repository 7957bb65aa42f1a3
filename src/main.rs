use anyhow::{Context, Result};
use clap::Parser;
use scribe_session::{
    AudioBlob, CaptureArbiter, Config, EncounterMetadata, RecordingSession, ScriptedBackend,
    ScriptedFeed, TranscribeClient, TranscribeError,
};
use std::path::PathBuf;
use tracing::{info, warn};

/// Smoke-test harness for the dictation session core: submit a WAV file to
/// the configured transcription service, or run a scripted recording
/// session end to end when no file is given.
#[derive(Debug, Parser)]
#[command(name = "scribe-session", version)]
struct Args {
    /// Config file (without extension), e.g. config/scribe-session
    #[arg(long, default_value = "config/scribe-session")]
    config: String,

    /// WAV file to submit; omit to run the scripted recording demo
    #[arg(long)]
    file: Option<PathBuf>,

    /// Submit as a per-field dictation for this field instead of a full
    /// encounter
    #[arg(long)]
    field: Option<String>,

    /// Patient name to attach to the encounter request
    #[arg(long)]
    name: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let args = Args::parse();

    let cfg = match Config::load(&args.config) {
        Ok(cfg) => cfg,
        Err(err) => {
            warn!("no config at {} ({err}), using defaults", args.config);
            Config::default()
        }
    };

    info!("{} v0.1.0", cfg.service.name);
    info!("transcription service: {}", cfg.transcribe.base_url);

    let file = match args.file {
        Some(file) => file,
        None => return scripted_demo(&cfg).await,
    };

    // The arbiter is unused for a file submission but keeps the demo honest
    // about the one-capture-owner rule.
    let _arbiter = CaptureArbiter::global();

    let blob = AudioBlob::from_wav_file(&file)
        .with_context(|| format!("failed to load {}", file.display()))?;
    info!(
        "loaded {}: {:.1}s, {} Hz, {} channel(s)",
        file.display(),
        blob.duration_seconds(),
        blob.sample_rate,
        blob.channels
    );

    let client = TranscribeClient::new(&cfg.transcribe.base_url, cfg.transcribe.timeout())
        .context("failed to build transcription client")?;

    match args.field {
        Some(field_key) => match client.dictate(&blob, &field_key).await {
            Ok(transcript) => info!("dictation for {field_key}: {transcript}"),
            Err(err) => report(err),
        },
        None => {
            let metadata = EncounterMetadata {
                name: args.name,
                ..EncounterMetadata::default()
            };
            match client.transcribe_encounter(&blob, &metadata).await {
                Ok(transcript) => {
                    info!(
                        "transcribed in {:.1}s, structured in {:.1}s",
                        transcript.transcription_duration, transcript.process_duration
                    );
                    for (field, text) in &transcript.fields {
                        info!("  {field}: {text}");
                    }
                }
                Err(err) => report(err),
            }
        }
    }

    Ok(())
}

/// Drive one scripted recording through start → pause → resume → stop and
/// report the finalized blob, without touching the network.
async fn scripted_demo(cfg: &Config) -> Result<()> {
    let arbiter = CaptureArbiter::global();
    let mut session = RecordingSession::new(arbiter);
    let feed = ScriptedFeed::new();
    let capture = cfg.audio.capture_config();
    let chunk_samples = (capture.sample_rate as u64 * capture.chunk_duration_ms / 1000) as usize;

    session
        .start(Box::new(ScriptedBackend::new(capture, feed.clone())))
        .await?;
    for i in 0..3i16 {
        feed.push(vec![i * 100; chunk_samples]);
    }

    session.pause()?;
    info!("paused at {}", session.stats().elapsed_display());
    session.resume()?;
    for i in 3..5i16 {
        feed.push(vec![i * 100; chunk_samples]);
    }

    match session.stop().await? {
        Some(blob) => info!(
            "recorded {} chunks, {:.1}s of audio ({} bytes of WAV)",
            blob.chunk_count,
            blob.duration_seconds(),
            blob.bytes().len()
        ),
        None => warn!("scripted session produced no audio"),
    }
    info!("final state: {:?}", session.state());
    Ok(())
}

fn report(err: TranscribeError) {
    if err.is_retryable() {
        warn!("submission failed (retryable with the same audio): {err}");
    } else {
        warn!("submission failed: {err}");
    }
}
