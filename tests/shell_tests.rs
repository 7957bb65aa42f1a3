// End-to-end tests for the recorder shells: the full-encounter recorder and
// the per-field dictation manager, each driven against a local axum mock of
// the transcription service and a scripted capture backend.

use anyhow::Result;
use axum::extract::Multipart;
use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};
use scribe_session::{
    BackendFactory, CaptureArbiter, CaptureBackend, CaptureConfig, CaptureError,
    DictationManager, EncounterMetadata, EncounterRecorder, FieldSurface, ScriptedBackend,
    ScriptedFeed, SessionError, SubmissionPhase, TextField, TranscribeClient,
};
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Default)]
struct Recorded {
    hits: AtomicUsize,
    files: Mutex<Vec<Vec<u8>>>,
}

async fn read_multipart(mut multipart: Multipart) -> Vec<u8> {
    let mut file = Vec::new();
    while let Some(field) = multipart.next_field().await.unwrap() {
        let name = field.name().unwrap_or("").to_string();
        let data = field.bytes().await.unwrap();
        if name == "file" {
            file = data.to_vec();
        }
    }
    file
}

async fn serve(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

/// Encounter endpoint that fails for the first `fail_first` requests, then
/// succeeds with a fixed structured result.
fn encounter_route(recorded: Arc<Recorded>, fail_first: usize) -> Router {
    Router::new().route(
        "/api/transcribe/audio",
        post(move |multipart: Multipart| {
            let recorded = Arc::clone(&recorded);
            async move {
                let file = read_multipart(multipart).await;
                recorded.files.lock().unwrap().push(file);
                let attempt = recorded.hits.fetch_add(1, Ordering::SeqCst);
                if attempt < fail_first {
                    (
                        StatusCode::SERVICE_UNAVAILABLE,
                        Json(json!({"error": "transcription service busy"})),
                    )
                } else {
                    (
                        StatusCode::OK,
                        Json(json!({
                            "fields": {"history": "3 days of fever", "plan": "Paracetamol PRN"},
                            "rawTranscription": "three days of fever",
                            "transcriptionDuration": 0.9,
                            "processDuration": 0.4,
                        })),
                    )
                }
            }
        }),
    )
}

fn dictate_route(recorded: Arc<Recorded>, fail_first: usize, transcript: &'static str) -> Router {
    Router::new().route(
        "/api/transcribe/dictate",
        post(move |multipart: Multipart| {
            let recorded = Arc::clone(&recorded);
            async move {
                let file = read_multipart(multipart).await;
                recorded.files.lock().unwrap().push(file);
                let attempt = recorded.hits.fetch_add(1, Ordering::SeqCst);
                if attempt < fail_first {
                    (
                        StatusCode::SERVICE_UNAVAILABLE,
                        Json(json!({"error": "transcription service busy"})),
                    )
                } else {
                    (StatusCode::OK, Json(json!({"transcription": transcript})))
                }
            }
        }),
    )
}

fn scripted_factory(feed: ScriptedFeed) -> BackendFactory {
    Arc::new(move |config: &CaptureConfig| {
        Box::new(ScriptedBackend::new(config.clone(), feed.clone())) as Box<dyn CaptureBackend>
    })
}

fn recorder(base_url: &str, feed: ScriptedFeed) -> EncounterRecorder {
    let client = TranscribeClient::new(base_url, Duration::from_secs(5)).unwrap();
    EncounterRecorder::new(
        CaptureArbiter::new(),
        scripted_factory(feed),
        CaptureConfig::default(),
        client,
    )
}

fn metadata(name: &str) -> EncounterMetadata {
    EncounterMetadata {
        name: Some(name.to_string()),
        dob: Some("1980-02-14".to_string()),
        ..EncounterMetadata::default()
    }
}

#[tokio::test]
async fn encounter_send_populates_fields_and_clears_the_session() -> Result<()> {
    let recorded = Arc::new(Recorded::default());
    let base = serve(encounter_route(Arc::clone(&recorded), 0)).await;

    let feed = ScriptedFeed::new();
    let mut recorder = recorder(&base, feed.clone());
    recorder.set_metadata(metadata("Doe, Jane"));

    let calls: Arc<Mutex<Vec<(bool, bool)>>> = Arc::new(Mutex::new(Vec::new()));
    let seen = Arc::clone(&calls);
    recorder.on_complete(move |result, resize| {
        seen.lock().unwrap().push((result.is_ok(), resize));
    });

    recorder.start().await?;
    assert!(feed.push(vec![5i16; 1600]));
    let transcript = recorder.send().await?;

    assert_eq!(transcript.fields["history"], "3 days of fever");
    assert_eq!(transcript.fields["plan"], "Paracetamol PRN");

    // Success ends the flow: idle, nothing retained, ready for a new note
    assert_eq!(recorder.state(), scribe_session::RecordingState::Idle);
    assert!(!recorder.can_retry());
    assert_eq!(*recorder.phase(), SubmissionPhase::Ready);
    assert_eq!(recorder.elapsed_secs(), 0);

    let calls = calls.lock().unwrap();
    assert_eq!(calls.as_slice(), &[(true, true)], "callback once, with resize");
    Ok(())
}

#[tokio::test]
async fn encounter_failure_retains_audio_and_retry_resends_it() -> Result<()> {
    let recorded = Arc::new(Recorded::default());
    let base = serve(encounter_route(Arc::clone(&recorded), 1)).await;

    let feed = ScriptedFeed::new();
    let mut recorder = recorder(&base, feed.clone());
    recorder.set_metadata(metadata("Doe, Jane"));

    let calls: Arc<Mutex<Vec<(bool, bool)>>> = Arc::new(Mutex::new(Vec::new()));
    let seen = Arc::clone(&calls);
    recorder.on_complete(move |result, resize| {
        seen.lock().unwrap().push((result.is_ok(), resize));
    });

    recorder.start().await?;
    feed.push(vec![9i16; 1600]);
    recorder.send().await.expect_err("first attempt fails");

    assert!(recorder.phase().is_failed());
    assert!(recorder.can_retry(), "audio retained for resend");

    let transcript = recorder.retry().await?;
    assert_eq!(transcript.fields["history"], "3 days of fever");
    assert_eq!(*recorder.phase(), SubmissionPhase::Ready);
    assert!(!recorder.can_retry(), "blob discarded after success");

    let files = recorded.files.lock().unwrap();
    assert_eq!(files.len(), 2);
    assert_eq!(files[0], files[1], "retry resent the original bytes");

    let calls = calls.lock().unwrap();
    assert_eq!(calls.as_slice(), &[(false, false), (true, true)]);
    Ok(())
}

#[tokio::test]
async fn send_stops_an_active_recording_first() -> Result<()> {
    let recorded = Arc::new(Recorded::default());
    let base = serve(encounter_route(Arc::clone(&recorded), 0)).await;

    let feed = ScriptedFeed::new();
    let mut recorder = recorder(&base, feed.clone());
    recorder.set_metadata(metadata("Doe, Jane"));

    recorder.start().await?;
    feed.push(vec![1i16; 1600]);
    assert!(recorder.state().is_active());

    // No explicit stop: send finalizes the recording itself
    recorder.send().await?;
    assert_eq!(recorded.hits.load(Ordering::SeqCst), 1);
    assert!(!feed.is_attached(), "capture released by the send");
    Ok(())
}

#[tokio::test]
async fn patient_switch_mid_recording_discards_everything() -> Result<()> {
    let recorded = Arc::new(Recorded::default());
    let base = serve(encounter_route(Arc::clone(&recorded), 0)).await;

    let feed = ScriptedFeed::new();
    let mut recorder = recorder(&base, feed.clone());
    recorder.set_metadata(metadata("Doe, Jane"));

    recorder.start().await?;
    feed.push(vec![3i16; 1600]);

    // A different patient is loaded while the microphone is live
    recorder.set_metadata(metadata("Roe, Richard"));

    assert_eq!(recorder.state(), scribe_session::RecordingState::Idle);
    assert!(!recorder.can_retry(), "no audio carries across patients");
    assert!(!feed.is_attached(), "capture handle released");
    assert_eq!(recorder.elapsed_secs(), 0);

    // The new patient can record immediately
    recorder.start().await?;
    feed.push(vec![4i16; 1600]);
    recorder.send().await?;
    assert_eq!(recorded.hits.load(Ordering::SeqCst), 1);
    Ok(())
}

#[tokio::test]
async fn uploaded_wav_file_goes_through_the_same_pipeline() -> Result<()> {
    let recorded = Arc::new(Recorded::default());
    let base = serve(encounter_route(Arc::clone(&recorded), 0)).await;

    let dir = tempfile::tempdir()?;
    let path = dir.path().join("visit.wav");
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: 16000,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(&path, spec)?;
    for sample in [120i16, -44, 7, 0, 9001] {
        writer.write_sample(sample)?;
    }
    writer.finalize()?;

    let mut recorder = recorder(&base, ScriptedFeed::new());
    recorder.set_metadata(metadata("Doe, Jane"));
    let transcript = recorder.send_file(&path).await?;
    assert_eq!(transcript.raw_transcription, "three days of fever");

    let files = recorded.files.lock().unwrap();
    assert_eq!(files[0], std::fs::read(&path)?, "file submitted verbatim");
    Ok(())
}

fn manager(base_url: &str, feed: ScriptedFeed) -> DictationManager {
    let client = TranscribeClient::new(base_url, Duration::from_secs(5)).unwrap();
    DictationManager::new(
        CaptureArbiter::new(),
        scripted_factory(feed),
        CaptureConfig::default(),
        client,
    )
}

#[tokio::test]
async fn dictation_send_splices_the_transcript_at_the_caret() -> Result<()> {
    let recorded = Arc::new(Recorded::default());
    let base = serve(dictate_route(Arc::clone(&recorded), 0, "denies chest pain")).await;

    let feed = ScriptedFeed::new();
    let mut manager = manager(&base, feed.clone());

    let mut surface = TextField::new("Alert and oriented. Vitals stable.");
    manager.note_focus("history", &surface);
    manager.note_caret("history", 19); // after "Alert and oriented."

    manager.start("history").await?;
    feed.push(vec![6i16; 1600]);
    let text = manager.send("history", &mut surface).await?;
    assert_eq!(text, "denies chest pain");
    assert_eq!(
        surface.value(),
        "Alert and oriented. denies chest pain Vitals stable."
    );

    // The value is committed immediately, but the caret restore waits for
    // the host's render flush
    assert_eq!(surface.focus_count(), 0);
    manager.flush_render("history", &mut surface);
    assert_eq!(surface.caret(), Some(37)); // end of the inserted transcript
    assert_eq!(surface.focus_count(), 1);
    Ok(())
}

#[tokio::test]
async fn one_field_holds_the_microphone_at_a_time() -> Result<()> {
    let base = serve(dictate_route(Arc::new(Recorded::default()), 0, "x")).await;

    let feed = ScriptedFeed::new();
    let mut manager = manager(&base, feed.clone());

    manager.start("history").await?;
    let err = manager.start("plan").await.expect_err("history holds capture");
    assert!(matches!(
        err,
        SessionError::Capture(CaptureError::AlreadyActive)
    ));
    // A refused acquisition leaves the losing field untouched
    assert_eq!(manager.state("plan"), scribe_session::RecordingState::Idle);

    // Releasing the first field frees the second
    feed.push(vec![2i16; 1600]);
    manager.stop("history").await?;
    manager.start("plan").await?;
    assert!(manager.state("plan").is_active());
    manager.stop("plan").await?;
    Ok(())
}

#[tokio::test]
async fn dictation_failure_keeps_audio_and_retry_inserts() -> Result<()> {
    let recorded = Arc::new(Recorded::default());
    let base = serve(dictate_route(Arc::clone(&recorded), 1, "no known allergies")).await;

    let feed = ScriptedFeed::new();
    let mut manager = manager(&base, feed.clone());
    let mut surface = TextField::new("");
    manager.note_focus("allergies", &surface);

    manager.start("allergies").await?;
    feed.push(vec![8i16; 1600]);
    manager
        .send("allergies", &mut surface)
        .await
        .expect_err("first attempt fails");

    assert!(manager.phase("allergies").is_failed());
    assert!(manager.can_retry("allergies"));
    assert_eq!(surface.value(), "", "nothing inserted on failure");

    let text = manager.retry("allergies", &mut surface).await?;
    assert_eq!(text, "no known allergies");
    assert_eq!(surface.value(), "no known allergies");
    assert_eq!(manager.phase("allergies"), SubmissionPhase::Ready);

    let files = recorded.files.lock().unwrap();
    assert_eq!(files[0], files[1], "retry resent the original bytes");
    Ok(())
}

#[tokio::test]
async fn disposing_a_field_releases_its_capture_handle() -> Result<()> {
    let base = serve(dictate_route(Arc::new(Recorded::default()), 0, "x")).await;

    let feed = ScriptedFeed::new();
    let mut manager = manager(&base, feed.clone());

    manager.start("history").await?;
    assert!(feed.is_attached());

    // The form swaps to a template without the history field
    manager.retain_fields(&["plan", "letter"]);
    assert!(!feed.is_attached(), "dropping the recorder released capture");

    manager.start("plan").await?;
    assert!(manager.state("plan").is_active());
    manager.stop("plan").await?;
    Ok(())
}
