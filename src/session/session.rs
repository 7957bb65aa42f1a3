use super::machine::RecordingState;
use super::stats::SessionStats;
use crate::capture::{AudioBlob, AudioChunk, CaptureArbiter, CaptureBackend, CaptureLease};
use crate::error::{ScribeError, SessionError, TranscribeError};
use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{info, warn};
use uuid::Uuid;

type ChunkBuffer = Arc<Mutex<Vec<AudioChunk>>>;

/// One logical recording lifecycle from start to stop/reset.
///
/// Owns the capture backend, the exclusive capture lease, the chunk buffers,
/// and the elapsed-time tick. Chunks from the current contiguous run
/// accumulate in `current`; on pause the finished run moves to `committed`,
/// so `committed ++ current` is always the whole recording in capture order.
/// The finalized blob survives a successful stop so resend can reuse it
/// without re-recording.
pub struct RecordingSession {
    id: Uuid,
    arbiter: CaptureArbiter,
    identity: Option<String>,
    state: RecordingState,
    started_at: Option<DateTime<Utc>>,
    elapsed_secs: Arc<AtomicU64>,
    ticking: Arc<AtomicBool>,
    committed: Vec<AudioChunk>,
    current: ChunkBuffer,
    last_blob: Option<AudioBlob>,
    backend: Option<Box<dyn CaptureBackend>>,
    lease: Option<CaptureLease>,
    drain_task: Option<JoinHandle<()>>,
    tick_task: Option<JoinHandle<()>>,
}

impl RecordingSession {
    pub fn new(arbiter: CaptureArbiter) -> Self {
        Self {
            id: Uuid::new_v4(),
            arbiter,
            identity: None,
            state: RecordingState::Idle,
            started_at: None,
            elapsed_secs: Arc::new(AtomicU64::new(0)),
            ticking: Arc::new(AtomicBool::new(false)),
            committed: Vec::new(),
            current: Arc::new(Mutex::new(Vec::new())),
            last_blob: None,
            backend: None,
            lease: None,
            drain_task: None,
            tick_task: None,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn state(&self) -> RecordingState {
        self.state
    }

    pub fn elapsed_secs(&self) -> u64 {
        self.elapsed_secs.load(Ordering::SeqCst)
    }

    pub fn last_blob(&self) -> Option<&AudioBlob> {
        self.last_blob.as_ref()
    }

    pub fn identity(&self) -> Option<&str> {
        self.identity.as_deref()
    }

    /// Bind this session to an identity key (patient name+dob+gender, or a
    /// dictation field key). Any change force-resets to `Idle`, releasing the
    /// capture handle first, even mid-recording: recordings must never bleed
    /// across patients.
    pub fn set_identity(&mut self, key: impl Into<String>) {
        let key = key.into();
        if self.identity.as_deref() == Some(key.as_str()) {
            return;
        }
        if self.identity.is_some() {
            info!(session = %self.id, "identity changed, discarding session state");
        }
        self.reset();
        self.identity = Some(key);
    }

    /// Acquire the capture lease, start the backend, and begin accumulating
    /// chunks. Valid only from `Idle`.
    pub async fn start(
        &mut self,
        mut backend: Box<dyn CaptureBackend>,
    ) -> Result<(), SessionError> {
        if !self.state.can_start() {
            return Err(SessionError::InvalidState {
                action: "start recording",
                state: self.state,
            });
        }

        let lease = self.arbiter.try_acquire(self.id)?;

        let mut chunk_rx = match backend.start().await {
            Ok(rx) => rx,
            Err(err) => {
                // No handle retained on a refused start.
                drop(lease);
                self.state = RecordingState::Error;
                warn!(session = %self.id, error = %err, "capture start refused");
                return Err(err.into());
            }
        };

        let current = Arc::clone(&self.current);
        let drain_task = tokio::spawn(async move {
            while let Some(chunk) = chunk_rx.recv().await {
                lock_chunks(&current).push(chunk);
            }
        });

        self.elapsed_secs.store(0, Ordering::SeqCst);
        self.ticking.store(true, Ordering::SeqCst);
        let elapsed = Arc::clone(&self.elapsed_secs);
        let ticking = Arc::clone(&self.ticking);
        // Created here, not inside the task, so the tick schedule is anchored
        // at the moment recording started.
        let mut interval = tokio::time::interval(Duration::from_secs(1));
        let tick_task = tokio::spawn(async move {
            interval.tick().await; // consume the immediate first tick
            loop {
                interval.tick().await;
                if ticking.load(Ordering::SeqCst) {
                    elapsed.fetch_add(1, Ordering::SeqCst);
                }
            }
        });

        self.started_at = Some(Utc::now());
        self.backend = Some(backend);
        self.lease = Some(lease);
        self.drain_task = Some(drain_task);
        self.tick_task = Some(tick_task);
        self.state = RecordingState::Recording;

        info!(session = %self.id, "recording started");
        Ok(())
    }

    /// Suspend chunk production and freeze the timer. The finished run moves
    /// to the committed buffer; the handle stays open.
    pub fn pause(&mut self) -> Result<(), SessionError> {
        if !self.state.can_pause() {
            return Err(SessionError::InvalidState {
                action: "pause",
                state: self.state,
            });
        }
        if let Some(backend) = self.backend.as_mut() {
            backend.pause();
        }
        self.ticking.store(false, Ordering::SeqCst);
        let run: Vec<AudioChunk> = lock_chunks(&self.current).drain(..).collect();
        self.committed.extend(run);
        self.state = RecordingState::Paused;
        info!(session = %self.id, elapsed = self.elapsed_secs(), "recording paused");
        Ok(())
    }

    /// Continue the same logical recording; the timer resumes from its frozen
    /// value.
    pub fn resume(&mut self) -> Result<(), SessionError> {
        if !self.state.can_resume() {
            return Err(SessionError::InvalidState {
                action: "resume",
                state: self.state,
            });
        }
        if let Some(backend) = self.backend.as_mut() {
            backend.resume();
        }
        self.ticking.store(true, Ordering::SeqCst);
        self.state = RecordingState::Recording;
        info!(session = %self.id, "recording resumed");
        Ok(())
    }

    /// Stop capturing and finalize the blob.
    ///
    /// Asynchronous because the final chunk flush arrives over the capture
    /// channel: the backend is stopped, the drain task is awaited so every
    /// delivered chunk is in, and only then is `committed ++ current`
    /// assembled into one immutable blob. Returns `None` when nothing was
    /// ever recorded. The handle and lease are released on every path out.
    pub async fn stop(&mut self) -> Result<Option<AudioBlob>, SessionError> {
        if !self.state.can_stop() {
            return Err(SessionError::InvalidState {
                action: "stop",
                state: self.state,
            });
        }

        self.ticking.store(false, Ordering::SeqCst);
        if let Some(tick) = self.tick_task.take() {
            tick.abort();
        }

        let stop_result = match self.backend.take() {
            Some(mut backend) => backend.stop().await,
            None => Ok(()),
        };

        match stop_result {
            Ok(()) => {
                // Channel closed by the backend; the drain task finishes once
                // the final flush is in.
                if let Some(drain) = self.drain_task.take() {
                    let _ = drain.await;
                }
            }
            Err(err) => {
                if let Some(drain) = self.drain_task.take() {
                    drain.abort();
                }
                if let Some(mut lease) = self.lease.take() {
                    lease.release();
                }
                self.state = RecordingState::Error;
                return Err(err.into());
            }
        }

        if let Some(mut lease) = self.lease.take() {
            lease.release();
        }

        let mut chunks = std::mem::take(&mut self.committed);
        chunks.extend(lock_chunks(&self.current).drain(..));

        let blob = AudioBlob::from_chunks(&chunks).map_err(SessionError::Capture)?;
        self.last_blob = blob.clone();
        self.state = RecordingState::Stopped;

        info!(
            session = %self.id,
            chunks = chunks.len(),
            duration = blob.as_ref().map(|b| b.duration_seconds()).unwrap_or(0.0),
            "recording stopped"
        );
        Ok(blob)
    }

    /// Hard, synchronous reset back to `Idle`: abort background tasks, drop
    /// the backend, release the lease, discard buffered audio and the
    /// retained blob. Destructive; callers confirm with the user first.
    pub fn reset(&mut self) {
        self.ticking.store(false, Ordering::SeqCst);
        if let Some(tick) = self.tick_task.take() {
            tick.abort();
        }
        if let Some(drain) = self.drain_task.take() {
            drain.abort();
        }
        // Dropping the backend releases the underlying tracks immediately.
        self.backend = None;
        if let Some(mut lease) = self.lease.take() {
            lease.release();
        }
        self.committed.clear();
        lock_chunks(&self.current).clear();
        self.last_blob = None;
        self.elapsed_secs.store(0, Ordering::SeqCst);
        self.started_at = None;
        self.state = RecordingState::Idle;
    }

    /// Adopt an uploaded blob as if it had just been recorded and stopped, so
    /// the submission and retry paths treat uploads and recordings alike.
    pub fn adopt_blob(&mut self, blob: AudioBlob) -> Result<(), SessionError> {
        if self.state != RecordingState::Idle {
            return Err(SessionError::InvalidState {
                action: "adopt uploaded audio",
                state: self.state,
            });
        }
        self.last_blob = Some(blob);
        self.state = RecordingState::Stopped;
        Ok(())
    }

    /// Claim the retained blob for submission. Valid only from `Stopped`;
    /// a request is never constructed from a session still recording.
    pub fn begin_submission(&mut self) -> Result<AudioBlob, ScribeError> {
        match self.state {
            RecordingState::Stopped => {}
            // Nothing recorded or uploaded yet: local validation, no network.
            RecordingState::Idle if self.last_blob.is_none() => {
                return Err(TranscribeError::NoAudioData.into());
            }
            state => {
                return Err(SessionError::InvalidState {
                    action: "submit",
                    state,
                }
                .into());
            }
        }
        let blob = self
            .last_blob
            .clone()
            .ok_or(TranscribeError::NoAudioData)?;
        self.state = RecordingState::Submitting;
        Ok(blob)
    }

    /// Close out a submission attempt. On the full-encounter success path the
    /// blob is discarded and the session returns to `Idle` (a fresh recording
    /// is expected next); otherwise the blob stays retained in `Stopped` so
    /// resend remains possible.
    pub fn finish_submission(&mut self, discard_blob: bool) {
        if self.state != RecordingState::Submitting {
            return;
        }
        if discard_blob {
            self.last_blob = None;
            self.elapsed_secs.store(0, Ordering::SeqCst);
            self.started_at = None;
            self.state = RecordingState::Idle;
        } else {
            self.state = RecordingState::Stopped;
        }
    }

    pub fn stats(&self) -> SessionStats {
        SessionStats {
            state: self.state,
            started_at: self.started_at,
            elapsed_secs: self.elapsed_secs(),
            chunk_count: self.committed.len() + lock_chunks(&self.current).len(),
            has_blob: self.last_blob.is_some(),
        }
    }
}

impl Drop for RecordingSession {
    fn drop(&mut self) {
        // Teardown must release the handle and clear timers even without an
        // explicit stop.
        self.ticking.store(false, Ordering::SeqCst);
        if let Some(tick) = self.tick_task.take() {
            tick.abort();
        }
        if let Some(drain) = self.drain_task.take() {
            drain.abort();
        }
        self.backend = None;
        if let Some(mut lease) = self.lease.take() {
            lease.release();
        }
    }
}

fn lock_chunks(buffer: &ChunkBuffer) -> std::sync::MutexGuard<'_, Vec<AudioChunk>> {
    match buffer.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}
