use super::backend::{AudioChunk, CaptureBackend, CaptureConfig};
use crate::error::CaptureError;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info};

struct FeedLink {
    tx: mpsc::UnboundedSender<Vec<i16>>,
    paused: Arc<AtomicBool>,
}

type FeedSlot = Arc<Mutex<Option<FeedLink>>>;

/// Handle for driving a `ScriptedBackend` from outside: each `push` becomes
/// one chunk while the backend is capturing. Pushes while paused are
/// discarded at the point of production, matching a device that simply is
/// not sampling — anything pushed before the pause stays part of the
/// recording.
#[derive(Clone, Default)]
pub struct ScriptedFeed {
    slot: FeedSlot,
}

impl ScriptedFeed {
    pub fn new() -> Self {
        Self::default()
    }

    /// Deliver one chunk's worth of samples. Returns false when the samples
    /// were not captured (no backend attached, stopped, or paused).
    pub fn push(&self, samples: Vec<i16>) -> bool {
        let slot = lock_slot(&self.slot);
        match slot.as_ref() {
            Some(link) if !link.paused.load(Ordering::SeqCst) => link.tx.send(samples).is_ok(),
            _ => false,
        }
    }

    pub fn is_attached(&self) -> bool {
        lock_slot(&self.slot).is_some()
    }
}

/// Deterministic in-process capture backend.
///
/// Stands in for real device capture in tests and the demo binary: samples
/// are fed through a `ScriptedFeed` instead of arriving from hardware, but
/// the lifecycle (permission check, chunk channel, pause gating, final flush
/// on stop) behaves like the real thing.
pub struct ScriptedBackend {
    config: CaptureConfig,
    feed: ScriptedFeed,
    deny_permission: bool,
    paused: Arc<AtomicBool>,
    capturing: Arc<AtomicBool>,
    stop_tx: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<()>>,
}

impl ScriptedBackend {
    pub fn new(config: CaptureConfig, feed: ScriptedFeed) -> Self {
        Self {
            config,
            feed,
            deny_permission: false,
            paused: Arc::new(AtomicBool::new(false)),
            capturing: Arc::new(AtomicBool::new(false)),
            stop_tx: None,
            task: None,
        }
    }

    /// A backend whose `start()` fails as if the user refused microphone
    /// access.
    pub fn denied(config: CaptureConfig) -> Self {
        let mut backend = Self::new(config, ScriptedFeed::new());
        backend.deny_permission = true;
        backend
    }
}

#[async_trait::async_trait]
impl CaptureBackend for ScriptedBackend {
    async fn start(&mut self) -> Result<mpsc::Receiver<AudioChunk>, CaptureError> {
        if self.deny_permission {
            return Err(CaptureError::PermissionDenied);
        }
        if self.capturing.load(Ordering::SeqCst) {
            return Err(CaptureError::AlreadyActive);
        }

        let (feed_tx, mut feed_rx) = mpsc::unbounded_channel::<Vec<i16>>();
        *lock_slot(&self.feed.slot) = Some(FeedLink {
            tx: feed_tx,
            paused: Arc::clone(&self.paused),
        });

        let (chunk_tx, chunk_rx) = mpsc::channel(64);
        let (stop_tx, mut stop_rx) = oneshot::channel();
        self.stop_tx = Some(stop_tx);
        self.capturing.store(true, Ordering::SeqCst);

        let sample_rate = self.config.sample_rate;
        let channels = self.config.channels;

        let task = tokio::spawn(async move {
            let mut seq = 0u64;
            debug!("scripted capture task started");

            loop {
                tokio::select! {
                    _ = &mut stop_rx => {
                        // Final flush: everything produced before the stop
                        // request still belongs to the recording.
                        while let Ok(samples) = feed_rx.try_recv() {
                            let chunk = AudioChunk { seq, samples, sample_rate, channels };
                            seq += 1;
                            if chunk_tx.send(chunk).await.is_err() {
                                break;
                            }
                        }
                        break;
                    }
                    fed = feed_rx.recv() => match fed {
                        Some(samples) => {
                            let chunk = AudioChunk { seq, samples, sample_rate, channels };
                            seq += 1;
                            if chunk_tx.send(chunk).await.is_err() {
                                break;
                            }
                        }
                        None => break,
                    },
                }
            }

            debug!(chunks = seq, "scripted capture task stopped");
            // chunk_tx drops here, closing the chunk channel after the flush
        });

        self.task = Some(task);
        info!("scripted capture started");
        Ok(chunk_rx)
    }

    fn pause(&mut self) {
        self.paused.store(true, Ordering::SeqCst);
    }

    fn resume(&mut self) {
        self.paused.store(false, Ordering::SeqCst);
    }

    async fn stop(&mut self) -> Result<(), CaptureError> {
        if !self.capturing.swap(false, Ordering::SeqCst) {
            // Already released; releasing twice is a no-op.
            return Ok(());
        }

        // Detach the feed so nothing new arrives, then ask the task to flush.
        *lock_slot(&self.feed.slot) = None;
        if let Some(stop_tx) = self.stop_tx.take() {
            let _ = stop_tx.send(());
        }
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }

        info!("scripted capture stopped");
        Ok(())
    }

    fn is_capturing(&self) -> bool {
        self.capturing.load(Ordering::SeqCst)
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

impl Drop for ScriptedBackend {
    fn drop(&mut self) {
        // Hard release on teardown: no graceful flush, but the handle must go.
        self.capturing.store(false, Ordering::SeqCst);
        *lock_slot(&self.feed.slot) = None;
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

fn lock_slot(slot: &FeedSlot) -> std::sync::MutexGuard<'_, Option<FeedLink>> {
    match slot.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}
