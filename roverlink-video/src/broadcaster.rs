//! Frame broadcaster
//!
//! Owns the capture loop and the single most-recent frame. One producer
//! task pulls frames from the [`FrameSource`] at the configured cadence
//! and publishes each one atomically; any number of consumers read the
//! latest frame or suspend until a newer one appears. A consumer that
//! falls behind misses frames, never buffers them: latest frame wins.
//!
//! The physical camera runs only while consumers exist. The 0→1 consumer
//! edge starts the device and the capture task, the 1→0 edge stops both;
//! intermediate add/remove pairs touch nothing but the count.

use crate::error::VideoError;
use crate::frame::Frame;
use crate::source::{CaptureConfig, FrameSource};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Delay before retrying after a failed frame grab
const CAPTURE_RETRY_BACKOFF: Duration = Duration::from_millis(250);

/// Handle representing one registered streaming consumer.
///
/// Owned by the stream server for the lifetime of a client connection and
/// surrendered back through [`FrameBroadcaster::remove_consumer`]. The
/// broadcaster itself only tracks a count, so consumer bookkeeping never
/// blocks frame production.
#[derive(Debug)]
pub struct ConsumerHandle {
    /// Unique consumer id, used for logging
    pub id: Uuid,
    /// Sequence number of the last frame this consumer has seen
    pub last_seq: u64,
}

/// Counters describing broadcaster activity since creation
#[derive(Debug, Clone, Copy, Default)]
pub struct BroadcastStats {
    /// Frames published to consumers
    pub frames_published: u64,
    /// Frame grabs that failed and were retried
    pub capture_errors: u64,
    /// Sequence number of the most recent published frame
    pub last_seq: u64,
}

#[derive(Default)]
struct StatsInner {
    frames_published: AtomicU64,
    capture_errors: AtomicU64,
    next_seq: AtomicU64,
}

/// Capture-device lifecycle state, guarded by one async mutex so the 0↔1
/// edges are race-free against concurrent add/remove calls.
struct Lifecycle {
    consumers: usize,
    capture_task: Option<JoinHandle<()>>,
}

/// Distributes the latest camera frame to all registered consumers.
pub struct FrameBroadcaster {
    source: Arc<dyn FrameSource>,
    config: CaptureConfig,
    latest_tx: watch::Sender<Option<Frame>>,
    lifecycle: Mutex<Lifecycle>,
    consumer_count: AtomicUsize,
    stats: Arc<StatsInner>,
}

impl FrameBroadcaster {
    /// Create a broadcaster over the given frame source.
    ///
    /// The source is not started here; the first consumer does that.
    pub fn new(source: Arc<dyn FrameSource>, config: CaptureConfig) -> Result<Self, VideoError> {
        config.validate()?;
        let (latest_tx, _) = watch::channel(None);
        Ok(Self {
            source,
            config,
            latest_tx,
            lifecycle: Mutex::new(Lifecycle {
                consumers: 0,
                capture_task: None,
            }),
            consumer_count: AtomicUsize::new(0),
            stats: Arc::new(StatsInner::default()),
        })
    }

    /// Register a consumer.
    ///
    /// On the 0→1 transition this starts the capture device and spawns the
    /// capture task; if the device fails to start the error is returned
    /// and nothing is registered.
    pub async fn add_consumer(&self) -> Result<ConsumerHandle, VideoError> {
        let mut lifecycle = self.lifecycle.lock().await;

        if lifecycle.consumers == 0 {
            self.source.start().await?;
            lifecycle.capture_task = Some(self.spawn_capture_task());
            info!("capture started for first consumer");
        }

        lifecycle.consumers += 1;
        self.consumer_count
            .store(lifecycle.consumers, Ordering::SeqCst);

        let handle = ConsumerHandle {
            id: Uuid::new_v4(),
            last_seq: self.stats.next_seq.load(Ordering::SeqCst),
        };
        debug!(consumer = %handle.id, total = lifecycle.consumers, "consumer added");
        Ok(handle)
    }

    /// Deregister a consumer.
    ///
    /// On the 1→0 transition this tears down the capture task and stops
    /// the device. Must be called exactly once per handle; the stream
    /// server does so on every connection exit path.
    pub async fn remove_consumer(&self, handle: ConsumerHandle) {
        let mut lifecycle = self.lifecycle.lock().await;

        if lifecycle.consumers == 0 {
            warn!(consumer = %handle.id, "remove_consumer with no registered consumers");
            return;
        }

        lifecycle.consumers -= 1;
        self.consumer_count
            .store(lifecycle.consumers, Ordering::SeqCst);
        debug!(consumer = %handle.id, total = lifecycle.consumers, "consumer removed");

        if lifecycle.consumers == 0 {
            if let Some(task) = lifecycle.capture_task.take() {
                task.abort();
            }
            self.source.stop().await;
            info!("capture stopped after last consumer left");
        }
    }

    /// Non-blocking read of the latest published frame
    pub fn current_frame(&self) -> Option<Frame> {
        self.latest_tx.borrow().clone()
    }

    /// Suspend until a frame with `seq > after_seq` is published, then
    /// return it. Returns immediately if such a frame already exists.
    pub async fn wait_for_next_frame(&self, after_seq: u64) -> Frame {
        let mut rx = self.latest_tx.subscribe();
        loop {
            {
                let current = rx.borrow_and_update();
                if let Some(frame) = current.as_ref() {
                    if frame.seq > after_seq {
                        return frame.clone();
                    }
                }
            }
            // The sender lives in `self`, so `changed` cannot fail while
            // this borrow is alive.
            let _ = rx.changed().await;
        }
    }

    /// Number of currently registered consumers
    pub fn active_consumers(&self) -> usize {
        self.consumer_count.load(Ordering::SeqCst)
    }

    /// Snapshot of the broadcaster's counters
    pub fn stats(&self) -> BroadcastStats {
        BroadcastStats {
            frames_published: self.stats.frames_published.load(Ordering::SeqCst),
            capture_errors: self.stats.capture_errors.load(Ordering::SeqCst),
            last_seq: self.stats.next_seq.load(Ordering::SeqCst),
        }
    }

    /// Spawn the producer task. Runs until aborted by the 1→0 edge; a
    /// capture failure is logged and retried after a short backoff, never
    /// surfaced to consumers (they keep the previous frame).
    fn spawn_capture_task(&self) -> JoinHandle<()> {
        let source = Arc::clone(&self.source);
        let latest_tx = self.latest_tx.clone();
        let stats = Arc::clone(&self.stats);
        let interval = self.config.frame_interval();

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                ticker.tick().await;
                match source.capture_frame().await {
                    Ok(data) => {
                        let seq = stats.next_seq.fetch_add(1, Ordering::SeqCst) + 1;
                        let frame = Frame::new(seq, data);
                        if !frame.is_jpeg() {
                            warn!(seq, "dropping non-JPEG frame from source");
                            continue;
                        }
                        // Sequence number and bytes travel together in one
                        // watch store; readers never see them apart.
                        latest_tx.send_replace(Some(frame));
                        stats.frames_published.fetch_add(1, Ordering::SeqCst);
                    }
                    Err(e) => {
                        stats.capture_errors.fetch_add(1, Ordering::SeqCst);
                        warn!(error = %e, "frame grab failed, retrying");
                        tokio::time::sleep(CAPTURE_RETRY_BACKOFF).await;
                    }
                }
            }
        })
    }
}
