//! Camera frame source port
//!
//! The physical camera (PiCamera, V4L2, whatever the deployment carries)
//! is an external collaborator; the broadcaster only talks to it through
//! [`FrameSource`]. A synthetic [`TestPatternSource`] ships with the
//! library for tests, demos, and camera-less dry runs.

use crate::error::VideoError;
use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tracing::debug;

/// Capture configuration handed to the frame source and broadcaster
#[derive(Debug, Clone)]
pub struct CaptureConfig {
    /// Frame width in pixels
    pub width: u32,
    /// Frame height in pixels
    pub height: u32,
    /// Target capture cadence in frames per second
    pub framerate: f64,
    /// Sensor rotation in degrees (0, 90, 180, 270)
    pub rotation_degrees: u32,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            width: 640,
            height: 480,
            framerate: 30.0,
            rotation_degrees: 0,
        }
    }
}

impl CaptureConfig {
    /// Validate configuration
    pub fn validate(&self) -> Result<(), VideoError> {
        if self.width == 0 || self.height == 0 {
            return Err(VideoError::InvalidConfiguration {
                message: "Invalid resolution".to_string(),
            });
        }

        if self.framerate <= 0.0 || self.framerate > 120.0 {
            return Err(VideoError::InvalidConfiguration {
                message: "Invalid framerate".to_string(),
            });
        }

        if !matches!(self.rotation_degrees, 0 | 90 | 180 | 270) {
            return Err(VideoError::InvalidConfiguration {
                message: "Rotation must be a quarter turn".to_string(),
            });
        }

        Ok(())
    }

    /// Interval between frames at the configured cadence
    pub fn frame_interval(&self) -> std::time::Duration {
        std::time::Duration::from_secs_f64(1.0 / self.framerate)
    }
}

/// Port to the physical camera.
///
/// `start`/`stop` bracket the device's powered lifetime; the broadcaster
/// calls them only on the 0↔1 active-consumer edges. `capture_frame`
/// returns one JPEG-encoded image.
#[async_trait]
pub trait FrameSource: Send + Sync {
    /// Acquire and start the capture device; idempotent
    async fn start(&self) -> Result<(), VideoError>;

    /// Grab one JPEG frame from the device
    async fn capture_frame(&self) -> Result<Bytes, VideoError>;

    /// Release the capture device
    async fn stop(&self);
}

/// Synthetic frame source producing minimal JPEG-marked payloads.
///
/// Counts start/stop/capture calls so tests can assert the broadcaster's
/// edge-triggered device lifecycle, and can be armed to fail startup.
#[derive(Default)]
pub struct TestPatternSource {
    started: AtomicBool,
    starts: AtomicU64,
    stops: AtomicU64,
    captures: AtomicU64,
    fail_start: Mutex<Option<String>>,
    fail_capture: Mutex<Option<String>>,
}

impl TestPatternSource {
    /// Create a new test pattern source
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Number of `start` calls observed
    pub fn start_count(&self) -> u64 {
        self.starts.load(Ordering::SeqCst)
    }

    /// Number of `stop` calls observed
    pub fn stop_count(&self) -> u64 {
        self.stops.load(Ordering::SeqCst)
    }

    /// Number of frames captured
    pub fn capture_count(&self) -> u64 {
        self.captures.load(Ordering::SeqCst)
    }

    /// Whether the device is currently started
    pub fn is_started(&self) -> bool {
        self.started.load(Ordering::SeqCst)
    }

    /// Make the next `start` call fail
    pub fn fail_next_start(&self, reason: impl Into<String>) {
        *self.fail_start.lock() = Some(reason.into());
    }

    /// Make the next `capture_frame` call fail
    pub fn fail_next_capture(&self, reason: impl Into<String>) {
        *self.fail_capture.lock() = Some(reason.into());
    }
}

#[async_trait]
impl FrameSource for TestPatternSource {
    async fn start(&self) -> Result<(), VideoError> {
        if let Some(reason) = self.fail_start.lock().take() {
            return Err(VideoError::Capture { reason });
        }
        self.starts.fetch_add(1, Ordering::SeqCst);
        self.started.store(true, Ordering::SeqCst);
        debug!("test pattern source started");
        Ok(())
    }

    async fn capture_frame(&self) -> Result<Bytes, VideoError> {
        if !self.started.load(Ordering::SeqCst) {
            return Err(VideoError::Capture {
                reason: "source not started".to_string(),
            });
        }
        if let Some(reason) = self.fail_capture.lock().take() {
            return Err(VideoError::Capture { reason });
        }
        let n = self.captures.fetch_add(1, Ordering::SeqCst);
        // SOI marker plus a counter payload; enough to satisfy consumers
        // that only look at the marker and the length.
        let mut data = vec![0xff, 0xd8];
        data.extend_from_slice(&n.to_be_bytes());
        Ok(Bytes::from(data))
    }

    async fn stop(&self) {
        self.started.store(false, Ordering::SeqCst);
        self.stops.fetch_add(1, Ordering::SeqCst);
        debug!("test pattern source stopped");
    }
}
