//! Published camera frames

use bytes::Bytes;
use std::time::Instant;

/// JPEG start-of-image marker
const JPEG_SOI: [u8; 2] = [0xff, 0xd8];

/// One published camera frame.
///
/// Frames are immutable once published; the payload is a shared `Bytes`
/// buffer, so handing a frame to many consumers never copies the image.
/// The sequence number increases strictly with every publication and is
/// the freshness cursor consumers wait against.
#[derive(Debug, Clone)]
pub struct Frame {
    /// Monotonically increasing publication sequence number
    pub seq: u64,
    /// JPEG-encoded image bytes
    pub data: Bytes,
    /// When the frame was captured
    pub captured_at: Instant,
}

impl Frame {
    /// Create a frame with the given sequence number
    pub fn new(seq: u64, data: Bytes) -> Self {
        Self {
            seq,
            data,
            captured_at: Instant::now(),
        }
    }

    /// Whether the payload starts with the JPEG start-of-image marker
    pub fn is_jpeg(&self) -> bool {
        self.data.len() >= 2 && self.data[..2] == JPEG_SOI
    }

    /// Payload size in bytes
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether the payload is empty
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}
