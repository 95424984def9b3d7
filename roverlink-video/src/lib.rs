//! # Roverlink Video
//!
//! Live camera distribution for the rover: a single capturing producer
//! feeds any number of independent MJPEG consumers, each pulling frames at
//! its own pace. The physical camera runs only while someone is watching;
//! the first consumer starts it and the last one out stops it.

#![deny(missing_docs)]
#![warn(clippy::all)]

pub mod broadcaster;
pub mod error;
pub mod frame;
pub mod server;
pub mod source;

// Re-export main types
pub use broadcaster::{BroadcastStats, ConsumerHandle, FrameBroadcaster};
pub use error::VideoError;
pub use frame::Frame;
pub use server::{StreamServer, StreamServerConfig};
pub use source::{CaptureConfig, FrameSource, TestPatternSource};
