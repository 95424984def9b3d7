//! Video pipeline error types

use thiserror::Error;

/// Main error type for capture and streaming operations
#[derive(Error, Debug)]
pub enum VideoError {
    /// Camera unavailable or a frame grab failed
    #[error("Capture error: {reason}")]
    Capture {
        /// Reason reported by the frame source
        reason: String,
    },

    /// Invalid capture configuration
    #[error("Invalid configuration: {message}")]
    InvalidConfiguration {
        /// Error message
        message: String,
    },

    /// Stream server failed to bind
    #[error("Failed to start stream server on {address}: {source}")]
    ServerStart {
        /// Address that failed to bind
        address: std::net::SocketAddr,
        /// Underlying error
        source: std::io::Error,
    },

    /// I/O operation failed
    #[error("I/O error: {source}")]
    Io {
        /// Underlying error
        #[from]
        source: std::io::Error,
    },
}

impl VideoError {
    /// Get error code for programmatic handling
    pub fn error_code(&self) -> String {
        match self {
            VideoError::Capture { .. } => "CAPTURE_ERROR".to_string(),
            VideoError::InvalidConfiguration { .. } => "INVALID_CONFIGURATION".to_string(),
            VideoError::ServerStart { .. } => "SERVER_START_FAILED".to_string(),
            VideoError::Io { .. } => "IO_ERROR".to_string(),
        }
    }
}
