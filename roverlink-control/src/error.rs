//! Control channel error types

use crate::channel::ChannelState;
use thiserror::Error;

/// Main error type for control channel operations
#[derive(Error, Debug)]
pub enum ChannelError {
    /// Connect, send, or receive failed on the transport
    #[error("Transport error: {reason}")]
    Transport {
        /// Reason for the transport failure
        reason: String,
    },

    /// Another connect attempt is already in flight
    #[error("Connect already in progress (last known state: {last_state:?})")]
    ConnectInProgress {
        /// State observed when the attempt was refused
        last_state: ChannelState,
    },

    /// Operation exceeded its deadline
    #[error("Operation timed out: {operation} after {duration:?}")]
    Timeout {
        /// Operation that timed out
        operation: String,
        /// Duration after which timeout occurred
        duration: std::time::Duration,
    },

    /// Robot answered, but not with a success acknowledgement
    #[error("Command not acknowledged: {response}")]
    Nack {
        /// Response line received from the robot
        response: String,
    },
}

impl ChannelError {
    /// Get error code for programmatic handling
    pub fn error_code(&self) -> String {
        match self {
            ChannelError::Transport { .. } => "TRANSPORT_ERROR".to_string(),
            ChannelError::ConnectInProgress { .. } => "CONNECT_IN_PROGRESS".to_string(),
            ChannelError::Timeout { .. } => "TIMEOUT".to_string(),
            ChannelError::Nack { .. } => "NACK".to_string(),
        }
    }
}
