//! # Roverlink Server
//!
//! Robot side of the command channel: a WebSocket endpoint that parses
//! incoming motion commands, runs them through the drive kinematics, and
//! actuates the injected motor driver. Every request gets exactly one
//! response; a client that vanishes leaves the rover stopped, not
//! driving on its last command.

#![deny(missing_docs)]
#![warn(clippy::all)]

pub mod router;
pub mod server;

// Re-export main types
pub use router::CommandRouter;
pub use server::{CommandServer, CommandServerError};
