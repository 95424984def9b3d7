//! Motor driver port
//!
//! The physical motor HAT is an external collaborator; this module only
//! defines the trait the rest of the system drives it through, plus two
//! library-provided implementations: a polarity-inverting adapter for
//! chassis with reverse-wired motors, and a recording mock used by tests
//! and demos.

use crate::error::RoverError;
use crate::kinematics::{clamp_percent, WheelSpeeds};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tracing::debug;

/// Identifies one of the four drive motors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MotorId {
    /// Front-left motor
    FrontLeft,
    /// Front-right motor
    FrontRight,
    /// Rear-left motor
    RearLeft,
    /// Rear-right motor
    RearRight,
}

impl MotorId {
    /// All four motors in a fixed order
    pub const ALL: [MotorId; 4] = [
        MotorId::FrontLeft,
        MotorId::FrontRight,
        MotorId::RearLeft,
        MotorId::RearRight,
    ];

    /// Wire name used by the command protocol
    pub fn wire_name(&self) -> &'static str {
        match self {
            MotorId::FrontLeft => "front_left",
            MotorId::FrontRight => "front_right",
            MotorId::RearLeft => "rear_left",
            MotorId::RearRight => "rear_right",
        }
    }
}

impl fmt::Display for MotorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.wire_name())
    }
}

impl FromStr for MotorId {
    type Err = RoverError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "front_left" => Ok(MotorId::FrontLeft),
            "front_right" => Ok(MotorId::FrontRight),
            "rear_left" => Ok(MotorId::RearLeft),
            "rear_right" => Ok(MotorId::RearRight),
            other => Err(RoverError::Protocol {
                reason: format!("unknown motor '{}'", other),
            }),
        }
    }
}

/// Port to the physical motor driver.
///
/// Implementations live outside this workspace (GPIO/PWM bindings); the
/// core only calls them. `percent` is -100.0 (full backward) to 100.0
/// (full forward) and is clamped by callers before it arrives here.
#[async_trait]
pub trait MotorDriver: Send + Sync {
    /// Set one motor's speed as a signed percentage
    async fn set_motor_speed(&self, motor: MotorId, percent: f32) -> Result<(), RoverError>;
}

/// Drive all four wheels from a computed [`WheelSpeeds`].
///
/// The first driver error aborts the remaining writes and is returned to
/// the caller; the router surfaces it in the response without tearing the
/// connection down.
pub async fn apply_wheel_speeds(
    driver: &dyn MotorDriver,
    speeds: WheelSpeeds,
) -> Result<(), RoverError> {
    driver
        .set_motor_speed(MotorId::FrontLeft, speeds.front_left)
        .await?;
    driver
        .set_motor_speed(MotorId::RearLeft, speeds.rear_left)
        .await?;
    driver
        .set_motor_speed(MotorId::FrontRight, speeds.front_right)
        .await?;
    driver
        .set_motor_speed(MotorId::RearRight, speeds.rear_right)
        .await?;
    Ok(())
}

/// Adapter for chassis whose motors are wired in reverse.
///
/// The sign convention of [`compute_wheel_speeds`](crate::kinematics::compute_wheel_speeds)
/// is hardware-agnostic; a rover with inverted wiring wraps its real driver
/// in this adapter so the inversion lives at the port boundary and nowhere
/// else.
pub struct ReversedPolarity<D> {
    inner: D,
}

impl<D> ReversedPolarity<D> {
    /// Wrap a driver, negating every commanded speed
    pub fn new(inner: D) -> Self {
        Self { inner }
    }

    /// Unwrap the underlying driver
    pub fn into_inner(self) -> D {
        self.inner
    }
}

#[async_trait]
impl<D: MotorDriver> MotorDriver for ReversedPolarity<D> {
    async fn set_motor_speed(&self, motor: MotorId, percent: f32) -> Result<(), RoverError> {
        self.inner
            .set_motor_speed(motor, clamp_percent(-percent))
            .await
    }
}

/// Mock motor driver that records every command it receives.
///
/// Used by the unit tests and the demo binaries; also handy as a dry-run
/// driver on machines without the motor HAT attached.
#[derive(Default)]
pub struct RecordingMotorDriver {
    calls: Arc<Mutex<Vec<(MotorId, f32)>>>,
    fail_next: Mutex<Option<String>>,
}

impl RecordingMotorDriver {
    /// Create a new recording driver
    pub fn new() -> Self {
        Self::default()
    }

    /// All `(motor, percent)` pairs received so far, in call order
    pub fn calls(&self) -> Vec<(MotorId, f32)> {
        self.calls.lock().clone()
    }

    /// Most recent speed commanded for a motor, if any
    pub fn last_speed(&self, motor: MotorId) -> Option<f32> {
        self.calls
            .lock()
            .iter()
            .rev()
            .find(|(m, _)| *m == motor)
            .map(|(_, p)| *p)
    }

    /// Clear the recorded call history
    pub fn clear(&self) {
        self.calls.lock().clear();
    }

    /// Make the next `set_motor_speed` call fail with a hardware error
    pub fn fail_next(&self, reason: impl Into<String>) {
        *self.fail_next.lock() = Some(reason.into());
    }
}

#[async_trait]
impl MotorDriver for RecordingMotorDriver {
    async fn set_motor_speed(&self, motor: MotorId, percent: f32) -> Result<(), RoverError> {
        if let Some(reason) = self.fail_next.lock().take() {
            return Err(RoverError::Hardware {
                motor: motor.to_string(),
                reason,
            });
        }
        debug!(motor = %motor, percent, "recording motor command");
        self.calls.lock().push((motor, percent));
        Ok(())
    }
}
