//! Differential-drive kinematics
//!
//! Maps a 2D control vector (joystick x/y) onto four signed wheel-speed
//! percentages. Pure and hardware-agnostic: the rover's reversed motor
//! wiring is compensated at the motor port boundary, never here.

/// Signed speed percentages for the four wheels, each in [-100, 100]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WheelSpeeds {
    /// Front-left wheel speed
    pub front_left: f32,
    /// Front-right wheel speed
    pub front_right: f32,
    /// Rear-left wheel speed
    pub rear_left: f32,
    /// Rear-right wheel speed
    pub rear_right: f32,
}

impl WheelSpeeds {
    /// All four wheels stopped
    pub const STOP: Self = Self {
        front_left: 0.0,
        front_right: 0.0,
        rear_left: 0.0,
        rear_right: 0.0,
    };

    /// Build from one speed per side; front and rear wheels on a side
    /// always match on a skid-steer chassis.
    pub fn from_sides(left: f32, right: f32) -> Self {
        Self {
            front_left: left,
            front_right: right,
            rear_left: left,
            rear_right: right,
        }
    }
}

/// Clamp a speed percentage into the valid [-100, 100] range
pub fn clamp_percent(value: f32) -> f32 {
    value.clamp(-100.0, 100.0)
}

/// Compute per-wheel speeds for a joystick vector.
///
/// `x` is the turn axis (-1.0 full left, 1.0 full right), `y` the drive
/// axis (-1.0 full backward, 1.0 full forward). The differential mix is
///
/// ```text
/// forward = y * 100
/// turn    = x * 100
/// left    = clamp(forward - turn)
/// right   = clamp(forward + turn)
/// ```
///
/// so a pure turn (x=1, y=0) spins the sides in opposite directions, and a
/// full diagonal (x=1, y=1) saturates to `left=0, right=100`.
pub fn compute_wheel_speeds(x: f32, y: f32) -> WheelSpeeds {
    let forward = y * 100.0;
    let turn = x * 100.0;

    let left = clamp_percent(forward - turn);
    let right = clamp_percent(forward + turn);

    WheelSpeeds::from_sides(left, right)
}
