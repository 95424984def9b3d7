//! Command router
//!
//! Parses one wire payload into a typed command, dispatches it through
//! kinematics to the motor driver, and renders the single response line.
//! Parse failures and hardware errors are answered, never thrown: the
//! connection keeps serving subsequent commands regardless.

use roverlink_core::{
    apply_wheel_speeds, compute_wheel_speeds, Command, CommandResponse, MotorDriver, MotorId,
    RoverError, WheelSpeeds,
};
use std::sync::Arc;
use tracing::{debug, warn};

/// Server-side dispatcher from wire payloads to motor actuation
pub struct CommandRouter {
    driver: Arc<dyn MotorDriver>,
}

impl CommandRouter {
    /// Create a router over the injected motor driver
    pub fn new(driver: Arc<dyn MotorDriver>) -> Self {
        Self { driver }
    }

    /// Handle one request payload, producing exactly one response line.
    pub async fn route(&self, payload: &str) -> String {
        let command = match Command::parse(payload) {
            Ok(command) => command,
            Err(e) => {
                debug!("unrecognized payload: {}", e);
                return CommandResponse::NoAction(e.to_string()).to_wire();
            }
        };

        match self.execute(&command).await {
            Ok(()) => CommandResponse::Ok(command.to_string()).to_wire(),
            Err(RoverError::Protocol { reason }) => {
                debug!("rejected command: {}", reason);
                CommandResponse::NoAction(reason).to_wire()
            }
            Err(e) => {
                warn!(command = %command, "hardware rejected command: {}", e);
                CommandResponse::HardwareError(e.to_string()).to_wire()
            }
        }
    }

    /// Execute a typed command against the driver
    async fn execute(&self, command: &Command) -> Result<(), RoverError> {
        match command {
            Command::Move { x, y } => {
                let speeds = compute_wheel_speeds(*x, *y);
                apply_wheel_speeds(self.driver.as_ref(), speeds).await
            }
            Command::Motor { motor, percent } => {
                let motor: MotorId = motor.parse()?;
                self.driver.set_motor_speed(motor, *percent).await
            }
            Command::Stop => self.stop_all().await,
        }
    }

    /// Stop all four wheels; also used by the server when a client vanishes
    pub async fn stop_all(&self) -> Result<(), RoverError> {
        apply_wheel_speeds(self.driver.as_ref(), WheelSpeeds::STOP).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use roverlink_core::RecordingMotorDriver;

    fn router_with_recorder() -> (Arc<RecordingMotorDriver>, CommandRouter) {
        let driver = Arc::new(RecordingMotorDriver::new());
        let router = CommandRouter::new(driver.clone() as Arc<dyn MotorDriver>);
        (driver, router)
    }

    #[tokio::test]
    async fn move_command_drives_four_wheels() {
        let (driver, router) = router_with_recorder();

        let response = router.route(r#"{"kind":"move","x":0.0,"y":0.8}"#).await;
        assert!(response.starts_with("OK:"));

        for motor in MotorId::ALL {
            let speed = driver.last_speed(motor).unwrap();
            assert!((speed - 80.0).abs() < 1e-4);
        }
    }

    #[tokio::test]
    async fn unrecognized_payload_touches_no_motor() {
        let (driver, router) = router_with_recorder();

        let response = router.route(r#"{"kind":"dance","tempo":120}"#).await;
        assert!(response.starts_with("NOACTION:"));
        assert!(driver.calls().is_empty());

        let response = router.route("definitely not json").await;
        assert!(response.starts_with("NOACTION:"));
        assert!(driver.calls().is_empty());
    }

    #[tokio::test]
    async fn unknown_motor_name_is_no_action() {
        let (driver, router) = router_with_recorder();

        let response = router
            .route(r#"{"kind":"motor","motor":"left_caster","percent":10}"#)
            .await;
        assert!(response.starts_with("NOACTION:"));
        assert!(driver.calls().is_empty());
    }

    #[tokio::test]
    async fn motor_override_drives_one_wheel() {
        let (driver, router) = router_with_recorder();

        let response = router
            .route(r#"{"kind":"motor","motor":"rear_left","percent":-40}"#)
            .await;
        assert!(response.starts_with("OK:"));
        assert_eq!(driver.calls(), vec![(MotorId::RearLeft, -40.0)]);
    }

    #[tokio::test]
    async fn stop_zeroes_all_wheels() {
        let (driver, router) = router_with_recorder();

        router.route(r#"{"kind":"move","x":0.0,"y":1.0}"#).await;
        let response = router.route(r#"{"kind":"stop"}"#).await;
        assert!(response.starts_with("OK:"));

        for motor in MotorId::ALL {
            assert_eq!(driver.last_speed(motor), Some(0.0));
        }
    }

    #[tokio::test]
    async fn hardware_error_is_reported_and_not_fatal() {
        let (driver, router) = router_with_recorder();

        driver.fail_next("bus fault");
        let response = router.route(r#"{"kind":"move","x":0.0,"y":0.5}"#).await;
        assert!(response.starts_with("ERR:"));
        assert!(response.contains("bus fault"));

        // The next command on the same router still processes
        let response = router.route(r#"{"kind":"stop"}"#).await;
        assert!(response.starts_with("OK:"));
    }

    #[tokio::test]
    async fn payload_values_are_clamped_before_actuation() {
        let (driver, router) = router_with_recorder();

        let response = router.route(r#"{"kind":"move","x":0.0,"y":5.0}"#).await;
        assert!(response.starts_with("OK:"));
        for motor in MotorId::ALL {
            assert_eq!(driver.last_speed(motor), Some(100.0));
        }
    }
}
