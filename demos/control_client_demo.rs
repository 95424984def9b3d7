//! Control client demo
//!
//! Connects to a running robot server (see robot_server_demo) and drives
//! it through a short scripted joystick session: forward, a right arc,
//! then a dead-man release that stops the rover.
//!
//! Run with: cargo run --example control_client_demo

use roverlink::{Axis, ControlChannel, InputEvent, InputMapper, InputMapperConfig};
use std::time::Duration;
use tokio::sync::mpsc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    println!("🎮 Roverlink Control Client Demo");
    println!("================================\n");

    let channel = ControlChannel::new("ws://127.0.0.1:5000/");

    // Same mapper a real gamepad bridge would use: dead zone plus a
    // dead-man button gating motion
    let mut mapper = InputMapper::new(InputMapperConfig {
        dead_zone: 0.15,
        enable_button: Some(4),
    });

    let (events_tx, events_rx) = mpsc::channel(32);

    let session = tokio::spawn(async move {
        let script = [
            InputEvent::ButtonPressed(4),
            InputEvent::AxisMoved {
                axis: Axis::Y,
                value: 0.8,
            },
            InputEvent::AxisMoved {
                axis: Axis::X,
                value: 0.5,
            },
            InputEvent::AxisMoved {
                axis: Axis::X,
                value: 0.05, // inside the dead zone: straightens out
            },
            InputEvent::ButtonReleased(4),
        ];
        for event in script {
            println!("  input: {:?}", event);
            if events_tx.send(event).await.is_err() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(500)).await;
        }
    });

    mapper.pump(events_rx, &channel).await;
    session.await?;

    channel.close().await;
    println!("\n✅ Session complete");
    Ok(())
}
