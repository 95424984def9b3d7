//! Robot server demo
//!
//! Brings up a full robot process on loopback with mock hardware: the
//! command endpoint on port 5000 and the MJPEG stream on port 8000. Open
//! http://127.0.0.1:8000/ in a browser to watch the test pattern, and
//! point the control client demo at ws://127.0.0.1:5000/.
//!
//! Run with: cargo run --example robot_server_demo

use roverlink::{RobotBuilder, TestPatternSource};
use roverlink_core::{RecordingMotorDriver, ReversedPolarity};
use std::sync::Arc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    println!("🤖 Roverlink Robot Server Demo");
    println!("==============================\n");

    // A real deployment injects its GPIO-backed driver here; the demo
    // records commands instead. The chassis this project grew on has its
    // motors wired in reverse, hence the polarity adapter.
    let driver = Arc::new(ReversedPolarity::new(RecordingMotorDriver::new()));
    let source = TestPatternSource::new();

    let robot = RobotBuilder::new()
        .driver(driver)
        .frame_source(source)
        .control_addr(([127, 0, 0, 1], 5000).into())
        .video_addr(([127, 0, 0, 1], 8000).into())
        .start()
        .await?;

    println!("✅ Robot is up");
    println!("   control endpoint: ws://{}/", robot.control_addr());
    println!("   video stream:     http://{}/stream.mjpg", robot.video_addr());
    println!("   viewer page:      http://{}/", robot.video_addr());
    println!("\nPress Ctrl+C to stop\n");

    tokio::signal::ctrl_c().await?;
    println!("\nShutting down...");
    robot.shutdown().await;
    println!("✅ Done");
    Ok(())
}
