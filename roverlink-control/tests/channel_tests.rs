//! Integration tests for the control channel
//!
//! Each test runs a scripted WebSocket endpoint on loopback and drives
//! the channel against it, asserting on transport-level accept counts to
//! pin down the single-connect-attempt guarantee.

use futures::{SinkExt, StreamExt};
use roverlink_control::{ChannelError, ChannelState, ControlChannel, ControlChannelConfig};
use roverlink_core::Command;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio_tungstenite::{accept_async, tungstenite::Message};

fn quick_config() -> ControlChannelConfig {
    ControlChannelConfig {
        connect_timeout: Duration::from_secs(2),
        ack_timeout: Duration::from_secs(1),
    }
}

/// How a scripted endpoint treats each connection
#[derive(Clone, Copy)]
enum ServerScript {
    /// Acknowledge every command, keep the connection open
    AckForever,
    /// Acknowledge one command, then drop the connection
    AckOnceThenClose,
    /// Reply with a no-action marker to everything
    NackForever,
    /// Accept the WebSocket but never reply
    Mute,
}

/// Spawn a scripted endpoint; returns its address and an accept counter
async fn spawn_endpoint(script: ServerScript) -> (SocketAddr, Arc<AtomicUsize>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let accepts = Arc::new(AtomicUsize::new(0));

    let counter = Arc::clone(&accepts);
    tokio::spawn(async move {
        loop {
            let Ok((stream, _)) = listener.accept().await else {
                break;
            };
            counter.fetch_add(1, Ordering::SeqCst);

            tokio::spawn(async move {
                let Ok(mut ws) = accept_async(stream).await else {
                    return;
                };
                let mut answered = 0usize;
                while let Some(Ok(message)) = ws.next().await {
                    let Message::Text(text) = message else {
                        continue;
                    };
                    match script {
                        ServerScript::AckForever => {
                            let _ = ws.send(Message::Text(format!("OK:{}", text))).await;
                        }
                        ServerScript::AckOnceThenClose => {
                            let _ = ws.send(Message::Text(format!("OK:{}", text))).await;
                            answered += 1;
                            if answered == 1 {
                                return;
                            }
                        }
                        ServerScript::NackForever => {
                            let _ = ws
                                .send(Message::Text("NOACTION:unrecognized".to_string()))
                                .await;
                        }
                        ServerScript::Mute => {}
                    }
                }
            });
        }
    });

    (addr, accepts)
}

/// Spawn a TCP listener that accepts but never speaks WebSocket, leaving
/// connect attempts in flight until they time out
async fn spawn_stalling_listener() -> (SocketAddr, Arc<AtomicUsize>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let accepts = Arc::new(AtomicUsize::new(0));

    let counter = Arc::clone(&accepts);
    tokio::spawn(async move {
        let mut held = Vec::new();
        loop {
            let Ok((stream, _)) = listener.accept().await else {
                break;
            };
            counter.fetch_add(1, Ordering::SeqCst);
            held.push(stream);
        }
    });

    (addr, accepts)
}

#[tokio::test]
async fn command_is_sent_and_acknowledged() {
    let (addr, accepts) = spawn_endpoint(ServerScript::AckForever).await;
    let channel = ControlChannel::with_config(format!("ws://{}/", addr), quick_config());

    let echo = channel
        .send_command(&Command::Move { x: 0.0, y: 0.8 })
        .await
        .unwrap();
    assert!(echo.contains("move"));
    assert_eq!(channel.state(), ChannelState::Connected);

    // Second command reuses the established transport
    channel.send_command(&Command::Stop).await.unwrap();
    assert_eq!(accepts.load(Ordering::SeqCst), 1);

    channel.close().await;
    assert_eq!(channel.state(), ChannelState::Idle);
}

#[tokio::test]
async fn concurrent_connects_collapse_to_one_attempt() {
    let (addr, accepts) = spawn_stalling_listener().await;
    let channel = Arc::new(ControlChannel::with_config(
        format!("ws://{}/", addr),
        quick_config(),
    ));

    let first = {
        let channel = Arc::clone(&channel);
        tokio::spawn(async move { channel.connect().await })
    };

    // Let the first attempt reach the wire, then pile on
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(channel.state(), ChannelState::Connecting);

    for _ in 0..5 {
        match channel.connect().await {
            Err(ChannelError::ConnectInProgress { last_state }) => {
                assert_eq!(last_state, ChannelState::Connecting);
            }
            other => panic!("expected ConnectInProgress, got {:?}", other.err()),
        }
    }

    // The stalled attempt eventually times out; still only one accept
    assert!(first.await.unwrap().is_err());
    assert_eq!(accepts.load(Ordering::SeqCst), 1);
    assert_eq!(channel.state(), ChannelState::Idle);
}

#[tokio::test]
async fn send_failure_triggers_fresh_connect_on_next_send() {
    let (addr, accepts) = spawn_endpoint(ServerScript::AckOnceThenClose).await;
    let channel = ControlChannel::with_config(format!("ws://{}/", addr), quick_config());

    channel
        .send_command(&Command::Move { x: 0.2, y: 0.2 })
        .await
        .unwrap();
    assert_eq!(accepts.load(Ordering::SeqCst), 1);

    // Server dropped the connection after the first ack; this send fails
    // and marks the channel idle
    let result = channel.send_command(&Command::Stop).await;
    assert!(result.is_err());
    assert_eq!(channel.state(), ChannelState::Idle);

    // The immediately following send reconnects before sending
    channel.send_command(&Command::Stop).await.unwrap();
    assert_eq!(accepts.load(Ordering::SeqCst), 2);
    assert_eq!(channel.state(), ChannelState::Connected);
}

#[tokio::test]
async fn non_success_reply_is_a_delivery_failure() {
    let (addr, _accepts) = spawn_endpoint(ServerScript::NackForever).await;
    let channel = ControlChannel::with_config(format!("ws://{}/", addr), quick_config());

    match channel.send_command(&Command::Stop).await {
        Err(ChannelError::Nack { response }) => {
            assert!(response.starts_with("NOACTION:"));
        }
        other => panic!("expected Nack, got {:?}", other),
    }
    assert_eq!(channel.state(), ChannelState::Idle);
}

#[tokio::test]
async fn missing_acknowledgement_times_out() {
    let (addr, _accepts) = spawn_endpoint(ServerScript::Mute).await;
    let channel = ControlChannel::with_config(
        format!("ws://{}/", addr),
        ControlChannelConfig {
            connect_timeout: Duration::from_secs(2),
            ack_timeout: Duration::from_millis(200),
        },
    );

    match channel.send_command(&Command::Stop).await {
        Err(ChannelError::Timeout { operation, .. }) => {
            assert_eq!(operation, "acknowledge");
        }
        other => panic!("expected Timeout, got {:?}", other),
    }
    assert_eq!(channel.state(), ChannelState::Idle);
}

#[tokio::test]
async fn connect_is_idempotent_when_connected() {
    let (addr, accepts) = spawn_endpoint(ServerScript::AckForever).await;
    let channel = ControlChannel::with_config(format!("ws://{}/", addr), quick_config());

    channel.connect().await.unwrap();
    channel.connect().await.unwrap();
    assert_eq!(accepts.load(Ordering::SeqCst), 1);
}
