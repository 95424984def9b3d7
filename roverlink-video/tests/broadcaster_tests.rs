//! Integration tests for the frame broadcaster
//!
//! Exercises the consumer-count edge triggering of the capture device,
//! the wait-for-next-frame blocking semantics, and the latest-frame-wins
//! model under slow consumers.

use roverlink_video::{CaptureConfig, FrameBroadcaster, FrameSource, TestPatternSource};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;

fn fast_broadcaster() -> (Arc<TestPatternSource>, FrameBroadcaster) {
    let source = TestPatternSource::new();
    let config = CaptureConfig {
        framerate: 100.0,
        ..CaptureConfig::default()
    };
    let broadcaster =
        FrameBroadcaster::new(source.clone() as Arc<dyn FrameSource>, config).unwrap();
    (source, broadcaster)
}

#[tokio::test]
async fn first_consumer_starts_capture_exactly_once() {
    let (source, broadcaster) = fast_broadcaster();
    assert_eq!(source.start_count(), 0);

    let handle = broadcaster.add_consumer().await.unwrap();
    assert_eq!(source.start_count(), 1);
    assert!(source.is_started());

    broadcaster.remove_consumer(handle).await;
    assert_eq!(source.stop_count(), 1);
    assert!(!source.is_started());
}

#[tokio::test]
async fn only_zero_one_edges_touch_the_device() {
    let (source, broadcaster) = fast_broadcaster();

    let a = broadcaster.add_consumer().await.unwrap();
    let b = broadcaster.add_consumer().await.unwrap();
    let c = broadcaster.add_consumer().await.unwrap();
    assert_eq!(source.start_count(), 1);
    assert_eq!(broadcaster.active_consumers(), 3);

    // Intermediate churn: pairs of remove/add between the edges
    broadcaster.remove_consumer(b).await;
    let d = broadcaster.add_consumer().await.unwrap();
    broadcaster.remove_consumer(c).await;
    assert_eq!(source.start_count(), 1);
    assert_eq!(source.stop_count(), 0);

    broadcaster.remove_consumer(a).await;
    broadcaster.remove_consumer(d).await;
    assert_eq!(source.stop_count(), 1);

    // Next viewer powers the device back up
    let e = broadcaster.add_consumer().await.unwrap();
    assert_eq!(source.start_count(), 2);
    broadcaster.remove_consumer(e).await;
    assert_eq!(source.stop_count(), 2);
}

#[tokio::test]
async fn wait_for_next_frame_blocks_until_strictly_newer() {
    let (_source, broadcaster) = fast_broadcaster();
    let handle = broadcaster.add_consumer().await.unwrap();

    // Get a first frame so there is a current sequence to wait past
    let first = timeout(
        Duration::from_secs(2),
        broadcaster.wait_for_next_frame(handle.last_seq),
    )
    .await
    .expect("first frame should arrive");
    assert!(first.seq > handle.last_seq);

    // Waiting at the current sequence must block until a newer frame
    let next = timeout(
        Duration::from_secs(2),
        broadcaster.wait_for_next_frame(first.seq),
    )
    .await
    .expect("newer frame should arrive");
    assert!(next.seq > first.seq);

    // Waiting behind the cursor returns immediately with the current frame
    let current = timeout(
        Duration::from_millis(50),
        broadcaster.wait_for_next_frame(0),
    )
    .await
    .expect("stale cursor should not block");
    assert!(current.seq >= next.seq);

    broadcaster.remove_consumer(handle).await;
}

#[tokio::test]
async fn slow_consumer_sees_latest_frame_not_a_backlog() {
    let (_source, broadcaster) = fast_broadcaster();
    let handle = broadcaster.add_consumer().await.unwrap();

    let first = broadcaster.wait_for_next_frame(0).await;

    // Stall long enough for many publications to pass this consumer by
    tokio::time::sleep(Duration::from_millis(200)).await;

    let latest = broadcaster.wait_for_next_frame(first.seq).await;
    assert!(
        latest.seq > first.seq + 1,
        "expected to skip ahead, got {} after {}",
        latest.seq,
        first.seq
    );
    // Non-blocking read agrees with the waited-for frame
    let current = broadcaster.current_frame().unwrap();
    assert!(current.seq >= latest.seq);

    broadcaster.remove_consumer(handle).await;
}

#[tokio::test]
async fn sequence_numbers_survive_capture_restarts() {
    let (_source, broadcaster) = fast_broadcaster();

    let handle = broadcaster.add_consumer().await.unwrap();
    let frame = broadcaster.wait_for_next_frame(0).await;
    broadcaster.remove_consumer(handle).await;

    let handle = broadcaster.add_consumer().await.unwrap();
    let after_restart = broadcaster.wait_for_next_frame(frame.seq).await;
    assert!(after_restart.seq > frame.seq);
    broadcaster.remove_consumer(handle).await;
}

#[tokio::test]
async fn stats_track_publications() {
    let (_source, broadcaster) = fast_broadcaster();
    let handle = broadcaster.add_consumer().await.unwrap();

    let frame = broadcaster.wait_for_next_frame(0).await;
    let stats = broadcaster.stats();
    assert!(stats.frames_published >= 1);
    assert!(stats.last_seq >= frame.seq);

    broadcaster.remove_consumer(handle).await;
}

#[tokio::test]
async fn failed_grab_is_retried_and_counted() {
    let (source, broadcaster) = fast_broadcaster();
    let handle = broadcaster.add_consumer().await.unwrap();

    let first = broadcaster.wait_for_next_frame(0).await;
    assert_eq!(broadcaster.stats().capture_errors, 0);

    source.fail_next_capture("sensor glitch");

    // The failed grab is counted, never surfaced to consumers
    let mut counted = false;
    for _ in 0..50 {
        if broadcaster.stats().capture_errors >= 1 {
            counted = true;
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert!(counted, "capture error never counted");

    // After the backoff the loop resumes publishing good frames
    let recovered = timeout(
        Duration::from_secs(2),
        broadcaster.wait_for_next_frame(first.seq),
    )
    .await
    .expect("capture loop should survive a failed grab");
    assert!(recovered.seq > first.seq);

    broadcaster.remove_consumer(handle).await;
}

#[tokio::test]
async fn concurrent_registration_is_race_free() {
    let (source, broadcaster) = fast_broadcaster();
    let broadcaster = Arc::new(broadcaster);

    let mut joins = Vec::new();
    for _ in 0..16 {
        let broadcaster = Arc::clone(&broadcaster);
        joins.push(tokio::spawn(async move {
            let handle = broadcaster.add_consumer().await.unwrap();
            tokio::time::sleep(Duration::from_millis(10)).await;
            broadcaster.remove_consumer(handle).await;
        }));
    }
    for join in joins {
        join.await.unwrap();
    }

    assert_eq!(broadcaster.active_consumers(), 0);
    assert!(!source.is_started());
    assert_eq!(source.start_count(), source.stop_count());
}
