//! Heartbeat task.
//!
//! While at least one session subscribes to logs, exactly one heartbeat task
//! runs.  Every interval it sends a DEBUG line such as
//! `[mock-switch-1] Heartbeat #4, switch=ON` to all log subscribers.  The
//! counter starts at 1 for each task.
//!
//! The task exits on its own when it wakes up and finds no log subscribers,
//! and immediately when the server's shutdown token is cancelled.

use std::sync::Arc;

use tracing::debug;

use crate::application::device_state::DeviceHub;

/// Body of the heartbeat task.  Spawned by
/// [`DeviceHub::ensure_heartbeat`], which sets the running flag first.
pub(crate) async fn run_heartbeat(hub: Arc<DeviceHub>) {
    let interval = hub.config().heartbeat_interval();
    let token = hub.shutdown_token().clone();
    let mut beats: u64 = 0;

    debug!("heartbeat started ({interval:?} interval)");

    loop {
        tokio::select! {
            _ = token.cancelled() => {
                hub.heartbeat_cancelled().await;
                debug!("heartbeat cancelled after {beats} beat(s)");
                return;
            }
            _ = tokio::time::sleep(interval) => {}
        }

        // A beat with no listeners clears the running flag itself, so a
        // later subscriber can start a fresh task.
        if !hub.heartbeat_beat(beats + 1).await {
            debug!("heartbeat stopped: no log subscribers");
            return;
        }
        beats += 1;
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use espmock_core::{Frame, LogLevel, NativeMessage, PayloadCodec, ProstCodec};
    use tokio::sync::mpsc;
    use tokio_util::sync::CancellationToken;

    use crate::application::session::SessionHandle;
    use crate::domain::MockDeviceConfig;

    use super::*;

    fn fast_hub() -> Arc<DeviceHub> {
        let config = MockDeviceConfig {
            heartbeat_interval_ms: 20,
            ..MockDeviceConfig::default()
        };
        DeviceHub::new(Arc::new(config), Arc::new(ProstCodec), CancellationToken::new())
    }

    async fn next_line(rx: &mut mpsc::Receiver<Frame>) -> String {
        let frame = tokio::time::timeout(Duration::from_secs(2), rx.recv())
            .await
            .expect("timed out waiting for a log line")
            .expect("channel closed");
        match ProstCodec.decode(&frame).unwrap() {
            NativeMessage::SubscribeLogsResponse(line) => {
                assert_eq!(line.level, LogLevel::Debug as i32);
                line.text()
            }
            other => panic!("expected a log line, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_heartbeat_lines_count_up() {
        // Arrange
        let hub = fast_hub();
        let (tx, mut rx) = mpsc::channel(16);
        let handle = SessionHandle::new(hub.next_session_id(), tx);
        hub.subscribe_logs(&handle).await.unwrap();
        let _started = rx.recv().await.unwrap();

        // Act / Assert
        assert_eq!(next_line(&mut rx).await, "[mock-switch-1] Heartbeat #1, switch=OFF");
        assert_eq!(next_line(&mut rx).await, "[mock-switch-1] Heartbeat #2, switch=OFF");

        hub.shutdown_token().cancel();
    }

    #[tokio::test]
    async fn test_heartbeat_stops_when_last_subscriber_leaves() {
        // Arrange
        let hub = fast_hub();
        let (tx, _rx) = mpsc::channel(16);
        let handle = SessionHandle::new(hub.next_session_id(), tx);
        hub.subscribe_logs(&handle).await.unwrap();
        assert!(hub.heartbeat_active().await);

        // Act
        hub.unsubscribe(handle.id()).await;

        // Assert: the next check point clears the flag
        tokio::time::timeout(Duration::from_secs(2), async {
            while hub.heartbeat_active().await {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("heartbeat must stop");
    }

    #[tokio::test]
    async fn test_heartbeat_exits_on_shutdown() {
        let hub = fast_hub();
        let (tx, _rx) = mpsc::channel(16);
        let handle = SessionHandle::new(hub.next_session_id(), tx);
        hub.subscribe_logs(&handle).await.unwrap();

        hub.shutdown_token().cancel();

        tokio::time::timeout(Duration::from_secs(2), async {
            while hub.heartbeat_active().await {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("heartbeat must stop on shutdown");
    }
}
