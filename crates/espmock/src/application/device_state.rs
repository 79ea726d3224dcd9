//! DeviceHub: the emulated device's state and its subscriber registry.
//!
//! One `DeviceHub` exists per server.  It is the only owner of:
//!
//! - the switch's current boolean state,
//! - the set of sessions subscribed to state changes,
//! - the set of sessions subscribed to log lines,
//! - the "heartbeat is running" flag.
//!
//! # Locking (for beginners)
//!
//! Connection tasks run on Tokio's multi-threaded runtime, so two clients can
//! send commands at literally the same time.  Every read or write of the
//! fields above goes through one `tokio::sync::Mutex`.
//!
//! "Set the switch, then tell the subscribers" happens under that one lock,
//! so every subscriber sees state frames in the order the mutations
//! happened.  Frames are handed to subscribers with
//! [`SessionHandle::try_deliver`], which never waits, so the lock is never
//! held across anything a client controls.
//!
//! # Broadcast failures
//!
//! A subscriber whose queue is full (it stopped reading) or closed (its
//! writer hit a reset or broken pipe) is evicted from both sets and its
//! eviction token is cancelled.  The broadcast carries on with the remaining
//! subscribers.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use espmock_core::protocol::messages::{LogLevel, SubscribeLogsResponse, SwitchStateResponse};
use espmock_core::{Frame, NativeMessage, PayloadCodec};
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::application::heartbeat;
use crate::application::session::{DeliveryError, SessionError, SessionHandle, SessionId};
use crate::domain::MockDeviceConfig;

/// Result of applying a switch command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandOutcome {
    /// The key matched; the switch now holds `state`.
    Applied { state: bool },
    /// No entity has this key.  Nothing changed and nothing was broadcast.
    UnknownKey { key: u32 },
}

/// Which subscriber set a broadcast targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Audience {
    States,
    Logs,
}

/// A broadcast target that did not take its frame.
type Refused = (SessionHandle, DeliveryError);

/// Everything guarded by the hub's lock.
struct HubState {
    switch_state: bool,
    state_subscribers: HashMap<SessionId, SessionHandle>,
    log_subscribers: HashMap<SessionId, SessionHandle>,
    heartbeat_running: bool,
}

impl HubState {
    fn audience(&self, audience: Audience) -> &HashMap<SessionId, SessionHandle> {
        match audience {
            Audience::States => &self.state_subscribers,
            Audience::Logs => &self.log_subscribers,
        }
    }

    /// Offers `frame` to every member of `audience` without waiting.
    ///
    /// Members that refuse it are removed from both sets and returned.
    fn deliver(&mut self, audience: Audience, frame: &Frame) -> Vec<Refused> {
        let refused: Vec<Refused> = self
            .audience(audience)
            .values()
            .filter_map(|target| {
                target
                    .try_deliver(frame.clone())
                    .err()
                    .map(|e| (target.clone(), e))
            })
            .collect();

        for (target, _) in &refused {
            self.state_subscribers.remove(&target.id());
            self.log_subscribers.remove(&target.id());
        }
        refused
    }
}

/// Shared device state and subscriber registry.
///
/// Always handled as `Arc<DeviceHub>`: connection tasks and the heartbeat
/// task each hold a clone.
pub struct DeviceHub {
    config: Arc<MockDeviceConfig>,
    codec: Arc<dyn PayloadCodec>,
    shutdown: CancellationToken,
    inner: Mutex<HubState>,
    next_session: AtomicU64,
}

impl DeviceHub {
    /// Creates the hub with the switch at its configured initial state.
    ///
    /// `shutdown` stops the heartbeat task when cancelled.
    pub fn new(
        config: Arc<MockDeviceConfig>,
        codec: Arc<dyn PayloadCodec>,
        shutdown: CancellationToken,
    ) -> Arc<Self> {
        let switch_state = config.switch.initial_state;
        Arc::new(Self {
            config,
            codec,
            shutdown,
            inner: Mutex::new(HubState {
                switch_state,
                state_subscribers: HashMap::new(),
                log_subscribers: HashMap::new(),
                heartbeat_running: false,
            }),
            next_session: AtomicU64::new(1),
        })
    }

    pub fn config(&self) -> &MockDeviceConfig {
        &self.config
    }

    pub fn codec(&self) -> &dyn PayloadCodec {
        self.codec.as_ref()
    }

    /// Token observed by the heartbeat task.
    pub fn shutdown_token(&self) -> &CancellationToken {
        &self.shutdown
    }

    /// Allocates a process-unique session id (starting at 1).
    pub fn next_session_id(&self) -> SessionId {
        SessionId(self.next_session.fetch_add(1, Ordering::Relaxed))
    }

    /// Current switch state.
    pub async fn switch_state(&self) -> bool {
        self.inner.lock().await.switch_state
    }

    /// SwitchStateResponse for the device's switch in `state`.
    pub fn state_message(&self, state: bool) -> NativeMessage {
        NativeMessage::SwitchStateResponse(SwitchStateResponse {
            key: self.config.switch.key,
            state,
            device_id: 0,
        })
    }

    /// SubscribeLogsResponse carrying `text`.
    pub fn log_message(&self, level: LogLevel, text: &str) -> NativeMessage {
        NativeMessage::SubscribeLogsResponse(SubscribeLogsResponse::line(level, text))
    }

    // ── Subscriptions ─────────────────────────────────────────────────────────

    /// Registers `handle` for state changes and sends it the current state.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError`] if the initial state frame cannot be queued
    /// right away; the session is not registered in that case.
    pub async fn subscribe_states(&self, handle: &SessionHandle) -> Result<(), SessionError> {
        let mut inner = self.inner.lock().await;
        let frame = self.codec.encode(&self.state_message(inner.switch_state))?;
        handle.try_deliver(frame)?;
        inner.state_subscribers.insert(handle.id(), handle.clone());
        debug!("session {}: subscribed to state updates", handle.id());
        Ok(())
    }

    /// Registers `handle` for log lines, greets it, and makes sure the
    /// heartbeat task is running.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError`] if the greeting line cannot be queued right
    /// away; the session is not registered in that case.
    pub async fn subscribe_logs(self: &Arc<Self>, handle: &SessionHandle) -> Result<(), SessionError> {
        let text = format!("[{}] Log streaming started", self.config.device.name);
        let frame = self.codec.encode(&self.log_message(LogLevel::Info, &text))?;
        {
            // Greeting and registration together, so no heartbeat slips in first.
            let mut inner = self.inner.lock().await;
            handle.try_deliver(frame)?;
            inner.log_subscribers.insert(handle.id(), handle.clone());
        }
        debug!("session {}: subscribed to logs", handle.id());

        self.ensure_heartbeat().await;
        Ok(())
    }

    /// Removes a session from both subscriber sets.
    pub async fn unsubscribe(&self, id: SessionId) {
        let mut inner = self.inner.lock().await;
        inner.state_subscribers.remove(&id);
        inner.log_subscribers.remove(&id);
    }

    pub async fn is_state_subscriber(&self, id: SessionId) -> bool {
        self.inner.lock().await.state_subscribers.contains_key(&id)
    }

    pub async fn is_log_subscriber(&self, id: SessionId) -> bool {
        self.inner.lock().await.log_subscribers.contains_key(&id)
    }

    /// `(state subscribers, log subscribers)`.
    pub async fn subscriber_counts(&self) -> (usize, usize) {
        let inner = self.inner.lock().await;
        (inner.state_subscribers.len(), inner.log_subscribers.len())
    }

    // ── Commands ──────────────────────────────────────────────────────────────

    /// Applies a switch command.
    ///
    /// A matching key sets the state, broadcasts a log line describing the
    /// transition to log subscribers, then broadcasts the new state to every
    /// state subscriber (the sender included, if subscribed).  A
    /// non-matching key is a silent no-op.
    pub async fn apply_switch_command(&self, key: u32, state: bool) -> CommandOutcome {
        if key != self.config.switch.key {
            debug!("ignoring switch command for unknown key {key}");
            return CommandOutcome::UnknownKey { key };
        }

        let text = format!(
            "[{}] Switch '{}' turned {}",
            self.config.device.name,
            self.config.switch.name,
            on_off(state)
        );
        let log_frame = self.encode_broadcast(&self.log_message(LogLevel::Info, &text));
        let state_frame = self.encode_broadcast(&self.state_message(state));

        let mut refused = Vec::new();
        {
            let mut inner = self.inner.lock().await;
            inner.switch_state = state;
            if let Some(frame) = &log_frame {
                refused.extend(inner.deliver(Audience::Logs, frame));
            }
            if let Some(frame) = &state_frame {
                refused.extend(inner.deliver(Audience::States, frame));
            }
        }
        info!("switch '{}' state changed to {}", self.config.switch.name, on_off(state));
        evict(refused);

        CommandOutcome::Applied { state }
    }

    fn encode_broadcast(&self, msg: &NativeMessage) -> Option<Frame> {
        match self.codec.encode(msg) {
            Ok(frame) => Some(frame),
            Err(e) => {
                warn!("cannot encode broadcast message: {e}");
                None
            }
        }
    }

    // ── Heartbeat bookkeeping ─────────────────────────────────────────────────

    /// Starts the heartbeat task unless one is already running, nobody
    /// subscribes to logs, or the server is shutting down.
    ///
    /// Returns `true` if a new task was spawned.
    pub async fn ensure_heartbeat(self: &Arc<Self>) -> bool {
        {
            let mut inner = self.inner.lock().await;
            if inner.heartbeat_running
                || inner.log_subscribers.is_empty()
                || self.shutdown.is_cancelled()
            {
                return false;
            }
            inner.heartbeat_running = true;
        }
        tokio::spawn(heartbeat::run_heartbeat(Arc::clone(self)));
        true
    }

    /// Whether a heartbeat task currently owns the "running" flag.
    pub async fn heartbeat_active(&self) -> bool {
        self.inner.lock().await.heartbeat_running
    }

    /// One heartbeat tick: sends beat number `beat` to every log subscriber.
    ///
    /// Returns `false` when nobody subscribes to logs any more.  In that case
    /// the running flag is cleared under the same lock that
    /// [`ensure_heartbeat`](Self::ensure_heartbeat) checks, telling the task
    /// to exit.
    pub(crate) async fn heartbeat_beat(&self, beat: u64) -> bool {
        let refused = {
            let mut inner = self.inner.lock().await;
            if inner.log_subscribers.is_empty() {
                inner.heartbeat_running = false;
                return false;
            }
            let text = format!(
                "[{}] Heartbeat #{beat}, switch={}",
                self.config.device.name,
                on_off(inner.switch_state)
            );
            match self.encode_broadcast(&self.log_message(LogLevel::Debug, &text)) {
                Some(frame) => inner.deliver(Audience::Logs, &frame),
                None => Vec::new(),
            }
        };
        evict(refused);
        true
    }

    /// Clears the running flag after a cancelled heartbeat exits.
    pub(crate) async fn heartbeat_cancelled(&self) {
        self.inner.lock().await.heartbeat_running = false;
    }
}

/// Signals every session a broadcast had to drop.
fn evict(refused: Vec<Refused>) {
    for (target, reason) in refused {
        warn!("session {}: {reason} during broadcast; evicting", target.id());
        target.evict();
    }
}

/// `ON` / `OFF` as used in log lines.
pub fn on_off(state: bool) -> &'static str {
    if state {
        "ON"
    } else {
        "OFF"
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
