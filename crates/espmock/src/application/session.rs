//! Per-connection session: decoded requests in, reply frames out.
//!
//! A [`Session`] never touches a socket.  Its output goes into a bounded
//! channel ([`SessionHandle`]) drained by the connection's writer task, which
//! keeps the dispatch logic testable with nothing more than an
//! `mpsc::Receiver`.
//!
//! # Request handling
//!
//! | Request                  | Reply                                          |
//! |--------------------------|------------------------------------------------|
//! | HelloRequest             | HelloResponse                                  |
//! | AuthRequest              | none                                           |
//! | PingRequest              | PingResponse                                   |
//! | DeviceInfoRequest        | DeviceInfoResponse                             |
//! | ListEntitiesRequest      | ListEntitiesSwitchResponse, ListEntitiesDone   |
//! | SubscribeStatesRequest   | current SwitchStateResponse, then live updates |
//! | SubscribeLogsRequest     | "Log streaming started", then live lines       |
//! | SwitchCommandRequest     | broadcast (see [`DeviceHub`])                  |
//! | DisconnectRequest        | DisconnectResponse, then the session closes    |
//! | anything else            | ignored                                        |
//!
//! # Slow clients
//!
//! A session's own replies wait for room in its queue, which only holds up
//! that session.  Broadcasts from the hub never wait: a subscriber whose
//! queue is full is evicted and its [`SessionHandle::eviction_token`] is
//! cancelled, which the connection treats as a reason to hang up.

use std::fmt;
use std::net::SocketAddr;
use std::sync::Arc;

use espmock_core::protocol::messages::{
    DeviceInfoResponse, DisconnectResponse, HelloResponse, ListEntitiesDoneResponse,
    ListEntitiesSwitchResponse, PingResponse,
};
use espmock_core::{Frame, NativeMessage, ProtocolError};
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::application::device_state::{CommandOutcome, DeviceHub};
use crate::domain::MockDeviceConfig;

/// Native API version advertised in the hello response.
pub const API_VERSION_MAJOR: u32 = 1;
pub const API_VERSION_MINOR: u32 = 14;

/// `server_info` advertised in the hello response.
pub const SERVER_INFO: &str = "MockESPHomeDevice";

/// Process-unique session identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionId(pub u64);

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Errors that end a session.
#[derive(Debug, Error)]
pub enum SessionError {
    /// The writer task is gone; nothing more can be delivered.
    #[error("session output closed")]
    OutputClosed,

    /// The output queue has no room and the frame cannot wait.
    #[error("session output queue is full")]
    OutputFull,

    /// A reply could not be encoded.
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),
}

/// Why a frame could not be queued without waiting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum DeliveryError {
    #[error("output queue full")]
    Full,
    #[error("output closed")]
    Closed,
}

impl From<DeliveryError> for SessionError {
    fn from(e: DeliveryError) -> Self {
        match e {
            DeliveryError::Full => SessionError::OutputFull,
            DeliveryError::Closed => SessionError::OutputClosed,
        }
    }
}

/// Cloneable output endpoint of a session.
///
/// The registry stores these, so a broadcast can reach a session without
/// knowing anything about its socket.  Clones share one eviction token.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    id: SessionId,
    sink: mpsc::Sender<Frame>,
    evicted: CancellationToken,
}

impl SessionHandle {
    pub fn new(id: SessionId, sink: mpsc::Sender<Frame>) -> Self {
        Self {
            id,
            sink,
            evicted: CancellationToken::new(),
        }
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    /// Queues a frame for the writer task.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::OutputClosed`] once the writer has stopped.
    pub async fn send(&self, frame: Frame) -> Result<(), SessionError> {
        self.sink
            .send(frame)
            .await
            .map_err(|_| SessionError::OutputClosed)
    }

    /// Queues a frame only if there is room right now.
    ///
    /// # Errors
    ///
    /// Returns [`DeliveryError`] when the queue is full or closed.
    pub fn try_deliver(&self, frame: Frame) -> Result<(), DeliveryError> {
        self.sink.try_send(frame).map_err(|e| match e {
            TrySendError::Full(_) => DeliveryError::Full,
            TrySendError::Closed(_) => DeliveryError::Closed,
        })
    }

    /// Marks the session as dropped by the hub.
    pub fn evict(&self) {
        self.evicted.cancel();
    }

    /// Cancelled once the hub has evicted this session.
    pub fn eviction_token(&self) -> CancellationToken {
        self.evicted.clone()
    }
}

/// Where a session is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    /// Socket accepted, no hello yet.
    Connected,
    /// Hello answered.
    Greeted,
    /// Listed entities or subscribed to something.
    Active,
    /// Unregistered from the hub; no further output.
    Closed,
}

/// What the read loop should do after a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Close,
}

/// One client connection's protocol state.
pub struct Session {
    handle: SessionHandle,
    peer: SocketAddr,
    hub: Arc<DeviceHub>,
    phase: SessionPhase,
}

impl Session {
    pub fn new(handle: SessionHandle, peer: SocketAddr, hub: Arc<DeviceHub>) -> Self {
        Self {
            handle,
            peer,
            hub,
            phase: SessionPhase::Connected,
        }
    }

    pub fn id(&self) -> SessionId {
        self.handle.id()
    }

    pub fn peer(&self) -> SocketAddr {
        self.peer
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    /// Asks the hub, so an eviction shows up here too.
    pub async fn is_subscribed_states(&self) -> bool {
        self.hub.is_state_subscriber(self.id()).await
    }

    pub async fn is_subscribed_logs(&self) -> bool {
        self.hub.is_log_subscriber(self.id()).await
    }

    /// See [`SessionHandle::eviction_token`].
    pub fn eviction_token(&self) -> CancellationToken {
        self.handle.eviction_token()
    }

    /// Decodes and dispatches one frame.
    ///
    /// A payload that fails to decode is logged and skipped; the session
    /// keeps going.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError`] when a reply cannot be delivered.
    pub async fn handle_frame(&mut self, frame: &Frame) -> Result<Flow, SessionError> {
        match self.hub.codec().decode(frame) {
            Ok(msg) => self.dispatch(msg).await,
            Err(e) => {
                warn!("session {}: dropping undecodable frame: {e}", self.id());
                Ok(Flow::Continue)
            }
        }
    }

    /// Acts on one decoded message.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError`] when a reply cannot be delivered.
    pub async fn dispatch(&mut self, msg: NativeMessage) -> Result<Flow, SessionError> {
        if self.phase == SessionPhase::Closed {
            return Ok(Flow::Close);
        }

        match msg {
            NativeMessage::HelloRequest(hello) => {
                info!(
                    "session {}: hello from '{}' (API {}.{})",
                    self.id(),
                    hello.client_info,
                    hello.api_version_major,
                    hello.api_version_minor
                );
                self.reply(NativeMessage::HelloResponse(hello_response(self.hub.config())))
                    .await?;
                if self.phase == SessionPhase::Connected {
                    self.phase = SessionPhase::Greeted;
                }
            }

            // Password auth is not emulated; the request gets no answer.
            NativeMessage::AuthRequest(_) => {
                debug!("session {}: ignoring auth request", self.id());
            }

            NativeMessage::PingRequest(_) => {
                self.reply(NativeMessage::PingResponse(PingResponse {})).await?;
            }

            NativeMessage::DeviceInfoRequest(_) => {
                self.reply(NativeMessage::DeviceInfoResponse(device_info(self.hub.config())))
                    .await?;
            }

            NativeMessage::ListEntitiesRequest(_) => {
                self.reply(NativeMessage::ListEntitiesSwitchResponse(switch_listing(
                    self.hub.config(),
                )))
                .await?;
                self.reply(NativeMessage::ListEntitiesDoneResponse(ListEntitiesDoneResponse {}))
                    .await?;
                self.phase = SessionPhase::Active;
            }

            NativeMessage::SubscribeStatesRequest(_) => {
                self.hub.subscribe_states(&self.handle).await?;
                self.phase = SessionPhase::Active;
            }

            NativeMessage::SubscribeLogsRequest(req) => {
                debug!("session {}: log subscription at level {}", self.id(), req.level);
                self.hub.subscribe_logs(&self.handle).await?;
                self.phase = SessionPhase::Active;
            }

            NativeMessage::SwitchCommandRequest(cmd) => {
                info!(
                    "session {}: switch command key={} state={}",
                    self.id(),
                    cmd.key,
                    cmd.state
                );
                if let CommandOutcome::UnknownKey { key } =
                    self.hub.apply_switch_command(cmd.key, cmd.state).await
                {
                    debug!("session {}: no entity with key {key}", self.id());
                }
            }

            NativeMessage::DisconnectRequest(_) => {
                info!("session {}: client requested disconnect", self.id());
                self.reply(NativeMessage::DisconnectResponse(DisconnectResponse {}))
                    .await?;
                return Ok(Flow::Close);
            }

            NativeMessage::Unknown { msg_type } => {
                debug!("session {}: ignoring unknown message type {msg_type}", self.id());
            }

            // Server-to-client records arriving from a client.
            other @ (NativeMessage::HelloResponse(_)
            | NativeMessage::DisconnectResponse(_)
            | NativeMessage::PingResponse(_)
            | NativeMessage::DeviceInfoResponse(_)
            | NativeMessage::ListEntitiesSwitchResponse(_)
            | NativeMessage::ListEntitiesDoneResponse(_)
            | NativeMessage::SwitchStateResponse(_)
            | NativeMessage::SubscribeLogsResponse(_)) => {
                debug!(
                    "session {}: ignoring unexpected message type {}",
                    self.id(),
                    other.msg_type()
                );
            }
        }

        Ok(Flow::Continue)
    }

    /// Unregisters from every subscriber set.  Safe to call more than once.
    pub async fn close(&mut self) {
        if self.phase == SessionPhase::Closed {
            return;
        }
        self.hub.unsubscribe(self.id()).await;
        self.phase = SessionPhase::Closed;
    }

    async fn reply(&self, msg: NativeMessage) -> Result<(), SessionError> {
        let frame = self.hub.codec().encode(&msg)?;
        self.handle.send(frame).await
    }
}

// ── Response builders ─────────────────────────────────────────────────────────

fn hello_response(config: &MockDeviceConfig) -> HelloResponse {
    HelloResponse {
        api_version_major: API_VERSION_MAJOR,
        api_version_minor: API_VERSION_MINOR,
        server_info: SERVER_INFO.to_string(),
        name: config.device.name.clone(),
    }
}

fn device_info(config: &MockDeviceConfig) -> DeviceInfoResponse {
    let device = &config.device;
    DeviceInfoResponse {
        uses_password: false,
        name: device.name.clone(),
        mac_address: device.mac_address.clone(),
        esphome_version: device.firmware_version.clone(),
        compilation_time: String::new(),
        model: device.model.clone(),
        manufacturer: device.manufacturer.clone(),
        friendly_name: device.display_name(),
    }
}

fn switch_listing(config: &MockDeviceConfig) -> ListEntitiesSwitchResponse {
    let switch = &config.switch;
    ListEntitiesSwitchResponse {
        object_id: switch.object_id.clone(),
        key: switch.key,
        name: switch.name.clone(),
        unique_id: switch.unique_id(&config.device.name),
        icon: String::new(),
        assumed_state: false,
        disabled_by_default: false,
        device_id: 0,
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use espmock_core::protocol::messages::{
        AuthRequest, DeviceInfoRequest, DisconnectRequest, HelloRequest, ListEntitiesRequest,
        PingRequest, SubscribeLogsRequest, SubscribeStatesRequest, SwitchCommandRequest,
        SwitchStateResponse,
    };
    use espmock_core::{PayloadCodec, ProstCodec};
    use mockall::mock;

    use super::*;

    mock! {
        pub Codec {}
        impl PayloadCodec for Codec {
            fn decode(&self, frame: &Frame) -> Result<NativeMessage, ProtocolError>;
            fn encode(&self, msg: &NativeMessage) -> Result<Frame, ProtocolError>;
        }
    }

    fn peer() -> SocketAddr {
        "127.0.0.1:50000".parse().unwrap()
    }

    fn hub_with(codec: Arc<dyn PayloadCodec>) -> Arc<DeviceHub> {
        DeviceHub::new(
            Arc::new(MockDeviceConfig::default()),
            codec,
            CancellationToken::new(),
        )
    }

    fn make_session(hub: &Arc<DeviceHub>) -> (Session, mpsc::Receiver<Frame>) {
        let (tx, rx) = mpsc::channel(32);
        let handle = SessionHandle::new(hub.next_session_id(), tx);
        (Session::new(handle, peer(), Arc::clone(hub)), rx)
    }

    fn next(rx: &mut mpsc::Receiver<Frame>) -> NativeMessage {
        let frame = rx.try_recv().expect("a reply must be queued");
        ProstCodec.decode(&frame).unwrap()
    }

    fn hello() -> NativeMessage {
        NativeMessage::HelloRequest(HelloRequest {
            client_info: "unit-test".to_string(),
            api_version_major: 1,
            api_version_minor: 10,
        })
    }

    #[tokio::test]
    async fn test_hello_reply_and_phase() {
        // Arrange
        let hub = hub_with(Arc::new(ProstCodec));
        let (mut session, mut rx) = make_session(&hub);
        assert_eq!(session.phase(), SessionPhase::Connected);

        // Act
        let flow = session.dispatch(hello()).await.unwrap();

        // Assert
        assert_eq!(flow, Flow::Continue);
        assert_eq!(session.phase(), SessionPhase::Greeted);
        assert_eq!(
            next(&mut rx),
            NativeMessage::HelloResponse(HelloResponse {
                api_version_major: 1,
                api_version_minor: 14,
                server_info: "MockESPHomeDevice".to_string(),
                name: "mock-switch-1".to_string(),
            })
        );
    }

    #[tokio::test]
    async fn test_ping_gets_pong() {
        let hub = hub_with(Arc::new(ProstCodec));
        let (mut session, mut rx) = make_session(&hub);

        session
            .dispatch(NativeMessage::PingRequest(PingRequest {}))
            .await
            .unwrap();

        assert_eq!(next(&mut rx), NativeMessage::PingResponse(PingResponse {}));
    }

    #[tokio::test]
    async fn test_auth_gets_no_reply() {
        let hub = hub_with(Arc::new(ProstCodec));
        let (mut session, mut rx) = make_session(&hub);

        session
            .dispatch(NativeMessage::AuthRequest(AuthRequest {
                password: "secret".to_string(),
            }))
            .await
            .unwrap();

        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_device_info_reports_identity() {
        let hub = hub_with(Arc::new(ProstCodec));
        let (mut session, mut rx) = make_session(&hub);

        session
            .dispatch(NativeMessage::DeviceInfoRequest(DeviceInfoRequest {}))
            .await
            .unwrap();

        match next(&mut rx) {
            NativeMessage::DeviceInfoResponse(info) => {
                assert!(!info.uses_password);
                assert_eq!(info.name, "mock-switch-1");
                assert_eq!(info.mac_address, "AA:BB:CC:DD:EE:FF");
                assert_eq!(info.esphome_version, "2024.12.0");
                assert_eq!(info.model, "ESP32");
                assert_eq!(info.friendly_name, "Mock Switch 1");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_list_entities_sends_descriptor_then_done() {
        let hub = hub_with(Arc::new(ProstCodec));
        let (mut session, mut rx) = make_session(&hub);

        session
            .dispatch(NativeMessage::ListEntitiesRequest(ListEntitiesRequest {}))
            .await
            .unwrap();

        match next(&mut rx) {
            NativeMessage::ListEntitiesSwitchResponse(sw) => {
                assert_eq!(sw.key, 1);
                assert_eq!(sw.object_id, "relay");
                assert_eq!(sw.name, "Relay");
                assert_eq!(sw.unique_id, "mock-switch-1-switch-relay");
            }
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(
            next(&mut rx),
            NativeMessage::ListEntitiesDoneResponse(ListEntitiesDoneResponse {})
        );
        assert_eq!(session.phase(), SessionPhase::Active);
    }

    #[tokio::test]
    async fn test_subscribe_states_sets_flag_and_syncs() {
        let hub = hub_with(Arc::new(ProstCodec));
        let (mut session, mut rx) = make_session(&hub);

        session
            .dispatch(NativeMessage::SubscribeStatesRequest(SubscribeStatesRequest {}))
            .await
            .unwrap();

        assert!(session.is_subscribed_states().await);
        assert!(hub.is_state_subscriber(session.id()).await);
        assert_eq!(
            next(&mut rx),
            NativeMessage::SwitchStateResponse(SwitchStateResponse {
                key: 1,
                state: false,
                device_id: 0
            })
        );
    }

    #[tokio::test]
    async fn test_command_from_unsubscribed_sender_reaches_subscribers_only() {
        // Arrange: `watcher` subscribes, `commander` does not
        let hub = hub_with(Arc::new(ProstCodec));
        let (mut watcher, mut watcher_rx) = make_session(&hub);
        let (mut commander, mut commander_rx) = make_session(&hub);
        watcher
            .dispatch(NativeMessage::SubscribeStatesRequest(SubscribeStatesRequest {}))
            .await
            .unwrap();
        let _initial = next(&mut watcher_rx);

        // Act
        commander
            .dispatch(NativeMessage::SwitchCommandRequest(SwitchCommandRequest {
                key: 1,
                state: true,
                device_id: 0,
            }))
            .await
            .unwrap();

        // Assert
        assert!(hub.switch_state().await);
        assert_eq!(
            next(&mut watcher_rx),
            NativeMessage::SwitchStateResponse(SwitchStateResponse {
                key: 1,
                state: true,
                device_id: 0
            })
        );
        assert!(commander_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_subscribe_logs_sends_started_line() {
        let hub = hub_with(Arc::new(ProstCodec));
        let (mut session, mut rx) = make_session(&hub);

        session
            .dispatch(NativeMessage::SubscribeLogsRequest(SubscribeLogsRequest {
                level: 5,
                dump_config: false,
            }))
            .await
            .unwrap();

        assert!(session.is_subscribed_logs().await);
        match next(&mut rx) {
            NativeMessage::SubscribeLogsResponse(line) => {
                assert_eq!(line.text(), "[mock-switch-1] Log streaming started");
            }
            other => panic!("unexpected {other:?}"),
        }
        hub.shutdown_token().cancel();
    }

    #[tokio::test]
    async fn test_disconnect_replies_then_closes() {
        let hub = hub_with(Arc::new(ProstCodec));
        let (mut session, mut rx) = make_session(&hub);

        let flow = session
            .dispatch(NativeMessage::DisconnectRequest(DisconnectRequest {}))
            .await
            .unwrap();

        assert_eq!(flow, Flow::Close);
        assert_eq!(
            next(&mut rx),
            NativeMessage::DisconnectResponse(DisconnectResponse {})
        );
    }

    #[tokio::test]
    async fn test_unknown_type_is_ignored() {
        let hub = hub_with(Arc::new(ProstCodec));
        let (mut session, mut rx) = make_session(&hub);

        let flow = session
            .handle_frame(&Frame::new(1000, vec![0xFF, 0xFF]))
            .await
            .unwrap();

        assert_eq!(flow, Flow::Continue);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_close_unregisters_everywhere() {
        let hub = hub_with(Arc::new(ProstCodec));
        let (mut session, _rx) = make_session(&hub);
        session
            .dispatch(NativeMessage::SubscribeStatesRequest(SubscribeStatesRequest {}))
            .await
            .unwrap();

        session.close().await;
        session.close().await;

        assert_eq!(session.phase(), SessionPhase::Closed);
        assert!(!session.is_subscribed_states().await);
        assert_eq!(hub.subscriber_counts().await, (0, 0));
    }

    #[tokio::test]
    async fn test_evicted_session_no_longer_reports_subscription() {
        // Arrange: a subscriber whose one-slot queue is filled by the sync
        let hub = hub_with(Arc::new(ProstCodec));
        let (tx, _rx) = mpsc::channel(1);
        let handle = SessionHandle::new(hub.next_session_id(), tx);
        let mut session = Session::new(handle, peer(), Arc::clone(&hub));
        session
            .dispatch(NativeMessage::SubscribeStatesRequest(SubscribeStatesRequest {}))
            .await
            .unwrap();
        assert!(session.is_subscribed_states().await);

        // Act: the broadcast finds the queue full
        hub.apply_switch_command(1, true).await;

        // Assert
        assert!(!session.is_subscribed_states().await);
        assert!(session.eviction_token().is_cancelled());
    }

    #[tokio::test]
    async fn test_subscribe_with_full_queue_is_an_error() {
        let hub = hub_with(Arc::new(ProstCodec));
        let (tx, _rx) = mpsc::channel(1);
        let handle = SessionHandle::new(hub.next_session_id(), tx);
        handle.try_deliver(Frame::new(8, Vec::new())).unwrap();
        let mut session = Session::new(handle, peer(), Arc::clone(&hub));

        let result = session
            .dispatch(NativeMessage::SubscribeStatesRequest(SubscribeStatesRequest {}))
            .await;

        assert!(matches!(result, Err(SessionError::OutputFull)));
        assert!(!session.is_subscribed_states().await);
    }

    #[test]
    fn test_try_deliver_reports_full_then_closed() {
        let (tx, rx) = mpsc::channel(1);
        let handle = SessionHandle::new(SessionId(1), tx);

        assert_eq!(handle.try_deliver(Frame::new(8, Vec::new())), Ok(()));
        assert_eq!(handle.try_deliver(Frame::new(8, Vec::new())), Err(DeliveryError::Full));
        drop(rx);
        assert_eq!(handle.try_deliver(Frame::new(8, Vec::new())), Err(DeliveryError::Closed));
    }

    #[tokio::test]
    async fn test_reply_to_closed_output_is_an_error() {
        let hub = hub_with(Arc::new(ProstCodec));
        let (mut session, rx) = make_session(&hub);
        drop(rx);

        let result = session.dispatch(hello()).await;

        assert!(matches!(result, Err(SessionError::OutputClosed)));
    }

    #[tokio::test]
    async fn test_decode_failure_is_logged_and_skipped() {
        // Arrange: a codec that rejects every payload
        let mut codec = MockCodec::new();
        codec.expect_decode().times(1).returning(|frame| {
            Err(ProtocolError::Decode {
                msg_type: frame.msg_type,
                reason: "garbage".to_string(),
            })
        });
        codec.expect_encode().never();
        let hub = hub_with(Arc::new(codec));
        let (mut session, mut rx) = make_session(&hub);

        // Act
        let flow = session.handle_frame(&Frame::new(1, vec![0xFF])).await.unwrap();

        // Assert
        assert_eq!(flow, Flow::Continue);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_encode_failure_surfaces_as_protocol_error() {
        let mut codec = MockCodec::new();
        codec
            .expect_decode()
            .returning(|_| Ok(NativeMessage::PingRequest(PingRequest {})));
        codec
            .expect_encode()
            .returning(|msg| Err(ProtocolError::NotEncodable(msg.msg_type())));
        let hub = hub_with(Arc::new(codec));
        let (mut session, _rx) = make_session(&hub);

        let result = session.handle_frame(&Frame::new(7, Vec::new())).await;

        assert!(matches!(
            result,
            Err(SessionError::Protocol(ProtocolError::NotEncodable(8)))
        ));
    }
}
