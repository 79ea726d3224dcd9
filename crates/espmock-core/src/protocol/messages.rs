//! Native API message records understood by the mock device.
//!
//! The type ids and field numbers mirror ESPHome's public `api.proto`.  Only
//! the subset needed by a single-switch device is modelled; any other type id
//! still frames correctly and surfaces as [`NativeMessage::Unknown`].

// ── Message type codes ────────────────────────────────────────────────────────

/// Message type ids for every record in this module.
///
/// The numbering is fixed by the external protocol and must match it
/// bit-for-bit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum MessageType {
    HelloRequest = 1,
    HelloResponse = 2,
    AuthRequest = 3,
    DisconnectRequest = 5,
    DisconnectResponse = 6,
    PingRequest = 7,
    PingResponse = 8,
    DeviceInfoRequest = 9,
    DeviceInfoResponse = 10,
    ListEntitiesRequest = 11,
    ListEntitiesSwitchResponse = 17,
    ListEntitiesDoneResponse = 19,
    SubscribeStatesRequest = 20,
    SwitchStateResponse = 26,
    SubscribeLogsRequest = 28,
    SubscribeLogsResponse = 29,
    SwitchCommandRequest = 33,
}

impl TryFrom<u32> for MessageType {
    type Error = ();

    fn try_from(value: u32) -> Result<Self, ()> {
        match value {
            1 => Ok(MessageType::HelloRequest),
            2 => Ok(MessageType::HelloResponse),
            3 => Ok(MessageType::AuthRequest),
            5 => Ok(MessageType::DisconnectRequest),
            6 => Ok(MessageType::DisconnectResponse),
            7 => Ok(MessageType::PingRequest),
            8 => Ok(MessageType::PingResponse),
            9 => Ok(MessageType::DeviceInfoRequest),
            10 => Ok(MessageType::DeviceInfoResponse),
            11 => Ok(MessageType::ListEntitiesRequest),
            17 => Ok(MessageType::ListEntitiesSwitchResponse),
            19 => Ok(MessageType::ListEntitiesDoneResponse),
            20 => Ok(MessageType::SubscribeStatesRequest),
            26 => Ok(MessageType::SwitchStateResponse),
            28 => Ok(MessageType::SubscribeLogsRequest),
            29 => Ok(MessageType::SubscribeLogsResponse),
            33 => Ok(MessageType::SwitchCommandRequest),
            _ => Err(()),
        }
    }
}

// ── Enumerations ──────────────────────────────────────────────────────────────

/// Severity attached to every streamed log line.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, prost::Enumeration)]
#[repr(i32)]
pub enum LogLevel {
    None = 0,
    Error = 1,
    Warn = 2,
    Info = 3,
    Config = 4,
    Debug = 5,
    Verbose = 6,
    VeryVerbose = 7,
}

// ── Connection records ────────────────────────────────────────────────────────

/// HELLO_REQUEST (1): first message of every client.
#[derive(Clone, PartialEq, prost::Message)]
pub struct HelloRequest {
    #[prost(string, tag = "1")]
    pub client_info: String,
    #[prost(uint32, tag = "2")]
    pub api_version_major: u32,
    #[prost(uint32, tag = "3")]
    pub api_version_minor: u32,
}

/// HELLO_RESPONSE (2): protocol version and server identity.
#[derive(Clone, PartialEq, prost::Message)]
pub struct HelloResponse {
    #[prost(uint32, tag = "1")]
    pub api_version_major: u32,
    #[prost(uint32, tag = "2")]
    pub api_version_minor: u32,
    #[prost(string, tag = "3")]
    pub server_info: String,
    #[prost(string, tag = "4")]
    pub name: String,
}

/// CONNECT_REQUEST (3): password authentication.
#[derive(Clone, PartialEq, prost::Message)]
pub struct AuthRequest {
    #[prost(string, tag = "1")]
    pub password: String,
}

/// DISCONNECT_REQUEST (5).
#[derive(Clone, PartialEq, prost::Message)]
pub struct DisconnectRequest {}

/// DISCONNECT_RESPONSE (6).
#[derive(Clone, PartialEq, prost::Message)]
pub struct DisconnectResponse {}

/// PING_REQUEST (7).
#[derive(Clone, PartialEq, prost::Message)]
pub struct PingRequest {}

/// PING_RESPONSE (8).
#[derive(Clone, PartialEq, prost::Message)]
pub struct PingResponse {}

/// DEVICE_INFO_REQUEST (9).
#[derive(Clone, PartialEq, prost::Message)]
pub struct DeviceInfoRequest {}

/// DEVICE_INFO_RESPONSE (10): static device identity.
#[derive(Clone, PartialEq, prost::Message)]
pub struct DeviceInfoResponse {
    #[prost(bool, tag = "1")]
    pub uses_password: bool,
    #[prost(string, tag = "2")]
    pub name: String,
    #[prost(string, tag = "3")]
    pub mac_address: String,
    /// Firmware version string.
    #[prost(string, tag = "4")]
    pub esphome_version: String,
    #[prost(string, tag = "5")]
    pub compilation_time: String,
    #[prost(string, tag = "6")]
    pub model: String,
    #[prost(string, tag = "12")]
    pub manufacturer: String,
    #[prost(string, tag = "13")]
    pub friendly_name: String,
}

// ── Entity records ────────────────────────────────────────────────────────────

/// LIST_ENTITIES_REQUEST (11).
#[derive(Clone, PartialEq, prost::Message)]
pub struct ListEntitiesRequest {}

/// LIST_ENTITIES_SWITCH_RESPONSE (17): one switch entity descriptor.
#[derive(Clone, PartialEq, prost::Message)]
pub struct ListEntitiesSwitchResponse {
    #[prost(string, tag = "1")]
    pub object_id: String,
    #[prost(fixed32, tag = "2")]
    pub key: u32,
    #[prost(string, tag = "3")]
    pub name: String,
    #[prost(string, tag = "4")]
    pub unique_id: String,
    #[prost(string, tag = "5")]
    pub icon: String,
    #[prost(bool, tag = "6")]
    pub assumed_state: bool,
    #[prost(bool, tag = "7")]
    pub disabled_by_default: bool,
    #[prost(uint32, tag = "10")]
    pub device_id: u32,
}

/// LIST_ENTITIES_DONE_RESPONSE (19): no more descriptors follow.
#[derive(Clone, PartialEq, prost::Message)]
pub struct ListEntitiesDoneResponse {}

// ── State and command records ─────────────────────────────────────────────────

/// SUBSCRIBE_STATES_REQUEST (20).
#[derive(Clone, PartialEq, prost::Message)]
pub struct SubscribeStatesRequest {}

/// SWITCH_STATE_RESPONSE (26): current state of a switch.
#[derive(Clone, PartialEq, prost::Message)]
pub struct SwitchStateResponse {
    #[prost(fixed32, tag = "1")]
    pub key: u32,
    #[prost(bool, tag = "2")]
    pub state: bool,
    #[prost(uint32, tag = "3")]
    pub device_id: u32,
}

/// SWITCH_COMMAND_REQUEST (33): requests a new switch state.
#[derive(Clone, PartialEq, prost::Message)]
pub struct SwitchCommandRequest {
    #[prost(fixed32, tag = "1")]
    pub key: u32,
    #[prost(bool, tag = "2")]
    pub state: bool,
    #[prost(uint32, tag = "3")]
    pub device_id: u32,
}

// ── Log records ───────────────────────────────────────────────────────────────

/// SUBSCRIBE_LOGS_REQUEST (28).
#[derive(Clone, PartialEq, prost::Message)]
pub struct SubscribeLogsRequest {
    #[prost(enumeration = "LogLevel", tag = "1")]
    pub level: i32,
    #[prost(bool, tag = "2")]
    pub dump_config: bool,
}

/// SUBSCRIBE_LOGS_RESPONSE (29): one log line.
#[derive(Clone, PartialEq, prost::Message)]
pub struct SubscribeLogsResponse {
    #[prost(enumeration = "LogLevel", tag = "1")]
    pub level: i32,
    /// UTF-8 text of the line.
    #[prost(bytes = "vec", tag = "3")]
    pub message: Vec<u8>,
}

impl SubscribeLogsResponse {
    /// Builds a log line record.
    pub fn line(level: LogLevel, text: &str) -> Self {
        Self {
            level: level as i32,
            message: text.as_bytes().to_vec(),
        }
    }

    /// The line's text, with invalid UTF-8 replaced.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.message).into_owned()
    }
}

// ── Top-level message enum ────────────────────────────────────────────────────

/// Every message the codec can produce, plus an explicit arm for frames
/// whose type id is not modelled.
#[derive(Debug, Clone, PartialEq)]
pub enum NativeMessage {
    HelloRequest(HelloRequest),
    HelloResponse(HelloResponse),
    AuthRequest(AuthRequest),
    DisconnectRequest(DisconnectRequest),
    DisconnectResponse(DisconnectResponse),
    PingRequest(PingRequest),
    PingResponse(PingResponse),
    DeviceInfoRequest(DeviceInfoRequest),
    DeviceInfoResponse(DeviceInfoResponse),
    ListEntitiesRequest(ListEntitiesRequest),
    ListEntitiesSwitchResponse(ListEntitiesSwitchResponse),
    ListEntitiesDoneResponse(ListEntitiesDoneResponse),
    SubscribeStatesRequest(SubscribeStatesRequest),
    SwitchStateResponse(SwitchStateResponse),
    SubscribeLogsRequest(SubscribeLogsRequest),
    SubscribeLogsResponse(SubscribeLogsResponse),
    SwitchCommandRequest(SwitchCommandRequest),
    /// A well-formed frame with a type id this crate does not model.
    Unknown { msg_type: u32 },
}

impl NativeMessage {
    /// Returns the numeric type id this message travels under.
    pub fn msg_type(&self) -> u32 {
        match self {
            NativeMessage::Unknown { msg_type } => *msg_type,
            known => known.known_type().map_or(0, |t| t as u32),
        }
    }

    /// Returns the [`MessageType`], or `None` for [`NativeMessage::Unknown`].
    pub fn known_type(&self) -> Option<MessageType> {
        let t = match self {
            NativeMessage::HelloRequest(_) => MessageType::HelloRequest,
            NativeMessage::HelloResponse(_) => MessageType::HelloResponse,
            NativeMessage::AuthRequest(_) => MessageType::AuthRequest,
            NativeMessage::DisconnectRequest(_) => MessageType::DisconnectRequest,
            NativeMessage::DisconnectResponse(_) => MessageType::DisconnectResponse,
            NativeMessage::PingRequest(_) => MessageType::PingRequest,
            NativeMessage::PingResponse(_) => MessageType::PingResponse,
            NativeMessage::DeviceInfoRequest(_) => MessageType::DeviceInfoRequest,
            NativeMessage::DeviceInfoResponse(_) => MessageType::DeviceInfoResponse,
            NativeMessage::ListEntitiesRequest(_) => MessageType::ListEntitiesRequest,
            NativeMessage::ListEntitiesSwitchResponse(_) => {
                MessageType::ListEntitiesSwitchResponse
            }
            NativeMessage::ListEntitiesDoneResponse(_) => MessageType::ListEntitiesDoneResponse,
            NativeMessage::SubscribeStatesRequest(_) => MessageType::SubscribeStatesRequest,
            NativeMessage::SwitchStateResponse(_) => MessageType::SwitchStateResponse,
            NativeMessage::SubscribeLogsRequest(_) => MessageType::SubscribeLogsRequest,
            NativeMessage::SubscribeLogsResponse(_) => MessageType::SubscribeLogsResponse,
            NativeMessage::SwitchCommandRequest(_) => MessageType::SwitchCommandRequest,
            NativeMessage::Unknown { .. } => return None,
        };
        Some(t)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_type_try_from_roundtrips_all_known_ids() {
        for id in [1u32, 2, 3, 5, 6, 7, 8, 9, 10, 11, 17, 19, 20, 26, 28, 29, 33] {
            let t = MessageType::try_from(id).expect("known id");
            assert_eq!(t as u32, id);
        }
    }

    #[test]
    fn test_message_type_rejects_unmodelled_ids() {
        assert!(MessageType::try_from(0).is_err());
        assert!(MessageType::try_from(4).is_err());
        assert!(MessageType::try_from(12).is_err());
    }

    #[test]
    fn test_unknown_reports_its_own_type() {
        let msg = NativeMessage::Unknown { msg_type: 99 };
        assert_eq!(msg.msg_type(), 99);
        assert_eq!(msg.known_type(), None);
    }

    #[test]
    fn test_switch_command_type_id() {
        let msg = NativeMessage::SwitchCommandRequest(SwitchCommandRequest::default());
        assert_eq!(msg.msg_type(), 33);
    }

    #[test]
    fn test_log_line_text_roundtrip() {
        let line = SubscribeLogsResponse::line(LogLevel::Info, "[dev] hello");
        assert_eq!(line.level, LogLevel::Info as i32);
        assert_eq!(line.text(), "[dev] hello");
    }
}
