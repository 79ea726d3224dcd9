//! Payload codec: typed [`NativeMessage`] values to and from [`Frame`]s.
//!
//! The framing layer treats payloads as opaque bytes.  The server only needs
//! two capabilities from whatever serializer backs the protocol schema:
//! "decode this frame into a record" and "encode this record into a frame".
//! [`PayloadCodec`] names those capabilities so the schema implementation can
//! be swapped (or mocked) without touching the session logic.

use prost::Message;
use thiserror::Error;

use crate::protocol::frame::Frame;
use crate::protocol::messages::{MessageType, NativeMessage};

/// Errors that can occur while converting between frames and messages.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ProtocolError {
    /// The payload of a known message type is not a valid record.
    #[error("malformed payload for message type {msg_type}: {reason}")]
    Decode { msg_type: u32, reason: String },

    /// The message has no wire representation (e.g. [`NativeMessage::Unknown`]).
    #[error("message type {0} cannot be encoded")]
    NotEncodable(u32),
}

/// Converts between raw frames and typed messages.
///
/// Implementations must be cheap to share across connection tasks.
pub trait PayloadCodec: Send + Sync {
    /// Decodes a frame's payload according to its type id.
    ///
    /// Frames with an unmodelled type id decode to
    /// [`NativeMessage::Unknown`] rather than failing.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::Decode`] when the payload of a known type is
    /// malformed.
    fn decode(&self, frame: &Frame) -> Result<NativeMessage, ProtocolError>;

    /// Encodes a message into a frame ready for the wire.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::NotEncodable`] for [`NativeMessage::Unknown`].
    fn encode(&self, msg: &NativeMessage) -> Result<Frame, ProtocolError>;
}

/// [`PayloadCodec`] backed by `prost`-derived records.
///
/// # Examples
///
/// ```rust
/// use espmock_core::{NativeMessage, PayloadCodec, ProstCodec};
/// use espmock_core::protocol::messages::PingRequest;
///
/// let codec = ProstCodec;
/// let frame = codec.encode(&NativeMessage::PingRequest(PingRequest {})).unwrap();
/// assert_eq!(frame.msg_type, 7);
/// assert_eq!(codec.decode(&frame).unwrap(), NativeMessage::PingRequest(PingRequest {}));
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct ProstCodec;

impl PayloadCodec for ProstCodec {
    fn decode(&self, frame: &Frame) -> Result<NativeMessage, ProtocolError> {
        let Ok(msg_type) = MessageType::try_from(frame.msg_type) else {
            return Ok(NativeMessage::Unknown {
                msg_type: frame.msg_type,
            });
        };

        let p = frame.payload.as_slice();
        let msg = match msg_type {
            MessageType::HelloRequest => NativeMessage::HelloRequest(parse(msg_type, p)?),
            MessageType::HelloResponse => NativeMessage::HelloResponse(parse(msg_type, p)?),
            MessageType::AuthRequest => NativeMessage::AuthRequest(parse(msg_type, p)?),
            MessageType::DisconnectRequest => {
                NativeMessage::DisconnectRequest(parse(msg_type, p)?)
            }
            MessageType::DisconnectResponse => {
                NativeMessage::DisconnectResponse(parse(msg_type, p)?)
            }
            MessageType::PingRequest => NativeMessage::PingRequest(parse(msg_type, p)?),
            MessageType::PingResponse => NativeMessage::PingResponse(parse(msg_type, p)?),
            MessageType::DeviceInfoRequest => {
                NativeMessage::DeviceInfoRequest(parse(msg_type, p)?)
            }
            MessageType::DeviceInfoResponse => {
                NativeMessage::DeviceInfoResponse(parse(msg_type, p)?)
            }
            MessageType::ListEntitiesRequest => {
                NativeMessage::ListEntitiesRequest(parse(msg_type, p)?)
            }
            MessageType::ListEntitiesSwitchResponse => {
                NativeMessage::ListEntitiesSwitchResponse(parse(msg_type, p)?)
            }
            MessageType::ListEntitiesDoneResponse => {
                NativeMessage::ListEntitiesDoneResponse(parse(msg_type, p)?)
            }
            MessageType::SubscribeStatesRequest => {
                NativeMessage::SubscribeStatesRequest(parse(msg_type, p)?)
            }
            MessageType::SwitchStateResponse => {
                NativeMessage::SwitchStateResponse(parse(msg_type, p)?)
            }
            MessageType::SubscribeLogsRequest => {
                NativeMessage::SubscribeLogsRequest(parse(msg_type, p)?)
            }
            MessageType::SubscribeLogsResponse => {
                NativeMessage::SubscribeLogsResponse(parse(msg_type, p)?)
            }
            MessageType::SwitchCommandRequest => {
                NativeMessage::SwitchCommandRequest(parse(msg_type, p)?)
            }
        };
        Ok(msg)
    }

    fn encode(&self, msg: &NativeMessage) -> Result<Frame, ProtocolError> {
        let payload = match msg {
            NativeMessage::HelloRequest(m) => m.encode_to_vec(),
            NativeMessage::HelloResponse(m) => m.encode_to_vec(),
            NativeMessage::AuthRequest(m) => m.encode_to_vec(),
            NativeMessage::DisconnectRequest(m) => m.encode_to_vec(),
            NativeMessage::DisconnectResponse(m) => m.encode_to_vec(),
            NativeMessage::PingRequest(m) => m.encode_to_vec(),
            NativeMessage::PingResponse(m) => m.encode_to_vec(),
            NativeMessage::DeviceInfoRequest(m) => m.encode_to_vec(),
            NativeMessage::DeviceInfoResponse(m) => m.encode_to_vec(),
            NativeMessage::ListEntitiesRequest(m) => m.encode_to_vec(),
            NativeMessage::ListEntitiesSwitchResponse(m) => m.encode_to_vec(),
            NativeMessage::ListEntitiesDoneResponse(m) => m.encode_to_vec(),
            NativeMessage::SubscribeStatesRequest(m) => m.encode_to_vec(),
            NativeMessage::SwitchStateResponse(m) => m.encode_to_vec(),
            NativeMessage::SubscribeLogsRequest(m) => m.encode_to_vec(),
            NativeMessage::SubscribeLogsResponse(m) => m.encode_to_vec(),
            NativeMessage::SwitchCommandRequest(m) => m.encode_to_vec(),
            NativeMessage::Unknown { msg_type } => {
                return Err(ProtocolError::NotEncodable(*msg_type))
            }
        };
        Ok(Frame::new(msg.msg_type(), payload))
    }
}

/// Decodes one record, tagging failures with the frame's type id.
fn parse<M: Message + Default>(msg_type: MessageType, payload: &[u8]) -> Result<M, ProtocolError> {
    M::decode(payload).map_err(|e| ProtocolError::Decode {
        msg_type: msg_type as u32,
        reason: e.to_string(),
    })
}

// ── Tests ─────────────────────────────────────────────────────────────────────
