//! # espmock-core
//!
//! Shared protocol library for the espmock device double: the plaintext
//! ESPHome Native API framing, the varint codec, and the typed message
//! records exchanged with clients.
//!
//! This crate has zero dependencies on sockets or async runtimes.  The server
//! crate (`espmock`) feeds it raw bytes and gets typed messages back.
//!
//! # Architecture overview (for beginners)
//!
//! The Native API is the binary protocol ESPHome firmware speaks on TCP port
//! 6053.  Clients (Home Assistant, `aioesphomeapi`, custom tooling) connect,
//! say hello, list entities, subscribe to state and logs, and send commands.
//! This crate covers how those messages look on the wire:
//!
//! - **`protocol::varint`** – Base-128 variable-length integers.  Every frame
//!   carries its payload length and message type as varints.
//!
//! - **`protocol::frame`** – The frame layout (`0x00` preamble, length, type,
//!   payload) and the [`FrameAssembler`] that reassembles frames from an
//!   arbitrarily chunked TCP byte stream.
//!
//! - **`protocol::messages`** – The message-type numbering and the protobuf
//!   records for every message the mock device understands.
//!
//! - **`protocol::codec`** – The [`PayloadCodec`] capability that turns frames
//!   into [`NativeMessage`] values and back.

// Rust will look for the module in src/protocol/mod.rs.
pub mod protocol;

// Re-export the most-used types at the crate root so callers can write
// `espmock_core::Frame` instead of `espmock_core::protocol::frame::Frame`.
pub use protocol::codec::{PayloadCodec, ProstCodec, ProtocolError};
pub use protocol::frame::{
    parse_frames, Frame, FrameAssembler, FrameStall, DEFAULT_MAX_BUFFERED, PREAMBLE,
};
pub use protocol::messages::{LogLevel, MessageType, NativeMessage};
pub use protocol::varint::{decode_varint, encode_varint, VarintError};
