//! Protocol module containing the varint codec, framing, message records and
//! the payload codec.

pub mod codec;
pub mod frame;
pub mod messages;
pub mod varint;

pub use codec::{PayloadCodec, ProstCodec, ProtocolError};
pub use frame::{
    parse_frames, Frame, FrameAssembler, FrameStall, ParsedFrames, DEFAULT_MAX_BUFFERED, PREAMBLE,
};
pub use messages::*;
pub use varint::{decode_varint, encode_varint, encode_varint_into, VarintError};
