//! Plaintext Native API framing and incremental frame reassembly.
//!
//! Wire format of one frame:
//! ```text
//! [preamble:1 = 0x00][payload_len:varint][msg_type:varint][payload:payload_len]
//! ```
//!
//! # Why an assembler is needed
//!
//! TCP is a *stream* protocol: a single `read()` may return half a frame, or
//! three frames and the first byte of a fourth.  [`FrameAssembler`] keeps the
//! bytes that have arrived so far and only surfaces a frame once its full
//! payload is present.  Whatever the chunking, the same byte sequence always
//! yields the same ordered list of frames.
//!
//! # Corrupt input
//!
//! Extraction stops at the first byte that is not the `0x00` preamble and the
//! buffer is left untouched.  No attempt is made to scan forward for the next
//! plausible frame, so a stray byte stalls the connection until the peer
//! reconnects.
//!
//! # Buffer limit
//!
//! A stalled buffer, or a frame announcing a huge payload, would otherwise
//! keep growing with every read.  Each assembler carries a byte limit
//! ([`DEFAULT_MAX_BUFFERED`] unless built with
//! [`FrameAssembler::with_limit`]); once the unconsumed bytes exceed it,
//! [`FrameAssembler::over_limit`] turns true and the owner is expected to drop
//! the connection.

use tracing::debug;

use crate::protocol::varint::{decode_varint, encode_varint_into, VarintError};

/// First byte of every plaintext frame.
pub const PREAMBLE: u8 = 0x00;

/// Unconsumed bytes an assembler holds before it reports [`FrameAssembler::over_limit`].
pub const DEFAULT_MAX_BUFFERED: usize = 1024 * 1024;

/// One complete protocol message: its numeric type and raw payload bytes.
///
/// The payload is opaque at this layer; [`crate::PayloadCodec`] interprets it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Message type id from the Native API numbering.
    pub msg_type: u32,
    /// Encoded message record.
    pub payload: Vec<u8>,
}

impl Frame {
    /// Creates a frame from a type id and payload.
    pub fn new(msg_type: u32, payload: Vec<u8>) -> Self {
        Self { msg_type, payload }
    }

    /// Serializes the frame into its wire representation.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use espmock_core::Frame;
    ///
    /// let bytes = Frame::new(7, Vec::new()).to_bytes();
    /// assert_eq!(bytes, vec![0x00, 0x00, 0x07]);
    /// ```
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(1 + 2 * 5 + self.payload.len());
        buf.push(PREAMBLE);
        encode_varint_into(&mut buf, self.payload.len() as u64);
        encode_varint_into(&mut buf, u64::from(self.msg_type));
        buf.extend_from_slice(&self.payload);
        buf
    }
}

/// Why [`parse_frames`] stopped before the end of the buffer on something
/// other than missing data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameStall {
    /// The byte where a frame should start is not [`PREAMBLE`].
    BadPreamble { offset: usize, byte: u8 },
    /// A length or type prefix can never be valid (wider than 64 bits, or a
    /// type id beyond `u32`).
    Malformed { offset: usize, reason: &'static str },
}

/// A frame extracted by [`parse_frames`] together with the offset just past it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedFrame {
    pub frame: Frame,
    /// Offset in the input buffer one past the frame's last byte.
    pub end: usize,
}

/// Result of one extraction pass over a buffer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedFrames {
    /// Complete frames in arrival order.
    pub frames: Vec<ParsedFrame>,
    /// Set when extraction halted on corrupt bytes rather than missing data.
    pub stall: Option<FrameStall>,
}

impl ParsedFrames {
    /// Number of leading bytes covered by the extracted frames.
    pub fn consumed(&self) -> usize {
        self.frames.last().map_or(0, |f| f.end)
    }
}

/// Extracts every complete frame at the front of `data`.
///
/// Stops at the first incomplete frame (waiting for more bytes is the
/// caller's job) or at corrupt bytes, reported through
/// [`ParsedFrames::stall`].  Never consumes part of a frame.
///
/// # Examples
///
/// ```rust
/// use espmock_core::{parse_frames, Frame};
///
/// let mut bytes = Frame::new(7, vec![]).to_bytes();
/// bytes.extend_from_slice(&Frame::new(1, vec![0x0A])
///     .to_bytes()[..3]); // second frame cut short
///
/// let parsed = parse_frames(&bytes);
/// assert_eq!(parsed.frames.len(), 1);
/// assert_eq!(parsed.consumed(), 3);
/// assert!(parsed.stall.is_none());
/// ```
pub fn parse_frames(data: &[u8]) -> ParsedFrames {
    let mut parsed = ParsedFrames::default();
    let mut offset = 0;

    while offset < data.len() {
        let start = offset;
        if data[start] != PREAMBLE {
            parsed.stall = Some(FrameStall::BadPreamble {
                offset: start,
                byte: data[start],
            });
            break;
        }

        let mut cursor = start + 1;

        let length = match decode_varint(data, cursor) {
            Ok((value, used)) => {
                cursor += used;
                value
            }
            Err(VarintError::Incomplete { .. }) => break,
            Err(VarintError::Overflow) => {
                parsed.stall = Some(FrameStall::Malformed {
                    offset: start,
                    reason: "payload length wider than 64 bits",
                });
                break;
            }
        };

        let msg_type = match decode_varint(data, cursor) {
            Ok((value, used)) => {
                cursor += used;
                value
            }
            Err(VarintError::Incomplete { .. }) => break,
            Err(VarintError::Overflow) => {
                parsed.stall = Some(FrameStall::Malformed {
                    offset: start,
                    reason: "message type wider than 64 bits",
                });
                break;
            }
        };

        let Ok(msg_type) = u32::try_from(msg_type) else {
            parsed.stall = Some(FrameStall::Malformed {
                offset: start,
                reason: "message type exceeds u32",
            });
            break;
        };

        let remaining = (data.len() - cursor) as u64;
        if length > remaining {
            break;
        }

        // `length <= remaining`, so it fits in usize.
        let end = cursor + length as usize;
        parsed.frames.push(ParsedFrame {
            frame: Frame::new(msg_type, data[cursor..end].to_vec()),
            end,
        });
        offset = end;
    }

    parsed
}

/// Owns a connection's receive buffer and reassembles frames from it.
///
/// Feed it every chunk read from the socket; it returns the frames completed
/// by that chunk and keeps the unconsumed tail for the next call.
///
/// # Examples
///
/// ```rust
/// use espmock_core::{Frame, FrameAssembler};
///
/// let bytes = Frame::new(8, vec![]).to_bytes();
/// let mut assembler = FrameAssembler::new();
///
/// assert!(assembler.feed(&bytes[..1]).is_empty());
/// assert_eq!(assembler.feed(&bytes[1..]), vec![Frame::new(8, vec![])]);
/// assert!(assembler.buffered().is_empty());
/// ```
#[derive(Debug)]
pub struct FrameAssembler {
    buf: Vec<u8>,
    stall: Option<FrameStall>,
    limit: usize,
}

impl Default for FrameAssembler {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameAssembler {
    /// Creates an assembler with an empty buffer and [`DEFAULT_MAX_BUFFERED`].
    pub fn new() -> Self {
        Self::with_limit(DEFAULT_MAX_BUFFERED)
    }

    /// Creates an assembler that reports [`over_limit`](Self::over_limit)
    /// once more than `limit` unconsumed bytes are buffered.
    pub fn with_limit(limit: usize) -> Self {
        Self {
            buf: Vec::with_capacity(limit.min(4096)),
            stall: None,
            limit,
        }
    }

    /// Appends `bytes` and returns every frame that is now complete.
    pub fn feed(&mut self, bytes: &[u8]) -> Vec<Frame> {
        self.buf.extend_from_slice(bytes);

        let parsed = parse_frames(&self.buf);
        let consumed = parsed.consumed();

        if parsed.stall.is_some() && self.stall.is_none() {
            debug!(
                "frame extraction halted: {:?} ({} byte(s) buffered)",
                parsed.stall,
                self.buf.len()
            );
        }
        self.stall = parsed.stall;

        // Remove exactly the bytes of the frames we hand out.
        self.buf.drain(..consumed);

        parsed.frames.into_iter().map(|p| p.frame).collect()
    }

    /// Bytes received but not yet part of a complete frame.
    pub fn buffered(&self) -> &[u8] {
        &self.buf
    }

    /// Why extraction is halted, if it is halted on corrupt input.
    ///
    /// Once set, the stall persists: the offending byte stays at the front of
    /// the buffer.
    pub fn stall(&self) -> Option<FrameStall> {
        self.stall
    }

    /// True when more than the configured limit is buffered without
    /// completing a frame.
    ///
    /// Happens after a stall, or when a frame's declared length is larger
    /// than the limit.  Nothing more will be extracted in a useful amount of
    /// memory, so the connection should be closed.
    pub fn over_limit(&self) -> bool {
        self.buf.len() > self.limit
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
