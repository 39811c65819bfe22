//! Message framing.
//!
//! Every protocol message is a length-prefixed frame: an optional one-byte
//! type tag, a four byte big-endian length, then the payload. The length
//! field counts itself plus the payload, never the tag byte, so a tagged
//! message occupies `1 + length` bytes on the wire and an untagged one
//! exactly `length`.
//!
//! [`build`]/[`write`] produce frames, [`parse`] splits a received buffer
//! (possibly several concatenated messages) back into them.
use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::error::FramingError;

/// Framing mode of a protocol message.
///
/// For historical reasons, the very first message sent by the client
/// (the startup message) has no message-type byte. Everything else,
/// in both directions, is tagged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Framing {
    /// `[tag:1][length:4][payload]`
    Standard,
    /// `[length:4][payload]`, the startup message only.
    Startup,
}

impl Framing {
    fn header_len(self) -> usize {
        match self {
            Framing::Standard => 1 + 4,
            Framing::Startup => 4,
        }
    }
}

/// A single framed protocol message.
///
/// Constructed transiently, once per send or per parsed unit of a
/// response; never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    tag: Option<u8>,
    payload: Bytes,
}

impl Message {
    pub(crate) fn new(tag: Option<u8>, payload: Bytes) -> Message {
        Message { tag, payload }
    }

    /// The message type byte, absent only for the startup message.
    pub fn tag(&self) -> Option<u8> {
        self.tag
    }

    /// The message body, excluding tag and length field.
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    pub fn into_payload(self) -> Bytes {
        self.payload
    }

    /// Total size of this message as laid out on the wire.
    pub fn wire_len(&self) -> usize {
        self.tag.map_or(0, |_| 1) + 4 + self.payload.len()
    }
}

/// The length field counts itself plus the payload.
fn length_field(payload_len: usize) -> u32 {
    // lengths are usize in rust while the protocol wants 4 bytes,
    // panic on overflow instead of wrapping
    match u32::try_from(payload_len + 4) {
        Ok(len) => len,
        Err(_) => panic!("payload too large for the protocol: {payload_len} bytes"),
    }
}

/// Write one framed message into `buf`.
///
/// Payload content is not validated; the caller supplies any in-payload
/// terminators the message type requires.
pub fn write(tag: Option<u8>, payload: &[u8], buf: &mut BytesMut) {
    if let Some(tag) = tag {
        buf.put_u8(tag);
    }
    buf.put_u32(length_field(payload.len()));
    buf.put_slice(payload);
}

/// Build one framed message as a standalone byte sequence.
pub fn build(tag: Option<u8>, payload: &[u8]) -> Bytes {
    let mut buf = BytesMut::with_capacity(1 + 4 + payload.len());
    write(tag, payload, &mut buf);
    buf.freeze()
}

/// Split a response buffer into its framed messages.
///
/// The returned sequence is finite and non-restartable, consumed once per
/// response buffer. An empty buffer yields an empty sequence, which callers
/// treat as "no response", not an error.
pub fn parse(buf: impl Into<Bytes>, framing: Framing) -> Messages {
    Messages { buf: buf.into(), framing, failed: false }
}

/// Iterator over the messages of one response buffer.
///
/// Fuses after the first [`FramingError`]: a declared length that does not
/// match the available bytes leaves the rest of the buffer meaningless.
#[derive(Debug)]
pub struct Messages {
    buf: Bytes,
    framing: Framing,
    failed: bool,
}

impl Iterator for Messages {
    type Item = Result<Message, FramingError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed || self.buf.is_empty() {
            return None;
        }
        match split_first(&mut self.buf, self.framing) {
            Ok(message) => Some(Ok(message)),
            Err(err) => {
                self.failed = true;
                Some(Err(err))
            }
        }
    }
}

/// Take one message off the front of `buf`.
fn split_first(buf: &mut Bytes, framing: Framing) -> Result<Message, FramingError> {
    let header_len = framing.header_len();

    let Some(mut header) = buf.get(..header_len) else {
        return Err(FramingError::Truncated { need: header_len, got: buf.len() });
    };

    let tag = match framing {
        Framing::Standard => Some(header.get_u8()),
        Framing::Startup => None,
    };

    let length = header.get_u32() as usize;
    if length < 4 {
        return Err(FramingError::Length(length));
    }

    let total = match framing {
        Framing::Standard => 1 + length,
        Framing::Startup => length,
    };
    if buf.len() < total {
        return Err(FramingError::Truncated { need: total, got: buf.len() });
    }

    let mut message = buf.split_to(total);
    message.advance(header_len);

    Ok(Message { tag, payload: message })
}
