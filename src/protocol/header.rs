//! Control message preamble
//!
//! Every control message starts with a 3-byte preamble naming the message
//! type and the length of the body that follows.

use bytes::{Buf, BufMut};

use super::{Error, MessageType, PREAMBLE_SIZE, Result};

/// Type/length preamble shared by all control messages
///
/// # Wire Format
///
/// ```text
/// 0                   1                   2
/// 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |     Type      |       Body Length (BE)        |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Preamble {
    msg_type: MessageType,
    body_len: u16,
}

impl Preamble {
    /// Preamble for a message of the given type
    #[must_use]
    pub const fn for_type(msg_type: MessageType) -> Self {
        Self {
            msg_type,
            body_len: msg_type.body_len(),
        }
    }

    /// Get message type
    #[must_use]
    pub const fn message_type(&self) -> MessageType {
        self.msg_type
    }

    /// Get body length
    #[must_use]
    pub const fn body_len(&self) -> u16 {
        self.body_len
    }

    /// Total encoded size of the message, preamble included
    #[must_use]
    pub const fn message_len(&self) -> usize {
        PREAMBLE_SIZE + self.body_len as usize
    }

    /// Write the preamble (network byte order)
    pub fn write(&self, out: &mut impl BufMut) {
        out.put_u8(self.msg_type.as_u8());
        out.put_u16(self.body_len);
    }

    /// Parse and validate a preamble, consuming it from the buffer
    pub fn read(buf: &mut impl Buf) -> Result<Self> {
        if buf.remaining() < PREAMBLE_SIZE {
            return Err(Error::BufferTooSmall {
                needed: PREAMBLE_SIZE,
                got: buf.remaining(),
            });
        }

        let type_byte = buf.get_u8();
        let msg_type =
            MessageType::from_u8(type_byte).ok_or(Error::InvalidMessageType { type_byte })?;
        let body_len = buf.get_u16();

        if body_len != msg_type.body_len() {
            return Err(Error::LengthMismatch {
                message_type: msg_type,
                expected: msg_type.body_len(),
                found: body_len,
            });
        }

        if buf.remaining() < body_len as usize {
            return Err(Error::BufferTooSmall {
                needed: PREAMBLE_SIZE + body_len as usize,
                got: PREAMBLE_SIZE + buf.remaining(),
            });
        }

        Ok(Self { msg_type, body_len })
    }
}
