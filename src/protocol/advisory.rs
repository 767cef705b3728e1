//! Congestion advisory message
//!
//! The controller uses an advisory to tell an edge router how a path it is
//! using is doing. The layout is fixed; there is no version field, so any
//! change to it breaks compatibility with deployed routers.

use std::fmt;

use bytes::{Buf, BufMut, Bytes, BytesMut};

use super::header::Preamble;
use super::{ADVISORY_SIZE, Condition, Error, MessageType, PathId, Result};

/// Congestion advisory for a single path
///
/// # Wire Format
///
/// ```text
/// [type:1][length:2][path id:4, big-endian, signed][condition:1]
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CongestionAdvisory {
    path_id: PathId,
    condition: Condition,
}

impl CongestionAdvisory {
    /// Create an advisory
    #[must_use]
    pub const fn new(path_id: PathId, condition: Condition) -> Self {
        Self { path_id, condition }
    }

    /// Path the advisory is about
    #[must_use]
    pub const fn path_id(&self) -> PathId {
        self.path_id
    }

    /// Reported condition
    #[must_use]
    pub const fn condition(&self) -> Condition {
        self.condition
    }

    /// Append the encoded advisory to `out`
    pub fn encode_into(&self, out: &mut impl BufMut) {
        Preamble::for_type(MessageType::CongestionAdvisory).write(out);
        out.put_i32(self.path_id.get());
        out.put_u8(self.condition.as_u8());
    }

    /// Encode to a standalone buffer
    #[must_use]
    pub fn encode(&self) -> Bytes {
        let mut out = BytesMut::with_capacity(ADVISORY_SIZE);
        self.encode_into(&mut out);
        out.freeze()
    }

    /// Decode an advisory, preamble included
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let mut buf = bytes;
        let preamble = Preamble::read(&mut buf)?;
        if preamble.message_type() != MessageType::CongestionAdvisory {
            return Err(Error::UnexpectedMessageType {
                expected: MessageType::CongestionAdvisory,
                found: preamble.message_type(),
            });
        }
        Self::decode_body(&mut buf)
    }

    /// Decode the body that follows an already-validated preamble
    pub(crate) fn decode_body(buf: &mut impl Buf) -> Result<Self> {
        let path_id = PathId::new(buf.get_i32());
        let byte = buf.get_u8();
        let condition = Condition::from_u8(byte).ok_or(Error::InvalidCondition { byte })?;
        Ok(Self { path_id, condition })
    }
}

impl fmt::Display for CongestionAdvisory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "congestion advisory: path={} condition={}",
            self.path_id, self.condition
        )
    }
}
