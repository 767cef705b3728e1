//! Best-effort table entry update

use std::fmt;
use std::net::Ipv6Addr;

use bytes::{Buf, BufMut, Bytes, BytesMut};

use super::header::Preamble;
use super::{Error, MessageType, PathId, Result, TABLE_ENTRY_SIZE};

/// Route installation for one destination address
///
/// The controller always sends these in primary/alternate pairs. The slot a
/// route lands in is chosen by the router and never travels on the wire.
///
/// # Wire Format
///
/// ```text
/// [type:1][length:2][destination:16][path id:4, big-endian][split:1]
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TableEntryUpdate {
    destination: Ipv6Addr,
    path_id: PathId,
    split: u8,
}

impl TableEntryUpdate {
    /// Route `destination` over `path_id`
    #[must_use]
    pub const fn new(destination: Ipv6Addr, path_id: PathId) -> Self {
        Self {
            destination,
            path_id,
            split: 0,
        }
    }

    /// Suggested split percentage (the router decides the real split)
    #[must_use]
    pub const fn with_split(mut self, split: u8) -> Self {
        self.split = split;
        self
    }

    /// Destination address
    #[must_use]
    pub const fn destination(&self) -> Ipv6Addr {
        self.destination
    }

    /// Path to map the destination onto
    #[must_use]
    pub const fn path_id(&self) -> PathId {
        self.path_id
    }

    /// Split carried in the update
    #[must_use]
    pub const fn split(&self) -> u8 {
        self.split
    }

    /// Append the encoded update to `out`
    pub fn encode_into(&self, out: &mut impl BufMut) {
        Preamble::for_type(MessageType::BestEffortTableEntry).write(out);
        out.put_slice(&self.destination.octets());
        out.put_i32(self.path_id.get());
        out.put_u8(self.split);
    }

    /// Encode to a standalone buffer
    #[must_use]
    pub fn encode(&self) -> Bytes {
        let mut out = BytesMut::with_capacity(TABLE_ENTRY_SIZE);
        self.encode_into(&mut out);
        out.freeze()
    }

    /// Decode an update, preamble included
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let mut buf = bytes;
        let preamble = Preamble::read(&mut buf)?;
        if preamble.message_type() != MessageType::BestEffortTableEntry {
            return Err(Error::UnexpectedMessageType {
                expected: MessageType::BestEffortTableEntry,
                found: preamble.message_type(),
            });
        }
        Ok(Self::decode_body(&mut buf))
    }

    pub(crate) fn decode_body(buf: &mut impl Buf) -> Self {
        let mut octets = [0u8; 16];
        buf.copy_to_slice(&mut octets);
        let path_id = PathId::new(buf.get_i32());
        let split = buf.get_u8();
        Self {
            destination: Ipv6Addr::from(octets),
            path_id,
            split,
        }
    }
}

impl fmt::Display for TableEntryUpdate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "table entry: dest={} path={} split={}%",
            self.destination, self.path_id, self.split
        )
    }
}
