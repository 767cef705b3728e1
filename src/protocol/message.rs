//! Decoded control messages

use bytes::Bytes;

use super::{CongestionAdvisory, MessageType, TableEntryUpdate};

/// Any control message the traffic splitter accepts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Message {
    /// Route installation
    TableEntry(TableEntryUpdate),
    /// Path condition report
    Advisory(CongestionAdvisory),
}

impl Message {
    /// Get message type
    #[must_use]
    pub const fn message_type(&self) -> MessageType {
        match self {
            Self::TableEntry(_) => MessageType::BestEffortTableEntry,
            Self::Advisory(_) => MessageType::CongestionAdvisory,
        }
    }

    /// Encode message to bytes
    #[must_use]
    pub fn encode(&self) -> Bytes {
        super::encode(self)
    }

    /// Decode message from bytes
    pub fn decode(bytes: impl Into<Bytes>) -> super::Result<Self> {
        super::decode(bytes.into())
    }
}

impl From<CongestionAdvisory> for Message {
    fn from(advisory: CongestionAdvisory) -> Self {
        Self::Advisory(advisory)
    }
}

impl From<TableEntryUpdate> for Message {
    fn from(entry: TableEntryUpdate) -> Self {
        Self::TableEntry(entry)
    }
}
