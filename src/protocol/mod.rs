//! Advisory protocol between the congestion controller and edge routers
//!
//! This module provides the wire format, message types, and codec for the
//! control messages a router's traffic splitter consumes.

mod advisory;
mod codec;
mod error;
mod header;
mod message;
pub(crate) mod metrics;
mod table_entry;
mod types;

pub use advisory::CongestionAdvisory;
pub use codec::{decode, encode};
pub use error::{Error, Result};
pub use header::Preamble;
pub use message::Message;
pub use metrics::{MetricsSnapshot, metrics_snapshot};
pub use table_entry::TableEntryUpdate;
pub use types::{Condition, MessageType, PathId};

/// Preamble size in bytes (type + length)
pub const PREAMBLE_SIZE: usize = 3;

/// Advisory body: path id + condition
pub const ADVISORY_BODY_LEN: u16 = 4 + 1;

/// Table entry body: destination + path id + split
pub const TABLE_ENTRY_BODY_LEN: u16 = 16 + 4 + 1;

/// Encoded advisory size, preamble included
pub const ADVISORY_SIZE: usize = PREAMBLE_SIZE + ADVISORY_BODY_LEN as usize;

/// Encoded table entry size, preamble included
pub const TABLE_ENTRY_SIZE: usize = PREAMBLE_SIZE + TABLE_ENTRY_BODY_LEN as usize;
