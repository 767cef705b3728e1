//! Control message codec (encode/decode)
//!
//! Dispatches on the preamble type byte so a router can hand every received
//! control payload to a single entry point.

use bytes::{Bytes, BytesMut};
use tracing::trace;

use super::header::Preamble;
use super::metrics::Metrics;
use super::{CongestionAdvisory, Message, MessageType, Result, TableEntryUpdate};

/// Encode a message to bytes
///
/// # Format
///
/// ```text
/// [PREAMBLE (3 bytes)] [BODY (fixed per type)]
/// ```
#[must_use]
pub fn encode(message: &Message) -> Bytes {
    let preamble = Preamble::for_type(message.message_type());
    let mut out = BytesMut::with_capacity(preamble.message_len());
    match message {
        Message::TableEntry(entry) => entry.encode_into(&mut out),
        Message::Advisory(advisory) => advisory.encode_into(&mut out),
    }
    out.freeze()
}

/// Decode a message from bytes
///
/// Trailing bytes after the body are ignored.
///
/// # Errors
///
/// Returns an error if:
/// - Buffer is too small for the preamble or the body
/// - Message type is unknown
/// - Body length does not match the type
/// - Advisory condition byte is unknown
pub fn decode(bytes: Bytes) -> Result<Message> {
    let result = decode_inner(&bytes);
    match &result {
        Ok(message) => trace!(
            msg_type = %message.message_type(),
            len = bytes.len(),
            "decoded control message"
        ),
        Err(err) => {
            Metrics::record_decode_error();
            trace!(error = %err, len = bytes.len(), "failed to decode control message");
        }
    }
    result
}

fn decode_inner(bytes: &[u8]) -> Result<Message> {
    let mut buf = bytes;
    let preamble = Preamble::read(&mut buf)?;
    let message = match preamble.message_type() {
        MessageType::BestEffortTableEntry => {
            Message::TableEntry(TableEntryUpdate::decode_body(&mut buf))
        }
        MessageType::CongestionAdvisory => {
            Message::Advisory(CongestionAdvisory::decode_body(&mut buf)?)
        }
    };
    Ok(message)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{ADVISORY_SIZE, Condition, Error, PathId, TABLE_ENTRY_SIZE};
    use std::net::Ipv6Addr;

    #[test]
    fn test_decode_dispatches_on_type() {
        let advisory = CongestionAdvisory::new(PathId::new(12), Condition::Red);
        let decoded = decode(advisory.encode()).unwrap();
        assert_eq!(decoded, Message::Advisory(advisory));

        let entry = TableEntryUpdate::new(Ipv6Addr::LOCALHOST, PathId::new(3));
        let decoded = decode(entry.encode()).unwrap();
        assert_eq!(decoded, Message::TableEntry(entry));
    }

    #[test]
    fn test_encode_sizes() {
        let advisory = Message::from(CongestionAdvisory::new(PathId::new(1), Condition::Green));
        assert_eq!(encode(&advisory).len(), ADVISORY_SIZE);

        let entry = Message::from(TableEntryUpdate::new(Ipv6Addr::UNSPECIFIED, PathId::new(1)));
        assert_eq!(encode(&entry).len(), TABLE_ENTRY_SIZE);
    }

    #[test]
    fn test_decode_ignores_trailing_bytes() {
        let advisory = CongestionAdvisory::new(PathId::new(5), Condition::Yellow);
        let mut bytes = advisory.encode().to_vec();
        bytes.extend_from_slice(&[0xAA, 0xBB]);
        assert_eq!(
            decode(Bytes::from(bytes)).unwrap(),
            Message::Advisory(advisory)
        );
    }

    #[test]
    fn test_decode_empty_buffer() {
        let result = decode(Bytes::new());
        assert!(matches!(
            result,
            Err(Error::BufferTooSmall { needed: 3, got: 0 })
        ));
    }

    // Property-based tests
    #[cfg(test)]
    mod proptests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            /// Property: arbitrary input never panics the decoder
            #[test]
            fn prop_decode_arbitrary_bytes_never_panics(
                bytes in prop::collection::vec(any::<u8>(), 0..64),
            ) {
                let _ = decode(Bytes::from(bytes));
            }

            /// Property: any buffer shorter than the advisory is rejected
            #[test]
            fn prop_truncated_advisory_rejected(
                path in any::<i32>(),
                cut in 0usize..ADVISORY_SIZE,
            ) {
                let bytes = CongestionAdvisory::new(PathId::new(path), Condition::Yellow).encode();
                let result = decode(bytes.slice(..cut));
                let is_too_small = matches!(result, Err(Error::BufferTooSmall { .. }));
                prop_assert!(is_too_small);
            }

            /// Property: unknown type bytes are always rejected
            #[test]
            fn prop_unknown_type_rejected(
                type_byte in any::<u8>().prop_filter("known type", |b| MessageType::from_u8(*b).is_none()),
                tail in prop::collection::vec(any::<u8>(), 2..32),
            ) {
                let mut bytes = vec![type_byte];
                bytes.extend_from_slice(&tail);
                let result = decode(Bytes::from(bytes));
                let is_invalid = matches!(result, Err(Error::InvalidMessageType { .. }));
                prop_assert!(is_invalid);
            }
        }
    }
}
