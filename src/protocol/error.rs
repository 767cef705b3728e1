//! Wire protocol error types

use thiserror::Error;

use super::MessageType;

/// Errors raised while encoding or decoding control messages
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Buffer too small
    #[error("buffer too small: need {needed} bytes, got {got}")]
    BufferTooSmall {
        /// Needed size
        needed: usize,
        /// Actual size
        got: usize,
    },

    /// Invalid message type
    #[error("invalid message type: {type_byte:#x}")]
    InvalidMessageType {
        /// Invalid type byte
        type_byte: u8,
    },

    /// Message decoded as the wrong kind
    #[error("unexpected message type: expected {expected}, got {found}")]
    UnexpectedMessageType {
        /// Type the caller asked for
        expected: MessageType,
        /// Type found in the preamble
        found: MessageType,
    },

    /// Preamble length does not match the message layout
    #[error("length mismatch for {message_type}: expected {expected}, got {found}")]
    LengthMismatch {
        /// Message type from the preamble
        message_type: MessageType,
        /// Body length the layout requires
        expected: u16,
        /// Body length carried in the preamble
        found: u16,
    },

    /// Unknown advisory condition byte
    #[error("invalid path condition: {byte:#x}")]
    InvalidCondition {
        /// Offending byte
        byte: u8,
    },
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;
