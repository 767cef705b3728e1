//! Message type bytes and advisory conditions

use std::fmt;

/// Control message types understood by the traffic splitter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum MessageType {
    /// Install a route for a destination
    BestEffortTableEntry = 0x0B,
    /// Report the condition of a path
    CongestionAdvisory = 0x0C,
}

impl MessageType {
    /// Convert from byte
    #[must_use]
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0x0B => Some(Self::BestEffortTableEntry),
            0x0C => Some(Self::CongestionAdvisory),
            _ => None,
        }
    }

    /// Convert to byte
    #[must_use]
    pub const fn as_u8(self) -> u8 {
        self as u8
    }

    /// Body length carried in the preamble for this type
    #[must_use]
    pub const fn body_len(self) -> u16 {
        match self {
            Self::BestEffortTableEntry => super::TABLE_ENTRY_BODY_LEN,
            Self::CongestionAdvisory => super::ADVISORY_BODY_LEN,
        }
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::BestEffortTableEntry => "BestEffortTableEntry",
            Self::CongestionAdvisory => "CongestionAdvisory",
        };
        write!(f, "{name}")
    }
}

/// Path condition as carried by a congestion advisory
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u8)]
pub enum Condition {
    /// No congestion
    #[default]
    Green = 0,
    /// Local congestion; shift traffic towards the alternate
    Yellow = 1,
    /// Path withdrawn; cut traffic over immediately
    Red = 2,
}

impl Condition {
    /// Convert from byte
    #[must_use]
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Green),
            1 => Some(Self::Yellow),
            2 => Some(Self::Red),
            _ => None,
        }
    }

    /// Convert to byte
    #[must_use]
    pub const fn as_u8(self) -> u8 {
        self as u8
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Green => "GREEN",
            Self::Yellow => "YELLOW",
            Self::Red => "RED",
        };
        write!(f, "{name}")
    }
}

/// Identifier of a path, as assigned by the path ledger
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PathId(i32);

impl PathId {
    /// Wrap a raw identifier
    #[must_use]
    pub const fn new(raw: i32) -> Self {
        Self(raw)
    }

    /// Raw identifier as carried on the wire
    #[must_use]
    pub const fn get(self) -> i32 {
        self.0
    }
}

impl From<i32> for PathId {
    fn from(raw: i32) -> Self {
        Self(raw)
    }
}

impl fmt::Display for PathId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
