//! beflow - Best-effort congestion control for traffic-engineered networks
//!
//! The crate has two halves that talk over a small binary protocol:
//!
//! - [`control`]: the server-side congestion controller. It watches per-path
//!   loss, deploys primary/alternate path pairs, issues congestion advisories,
//!   and falls back to fairness-based reallocation under global congestion.
//! - [`splitter`]: the router-side best-effort table. It installs paired
//!   route updates and shifts traffic between primary and alternate in
//!   deciles as advisories arrive.
//!
//! # Quick Start
//!
//! ```rust
//! use std::net::Ipv6Addr;
//! use beflow::{BestEffortTable, Condition, CongestionAdvisory, PathId, SplitterConfig};
//!
//! let dest = Ipv6Addr::new(0x2001, 0xdb8, 0, 0, 0, 0, 0, 7);
//! let mut table = BestEffortTable::with_system_clock(SplitterConfig::default());
//! table.install_pair(dest, PathId::new(1), PathId::new(2));
//!
//! // A RED advisory moves the destination off path 1 at once
//! let advisory = CongestionAdvisory::new(PathId::new(1), Condition::Red);
//! table.process_message(advisory.encode())?;
//! assert_eq!(table.resolve(dest, 0).map(|e| e.path()), Some(PathId::new(2)));
//! # Ok::<(), beflow::protocol::Error>(())
//! ```
//!
//! # Wire Format
//!
//! Every message is `[type:1][length:2][body]`, big-endian. A congestion
//! advisory is 8 bytes: `[0x0C][0x0005][path id:4][condition:1]`.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

pub mod clock;
pub mod control;
pub mod protocol;
pub mod splitter;

pub use clock::{Clock, ManualClock, SystemClock};
pub use control::{
    CongestionController, ControlError, ControllerConfig, Network, NodeId, NodePair, Path,
    PathCondition, PathLedger, Switchback,
};
pub use protocol::{Condition, CongestionAdvisory, Message, PathId, TableEntryUpdate};
pub use splitter::{BestEffortTable, Shift, SplitterConfig};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
