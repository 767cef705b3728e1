//! Server-side best-effort congestion control.
//!
//! [`CongestionController`] consumes per-path loss measurements and drives the
//! environment through the [`Network`] trait: path computation, provisioning,
//! advisory and table-update delivery, and topology lookups.

mod config;
mod controller;
mod error;
mod fairness;
mod ledger;
mod path;
mod services;
mod stats;

pub use config::ControllerConfig;
pub use controller::{CongestionController, Switchback};
pub use error::{ControlError, Result, ServiceError};
pub use ledger::{MAX_ACTIVE_PER_PAIR, PathLedger};
pub use path::{LossRate, NodeId, NodePair, Path, PathCondition, PathQos};
pub use services::{
    AdvisoryTransport, Criterion, Network, PathComputation, Provisioner, RouterId, Topology,
    UsageTag,
};
pub use stats::FairnessStats;
