//! Router-side traffic splitter.
//!
//! Each destination carries at most two routes (primary and alternate) whose
//! percentages always sum to 100. Congestion advisories shift traffic one
//! decile at a time; a RED advisory cuts over immediately.

mod destination;
mod ring;
mod table;

pub use destination::{DECILE, Shift, TrafficDestination};
pub use ring::{MAX_ROUTES, RING_SLOTS, RouteRing};
pub use table::{
    BestEffortTable, BestEffortTableEntry, EntryKey, FLOW_BUCKETS, SplitterConfig, flow_bucket,
};
