//! Best-effort forwarding table (router side).
//!
//! Installs paired table updates from the controller, applies congestion
//! advisories, and resolves flows to a route slot.

use std::collections::BTreeMap;
use std::fmt;
use std::net::Ipv6Addr;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use tracing::{debug, info, trace, warn};
use xxhash_rust::xxh3::xxh3_64;

use super::destination::{Shift, TrafficDestination};
use crate::clock::{Clock, SystemClock, window_elapsed};
use crate::protocol::metrics::Metrics;
use crate::protocol::{self, Condition, CongestionAdvisory, Message, PathId, TableEntryUpdate};

/// Number of flow buckets (deciles).
pub const FLOW_BUCKETS: u8 = 10;

/// Splitter timing.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct SplitterConfig {
    /// Minimum spacing between redirects while congested.
    pub redirect_interval: Duration,
    /// Minimum spacing between reverts once congestion clears.
    pub revert_interval: Duration,
    /// Multiplier applied to both intervals.
    pub time_scale: u32,
}

impl Default for SplitterConfig {
    fn default() -> Self {
        Self {
            redirect_interval: Duration::from_millis(200),
            revert_interval: Duration::from_secs(30 * 60),
            time_scale: 1,
        }
    }
}

impl SplitterConfig {
    fn scaled(&self, d: Duration) -> Duration {
        d.saturating_mul(self.time_scale.max(1))
    }
}

/// Table key: destination address plus router-local slot index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EntryKey {
    /// Destination address
    pub destination: Ipv6Addr,
    /// Ring slot
    pub slot: usize,
}

impl EntryKey {
    /// Create a key.
    #[must_use]
    pub const fn new(destination: Ipv6Addr, slot: usize) -> Self {
        Self { destination, slot }
    }
}

/// One installed route.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BestEffortTableEntry {
    destination: Ipv6Addr,
    slot: usize,
    path: PathId,
    split: u8,
}

impl BestEffortTableEntry {
    /// Destination address.
    #[must_use]
    pub const fn destination(&self) -> Ipv6Addr {
        self.destination
    }

    /// Ring slot.
    #[must_use]
    pub const fn slot(&self) -> usize {
        self.slot
    }

    /// Path traffic in this slot is sent on.
    #[must_use]
    pub const fn path(&self) -> PathId {
        self.path
    }

    /// Percentage of the destination's traffic in this slot.
    #[must_use]
    pub const fn split(&self) -> u8 {
        self.split
    }
}

/// Router-side best-effort table.
#[derive(Debug)]
pub struct BestEffortTable {
    config: SplitterConfig,
    clock: Arc<dyn Clock>,
    destinations: BTreeMap<Ipv6Addr, TrafficDestination>,
    entries: BTreeMap<EntryKey, BestEffortTableEntry>,
    edge_traffic_accepted: bool,
}

impl BestEffortTable {
    /// Create an empty table reading time from `clock`.
    #[must_use]
    pub fn new(config: SplitterConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            config,
            clock,
            destinations: BTreeMap::new(),
            entries: BTreeMap::new(),
            edge_traffic_accepted: false,
        }
    }

    /// Create an empty table on wall-clock time.
    #[must_use]
    pub fn with_system_clock(config: SplitterConfig) -> Self {
        Self::new(config, Arc::new(SystemClock))
    }

    /// Active configuration.
    #[must_use]
    pub fn config(&self) -> &SplitterConfig {
        &self.config
    }

    /// Whether a table entry was ever installed, allowing the edge router to
    /// accept edge traffic.
    #[must_use]
    pub fn accepts_edge_traffic(&self) -> bool {
        self.edge_traffic_accepted
    }

    /// Whether routes were installed for `destination`.
    #[must_use]
    pub fn has_entry(&self, destination: Ipv6Addr) -> bool {
        self.destinations.contains_key(&destination)
    }

    /// Split state for a destination.
    #[must_use]
    pub fn destination(&self, destination: Ipv6Addr) -> Option<&TrafficDestination> {
        self.destinations.get(&destination)
    }

    /// Look up one slot.
    #[must_use]
    pub fn entry(&self, destination: Ipv6Addr, slot: usize) -> Option<&BestEffortTableEntry> {
        self.entries.get(&EntryKey::new(destination, slot))
    }

    /// All entries, ordered by destination then slot.
    pub fn entries(&self) -> impl Iterator<Item = &BestEffortTableEntry> {
        self.entries.values()
    }

    /// Install one half of a paired update. Returns the slot written.
    ///
    /// The first install for a destination carries all of its traffic. An
    /// install that crosses the generation boundary retires the previous pair
    /// and starts the new primary at 100%; otherwise the entry is an alternate
    /// waiting at 0%.
    pub fn install(&mut self, update: TableEntryUpdate) -> usize {
        let destination = update.destination();
        let is_new = !self.destinations.contains_key(&destination);
        let state = self
            .destinations
            .entry(destination)
            .or_insert_with(|| TrafficDestination::new(destination));

        let split = if is_new {
            100
        } else if state.ring().generation_boundary_crossed() {
            for slot in state.begin_generation() {
                if let Some(entry) = self.entries.get_mut(&EntryKey::new(destination, slot)) {
                    entry.split = 0;
                }
            }
            debug!(%destination, primary = state.ring().current(), "new route generation");
            100
        } else {
            0
        };

        let slot = state.ring_mut().advance();
        self.entries.insert(
            EntryKey::new(destination, slot),
            BestEffortTableEntry {
                destination,
                slot,
                path: update.path_id(),
                split,
            },
        );
        Metrics::record_table_entry_installed();
        debug!(%destination, slot, path = %update.path_id(), split, "installed table entry");

        if !self.edge_traffic_accepted {
            self.edge_traffic_accepted = true;
            info!("best-effort table populated; accepting edge traffic");
        }
        slot
    }

    /// Install a primary/alternate pair for one destination.
    pub fn install_pair(
        &mut self,
        destination: Ipv6Addr,
        primary: PathId,
        alternate: PathId,
    ) -> [usize; 2] {
        [
            self.install(TableEntryUpdate::new(destination, primary)),
            self.install(TableEntryUpdate::new(destination, alternate)),
        ]
    }

    /// Resolve the route for a flow in decile `bucket` (clamped to 0..=9),
    /// applying any due redirect or revert first.
    pub fn resolve(&mut self, destination: Ipv6Addr, bucket: u8) -> Option<&BestEffortTableEntry> {
        let now = self.clock.now();
        let redirect_interval = self.config.scaled(self.config.redirect_interval);
        let revert_interval = self.config.scaled(self.config.revert_interval);
        let state = self.destinations.get_mut(&destination)?;

        if state.condition() == Condition::Yellow
            && window_elapsed(now, state.last_redirect_at(), redirect_interval)
            && state.redirect(now) == Shift::Moved
        {
            Metrics::record_redirect();
            debug!(%destination, split = ?state.split(), "redirected one decile to alternate");
        }

        if state.using_alternate()
            && state.condition() == Condition::Green
            && window_elapsed(now, state.last_revert_at(), revert_interval)
            && state.revert(now) == Shift::Moved
        {
            Metrics::record_revert();
            debug!(%destination, split = ?state.split(), "reverted one decile to primary");
        }

        let slot = state.select_slot(bucket.min(FLOW_BUCKETS - 1));
        for current in [state.ring().current(), state.ring().alternate()] {
            if let Some(entry) = self.entries.get_mut(&EntryKey::new(destination, current)) {
                entry.split = state.split_for_slot(current);
            }
        }
        trace!(%destination, bucket, slot, "resolved flow");
        self.entries.get(&EntryKey::new(destination, slot))
    }

    /// Resolve a flow by key.
    pub fn resolve_flow(
        &mut self,
        destination: Ipv6Addr,
        flow_key: &[u8],
    ) -> Option<&BestEffortTableEntry> {
        self.resolve(destination, flow_bucket(flow_key))
    }

    /// Apply an advisory to every destination whose current routes map its
    /// path. RED cuts the affected slot over to its sibling's path at once.
    /// Slots retired by a generation change are never matched or targeted.
    /// Returns the number of destinations affected.
    pub fn apply_advisory(&mut self, advisory: CongestionAdvisory) -> usize {
        Metrics::record_advisory_received();
        let path = advisory.path_id();
        let condition = advisory.condition();

        let mut affected = 0;
        for (&destination, state) in &mut self.destinations {
            let ring = state.ring();
            let mut hit = false;
            for slot in [ring.current(), ring.alternate()] {
                let key = EntryKey::new(destination, slot);
                if !ring.is_installed(slot)
                    || self.entries.get(&key).is_none_or(|e| e.path != path)
                {
                    continue;
                }
                hit = true;
                if condition != Condition::Red {
                    continue;
                }
                let sibling_slot = ring.sibling(slot);
                let sibling = self
                    .entries
                    .get(&EntryKey::new(destination, sibling_slot))
                    .filter(|_| ring.is_installed(sibling_slot))
                    .map(|e| e.path)
                    .filter(|&p| p != path);
                match (sibling, self.entries.get_mut(&key)) {
                    (Some(sibling), Some(entry)) => {
                        entry.path = sibling;
                        Metrics::record_red_cutover();
                        info!(%destination, slot, from = %path, to = %sibling, "RED cutover");
                    }
                    _ => warn!(%destination, slot, path = %path, "no sibling route for RED cutover"),
                }
            }
            if hit {
                state.set_condition(condition);
                affected += 1;
            }
        }
        debug!(path = %path, %condition, destinations = affected, "applied congestion advisory");
        affected
    }

    /// Decode and apply one control message.
    pub fn process_message(&mut self, bytes: Bytes) -> protocol::Result<()> {
        match protocol::decode(bytes)? {
            Message::TableEntry(update) => {
                self.install(update);
            }
            Message::Advisory(advisory) => {
                self.apply_advisory(advisory);
            }
        }
        Ok(())
    }
}

/// Decile bucket (0..=9) for a flow key.
#[must_use]
pub fn flow_bucket(flow_key: &[u8]) -> u8 {
    u8::try_from(xxh3_64(flow_key) % u64::from(FLOW_BUCKETS)).unwrap_or(0)
}

impl fmt::Display for BestEffortTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{:<40} {:>4} {:>8} {:>5}", "destination", "slot", "path", "split")?;
        for entry in self.entries.values() {
            writeln!(
                f,
                "{:<40} {:>4} {:>8} {:>4}%",
                entry.destination.to_string(),
                entry.slot,
                entry.path.to_string(),
                entry.split
            )?;
        }
        Ok(())
    }
}
