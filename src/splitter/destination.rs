//! Per-destination split state.

use std::net::Ipv6Addr;
use std::time::SystemTime;

use super::ring::{MAX_ROUTES, RouteRing};
use crate::protocol::Condition;

/// Percentage points moved by one redirect or revert.
pub const DECILE: u8 = 10;

/// Outcome of a redirect or revert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shift {
    /// One decile moved.
    Moved,
    /// Split already at its limit; only the timestamp was refreshed.
    AtLimit,
}

/// Traffic split state for one destination address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrafficDestination {
    destination: Ipv6Addr,
    // [primary, alternate] of the current generation
    split: [u8; MAX_ROUTES],
    ring: RouteRing,
    condition: Condition,
    using_alternate: bool,
    last_redirect_at: Option<SystemTime>,
    last_revert_at: Option<SystemTime>,
}

impl TrafficDestination {
    /// Fresh destination: everything on the primary, condition GREEN.
    #[must_use]
    pub fn new(destination: Ipv6Addr) -> Self {
        Self {
            destination,
            split: [100, 0],
            ring: RouteRing::new(),
            condition: Condition::Green,
            using_alternate: false,
            last_redirect_at: None,
            last_revert_at: None,
        }
    }

    /// Destination address.
    #[must_use]
    pub const fn destination(&self) -> Ipv6Addr {
        self.destination
    }

    /// Current `[primary, alternate]` percentages.
    #[must_use]
    pub const fn split(&self) -> [u8; MAX_ROUTES] {
        self.split
    }

    /// Slot ring.
    #[must_use]
    pub const fn ring(&self) -> &RouteRing {
        &self.ring
    }

    /// Last advised condition.
    #[must_use]
    pub const fn condition(&self) -> Condition {
        self.condition
    }

    /// Whether any traffic is diverted to the alternate.
    #[must_use]
    pub const fn using_alternate(&self) -> bool {
        self.using_alternate
    }

    /// Time of the last redirect attempt.
    #[must_use]
    pub const fn last_redirect_at(&self) -> Option<SystemTime> {
        self.last_redirect_at
    }

    /// Time of the last revert attempt.
    #[must_use]
    pub const fn last_revert_at(&self) -> Option<SystemTime> {
        self.last_revert_at
    }

    /// Percentage carried by `slot`; zero outside the current generation.
    #[must_use]
    pub fn split_for_slot(&self, slot: usize) -> u8 {
        if slot == self.ring.current() {
            self.split[0]
        } else if slot == self.ring.alternate() {
            self.split[1]
        } else {
            0
        }
    }

    pub(super) fn ring_mut(&mut self) -> &mut RouteRing {
        &mut self.ring
    }

    pub(super) fn set_condition(&mut self, condition: Condition) {
        self.condition = condition;
    }

    /// Start a new generation with all traffic on its primary. Returns the
    /// retired slots.
    pub(super) fn begin_generation(&mut self) -> [usize; MAX_ROUTES] {
        self.split = [100, 0];
        self.using_alternate = false;
        self.ring.promote()
    }

    /// Move one decile from primary to alternate.
    pub fn redirect(&mut self, now: SystemTime) -> Shift {
        self.last_redirect_at = Some(now);
        if self.split[0] < DECILE || !self.ring.is_installed(self.ring.alternate()) {
            return Shift::AtLimit;
        }
        self.split[0] -= DECILE;
        self.split[1] += DECILE;
        self.using_alternate = true;
        Shift::Moved
    }

    /// Move one decile from alternate back to primary.
    pub fn revert(&mut self, now: SystemTime) -> Shift {
        self.last_revert_at = Some(now);
        if self.split[0] > 100 - DECILE {
            return Shift::AtLimit;
        }
        self.split[0] += DECILE;
        self.split[1] -= DECILE;
        if self.split[1] == 0 {
            self.using_alternate = false;
        }
        Shift::Moved
    }

    /// Slot serving a flow in decile `bucket` (0..=9).
    #[must_use]
    pub fn select_slot(&self, bucket: u8) -> usize {
        let threshold = u16::from(bucket.min(9)) * u16::from(DECILE) + u16::from(DECILE);
        let mut cumulative = 0u16;
        for (slot, share) in [
            (self.ring.current(), self.split[0]),
            (self.ring.alternate(), self.split[1]),
        ] {
            cumulative += u16::from(share);
            if cumulative >= threshold {
                return slot;
            }
        }
        self.ring.current()
    }
}
