//! Route slot ring.
//!
//! Every destination owns [`RING_SLOTS`] slots. Table updates arrive in pairs
//! (primary, alternate) and are written to consecutive slots. Once a full pair
//! beyond the current generation has arrived, the new pair becomes current and
//! the old one is retired.

/// Routes in use per destination.
pub const MAX_ROUTES: usize = 2;

/// Slots per destination ring: two generations of [`MAX_ROUTES`].
pub const RING_SLOTS: usize = 2 * MAX_ROUTES;

/// Slot bookkeeping for one destination.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RouteRing {
    installed: [bool; RING_SLOTS],
    primary: usize,
    next: usize,
}

impl RouteRing {
    /// Fresh ring with nothing installed.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Slot carrying the current primary.
    #[must_use]
    pub const fn current(&self) -> usize {
        self.primary
    }

    /// Slot carrying the current alternate.
    #[must_use]
    pub const fn alternate(&self) -> usize {
        (self.primary + 1) % RING_SLOTS
    }

    /// Slot the next update will be written to.
    #[must_use]
    pub const fn next_slot(&self) -> usize {
        self.next
    }

    /// Whether the next write starts a new generation.
    #[must_use]
    pub const fn generation_boundary_crossed(&self) -> bool {
        (self.next + RING_SLOTS - self.primary) % RING_SLOTS == MAX_ROUTES
    }

    /// Make the pending generation current. Returns the retired slots, which
    /// count as empty until written again.
    pub fn promote(&mut self) -> [usize; MAX_ROUTES] {
        let retired = [self.primary, self.alternate()];
        for slot in retired {
            self.installed[slot] = false;
        }
        self.primary = self.next;
        retired
    }

    /// Claim the next slot for writing.
    pub fn advance(&mut self) -> usize {
        let slot = self.next;
        self.installed[slot] = true;
        self.next = (self.next + 1) % RING_SLOTS;
        slot
    }

    /// Slot paired with `slot` in its generation.
    #[must_use]
    pub const fn sibling(&self, slot: usize) -> usize {
        if slot == self.primary {
            (slot + 1) % RING_SLOTS
        } else {
            (slot + RING_SLOTS - 1) % RING_SLOTS
        }
    }

    /// Whether `slot` belongs to the current generation.
    #[must_use]
    pub const fn is_current(&self, slot: usize) -> bool {
        slot == self.primary || slot == self.alternate()
    }

    /// Whether anything was ever written to `slot`.
    #[must_use]
    pub fn is_installed(&self, slot: usize) -> bool {
        self.installed.get(slot).copied().unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_generation_fills_slots_zero_and_one() {
        let mut ring = RouteRing::new();
        assert!(!ring.generation_boundary_crossed());
        assert_eq!(ring.advance(), 0);
        assert!(!ring.generation_boundary_crossed());
        assert_eq!(ring.advance(), 1);
        assert!(ring.generation_boundary_crossed());
        assert_eq!(ring.current(), 0);
        assert_eq!(ring.alternate(), 1);
    }

    #[test]
    fn promotion_wraps_around() {
        let mut ring = RouteRing::new();
        ring.advance();
        ring.advance();
        assert_eq!(ring.promote(), [0, 1]);
        assert!(!ring.is_installed(0));
        assert_eq!(ring.advance(), 2);
        ring.advance();
        assert!(ring.generation_boundary_crossed());
        assert_eq!(ring.promote(), [2, 3]);
        assert_eq!(ring.current(), 0);
        assert_eq!(ring.alternate(), 1);
    }

    #[test]
    fn siblings_stay_in_generation() {
        let mut ring = RouteRing::new();
        ring.advance();
        ring.advance();
        ring.promote();
        assert_eq!(ring.sibling(2), 3);
        assert_eq!(ring.sibling(3), 2);
        assert!(ring.is_current(3));
        assert!(!ring.is_current(0));
    }
}
