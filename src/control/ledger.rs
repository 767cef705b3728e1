//! Path ledger: path id -> path state.
//!
//! Primary and alternate roles are never stored. They are derived from deploy
//! times on every lookup: the earliest-activated active path of a pair is the
//! primary, the other one (when exactly two are active) is the alternate.

use std::collections::BTreeMap;
use std::time::{Duration, SystemTime};

use tracing::debug;

use super::path::{DEPLOY_TICK, LossRate, NodePair, Path, PathCondition};
use crate::clock::elapsed;
use crate::protocol::PathId;

/// Maximum number of best-effort paths active per node pair.
pub const MAX_ACTIVE_PER_PAIR: usize = 2;

/// All known paths, keyed by id.
#[derive(Debug, Default, Clone)]
pub struct PathLedger {
    paths: BTreeMap<PathId, Path>,
}

impl PathLedger {
    /// Create an empty ledger.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a path.
    pub fn insert(&mut self, path: Path) -> Option<Path> {
        self.paths.insert(path.id(), path)
    }

    /// Look up a path.
    #[must_use]
    pub fn get(&self, id: PathId) -> Option<&Path> {
        self.paths.get(&id)
    }

    /// Look up a path for mutation.
    pub fn get_mut(&mut self, id: PathId) -> Option<&mut Path> {
        self.paths.get_mut(&id)
    }

    /// Whether the ledger knows `id`.
    #[must_use]
    pub fn contains(&self, id: PathId) -> bool {
        self.paths.contains_key(&id)
    }

    /// Iterate over all paths in id order.
    pub fn iter(&self) -> impl Iterator<Item = &Path> {
        self.paths.values()
    }

    /// Number of paths.
    #[must_use]
    pub fn len(&self) -> usize {
        self.paths.len()
    }

    /// Whether the ledger is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    /// Best-effort active paths of a pair, in id order.
    #[must_use]
    pub fn active_paths(&self, pair: NodePair) -> Vec<PathId> {
        self.active_for(pair).map(Path::id).collect()
    }

    fn active_for(&self, pair: NodePair) -> impl Iterator<Item = &Path> {
        self.paths
            .values()
            .filter(move |p| p.is_best_effort_active() && p.pair() == pair)
    }

    /// Whether the pair currently has both a primary and an alternate.
    #[must_use]
    pub fn two_routes_active(&self, pair: NodePair) -> bool {
        self.active_for(pair).count() == MAX_ACTIVE_PER_PAIR
    }

    /// Earliest-activated active path of the pair.
    #[must_use]
    pub fn primary_for(&self, pair: NodePair) -> Option<PathId> {
        self.active_for(pair)
            .min_by_key(|p| p.deployed_at())
            .map(Path::id)
    }

    /// Later-activated path of the pair, only when exactly two are active.
    #[must_use]
    pub fn alternate_for(&self, pair: NodePair) -> Option<PathId> {
        if !self.two_routes_active(pair) {
            return None;
        }
        let primary = self.primary_for(pair)?;
        self.active_for(pair)
            .map(Path::id)
            .find(|&id| id != primary)
    }

    /// Available bandwidth of a path, zero when unknown.
    #[must_use]
    pub fn available_bandwidth(&self, id: PathId) -> u64 {
        self.get(id).map_or(0, |p| p.qos().available_bandwidth)
    }

    /// Most recently activated path of the pair.
    #[must_use]
    pub fn latest_active(&self, pair: NodePair) -> Option<&Path> {
        self.active_for(pair).max_by_key(|p| p.deployed_at())
    }

    /// Loss-rate sample for the pair: loss on its most recently activated path,
    /// or zero when nothing is active.
    #[must_use]
    pub fn pair_loss_sample(&self, pair: NodePair) -> LossRate {
        if pair.is_loop() {
            return 0;
        }
        self.latest_active(pair).map_or(0, Path::loss_rate)
    }

    /// Activate a primary/alternate pair as pushed to a router.
    ///
    /// The primary always ends up one tick older than a distinct alternate,
    /// and any other path of the same pair stops carrying best-effort traffic.
    /// Re-pushing an already active primary on both slots (a switchback)
    /// leaves the pair's alternate provisioned.
    pub fn activate_pair(&mut self, primary: PathId, alternate: PathId, now: SystemTime) {
        let Some(pair) = self.get(primary).map(Path::pair) else {
            return;
        };

        let refresh_only =
            primary == alternate && self.get(primary).is_some_and(Path::is_best_effort_active);
        let stale: Vec<PathId> = self
            .active_for(pair)
            .map(Path::id)
            .filter(|&id| !refresh_only && id != primary && id != alternate)
            .collect();
        for id in stale {
            debug!(path = %id, %pair, "retiring extra best-effort path");
            if let Some(path) = self.get_mut(id) {
                path.terminate();
            }
        }

        if alternate != primary {
            if let Some(path) = self.get_mut(alternate) {
                path.activate(now);
            }
        }
        let primary_deploy = now.checked_sub(DEPLOY_TICK).unwrap_or(now);
        if let Some(path) = self.get_mut(primary) {
            path.activate(primary_deploy);
        }

        if alternate == primary {
            return;
        }
        let alternate_at = self.get(alternate).and_then(Path::deployed_at);
        let primary_at = self.get(primary).and_then(Path::deployed_at);
        if let (Some(alt_at), Some(pri_at)) = (alternate_at, primary_at) {
            if pri_at >= alt_at {
                let older = alt_at.checked_sub(DEPLOY_TICK).unwrap_or(alt_at);
                if let Some(path) = self.get_mut(primary) {
                    path.set_deployed_at(older);
                }
            }
        }
    }

    /// Expire every active path of the pair.
    pub fn expire_pair(&mut self, pair: NodePair, now: SystemTime) {
        for path in self.paths.values_mut() {
            if path.is_best_effort_active() && path.pair() == pair {
                path.expire(now);
            }
        }
    }

    /// Stop best-effort traffic on every active path of the pair.
    pub fn terminate_pair(&mut self, pair: NodePair) {
        for path in self.paths.values_mut() {
            if path.is_best_effort_active() && path.pair() == pair {
                path.terminate();
            }
        }
    }

    /// Stop best-effort traffic on every active path.
    pub fn terminate_all(&mut self) -> usize {
        let mut count = 0;
        for path in self.paths.values_mut() {
            if path.is_best_effort_active() {
                path.terminate();
                count += 1;
            }
        }
        count
    }

    /// Unexpire RED paths whose expiration window has passed.
    pub fn unexpire_elapsed(&mut self, now: SystemTime, window: Duration) -> Vec<PathId> {
        let mut unexpired = Vec::new();
        for path in self.paths.values_mut() {
            if path.condition() != PathCondition::Red {
                continue;
            }
            let due = path
                .red_entered_at()
                .is_none_or(|at| elapsed(now, at) > window);
            if due && path.unexpire() {
                unexpired.push(path.id());
            }
        }
        unexpired
    }

    /// Unexpire RED paths whose recorded loss has dropped under `threshold`.
    pub fn reclaim_recovered(&mut self, threshold: LossRate) -> Vec<PathId> {
        let mut reclaimed = Vec::new();
        for path in self.paths.values_mut() {
            if path.condition() == PathCondition::Red
                && path.loss_rate() < threshold
                && path.unexpire()
            {
                reclaimed.push(path.id());
            }
        }
        reclaimed
    }

    /// Copy each active path's measured loss into its recorded loss rate.
    pub fn refresh_loss_rates(&mut self) {
        for path in self.paths.values_mut() {
            if path.is_best_effort_active() {
                let measured = path.qos().loss_rate;
                path.record_loss(measured);
            }
        }
    }
}
