//! Best-effort congestion controller (server side).
//!
//! The controller reacts to per-path loss measurements. Absent global
//! congestion it resolves congestion locally, one node pair at a time
//! (reactive monitoring). When local resolution fails it switches to global
//! mode and periodically rebalances bandwidth between node pairs based on
//! loss-rate statistics (proactive monitoring).

use std::fmt;
use std::net::Ipv6Addr;
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use tracing::{debug, info, warn};

use super::config::ControllerConfig;
use super::ledger::PathLedger;
use super::path::{LossRate, NodeId, NodePair, Path, PathCondition};
use super::services::{Criterion, Network, RouterId, UsageTag};
use super::stats::FairnessStats;
use super::{ControlError, Result};
use crate::clock::{Clock, SystemClock, elapsed, window_elapsed};
use crate::protocol::metrics::Metrics;
use crate::protocol::{Condition, CongestionAdvisory, PathId, TableEntryUpdate};

/// Outcome of a switchback request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[must_use]
pub enum Switchback {
    /// Traffic was reset onto the primary path.
    Performed,
    /// A switchback already happened within the last control cycle.
    RateLimited,
    /// No router destination accepted the reset. Nothing was recorded, so a
    /// retry is allowed at once.
    Undelivered,
}

impl Switchback {
    /// Whether anything changed.
    #[must_use]
    pub const fn performed(self) -> bool {
        matches!(self, Self::Performed)
    }
}

/// Node pair between two registered edge routers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) struct EdgePair {
    pub(super) src: RouterId,
    pub(super) dest: RouterId,
    pub(super) nodes: NodePair,
}

/// Congestion controller context. One instance per server.
pub struct CongestionController<N> {
    pub(super) config: ControllerConfig,
    pub(super) clock: Arc<dyn Clock>,
    pub(super) network: N,
    pub(super) ledger: PathLedger,
    pub(super) global_congestion: bool,
    pub(super) local_resolution_timeout: Duration,
    pub(super) stats: FairnessStats,
    pub(super) last_action_at: Option<SystemTime>,
    pub(super) action_backoff: Duration,
    pub(super) last_congestion_at: Option<SystemTime>,
    pub(super) last_switchback_at: Option<SystemTime>,
    pub(super) edge_routers: Vec<RouterId>,
    pub(super) edge_destinations: Vec<Ipv6Addr>,
}

impl<N: Network> CongestionController<N> {
    /// Create a controller reading time from `clock`.
    pub fn new(config: ControllerConfig, network: N, clock: Arc<dyn Clock>) -> Self {
        let local_resolution_timeout = config.local_resolution_timeout();
        debug!(
            timeout_ms = local_resolution_timeout.as_millis(),
            "local resolution timeout derived from control cycle"
        );
        Self {
            config,
            clock,
            network,
            ledger: PathLedger::new(),
            global_congestion: false,
            local_resolution_timeout,
            stats: FairnessStats::default(),
            last_action_at: None,
            action_backoff: Duration::ZERO,
            last_congestion_at: None,
            last_switchback_at: None,
            edge_routers: Vec::new(),
            edge_destinations: Vec::new(),
        }
    }

    /// Create a controller on wall-clock time.
    pub fn with_system_clock(config: ControllerConfig, network: N) -> Self {
        Self::new(config, network, Arc::new(SystemClock))
    }

    /// Active configuration.
    #[must_use]
    pub fn config(&self) -> &ControllerConfig {
        &self.config
    }

    /// Collaborators.
    #[must_use]
    pub fn network(&self) -> &N {
        &self.network
    }

    /// Collaborators, mutably.
    pub fn network_mut(&mut self) -> &mut N {
        &mut self.network
    }

    /// Path ledger.
    #[must_use]
    pub fn ledger(&self) -> &PathLedger {
        &self.ledger
    }

    /// Path ledger, for the measurement feed to update QoS snapshots between
    /// cycles.
    pub fn ledger_mut(&mut self) -> &mut PathLedger {
        &mut self.ledger
    }

    /// Whether global congestion resolution is running.
    #[must_use]
    pub fn global_congestion_active(&self) -> bool {
        self.global_congestion
    }

    /// Statistics from the latest fairness computation.
    #[must_use]
    pub fn fairness_stats(&self) -> FairnessStats {
        self.stats
    }

    /// Unscaled local resolution timeout.
    #[must_use]
    pub fn local_resolution_timeout(&self) -> Duration {
        self.local_resolution_timeout
    }

    /// Registered edge routers, in discovery order.
    #[must_use]
    pub fn edge_routers(&self) -> &[RouterId] {
        &self.edge_routers
    }

    /// Registered edge destination addresses, in discovery order.
    #[must_use]
    pub fn edge_destinations(&self) -> &[Ipv6Addr] {
        &self.edge_destinations
    }

    /// Register a newly observed edge interface. Returns `true` when the
    /// router or address was new and the best-effort topology was rebuilt.
    pub fn notify_edge_discovered(&mut self, interface: Ipv6Addr) -> Result<bool> {
        let node = self
            .network
            .node_for_interface(interface)
            .ok_or(ControlError::UnknownInterface(interface))?;
        let router = self.router_for(node)?;

        let mut learned = 0;
        if !self.edge_routers.contains(&router) {
            info!(%router, %node, "registered edge router");
            self.edge_routers.push(router);
            learned += 1;
        }
        if !self.edge_destinations.contains(&interface) {
            info!(%interface, %node, "registered edge destination");
            self.edge_destinations.push(interface);
            learned += 1;
        }

        if learned == 0 {
            debug!(%interface, "no new edge information; topology unchanged");
            return Ok(false);
        }
        self.update_topology();
        Ok(true)
    }

    /// Drop every best-effort path and redeploy initial paths for all pairs.
    fn update_topology(&mut self) {
        let reset = self.ledger.terminate_all();
        debug!(paths = reset, "reset best-effort paths");
        for pair in self.edge_pairs() {
            if let Err(err) = self.deploy_pair(pair) {
                warn!(pair = %pair.nodes, error = %err, "initial path deployment failed");
            }
        }
        info!(
            routers = self.edge_routers.len(),
            destinations = self.edge_destinations.len(),
            "best-effort topology updated"
        );
    }

    /// Deploy a primary and, if one exists, a disjoint alternate between two
    /// edge routers. Returns the pushed (primary, alternate) or `None` when no
    /// route exists.
    pub fn deploy_initial_paths(
        &mut self,
        src: RouterId,
        dest: RouterId,
    ) -> Result<Option<(PathId, PathId)>> {
        let nodes = NodePair::new(self.node_for_router(src)?, self.node_for_router(dest)?);
        if nodes.is_loop() {
            return Ok(None);
        }
        self.deploy_pair(EdgePair { src, dest, nodes })
    }

    fn deploy_pair(&mut self, pair: EdgePair) -> Result<Option<(PathId, PathId)>> {
        let Some(primary) = self.find_path(pair.src, pair.dest, None, Criterion::ShortestWidest)
        else {
            debug!(pair = %pair.nodes, "no best-effort route");
            return Ok(None);
        };
        self.provision(primary)?;
        info!(path = %primary, pair = %pair.nodes, "deployed primary path");

        let alternate = self.find_alternate(pair, primary)?;
        self.send_table_entries(pair, primary, alternate)?;
        Ok(Some((primary, alternate)))
    }

    /// Per-cycle entry point for one loss observation.
    pub fn monitor(&mut self, path: PathId, loss_rate: LossRate) -> Result<()> {
        if !self.ledger.contains(path) {
            return Err(ControlError::UnknownPath(path));
        }
        if self.global_congestion {
            self.proactive_monitor(path, loss_rate)
        } else {
            self.reactive_monitor(path, loss_rate)
        }
    }

    /// Feed a whole measurement cycle. Failures are logged and contained to
    /// their path; returns how many observations failed.
    pub fn run_cycle<I>(&mut self, observations: I) -> usize
    where
        I: IntoIterator<Item = (PathId, LossRate)>,
    {
        let mut failures = 0;
        for (path, loss_rate) in observations {
            if let Err(err) = self.monitor(path, loss_rate) {
                warn!(path = %path, error = %err, "monitoring failed");
                failures += 1;
            }
        }
        failures
    }

    fn reactive_monitor(&mut self, id: PathId, loss_rate: LossRate) -> Result<()> {
        let now = self.clock.now();

        if loss_rate > self.config.loss_threshold {
            self.unexpire_paths(now);
            let path = self.path(id)?;
            let (condition, pair) = (path.condition(), path.pair());
            match condition {
                PathCondition::Green => self.on_new_congestion(id, pair, now),
                PathCondition::Yellow => self.on_persistent_congestion(id, pair, now),
                PathCondition::Gray | PathCondition::Red => Ok(()),
            }
        } else {
            let path = self.path(id)?;
            if path.condition() == PathCondition::Yellow {
                let pair = path.pair();
                self.on_congestion_cleared(id, pair)
            } else {
                Ok(())
            }
        }
    }

    fn on_new_congestion(&mut self, id: PathId, pair: NodePair, now: SystemTime) -> Result<()> {
        if self.ledger.alternate_for(pair) == Some(id) {
            let primary_clear = self
                .ledger
                .primary_for(pair)
                .and_then(|p| self.ledger.get(p))
                .is_some_and(|p| p.condition() == PathCondition::Green);
            if primary_clear {
                info!(path = %id, %pair, "congestion on alternate while primary is clear");
                if !self.switchback(pair)?.performed() {
                    debug!(%pair, "switchback deferred to a later cycle");
                }
            } else {
                self.mark_congested(id, now);
                debug!(path = %id, %pair, "alternate path congested");
            }
            return Ok(());
        }

        let router = self.router_for(pair.src)?;
        self.send_advisory(router, id, Condition::Yellow)?;
        self.mark_congested(id, now);
        info!(path = %id, %pair, "new congestion on primary path");
        Ok(())
    }

    fn on_persistent_congestion(
        &mut self,
        id: PathId,
        pair: NodePair,
        now: SystemTime,
    ) -> Result<()> {
        let since = self.ledger.get(id).and_then(Path::congested_since);
        if !window_elapsed(now, since, self.scaled_resolution_timeout()) {
            return Ok(());
        }

        let resolved = self.bypass_congestion(id, pair, now)?;
        if !resolved && !self.global_congestion {
            warn!(%pair, "local resolution impossible; entering global congestion");
            self.initiate_global_congestion_resolution(now);
        }
        Ok(())
    }

    /// Replace a congested pair's paths with a least-congested primary and a
    /// fresh alternate. Returns `false` when no replacement exists.
    fn bypass_congestion(&mut self, congested: PathId, pair: NodePair, now: SystemTime) -> Result<bool> {
        let edge = self.edge_pair(pair)?;
        let Some(primary) = self.find_path(
            edge.src,
            edge.dest,
            None,
            Criterion::ShortestWidestLeastCongested,
        ) else {
            debug!(%pair, "no least-congested replacement path");
            return Ok(false);
        };

        info!(%pair, path = %primary, "congestion bypass: deploying new primary");
        self.provision(primary)?;
        self.ledger.expire_pair(pair, now);
        self.send_advisory(edge.src, congested, Condition::Green)?;

        let alternate = self.find_alternate(edge, primary)?;
        self.send_table_entries(edge, primary, alternate)?;
        Ok(true)
    }

    fn on_congestion_cleared(&mut self, id: PathId, pair: NodePair) -> Result<()> {
        if self.ledger.primary_for(pair) != Some(id) {
            self.clear_congestion(id);
            debug!(path = %id, %pair, "congestion cleared on alternate path");
            return Ok(());
        }

        let alternate_clear = self
            .ledger
            .alternate_for(pair)
            .and_then(|a| self.ledger.get(a))
            .is_none_or(|a| a.condition() == PathCondition::Green);

        if alternate_clear {
            let router = self.router_for(pair.src)?;
            self.send_advisory(router, id, Condition::Green)?;
            self.clear_congestion(id);
            info!(path = %id, %pair, "congestion cleared for node pair");
        } else {
            self.clear_congestion(id);
            info!(path = %id, %pair, "primary cleared while alternate lossy");
            if !self.switchback(pair)?.performed() {
                debug!(%pair, "switchback deferred to a later cycle");
            }
        }
        Ok(())
    }

    fn proactive_monitor(&mut self, id: PathId, loss_rate: LossRate) -> Result<()> {
        let now = self.clock.now();
        if let Some(path) = self.ledger.get_mut(id) {
            path.record_loss(loss_rate);
        }

        let timeout = self.scaled_resolution_timeout();
        if loss_rate > self.config.loss_threshold {
            self.last_congestion_at = Some(now);
        } else if window_elapsed(now, self.last_congestion_at, timeout) {
            self.terminate_global_congestion_resolution();
            return self.reactive_monitor(id, loss_rate);
        }

        let action_window = timeout.saturating_add(self.action_backoff);
        if window_elapsed(now, self.last_action_at, action_window) {
            self.run_fairness_pass(now);
            Ok(())
        } else {
            self.reactive_monitor(id, loss_rate)
        }
    }

    fn initiate_global_congestion_resolution(&mut self, now: SystemTime) {
        self.global_congestion = true;
        Metrics::record_global_congestion();
        self.ledger.refresh_loss_rates();
        self.calculate_fairness();
        self.last_action_at = Some(now);
        self.action_backoff = Duration::ZERO;
        self.last_congestion_at = Some(now);
        warn!(stats = %self.stats, "global congestion resolution started");
    }

    fn terminate_global_congestion_resolution(&mut self) {
        self.global_congestion = false;
        info!("global congestion resolved");
    }

    /// Handle notice that a best-effort path failed: withdraw it and restore
    /// redundancy for its node pair from the surviving path.
    pub fn notify_path_failed(&mut self, id: PathId) -> Result<()> {
        let pair = self.path(id)?.pair();
        let edge = self.edge_pair(pair)?;
        info!(path = %id, %pair, "handling best-effort path failure");
        self.send_advisory(edge.src, id, Condition::Red)?;
        self.restore_redundancy(id, edge)
    }

    fn restore_redundancy(&mut self, dead: PathId, edge: EdgePair) -> Result<()> {
        let now = self.clock.now();
        if let Some(path) = self.ledger.get_mut(dead) {
            path.expire(now);
        }

        let Some(live) = self.ledger.primary_for(edge.nodes) else {
            warn!(path = %dead, pair = %edge.nodes, "no surviving path; redundancy not restored");
            return Err(ControlError::NoSurvivingPath(dead));
        };

        let alternate = self.find_alternate(edge, live)?;
        self.send_table_entries(edge, live, alternate)?;
        if alternate == live {
            info!(path = %live, pair = %edge.nodes, "no redundant path; surviving path resent as alternate");
        } else {
            info!(path = %live, alternate = %alternate, pair = %edge.nodes, "redundancy restored");
        }
        Ok(())
    }

    /// Reset a node pair's traffic fully onto its primary path.
    ///
    /// Refused, without any state change, within one control cycle of the
    /// previous switchback. A reset no destination accepted does not count
    /// towards that limit.
    pub fn switchback(&mut self, pair: NodePair) -> Result<Switchback> {
        let now = self.clock.now();
        let cycle = self.config.control_cycle;
        if self
            .last_switchback_at
            .is_some_and(|last| elapsed(now, last) < cycle)
        {
            debug!(%pair, "switchback rate-limited");
            return Ok(Switchback::RateLimited);
        }

        let primary = self
            .ledger
            .primary_for(pair)
            .ok_or(ControlError::NoActivePath(pair))?;
        let edge = self.edge_pair(pair)?;
        if self.send_table_entries(edge, primary, primary)? == 0 {
            warn!(%pair, path = %primary, "switchback reached no destination");
            return Ok(Switchback::Undelivered);
        }
        self.send_advisory(edge.src, primary, Condition::Green)?;

        self.last_switchback_at = Some(now);
        Metrics::record_switchback();
        info!(%pair, path = %primary, "traffic split reset to 100/0");
        Ok(Switchback::Performed)
    }

    pub(super) fn scaled_resolution_timeout(&self) -> Duration {
        self.config.scaled(self.local_resolution_timeout)
    }

    fn unexpire_paths(&mut self, now: SystemTime) {
        let window = self.config.scaled(self.config.path_expiration);
        for id in self.ledger.unexpire_elapsed(now, window) {
            info!(path = %id, "expired path eligible again");
        }
    }

    fn mark_congested(&mut self, id: PathId, now: SystemTime) {
        if let Some(path) = self.ledger.get_mut(id) {
            path.mark_congested(now);
        }
    }

    fn clear_congestion(&mut self, id: PathId) {
        if let Some(path) = self.ledger.get_mut(id) {
            path.clear_congestion();
        }
    }

    fn path(&self, id: PathId) -> Result<&Path> {
        self.ledger.get(id).ok_or(ControlError::UnknownPath(id))
    }

    pub(super) fn router_for(&self, node: NodeId) -> Result<RouterId> {
        self.network
            .router_for_node(node)
            .ok_or(ControlError::UnknownNode(node))
    }

    fn node_for_router(&self, router: RouterId) -> Result<NodeId> {
        self.network
            .node_for_router(router)
            .ok_or(ControlError::UnknownRouter(router))
    }

    pub(super) fn edge_pair(&self, nodes: NodePair) -> Result<EdgePair> {
        Ok(EdgePair {
            src: self.router_for(nodes.src)?,
            dest: self.router_for(nodes.dest)?,
            nodes,
        })
    }

    /// Every ordered pair of registered edge routers, self-pairs excluded.
    pub(super) fn edge_pairs(&self) -> Vec<EdgePair> {
        let mut pairs = Vec::new();
        for &src in &self.edge_routers {
            let Some(src_node) = self.network.node_for_router(src) else {
                warn!(router = %src, "edge router has no node mapping");
                continue;
            };
            for &dest in &self.edge_routers {
                if src == dest {
                    continue;
                }
                let Some(dest_node) = self.network.node_for_router(dest) else {
                    continue;
                };
                let nodes = NodePair::new(src_node, dest_node);
                if !nodes.is_loop() {
                    pairs.push(EdgePair { src, dest, nodes });
                }
            }
        }
        pairs
    }

    /// Ask path computation for a path, refusing ids the ledger does not know
    /// and paths that are still expired.
    pub(super) fn find_path(
        &mut self,
        src: RouterId,
        dest: RouterId,
        reference: Option<PathId>,
        criterion: Criterion,
    ) -> Option<PathId> {
        let id = self
            .network
            .find_path(&mut self.ledger, src, dest, reference, criterion)?;
        match self.ledger.get(id) {
            None => {
                warn!(path = %id, %criterion, "path computation returned an unknown path");
                None
            }
            Some(path) if path.condition() == PathCondition::Red => {
                debug!(path = %id, %criterion, "ignoring expired path");
                None
            }
            Some(_) => Some(id),
        }
    }

    /// Disjoint alternate for `primary`, provisioned; the primary itself when
    /// none exists.
    pub(super) fn find_alternate(&mut self, pair: EdgePair, primary: PathId) -> Result<PathId> {
        match self.find_path(
            pair.src,
            pair.dest,
            Some(primary),
            Criterion::ShortestWidestMostDisjoint,
        ) {
            Some(alternate) if alternate != primary => {
                self.provision(alternate)?;
                info!(path = %alternate, pair = %pair.nodes, "deployed alternate path");
                Ok(alternate)
            }
            _ => {
                debug!(path = %primary, pair = %pair.nodes, "no alternate; reusing primary");
                Ok(primary)
            }
        }
    }

    /// Provision a path in the forwarding layer at most once.
    pub(super) fn provision(&mut self, id: PathId) -> Result<()> {
        let path = self.ledger.get(id).ok_or(ControlError::UnknownPath(id))?;
        if path.is_created() {
            return Ok(());
        }
        self.network.setup_path(path, UsageTag::BestEffort)?;
        if let Some(path) = self.ledger.get_mut(id) {
            path.mark_created();
        }
        debug!(path = %id, "provisioned path");
        Ok(())
    }

    pub(super) fn send_advisory(
        &mut self,
        router: RouterId,
        path: PathId,
        condition: Condition,
    ) -> Result<()> {
        self.network
            .send_congestion_advisory(router, CongestionAdvisory::new(path, condition))?;
        Metrics::record_advisory_sent(condition);
        debug!(%router, path = %path, %condition, "sent congestion advisory");
        Ok(())
    }

    /// Push a primary/alternate pair to the source router for every address
    /// owned by the destination node, then activate both paths.
    ///
    /// A destination that cannot be resolved or delivered to is skipped; the
    /// others still get the update. Returns how many destinations took it.
    pub(super) fn send_table_entries(
        &mut self,
        pair: EdgePair,
        primary: PathId,
        alternate: PathId,
    ) -> Result<usize> {
        let now = self.clock.now();
        let mut delivered = 0;
        for &destination in &self.edge_destinations {
            match self.network.node_for_interface(destination) {
                Some(node) if node == pair.nodes.dest => {}
                Some(_) => continue,
                None => {
                    warn!(%destination, "cannot resolve destination; table update skipped");
                    continue;
                }
            }
            if let Err(err) =
                push_table_pair(&mut self.network, pair.src, destination, primary, alternate)
            {
                warn!(%destination, router = %pair.src, error = %err, "table pair not delivered");
                continue;
            }
            delivered += 1;
        }

        if delivered > 0 {
            self.ledger.activate_pair(primary, alternate, now);
        } else {
            warn!(pair = %pair.nodes, "no destination accepted the table update");
        }
        Ok(delivered)
    }
}

fn push_table_pair<N: Network>(
    network: &mut N,
    router: RouterId,
    destination: Ipv6Addr,
    primary: PathId,
    alternate: PathId,
) -> Result<()> {
    network.send_table_pair(
        router,
        TableEntryUpdate::new(destination, primary),
        TableEntryUpdate::new(destination, alternate),
    )?;
    Metrics::record_table_update_sent();
    Metrics::record_table_update_sent();
    Ok(())
}

impl<N> fmt::Display for CongestionController<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mode = if self.global_congestion {
            "proactive"
        } else {
            "reactive"
        };
        write!(
            f,
            "mode={mode} {} paths={} routers={} destinations={}",
            self.stats,
            self.ledger.len(),
            self.edge_routers.len(),
            self.edge_destinations.len()
        )
    }
}
