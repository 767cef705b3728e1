//! Global congestion resolution: rob from the rich, give to the poor.
//!
//! Node pairs are classified against the mean and standard deviation of all
//! pairs' loss samples. Pairs well under the mean give up their weakest path;
//! pairs well over it get traffic moved back to their primary or onto a
//! reclaimed path.

use std::time::{Duration, SystemTime};

use tracing::{debug, info, warn};

use super::Result;
use super::controller::{CongestionController, EdgePair, Switchback};
use super::path::{LossRate, NodePair, Path};
use super::services::{Criterion, Network};
use super::stats::FairnessStats;
use crate::protocol::Condition;

impl<N: Network> CongestionController<N> {
    /// One loss sample per ordered edge-router pair.
    #[must_use]
    pub fn loss_samples(&self) -> Vec<(NodePair, LossRate)> {
        self.edge_pairs()
            .into_iter()
            .map(|pair| (pair.nodes, self.ledger.pair_loss_sample(pair.nodes)))
            .collect()
    }

    pub(super) fn calculate_fairness(&mut self) {
        let samples: Vec<LossRate> = self
            .loss_samples()
            .into_iter()
            .map(|(_, sample)| sample)
            .collect();
        self.stats = FairnessStats::from_samples(&samples);
        info!(pairs = samples.len(), stats = %self.stats, "fairness statistics updated");
    }

    /// Recompute statistics and run one rob/give pass. Backs off for
    /// `action_backoff_factor` resolution timeouts when nothing changed.
    pub(super) fn run_fairness_pass(&mut self, now: SystemTime) -> bool {
        info!("rebalancing: rob from the rich, give to the poor");
        self.calculate_fairness();
        let robbed = self.rob_from_the_rich(now);
        let gave = self.give_to_the_poor();

        self.last_action_at = Some(now);
        if robbed || gave {
            self.action_backoff = Duration::ZERO;
            return true;
        }
        self.action_backoff = self
            .scaled_resolution_timeout()
            .saturating_mul(self.config.action_backoff_factor);
        debug!(
            backoff_ms = self.action_backoff.as_millis(),
            "nothing to rebalance; backing off"
        );
        false
    }

    pub(super) fn rob_from_the_rich(&mut self, now: SystemTime) -> bool {
        let mut robbed = false;
        for pair in self.edge_pairs() {
            match self.rob_pair(pair, now) {
                Ok(acted) => robbed |= acted,
                Err(err) => warn!(pair = %pair.nodes, error = %err, "rob from the rich failed"),
            }
        }
        robbed
    }

    fn rob_pair(&mut self, pair: EdgePair, now: SystemTime) -> Result<bool> {
        let sample = self.ledger.pair_loss_sample(pair.nodes);
        if !self.stats.is_rich(sample) || !self.ledger.two_routes_active(pair.nodes) {
            return Ok(false);
        }

        let victim = self
            .ledger
            .active_paths(pair.nodes)
            .into_iter()
            .filter_map(|id| self.ledger.get(id))
            .min_by_key(|p| p.qos().available_bandwidth)
            .map(Path::id);
        let Some(victim) = victim else {
            return Ok(false);
        };

        self.send_advisory(pair.src, victim, Condition::Red)?;
        if let Some(path) = self.ledger.get_mut(victim) {
            path.expire(now);
        }
        info!(path = %victim, pair = %pair.nodes, sample, "robbed from the rich");
        Ok(true)
    }

    pub(super) fn give_to_the_poor(&mut self) -> bool {
        let reclaimed = self.ledger.reclaim_recovered(self.config.loss_threshold);
        if !reclaimed.is_empty() {
            debug!(paths = reclaimed.len(), "reclaimed recovered paths");
        }

        let mut gave = false;
        for pair in self.edge_pairs() {
            match self.give_pair(pair) {
                Ok(acted) => gave |= acted,
                Err(err) => warn!(pair = %pair.nodes, error = %err, "give to the poor failed"),
            }
        }
        gave
    }

    fn give_pair(&mut self, pair: EdgePair) -> Result<bool> {
        let sample = self.ledger.pair_loss_sample(pair.nodes);
        if !self.stats.is_poor(sample) || !self.ledger.two_routes_active(pair.nodes) {
            return Ok(false);
        }
        let (Some(primary), Some(alternate)) = (
            self.ledger.primary_for(pair.nodes),
            self.ledger.alternate_for(pair.nodes),
        ) else {
            return Ok(false);
        };

        let reclaim = self.find_path(pair.src, pair.dest, None, Criterion::ShortestWidest);
        let switchback_bw = self.ledger.available_bandwidth(primary);
        let current_bw = self.ledger.available_bandwidth(alternate);
        let reclaim_bw = reclaim.map_or(0, |id| self.ledger.available_bandwidth(id));
        debug!(
            pair = %pair.nodes,
            switchback_bw,
            current_bw,
            reclaim_bw,
            "poor pair candidates"
        );

        if switchback_bw > current_bw && switchback_bw > reclaim_bw {
            let outcome = self.switchback(pair.nodes)?;
            if outcome == Switchback::Performed {
                info!(pair = %pair.nodes, path = %primary, "gave to the poor: switched back");
            }
            return Ok(outcome.performed());
        }

        let Some(reclaim) = reclaim else {
            return Ok(false);
        };
        if reclaim_bw <= current_bw {
            return Ok(false);
        }

        self.ledger.terminate_pair(pair.nodes);
        self.send_advisory(pair.src, reclaim, Condition::Green)?;
        self.provision(reclaim)?;
        let alternate = self.find_alternate(pair, reclaim)?;
        self.send_table_entries(pair, reclaim, alternate)?;
        info!(pair = %pair.nodes, path = %reclaim, "gave to the poor: reclaimed path");
        Ok(true)
    }
}
