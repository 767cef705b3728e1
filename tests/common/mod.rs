#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::net::Ipv6Addr;
use std::sync::Arc;
use std::time::Duration;

use beflow::control::{
    AdvisoryTransport, Criterion, NodeId, Path, PathComputation, PathLedger, PathQos,
    Provisioner, RouterId, ServiceError, Topology, UsageTag,
};
use beflow::{
    CongestionController, ControllerConfig, CongestionAdvisory, ManualClock, PathId,
    TableEntryUpdate,
};
use bytes::Bytes;

pub fn router(node: u32) -> RouterId {
    Ipv6Addr::new(0xfd00, 0, 0, 0, 0, 0, 0, node as u16)
}

pub fn iface(node: u32) -> Ipv6Addr {
    Ipv6Addr::new(0x2001, 0xdb8, 0, 0, 0, 0, 0, node as u16)
}

pub fn pid(raw: i32) -> PathId {
    PathId::new(raw)
}

pub fn path(id: i32, src: u32, dest: u32, bandwidth: u64) -> Path {
    Path::from_hops(pid(id), [NodeId(src), NodeId(100 + id as u32), NodeId(dest)])
        .unwrap()
        .with_qos(PathQos {
            available_bandwidth: bandwidth,
            loss_rate: 0,
        })
}

/// Scripted in-memory network. Path computation hands out the first scripted
/// candidate that is neither the reference path nor expired in the ledger.
#[derive(Debug, Default)]
pub struct MockNetwork {
    pub candidates: HashMap<(RouterId, RouterId, Criterion), Vec<Path>>,
    pub routers: HashMap<NodeId, RouterId>,
    pub interfaces: HashMap<Ipv6Addr, NodeId>,
    pub rejected_destinations: HashSet<Ipv6Addr>,
    pub rejected_paths: HashSet<PathId>,
    pub find_calls: Vec<(RouterId, RouterId, Option<PathId>, Criterion)>,
    pub setups: Vec<PathId>,
    pub advisories: Vec<(RouterId, CongestionAdvisory)>,
    pub table_updates: Vec<(RouterId, TableEntryUpdate)>,
    pub wire: Vec<(RouterId, Bytes)>,
}

impl MockNetwork {
    pub fn with_nodes(nodes: &[u32]) -> Self {
        let mut network = Self::default();
        for &node in nodes {
            network.routers.insert(NodeId(node), router(node));
            network.interfaces.insert(iface(node), NodeId(node));
        }
        network
    }

    pub fn script(&mut self, src: u32, dest: u32, criterion: Criterion, paths: Vec<Path>) {
        self.candidates
            .insert((router(src), router(dest), criterion), paths);
    }

    /// Primary via shortest-widest, alternate via most-disjoint.
    pub fn script_pair(&mut self, src: u32, dest: u32, primary: i32, alternate: i32) {
        self.script(
            src,
            dest,
            Criterion::ShortestWidest,
            vec![path(primary, src, dest, 1_000)],
        );
        self.script(
            src,
            dest,
            Criterion::ShortestWidestMostDisjoint,
            vec![path(alternate, src, dest, 500)],
        );
    }

    pub fn advisories_for(&self, path: PathId) -> Vec<(RouterId, CongestionAdvisory)> {
        self.advisories
            .iter()
            .filter(|(_, a)| a.path_id() == path)
            .copied()
            .collect()
    }

    pub fn drain_wire(&mut self, to: RouterId) -> Vec<Bytes> {
        let (mine, rest): (Vec<_>, Vec<_>) = self.wire.drain(..).partition(|(r, _)| *r == to);
        self.wire = rest;
        mine.into_iter().map(|(_, bytes)| bytes).collect()
    }
}

impl PathComputation for MockNetwork {
    fn find_path(
        &mut self,
        ledger: &mut PathLedger,
        src: RouterId,
        dest: RouterId,
        reference: Option<PathId>,
        criterion: Criterion,
    ) -> Option<PathId> {
        self.find_calls.push((src, dest, reference, criterion));
        let candidates = self.candidates.get(&(src, dest, criterion))?;
        for candidate in candidates {
            if Some(candidate.id()) == reference {
                continue;
            }
            match ledger.get(candidate.id()) {
                Some(known) if known.condition() == beflow::PathCondition::Red => continue,
                Some(_) => {}
                None => {
                    ledger.insert(candidate.clone());
                }
            }
            return Some(candidate.id());
        }
        None
    }
}

impl Provisioner for MockNetwork {
    fn setup_path(&mut self, path: &Path, usage: UsageTag) -> Result<(), ServiceError> {
        assert_eq!(usage, UsageTag::BestEffort);
        self.setups.push(path.id());
        Ok(())
    }
}

impl AdvisoryTransport for MockNetwork {
    fn send_congestion_advisory(
        &mut self,
        router: RouterId,
        advisory: CongestionAdvisory,
    ) -> Result<(), ServiceError> {
        self.advisories.push((router, advisory));
        self.wire.push((router, advisory.encode()));
        Ok(())
    }

    fn send_table_pair(
        &mut self,
        router: RouterId,
        primary: TableEntryUpdate,
        alternate: TableEntryUpdate,
    ) -> Result<(), ServiceError> {
        // validate both halves before anything reaches the wire
        for entry in [primary, alternate] {
            if self.rejected_destinations.contains(&entry.destination()) {
                return Err(ServiceError::Rejected(format!(
                    "no route to {}",
                    entry.destination()
                )));
            }
            if self.rejected_paths.contains(&entry.path_id()) {
                return Err(ServiceError::Rejected(format!(
                    "path {} refused",
                    entry.path_id()
                )));
            }
        }
        for entry in [primary, alternate] {
            self.table_updates.push((router, entry));
            self.wire.push((router, entry.encode()));
        }
        Ok(())
    }
}

impl Topology for MockNetwork {
    fn router_for_node(&self, node: NodeId) -> Option<RouterId> {
        self.routers.get(&node).copied()
    }

    fn node_for_router(&self, router: RouterId) -> Option<NodeId> {
        self.routers
            .iter()
            .find(|(_, r)| **r == router)
            .map(|(node, _)| *node)
    }

    fn node_for_interface(&self, interface: Ipv6Addr) -> Option<NodeId> {
        self.interfaces.get(&interface).copied()
    }
}

pub const CYCLE: Duration = Duration::from_millis(200);

/// Local resolution timeout with default config, plus one millisecond.
pub const PAST_TIMEOUT: Duration = Duration::from_millis(2_001);

pub fn controller(network: MockNetwork) -> (CongestionController<MockNetwork>, Arc<ManualClock>) {
    controller_with(ControllerConfig::default(), network)
}

pub fn controller_with(
    config: ControllerConfig,
    network: MockNetwork,
) -> (CongestionController<MockNetwork>, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::starting_at(Duration::from_secs(10_000)));
    let controller = CongestionController::new(config, network, clock.clone());
    (controller, clock)
}

/// Two edge nodes (1, 2) with paths 10/11 for 1->2 and 20/21 for 2->1,
/// already discovered and deployed.
pub fn two_node_controller(
    configure: impl FnOnce(&mut MockNetwork),
) -> (CongestionController<MockNetwork>, Arc<ManualClock>) {
    let mut network = MockNetwork::with_nodes(&[1, 2]);
    network.script_pair(1, 2, 10, 11);
    network.script_pair(2, 1, 20, 21);
    configure(&mut network);
    let (mut controller, clock) = controller(network);
    controller.notify_edge_discovered(iface(1)).unwrap();
    controller.notify_edge_discovered(iface(2)).unwrap();
    (controller, clock)
}
