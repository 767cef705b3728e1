//! Collaborators the controller drives but does not own.

use std::fmt;
use std::net::Ipv6Addr;

use super::ServiceError;
use super::ledger::PathLedger;
use super::path::{NodeId, Path};
use crate::protocol::{CongestionAdvisory, PathId, TableEntryUpdate};

/// Router identity (its loopback/control address).
pub type RouterId = Ipv6Addr;

/// Optimization criterion passed to path computation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Criterion {
    /// Widest path, shortest among equals.
    ShortestWidest,
    /// Shortest-widest path avoiding congested links.
    ShortestWidestLeastCongested,
    /// Shortest-widest path sharing the fewest links with a reference path.
    ShortestWidestMostDisjoint,
}

impl fmt::Display for Criterion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::ShortestWidest => "shortest-widest",
            Self::ShortestWidestLeastCongested => "shortest-widest-least-congested",
            Self::ShortestWidestMostDisjoint => "shortest-widest-most-disjoint",
        };
        write!(f, "{name}")
    }
}

/// Purpose a path is provisioned for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum UsageTag {
    /// Installed for best-effort traffic.
    BestEffort,
}

/// Path-finding service.
pub trait PathComputation {
    /// Find a path between two routers. `reference` is the path to be disjoint
    /// from when the criterion asks for it. Newly computed paths are inserted
    /// into `ledger` before their id is returned.
    fn find_path(
        &mut self,
        ledger: &mut PathLedger,
        src: RouterId,
        dest: RouterId,
        reference: Option<PathId>,
        criterion: Criterion,
    ) -> Option<PathId>;
}

/// Forwarding-layer provisioning.
pub trait Provisioner {
    /// Install `path` in the forwarding layer. Not idempotent on its own; the
    /// controller checks [`Path::is_created`] first.
    fn setup_path(&mut self, path: &Path, usage: UsageTag) -> Result<(), ServiceError>;
}

/// Control-message transport towards edge routers.
pub trait AdvisoryTransport {
    /// Deliver an advisory to a router.
    fn send_congestion_advisory(
        &mut self,
        router: RouterId,
        advisory: CongestionAdvisory,
    ) -> Result<(), ServiceError>;

    /// Deliver a paired table update to a router, primary first.
    ///
    /// Both halves reach the router or neither does. A router that sees only
    /// one half misaligns its route generations for that destination.
    fn send_table_pair(
        &mut self,
        router: RouterId,
        primary: TableEntryUpdate,
        alternate: TableEntryUpdate,
    ) -> Result<(), ServiceError>;
}

/// Identity lookups owned by the policy/topology store.
pub trait Topology {
    /// Router owning a node.
    fn router_for_node(&self, node: NodeId) -> Option<RouterId>;
    /// Node a router belongs to.
    fn node_for_router(&self, router: RouterId) -> Option<NodeId>;
    /// Node an interface address belongs to.
    fn node_for_interface(&self, interface: Ipv6Addr) -> Option<NodeId>;
}

/// Everything the controller needs from its environment.
pub trait Network: PathComputation + Provisioner + AdvisoryTransport + Topology {}

impl<T> Network for T where T: PathComputation + Provisioner + AdvisoryTransport + Topology {}
