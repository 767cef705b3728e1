//! Path model and congestion bookkeeping.

use std::fmt;
use std::time::{Duration, SystemTime};

use super::{ControlError, Result};
use crate::protocol::PathId;

/// Loss rate in basis points (1/100 of a percent).
pub type LossRate = u32;

/// Network node identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct NodeId(pub u32);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Ordered (source, destination) node pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodePair {
    /// Source node
    pub src: NodeId,
    /// Destination node
    pub dest: NodeId,
}

impl NodePair {
    /// Create a node pair.
    #[must_use]
    pub const fn new(src: NodeId, dest: NodeId) -> Self {
        Self { src, dest }
    }

    /// Source and destination are the same node.
    #[must_use]
    pub fn is_loop(&self) -> bool {
        self.src == self.dest
    }
}

impl fmt::Display for NodePair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({},{})", self.src, self.dest)
    }
}

/// Best-effort condition of a path.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum PathCondition {
    /// Not carrying best-effort traffic.
    #[default]
    Gray,
    /// No congestion.
    Green,
    /// Local congestion, advisory outstanding.
    Yellow,
    /// Expired or withdrawn.
    Red,
}

/// QoS snapshot reported by the measurement feed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PathQos {
    /// Bandwidth still available to best-effort traffic.
    pub available_bandwidth: u64,
    /// Best-effort loss rate observed by the measurement feed.
    pub loss_rate: LossRate,
}

/// Offset applied to keep a primary strictly older than its alternate.
pub(crate) const DEPLOY_TICK: Duration = Duration::from_millis(1);

/// A path in the ledger along with its best-effort state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Path {
    id: PathId,
    hops: Vec<NodeId>,
    pair: NodePair,
    condition: PathCondition,
    loss_rate: LossRate,
    best_effort_active: bool,
    deployed_at: Option<SystemTime>,
    created: bool,
    red_entered_at: Option<SystemTime>,
    congested_since: Option<SystemTime>,
    qos: PathQos,
}

impl Path {
    /// Build a path from its node sequence. Endpoints are the first and last hop.
    pub fn from_hops(id: PathId, hops: impl Into<Vec<NodeId>>) -> Result<Self> {
        let hops = hops.into();
        let (Some(&src), Some(&dest)) = (hops.first(), hops.last()) else {
            return Err(ControlError::EmptyRoute(id));
        };
        Ok(Self {
            id,
            hops,
            pair: NodePair::new(src, dest),
            condition: PathCondition::Gray,
            loss_rate: 0,
            best_effort_active: false,
            deployed_at: None,
            created: false,
            red_entered_at: None,
            congested_since: None,
            qos: PathQos::default(),
        })
    }

    /// Attach an initial QoS snapshot.
    #[must_use]
    pub fn with_qos(mut self, qos: PathQos) -> Self {
        self.qos = qos;
        self
    }

    /// Path identifier.
    #[must_use]
    pub const fn id(&self) -> PathId {
        self.id
    }

    /// Ordered node sequence.
    #[must_use]
    pub fn hops(&self) -> &[NodeId] {
        &self.hops
    }

    /// Source/destination node pair.
    #[must_use]
    pub const fn pair(&self) -> NodePair {
        self.pair
    }

    /// Current best-effort condition.
    #[must_use]
    pub const fn condition(&self) -> PathCondition {
        self.condition
    }

    /// Most recently recorded best-effort loss rate.
    #[must_use]
    pub const fn loss_rate(&self) -> LossRate {
        self.loss_rate
    }

    /// Whether the path currently carries best-effort traffic.
    #[must_use]
    pub const fn is_best_effort_active(&self) -> bool {
        self.best_effort_active
    }

    /// When best-effort traffic was activated on the path.
    #[must_use]
    pub const fn deployed_at(&self) -> Option<SystemTime> {
        self.deployed_at
    }

    /// Whether the path has been provisioned in the forwarding layer.
    #[must_use]
    pub const fn is_created(&self) -> bool {
        self.created
    }

    /// When the path turned RED.
    #[must_use]
    pub const fn red_entered_at(&self) -> Option<SystemTime> {
        self.red_entered_at
    }

    /// When congestion was first flagged on the path.
    #[must_use]
    pub const fn congested_since(&self) -> Option<SystemTime> {
        self.congested_since
    }

    /// Latest QoS snapshot.
    #[must_use]
    pub const fn qos(&self) -> PathQos {
        self.qos
    }

    /// Replace the QoS snapshot. Called by the measurement feed between cycles.
    pub fn set_qos(&mut self, qos: PathQos) {
        self.qos = qos;
    }

    pub(crate) fn record_loss(&mut self, loss_rate: LossRate) {
        self.loss_rate = loss_rate;
    }

    pub(crate) fn mark_created(&mut self) {
        self.created = true;
    }

    /// Start carrying best-effort traffic. An already-active path keeps its
    /// earlier deploy time and condition.
    pub(crate) fn activate(&mut self, now: SystemTime) {
        if self.best_effort_active {
            return;
        }
        self.best_effort_active = true;
        self.condition = PathCondition::Green;
        self.deployed_at = Some(now);
        self.red_entered_at = None;
        self.congested_since = None;
    }

    pub(crate) fn set_deployed_at(&mut self, at: SystemTime) {
        self.deployed_at = Some(at);
    }

    pub(crate) fn terminate(&mut self) {
        self.best_effort_active = false;
        self.condition = PathCondition::Gray;
        self.deployed_at = None;
        self.congested_since = None;
    }

    pub(crate) fn expire(&mut self, now: SystemTime) {
        self.best_effort_active = false;
        self.condition = PathCondition::Red;
        self.deployed_at = None;
        self.congested_since = None;
        self.red_entered_at = Some(now);
    }

    /// Make a RED path eligible for allocation again.
    pub(crate) fn unexpire(&mut self) -> bool {
        if self.condition != PathCondition::Red {
            return false;
        }
        self.condition = PathCondition::Gray;
        self.red_entered_at = None;
        true
    }

    pub(crate) fn mark_congested(&mut self, now: SystemTime) {
        self.condition = PathCondition::Yellow;
        self.congested_since = Some(now);
    }

    pub(crate) fn clear_congestion(&mut self) {
        self.condition = PathCondition::Green;
        self.congested_since = None;
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "path {} {} condition={:?} loss={}bp active={}",
            self.id, self.pair, self.condition, self.loss_rate, self.best_effort_active
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::UNIX_EPOCH;

    fn path() -> Path {
        Path::from_hops(PathId::new(1), [NodeId(1), NodeId(4), NodeId(2)]).unwrap()
    }

    #[test]
    fn endpoints_come_from_hops() {
        let p = path();
        assert_eq!(p.pair(), NodePair::new(NodeId(1), NodeId(2)));
        assert_eq!(p.hops().len(), 3);
        assert!(matches!(
            Path::from_hops(PathId::new(2), Vec::new()),
            Err(ControlError::EmptyRoute(_))
        ));
    }

    #[test]
    fn activation_keeps_first_deploy_time() {
        let mut p = path();
        let t0 = UNIX_EPOCH + Duration::from_secs(1);
        p.activate(t0);
        p.mark_congested(t0);
        p.activate(t0 + Duration::from_secs(5));
        assert_eq!(p.deployed_at(), Some(t0));
        assert_eq!(p.condition(), PathCondition::Yellow);
    }

    #[test]
    fn expire_and_unexpire() {
        let mut p = path();
        let t0 = UNIX_EPOCH + Duration::from_secs(1);
        p.activate(t0);
        p.expire(t0);
        assert_eq!(p.condition(), PathCondition::Red);
        assert!(!p.is_best_effort_active());
        assert_eq!(p.red_entered_at(), Some(t0));
        assert!(p.unexpire());
        assert_eq!(p.condition(), PathCondition::Gray);
        assert!(!p.unexpire());
    }
}
