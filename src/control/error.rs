//! Controller error types

use std::net::Ipv6Addr;

use thiserror::Error;

use super::path::{NodeId, NodePair};
use crate::protocol::PathId;

/// Failure reported by an external collaborator (provisioning, transport).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ServiceError {
    /// Router could not be reached
    #[error("router {0} unreachable")]
    Unreachable(Ipv6Addr),

    /// Collaborator refused the request
    #[error("request rejected: {0}")]
    Rejected(String),
}

/// Congestion controller errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ControlError {
    /// Path id not present in the ledger
    #[error("unknown path {0}")]
    UnknownPath(PathId),

    /// Path built from an empty node sequence
    #[error("path {0} has no hops")]
    EmptyRoute(PathId),

    /// Node has no router mapping
    #[error("no router for node {0}")]
    UnknownNode(NodeId),

    /// Router has no node mapping
    #[error("no node for router {0}")]
    UnknownRouter(Ipv6Addr),

    /// Interface address could not be resolved to a node
    #[error("cannot resolve interface {0}")]
    UnknownInterface(Ipv6Addr),

    /// Node pair has no active best-effort path
    #[error("no active best-effort path for node pair {0}")]
    NoActivePath(NodePair),

    /// Failed path had no surviving sibling to preserve
    #[error("no surviving path after failure of path {0}")]
    NoSurvivingPath(PathId),

    /// Collaborator failure
    #[error("service error: {0}")]
    Service(#[from] ServiceError),
}

/// Result type alias
pub type Result<T> = std::result::Result<T, ControlError>;
