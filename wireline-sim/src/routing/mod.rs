//! Global link-state routing.
//!
//! A per-node [`GlobalRouter`] aggregate discovers link records by walking
//! the node's attached channels; the [`GlobalRouteManager`] gathers every
//! router's advertisements into an [`Lsdb`] and runs a shortest-path-first
//! computation per router (RFC 2328 §16.1) to populate forwarding tables.
//! The pipeline runs against a static topology snapshot and rebuilds from
//! scratch on demand.

pub mod lsa;
pub mod manager;
pub mod router;
pub mod spf;
pub mod table;

pub use lsa::{LinkRecord, LinkType, RouterLsa, SpfStatus};
pub use manager::{GlobalRouteManager, Lsdb};
pub use router::{GlobalRouter, RoutingEnvironment};
pub use spf::{SpfNextHop, SpfTree, SpfVertex, VertexType};
pub use table::{RouteEntry, RoutingTable};
