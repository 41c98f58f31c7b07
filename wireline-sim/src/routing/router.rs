//! Per-node router aggregate and router-ID allocation.

use wireline_core::RouterId;

use crate::net::NodeId;
use crate::routing::lsa::{LinkRecord, LinkType, RouterLsa, SpfStatus};
use crate::sim::world::SimInner;

/// Allocator for router identifiers, scoped to one simulation run.
///
/// IDs are handed out densely in creation order starting at `0.0.0.1`,
/// incrementing as a 32-bit integer (so the 256th router is `0.0.1.0`).
#[derive(Debug)]
pub struct RoutingEnvironment {
    next: u32,
}

impl RoutingEnvironment {
    /// Create an allocator whose first ID is `0.0.0.1`.
    pub fn new() -> Self {
        Self { next: 1 }
    }

    /// Allocate the next router ID.
    pub fn allocate_router_id(&mut self) -> RouterId {
        let id = RouterId::from(self.next);
        self.next += 1;
        id
    }
}

impl Default for RoutingEnvironment {
    fn default() -> Self {
        Self::new()
    }
}

/// The routing aggregate of one node.
///
/// Its presence marks the node as a router. The aggregate holds the
/// node's router ID and the advertisements produced by the most recent
/// discovery pass.
#[derive(Debug)]
pub struct GlobalRouter {
    router_id: RouterId,
    metric: u32,
    pub(crate) lsas: Vec<RouterLsa>,
}

impl GlobalRouter {
    pub(crate) fn new(router_id: RouterId) -> Self {
        Self {
            router_id,
            metric: 1,
            lsas: Vec::new(),
        }
    }

    /// The router ID allocated to this router.
    pub fn router_id(&self) -> RouterId {
        self.router_id
    }

    /// The metric advertised on this router's links (default 1).
    pub fn metric(&self) -> u32 {
        self.metric
    }

    /// Override the advertised link metric for subsequent discovery passes.
    pub fn set_metric(&mut self, metric: u32) {
        self.metric = metric;
    }

    /// The number of advertisements from the last discovery pass.
    pub fn num_lsas(&self) -> usize {
        self.lsas.len()
    }

    /// The `n`-th advertisement, in insertion order.
    pub fn lsa(&self, n: usize) -> Option<&RouterLsa> {
        self.lsas.get(n)
    }
}

/// Rebuild a node's advertisements by walking its attached channels.
///
/// For every device: an unattached channel or an unconfigured interface
/// skips the device; a channel whose endpoint count is not two is skipped
/// with a trace; a peer that carries a router aggregate contributes a
/// point-to-point record (link ID = neighbor's router ID, link data = the
/// local interface address); every surviving interface contributes a
/// stub-network record for its subnet. Returns the advertisement count.
pub(crate) fn discover_lsas(inner: &mut SimInner, node_id: NodeId) -> usize {
    let Some((router_id, metric)) = inner
        .nodes
        .get(&node_id)
        .and_then(|node| node.router.as_ref())
        .map(|router| (router.router_id(), router.metric()))
    else {
        return 0;
    };

    let devices = inner
        .nodes
        .get(&node_id)
        .expect("node exists")
        .devices
        .clone();

    let mut lsa = RouterLsa::new(SpfStatus::NotExplored, router_id, router_id);
    for device_id in devices {
        let device = inner.devices.get(&device_id).expect("unknown device");
        let Some(channel_id) = device.channel else {
            tracing::debug!(device = device_id.0, "device has no channel, skipping");
            continue;
        };
        let Some(iface) = inner
            .nodes
            .get(&node_id)
            .expect("node exists")
            .interfaces
            .get(&device_id)
            .copied()
        else {
            tracing::debug!(device = device_id.0, "interface has no IPv4, skipping");
            continue;
        };
        let channel = inner.channels.get(&channel_id).expect("unknown channel");
        if channel.attached_count() != 2 {
            tracing::warn!(
                channel = channel_id.0,
                attached = channel.attached_count(),
                "channel with unexpected endpoint count, skipping device"
            );
            continue;
        }
        let peer_device = channel
            .peer_of(device_id)
            .expect("complete channel has a peer");
        let peer_node = inner
            .devices
            .get(&peer_device)
            .expect("unknown device")
            .node;
        let peer_router = inner
            .nodes
            .get(&peer_node)
            .expect("node exists")
            .router
            .as_ref()
            .map(|router| router.router_id());

        if let Some(peer_id) = peer_router {
            lsa.add_link_record(LinkRecord::new(
                LinkType::PointToPoint,
                peer_id.as_ipv4(),
                iface.address,
                metric,
            ));
        }
        lsa.add_link_record(LinkRecord::new(
            LinkType::StubNetwork,
            iface.mask.network(iface.address),
            iface.mask.as_ipv4(),
            metric,
        ));
    }

    tracing::debug!(router = %router_id, records = lsa.num_link_records(), "discovered LSA");
    let router = inner
        .nodes
        .get_mut(&node_id)
        .expect("node exists")
        .router
        .as_mut()
        .expect("router checked above");
    router.lsas.clear();
    router.lsas.push(lsa);
    router.num_lsas()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    #[test]
    fn test_allocation_is_dense_and_monotonic() {
        let mut env = RoutingEnvironment::new();
        assert_eq!(env.allocate_router_id(), RouterId::from(1));
        assert_eq!(env.allocate_router_id(), RouterId::from(2));
        assert_eq!(env.allocate_router_id(), RouterId::from(3));
    }

    #[test]
    fn test_first_id_is_dot_one() {
        let mut env = RoutingEnvironment::new();
        assert_eq!(
            env.allocate_router_id().as_ipv4(),
            Ipv4Addr::new(0, 0, 0, 1)
        );
    }
}
