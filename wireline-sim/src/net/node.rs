//! Node: owner of devices, interface addressing, and the routing table.

use std::collections::HashMap;
use std::net::Ipv4Addr;
use std::time::Duration;

use wireline_core::{Ipv4Mask, Packet};

use crate::net::{DeviceId, NodeId};
use crate::routing::router::GlobalRouter;
use crate::routing::table::RoutingTable;

/// IPv4 configuration of one interface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Ipv4Interface {
    pub(crate) address: Ipv4Addr,
    pub(crate) mask: Ipv4Mask,
}

/// Internal node state.
///
/// A node owns its devices. Interfaces without IPv4 configuration are
/// legal; routing discovery skips them. The presence of a [`GlobalRouter`]
/// aggregate marks the node as a router.
#[derive(Debug)]
pub(crate) struct NodeState {
    #[allow(dead_code)]
    pub(crate) id: NodeId,
    pub(crate) devices: Vec<DeviceId>,
    pub(crate) interfaces: HashMap<DeviceId, Ipv4Interface>,
    pub(crate) received: Vec<(Duration, Packet)>,
    pub(crate) router: Option<GlobalRouter>,
    pub(crate) routing_table: RoutingTable,
}

impl NodeState {
    pub(crate) fn new(id: NodeId) -> Self {
        Self {
            id,
            devices: Vec::new(),
            interfaces: HashMap::new(),
            received: Vec::new(),
            router: None,
            routing_table: RoutingTable::new(),
        }
    }

    /// The device on this node whose interface address is `addr`.
    pub(crate) fn device_with_address(&self, addr: Ipv4Addr) -> Option<DeviceId> {
        self.devices
            .iter()
            .copied()
            .find(|device| {
                self.interfaces
                    .get(device)
                    .is_some_and(|iface| iface.address == addr)
            })
    }

    /// The device on this node directly attached to `network`.
    pub(crate) fn device_on_network(&self, network: Ipv4Addr) -> Option<DeviceId> {
        self.devices.iter().copied().find(|device| {
            self.interfaces
                .get(device)
                .is_some_and(|iface| iface.mask.network(iface.address) == network)
        })
    }
}
