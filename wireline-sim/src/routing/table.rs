//! Per-node forwarding table.

use std::net::Ipv4Addr;

use wireline_core::Ipv4Mask;

use crate::net::DeviceId;

/// One installed route.
///
/// A route with no gateway is directly connected: the destination network
/// is on the interface itself. Equal-cost multipath shows up as several
/// entries for the same prefix with different gateways.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RouteEntry {
    /// Destination network address (host bits zero).
    pub network: Ipv4Addr,
    /// Destination network mask.
    pub mask: Ipv4Mask,
    /// Next-hop interface address, or `None` for a connected route.
    pub gateway: Option<Ipv4Addr>,
    /// Outgoing device on this node.
    pub device: DeviceId,
    /// Cumulative path cost to the destination network.
    pub metric: u32,
}

/// An ordered collection of routes with best-match lookup.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoutingTable {
    entries: Vec<RouteEntry>,
}

impl RoutingTable {
    /// Create an empty table.
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Append a route.
    pub fn add_route(&mut self, entry: RouteEntry) {
        self.entries.push(entry);
    }

    /// Remove every route.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// The number of installed routes.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True if no routes are installed.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate over the installed routes.
    pub fn iter(&self) -> impl Iterator<Item = &RouteEntry> {
        self.entries.iter()
    }

    /// The best route toward `target`: longest prefix, then lowest metric.
    pub fn find_best_route(&self, target: Ipv4Addr) -> Option<&RouteEntry> {
        let mut best: Option<&RouteEntry> = None;
        for entry in &self.entries {
            if entry.mask.network(target) != entry.network {
                continue;
            }
            let better = match best {
                None => true,
                Some(current) => {
                    entry.mask.prefix_len() > current.mask.prefix_len()
                        || (entry.mask.prefix_len() == current.mask.prefix_len()
                            && entry.metric < current.metric)
                }
            };
            if better {
                best = Some(entry);
            }
        }
        best
    }
}
