//! Link-state database and the global route manager.

use std::collections::HashMap;

use wireline_core::RouterId;

use crate::net::NodeId;
use crate::routing::lsa::RouterLsa;
use crate::routing::spf::{self, SpfTree, VertexType};
use crate::routing::table::RouteEntry;
use crate::sim::world::SimWorld;

/// The link-state database: one advertisement per router ID.
///
/// The database owns copies of the advertisements it is given; a second
/// insert for the same router replaces the first.
#[derive(Debug, Default)]
pub struct Lsdb {
    entries: HashMap<RouterId, RouterLsa>,
}

impl Lsdb {
    /// Create an empty database.
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    /// Store an advertisement, keyed by its advertising router.
    pub fn insert(&mut self, lsa: RouterLsa) {
        self.entries.insert(lsa.advertising_router, lsa);
    }

    /// The advertisement of a given router.
    pub fn get(&self, id: RouterId) -> Option<&RouterLsa> {
        self.entries.get(&id)
    }

    /// Drop every advertisement.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// The number of stored advertisements.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True if no advertisements are stored.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// All router IDs with an advertisement, ascending.
    pub fn router_ids(&self) -> Vec<RouterId> {
        let mut ids: Vec<RouterId> = self.entries.keys().copied().collect();
        ids.sort();
        ids
    }
}

/// Builds the link-state database and populates forwarding tables.
///
/// Phase one walks every node, runs discovery on each router, and copies
/// the advertisements into the database. Phase two computes a shortest-path
/// tree per router and installs one route per reachable prefix. Both phases
/// rebuild from scratch on every call, so re-running against an unchanged
/// topology yields identical tables.
#[derive(Debug, Default)]
pub struct GlobalRouteManager {
    lsdb: Lsdb,
    router_nodes: HashMap<RouterId, NodeId>,
}

impl GlobalRouteManager {
    /// Create a manager with an empty database.
    pub fn new() -> Self {
        Self {
            lsdb: Lsdb::new(),
            router_nodes: HashMap::new(),
        }
    }

    /// The current link-state database.
    pub fn lsdb(&self) -> &Lsdb {
        &self.lsdb
    }

    /// Gather advertisements from every router into the database.
    pub fn build_routing_database(&mut self, sim: &SimWorld) {
        self.lsdb.clear();
        self.router_nodes.clear();
        for node in sim.node_ids() {
            if sim.router_id(node).is_none() {
                continue;
            }
            let count = sim.discover_lsas(node);
            for n in 0..count {
                if let Some(lsa) = sim.router_lsa(node, n) {
                    self.router_nodes.insert(lsa.advertising_router, node);
                    self.lsdb.insert(lsa);
                }
            }
        }
        tracing::debug!(advertisements = self.lsdb.len(), "routing database built");
    }

    /// Recompute every router's forwarding table from scratch.
    pub fn initialize_routes(&mut self, sim: &SimWorld) {
        self.build_routing_database(sim);
        for node in sim.node_ids() {
            sim.clear_routing_table(node);
        }
        for root in self.lsdb.router_ids() {
            let Some(&node) = self.router_nodes.get(&root) else {
                continue;
            };
            let Some(tree) = spf::calculate(&self.lsdb, root) else {
                continue;
            };
            self.install_routes(sim, node, &tree);
        }
    }

    /// Compute the shortest-path tree for one router against the current
    /// database. Call [`build_routing_database`](Self::build_routing_database)
    /// first.
    pub fn compute_tree(&self, root: RouterId) -> Option<SpfTree> {
        spf::calculate(&self.lsdb, root)
    }

    /// Install routes for every network vertex of `tree` on `node`.
    fn install_routes(&self, sim: &SimWorld, node: NodeId, tree: &SpfTree) {
        for vertex in tree.vertices() {
            if vertex.vertex_type() != VertexType::Network {
                continue;
            }
            let mask = vertex.mask().expect("network vertex carries a mask");
            if vertex.parents().contains(&0) {
                // Attached to the root itself: a connected route.
                let Some(device) = sim.device_on_network(node, vertex.vertex_id()) else {
                    tracing::debug!(network = %vertex.vertex_id(), "no local interface for connected network");
                    continue;
                };
                sim.add_route(
                    node,
                    RouteEntry {
                        network: vertex.vertex_id(),
                        mask,
                        gateway: None,
                        device,
                        metric: vertex.distance(),
                    },
                );
            } else {
                for next_hop in vertex.next_hops() {
                    let Some(device) = sim.device_with_address(node, next_hop.out_if) else {
                        tracing::debug!(out_if = %next_hop.out_if, "no local interface for next hop");
                        continue;
                    };
                    sim.add_route(
                        node,
                        RouteEntry {
                            network: vertex.vertex_id(),
                            mask,
                            gateway: Some(next_hop.gateway),
                            device,
                            metric: vertex.distance(),
                        },
                    );
                }
            }
        }
    }
}
