//! Shortest-path-first computation over the link-state database.
//!
//! Implements the router-vertex half of RFC 2328 §16.1: a candidate list
//! keyed by distance with an ascending router-ID tie-break, a two-way
//! check before any edge is admitted, and equal-cost parents recorded one
//! per equal-cost edge. Stub networks join the finished tree as terminal
//! leaf vertices. The vertex arena lives for one computation only and is
//! never reused across recomputations.

use std::cmp::Ordering;
use std::collections::{BTreeMap, BinaryHeap, HashMap};
use std::net::Ipv4Addr;

use wireline_core::{Ipv4Mask, RouterId};

use crate::routing::lsa::{LinkRecord, RouterLsa, SpfStatus};
use crate::routing::manager::Lsdb;

/// The kind of vertex in a shortest-path tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VertexType {
    /// A router, backed by its advertisement.
    Router,
    /// A stub network, attached as a terminal leaf.
    Network,
}

/// One resolved first hop from the root toward a vertex.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpfNextHop {
    /// The root's interface address on the first-hop link.
    pub out_if: Ipv4Addr,
    /// The neighbor's interface address on that link.
    pub gateway: Ipv4Addr,
}

/// A vertex in one shortest-path computation.
#[derive(Debug, Clone)]
pub struct SpfVertex {
    vertex_type: VertexType,
    vertex_id: Ipv4Addr,
    mask: Option<Ipv4Mask>,
    lsa: Option<RouterLsa>,
    distance: u32,
    parents: Vec<usize>,
    children: Vec<usize>,
    next_hops: Vec<SpfNextHop>,
}

impl SpfVertex {
    /// Router or network.
    pub fn vertex_type(&self) -> VertexType {
        self.vertex_type
    }

    /// Router ID or network address, by vertex type.
    pub fn vertex_id(&self) -> Ipv4Addr {
        self.vertex_id
    }

    /// The network mask; present on network vertices.
    pub fn mask(&self) -> Option<Ipv4Mask> {
        self.mask
    }

    /// The advertisement backing a router vertex.
    pub fn lsa(&self) -> Option<&RouterLsa> {
        self.lsa.as_ref()
    }

    /// Cumulative metric from the root.
    pub fn distance(&self) -> u32 {
        self.distance
    }

    /// Indices of this vertex's parents; one entry per equal-cost edge.
    pub fn parents(&self) -> &[usize] {
        &self.parents
    }

    /// Indices of this vertex's children in the finished tree.
    pub fn children(&self) -> &[usize] {
        &self.children
    }

    /// First hops from the root; empty on the root and its own networks.
    pub fn next_hops(&self) -> &[SpfNextHop] {
        &self.next_hops
    }

    fn status(&self) -> Option<SpfStatus> {
        self.lsa.as_ref().map(|lsa| lsa.status)
    }
}

/// The result of one rooted shortest-path computation.
#[derive(Debug, Clone)]
pub struct SpfTree {
    root: RouterId,
    vertices: Vec<SpfVertex>,
    router_index: HashMap<Ipv4Addr, usize>,
}

impl SpfTree {
    /// The router this tree is rooted at.
    pub fn root(&self) -> RouterId {
        self.root
    }

    /// All vertices; index 0 is the root.
    pub fn vertices(&self) -> &[SpfVertex] {
        &self.vertices
    }

    /// The vertex of a given router, if it is reachable.
    pub fn router_vertex(&self, id: RouterId) -> Option<&SpfVertex> {
        self.router_index
            .get(&id.as_ipv4())
            .map(|&index| &self.vertices[index])
    }

    /// Shortest-path distance to a router, if reachable.
    pub fn distance_to_router(&self, id: RouterId) -> Option<u32> {
        self.router_vertex(id).map(SpfVertex::distance)
    }
}

/// Candidate-list entry. The heap is a max-heap, so the ordering is
/// reversed: lowest distance first, then ascending vertex ID.
#[derive(Debug, PartialEq, Eq)]
struct Candidate {
    distance: u32,
    vertex_id: Ipv4Addr,
    index: usize,
}

impl Ord for Candidate {
    fn cmp(&self, other: &Self) -> Ordering {
        match other.distance.cmp(&self.distance) {
            Ordering::Equal => other.vertex_id.cmp(&self.vertex_id),
            ordering => ordering,
        }
    }
}

impl PartialOrd for Candidate {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Compute the shortest-path tree rooted at `root`.
///
/// Returns `None` when the database holds no advertisement for the root.
pub fn calculate(lsdb: &Lsdb, root: RouterId) -> Option<SpfTree> {
    let root_lsa = lsdb.get(root)?;

    let mut root_vertex_lsa = root_lsa.clone();
    root_vertex_lsa.status = SpfStatus::InSpfTree;
    let mut vertices = vec![SpfVertex {
        vertex_type: VertexType::Router,
        vertex_id: root.as_ipv4(),
        mask: None,
        lsa: Some(root_vertex_lsa),
        distance: 0,
        parents: Vec::new(),
        children: Vec::new(),
        next_hops: Vec::new(),
    }];
    let mut router_index = HashMap::from([(root.as_ipv4(), 0)]);
    let mut candidates = BinaryHeap::new();

    let mut current = 0;
    loop {
        relax(
            lsdb,
            &mut vertices,
            &mut router_index,
            &mut candidates,
            current,
        );

        // Extract the closest candidate, skipping entries made stale by a
        // later relaxation.
        let next = loop {
            let Some(candidate) = candidates.pop() else {
                break None;
            };
            let vertex = &vertices[candidate.index];
            if vertex.status() == Some(SpfStatus::Candidate)
                && vertex.distance == candidate.distance
            {
                break Some(candidate.index);
            }
        };
        let Some(index) = next else { break };

        if let Some(lsa) = vertices[index].lsa.as_mut() {
            lsa.status = SpfStatus::InSpfTree;
        }
        let parents = vertices[index].parents.clone();
        for parent in parents {
            vertices[parent].children.push(index);
        }
        tracing::trace!(
            root = %root,
            vertex = %vertices[index].vertex_id,
            distance = vertices[index].distance,
            "vertex joins SPF tree"
        );
        current = index;
    }

    add_stub_leaves(&mut vertices);
    Some(SpfTree {
        root,
        vertices,
        router_index,
    })
}

/// Relax every point-to-point link of the vertex just added to the tree.
fn relax(
    lsdb: &Lsdb,
    vertices: &mut Vec<SpfVertex>,
    router_index: &mut HashMap<Ipv4Addr, usize>,
    candidates: &mut BinaryHeap<Candidate>,
    current: usize,
) {
    let cur_id = vertices[current].vertex_id;
    let cur_distance = vertices[current].distance;
    let cur_lsa = vertices[current].lsa.clone().expect("router vertex has LSA");
    let cur_next_hops = vertices[current].next_hops.clone();

    for record in cur_lsa.point_to_point_records() {
        let neighbor = record.link_id;
        let Some(neighbor_lsa) = lsdb.get(RouterId::new(neighbor)) else {
            tracing::debug!(%neighbor, "neighbor has no advertisement, dropping edge");
            continue;
        };
        if !neighbor_lsa.has_point_to_point_to(cur_id) {
            tracing::debug!(from = %cur_id, to = %neighbor, "link fails two-way check, dropping edge");
            continue;
        }

        let distance = cur_distance + record.metric;
        let next_hops = if current == 0 {
            root_adjacent_next_hops(&cur_lsa, neighbor_lsa, record)
        } else {
            cur_next_hops.clone()
        };

        match router_index.get(&neighbor).copied() {
            None => {
                let mut lsa = neighbor_lsa.clone();
                lsa.status = SpfStatus::Candidate;
                vertices.push(SpfVertex {
                    vertex_type: VertexType::Router,
                    vertex_id: neighbor,
                    mask: None,
                    lsa: Some(lsa),
                    distance,
                    parents: vec![current],
                    children: Vec::new(),
                    next_hops,
                });
                let index = vertices.len() - 1;
                router_index.insert(neighbor, index);
                candidates.push(Candidate {
                    distance,
                    vertex_id: neighbor,
                    index,
                });
            }
            Some(index) => {
                let vertex = &mut vertices[index];
                if vertex.status() == Some(SpfStatus::InSpfTree) {
                    continue;
                }
                if distance < vertex.distance {
                    vertex.distance = distance;
                    vertex.parents = vec![current];
                    vertex.next_hops = next_hops;
                    candidates.push(Candidate {
                        distance,
                        vertex_id: neighbor,
                        index,
                    });
                } else if distance == vertex.distance {
                    // Equal-cost path: record another parent edge.
                    vertex.parents.push(current);
                    for next_hop in next_hops {
                        if !vertex.next_hops.contains(&next_hop) {
                            vertex.next_hops.push(next_hop);
                        }
                    }
                }
            }
        }
    }
}

/// Resolve the first hop for a neighbor directly adjacent to the root.
///
/// The outgoing interface is the link data of the root's own record; the
/// gateway is the link data of the neighbor's reverse record. Parallel
/// links are disambiguated by pairing the two interface addresses through
/// the subnet mask taken from the root's stub record for that interface.
fn root_adjacent_next_hops(
    root_lsa: &RouterLsa,
    neighbor_lsa: &RouterLsa,
    record: &LinkRecord,
) -> Vec<SpfNextHop> {
    let out_if = record.link_data;
    let mask = root_lsa.stub_records().find_map(|stub| {
        let mask = Ipv4Mask::from_ipv4(stub.link_data);
        (mask.network(out_if) == stub.link_id).then_some(mask)
    });

    let root_id = root_lsa.link_state_id.as_ipv4();
    let reverse: Vec<&LinkRecord> = neighbor_lsa
        .point_to_point_records()
        .filter(|reverse| reverse.link_id == root_id)
        .collect();

    let gateway = match mask {
        Some(mask) => reverse
            .iter()
            .find(|reverse| mask.matches(reverse.link_data, out_if))
            .or_else(|| reverse.first())
            .map(|reverse| reverse.link_data),
        None => reverse.first().map(|reverse| reverse.link_data),
    };

    match gateway {
        Some(gateway) => vec![SpfNextHop { out_if, gateway }],
        None => {
            tracing::debug!(%out_if, "no reverse record for next-hop resolution");
            Vec::new()
        }
    }
}

/// Attach each tree router's stub networks as terminal leaf vertices.
///
/// A network advertised by several routers keeps the lowest distance;
/// equal distances merge parents and first hops.
fn add_stub_leaves(vertices: &mut Vec<SpfVertex>) {
    struct StubAccum {
        mask: Ipv4Mask,
        distance: u32,
        parents: Vec<usize>,
        next_hops: Vec<SpfNextHop>,
    }

    let mut stubs: BTreeMap<Ipv4Addr, StubAccum> = BTreeMap::new();
    for index in 0..vertices.len() {
        if vertices[index].status() != Some(SpfStatus::InSpfTree) {
            continue;
        }
        let distance = vertices[index].distance;
        let lsa = vertices[index].lsa.clone().expect("router vertex has LSA");
        let next_hops = vertices[index].next_hops.clone();
        for stub in lsa.stub_records() {
            let network = stub.link_id;
            let mask = Ipv4Mask::from_ipv4(stub.link_data);
            let stub_distance = distance + stub.metric;
            match stubs.get_mut(&network) {
                None => {
                    stubs.insert(
                        network,
                        StubAccum {
                            mask,
                            distance: stub_distance,
                            parents: vec![index],
                            next_hops: next_hops.clone(),
                        },
                    );
                }
                Some(accum) => {
                    if stub_distance < accum.distance {
                        accum.mask = mask;
                        accum.distance = stub_distance;
                        accum.parents = vec![index];
                        accum.next_hops = next_hops.clone();
                    } else if stub_distance == accum.distance {
                        accum.parents.push(index);
                        for next_hop in &next_hops {
                            if !accum.next_hops.contains(next_hop) {
                                accum.next_hops.push(*next_hop);
                            }
                        }
                    }
                }
            }
        }
    }

    for (network, accum) in stubs {
        vertices.push(SpfVertex {
            vertex_type: VertexType::Network,
            vertex_id: network,
            mask: Some(accum.mask),
            lsa: None,
            distance: accum.distance,
            parents: accum.parents.clone(),
            children: Vec::new(),
            next_hops: accum.next_hops,
        });
        let index = vertices.len() - 1;
        for parent in accum.parents {
            vertices[parent].children.push(index);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routing::lsa::LinkType;

    fn p2p(link_id: RouterId, local: Ipv4Addr) -> LinkRecord {
        LinkRecord::new(LinkType::PointToPoint, link_id.as_ipv4(), local, 1)
    }

    fn stub(network: Ipv4Addr) -> LinkRecord {
        LinkRecord::new(
            LinkType::StubNetwork,
            network,
            Ipv4Addr::new(255, 255, 255, 0),
            1,
        )
    }

    fn lsa_for(id: u32, records: Vec<LinkRecord>) -> RouterLsa {
        let router = RouterId::from(id);
        let mut lsa = RouterLsa::new(SpfStatus::NotExplored, router, router);
        for record in records {
            lsa.add_link_record(record);
        }
        lsa
    }

    /// R1 - R2 - R3 in a line, one subnet per link.
    fn linear_lsdb() -> Lsdb {
        let r1 = RouterId::from(1);
        let r2 = RouterId::from(2);
        let r3 = RouterId::from(3);
        let mut lsdb = Lsdb::new();
        lsdb.insert(lsa_for(
            1,
            vec![
                p2p(r2, Ipv4Addr::new(10, 1, 1, 1)),
                stub(Ipv4Addr::new(10, 1, 1, 0)),
            ],
        ));
        lsdb.insert(lsa_for(
            2,
            vec![
                p2p(r1, Ipv4Addr::new(10, 1, 1, 2)),
                stub(Ipv4Addr::new(10, 1, 1, 0)),
                p2p(r3, Ipv4Addr::new(10, 1, 2, 1)),
                stub(Ipv4Addr::new(10, 1, 2, 0)),
            ],
        ));
        lsdb.insert(lsa_for(
            3,
            vec![
                p2p(r2, Ipv4Addr::new(10, 1, 2, 2)),
                stub(Ipv4Addr::new(10, 1, 2, 0)),
            ],
        ));
        lsdb
    }

    #[test]
    fn test_linear_distances() {
        let tree = calculate(&linear_lsdb(), RouterId::from(1)).expect("root in lsdb");
        assert_eq!(tree.distance_to_router(RouterId::from(1)), Some(0));
        assert_eq!(tree.distance_to_router(RouterId::from(2)), Some(1));
        assert_eq!(tree.distance_to_router(RouterId::from(3)), Some(2));
    }

    #[test]
    fn test_next_hop_propagates_from_first_hop() {
        let tree = calculate(&linear_lsdb(), RouterId::from(1)).expect("root in lsdb");
        let r3 = tree.router_vertex(RouterId::from(3)).expect("reachable");
        assert_eq!(
            r3.next_hops(),
            &[SpfNextHop {
                out_if: Ipv4Addr::new(10, 1, 1, 1),
                gateway: Ipv4Addr::new(10, 1, 1, 2),
            }]
        );
    }

    #[test]
    fn test_far_stub_distance() {
        let tree = calculate(&linear_lsdb(), RouterId::from(1)).expect("root in lsdb");
        let far = tree
            .vertices()
            .iter()
            .find(|vertex| {
                vertex.vertex_type() == VertexType::Network
                    && vertex.vertex_id() == Ipv4Addr::new(10, 1, 2, 0)
            })
            .expect("stub vertex");
        // Advertised by R2 at 1+1 and by R3 at 2+1; the lower wins.
        assert_eq!(far.distance(), 2);
    }

    #[test]
    fn test_one_way_link_is_dropped() {
        let r1 = RouterId::from(1);
        let r2 = RouterId::from(2);
        let mut lsdb = Lsdb::new();
        // R1 claims a link to R2, but R2 does not advertise one back.
        lsdb.insert(lsa_for(
            1,
            vec![
                p2p(r2, Ipv4Addr::new(10, 1, 1, 1)),
                stub(Ipv4Addr::new(10, 1, 1, 0)),
            ],
        ));
        lsdb.insert(lsa_for(2, vec![stub(Ipv4Addr::new(10, 1, 1, 0))]));

        let tree = calculate(&lsdb, r1).expect("root in lsdb");
        assert!(tree.router_vertex(r2).is_none());
    }

    #[test]
    fn test_unknown_neighbor_is_ignored() {
        let r1 = RouterId::from(1);
        let mut lsdb = Lsdb::new();
        lsdb.insert(lsa_for(
            1,
            vec![
                p2p(RouterId::from(9), Ipv4Addr::new(10, 1, 1, 1)),
                stub(Ipv4Addr::new(10, 1, 1, 0)),
            ],
        ));

        let tree = calculate(&lsdb, r1).expect("root in lsdb");
        // Only the root and its own stub remain.
        assert_eq!(tree.vertices().len(), 2);
    }

    #[test]
    fn test_parallel_links_record_two_parents() {
        let r1 = RouterId::from(1);
        let r2 = RouterId::from(2);
        let mut lsdb = Lsdb::new();
        lsdb.insert(lsa_for(
            1,
            vec![
                p2p(r2, Ipv4Addr::new(10, 1, 1, 1)),
                stub(Ipv4Addr::new(10, 1, 1, 0)),
                p2p(r2, Ipv4Addr::new(10, 1, 2, 1)),
                stub(Ipv4Addr::new(10, 1, 2, 0)),
            ],
        ));
        lsdb.insert(lsa_for(
            2,
            vec![
                p2p(r1, Ipv4Addr::new(10, 1, 1, 2)),
                stub(Ipv4Addr::new(10, 1, 1, 0)),
                p2p(r1, Ipv4Addr::new(10, 1, 2, 2)),
                stub(Ipv4Addr::new(10, 1, 2, 0)),
            ],
        ));

        let tree = calculate(&lsdb, r1).expect("root in lsdb");
        let r2_vertex = tree.router_vertex(r2).expect("reachable");
        assert_eq!(r2_vertex.distance(), 1);
        assert_eq!(r2_vertex.parents().len(), 2);
        // Each parallel link pairs its own interface addresses.
        assert_eq!(
            r2_vertex.next_hops(),
            &[
                SpfNextHop {
                    out_if: Ipv4Addr::new(10, 1, 1, 1),
                    gateway: Ipv4Addr::new(10, 1, 1, 2),
                },
                SpfNextHop {
                    out_if: Ipv4Addr::new(10, 1, 2, 1),
                    gateway: Ipv4Addr::new(10, 1, 2, 2),
                },
            ]
        );
    }
}
