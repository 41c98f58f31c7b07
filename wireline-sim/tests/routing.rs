//! Global routing tests: discovery, SPF, and forwarding-table installation.

use std::collections::HashSet;
use std::net::Ipv4Addr;
use std::time::Duration;

use wireline_sim::{
    DeviceId, GlobalRouteManager, Ipv4Mask, LinkConfig, LinkType, NodeId, RouteEntry, RouterId,
    SimWorld,
};

fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

fn slash24() -> Ipv4Mask {
    Ipv4Mask::from_prefix_len(24)
}

/// Join two nodes with a /24 link, `.1` on `a` and `.2` on `b`.
fn link(sim: &SimWorld, a: NodeId, b: NodeId, subnet: [u8; 4]) -> (DeviceId, DeviceId) {
    let config = LinkConfig {
        delay: Duration::from_millis(2),
        ..LinkConfig::default()
    };
    let (dev_a, dev_b) = sim.install_link(a, b, &config).expect("link installs");
    let net = Ipv4Addr::from(subnet);
    let octets = net.octets();
    sim.set_interface(dev_a, Ipv4Addr::new(octets[0], octets[1], octets[2], 1), slash24())
        .expect("interface");
    sim.set_interface(dev_b, Ipv4Addr::new(octets[0], octets[1], octets[2], 2), slash24())
        .expect("interface");
    (dev_a, dev_b)
}

fn route_set(sim: &SimWorld, node: NodeId) -> HashSet<RouteEntry> {
    sim.routing_table(node).iter().copied().collect()
}

/// R1 - R2 - R3 in a line, one /24 per link.
fn linear_topology() -> (SimWorld, [NodeId; 3], [DeviceId; 4]) {
    let sim = SimWorld::new();
    let r1 = sim.add_node();
    let r2 = sim.add_node();
    let r3 = sim.add_node();
    let (d1, d2a) = link(&sim, r1, r2, [10, 1, 1, 0]);
    let (d2b, d3) = link(&sim, r2, r3, [10, 1, 2, 0]);
    for node in [r1, r2, r3] {
        sim.add_global_router(node).expect("router aggregates");
    }
    (sim, [r1, r2, r3], [d1, d2a, d2b, d3])
}

#[test]
fn test_router_ids_are_dense_from_dot_one() {
    init_tracing();
    let (sim, [r1, r2, r3], _) = linear_topology();
    assert_eq!(sim.router_id(r1), Some(RouterId::from(1)));
    assert_eq!(sim.router_id(r2), Some(RouterId::from(2)));
    assert_eq!(sim.router_id(r3), Some(RouterId::from(3)));
    assert_eq!(
        sim.router_id(r1).map(|id| id.as_ipv4()),
        Some(Ipv4Addr::new(0, 0, 0, 1))
    );
}

#[test]
fn test_discovery_emits_one_lsa_with_expected_records() {
    init_tracing();
    let (sim, [_, r2, _], _) = linear_topology();

    assert_eq!(sim.discover_lsas(r2), 1);
    assert_eq!(sim.num_lsas(r2), 1);
    let lsa = sim.router_lsa(r2, 0).expect("advertisement exists");
    assert!(sim.router_lsa(r2, 1).is_none());

    // The middle router: one point-to-point plus one stub per link.
    assert_eq!(lsa.point_to_point_records().count(), 2);
    assert_eq!(lsa.stub_records().count(), 2);
    assert!(lsa.has_point_to_point_to(Ipv4Addr::new(0, 0, 0, 1)));
    assert!(lsa.has_point_to_point_to(Ipv4Addr::new(0, 0, 0, 3)));
}

#[test]
fn test_discovery_without_router_peer_emits_stub_only() {
    init_tracing();
    let sim = SimWorld::new();
    let router = sim.add_node();
    let host = sim.add_node();
    link(&sim, router, host, [192, 168, 7, 0]);
    sim.add_global_router(router).expect("router aggregates");

    sim.discover_lsas(router);
    let lsa = sim.router_lsa(router, 0).expect("advertisement exists");
    assert_eq!(lsa.point_to_point_records().count(), 0);
    assert_eq!(lsa.stub_records().count(), 1);
    let stub = lsa.stub_records().next().expect("stub record");
    assert_eq!(stub.link_type, LinkType::StubNetwork);
    assert_eq!(stub.link_id, Ipv4Addr::new(192, 168, 7, 0));
    assert_eq!(stub.link_data, Ipv4Addr::new(255, 255, 255, 0));
}

#[test]
fn test_unconfigured_interface_is_skipped() {
    init_tracing();
    let sim = SimWorld::new();
    let r1 = sim.add_node();
    let r2 = sim.add_node();
    let config = LinkConfig::default();
    let (d1, _d2) = sim.install_link(r1, r2, &config).expect("link installs");
    // Only R1's side gets an address.
    sim.set_interface(d1, Ipv4Addr::new(10, 1, 1, 1), slash24())
        .expect("interface");
    sim.add_global_router(r1).expect("router");
    sim.add_global_router(r2).expect("router");

    sim.discover_lsas(r2);
    let lsa = sim.router_lsa(r2, 0).expect("advertisement exists");
    assert!(lsa.is_empty());
}

#[test]
fn test_linear_spf_route_via_middle_router() {
    init_tracing();
    let (sim, [r1, _, _], [d1, ..]) = linear_topology();

    let mut manager = GlobalRouteManager::new();
    manager.initialize_routes(&sim);
    assert_eq!(manager.lsdb().len(), 3);

    // R1 reaches the far link's prefix through R2 at distance 2.
    let table = sim.routing_table(r1);
    let far = table
        .find_best_route(Ipv4Addr::new(10, 1, 2, 9))
        .expect("route to far prefix");
    assert_eq!(far.network, Ipv4Addr::new(10, 1, 2, 0));
    assert_eq!(far.gateway, Some(Ipv4Addr::new(10, 1, 1, 2)));
    assert_eq!(far.device, d1);
    assert_eq!(far.metric, 2);

    // R1's own link is a connected route.
    let near = table
        .find_best_route(Ipv4Addr::new(10, 1, 1, 9))
        .expect("connected route");
    assert_eq!(near.gateway, None);
    assert_eq!(near.device, d1);
}

#[test]
fn test_spf_distances_match_shortest_paths() {
    init_tracing();
    let (sim, _, _) = linear_topology();

    let mut manager = GlobalRouteManager::new();
    manager.build_routing_database(&sim);
    let tree = manager
        .compute_tree(RouterId::from(1))
        .expect("root advertised");
    assert_eq!(tree.distance_to_router(RouterId::from(2)), Some(1));
    assert_eq!(tree.distance_to_router(RouterId::from(3)), Some(2));
}

#[test]
fn test_ecmp_parallel_links() {
    init_tracing();
    let sim = SimWorld::new();
    let r1 = sim.add_node();
    let r2 = sim.add_node();
    let r3 = sim.add_node();
    // Two parallel links between R1 and R2, then one to R3.
    link(&sim, r1, r2, [10, 1, 1, 0]);
    link(&sim, r1, r2, [10, 1, 2, 0]);
    link(&sim, r2, r3, [10, 1, 3, 0]);
    for node in [r1, r2, r3] {
        sim.add_global_router(node).expect("router aggregates");
    }

    let mut manager = GlobalRouteManager::new();
    manager.initialize_routes(&sim);

    // Two equal-cost parents recorded for R2.
    let tree = manager
        .compute_tree(RouterId::from(1))
        .expect("root advertised");
    let r2_vertex = tree
        .router_vertex(RouterId::from(2))
        .expect("R2 reachable");
    assert_eq!(r2_vertex.parents().len(), 2);
    assert_eq!(tree.distance_to_router(RouterId::from(3)), Some(2));

    // Both first hops install toward the far prefix.
    let far_routes: Vec<RouteEntry> = sim
        .routing_table(r1)
        .iter()
        .filter(|entry| entry.network == Ipv4Addr::new(10, 1, 3, 0))
        .copied()
        .collect();
    assert_eq!(far_routes.len(), 2);
    let gateways: HashSet<Option<Ipv4Addr>> =
        far_routes.iter().map(|entry| entry.gateway).collect();
    assert_eq!(
        gateways,
        HashSet::from([
            Some(Ipv4Addr::new(10, 1, 1, 2)),
            Some(Ipv4Addr::new(10, 1, 2, 2)),
        ])
    );
    assert!(far_routes.iter().all(|entry| entry.metric == 2));
}

#[test]
fn test_initialize_routes_is_idempotent() {
    init_tracing();
    let (sim, nodes, _) = linear_topology();

    let mut manager = GlobalRouteManager::new();
    manager.initialize_routes(&sim);
    let first: Vec<HashSet<RouteEntry>> =
        nodes.iter().map(|&node| route_set(&sim, node)).collect();
    assert!(first.iter().all(|set| !set.is_empty()));

    manager.initialize_routes(&sim);
    let second: Vec<HashSet<RouteEntry>> =
        nodes.iter().map(|&node| route_set(&sim, node)).collect();
    assert_eq!(first, second);
}

#[test]
fn test_one_way_adjacency_contributes_no_route() {
    init_tracing();
    let sim = SimWorld::new();
    let r1 = sim.add_node();
    let r2 = sim.add_node();
    let config = LinkConfig::default();
    let (d1, _d2) = sim.install_link(r1, r2, &config).expect("link installs");
    // R2's side never gets an address, so R2 cannot advertise back.
    sim.set_interface(d1, Ipv4Addr::new(10, 1, 1, 1), slash24())
        .expect("interface");
    sim.add_global_router(r1).expect("router");
    sim.add_global_router(r2).expect("router");

    let mut manager = GlobalRouteManager::new();
    manager.initialize_routes(&sim);

    // R1 keeps only its own connected route; the one-way edge is dropped.
    let table = sim.routing_table(r1);
    assert!(table.iter().all(|entry| entry.gateway.is_none()));
    let tree = manager
        .compute_tree(RouterId::from(1))
        .expect("root advertised");
    assert!(tree.router_vertex(RouterId::from(2)).is_none());
}

#[test]
fn test_disconnected_router_keeps_self_routes() {
    init_tracing();
    let sim = SimWorld::new();
    let lonely = sim.add_node();
    let host = sim.add_node();
    link(&sim, lonely, host, [172, 16, 0, 0]);
    sim.add_global_router(lonely).expect("router");

    let mut manager = GlobalRouteManager::new();
    manager.initialize_routes(&sim);

    let table = sim.routing_table(lonely);
    assert_eq!(table.len(), 1);
    let entry = table
        .find_best_route(Ipv4Addr::new(172, 16, 0, 42))
        .expect("self route");
    assert_eq!(entry.gateway, None);
    assert_eq!(entry.network, Ipv4Addr::new(172, 16, 0, 0));
}

#[test]
fn test_rerun_after_topology_change_picks_up_new_link() {
    init_tracing();
    let sim = SimWorld::new();
    let r1 = sim.add_node();
    let r2 = sim.add_node();
    let r3 = sim.add_node();
    link(&sim, r1, r2, [10, 1, 1, 0]);
    for node in [r1, r2, r3] {
        sim.add_global_router(node).expect("router aggregates");
    }

    let mut manager = GlobalRouteManager::new();
    manager.initialize_routes(&sim);
    assert!(
        sim.routing_table(r1)
            .find_best_route(Ipv4Addr::new(10, 1, 2, 1))
            .is_none()
    );

    // Grow the topology, then recompute from scratch.
    link(&sim, r2, r3, [10, 1, 2, 0]);
    manager.initialize_routes(&sim);
    let far = sim.routing_table(r1);
    let entry = far
        .find_best_route(Ipv4Addr::new(10, 1, 2, 1))
        .expect("new prefix routed");
    assert_eq!(entry.metric, 2);
}
