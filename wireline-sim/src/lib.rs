//! # wireline-sim
//!
//! A discrete-event simulator for point-to-point links with a global
//! link-state routing core.
//!
//! ## Core Components
//!
//! - [`SimWorld`]: the simulation runtime managing virtual time, the event
//!   queue, and the topology (nodes, devices, channels)
//! - The device layer: a UART-like transmitter state machine per endpoint,
//!   a drop-tail transmit queue, and a two-endpoint channel with rate and
//!   propagation delay
//! - The routing core: per-router advertisement discovery, a link-state
//!   database, and a per-root shortest-path computation (RFC 2328 §16.1)
//!   that installs forwarding tables
//!
//! Event ordering is deterministic: events fire in time order, and events
//! at the same virtual time fire in scheduling order.
//!
//! ## Quick Start
//!
//! ```
//! use std::time::Duration;
//! use wireline_sim::{LinkConfig, MacAddress, Packet, SimWorld};
//!
//! let mut sim = SimWorld::new();
//! let a = sim.add_node();
//! let b = sim.add_node();
//!
//! let config = LinkConfig {
//!     data_rate: "10Mb/s".parse().expect("valid rate"),
//!     delay: Duration::from_millis(2),
//!     ..LinkConfig::default()
//! };
//! let (dev_a, _dev_b) = sim.install_link(a, b, &config).expect("link");
//!
//! sim.send_to(dev_a, Packet::new(1250), MacAddress::BROADCAST);
//! sim.run_until_empty();
//!
//! // 1ms serialization + 2ms propagation
//! assert_eq!(sim.now(), Duration::from_millis(3));
//! assert_eq!(sim.received_packets(b).len(), 1);
//! ```
//!
//! ## Routing
//!
//! Aggregate a router onto each routing node with
//! [`SimWorld::add_global_router`], then let a [`GlobalRouteManager`]
//! build the database and install routes:
//!
//! ```
//! use wireline_sim::{GlobalRouteManager, LinkConfig, SimWorld};
//! # use std::net::Ipv4Addr;
//! # use wireline_sim::Ipv4Mask;
//!
//! let sim = SimWorld::new();
//! let r1 = sim.add_node();
//! let r2 = sim.add_node();
//! let (d1, d2) = sim.install_link(r1, r2, &LinkConfig::default()).expect("link");
//! # let mask: Ipv4Mask = "/24".parse().expect("mask");
//! sim.set_interface(d1, Ipv4Addr::new(10, 1, 1, 1), mask).expect("iface");
//! sim.set_interface(d2, Ipv4Addr::new(10, 1, 1, 2), mask).expect("iface");
//! sim.add_global_router(r1).expect("router");
//! sim.add_global_router(r2).expect("router");
//!
//! let mut manager = GlobalRouteManager::new();
//! manager.initialize_routes(&sim);
//! assert!(!sim.routing_table(r1).is_empty());
//! ```

#![deny(missing_docs)]
#![deny(clippy::unwrap_used)]

/// Error types and utilities for simulation operations.
pub mod error;

/// The point-to-point device layer.
pub mod net;

/// Global link-state routing.
pub mod routing;

/// Core simulation engine.
pub mod sim;

// Error types
pub use error::{SimulationError, SimulationResult};

// Sim module re-exports
pub use sim::{Event, EventQueue, ScheduledEvent, SimWorld};

// Net module re-exports
pub use net::{
    ChannelId, DeviceId, DeviceStats, DropTailQueue, LinkConfig, NodeId, QueueStats,
};

// Routing module re-exports
pub use routing::{
    GlobalRouteManager, GlobalRouter, LinkRecord, LinkType, Lsdb, RouteEntry, RouterLsa,
    RoutingEnvironment, RoutingTable, SpfNextHop, SpfStatus, SpfTree, SpfVertex, VertexType,
};

// Core value types, re-exported for convenience
pub use wireline_core::{DataRate, Ipv4Mask, MacAddress, Packet, RouterId};
