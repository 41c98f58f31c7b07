//! Core simulation world and coordination logic.
//!
//! `SimWorld` owns all mutable simulation state — the virtual clock, the
//! event queue, and the topology arenas — behind a single `Rc<RefCell>`.
//! Devices, channels, and nodes are referenced by ID, which keeps the
//! device/channel cycles of the topology graph out of the ownership
//! system entirely.

use std::cell::RefCell;
use std::collections::HashMap;
use std::net::Ipv4Addr;
use std::rc::Rc;
use std::time::Duration;

use wireline_core::{DataRate, Ipv4Mask, MacAddress, Packet, RouterId};

use crate::error::{SimulationError, SimulationResult};
use crate::net::channel::ChannelState;
use crate::net::device::{self, DeviceState, DeviceStats, RxCallback};
use crate::net::node::{Ipv4Interface, NodeState};
use crate::net::queue::{DropTailQueue, QueueStats};
use crate::net::{ChannelId, DeviceId, LinkConfig, NodeId};
use crate::routing::lsa::RouterLsa;
use crate::routing::router::{self, GlobalRouter, RoutingEnvironment};
use crate::routing::table::{RouteEntry, RoutingTable};
use crate::sim::events::{Event, EventQueue, ScheduledEvent};

/// Internal simulation state holder.
#[derive(Debug)]
pub(crate) struct SimInner {
    pub(crate) current_time: Duration,
    pub(crate) event_queue: EventQueue,
    pub(crate) next_sequence: u64,
    pub(crate) events_processed: u64,

    // Topology arenas
    pub(crate) nodes: HashMap<NodeId, NodeState>,
    pub(crate) devices: HashMap<DeviceId, DeviceState>,
    pub(crate) channels: HashMap<ChannelId, ChannelState>,
    pub(crate) next_node_id: u64,
    pub(crate) next_device_id: u64,
    pub(crate) next_channel_id: u64,

    // Router-ID allocation, scoped to this run
    pub(crate) routing_env: RoutingEnvironment,

    // Receive traces collected during dispatch, fired after the borrow ends
    pub(crate) fired_rx: Vec<(DeviceId, Duration, Packet)>,
}

impl SimInner {
    fn new() -> Self {
        Self {
            current_time: Duration::ZERO,
            event_queue: EventQueue::new(),
            next_sequence: 0,
            events_processed: 0,
            nodes: HashMap::new(),
            devices: HashMap::new(),
            channels: HashMap::new(),
            next_node_id: 0,
            next_device_id: 0,
            next_channel_id: 0,
            routing_env: RoutingEnvironment::new(),
            fired_rx: Vec::new(),
        }
    }
}

/// Schedule an event to fire `delay` after the current simulation time.
///
/// The sequence number is assigned here, so events scheduled at the same
/// virtual time fire in the order they were scheduled.
pub(crate) fn schedule(inner: &mut SimInner, event: Event, delay: Duration) {
    let time = inner.current_time + delay;
    let sequence = inner.next_sequence;
    inner.next_sequence += 1;
    inner.event_queue.schedule(ScheduledEvent::new(time, event, sequence));
}

/// The central simulation coordinator that manages time and event processing.
///
/// `SimWorld` provides the main interface for building a topology, sending
/// packets, and advancing simulation time. All state lives behind a single
/// shared handle, so the world can be passed around freely.
#[derive(Debug, Clone)]
pub struct SimWorld {
    inner: Rc<RefCell<SimInner>>,
}

impl SimWorld {
    /// Creates a new, empty simulation world at time zero.
    pub fn new() -> Self {
        Self {
            inner: Rc::new(RefCell::new(SimInner::new())),
        }
    }

    // =========================================================================
    // Clock and event loop
    // =========================================================================

    /// Returns the current simulation time.
    pub fn now(&self) -> Duration {
        self.inner.borrow().current_time
    }

    /// Returns the current simulation time (alias of [`now`](Self::now)).
    pub fn current_time(&self) -> Duration {
        self.now()
    }

    /// Processes the next scheduled event and advances time.
    ///
    /// Returns `true` if more events are available for processing,
    /// `false` if this was the last event or if no events are available.
    pub fn step(&mut self) -> bool {
        {
            let mut inner = self.inner.borrow_mut();
            let Some(scheduled) = inner.event_queue.pop_earliest() else {
                return false;
            };
            // Advance logical time to the event timestamp
            inner.current_time = scheduled.time();
            inner.events_processed += 1;
            Self::process_event(&mut inner, scheduled.into_event());
        }
        self.flush_rx_traces();
        !self.inner.borrow().event_queue.is_empty()
    }

    /// Processes all scheduled events until the queue is empty.
    pub fn run_until_empty(&mut self) {
        while self.step() {}
    }

    /// Schedules an event to execute after the specified delay from the
    /// current time.
    pub fn schedule_event(&self, event: Event, delay: Duration) {
        let mut inner = self.inner.borrow_mut();
        schedule(&mut inner, event, delay);
    }

    /// Schedules an event to execute at the specified absolute time.
    pub fn schedule_event_at(&self, event: Event, time: Duration) {
        let mut inner = self.inner.borrow_mut();
        let sequence = inner.next_sequence;
        inner.next_sequence += 1;
        inner
            .event_queue
            .schedule(ScheduledEvent::new(time, event, sequence));
    }

    /// Returns `true` if there are events waiting to be processed.
    pub fn has_pending_events(&self) -> bool {
        !self.inner.borrow().event_queue.is_empty()
    }

    /// Returns the number of events waiting to be processed.
    pub fn pending_event_count(&self) -> usize {
        self.inner.borrow().event_queue.len()
    }

    /// Returns the number of events processed so far.
    pub fn events_processed(&self) -> u64 {
        self.inner.borrow().events_processed
    }

    fn process_event(inner: &mut SimInner, event: Event) {
        tracing::trace!(at = ?inner.current_time, ?event, "dispatch");
        match event {
            Event::TransmitComplete { device } => device::transmit_complete(inner, device),
            Event::Deliver { device, packet } => device::receive(inner, device, packet),
        }
    }

    /// Invoke receive-trace observers collected during dispatch.
    ///
    /// Observers run with the internal borrow released, so a callback may
    /// inspect the world (but must not mutate the topology mid-flight).
    fn flush_rx_traces(&self) {
        loop {
            let fired = std::mem::take(&mut self.inner.borrow_mut().fired_rx);
            if fired.is_empty() {
                break;
            }
            for (device, time, packet) in fired {
                let observers = self
                    .inner
                    .borrow()
                    .devices
                    .get(&device)
                    .map(|state| state.rx_observers.clone());
                if let Some(observers) = observers {
                    observers.notify(time, &packet);
                }
            }
        }
    }

    // =========================================================================
    // Topology construction
    // =========================================================================

    /// Adds a node to the simulation.
    pub fn add_node(&self) -> NodeId {
        let mut inner = self.inner.borrow_mut();
        let id = NodeId(inner.next_node_id);
        inner.next_node_id += 1;
        inner.nodes.insert(id, NodeState::new(id));
        id
    }

    /// Adds a channel with the given rate and one-way propagation delay.
    pub fn add_channel(&self, data_rate: DataRate, delay: Duration) -> ChannelId {
        let mut inner = self.inner.borrow_mut();
        let id = ChannelId(inner.next_channel_id);
        inner.next_channel_id += 1;
        inner
            .channels
            .insert(id, ChannelState::new(id, data_rate, delay));
        id
    }

    /// Adds a point-to-point device to `node`.
    ///
    /// The device starts detached, link-down, with the default data rate
    /// and a zero interframe gap. It needs a queue and a channel before it
    /// can send.
    pub fn add_device(&self, node: NodeId) -> SimulationResult<DeviceId> {
        let mut inner = self.inner.borrow_mut();
        if !inner.nodes.contains_key(&node) {
            return Err(SimulationError::InvalidState("unknown node".to_string()));
        }
        let id = DeviceId(inner.next_device_id);
        inner.next_device_id += 1;
        inner.devices.insert(id, DeviceState::new(id, node));
        inner
            .nodes
            .get_mut(&node)
            .expect("node checked above")
            .devices
            .push(id);
        Ok(id)
    }

    /// Sets the transmit queue of `device`.
    pub fn add_queue(&self, device: DeviceId, queue: DropTailQueue) -> SimulationResult<()> {
        let mut inner = self.inner.borrow_mut();
        let state = inner
            .devices
            .get_mut(&device)
            .ok_or_else(|| SimulationError::InvalidState("unknown device".to_string()))?;
        state.queue = Some(queue);
        Ok(())
    }

    /// Attaches `device` to `channel`.
    ///
    /// The device adopts the channel's data rate. When the attachment
    /// completes the channel pair, both endpoints are notified link-up.
    pub fn attach(&self, device: DeviceId, channel: ChannelId) -> SimulationResult<()> {
        let mut inner = self.inner.borrow_mut();
        {
            let state = inner
                .devices
                .get(&device)
                .ok_or_else(|| SimulationError::InvalidState("unknown device".to_string()))?;
            if state.channel.is_some() {
                return Err(SimulationError::InvalidState(
                    "device is already attached to a channel".to_string(),
                ));
            }
        }
        let (rate, endpoints) = {
            let state = inner
                .channels
                .get_mut(&channel)
                .ok_or_else(|| SimulationError::InvalidState("unknown channel".to_string()))?;
            if !state.attach(device) {
                return Err(SimulationError::ChannelFull);
            }
            let endpoints = state.is_complete().then_some(state.endpoints);
            (state.data_rate, endpoints)
        };
        {
            let state = inner.devices.get_mut(&device).expect("device checked above");
            state.channel = Some(channel);
            state.data_rate = rate;
        }
        if let Some(endpoints) = endpoints {
            for endpoint in endpoints.into_iter().flatten() {
                let state = inner
                    .devices
                    .get_mut(&endpoint)
                    .expect("attached device exists");
                state.link_up = true;
                tracing::debug!(device = endpoint.0, channel = channel.0, "link up");
            }
        }
        Ok(())
    }

    /// Configures the IPv4 address and mask of `device`'s interface.
    pub fn set_interface(
        &self,
        device: DeviceId,
        address: Ipv4Addr,
        mask: Ipv4Mask,
    ) -> SimulationResult<()> {
        let mut inner = self.inner.borrow_mut();
        let node = inner
            .devices
            .get(&device)
            .ok_or_else(|| SimulationError::InvalidState("unknown device".to_string()))?
            .node;
        inner
            .nodes
            .get_mut(&node)
            .expect("device's node exists")
            .interfaces
            .insert(device, Ipv4Interface { address, mask });
        Ok(())
    }

    /// Builds a complete link between two nodes: one channel, one device
    /// with a queue on each node, both ends attached.
    pub fn install_link(
        &self,
        a: NodeId,
        b: NodeId,
        config: &LinkConfig,
    ) -> SimulationResult<(DeviceId, DeviceId)> {
        let channel = self.add_channel(config.data_rate, config.delay);
        let device_a = self.add_device(a)?;
        let device_b = self.add_device(b)?;
        for device in [device_a, device_b] {
            let queue = match config.queue_capacity {
                Some(capacity) => DropTailQueue::with_capacity(capacity),
                None => DropTailQueue::unbounded(),
            };
            self.add_queue(device, queue)?;
            self.set_interframe_gap(device, config.interframe_gap)?;
            self.attach(device, channel)?;
        }
        Ok((device_a, device_b))
    }

    // =========================================================================
    // Device operations
    // =========================================================================

    /// Hands a packet to `device` for transmission toward `dest`.
    ///
    /// Transmits immediately when the device is idle, queues otherwise.
    /// Returns `false` when the queue drops the packet.
    ///
    /// # Panics
    ///
    /// Panics if the device is unknown, the link is down, or no queue is
    /// attached — all contract violations per the device's send
    /// preconditions.
    pub fn send_to(&self, device: DeviceId, packet: Packet, dest: MacAddress) -> bool {
        let mut inner = self.inner.borrow_mut();
        device::send_to(&mut inner, device, packet, dest)
    }

    /// Sets the data rate used for subsequent transmissions.
    pub fn set_data_rate(&self, device: DeviceId, rate: DataRate) -> SimulationResult<()> {
        self.with_device_mut(device, |state| state.data_rate = rate)
    }

    /// Sets the interframe gap used for subsequent transmissions.
    pub fn set_interframe_gap(&self, device: DeviceId, gap: Duration) -> SimulationResult<()> {
        self.with_device_mut(device, |state| state.interframe_gap = gap)
    }

    /// Registers an observer invoked for every packet `device` receives.
    pub fn on_receive(
        &self,
        device: DeviceId,
        callback: impl FnMut(Duration, &Packet) + 'static,
    ) -> SimulationResult<()> {
        self.with_device_mut(device, |state| {
            let callback: RxCallback = Box::new(callback);
            state.rx_observers.push(callback);
        })
    }

    /// True once the device's channel has both endpoints attached.
    pub fn is_link_up(&self, device: DeviceId) -> bool {
        self.with_device(device, |state| state.link_up)
    }

    /// Point-to-point devices never need address resolution.
    pub fn needs_arp(&self, device: DeviceId) -> bool {
        self.with_device(device, |state| state.needs_arp())
    }

    /// True for every point-to-point device.
    pub fn is_point_to_point(&self, device: DeviceId) -> bool {
        self.with_device(device, |state| state.point_to_point)
    }

    /// True when the device accepts multicast.
    pub fn is_multicast(&self, device: DeviceId) -> bool {
        self.with_device(device, |state| state.multicast)
    }

    /// The device's hardware address.
    pub fn device_mac(&self, device: DeviceId) -> MacAddress {
        self.with_device(device, |state| state.mac)
    }

    /// The device's broadcast address, `ff:ff:ff:ff:ff:ff`.
    pub fn broadcast_address(&self, device: DeviceId) -> MacAddress {
        self.with_device(device, |state| state.broadcast)
    }

    /// The device's configured data rate.
    pub fn device_data_rate(&self, device: DeviceId) -> DataRate {
        self.with_device(device, |state| state.data_rate)
    }

    /// Transmit and receive counters for `device`.
    pub fn device_stats(&self, device: DeviceId) -> DeviceStats {
        self.with_device(device, |state| state.stats)
    }

    /// Queue counters for `device`, if a queue is attached.
    pub fn queue_stats(&self, device: DeviceId) -> Option<QueueStats> {
        self.with_device(device, |state| state.queue.as_ref().map(DropTailQueue::stats))
    }

    /// The IPv4 address and mask of `device`'s interface, if configured.
    pub fn interface(&self, device: DeviceId) -> Option<(Ipv4Addr, Ipv4Mask)> {
        let inner = self.inner.borrow();
        let node = inner.devices.get(&device)?.node;
        inner
            .nodes
            .get(&node)?
            .interfaces
            .get(&device)
            .map(|iface| (iface.address, iface.mask))
    }

    // =========================================================================
    // Channel accessors
    // =========================================================================

    /// The data rate published by `channel`.
    pub fn channel_data_rate(&self, channel: ChannelId) -> DataRate {
        self.with_channel(channel, |state| state.data_rate)
    }

    /// The propagation delay published by `channel`.
    pub fn channel_delay(&self, channel: ChannelId) -> Duration {
        self.with_channel(channel, |state| state.delay)
    }

    /// The number of devices attached to `channel` (0, 1, or 2).
    pub fn channel_attached_count(&self, channel: ChannelId) -> usize {
        self.with_channel(channel, |state| state.attached_count())
    }

    // =========================================================================
    // Node accessors
    // =========================================================================

    /// All node IDs, ascending.
    pub fn node_ids(&self) -> Vec<NodeId> {
        let mut ids: Vec<NodeId> = self.inner.borrow().nodes.keys().copied().collect();
        ids.sort();
        ids
    }

    /// The devices owned by `node`, in creation order.
    pub fn node_devices(&self, node: NodeId) -> Vec<DeviceId> {
        self.inner
            .borrow()
            .nodes
            .get(&node)
            .map(|state| state.devices.clone())
            .unwrap_or_default()
    }

    /// The packets `node` has received, with arrival times.
    pub fn received_packets(&self, node: NodeId) -> Vec<(Duration, Packet)> {
        self.inner
            .borrow()
            .nodes
            .get(&node)
            .map(|state| state.received.clone())
            .unwrap_or_default()
    }

    /// A copy of `node`'s forwarding table.
    pub fn routing_table(&self, node: NodeId) -> RoutingTable {
        self.inner
            .borrow()
            .nodes
            .get(&node)
            .map(|state| state.routing_table.clone())
            .unwrap_or_default()
    }

    // =========================================================================
    // Routing
    // =========================================================================

    /// Aggregates a router onto `node`, allocating its router ID.
    ///
    /// The presence of the aggregate marks the node as a router during
    /// database construction.
    pub fn add_global_router(&self, node: NodeId) -> SimulationResult<RouterId> {
        let mut inner = self.inner.borrow_mut();
        if inner
            .nodes
            .get(&node)
            .ok_or_else(|| SimulationError::InvalidState("unknown node".to_string()))?
            .router
            .is_some()
        {
            return Err(SimulationError::InvalidState(
                "node already has a router".to_string(),
            ));
        }
        let id = inner.routing_env.allocate_router_id();
        inner
            .nodes
            .get_mut(&node)
            .expect("node checked above")
            .router = Some(GlobalRouter::new(id));
        tracing::debug!(node = node.0, router = %id, "router aggregated");
        Ok(id)
    }

    /// The router ID of `node`, if it carries a router aggregate.
    pub fn router_id(&self, node: NodeId) -> Option<RouterId> {
        self.inner
            .borrow()
            .nodes
            .get(&node)?
            .router
            .as_ref()
            .map(GlobalRouter::router_id)
    }

    /// Overrides the link metric `node`'s router advertises.
    pub fn set_router_metric(&self, node: NodeId, metric: u32) -> SimulationResult<()> {
        let mut inner = self.inner.borrow_mut();
        let router = inner
            .nodes
            .get_mut(&node)
            .and_then(|state| state.router.as_mut())
            .ok_or_else(|| SimulationError::InvalidState("node has no router".to_string()))?;
        router.set_metric(metric);
        Ok(())
    }

    /// Rebuilds `node`'s advertisements by walking its attached channels.
    ///
    /// Returns the number of advertisements; zero when the node carries no
    /// router aggregate.
    pub fn discover_lsas(&self, node: NodeId) -> usize {
        let mut inner = self.inner.borrow_mut();
        router::discover_lsas(&mut inner, node)
    }

    /// The number of advertisements from `node`'s last discovery pass.
    pub fn num_lsas(&self, node: NodeId) -> usize {
        self.inner
            .borrow()
            .nodes
            .get(&node)
            .and_then(|state| state.router.as_ref())
            .map(GlobalRouter::num_lsas)
            .unwrap_or(0)
    }

    /// A copy of the `n`-th advertisement of `node`, in insertion order.
    pub fn router_lsa(&self, node: NodeId, n: usize) -> Option<RouterLsa> {
        self.inner
            .borrow()
            .nodes
            .get(&node)?
            .router
            .as_ref()?
            .lsa(n)
            .cloned()
    }

    pub(crate) fn clear_routing_table(&self, node: NodeId) {
        if let Some(state) = self.inner.borrow_mut().nodes.get_mut(&node) {
            state.routing_table.clear();
        }
    }

    pub(crate) fn add_route(&self, node: NodeId, entry: RouteEntry) {
        if let Some(state) = self.inner.borrow_mut().nodes.get_mut(&node) {
            tracing::trace!(node = node.0, ?entry, "route installed");
            state.routing_table.add_route(entry);
        }
    }

    pub(crate) fn device_with_address(&self, node: NodeId, addr: Ipv4Addr) -> Option<DeviceId> {
        self.inner
            .borrow()
            .nodes
            .get(&node)?
            .device_with_address(addr)
    }

    pub(crate) fn device_on_network(&self, node: NodeId, network: Ipv4Addr) -> Option<DeviceId> {
        self.inner
            .borrow()
            .nodes
            .get(&node)?
            .device_on_network(network)
    }

    // =========================================================================
    // Internal helpers
    // =========================================================================

    fn with_device<R>(&self, device: DeviceId, f: impl FnOnce(&DeviceState) -> R) -> R {
        let inner = self.inner.borrow();
        f(inner.devices.get(&device).expect("unknown device"))
    }

    fn with_device_mut(
        &self,
        device: DeviceId,
        f: impl FnOnce(&mut DeviceState),
    ) -> SimulationResult<()> {
        let mut inner = self.inner.borrow_mut();
        let state = inner
            .devices
            .get_mut(&device)
            .ok_or_else(|| SimulationError::InvalidState("unknown device".to_string()))?;
        f(state);
        Ok(())
    }

    fn with_channel<R>(&self, channel: ChannelId, f: impl FnOnce(&ChannelState) -> R) -> R {
        let inner = self.inner.borrow();
        f(inner.channels.get(&channel).expect("unknown channel"))
    }
}

impl Default for SimWorld {
    fn default() -> Self {
        Self::new()
    }
}
