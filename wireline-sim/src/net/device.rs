//! Point-to-point net device: the per-endpoint transmitter state machine.

use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use wireline_core::{DataRate, MacAddress, Packet};

use crate::net::queue::DropTailQueue;
use crate::net::{ChannelId, DeviceId, NodeId, channel};
use crate::sim::events::Event;
use crate::sim::world::{self, SimInner};

/// Transmitter state.
///
/// The device models a serial link: at most one packet is on the wire per
/// direction. `Busy` covers the serialization time plus the interframe gap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TxMachineState {
    /// The transmitter is idle and the transmit queue is empty.
    Ready,
    /// A transmission (or its trailing interframe gap) is in progress.
    Busy,
}

/// Per-device packet and byte counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeviceStats {
    /// Packets handed to the channel.
    pub tx_packets: u64,
    /// Bytes handed to the channel.
    pub tx_bytes: u64,
    /// Packets delivered by the channel.
    pub rx_packets: u64,
    /// Bytes delivered by the channel.
    pub rx_bytes: u64,
}

/// Callback invoked for every packet a device receives.
pub type RxCallback = Box<dyn FnMut(Duration, &Packet)>;

/// Receive-trace observers attached to a device.
///
/// Observers fire after the delivery event completes, outside the
/// simulation's internal borrow, so a callback may inspect the world.
#[derive(Clone, Default)]
pub(crate) struct RxObservers(Rc<RefCell<Vec<RxCallback>>>);

impl RxObservers {
    pub(crate) fn push(&self, callback: RxCallback) {
        self.0.borrow_mut().push(callback);
    }

    pub(crate) fn notify(&self, time: Duration, packet: &Packet) {
        for callback in self.0.borrow_mut().iter_mut() {
            callback(time, packet);
        }
    }
}

impl std::fmt::Debug for RxObservers {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "RxObservers({})", self.0.borrow().len())
    }
}

/// Internal device state.
#[derive(Debug)]
pub(crate) struct DeviceState {
    #[allow(dead_code)]
    pub(crate) id: DeviceId,
    pub(crate) node: NodeId,
    pub(crate) channel: Option<ChannelId>,
    pub(crate) queue: Option<DropTailQueue>,
    pub(crate) tx_state: TxMachineState,
    pub(crate) data_rate: DataRate,
    pub(crate) interframe_gap: Duration,
    pub(crate) link_up: bool,
    pub(crate) mac: MacAddress,
    pub(crate) broadcast: MacAddress,
    pub(crate) multicast: bool,
    pub(crate) point_to_point: bool,
    pub(crate) stats: DeviceStats,
    pub(crate) rx_observers: RxObservers,
}

impl DeviceState {
    pub(crate) fn new(id: DeviceId, node: NodeId) -> Self {
        // Locally administered MAC derived from the device id.
        let mac = MacAddress::new([0x02, 0, 0, 0, (id.0 >> 8) as u8, id.0 as u8]);
        Self {
            id,
            node,
            channel: None,
            queue: None,
            tx_state: TxMachineState::Ready,
            data_rate: DataRate::default(),
            interframe_gap: Duration::ZERO,
            link_up: false,
            mac,
            broadcast: MacAddress::BROADCAST,
            multicast: true,
            point_to_point: true,
            stats: DeviceStats::default(),
            rx_observers: RxObservers::default(),
        }
    }

    /// Point-to-point links resolve the peer without address resolution.
    pub(crate) fn needs_arp(&self) -> bool {
        false
    }
}

/// Accept a packet from the upper layer.
///
/// If the transmitter is ready the packet goes straight onto the wire;
/// otherwise it is queued. Returns `false` when the queue drops it.
///
/// # Panics
///
/// The link must be up and a queue must be attached; sending on a down
/// link is a contract violation that aborts the simulation.
pub(crate) fn send_to(
    inner: &mut SimInner,
    id: DeviceId,
    packet: Packet,
    dest: MacAddress,
) -> bool {
    let state = {
        let device = inner.devices.get_mut(&id).expect("unknown device");
        tracing::trace!(device = id.0, %packet, %dest, "send_to");
        assert!(device.link_up, "send_to requires the link to be up");
        assert!(device.queue.is_some(), "send_to requires an attached queue");
        device.tx_state
    };
    match state {
        TxMachineState::Ready => transmit_start(inner, id, packet),
        TxMachineState::Busy => {
            let device = inner.devices.get_mut(&id).expect("unknown device");
            device
                .queue
                .as_mut()
                .expect("queue checked above")
                .enqueue(packet)
        }
    }
}

/// Start wiggling the wire.
///
/// Marks the transmitter busy, schedules [`Event::TransmitComplete`] at
/// `now + tx_time + interframe_gap`, and hands the packet to the channel.
pub(crate) fn transmit_start(inner: &mut SimInner, id: DeviceId, packet: Packet) -> bool {
    let (channel_id, tx_time, gap) = {
        let device = inner.devices.get_mut(&id).expect("unknown device");
        assert!(
            device.tx_state == TxMachineState::Ready,
            "must be READY to transmit"
        );
        device.tx_state = TxMachineState::Busy;
        let channel_id = device.channel.expect("transmit requires an attached channel");
        let tx_time = device.data_rate.tx_time(packet.size());
        device.stats.tx_packets += 1;
        device.stats.tx_bytes += packet.size() as u64;
        (channel_id, tx_time, device.interframe_gap)
    };
    tracing::trace!(device = id.0, %packet, ?tx_time, "transmit start");
    world::schedule(inner, Event::TransmitComplete { device: id }, tx_time + gap);
    channel::transmit_start(inner, channel_id, packet, id, tx_time)
}

/// Finish a transmission.
///
/// Re-arms the transmitter and, if the queue is non-empty, immediately
/// starts the next packet. The transmitter only rests in `Ready` with an
/// empty queue.
pub(crate) fn transmit_complete(inner: &mut SimInner, id: DeviceId) {
    let next = {
        let device = inner.devices.get_mut(&id).expect("unknown device");
        assert!(
            device.tx_state == TxMachineState::Busy,
            "must be BUSY if transmitting"
        );
        device.tx_state = TxMachineState::Ready;
        device.queue.as_mut().and_then(|queue| queue.dequeue())
    };
    if let Some(packet) = next {
        transmit_start(inner, id, packet);
    }
}

/// Deliver a packet arriving from the channel.
///
/// Counts receive stats, records the rx trace, and forwards the packet
/// upward into the owning node's receive sink. Delivery is best-effort;
/// no error surfaces to the upper layer.
pub(crate) fn receive(inner: &mut SimInner, id: DeviceId, packet: Packet) {
    let now = inner.current_time;
    let node = {
        let device = inner.devices.get_mut(&id).expect("unknown device");
        device.stats.rx_packets += 1;
        device.stats.rx_bytes += packet.size() as u64;
        device.node
    };
    tracing::trace!(device = id.0, %packet, at = ?now, "receive");
    inner.fired_rx.push((id, now, packet.clone()));
    let node_state = inner.nodes.get_mut(&node).expect("unknown node");
    node_state.received.push((now, packet));
}
