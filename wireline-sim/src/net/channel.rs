//! Point-to-point channel: a two-endpoint medium with rate and delay.

use std::time::Duration;

use wireline_core::{DataRate, Packet};

use crate::net::{ChannelId, DeviceId};
use crate::sim::events::Event;
use crate::sim::world::{self, SimInner};

/// Internal channel state.
///
/// A channel connects at most two devices. It publishes a [`DataRate`]
/// (adopted by devices on attach) and a propagation delay. The channel is
/// stateless with respect to in-flight packets: once a delivery event is
/// scheduled, the channel holds nothing.
#[derive(Debug)]
pub(crate) struct ChannelState {
    #[allow(dead_code)]
    pub(crate) id: ChannelId,
    pub(crate) data_rate: DataRate,
    pub(crate) delay: Duration,
    pub(crate) endpoints: [Option<DeviceId>; 2],
}

impl ChannelState {
    pub(crate) fn new(id: ChannelId, data_rate: DataRate, delay: Duration) -> Self {
        Self {
            id,
            data_rate,
            delay,
            endpoints: [None, None],
        }
    }

    /// Number of devices attached so far (0, 1, or 2).
    pub(crate) fn attached_count(&self) -> usize {
        self.endpoints.iter().flatten().count()
    }

    /// True once both endpoints are attached; the channel is then closed.
    pub(crate) fn is_complete(&self) -> bool {
        self.attached_count() == 2
    }

    /// Record an endpoint. Returns `false` once two are attached.
    pub(crate) fn attach(&mut self, device: DeviceId) -> bool {
        for slot in &mut self.endpoints {
            if slot.is_none() {
                *slot = Some(device);
                return true;
            }
        }
        false
    }

    /// The endpoint opposite `device`.
    pub(crate) fn peer_of(&self, device: DeviceId) -> Option<DeviceId> {
        match self.endpoints {
            [Some(a), Some(b)] if a == device => Some(b),
            [Some(a), Some(b)] if b == device => Some(a),
            _ => None,
        }
    }
}

/// Forward a packet to the non-sender endpoint.
///
/// The sending device computes the serialization time from its configured
/// rate and passes it down; the last bit reaches the peer after the wire
/// time plus the propagation delay, so delivery is scheduled at
/// `now + tx_time + delay`. Returns `true` iff a peer is attached.
pub(crate) fn transmit_start(
    inner: &mut SimInner,
    id: ChannelId,
    packet: Packet,
    sender: DeviceId,
    tx_time: Duration,
) -> bool {
    let (peer, delay) = {
        let channel = inner.channels.get(&id).expect("unknown channel");
        assert!(
            channel.is_complete(),
            "transmit on a channel without two attached devices"
        );
        let peer = channel
            .peer_of(sender)
            .expect("sender is not attached to this channel");
        (peer, channel.delay)
    };
    tracing::trace!(
        channel = id.0,
        %packet,
        from = sender.0,
        to = peer.0,
        "channel transmit"
    );
    world::schedule(inner, Event::Deliver { device: peer, packet }, tx_time + delay);
    true
}
