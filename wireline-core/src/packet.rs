//! Packet: the unit of data handed between devices and channels.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

/// Allocator for process-unique packet identifiers.
static NEXT_UID: AtomicU64 = AtomicU64::new(0);

/// An opaque payload moving through the simulation.
///
/// A packet carries a unique 64-bit identifier and a size in bytes. It is
/// immutable once constructed; ownership moves from the sender's upper
/// layer through its device, across the channel, to the peer device and
/// finally the peer's upper layer. No component holds a packet twice.
///
/// # Examples
///
/// ```
/// use wireline_core::Packet;
///
/// let a = Packet::new(1250);
/// let b = Packet::new(1250);
/// assert_eq!(a.size(), 1250);
/// assert_ne!(a.uid(), b.uid());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Packet {
    uid: u64,
    size: u32,
}

impl Packet {
    /// Create a packet of the given size in bytes with a fresh UID.
    pub fn new(size: u32) -> Self {
        Self {
            uid: NEXT_UID.fetch_add(1, Ordering::Relaxed),
            size,
        }
    }

    /// The process-unique identifier of this packet.
    pub fn uid(&self) -> u64 {
        self.uid
    }

    /// The packet size in bytes.
    pub fn size(&self) -> u32 {
        self.size
    }
}

impl std::fmt::Display for Packet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "pkt#{}({}B)", self.uid, self.size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uids_are_unique_and_monotonic() {
        let a = Packet::new(100);
        let b = Packet::new(100);
        let c = Packet::new(100);
        assert!(a.uid() < b.uid());
        assert!(b.uid() < c.uid());
    }

    #[test]
    fn test_display() {
        let p = Packet::new(42);
        assert_eq!(p.to_string(), format!("pkt#{}(42B)", p.uid()));
    }
}
