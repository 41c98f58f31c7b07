//! Addressing types: IPv4 masks, hardware addresses, router identifiers.

use std::net::Ipv4Addr;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors produced when parsing an [`Ipv4Mask`] from a string.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MaskParseError {
    /// The prefix length is not in `0..=32`.
    #[error("invalid prefix length: {0}")]
    InvalidPrefix(String),
    /// The dotted-quad form is not a valid contiguous mask.
    #[error("invalid mask: {0}")]
    InvalidMask(String),
}

/// An IPv4 network mask.
///
/// Masks appear in stub-network link records (the link data field carries
/// the mask) and in installed routes. Only contiguous masks are valid.
///
/// ```
/// use std::net::Ipv4Addr;
/// use wireline_core::Ipv4Mask;
///
/// let mask: Ipv4Mask = "/24".parse().expect("valid mask");
/// let net = mask.network(Ipv4Addr::new(10, 1, 1, 17));
/// assert_eq!(net, Ipv4Addr::new(10, 1, 1, 0));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Ipv4Mask(u32);

impl Ipv4Mask {
    /// Build a mask from a prefix length in `0..=32`.
    pub const fn from_prefix_len(len: u32) -> Self {
        if len == 0 {
            Self(0)
        } else {
            Self(u32::MAX << (32 - len))
        }
    }

    /// The prefix length of this mask.
    pub const fn prefix_len(&self) -> u32 {
        self.0.count_ones()
    }

    /// Zero the host bits of `addr`, yielding the network address.
    pub fn network(&self, addr: Ipv4Addr) -> Ipv4Addr {
        Ipv4Addr::from(u32::from(addr) & self.0)
    }

    /// True if `a` and `b` fall in the same subnet under this mask.
    pub fn matches(&self, a: Ipv4Addr, b: Ipv4Addr) -> bool {
        self.network(a) == self.network(b)
    }

    /// The mask rendered as an IPv4 address, as carried in link records.
    pub fn as_ipv4(&self) -> Ipv4Addr {
        Ipv4Addr::from(self.0)
    }

    /// Reinterpret an IPv4 address from a link record as a mask.
    pub fn from_ipv4(addr: Ipv4Addr) -> Self {
        Self(u32::from(addr))
    }
}

impl FromStr for Ipv4Mask {
    type Err = MaskParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Some(prefix) = s.strip_prefix('/') {
            let len: u32 = prefix
                .parse()
                .map_err(|_| MaskParseError::InvalidPrefix(s.to_string()))?;
            if len > 32 {
                return Err(MaskParseError::InvalidPrefix(s.to_string()));
            }
            return Ok(Self::from_prefix_len(len));
        }
        let addr: Ipv4Addr = s
            .parse()
            .map_err(|_| MaskParseError::InvalidMask(s.to_string()))?;
        let bits = u32::from(addr);
        // A valid mask is a run of ones followed by a run of zeros.
        if bits.count_ones() != bits.leading_ones() {
            return Err(MaskParseError::InvalidMask(s.to_string()));
        }
        Ok(Self(bits))
    }
}

impl std::fmt::Display for Ipv4Mask {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_ipv4())
    }
}

/// A 48-bit hardware address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MacAddress([u8; 6]);

impl MacAddress {
    /// The all-ones broadcast address, `ff:ff:ff:ff:ff:ff`.
    pub const BROADCAST: MacAddress = MacAddress([0xff; 6]);

    /// Build an address from its six octets.
    pub const fn new(octets: [u8; 6]) -> Self {
        Self(octets)
    }

    /// The six octets of this address.
    pub const fn octets(&self) -> [u8; 6] {
        self.0
    }

    /// True if this is the broadcast address.
    pub fn is_broadcast(&self) -> bool {
        *self == Self::BROADCAST
    }
}

impl std::fmt::Display for MacAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let o = self.0;
        write!(
            f,
            "{:02x}:{:02x}:{:02x}:{:02x}:{:02x}:{:02x}",
            o[0], o[1], o[2], o[3], o[4], o[5]
        )
    }
}

/// A 32-bit router identifier, expressed as an IPv4 address.
///
/// Router IDs are allocated densely starting at `0.0.0.1`, one per router
/// in creation order. The `Ord` impl gives the ascending-ID tie-break used
/// by the shortest-path computation.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct RouterId(Ipv4Addr);

impl RouterId {
    /// Wrap an IPv4 address as a router identifier.
    pub const fn new(addr: Ipv4Addr) -> Self {
        Self(addr)
    }

    /// The identifier as an IPv4 address.
    pub const fn as_ipv4(&self) -> Ipv4Addr {
        self.0
    }
}

impl From<u32> for RouterId {
    fn from(value: u32) -> Self {
        Self(Ipv4Addr::from(value))
    }
}

impl From<RouterId> for u32 {
    fn from(id: RouterId) -> Self {
        u32::from(id.0)
    }
}

impl std::fmt::Display for RouterId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mask_network_and_matches() {
        let mask = Ipv4Mask::from_prefix_len(24);
        assert_eq!(
            mask.network(Ipv4Addr::new(10, 1, 1, 200)),
            Ipv4Addr::new(10, 1, 1, 0)
        );
        assert!(mask.matches(Ipv4Addr::new(10, 1, 1, 1), Ipv4Addr::new(10, 1, 1, 2)));
        assert!(!mask.matches(Ipv4Addr::new(10, 1, 1, 1), Ipv4Addr::new(10, 1, 2, 1)));
    }

    #[test]
    fn test_mask_parse_forms() {
        let a: Ipv4Mask = "/24".parse().expect("prefix form");
        let b: Ipv4Mask = "255.255.255.0".parse().expect("dotted form");
        assert_eq!(a, b);
        assert_eq!(a.prefix_len(), 24);
    }

    #[test]
    fn test_mask_parse_rejects_noncontiguous() {
        assert!("255.0.255.0".parse::<Ipv4Mask>().is_err());
        assert!("/33".parse::<Ipv4Mask>().is_err());
    }

    #[test]
    fn test_mask_zero_and_full() {
        assert_eq!(Ipv4Mask::from_prefix_len(0).prefix_len(), 0);
        assert_eq!(Ipv4Mask::from_prefix_len(32).prefix_len(), 32);
    }

    #[test]
    fn test_mask_ipv4_roundtrip() {
        let mask = Ipv4Mask::from_prefix_len(16);
        assert_eq!(Ipv4Mask::from_ipv4(mask.as_ipv4()), mask);
        assert_eq!(mask.to_string(), "255.255.0.0");
    }

    #[test]
    fn test_broadcast_mac() {
        assert_eq!(MacAddress::BROADCAST.to_string(), "ff:ff:ff:ff:ff:ff");
        assert!(MacAddress::BROADCAST.is_broadcast());
        assert!(!MacAddress::new([2, 0, 0, 0, 0, 1]).is_broadcast());
    }

    #[test]
    fn test_router_id_ordering() {
        let a = RouterId::from(1);
        let b = RouterId::from(2);
        assert!(a < b);
        assert_eq!(a.to_string(), "0.0.0.1");
        assert_eq!(u32::from(b), 2);
    }

    #[test]
    fn test_router_id_crosses_octet_boundary() {
        let id = RouterId::from(256);
        assert_eq!(id.as_ipv4(), Ipv4Addr::new(0, 0, 1, 0));
    }
}
