//! # wireline-core
//!
//! Core value types for the wireline network simulator.
//!
//! This crate holds the types that carry no simulation state and can be
//! shared between the simulation engine and any code that configures or
//! inspects a topology:
//!
//! - [`Packet`]: an opaque payload with a process-unique identifier
//! - [`DataRate`]: a bit rate with serialization-time arithmetic
//! - [`Ipv4Mask`]: network mask operations for IPv4 prefixes
//! - [`MacAddress`]: 48-bit hardware address with the broadcast constant
//! - [`RouterId`]: a 32-bit router identifier expressed as an IPv4 address
//!
//! All arithmetic on the event path (transmission times in particular) is
//! integer-only so that simulations produce exact, reproducible timestamps.

#![deny(missing_docs)]
#![deny(clippy::unwrap_used)]

mod address;
mod packet;
mod rate;

pub use address::{Ipv4Mask, MacAddress, MaskParseError, RouterId};
pub use packet::Packet;
pub use rate::{DataRate, RateParseError};
