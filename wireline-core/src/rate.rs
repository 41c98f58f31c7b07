//! Data rate: bits per second with transmission-time arithmetic.

use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

/// Errors produced when parsing a [`DataRate`] from a string.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RateParseError {
    /// The numeric part of the rate could not be parsed.
    #[error("invalid rate value: {0}")]
    InvalidValue(String),
    /// The unit suffix is not one of `b/s`, `kb/s`, `Mb/s`, `Gb/s`.
    #[error("unknown rate unit: {0}")]
    UnknownUnit(String),
}

/// A link bit rate in bits per second.
///
/// Transmission times are computed in integer nanoseconds with ceiling
/// division, so event timestamps are exact and reproducible.
///
/// Rates parse from and render to the conventional suffix form:
///
/// ```
/// use wireline_core::DataRate;
///
/// let rate: DataRate = "10Mb/s".parse().expect("valid rate");
/// assert_eq!(rate.bits_per_second(), 10_000_000);
/// assert_eq!(rate.to_string(), "10Mb/s");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DataRate(u64);

impl DataRate {
    /// Create a rate from a raw bits-per-second value.
    pub const fn from_bps(bps: u64) -> Self {
        Self(bps)
    }

    /// The rate in bits per second.
    pub const fn bits_per_second(&self) -> u64 {
        self.0
    }

    /// Time to serialize `bytes` onto the wire: `8 * bytes / rate`.
    ///
    /// Computed as ceiling division in nanoseconds. A zero rate yields a
    /// quasi-infinite duration rather than dividing by zero, so a
    /// misconfigured link stalls instead of crashing the scheduler.
    pub fn tx_time(&self, bytes: u32) -> Duration {
        if self.0 == 0 {
            return Duration::from_nanos(u64::MAX / 4);
        }
        let bits = (bytes as u128) * 8;
        let nanos = (bits * 1_000_000_000 + (self.0 as u128 - 1)) / self.0 as u128;
        Duration::from_nanos(nanos.min((u64::MAX / 4) as u128) as u64)
    }
}

impl Default for DataRate {
    /// The default point-to-point link rate, 10Mb/s.
    fn default() -> Self {
        Self(10_000_000)
    }
}

impl FromStr for DataRate {
    type Err = RateParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let split = s
            .find(|c: char| !(c.is_ascii_digit() || c == '.'))
            .unwrap_or(s.len());
        let (value, unit) = s.split_at(split);
        let value: f64 = value
            .parse()
            .map_err(|_| RateParseError::InvalidValue(s.to_string()))?;
        let multiplier: u64 = match unit {
            "b/s" | "bps" => 1,
            "kb/s" | "kbps" => 1_000,
            "Mb/s" | "Mbps" => 1_000_000,
            "Gb/s" | "Gbps" => 1_000_000_000,
            _ => return Err(RateParseError::UnknownUnit(unit.to_string())),
        };
        Ok(Self((value * multiplier as f64).round() as u64))
    }
}

impl std::fmt::Display for DataRate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let bps = self.0;
        if bps >= 1_000_000_000 && bps.is_multiple_of(1_000_000_000) {
            write!(f, "{}Gb/s", bps / 1_000_000_000)
        } else if bps >= 1_000_000 && bps.is_multiple_of(1_000_000) {
            write!(f, "{}Mb/s", bps / 1_000_000)
        } else if bps >= 1_000 && bps.is_multiple_of(1_000) {
            write!(f, "{}kb/s", bps / 1_000)
        } else {
            write!(f, "{}b/s", bps)
        }
    }
}

impl Serialize for DataRate {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for DataRate {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
