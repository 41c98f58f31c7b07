//! Link configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use wireline_core::DataRate;

/// Parameters for one point-to-point link.
///
/// Used by [`SimWorld::install_link`](crate::SimWorld::install_link) to
/// build a channel plus a device and queue on each endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkConfig {
    /// Channel bit rate; attached devices adopt it.
    pub data_rate: DataRate,
    /// One-way propagation delay.
    pub delay: Duration,
    /// Transmit queue capacity in packets; `None` is unbounded.
    pub queue_capacity: Option<usize>,
    /// Minimum idle time between successive transmissions per endpoint.
    pub interframe_gap: Duration,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            data_rate: DataRate::default(),
            delay: Duration::ZERO,
            queue_capacity: Some(100),
            interframe_gap: Duration::ZERO,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = LinkConfig::default();
        assert_eq!(config.data_rate, DataRate::from_bps(10_000_000));
        assert_eq!(config.delay, Duration::ZERO);
        assert_eq!(config.queue_capacity, Some(100));
    }

    #[test]
    fn test_serde_roundtrip() {
        let config = LinkConfig {
            data_rate: "1Gb/s".parse().expect("valid rate"),
            delay: Duration::from_micros(50),
            queue_capacity: None,
            interframe_gap: Duration::from_nanos(9_600),
        };
        let json = serde_json::to_string(&config).expect("serialize");
        let decoded: LinkConfig = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(decoded, config);
    }
}
