// Router payload and domain types
//
// Raw shapes returned by rpcd/luci objects (`system.board`,
// `luci-rpc.getNetworkDevices`, `iwinfo.assoclist`,
// `luci.getRealtimeStats`) plus the cached identity built from them.
// Fields use `#[serde(default)]` because payloads differ between releases.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

// ── system.board ─────────────────────────────────────────────────────

/// Payload of `system.board`.
#[derive(Debug, Clone, Deserialize)]
pub struct BoardInfo {
    #[serde(default)]
    pub kernel: Option<String>,
    #[serde(default)]
    pub hostname: Option<String>,
    #[serde(default)]
    pub system: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub board_name: Option<String>,
    #[serde(default)]
    pub release: Option<ReleaseInfo>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReleaseInfo {
    #[serde(default)]
    pub distribution: Option<String>,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub revision: Option<String>,
    #[serde(default)]
    pub target: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

/// Immutable facts about the router, fetched once per client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceIdentity {
    pub unique_id: String,
    pub name: String,
    pub model: String,
    /// `"<release description>(kernel:<kernel>)"`
    pub sw_version: String,
    pub configuration_url: String,
    pub hostname: Option<String>,
}

// ── luci-rpc.getNetworkDevices ───────────────────────────────────────

/// One entry of `luci-rpc.getNetworkDevices`, keyed by device name.
#[derive(Debug, Clone, Deserialize)]
pub struct NetworkDevice {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub wireless: bool,
    #[serde(default)]
    pub up: bool,
}

pub type NetworkDevices = BTreeMap<String, NetworkDevice>;

/// Names of the wireless devices, in key order.
pub(crate) fn wireless_names(devices: NetworkDevices) -> Vec<String> {
    devices
        .into_iter()
        .filter(|(_, dev)| dev.wireless)
        .map(|(key, dev)| dev.name.unwrap_or(key))
        .collect()
}

// ── iwinfo.assoclist ─────────────────────────────────────────────────

/// Payload of `iwinfo.assoclist`. Station entries are kept opaque.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AssocList {
    #[serde(default)]
    pub results: Vec<serde_json::Value>,
}

// ── luci.getRealtimeStats ────────────────────────────────────────────

/// Direction of traffic on an interface, from the router's point of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Direction {
    /// Received bytes.
    Download,
    /// Transmitted bytes.
    Upload,
}

/// One realtime sample: `[timestamp, rx_bytes, rx_packets, tx_bytes, tx_packets]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<u64>", into = "Vec<u64>")]
pub struct BandwidthSample {
    pub timestamp: u64,
    pub rx_bytes: u64,
    pub rx_packets: u64,
    pub tx_bytes: u64,
    pub tx_packets: u64,
}

impl BandwidthSample {
    pub fn bytes(&self, direction: Direction) -> u64 {
        match direction {
            Direction::Download => self.rx_bytes,
            Direction::Upload => self.tx_bytes,
        }
    }
}

impl TryFrom<Vec<u64>> for BandwidthSample {
    type Error = String;

    fn try_from(values: Vec<u64>) -> Result<Self, Self::Error> {
        match values.as_slice() {
            [timestamp, rx_bytes, rx_packets, tx_bytes, rest @ ..] => Ok(Self {
                timestamp: *timestamp,
                rx_bytes: *rx_bytes,
                rx_packets: *rx_packets,
                tx_bytes: *tx_bytes,
                tx_packets: rest.first().copied().unwrap_or_default(),
            }),
            _ => Err(format!(
                "realtime sample needs at least 4 counters, got {}",
                values.len()
            )),
        }
    }
}

impl From<BandwidthSample> for Vec<u64> {
    fn from(sample: BandwidthSample) -> Self {
        vec![
            sample.timestamp,
            sample.rx_bytes,
            sample.rx_packets,
            sample.tx_bytes,
            sample.tx_packets,
        ]
    }
}

/// Sample history for one interface, oldest first, as the router keeps it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BandwidthHistory {
    #[serde(rename = "result", default)]
    pub samples: Vec<BandwidthSample>,
}

impl BandwidthHistory {
    /// Bytes per second over the two most recent samples.
    ///
    /// `None` with fewer than two samples, a non-advancing clock, or a
    /// counter that went backwards (interface reset).
    #[allow(clippy::cast_precision_loss, clippy::as_conversions)]
    pub fn rate(&self, direction: Direction) -> Option<f64> {
        let [.., prev, last] = self.samples.as_slice() else {
            return None;
        };
        let elapsed = last.timestamp.checked_sub(prev.timestamp)?;
        if elapsed == 0 {
            return None;
        }
        let delta = last.bytes(direction).checked_sub(prev.bytes(direction))?;
        Some(delta as f64 / elapsed as f64)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{BandwidthHistory, Direction, NetworkDevices, wireless_names};

    fn history(value: serde_json::Value) -> BandwidthHistory {
        serde_json::from_value(value).expect("valid history")
    }

    fn assert_rate(actual: Option<f64>, expected: f64) {
        let actual = actual.expect("rate available");
        assert!((actual - expected).abs() < 1e-9, "{actual} != {expected}");
    }

    #[test]
    fn rate_uses_last_two_samples() {
        let h = history(json!({
            "result": [
                [100, 0, 0, 0, 0],
                [101, 1_000, 10, 4_000, 20],
                [103, 5_000, 30, 10_000, 40]
            ]
        }));
        assert_rate(h.rate(Direction::Upload), 3_000.0);
        assert_rate(h.rate(Direction::Download), 2_000.0);
    }

    #[test]
    fn rate_needs_two_samples() {
        let h = history(json!({ "result": [[100, 1, 1, 1, 1]] }));
        assert_eq!(h.rate(Direction::Upload), None);
        assert_eq!(history(json!({ "result": [] })).rate(Direction::Download), None);
    }

    #[test]
    fn counter_reset_or_frozen_clock_is_unavailable() {
        let reset = history(json!({ "result": [[1, 500, 0, 500, 0], [2, 10, 0, 10, 0]] }));
        assert_eq!(reset.rate(Direction::Download), None);

        let frozen = history(json!({ "result": [[5, 0, 0, 0, 0], [5, 10, 0, 10, 0]] }));
        assert_eq!(frozen.rate(Direction::Upload), None);
    }

    #[test]
    fn four_counter_samples_are_accepted() {
        let h = history(json!({ "result": [[1, 2, 3, 4]] }));
        assert_eq!(h.samples[0].tx_bytes, 4);
        assert_eq!(h.samples[0].tx_packets, 0);
    }

    #[test]
    fn short_samples_are_rejected() {
        let parsed: Result<BandwidthHistory, _> =
            serde_json::from_value(json!({ "result": [[1, 2]] }));
        assert!(parsed.is_err());
    }

    #[test]
    fn only_wireless_devices_are_kept() {
        let devices: NetworkDevices = serde_json::from_value(json!({
            "br-lan": { "name": "br-lan", "wireless": false, "up": true },
            "phy0-ap0": { "name": "phy0-ap0", "wireless": true, "up": true },
            "phy1-ap0": { "wireless": true },
            "wan": { "name": "wan", "up": true }
        }))
        .expect("valid devices");
        assert_eq!(wireless_names(devices), vec!["phy0-ap0", "phy1-ap0"]);
    }
}
