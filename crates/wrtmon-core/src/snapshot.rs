// ── Per-cycle data snapshot ──
//
// One immutable map of metric -> value-or-absent, replaced wholesale by
// every successful refresh cycle.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;

use wrtmon_api::{BandwidthHistory, Direction};

/// Key of one polled value.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum MetricId {
    ClientCount,
    Bandwidth(String),
}

impl MetricId {
    pub fn bandwidth(interface: impl Into<String>) -> Self {
        Self::Bandwidth(interface.into())
    }
}

impl fmt::Display for MetricId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ClientCount => f.write_str("devices_count"),
            Self::Bandwidth(iface) => write!(f, "bandwidth:{iface}"),
        }
    }
}

/// A polled value.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricValue {
    Clients(u32),
    Bandwidth(BandwidthHistory),
}

/// Everything one refresh cycle gathered.
///
/// Every metric enabled for the cycle has an entry; an entry whose value
/// is `None` means the router had no data for it this time.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    taken_at: DateTime<Utc>,
    values: BTreeMap<MetricId, Option<MetricValue>>,
}

impl Snapshot {
    pub fn new(taken_at: DateTime<Utc>) -> Self {
        Self {
            taken_at,
            values: BTreeMap::new(),
        }
    }

    pub fn insert(&mut self, id: MetricId, value: Option<MetricValue>) {
        self.values.insert(id, value);
    }

    pub fn taken_at(&self) -> DateTime<Utc> {
        self.taken_at
    }

    /// Whether the metric was polled in this cycle (with or without data).
    pub fn contains(&self, id: &MetricId) -> bool {
        self.values.contains_key(id)
    }

    /// The metric's value, if it was polled and had data.
    pub fn get(&self, id: &MetricId) -> Option<&MetricValue> {
        self.values.get(id).and_then(Option::as_ref)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&MetricId, Option<&MetricValue>)> {
        self.values.iter().map(|(id, value)| (id, value.as_ref()))
    }

    pub fn client_count(&self) -> Option<u32> {
        match self.get(&MetricId::ClientCount)? {
            MetricValue::Clients(n) => Some(*n),
            MetricValue::Bandwidth(_) => None,
        }
    }

    pub fn bandwidth(&self, interface: &str) -> Option<&BandwidthHistory> {
        match self.get(&MetricId::bandwidth(interface))? {
            MetricValue::Bandwidth(history) => Some(history),
            MetricValue::Clients(_) => None,
        }
    }

    /// Bytes per second for `interface`, from the two newest samples.
    pub fn rate(&self, interface: &str, direction: Direction) -> Option<f64> {
        self.bandwidth(interface)?.rate(direction)
    }

    /// Interfaces with a bandwidth entry, in name order.
    pub fn interfaces(&self) -> impl Iterator<Item = &str> {
        self.values.keys().filter_map(|id| match id {
            MetricId::Bandwidth(iface) => Some(iface.as_str()),
            MetricId::ClientCount => None,
        })
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use wrtmon_api::{BandwidthHistory, Direction};

    use super::{MetricId, MetricValue, Snapshot};

    fn history() -> BandwidthHistory {
        serde_json::from_value(json!({
            "result": [[10, 100, 1, 1_000, 2], [12, 300, 3, 1_500, 4]]
        }))
        .expect("valid history")
    }

    #[test]
    fn absent_entries_are_present_but_empty() {
        let mut snap = Snapshot::new(Utc::now());
        snap.insert(MetricId::ClientCount, Some(MetricValue::Clients(4)));
        snap.insert(MetricId::bandwidth("wan"), None);

        assert_eq!(snap.client_count(), Some(4));
        assert!(snap.contains(&MetricId::bandwidth("wan")));
        assert!(snap.get(&MetricId::bandwidth("wan")).is_none());
        assert!(!snap.contains(&MetricId::bandwidth("lan")));
    }

    #[test]
    fn rate_reads_through_to_history() {
        let mut snap = Snapshot::new(Utc::now());
        snap.insert(
            MetricId::bandwidth("wan"),
            Some(MetricValue::Bandwidth(history())),
        );

        let down = snap.rate("wan", Direction::Download).expect("rate");
        let up = snap.rate("wan", Direction::Upload).expect("rate");
        assert!((down - 100.0).abs() < 1e-9);
        assert!((up - 250.0).abs() < 1e-9);
        assert_eq!(snap.rate("lan", Direction::Upload), None);
    }

    #[test]
    fn metric_ids_render_for_logs() {
        assert_eq!(MetricId::ClientCount.to_string(), "devices_count");
        assert_eq!(MetricId::bandwidth("br-lan").to_string(), "bandwidth:br-lan");
    }

    #[test]
    fn interfaces_lists_bandwidth_keys() {
        let mut snap = Snapshot::new(Utc::now());
        snap.insert(MetricId::ClientCount, None);
        snap.insert(MetricId::bandwidth("wan"), None);
        snap.insert(MetricId::bandwidth("br-lan"), None);
        assert_eq!(snap.interfaces().collect::<Vec<_>>(), vec!["br-lan", "wan"]);
    }
}
