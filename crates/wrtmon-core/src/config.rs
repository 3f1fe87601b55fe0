// ── Runtime router configuration ──
//
// These types describe *how* to reach a router and *what* to poll.
// They carry credential data and tuning, but never touch disk.
// The CLI constructs a `RouterConfig` and hands it in.

use std::collections::BTreeSet;
use std::path::PathBuf;
use std::time::Duration;

use secrecy::SecretString;
use serde::{Deserialize, Serialize};

use wrtmon_api::{Endpoint, TlsMode, TransportConfig, UbusRouter};

use crate::error::CoreError;

/// Shortest allowed refresh interval.
pub const MIN_REFRESH_INTERVAL: Duration = Duration::from_secs(1);
pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_secs(5);
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);
pub const DEFAULT_INTERFACES: [&str; 2] = ["wan", "br-lan"];

/// A polled metric family.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
    strum::EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum MetricKind {
    /// Stations associated across all wireless interfaces.
    DevicesCount,
    /// Realtime traffic per configured interface.
    Bandwidth,
}

/// A user-triggered router action.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
    strum::EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ActionKind {
    Reboot,
}

/// TLS verification strategy.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum TlsVerification {
    /// System CA store (strict).
    SystemDefaults,
    /// Custom CA certificate file.
    CustomCa(PathBuf),
    /// Skip verification. Routers ship self-signed certificates.
    #[default]
    DangerAcceptInvalid,
}

impl From<&TlsVerification> for TlsMode {
    fn from(tls: &TlsVerification) -> Self {
        match tls {
            TlsVerification::SystemDefaults => TlsMode::System,
            TlsVerification::CustomCa(path) => TlsMode::CustomCa(path.clone()),
            TlsVerification::DangerAcceptInvalid => TlsMode::DangerAcceptInvalid,
        }
    }
}

/// What the coordinator polls, and which actions it allows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonitorSettings {
    pub metrics: BTreeSet<MetricKind>,
    /// Interfaces sampled when [`MetricKind::Bandwidth`] is enabled.
    pub interfaces: Vec<String>,
    pub actions: BTreeSet<ActionKind>,
    pub refresh_interval: Duration,
}

impl Default for MonitorSettings {
    fn default() -> Self {
        Self {
            metrics: [MetricKind::DevicesCount, MetricKind::Bandwidth].into(),
            interfaces: DEFAULT_INTERFACES.iter().map(|s| (*s).to_owned()).collect(),
            actions: BTreeSet::new(),
            refresh_interval: DEFAULT_REFRESH_INTERVAL,
        }
    }
}

impl MonitorSettings {
    pub fn is_enabled(&self, metric: MetricKind) -> bool {
        self.metrics.contains(&metric)
    }

    pub fn allows(&self, action: ActionKind) -> bool {
        self.actions.contains(&action)
    }

    /// Refresh interval, clamped to [`MIN_REFRESH_INTERVAL`].
    pub fn effective_interval(&self) -> Duration {
        self.refresh_interval.max(MIN_REFRESH_INTERVAL)
    }
}

/// Configuration for one monitored router.
///
/// Built by the CLI, passed to the coordinator -- core never reads config files.
#[derive(Debug, Clone)]
pub struct RouterConfig {
    /// Stable identifier (profile name for CLI-built configs).
    pub id: String,
    /// Display name.
    pub name: String,
    /// Host or `host:port`, without scheme.
    pub host: String,
    /// Talk HTTPS instead of HTTP.
    pub use_tls: bool,
    pub username: String,
    pub password: SecretString,
    /// Certificate verification when `use_tls` is set.
    pub tls: TlsVerification,
    /// Per-call timeout.
    pub timeout: Duration,
    pub monitor: MonitorSettings,
}

impl RouterConfig {
    pub fn endpoint(&self) -> Endpoint {
        Endpoint {
            host: self.host.clone(),
            use_tls: self.use_tls,
            username: self.username.clone(),
            password: self.password.clone(),
            unique_id: self.id.clone(),
            name: self.name.clone(),
        }
    }

    pub fn transport(&self) -> TransportConfig {
        TransportConfig {
            tls: TlsMode::from(&self.tls),
            timeout: self.timeout,
        }
    }

    /// Build the ubus client for this router. Does not touch the network.
    pub fn build_router(&self) -> Result<UbusRouter, CoreError> {
        if self.host.trim().is_empty() {
            return Err(CoreError::Config {
                message: "router host is empty".into(),
            });
        }
        Ok(UbusRouter::new(self.endpoint(), &self.transport())?)
    }
}
