//! Refresh coordination between `wrtmon-api` and consumers (the CLI).
//!
//! - **[`Coordinator`]** polls one [`Router`](wrtmon_api::Router) on a fixed
//!   interval, serializes cycles, and publishes each result through `watch`
//!   channels. [`Coordinator::oneshot()`] covers single CLI invocations.
//!
//! - **[`Snapshot`]** is the immutable result of one cycle: metric id to
//!   value-or-absent, replaced wholesale on every successful cycle.
//!
//! - **[`RouterConfig`]** describes how to reach a router and what to poll.
//!   Built by the CLI; this crate never reads config files.

pub mod config;
pub mod coordinator;
pub mod error;
pub mod snapshot;

// ── Primary re-exports ──────────────────────────────────────────────
pub use config::{ActionKind, MetricKind, MonitorSettings, RouterConfig, TlsVerification};
pub use coordinator::{Coordinator, CycleOutcome, CyclePhase, CycleState};
pub use error::CoreError;
pub use snapshot::{MetricId, MetricValue, Snapshot};

// Re-export the API types consumers handle directly.
pub use wrtmon_api::{BandwidthHistory, DeviceIdentity, Direction, UbusRouter};
