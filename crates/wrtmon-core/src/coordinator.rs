// ── Refresh coordinator ──
//
// Owns one router, polls it on a fixed interval, and publishes the
// result of every cycle through watch channels. Cycles never overlap:
// manual refreshes and timer ticks queue on the same lock.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use wrtmon_api::{DeviceIdentity, Router, UbusRouter};

use crate::config::{ActionKind, MetricKind, MonitorSettings, RouterConfig};
use crate::error::CoreError;
use crate::snapshot::{MetricId, MetricValue, Snapshot};

// ── CycleState ───────────────────────────────────────────────────

/// Where the coordinator is within a refresh cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum CyclePhase {
    #[default]
    Idle,
    Fetching,
}

/// How the most recent completed cycle ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum CycleOutcome {
    Succeeded,
    Failed,
}

/// Cycle bookkeeping observable by consumers.
///
/// Subscribers are woken once per completed cycle; entering
/// [`CyclePhase::Fetching`] updates the value without a notification.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleState {
    pub phase: CyclePhase,
    /// Number of cycles completed, successful or not.
    pub completed: u64,
    pub last_outcome: Option<CycleOutcome>,
    pub last_success_at: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
}

// ── Coordinator ──────────────────────────────────────────────────

/// Periodic poller for one router.
///
/// Cheaply cloneable via `Arc<CoordinatorInner>`. The router sits behind
/// an async mutex so its session and request ids have a single writer.
pub struct Coordinator<R> {
    inner: Arc<CoordinatorInner<R>>,
}

impl<R> Clone for Coordinator<R> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

struct CoordinatorInner<R> {
    settings: MonitorSettings,
    router: Mutex<R>,
    /// Held for the whole of a cycle.
    cycle_lock: Mutex<()>,
    snapshot: watch::Sender<Option<Arc<Snapshot>>>,
    identity: watch::Sender<Option<Arc<DeviceIdentity>>>,
    state: watch::Sender<CycleState>,
    cancel: CancellationToken,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl Coordinator<UbusRouter> {
    /// Build a coordinator for a ubus router. Does not touch the network.
    pub fn from_config(config: &RouterConfig) -> Result<Self, CoreError> {
        let router = config.build_router()?;
        Ok(Self::new(router, config.monitor.clone()))
    }
}

impl<R: Router + 'static> Coordinator<R> {
    /// Create a coordinator. Nothing runs until [`refresh()`](Self::refresh)
    /// or [`start()`](Self::start) is called.
    pub fn new(router: R, settings: MonitorSettings) -> Self {
        let (snapshot, _) = watch::channel(None);
        let (identity, _) = watch::channel(None);
        let (state, _) = watch::channel(CycleState::default());

        Self {
            inner: Arc::new(CoordinatorInner {
                settings,
                router: Mutex::new(router),
                cycle_lock: Mutex::new(()),
                snapshot,
                identity,
                state,
                cancel: CancellationToken::new(),
                task: Mutex::new(None),
            }),
        }
    }

    // ── Lifecycle ────────────────────────────────────────────────

    /// Authenticate without running a cycle.
    pub async fn connect(&self) -> Result<(), CoreError> {
        let mut router = self.inner.router.lock().await;
        router.connect().await?;
        Ok(())
    }

    /// Spawn the periodic refresh loop. The first cycle runs immediately.
    ///
    /// Calling this twice, or after [`shutdown()`](Self::shutdown), does nothing.
    pub async fn start(&self) {
        let mut task = self.inner.task.lock().await;
        if task.is_some() || self.inner.cancel.is_cancelled() {
            debug!("refresh loop already started or shut down");
            return;
        }

        let period = self.inner.settings.effective_interval();
        *task = Some(tokio::spawn(refresh_task(
            self.clone(),
            period,
            self.inner.cancel.clone(),
        )));
        info!(interval_secs = period.as_secs(), "refresh loop started");
    }

    /// Stop the refresh loop and wait for it to finish its current cycle.
    pub async fn shutdown(&self) {
        self.inner.cancel.cancel();

        if let Some(handle) = self.inner.task.lock().await.take() {
            if let Err(e) = handle.await {
                warn!(error = %e, "refresh task ended abnormally");
            }
        }
        debug!("coordinator shut down");
    }

    /// One-shot: connect, run closure, shut down.
    ///
    /// For single CLI invocations; the refresh loop is never started.
    pub async fn oneshot<F, Fut, T>(router: R, settings: MonitorSettings, f: F) -> Result<T, CoreError>
    where
        F: FnOnce(Coordinator<R>) -> Fut,
        Fut: Future<Output = Result<T, CoreError>>,
    {
        let coordinator = Self::new(router, settings);
        coordinator.connect().await?;
        let result = f(coordinator.clone()).await;
        coordinator.shutdown().await;
        result
    }

    // ── Refresh ──────────────────────────────────────────────────

    /// Run one cycle now, after any cycle already in progress.
    ///
    /// On failure the previous snapshot stays published and the error is
    /// both recorded in [`CycleState`] and returned.
    pub async fn refresh(&self) -> Result<Arc<Snapshot>, CoreError> {
        let _cycle = self.inner.cycle_lock.lock().await;

        self.inner.state.send_if_modified(|state| {
            state.phase = CyclePhase::Fetching;
            false
        });

        match self.run_cycle().await {
            Ok(snapshot) => {
                let snapshot = Arc::new(snapshot);
                let taken_at = snapshot.taken_at();
                self.inner.snapshot.send_replace(Some(Arc::clone(&snapshot)));
                self.inner.state.send_modify(|state| {
                    state.phase = CyclePhase::Idle;
                    state.completed += 1;
                    state.last_outcome = Some(CycleOutcome::Succeeded);
                    state.last_success_at = Some(taken_at);
                    state.last_error = None;
                });
                debug!(metrics = snapshot.iter().count(), "refresh cycle succeeded");
                Ok(snapshot)
            }
            Err(e) => {
                warn!(error = %e, "refresh cycle failed, keeping last snapshot");
                let message = e.to_string();
                self.inner.state.send_modify(|state| {
                    state.phase = CyclePhase::Idle;
                    state.completed += 1;
                    state.last_outcome = Some(CycleOutcome::Failed);
                    state.last_error = Some(message);
                });
                Err(e)
            }
        }
    }

    async fn run_cycle(&self) -> Result<Snapshot, CoreError> {
        let settings = &self.inner.settings;
        let mut router = self.inner.router.lock().await;

        let has_identity = self.inner.identity.borrow().is_some();
        if !has_identity {
            let identity = router.device_info().await.map_err(cycle_error)?;
            self.inner.identity.send_replace(Some(Arc::new(identity)));
        }

        let mut snapshot = Snapshot::new(Utc::now());

        if settings.is_enabled(MetricKind::DevicesCount) {
            let count = router.client_count().await.map_err(cycle_error)?;
            record(&mut snapshot, MetricId::ClientCount, count.map(MetricValue::Clients));
        }

        if settings.is_enabled(MetricKind::Bandwidth) {
            for interface in &settings.interfaces {
                let history = router.bandwidth(interface).await.map_err(cycle_error)?;
                record(
                    &mut snapshot,
                    MetricId::bandwidth(interface.as_str()),
                    history.map(MetricValue::Bandwidth),
                );
            }
        }

        Ok(snapshot)
    }

    // ── Actions ──────────────────────────────────────────────────

    /// Ask the router to restart. Runs outside the refresh cycle.
    pub async fn trigger_reboot(&self) -> Result<(), CoreError> {
        if !self.inner.settings.allows(ActionKind::Reboot) {
            return Err(CoreError::ActionDisabled {
                action: ActionKind::Reboot.to_string(),
            });
        }

        let mut router = self.inner.router.lock().await;
        router.reboot().await?;
        info!("reboot requested");
        Ok(())
    }

    // ── State observation ────────────────────────────────────────

    /// Device identity, fetching it if no cycle has done so yet.
    pub async fn device_info(&self) -> Result<Arc<DeviceIdentity>, CoreError> {
        if let Some(identity) = self.device_identity() {
            return Ok(identity);
        }
        let identity = Arc::new(self.inner.router.lock().await.device_info().await?);
        self.inner.identity.send_replace(Some(Arc::clone(&identity)));
        Ok(identity)
    }

    /// Cached device identity, if known.
    pub fn device_identity(&self) -> Option<Arc<DeviceIdentity>> {
        self.inner.identity.borrow().clone()
    }

    /// The last successfully gathered snapshot.
    pub fn latest_snapshot(&self) -> Option<Arc<Snapshot>> {
        self.inner.snapshot.borrow().clone()
    }

    /// True iff the last cycle succeeded and produced a value for `metric`.
    pub fn is_available(&self, metric: &MetricId) -> bool {
        let succeeded =
            self.inner.state.borrow().last_outcome == Some(CycleOutcome::Succeeded);
        succeeded
            && self
                .inner
                .snapshot
                .borrow()
                .as_ref()
                .is_some_and(|snap| snap.get(metric).is_some())
    }

    pub fn cycle_state(&self) -> CycleState {
        self.inner.state.borrow().clone()
    }

    /// Subscribe to completed cycles.
    pub fn subscribe(&self) -> watch::Receiver<CycleState> {
        self.inner.state.subscribe()
    }
}

fn record(snapshot: &mut Snapshot, id: MetricId, value: Option<MetricValue>) {
    if value.is_none() {
        debug!(metric = %id, "metric absent this cycle");
    }
    snapshot.insert(id, value);
}

/// Convert a router failure that ends the cycle.
fn cycle_error(err: wrtmon_api::Error) -> CoreError {
    if err.is_transient() {
        debug!(error = %err, "transient router failure, next cycle retries");
    }
    err.into()
}

/// Periodically refresh until cancelled.
async fn refresh_task<R: Router + 'static>(
    coordinator: Coordinator<R>,
    period: Duration,
    cancel: CancellationToken,
) {
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            _ = interval.tick() => {
                // Failures are already recorded in the cycle state.
                let _ = coordinator.refresh().await;
            }
        }
    }
    debug!("refresh loop stopped");
}
