//! `wrtmon watch`: run the refresh loop and print one line per cycle.

use std::fmt::Write;
use std::time::Duration;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;

use wrtmon_core::{Coordinator, CycleOutcome, CycleState, RouterConfig, Snapshot, UbusRouter};

use crate::cli::{GlobalOpts, OutputFormat, WatchArgs};
use crate::error::CliError;
use crate::output;

use super::bandwidth::InterfaceRates;

/// One completed refresh cycle, as printed.
#[derive(Debug, Serialize)]
struct CycleLine {
    cycle: u64,
    at: DateTime<Utc>,
    outcome: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    clients: Option<u32>,
    interfaces: Vec<InterfaceRates>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl CycleLine {
    fn new(state: &CycleState, snapshot: Option<&Snapshot>) -> Self {
        let succeeded = state.last_outcome == Some(CycleOutcome::Succeeded);
        let snapshot = snapshot.filter(|_| succeeded);
        Self {
            cycle: state.completed,
            at: snapshot.map_or_else(Utc::now, Snapshot::taken_at),
            outcome: state
                .last_outcome
                .map_or_else(|| "pending".to_owned(), |o| o.to_string()),
            clients: snapshot.and_then(Snapshot::client_count),
            interfaces: snapshot.map(InterfaceRates::from_snapshot).unwrap_or_default(),
            error: state.last_error.clone(),
        }
    }

    fn text(&self, color: bool) -> String {
        let mut out = self.at.to_rfc3339_opts(SecondsFormat::Secs, true);
        if let Some(ref error) = self.error {
            let _ = write!(out, "  cycle failed: {error}");
            return out;
        }
        if let Some(clients) = self.clients {
            let _ = write!(out, "  {} {clients}", output::label("clients", color));
        }
        for rates in &self.interfaces {
            let _ = write!(
                out,
                "  {} down {} up {}",
                output::label(&rates.interface, color),
                rates
                    .download
                    .map_or_else(|| output::unavailable(color), output::format_rate),
                rates
                    .upload
                    .map_or_else(|| output::unavailable(color), output::format_rate),
            );
        }
        out
    }
}

pub async fn handle(
    mut router: RouterConfig,
    args: WatchArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    if let Some(secs) = args.interval {
        router.monitor.refresh_interval = Duration::from_secs(secs);
    }

    let coordinator = Coordinator::from_config(&router)?;
    coordinator.connect().await?;

    let result = run_loop(&coordinator, args.count, global).await;
    coordinator.shutdown().await;
    result
}

async fn run_loop(
    coordinator: &Coordinator<UbusRouter>,
    count: Option<u64>,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let color = output::should_color(global.color);
    let mut cycles = coordinator.subscribe();
    coordinator.start().await;

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    let mut printed = 0_u64;
    loop {
        tokio::select! {
            _ = &mut ctrl_c => {
                tracing::debug!("interrupted");
                break;
            }
            changed = cycles.changed() => {
                if changed.is_err() {
                    break;
                }
                let state = cycles.borrow_and_update().clone();
                let snapshot = coordinator.latest_snapshot();
                let line = CycleLine::new(&state, snapshot.as_deref());

                let rendered = match global.output {
                    OutputFormat::Json | OutputFormat::JsonCompact => output::render_json(&line, true)?,
                    OutputFormat::Table | OutputFormat::Plain => line.text(color),
                };
                output::print_output(&rendered, global.quiet);

                printed += 1;
                if count.is_some_and(|n| printed >= n) {
                    break;
                }
            }
        }
    }
    Ok(())
}
