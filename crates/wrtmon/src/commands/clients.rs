//! `wrtmon clients`: associated wireless station count.

use std::collections::BTreeSet;

use serde::Serialize;

use wrtmon_core::{MetricKind, MonitorSettings, RouterConfig};

use crate::cli::GlobalOpts;
use crate::error::CliError;
use crate::output;

use super::util;

#[derive(Debug, Serialize)]
struct ClientsReport {
    router: String,
    /// `None` when the router could not report a count this time.
    clients: Option<u32>,
}

pub async fn handle(router: &RouterConfig, global: &GlobalOpts) -> Result<(), CliError> {
    let settings = MonitorSettings {
        metrics: BTreeSet::from([MetricKind::DevicesCount]),
        interfaces: Vec::new(),
        ..router.monitor.clone()
    };
    let snapshot = util::with_router(router, settings, |c| async move { c.refresh().await }).await?;

    let report = ClientsReport {
        router: router.name.clone(),
        clients: snapshot.client_count(),
    };

    let color = output::should_color(global.color);
    let out = output::render_single(
        global.output,
        &report,
        |r| {
            let count = r
                .clients
                .map_or_else(|| output::unavailable(color), |n| n.to_string());
            format!("{} {count}", output::label("Clients", color))
        },
        |r| r.clients.map(|n| n.to_string()).unwrap_or_default(),
    )?;
    output::print_output(&out, global.quiet);
    Ok(())
}
