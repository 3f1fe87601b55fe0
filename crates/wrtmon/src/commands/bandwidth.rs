//! `wrtmon bandwidth`: realtime rates per interface.

use std::collections::BTreeSet;

use serde::Serialize;
use tabled::Tabled;

use wrtmon_core::{Direction, MetricKind, MonitorSettings, RouterConfig, Snapshot};

use crate::cli::{BandwidthArgs, GlobalOpts};
use crate::error::CliError;
use crate::output;

use super::util;

/// Rates for one interface, in bytes per second.
#[derive(Debug, Serialize)]
pub struct InterfaceRates {
    pub interface: String,
    pub download: Option<f64>,
    pub upload: Option<f64>,
}

impl InterfaceRates {
    pub fn from_snapshot(snapshot: &Snapshot) -> Vec<Self> {
        snapshot
            .interfaces()
            .map(|iface| Self {
                interface: iface.to_owned(),
                download: snapshot.rate(iface, Direction::Download),
                upload: snapshot.rate(iface, Direction::Upload),
            })
            .collect()
    }
}

#[derive(Tabled)]
struct RateRow {
    #[tabled(rename = "Interface")]
    interface: String,
    #[tabled(rename = "Download")]
    download: String,
    #[tabled(rename = "Upload")]
    upload: String,
}

fn rate_cell(rate: Option<f64>) -> String {
    rate.map_or_else(|| "-".to_owned(), output::format_rate)
}

pub async fn handle(
    router: &RouterConfig,
    args: BandwidthArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let interfaces = if args.interfaces.is_empty() {
        router.monitor.interfaces.clone()
    } else {
        args.interfaces
    };
    if interfaces.is_empty() {
        return Err(CliError::Validation {
            field: "interfaces".into(),
            reason: "no interfaces given and the profile lists none".into(),
        });
    }

    let settings = MonitorSettings {
        metrics: BTreeSet::from([MetricKind::Bandwidth]),
        interfaces,
        ..router.monitor.clone()
    };
    let snapshot = util::with_router(router, settings, |c| async move { c.refresh().await }).await?;
    let rates = InterfaceRates::from_snapshot(&snapshot);

    let out = output::render_list(
        global.output,
        &rates,
        |r| RateRow {
            interface: r.interface.clone(),
            download: rate_cell(r.download),
            upload: rate_cell(r.upload),
        },
        |r| {
            format!(
                "{}\t{}\t{}",
                r.interface,
                r.download.map(|v| format!("{v:.0}")).unwrap_or_default(),
                r.upload.map(|v| format!("{v:.0}")).unwrap_or_default(),
            )
        },
    )?;
    output::print_output(&out, global.quiet);
    Ok(())
}
