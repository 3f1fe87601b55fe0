//! `wrtmon info`: device identity.

use std::fmt::Write;

use wrtmon_core::{DeviceIdentity, MonitorSettings, RouterConfig};

use crate::cli::GlobalOpts;
use crate::error::CliError;
use crate::output;

use super::util;

pub async fn handle(router: &RouterConfig, global: &GlobalOpts) -> Result<(), CliError> {
    let identity = util::with_router(router, MonitorSettings::default(), |c| async move {
        c.device_info().await
    })
    .await?;

    let color = output::should_color(global.color);
    let out = output::render_single(
        global.output,
        identity.as_ref(),
        |id| detail(id, color),
        |id| id.sw_version.clone(),
    )?;
    output::print_output(&out, global.quiet);
    Ok(())
}

fn detail(identity: &DeviceIdentity, color: bool) -> String {
    let mut out = String::new();
    let rows = [
        ("Name", Some(identity.name.as_str())),
        ("Model", Some(identity.model.as_str())),
        ("Firmware", Some(identity.sw_version.as_str())),
        ("Hostname", identity.hostname.as_deref()),
        ("URL", Some(identity.configuration_url.as_str())),
        ("ID", Some(identity.unique_id.as_str())),
    ];
    for (name, value) in rows {
        let value = value.map_or_else(|| output::unavailable(color), ToOwned::to_owned);
        let _ = writeln!(out, "{:<10} {value}", output::label(name, color));
    }
    out.trim_end().to_owned()
}
