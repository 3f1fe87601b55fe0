//! `wrtmon reboot`

use wrtmon_core::{ActionKind, MonitorSettings, RouterConfig};

use crate::cli::GlobalOpts;
use crate::error::CliError;

use super::util;

pub async fn handle(router: &RouterConfig, global: &GlobalOpts) -> Result<(), CliError> {
    if !router.monitor.allows(ActionKind::Reboot) {
        return Err(CliError::ActionDisabled {
            action: ActionKind::Reboot.to_string(),
            router: router.id.clone(),
        });
    }

    let prompt = format!("Reboot {} ({})?", router.name, router.host);
    if !util::confirm(&prompt, "reboot", global.yes)? {
        return Ok(());
    }

    let settings = MonitorSettings {
        actions: router.monitor.actions.clone(),
        ..MonitorSettings::default()
    };
    util::with_router(router, settings, |c| async move { c.trigger_reboot().await }).await?;

    if !global.quiet {
        eprintln!("Reboot requested for {}", router.name);
    }
    Ok(())
}
