//! Shared helpers for command handlers.

use std::future::Future;
use std::io::IsTerminal;

use wrtmon_core::{Coordinator, CoreError, MonitorSettings, RouterConfig, UbusRouter};

use crate::error::CliError;

/// Connect to the router, run `f` against a coordinator, then shut it down.
///
/// `settings` replaces the profile's monitor settings so a command only
/// polls what it prints.
pub async fn with_router<F, Fut, T>(
    router: &RouterConfig,
    settings: MonitorSettings,
    f: F,
) -> Result<T, CliError>
where
    F: FnOnce(Coordinator<UbusRouter>) -> Fut,
    Fut: Future<Output = Result<T, CoreError>>,
{
    let client = router.build_router()?;
    tracing::debug!(router = %router.id, host = %router.host, "connecting");
    Ok(Coordinator::oneshot(client, settings, f).await?)
}

/// Prompt for confirmation, auto-approving if `--yes` was passed.
///
/// Refuses to prompt when stdin is not a terminal.
pub fn confirm(message: &str, action: &str, yes_flag: bool) -> Result<bool, CliError> {
    if yes_flag {
        return Ok(true);
    }
    if !std::io::stdin().is_terminal() {
        return Err(CliError::NonInteractiveRequiresYes {
            action: action.into(),
        });
    }
    let confirmed = dialoguer::Confirm::new()
        .with_prompt(message)
        .default(false)
        .interact()
        .map_err(|e| CliError::Io(std::io::Error::other(e)))?;
    Ok(confirmed)
}
