//! Command dispatch: bridges CLI args -> coordinator calls -> output formatting.

pub mod bandwidth;
pub mod clients;
pub mod config_cmd;
pub mod info;
pub mod reboot;
pub mod util;
pub mod watch;

use wrtmon_core::RouterConfig;

use crate::cli::{Command, GlobalOpts};
use crate::error::CliError;

/// Dispatch a router-bound command to the appropriate handler.
pub async fn dispatch(
    cmd: Command,
    router: RouterConfig,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    match cmd {
        Command::Info => info::handle(&router, global).await,
        Command::Clients => clients::handle(&router, global).await,
        Command::Bandwidth(args) => bandwidth::handle(&router, args, global).await,
        Command::Reboot => reboot::handle(&router, global).await,
        Command::Watch(args) => watch::handle(router, args, global).await,
        // Config and Completions are handled before dispatch
        Command::Config(_) | Command::Completions(_) => Err(CliError::Internal(
            "local command dispatched to a router".into(),
        )),
    }
}
