//! CLI configuration -- thin wrapper around `wrtmon_config` shared types.
//!
//! Adds profile selection and `GlobalOpts` flag overrides (--host,
//! --username, --tls, ...) on top of the shared profile translation.

use strum::IntoEnumIterator;

use wrtmon_core::{ActionKind, RouterConfig};

use crate::cli::GlobalOpts;
use crate::error::CliError;

pub use wrtmon_config::{Config, Profile, config_path, load_config, save_config};

/// Profile id used when the router is described by flags alone.
const FLAG_PROFILE: &str = "default";

/// Resolve the active profile name from CLI flags and config.
pub fn active_profile_name(global: &GlobalOpts, config: &Config) -> Option<String> {
    global
        .router
        .clone()
        .or_else(|| config.default_router_name().map(ToOwned::to_owned))
}

/// Build the `RouterConfig` for this invocation.
///
/// Flag overrides take priority over profile values. Without any profile,
/// `--host` describes the router on its own and every action is allowed.
pub fn resolve_router_config(global: &GlobalOpts, config: &Config) -> Result<RouterConfig, CliError> {
    let (name, mut profile) = match active_profile_name(global, config) {
        Some(name) => {
            let Some(profile) = config.routers.get(&name) else {
                return Err(profile_not_found(&name, config));
            };
            (name, profile.clone())
        }
        None if global.host.is_some() => (
            FLAG_PROFILE.to_owned(),
            Profile {
                buttons: ActionKind::iter().collect(),
                ..Profile::default()
            },
        ),
        None => {
            return Err(CliError::Validation {
                field: "router".into(),
                reason: format!(
                    "no router profile configured; pass --host or add [routers.<name>] to {}",
                    config_path().display()
                ),
            });
        }
    };

    apply_overrides(&mut profile, global);

    let password = wrtmon_config::resolve_password(&profile, &name);
    Ok(wrtmon_config::profile_to_router_config(
        &profile,
        &name,
        password,
        config.defaults.timeout,
    )?)
}

fn apply_overrides(profile: &mut Profile, global: &GlobalOpts) {
    if let Some(ref host) = global.host {
        profile.host.clone_from(host);
    }
    if let Some(ref username) = global.username {
        profile.username.clone_from(username);
    }
    if global.tls {
        profile.tls = true;
    }
    if global.insecure {
        profile.verify_tls = false;
    }
    if let Some(timeout) = global.timeout {
        profile.timeout = Some(timeout);
    }
}

pub fn profile_not_found(name: &str, config: &Config) -> CliError {
    let available = if config.routers.is_empty() {
        "(none)".to_owned()
    } else {
        config.routers.keys().cloned().collect::<Vec<_>>().join(", ")
    };
    CliError::ProfileNotFound {
        name: name.to_owned(),
        available,
        path: config_path().display().to_string(),
    }
}
