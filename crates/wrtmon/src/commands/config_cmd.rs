//! Config subcommand handlers.

use serde::Serialize;
use tabled::Tabled;

use wrtmon_config::KEYRING_SERVICE;

use crate::cli::{ConfigArgs, ConfigCommand, GlobalOpts};
use crate::config::{self, Config, Profile};
use crate::error::CliError;
use crate::output;

const REDACTED: &str = "****";

// ── Helpers ─────────────────────────────────────────────────────────

/// Replace plaintext passwords so the config is safe to print.
fn redact(mut cfg: Config) -> Config {
    for profile in cfg.routers.values_mut() {
        if profile.password.is_some() {
            profile.password = Some(REDACTED.into());
        }
    }
    cfg
}

fn keyring_err(e: impl std::fmt::Display) -> CliError {
    CliError::Validation {
        field: "keyring".into(),
        reason: e.to_string(),
    }
}

#[derive(Serialize)]
struct ProfileSummary {
    name: String,
    default: bool,
    host: String,
    username: String,
    tls: bool,
    scan_interval: u64,
    sensors: Vec<String>,
    buttons: Vec<String>,
}

impl ProfileSummary {
    fn new(name: &str, profile: &Profile, default: Option<&str>) -> Self {
        Self {
            name: name.to_owned(),
            default: default == Some(name),
            host: profile.host.clone(),
            username: profile.username.clone(),
            tls: profile.tls,
            scan_interval: profile.scan_interval,
            sensors: profile.sensors.iter().map(ToString::to_string).collect(),
            buttons: profile.buttons.iter().map(ToString::to_string).collect(),
        }
    }
}

#[derive(Tabled)]
struct ProfileRow {
    #[tabled(rename = "Profile")]
    name: String,
    #[tabled(rename = "Host")]
    host: String,
    #[tabled(rename = "User")]
    username: String,
    #[tabled(rename = "Interval")]
    interval: String,
    #[tabled(rename = "Sensors")]
    sensors: String,
    #[tabled(rename = "Buttons")]
    buttons: String,
}

impl From<&ProfileSummary> for ProfileRow {
    fn from(p: &ProfileSummary) -> Self {
        let scheme = if p.tls { "https" } else { "http" };
        Self {
            name: if p.default {
                format!("{} *", p.name)
            } else {
                p.name.clone()
            },
            host: format!("{scheme}://{}", p.host),
            username: p.username.clone(),
            interval: format!("{}s", p.scan_interval),
            sensors: p.sensors.join(", "),
            buttons: p.buttons.join(", "),
        }
    }
}

// ── Handler ─────────────────────────────────────────────────────────

pub fn handle(args: ConfigArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        ConfigCommand::Path => {
            output::print_output(&config::config_path().display().to_string(), global.quiet);
            Ok(())
        }

        ConfigCommand::Show => {
            let cfg = redact(config::load_config()?);
            let out = output::render_single(
                global.output,
                &cfg,
                |c| toml::to_string_pretty(c).unwrap_or_else(|e| format!("<unrenderable: {e}>")),
                |c| c.routers.keys().cloned().collect::<Vec<_>>().join("\n"),
            )?;
            output::print_output(out.trim_end(), global.quiet);
            Ok(())
        }

        ConfigCommand::Profiles => {
            let cfg = config::load_config()?;
            if cfg.routers.is_empty() {
                if !global.quiet {
                    eprintln!(
                        "No router profiles configured. Add [routers.<name>] to {}",
                        config::config_path().display()
                    );
                }
                return Ok(());
            }
            let default = cfg.default_router_name();
            let profiles: Vec<ProfileSummary> = cfg
                .routers
                .iter()
                .map(|(name, profile)| ProfileSummary::new(name, profile, default))
                .collect();

            let out = output::render_list(
                global.output,
                &profiles,
                |p| ProfileRow::from(p),
                |p| p.name.clone(),
            )?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        ConfigCommand::Use { name } => {
            let mut cfg = config::load_config()?;
            if !cfg.routers.contains_key(&name) {
                return Err(config::profile_not_found(&name, &cfg));
            }

            cfg.default_router = Some(name.clone());
            config::save_config(&cfg)?;
            if !global.quiet {
                eprintln!("Default router set to '{name}'");
            }
            Ok(())
        }

        ConfigCommand::SetPassword { profile } => {
            let cfg = config::load_config()?;
            let profile_name = profile
                .or_else(|| config::active_profile_name(global, &cfg))
                .ok_or_else(|| CliError::Validation {
                    field: "profile".into(),
                    reason: "no active profile; pass --profile <name>".into(),
                })?;

            if !cfg.routers.contains_key(&profile_name) {
                return Err(config::profile_not_found(&profile_name, &cfg));
            }

            let secret = dialoguer::Password::new()
                .with_prompt(format!("Password for '{profile_name}'"))
                .allow_empty_password(false)
                .interact()
                .map_err(|e| CliError::Io(std::io::Error::other(e)))?;

            keyring::Entry::new(KEYRING_SERVICE, &format!("{profile_name}/password"))
                .map_err(keyring_err)?
                .set_password(&secret)
                .map_err(keyring_err)?;

            if !global.quiet {
                eprintln!("Password stored in system keyring for profile '{profile_name}'");
            }
            Ok(())
        }
    }
}
