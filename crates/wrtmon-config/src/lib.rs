//! Router profiles for wrtmon.
//!
//! TOML profiles, password resolution (env + keyring + plaintext), and
//! translation to `wrtmon_core::RouterConfig`. The CLI layers its
//! flag overrides on top.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use wrtmon_core::{ActionKind, MetricKind, MonitorSettings, RouterConfig, TlsVerification};

/// Keyring service name; entries are keyed `<profile>/password`.
pub const KEYRING_SERVICE: &str = "wrtmon";
/// Environment variable consulted for a password after `password_env`.
pub const PASSWORD_ENV: &str = "WRTMON_PASSWORD";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("no router profile named '{name}'")]
    UnknownRouter { name: String },

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Config {
    /// Profile used when `--router` is not given.
    pub default_router: Option<String>,

    /// Global defaults.
    #[serde(default)]
    pub defaults: Defaults,

    /// Named router profiles.
    #[serde(default)]
    pub routers: BTreeMap<String, Profile>,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct Defaults {
    #[serde(default = "default_output")]
    pub output: String,

    /// Per-call timeout in seconds for profiles that don't set one.
    #[serde(default = "default_timeout")]
    pub timeout: u64,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            output: default_output(),
            timeout: default_timeout(),
        }
    }
}

fn default_output() -> String {
    "table".into()
}
fn default_timeout() -> u64 {
    5
}

/// A named router profile.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Profile {
    /// Display name (defaults to the profile key).
    pub name: Option<String>,

    /// Router address, optionally with `:port`.
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_username")]
    pub username: String,

    /// Plaintext password; prefer the keyring or an env var.
    pub password: Option<String>,

    /// Environment variable name containing the password.
    pub password_env: Option<String>,

    /// Use HTTPS.
    #[serde(default)]
    pub tls: bool,

    /// Verify the router certificate when `tls` is set.
    #[serde(default)]
    pub verify_tls: bool,

    /// Path to custom CA certificate.
    pub ca_cert: Option<PathBuf>,

    /// Seconds between refresh cycles.
    #[serde(default = "default_scan_interval")]
    pub scan_interval: u64,

    /// Override the per-call timeout.
    pub timeout: Option<u64>,

    /// Metric families to poll.
    #[serde(default = "default_sensors")]
    pub sensors: Vec<MetricKind>,

    /// Interfaces sampled by the bandwidth sensor.
    #[serde(default = "default_bandwidth_interfaces")]
    pub bandwidth_interfaces: Vec<String>,

    /// Actions this profile may trigger.
    #[serde(default)]
    pub buttons: Vec<ActionKind>,
}

impl Default for Profile {
    fn default() -> Self {
        Self {
            name: None,
            host: default_host(),
            username: default_username(),
            password: None,
            password_env: None,
            tls: false,
            verify_tls: false,
            ca_cert: None,
            scan_interval: default_scan_interval(),
            timeout: None,
            sensors: default_sensors(),
            bandwidth_interfaces: default_bandwidth_interfaces(),
            buttons: Vec::new(),
        }
    }
}

fn default_host() -> String {
    "192.168.1.1".into()
}
fn default_username() -> String {
    "root".into()
}
fn default_scan_interval() -> u64 {
    5
}
fn default_sensors() -> Vec<MetricKind> {
    vec![MetricKind::DevicesCount, MetricKind::Bandwidth]
}
fn default_bandwidth_interfaces() -> Vec<String> {
    vec!["wan".into(), "br-lan".into()]
}

impl Profile {
    /// Reject values the coordinator cannot work with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.host.trim().is_empty() {
            return Err(ConfigError::Validation {
                field: "host".into(),
                reason: "must not be empty".into(),
            });
        }
        if self.scan_interval < 1 {
            return Err(ConfigError::Validation {
                field: "scan_interval".into(),
                reason: format!("must be at least 1 second, got {}", self.scan_interval),
            });
        }
        if self.timeout == Some(0) {
            return Err(ConfigError::Validation {
                field: "timeout".into(),
                reason: "must be at least 1 second".into(),
            });
        }
        Ok(())
    }
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("dev", "wrtmon", "wrtmon").map_or_else(
        || {
            let mut p = dirs_fallback();
            p.push("config.toml");
            p
        },
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("wrtmon");
    p
}

// ── Config loading ──────────────────────────────────────────────────

/// Load the full Config from the canonical file + environment.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

/// Load from an explicit file path (missing files are fine) + environment.
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    debug!(path = %path.display(), "loading config");
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed("WRTMON_").split("__"));

    let config: Config = figment.extract()?;
    Ok(config)
}

/// Parse config from a TOML string, without the environment layer.
pub fn parse_config(toml_str: &str) -> Result<Config, ConfigError> {
    let config: Config = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::string(toml_str))
        .extract()?;
    Ok(config)
}

// ── Config saving ───────────────────────────────────────────────────

/// Serialize config to TOML and write to the canonical config path.
pub fn save_config(cfg: &Config) -> Result<(), ConfigError> {
    save_config_to(cfg, &config_path())
}

pub fn save_config_to(cfg: &Config, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(path, toml_str)?;
    Ok(())
}

// ── Credential resolution ───────────────────────────────────────────

/// Resolve a profile's password from the credential chain.
///
/// Order: `password_env` → `WRTMON_PASSWORD` → keyring → plaintext → empty.
/// Fresh OpenWrt installs have a password-less root, so nothing is an error.
pub fn resolve_password(profile: &Profile, profile_name: &str) -> SecretString {
    resolve_password_with(
        profile,
        profile_name,
        |var| std::env::var(var).ok(),
        keyring_password,
    )
}

/// [`resolve_password`] with injectable env and keyring lookups.
pub fn resolve_password_with(
    profile: &Profile,
    profile_name: &str,
    env: impl Fn(&str) -> Option<String>,
    keyring: impl Fn(&str) -> Option<String>,
) -> SecretString {
    // 1. Profile's password_env → env var lookup
    if let Some(pw) = profile.password_env.as_deref().and_then(&env) {
        return SecretString::from(pw);
    }

    // 2. Global env var
    if let Some(pw) = env(PASSWORD_ENV) {
        return SecretString::from(pw);
    }

    // 3. System keyring
    if let Some(pw) = keyring(profile_name) {
        return SecretString::from(pw);
    }

    // 4. Plaintext in config
    if let Some(ref pw) = profile.password {
        return SecretString::from(pw.clone());
    }

    debug!(profile = profile_name, "no password configured, using empty");
    SecretString::from(String::new())
}

fn keyring_password(profile_name: &str) -> Option<String> {
    keyring::Entry::new(KEYRING_SERVICE, &format!("{profile_name}/password"))
        .ok()?
        .get_password()
        .ok()
}

// ── Translation to core config ──────────────────────────────────────

/// Build a `RouterConfig` from a profile, without CLI flag overrides.
pub fn profile_to_router_config(
    profile: &Profile,
    profile_name: &str,
    password: SecretString,
    default_timeout: u64,
) -> Result<RouterConfig, ConfigError> {
    profile.validate()?;

    let tls = match (profile.verify_tls, &profile.ca_cert) {
        (false, _) => TlsVerification::DangerAcceptInvalid,
        (true, Some(ca_path)) => TlsVerification::CustomCa(ca_path.clone()),
        (true, None) => TlsVerification::SystemDefaults,
    };

    let monitor = MonitorSettings {
        metrics: profile.sensors.iter().copied().collect(),
        interfaces: profile
            .bandwidth_interfaces
            .iter()
            .map(|iface| iface.trim().to_owned())
            .filter(|iface| !iface.is_empty())
            .collect(),
        actions: profile.buttons.iter().copied().collect::<BTreeSet<_>>(),
        refresh_interval: Duration::from_secs(profile.scan_interval),
    };

    Ok(RouterConfig {
        id: profile_name.to_owned(),
        name: profile
            .name
            .clone()
            .unwrap_or_else(|| profile_name.to_owned()),
        host: profile.host.trim().to_owned(),
        use_tls: profile.tls,
        username: profile.username.clone(),
        password,
        tls,
        timeout: Duration::from_secs(profile.timeout.unwrap_or(default_timeout)),
        monitor,
    })
}

impl Config {
    /// Profile name to use when none is requested explicitly: the
    /// configured default, else the only profile if there is exactly one.
    pub fn default_router_name(&self) -> Option<&str> {
        if let Some(name) = self.default_router.as_deref() {
            return Some(name);
        }
        match self.routers.keys().collect::<Vec<_>>().as_slice() {
            [only] => Some(only.as_str()),
            _ => None,
        }
    }

    /// Resolve a named profile into a `RouterConfig`, password included.
    pub fn router_config(&self, name: &str) -> Result<RouterConfig, ConfigError> {
        let profile = self
            .routers
            .get(name)
            .ok_or_else(|| ConfigError::UnknownRouter { name: name.into() })?;
        let password = resolve_password(profile, name);
        profile_to_router_config(profile, name, password, self.defaults.timeout)
    }
}
