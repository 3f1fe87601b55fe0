//! Clap derive structures for the `wrtmon` CLI.
//!
//! Defines the command tree, global flags, and shared types.

use clap::{Args, Parser, Subcommand, ValueEnum};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// wrtmon -- monitor OpenWrt routers over ubus
#[derive(Debug, Parser)]
#[command(
    name = "wrtmon",
    version,
    about = "Monitor OpenWrt routers from the command line",
    long_about = "Polls OpenWrt routers through the rpcd/ubus JSON-RPC gateway.\n\n\
        Reports device identity, associated wireless clients, and realtime\n\
        interface bandwidth, and can trigger a reboot.",
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
#[allow(clippy::struct_excessive_bools)]
pub struct GlobalOpts {
    /// Router profile to use
    #[arg(long, short = 'r', env = "WRTMON_ROUTER", global = true)]
    pub router: Option<String>,

    /// Router address, optionally with :port (overrides profile)
    #[arg(long, short = 'H', env = "WRTMON_HOST", global = true)]
    pub host: Option<String>,

    /// Login user (overrides profile)
    #[arg(long, short = 'u', env = "WRTMON_USERNAME", global = true)]
    pub username: Option<String>,

    /// Connect over HTTPS
    #[arg(long, global = true)]
    pub tls: bool,

    /// Accept self-signed TLS certificates
    #[arg(long, short = 'k', env = "WRTMON_INSECURE", global = true)]
    pub insecure: bool,

    /// Per-call timeout in seconds
    #[arg(long, env = "WRTMON_TIMEOUT", global = true)]
    pub timeout: Option<u64>,

    /// Output format
    #[arg(
        long,
        short = 'o',
        env = "WRTMON_OUTPUT",
        default_value = "table",
        global = true
    )]
    pub output: OutputFormat,

    /// When to use color output
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorMode,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Skip confirmation prompts
    #[arg(long, short = 'y', global = true)]
    pub yes: bool,
}

// ── Output & Color Enums ─────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Pretty table (default, interactive)
    Table,
    /// Pretty-printed JSON
    Json,
    /// Compact single-line JSON
    JsonCompact,
    /// Plain text, one value per line (scripting)
    Plain,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum ColorMode {
    /// Auto-detect (color if terminal is interactive)
    Auto,
    /// Always emit color codes
    Always,
    /// Never emit color codes
    Never,
}

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Show router model, firmware and management URL
    Info,

    /// Count stations associated across all wireless interfaces
    #[command(alias = "cl")]
    Clients,

    /// Show current download/upload rates per interface
    #[command(alias = "bw")]
    Bandwidth(BandwidthArgs),

    /// Reboot the router
    Reboot,

    /// Poll continuously and print one line per refresh cycle
    Watch(WatchArgs),

    /// Inspect CLI configuration and profiles
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ── Command Arguments ────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct BandwidthArgs {
    /// Interfaces to sample (defaults to the profile's list)
    #[arg(value_name = "IFACE")]
    pub interfaces: Vec<String>,
}

#[derive(Debug, Args)]
pub struct WatchArgs {
    /// Seconds between cycles (overrides profile scan_interval)
    #[arg(long, short = 'i')]
    pub interval: Option<u64>,

    /// Stop after this many completed cycles
    #[arg(long, short = 'n')]
    pub count: Option<u64>,
}

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Print the config file location
    Path,

    /// Show the loaded configuration (passwords redacted)
    Show,

    /// List configured router profiles
    Profiles,

    /// Set the default router profile
    Use {
        /// Profile name to make the default
        name: String,
    },

    /// Store a router password in the system keyring
    SetPassword {
        /// Profile to store the password for (defaults to the active one)
        #[arg(long)]
        profile: Option<String>,
    },
}

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}
