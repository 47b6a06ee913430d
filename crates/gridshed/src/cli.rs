//! Clap derive structures for the `gridshed` CLI.
//!
//! Defines the command tree, global flags, and shared argument types.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// gridshed -- grid-status poller for Enphase Envoy sites
#[derive(Debug, Parser)]
#[command(
    name = "gridshed",
    version,
    about = "Poll an Envoy gateway for grid and battery status",
    long_about = "Polls an Enphase Envoy gateway for ensemble inventory, reduces it to\n\
        grid status and battery charge levels, and reacts when the utility grid\n\
        goes down. Cloud credentials and the current bearer token live in a\n\
        local store file; token renewal and gateway session bootstrap happen\n\
        automatically.",
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
pub struct GlobalOpts {
    /// Path to the credential store file
    #[arg(long, short = 'c', env = "GRIDSHED_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Accept the gateway's self-signed TLS certificate
    #[arg(long, short = 'k', env = "GRIDSHED_INSECURE", global = true)]
    pub insecure: bool,

    /// Request timeout in seconds
    #[arg(long, env = "GRIDSHED_TIMEOUT", default_value = "30", global = true)]
    pub timeout: u64,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,
}

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Poll the gateway on an interval and react to grid loss
    #[command(alias = "w")]
    Watch(WatchArgs),

    /// Run one poll cycle and print the summary
    #[command(alias = "st")]
    Status,

    /// Show the current cloud token and its validity window
    Token,

    /// Force a fresh cloud login and persist the new token
    Login,

    /// Dump every read-only gateway endpoint as one JSON document
    Snapshot(SnapshotArgs),

    /// Manage the credential store
    Config(ConfigArgs),
}

// ── Watch ────────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct WatchArgs {
    /// Seconds between poll cycles
    #[arg(long, short = 'i', env = "GRIDSHED_INTERVAL", default_value = "10")]
    pub interval: u64,
}

// ── Snapshot ─────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct SnapshotArgs {
    /// Write the snapshot to a file instead of stdout
    #[arg(long, short = 'o')]
    pub output: Option<PathBuf>,
}

// ── Config ───────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Create the credential store and log in for an initial token
    Init(ConfigInitArgs),

    /// Print the store contents (password redacted)
    Show,

    /// Print the store file path
    Path,
}

#[derive(Debug, Args)]
pub struct ConfigInitArgs {
    /// Cloud account email
    #[arg(long)]
    pub username: String,

    /// Cloud account password (prompted if omitted)
    #[arg(long, env = "GRIDSHED_PASSWORD", hide_env = true)]
    pub password: Option<String>,

    /// Gateway serial number
    #[arg(long)]
    pub serial: String,

    /// Gateway hostname or address on the local network
    #[arg(long)]
    pub envoy: String,

    /// Cloud site identifier
    #[arg(long)]
    pub site_id: String,
}
