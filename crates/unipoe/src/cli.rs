//! Clap derive structures for the `unipoe` binary.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use unipoe_core::{IdentityKey, MacAddress, PortMode};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// unipoe -- UniFi switch PoE ports as on/off entities
#[derive(Debug, Parser)]
#[command(
    name = "unipoe",
    version,
    about = "Control UniFi switch PoE ports as on/off entities",
    long_about = "Polls a UniFi Network controller, keeps one on/off entity per \
        configured switch port, and writes toggles back as PoE overrides or \
        power-cycle commands.",
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
    /// Config file (defaults to the platform config directory)
    #[arg(long, short = 'c', env = "UNIPOE_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Log line format
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    /// Human-readable lines
    Text,
    /// One JSON object per line
    Json,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Pretty table
    Table,
    /// Pretty-printed JSON
    Json,
}

// ── Commands ─────────────────────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Poll the controller and keep entities in sync until interrupted
    Run,

    /// Run one reconciliation pass and print the tracked entities
    #[command(alias = "ls")]
    List(ListArgs),

    /// Switch one configured port on or off
    Set(SetArgs),
}

#[derive(Debug, Args)]
pub struct ListArgs {
    /// Output format
    #[arg(long, short = 'o', default_value = "table")]
    pub output: OutputFormat,
}

#[derive(Debug, Args)]
pub struct SetArgs {
    /// Switch MAC address
    pub mac: String,

    /// Port index (1-based)
    pub port: u32,

    /// Target state
    pub state: SwitchState,

    /// Address the power-cycle entity of this port instead of the PoE one
    #[arg(long)]
    pub power_cycle: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SwitchState {
    On,
    Off,
}

impl SetArgs {
    pub fn key(&self) -> IdentityKey {
        let mode = if self.power_cycle {
            PortMode::PowerCycle
        } else {
            PortMode::Auto
        };
        IdentityKey::new(MacAddress::new(&self.mac), self.port, mode)
    }

    pub fn on(&self) -> bool {
        self.state == SwitchState::On
    }
}
