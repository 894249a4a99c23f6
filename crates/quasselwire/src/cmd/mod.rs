use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Subcommand};

use crate::exit::{CliError, CliResult, USAGE};
use crate::output::OutputFormat;

pub mod connect;
pub mod decode;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Log in to a core and print its notifications until interrupted.
    Connect(ConnectArgs),
    /// Decode a captured stream of frames.
    Decode(DecodeArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Connect(args) => connect::run(args, format),
        Command::Decode(args) => decode::run(args, format),
        Command::Version(args) => version::run(args),
    }
}

#[derive(Args, Debug)]
pub struct ConnectArgs {
    /// Core address (host:port).
    pub addr: String,
    /// Core account name.
    #[arg(long, short = 'u', env = "QUASSEL_USER")]
    pub user: String,
    /// Core account password.
    #[arg(long, short = 'p', env = "QUASSEL_PASSWORD", hide_env_values = true)]
    pub password: String,
    /// Heartbeat period once logged in (e.g. 120s, 500ms).
    #[arg(long, default_value = "120s", conflicts_with = "no_heartbeat")]
    pub heartbeat: String,
    /// Do not send heartbeats.
    #[arg(long)]
    pub no_heartbeat: bool,
    /// Backlog messages requested per buffer at login.
    #[arg(long, default_value = "50")]
    pub backlog_limit: i32,
}

#[derive(Args, Debug)]
pub struct DecodeArgs {
    /// Capture file: length-prefixed frames as sent by a core.
    pub file: PathBuf,
    /// Maximum nesting depth accepted per value.
    #[arg(long, default_value = "64")]
    pub max_depth: usize,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}

pub(crate) fn parse_duration(input: &str) -> CliResult<Duration> {
    let input = input.trim();
    if input.is_empty() {
        return Err(CliError::new(USAGE, "duration must not be empty"));
    }

    let (number, millis) = if let Some(num) = input.strip_suffix("ms") {
        (num, true)
    } else if let Some(num) = input.strip_suffix('s') {
        (num, false)
    } else {
        (input, false)
    };

    let value: u64 = number
        .parse()
        .map_err(|_| CliError::new(USAGE, format!("invalid duration value: {input}")))?;
    if value == 0 {
        return Err(CliError::new(USAGE, "duration must be greater than zero"));
    }

    Ok(if millis {
        Duration::from_millis(value)
    } else {
        Duration::from_secs(value)
    })
}
