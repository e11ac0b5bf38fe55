//! Command-line configuration.
//!
//! Flags are parsed once at startup and turned into an immutable
//! [`ScalingConfig`] plus database connection options.

use std::net::{SocketAddr, ToSocketAddrs};
use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, ValueEnum};
use sqlx::postgres::PgConnectOptions;
use thiserror::Error;

use runnerscale_autoscale::{ConfigError, ScalingConfig};

#[derive(Debug, Parser)]
#[command(
    name = "runnerscaled",
    about = "Scale PeerTube remote runners from the job queue",
    version
)]
pub struct Cli {
    /// Database host.
    #[arg(long, default_value = "localhost")]
    pub host: String,

    /// Database port.
    #[arg(long, default_value_t = 5432)]
    pub port: u16,

    /// Database user.
    #[arg(long, default_value = "peertube1")]
    pub user: String,

    /// Database password.
    #[arg(long, env = "RUNNERSCALE_DB_PASSWORD", default_value = "", hide_env_values = true)]
    pub password: String,

    /// Database name.
    #[arg(long = "db", default_value = "peertube1")]
    pub dbname: String,

    /// Scale up command. Receives RUNNER_NAME of the runner to create.
    #[arg(long)]
    pub up: PathBuf,

    /// Scale down command. Receives RUNNER_NAME of the runner to delete.
    #[arg(long)]
    pub down: PathBuf,

    /// Prefix of runner names managed by this autoscaler.
    #[arg(long, default_value = "runner")]
    pub runner_prefix: String,

    /// Minimum amount of runners.
    #[arg(long, default_value_t = 0)]
    pub min_runners: u32,

    /// Maximum amount of runners.
    #[arg(long, default_value_t = 1)]
    pub max_runners: u32,

    /// Minimum pending jobs before scaling up.
    #[arg(long, default_value_t = 10)]
    pub min_pending: u64,

    /// Reconcile interval in Go duration syntax (e.g. 30s, 5m, 1.5h, 1h30m).
    #[arg(long, default_value = "5m", value_parser = parse_duration)]
    pub reconcile: Duration,

    /// Metrics listen address. `:9042` listens on all interfaces.
    #[arg(long, default_value = ":9042", value_parser = parse_listen_address)]
    pub listen_address: SocketAddr,

    /// Kill a scale command that runs longer than this. Unset waits forever.
    #[arg(long, value_parser = parse_duration)]
    pub command_timeout: Option<Duration>,

    /// Log output format.
    #[arg(long, value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Text,
    Json,
}

impl Cli {
    /// Validated scaling configuration.
    pub fn scaling_config(&self) -> Result<ScalingConfig, ConfigError> {
        let config = ScalingConfig {
            min_runners: self.min_runners,
            max_runners: self.max_runners,
            min_pending: self.min_pending,
            runner_prefix: self.runner_prefix.clone(),
            up_command: self.up.clone(),
            down_command: self.down.clone(),
            command_timeout: self.command_timeout,
        };
        config.validate()?;
        Ok(config)
    }

    /// Connection options for the PeerTube database.
    pub fn connect_options(&self) -> PgConnectOptions {
        PgConnectOptions::new()
            .host(&self.host)
            .port(self.port)
            .username(&self.user)
            .password(&self.password)
            .database(&self.dbname)
    }
}

/// A flag value that could not be parsed.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CliError {
    #[error("invalid duration: {0}")]
    Duration(String),

    #[error("invalid listen address: {0}")]
    ListenAddress(String),
}

/// Nanoseconds per duration unit.
const DURATION_UNITS: [(&str, u128); 8] = [
    ("ns", 1),
    ("us", 1_000),
    ("µs", 1_000),
    ("μs", 1_000),
    ("ms", 1_000_000),
    ("s", 1_000_000_000),
    ("m", 60_000_000_000),
    ("h", 3_600_000_000_000),
];

/// Parse a duration such as `30s`, `5m`, `1h30m`, `1.5h` or `500us`.
///
/// Accepts the same unit suffixes and decimal fractions as Go's
/// `time.ParseDuration`. A bare integer is seconds. Zero is rejected.
pub fn parse_duration(s: &str) -> Result<Duration, CliError> {
    let s = s.trim();
    let invalid = || CliError::Duration(s.to_string());

    if let Ok(secs) = s.parse::<u64>() {
        return non_zero(Duration::from_secs(secs)).ok_or_else(invalid);
    }
    if s.is_empty() {
        return Err(invalid());
    }

    let mut total: u128 = 0;
    let mut rest = s;
    while !rest.is_empty() {
        let int_len = rest.find(|c: char| !c.is_ascii_digit()).unwrap_or(rest.len());
        let whole = &rest[..int_len];
        rest = &rest[int_len..];

        let mut frac = "";
        if let Some(after) = rest.strip_prefix('.') {
            let frac_len = after.find(|c: char| !c.is_ascii_digit()).unwrap_or(after.len());
            frac = &after[..frac_len];
            rest = &after[frac_len..];
        }
        if whole.is_empty() && frac.is_empty() {
            return Err(invalid());
        }

        let unit_len = rest
            .find(|c: char| c.is_ascii_digit() || c == '.')
            .unwrap_or(rest.len());
        let scale = DURATION_UNITS
            .iter()
            .find(|(unit, _)| *unit == &rest[..unit_len])
            .map(|(_, nanos)| *nanos)
            .ok_or_else(invalid)?;
        rest = &rest[unit_len..];

        let whole: u128 = if whole.is_empty() {
            0
        } else {
            whole.parse().map_err(|_| invalid())?
        };
        let mut nanos = whole.checked_mul(scale).ok_or_else(invalid)?;
        if !frac.is_empty() {
            // Digits past nanosecond precision of an hour cannot matter.
            let frac = &frac[..frac.len().min(18)];
            let digits: u128 = frac.parse().map_err(|_| invalid())?;
            nanos += digits * scale / 10u128.pow(frac.len() as u32);
        }
        total = total.checked_add(nanos).ok_or_else(invalid)?;
    }

    let nanos = u64::try_from(total).map_err(|_| invalid())?;
    non_zero(Duration::from_nanos(nanos)).ok_or_else(invalid)
}

fn non_zero(d: Duration) -> Option<Duration> {
    (!d.is_zero()).then_some(d)
}

/// Parse a listen address. A leading `:` means all interfaces.
pub fn parse_listen_address(s: &str) -> Result<SocketAddr, CliError> {
    let s = s.trim();
    let full = match s.strip_prefix(':') {
        Some(port) => format!("0.0.0.0:{port}"),
        None => s.to_string(),
    };
    if let Ok(addr) = full.parse::<SocketAddr>() {
        return Ok(addr);
    }
    full.to_socket_addrs()
        .ok()
        .and_then(|mut addrs| addrs.next())
        .ok_or_else(|| CliError::ListenAddress(s.to_string()))
}
