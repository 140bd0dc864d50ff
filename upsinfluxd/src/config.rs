//
// Copyright (c) Memfault, Inc.
// See License.txt for details
use std::time::Duration;

use eyre::{eyre, Context, Result};
use log::LevelFilter;

use crate::{
    cli::UpsInfluxdArgs,
    influx::{parse_targets, InfluxTarget},
};

/// Numeric log level, on the 10 (debug) to 50 (critical) scale.
pub const DEBUGLEVEL_ENV: &str = "DEBUGLEVEL";
/// Space separated `host:port:database` InfluxDB targets.
pub const INFLUXDB_ENV: &str = "INFLUXDB";

/// Socket timeout applied to NIS and InfluxDB requests unless overridden.
pub const DEFAULT_IO_TIMEOUT_SECS: u64 = 30;

const DEFAULT_DEBUGLEVEL: u32 = 20;
const DEFAULT_INFLUXDB: &str = "localhost:8086:apcups";

/// Runtime configuration, assembled from the command line and the environment.
#[derive(Clone, Debug)]
pub struct Config {
    pub nis_host: String,
    pub nis_port: u16,
    pub log_level: LevelFilter,
    pub influx_targets: Vec<InfluxTarget>,
    /// Error messages for the `INFLUXDB` entries that could not be parsed.
    /// Reported once the logger is up.
    pub rejected_influx_targets: Vec<String>,
    pub poll_interval: Duration,
    /// Socket timeout for NIS and InfluxDB requests. `None` blocks forever.
    pub io_timeout: Option<Duration>,
}

impl Config {
    /// `env` looks up environment variables, `std::env::var(name).ok()` in production.
    pub fn from_args<F>(args: &UpsInfluxdArgs, env: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let log_level = if args.verbose {
            LevelFilter::Debug
        } else {
            match env(DEBUGLEVEL_ENV) {
                Some(level) => level
                    .trim()
                    .parse()
                    .map(level_filter_from_debuglevel)
                    .wrap_err_with(|| format!("Invalid {}={:?}", DEBUGLEVEL_ENV, level))?,
                None => level_filter_from_debuglevel(DEFAULT_DEBUGLEVEL),
            }
        };

        let targets = env(INFLUXDB_ENV).unwrap_or_else(|| DEFAULT_INFLUXDB.to_string());
        let (influx_targets, rejected_influx_targets) = parse_targets(&targets);
        if influx_targets.is_empty() {
            return Err(eyre!("No valid InfluxDB target in {}={:?}", INFLUXDB_ENV, targets));
        }

        if args.interval == 0 {
            return Err(eyre!("Poll interval must be at least one second"));
        }

        Ok(Self {
            nis_host: args.nis_host.clone(),
            nis_port: args.port,
            log_level,
            influx_targets,
            rejected_influx_targets,
            poll_interval: Duration::from_secs(args.interval),
            io_timeout: (args.timeout > 0).then(|| Duration::from_secs(args.timeout)),
        })
    }
}

/// Maps the 10/20/30/40/50 level scale to a [`LevelFilter`]. Everything below
/// debug is logged at trace.
pub fn level_filter_from_debuglevel(level: u32) -> LevelFilter {
    match level {
        0..=9 => LevelFilter::Trace,
        10..=19 => LevelFilter::Debug,
        20..=29 => LevelFilter::Info,
        30..=39 => LevelFilter::Warn,
        40..=50 => LevelFilter::Error,
        _ => LevelFilter::Off,
    }
}
