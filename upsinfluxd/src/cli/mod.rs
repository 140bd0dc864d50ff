//
// Copyright (c) Memfault, Inc.
// See License.txt for details
use std::{env, process};

use argh::FromArgs;
use eyre::Result;
use log::{error, LevelFilter};

use crate::{
    config::{Config, DEFAULT_IO_TIMEOUT_SECS},
    nis::DEFAULT_NIS_PORT,
    upsinfluxd::upsinfluxd_main,
};

/// Publish the status of an apcupsd-managed UPS to InfluxDB.
///
/// InfluxDB targets are read from the INFLUXDB environment variable
/// (space separated host:port:database, default localhost:8086:apcups) and
/// the log level from DEBUGLEVEL (10 debug to 50 critical, default 20).
#[derive(FromArgs)]
pub struct UpsInfluxdArgs {
    /// host running the apcupsd network information server
    #[argh(positional)]
    pub nis_host: String,

    /// port of the apcupsd network information server
    #[argh(option, short = 'p', default = "DEFAULT_NIS_PORT")]
    pub port: u16,

    /// seconds between two polls (default 5)
    #[argh(option, short = 'i', default = "5")]
    pub interval: u64,

    /// socket timeout in seconds for UPS and InfluxDB requests, 0 to wait
    /// forever (default 30)
    #[argh(option, short = 't', default = "DEFAULT_IO_TIMEOUT_SECS")]
    pub timeout: u64,

    /// log debug messages regardless of DEBUGLEVEL
    #[argh(switch, short = 'V')]
    pub verbose: bool,
}

fn init_logger(level: LevelFilter) -> Result<()> {
    let mut logger = stderrlog::new();
    logger
        .module("upsinfluxd")
        .timestamp(stderrlog::Timestamp::Second);
    match level.to_level() {
        Some(level) => logger.verbosity(level as usize - 1),
        None => logger.quiet(true),
    };
    logger.init()?;
    Ok(())
}

pub fn main() {
    let args: UpsInfluxdArgs = argh::from_env();

    let result = Config::from_args(&args, |name| env::var(name).ok()).and_then(|config| {
        init_logger(config.log_level)?;
        upsinfluxd_main(config)
    });

    if let Err(e) = result {
        // No-op when the logger is already set up.
        let _ = init_logger(LevelFilter::Error);
        error!("{:#}", e);
        process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn optional_arguments_have_defaults() {
        let args = UpsInfluxdArgs::from_args(&["upsinfluxd"], &["ups.local"]).unwrap();

        assert_eq!(args.nis_host, "ups.local");
        assert_eq!(args.port, DEFAULT_NIS_PORT);
        assert_eq!(args.interval, 5);
        assert_eq!(args.timeout, 30);
        assert!(!args.verbose);
    }

    #[test]
    fn zero_timeout_is_accepted() {
        let args =
            UpsInfluxdArgs::from_args(&["upsinfluxd"], &["-t", "0", "-i", "10", "ups.local"])
                .unwrap();

        assert_eq!(args.timeout, 0);
        assert_eq!(args.interval, 10);
    }
}
