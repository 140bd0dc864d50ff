//
// Copyright (c) Memfault, Inc.
// See License.txt for details
use std::{
    cmp::min,
    ffi::c_int,
    io::stdout,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    thread::sleep,
    time::{Duration, Instant},
};

use eyre::{Context, Result};
use log::{debug, error, info, trace, warn};
use signal_hook::consts::{SIGINT, SIGTERM};

use crate::{
    config::Config,
    influx::{line_from_status, InfluxPublisher, LinePublisher},
    nis::{NisClient, NisConnector, TcpConnector},
    progress::Progress,
};

/// Longest stretch the poll loop sleeps without checking for termination.
const SLEEP_SLICE: Duration = Duration::from_millis(250);

pub fn upsinfluxd_main(config: Config) -> Result<()> {
    let term = register_term_flag(&[SIGINT, SIGTERM])?;

    for rejected in &config.rejected_influx_targets {
        error!("Ignoring InfluxDB target: {}", rejected);
    }

    let mut publisher = InfluxPublisher::initialize(
        config.influx_targets.clone(),
        config.io_timeout,
        Progress::new(stdout()),
    )?;

    let connector =
        TcpConnector::new(&config.nis_host, config.nis_port).with_timeout(config.io_timeout);
    let mut client = NisClient::with_connector(connector).wrap_err("Unable to reach the UPS")?;
    info!(
        "Polling {}:{} every {}s",
        config.nis_host,
        config.nis_port,
        config.poll_interval.as_secs()
    );

    run_loop(&mut client, &mut publisher, config.poll_interval, || {
        term.load(Ordering::Relaxed)
    });

    info!("upsinfluxd shutting down...");
    Ok(())
}

/// Returns a flag set by the first of `signals`. A second signal while the
/// flag is set exits right away, in case the loop is stuck in a socket call.
fn register_term_flag(signals: &[c_int]) -> Result<Arc<AtomicBool>> {
    let term = Arc::new(AtomicBool::new(false));
    for &signal in signals {
        // Registered first so it only sees the flag set by an earlier signal.
        signal_hook::flag::register_conditional_shutdown(signal, 1, Arc::clone(&term))?;
        signal_hook::flag::register(signal, Arc::clone(&term))?;
    }
    Ok(term)
}

/// Polls the UPS and publishes its status every `interval` until `should_stop`
/// returns true. A failing cycle is logged and does not end the loop.
pub fn run_loop<C, P, S>(
    client: &mut NisClient<C>,
    publisher: &mut P,
    interval: Duration,
    should_stop: S,
) where
    C: NisConnector,
    P: LinePublisher,
    S: Fn() -> bool,
{
    while !should_stop() {
        match poll_once(client, publisher) {
            Ok(delivered) => trace!("Status delivered to {} targets", delivered),
            Err(e) => warn!("Poll cycle failed: {:#}", e),
        }
        sleep_unless_stopped(interval, &should_stop);
    }
}

/// Fetches one status snapshot and publishes it. Returns the number of
/// targets that received it.
pub fn poll_once<C, P>(client: &mut NisClient<C>, publisher: &mut P) -> Result<usize>
where
    C: NisConnector,
    P: LinePublisher,
{
    let status = client.status(true)?;
    if status.is_empty() {
        // The connection was re-established during this exchange.
        debug!("Empty status report, skipping this cycle");
        return Ok(0);
    }

    let line = line_from_status(&status)?.to_string();
    trace!("{}", line);
    Ok(publisher.publish(&line))
}

fn sleep_unless_stopped<S: Fn() -> bool>(interval: Duration, should_stop: &S) {
    let deadline = Instant::now() + interval;
    while !should_stop() {
        let now = Instant::now();
        if now >= deadline {
            break;
        }
        sleep(min(deadline - now, SLEEP_SLICE));
    }
}
