//
// Copyright (c) Memfault, Inc.
// See License.txt for details
//! Publishing of UPS status to InfluxDB.
//!
//! A status snapshot is turned into one `smartups` point in line protocol
//! and POSTed to every configured database. A failing database never keeps
//! the point from reaching the others.
use std::{io::Write, time::Duration};

use eyre::{eyre, Result};
use log::{debug, error, info, warn};
use reqwest::blocking::Client;

mod line;
pub use line::{FieldValue, Line};

mod sample;
pub use sample::{line_from_status, SampleError, FIELD_MAPPING, MEASUREMENT};

mod target;
pub use target::{parse_targets, InfluxTarget};

use crate::progress::Progress;

/// Destination of rendered measurement lines.
pub trait LinePublisher {
    /// Delivers `line` everywhere it can. Returns the number of successful deliveries.
    fn publish(&mut self, line: &str) -> usize;
}

pub struct InfluxPublisher<W: Write> {
    client: Client,
    targets: Vec<InfluxTarget>,
    progress: Progress<W>,
}

impl<W: Write> InfluxPublisher<W> {
    /// Creates the database of every target. Targets that cannot be
    /// initialized are dropped. Fails when none are left.
    pub fn initialize(
        targets: Vec<InfluxTarget>,
        timeout: Option<Duration>,
        progress: Progress<W>,
    ) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;

        let targets: Vec<InfluxTarget> = targets
            .into_iter()
            .filter(|target| match target.create_database(&client) {
                Ok(()) => {
                    info!("Publishing to {}", target);
                    true
                }
                Err(e) => {
                    error!("Dropping InfluxDB instance {}: {:#}", target, e);
                    false
                }
            })
            .collect();

        if targets.is_empty() {
            return Err(eyre!("No InfluxDB instance to send to."));
        }

        Ok(Self {
            client,
            targets,
            progress,
        })
    }

    pub fn targets(&self) -> &[InfluxTarget] {
        &self.targets
    }
}

impl<W: Write> LinePublisher for InfluxPublisher<W> {
    fn publish(&mut self, line: &str) -> usize {
        let mut delivered = 0;
        for target in &self.targets {
            match target.write(&self.client, line) {
                Ok(()) => {
                    delivered += 1;
                    if let Err(e) = self.progress.mark() {
                        debug!("Unable to write progress: {}", e);
                    }
                }
                Err(e) => warn!("{:#}", e),
            }
        }
        delivered
    }
}
