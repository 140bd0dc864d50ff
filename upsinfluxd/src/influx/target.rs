//
// Copyright (c) Memfault, Inc.
// See License.txt for details
use std::{fmt::Display, str::FromStr};

use eyre::{eyre, Context, Error, Result};
use itertools::{Either, Itertools};
use reqwest::blocking::Client;

/// An InfluxDB (v1 HTTP API) database to publish to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InfluxTarget {
    host: String,
    port: u16,
    database: String,
}

impl InfluxTarget {
    pub fn new(host: &str, port: u16, database: &str) -> Self {
        Self {
            host: host.to_string(),
            port,
            database: database.to_string(),
        }
    }

    fn query_url(&self) -> String {
        format!("http://{}:{}/query", self.host, self.port)
    }

    fn write_url(&self) -> String {
        format!(
            "http://{}:{}/write?db={}",
            self.host,
            self.port,
            urlencoding::encode(&self.database)
        )
    }

    /// Creates the database. InfluxDB treats this as a no-op when it already exists.
    pub fn create_database(&self, client: &Client) -> Result<()> {
        let query = format!(
            "CREATE DATABASE \"{}\"",
            self.database.replace('"', "\\\"")
        );
        client
            .post(self.query_url())
            .form(&[("q", query)])
            .send()
            .and_then(|r| r.error_for_status())
            .wrap_err_with(|| format!("Unable to create database on {}", self))?;
        Ok(())
    }

    /// Writes line protocol `body` to the database.
    pub fn write(&self, client: &Client, body: &str) -> Result<()> {
        client
            .post(self.write_url())
            .body(body.to_string())
            .send()
            .and_then(|r| r.error_for_status())
            .wrap_err_with(|| format!("Unable to write to {}", self))?;
        Ok(())
    }
}

impl Display for InfluxTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}/{}", self.host, self.port, self.database)
    }
}

impl FromStr for InfluxTarget {
    type Err = Error;

    /// Parses `host:port:database`.
    fn from_str(s: &str) -> Result<Self> {
        match s.split(':').collect::<Vec<_>>().as_slice() {
            [host, port, database] if !host.is_empty() && !database.is_empty() => {
                let port = port
                    .parse()
                    .wrap_err_with(|| format!("Invalid port in InfluxDB target {:?}", s))?;
                Ok(Self::new(host, port, database))
            }
            _ => Err(eyre!(
                "Invalid InfluxDB target {:?}, expected host:port:database",
                s
            )),
        }
    }
}

/// Parses a whitespace separated list of targets. Returns the valid targets
/// and one error message per rejected entry.
pub fn parse_targets(list: &str) -> (Vec<InfluxTarget>, Vec<String>) {
    list.split_whitespace()
        .partition_map(|entry| match entry.parse::<InfluxTarget>() {
            Ok(target) => Either::Left(target),
            Err(e) => Either::Right(format!("{:#}", e)),
        })
}
