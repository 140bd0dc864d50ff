//
// Copyright (c) Memfault, Inc.
// See License.txt for details
//! Client for the apcupsd Network Information Server (NIS).
use std::io;

use thiserror::Error;

mod client;
pub use client::{Exchange, NisClient, NisConnector, TcpConnector};

pub mod frame;
pub use frame::FrameError;

pub mod status;
pub use status::{parse_status_lines, parse_timestamp, ParseError, StatusSnapshot};

/// Port apcupsd's NIS listens on unless configured otherwise.
pub const DEFAULT_NIS_PORT: u16 = 3551;

#[derive(Debug, Error)]
pub enum NisError {
    #[error("Unable to connect to NIS at {endpoint}: {source}")]
    Connection {
        endpoint: String,
        #[source]
        source: io::Error,
    },
    #[error("NIS I/O error: {0}")]
    Io(#[from] io::Error),
    #[error(transparent)]
    Frame(#[from] FrameError),
    #[error(transparent)]
    Parse(#[from] ParseError),
}
