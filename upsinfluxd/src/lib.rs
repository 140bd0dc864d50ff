#![deny(clippy::print_stdout, clippy::print_stderr)]
//
// Copyright (c) Memfault, Inc.
// See License.txt for details

pub mod cli;
pub mod config;
pub mod influx;
pub mod nis;
pub mod progress;
#[cfg(test)]
mod test_utils;
mod upsinfluxd;
