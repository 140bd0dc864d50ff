//
// Copyright (c) Memfault, Inc.
// See License.txt for details
use std::{
    cell::RefCell,
    collections::VecDeque,
    fmt::Display,
    io::{self, Cursor, ErrorKind, Read, Write},
    rc::Rc,
};

use rstest::fixture;

use crate::nis::{frame, NisConnector, NisError};

#[fixture]
/// Logs everything the crate emits to stderr. Safe to use from several tests.
pub fn setup_logger() {
    let _ = stderrlog::new().module("upsinfluxd").verbosity(4).init();
}

/// Frames `lines` the way apcupsd answers, including the terminator frame.
pub fn nis_response(lines: &[&str]) -> Vec<u8> {
    let mut bytes: Vec<u8> = lines
        .iter()
        .flat_map(|line| frame::encode(line.as_bytes()).unwrap())
        .collect();
    bytes.extend([0x00, 0x00]);
    bytes
}

/// In-memory NIS daemon.
///
/// Every connection plays the next script: either response bytes followed by
/// end-of-stream, or an I/O error on the first write or read. Connecting with
/// no scripts left is refused.
#[derive(Clone, Default)]
pub struct FakeNis {
    state: Rc<RefCell<FakeNisState>>,
}

#[derive(Default)]
struct FakeNisState {
    scripts: VecDeque<Script>,
    written: Vec<Rc<RefCell<Vec<u8>>>>,
}

enum Script {
    Replay(Vec<u8>),
    FailWrite(ErrorKind),
    FailRead(ErrorKind),
}

impl FakeNis {
    pub fn new(scripts: Vec<Vec<u8>>) -> Self {
        let fake = Self::default();
        fake.state.borrow_mut().scripts = scripts.into_iter().map(Script::Replay).collect();
        fake
    }

    pub fn push_script(&self, script: Vec<u8>) {
        self.state.borrow_mut().scripts.push_back(Script::Replay(script));
    }

    /// Next connection fails every write with `kind`.
    pub fn push_write_failure(&self, kind: ErrorKind) {
        self.state.borrow_mut().scripts.push_back(Script::FailWrite(kind));
    }

    /// Next connection accepts the command, then fails every read with `kind`.
    pub fn push_read_failure(&self, kind: ErrorKind) {
        self.state.borrow_mut().scripts.push_back(Script::FailRead(kind));
    }

    /// Number of successful connections so far.
    pub fn connections(&self) -> usize {
        self.state.borrow().written.len()
    }

    /// Bytes the client sent over connection number `idx`.
    pub fn written(&self, idx: usize) -> Vec<u8> {
        self.state.borrow().written[idx].borrow().clone()
    }
}

impl Display for FakeNis {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "fake-nis")
    }
}

impl NisConnector for FakeNis {
    type Stream = FakeNisStream;

    fn connect(&self) -> Result<FakeNisStream, NisError> {
        let mut state = self.state.borrow_mut();
        let script = state
            .scripts
            .pop_front()
            .ok_or_else(|| NisError::Connection {
                endpoint: self.to_string(),
                source: io::Error::from(ErrorKind::ConnectionRefused),
            })?;
        let output = Rc::new(RefCell::new(vec![]));
        state.written.push(output.clone());
        let mut stream = FakeNisStream {
            input: Cursor::new(vec![]),
            output,
            write_error: None,
            read_error: None,
        };
        match script {
            Script::Replay(bytes) => stream.input = Cursor::new(bytes),
            Script::FailWrite(kind) => stream.write_error = Some(kind),
            Script::FailRead(kind) => stream.read_error = Some(kind),
        }
        Ok(stream)
    }
}

pub struct FakeNisStream {
    input: Cursor<Vec<u8>>,
    output: Rc<RefCell<Vec<u8>>>,
    write_error: Option<ErrorKind>,
    read_error: Option<ErrorKind>,
}

impl Read for FakeNisStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self.read_error {
            Some(kind) => Err(kind.into()),
            None => self.input.read(buf),
        }
    }
}

impl Write for FakeNisStream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if let Some(kind) = self.write_error {
            return Err(kind.into());
        }
        self.output.borrow_mut().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
