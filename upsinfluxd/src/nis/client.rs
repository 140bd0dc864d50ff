//
// Copyright (c) Memfault, Inc.
// See License.txt for details
use std::{
    fmt::Display,
    io::{self, ErrorKind, Read, Write},
    mem,
    net::{TcpStream, ToSocketAddrs},
    time::Duration,
};

use log::{debug, info, trace, warn};

use super::{
    frame::{self, LENGTH_PREFIX_SIZE},
    parse_status_lines, NisError, StatusSnapshot,
};

const STATUS_COMMAND: &str = "status";

/// Opens the byte stream the NIS client talks over.
pub trait NisConnector: Display {
    type Stream: Read + Write;

    fn connect(&self) -> Result<Self::Stream, NisError>;
}

/// Connects to apcupsd over TCP.
#[derive(Clone, Debug)]
pub struct TcpConnector {
    host: String,
    port: u16,
    timeout: Option<Duration>,
}

impl TcpConnector {
    pub fn new(host: &str, port: u16) -> Self {
        Self {
            host: host.to_string(),
            port,
            timeout: None,
        }
    }

    /// Applies `timeout` to connecting, reading and writing. `None` blocks forever.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    fn open(&self) -> io::Result<TcpStream> {
        let timeout = match self.timeout {
            None => return TcpStream::connect((self.host.as_str(), self.port)),
            Some(timeout) => timeout,
        };

        let mut last_error = None;
        for addr in (self.host.as_str(), self.port).to_socket_addrs()? {
            match TcpStream::connect_timeout(&addr, timeout) {
                Ok(stream) => {
                    stream.set_read_timeout(Some(timeout))?;
                    stream.set_write_timeout(Some(timeout))?;
                    return Ok(stream);
                }
                Err(e) => last_error = Some(e),
            }
        }
        Err(last_error.unwrap_or_else(|| {
            io::Error::new(ErrorKind::NotFound, "host did not resolve to any address")
        }))
    }
}

impl Display for TcpConnector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

impl NisConnector for TcpConnector {
    type Stream = TcpStream;

    fn connect(&self) -> Result<TcpStream, NisError> {
        self.open().map_err(|source| NisError::Connection {
            endpoint: self.to_string(),
            source,
        })
    }
}

enum ConnectionState<S> {
    Disconnected,
    Connected(S),
}

/// Outcome of one command/response exchange.
#[derive(Debug, PartialEq, Eq)]
pub enum Exchange {
    /// The response ended with the zero-length terminator frame.
    Complete(Vec<Vec<u8>>),
    /// The stream ended early. Holds whatever lines arrived before that.
    ShortRead(Vec<Vec<u8>>),
}

impl Exchange {
    pub fn into_lines(self) -> Vec<Vec<u8>> {
        match self {
            Exchange::Complete(lines) | Exchange::ShortRead(lines) => lines,
        }
    }
}

/// Request/response client holding one persistent connection to apcupsd.
///
/// apcupsd drops idle connections. When a response is cut short the client
/// reconnects on its own and hands back the partial (usually empty) response,
/// without resending the command.
pub struct NisClient<C: NisConnector = TcpConnector> {
    connector: C,
    state: ConnectionState<C::Stream>,
}

impl NisClient<TcpConnector> {
    pub fn connect(host: &str, port: u16) -> Result<Self, NisError> {
        Self::with_connector(TcpConnector::new(host, port))
    }
}

impl<C: NisConnector> NisClient<C> {
    /// Creates a client and opens its first connection.
    pub fn with_connector(connector: C) -> Result<Self, NisError> {
        debug!("Connecting to NIS at {}", connector);
        let stream = connector.connect()?;
        Ok(Self {
            connector,
            state: ConnectionState::Connected(stream),
        })
    }

    pub fn is_connected(&self) -> bool {
        matches!(self.state, ConnectionState::Connected(_))
    }

    /// Fetches and parses the `status` report.
    pub fn status(&mut self, strip_units: bool) -> Result<StatusSnapshot, NisError> {
        let lines = self.send_command(STATUS_COMMAND)?;
        let snapshot = parse_status_lines(
            lines.iter().map(|line| String::from_utf8_lossy(line)),
            strip_units,
        )?;
        Ok(snapshot)
    }

    /// Sends `command` and returns the payload of every response frame.
    pub fn send_command(&mut self, command: &str) -> Result<Vec<Vec<u8>>, NisError> {
        self.exchange(command).map(Exchange::into_lines)
    }

    /// Sends `command` and reads the response frames.
    ///
    /// Connects first when a previous reconnect failed. Connect and write
    /// failures are returned, a truncated response is not.
    pub fn exchange(&mut self, command: &str) -> Result<Exchange, NisError> {
        let request = frame::encode(command.as_bytes())?;

        // The stream is owned by this exchange until it completes. Any early
        // return leaves the client Disconnected.
        let mut stream = match mem::replace(&mut self.state, ConnectionState::Disconnected) {
            ConnectionState::Connected(stream) => stream,
            ConnectionState::Disconnected => {
                debug!("Connecting to NIS at {}", self.connector);
                self.connector.connect()?
            }
        };

        stream.write_all(&request)?;
        stream.flush()?;

        match read_response(&mut stream)? {
            Exchange::Complete(lines) => {
                trace!("NIS '{}' returned {} lines", command, lines.len());
                self.state = ConnectionState::Connected(stream);
                Ok(Exchange::Complete(lines))
            }
            Exchange::ShortRead(lines) => {
                drop(stream);
                self.reconnect();
                Ok(Exchange::ShortRead(lines))
            }
        }
    }

    fn reconnect(&mut self) {
        info!("NIS connection to {} was cut short, reconnecting", self.connector);
        match self.connector.connect() {
            Ok(stream) => self.state = ConnectionState::Connected(stream),
            Err(e) => warn!("{}", e),
        }
    }
}

fn read_response<S: Read>(stream: &mut S) -> io::Result<Exchange> {
    let mut lines = vec![];
    loop {
        let mut prefix = [0u8; LENGTH_PREFIX_SIZE];
        let filled = fill(stream, &mut prefix)?;
        let len = match frame::decode_length_prefix(&prefix[..filled]) {
            Ok(0) => return Ok(Exchange::Complete(lines)),
            Ok(len) => len as usize,
            Err(e) => {
                debug!("{}", e);
                return Ok(Exchange::ShortRead(lines));
            }
        };

        let mut payload = vec![0u8; len];
        let filled = fill(stream, &mut payload)?;
        if filled < len {
            debug!("Frame truncated after {} of {} bytes", filled, len);
            return Ok(Exchange::ShortRead(lines));
        }
        lines.push(payload);
    }
}

/// Reads until `buf` is full or the peer goes away. Returns the number of
/// bytes read.
fn fill<S: Read>(stream: &mut S, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match stream.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => {}
            Err(e)
                if matches!(
                    e.kind(),
                    ErrorKind::ConnectionReset | ErrorKind::ConnectionAborted
                ) =>
            {
                break
            }
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}
