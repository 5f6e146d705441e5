//! # Synchronous Client API
//!
//! A single blocking `TcpStream`, no pooling, no pipelining: one request on
//! the wire at a time, one response read back before the next request is
//! sent. That's deliberate, not a missing feature — a mutex captured on
//! this connection is scoped to this connection's lifetime, and a pool
//! that handed the socket to a different caller between capture and
//! release would silently break that scope.

use std::fmt;
use std::io::{BufRead, BufReader, Write};
use std::net::TcpStream;
use std::time::Duration;

use netmutex_common::protocol::{CommandParams, METHOD_CAPTURE, METHOD_RELEASE};
use netmutex_common::{Request, Response};
use rand::Rng;

/// Result type for the client.
pub type ClientResult<T> = Result<T, ClientError>;

/// Errors surfaced by the client.
#[derive(Debug)]
pub enum ClientError {
    /// Network or IO failure while reading/writing.
    Io(std::io::Error),
    /// The server closed the connection before sending a reply.
    ConnectionClosed,
    /// A line came back that wasn't valid JSON, or parsed to a shape the
    /// client doesn't expect.
    Protocol(String),
    /// The server replied with a JSON-RPC error object.
    Server { code: i32, message: String },
    /// A response arrived with a request id the client never sent.
    MismatchedId { expected: u32, got: u32 },
}

impl fmt::Display for ClientError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClientError::Io(err) => write!(f, "io error: {err}"),
            ClientError::ConnectionClosed => write!(f, "connection closed by server"),
            ClientError::Protocol(msg) => write!(f, "protocol error: {msg}"),
            ClientError::Server { code, message } => {
                write!(f, "server error {code}: {message}")
            }
            ClientError::MismatchedId { expected, got } => {
                write!(f, "response id {got} did not match request id {expected}")
            }
        }
    }
}

impl std::error::Error for ClientError {}

impl From<std::io::Error> for ClientError {
    fn from(err: std::io::Error) -> Self {
        ClientError::Io(err)
    }
}

/// Configuration for a client connection.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Server address, e.g. "127.0.0.1:7890".
    pub addr: String,
    /// Optional TCP read timeout.
    pub read_timeout: Option<Duration>,
    /// Optional TCP write timeout.
    pub write_timeout: Option<Duration>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        ClientConfig {
            addr: "127.0.0.1:8900".to_string(),
            read_timeout: None,
            write_timeout: None,
        }
    }
}

/// A single blocking connection to a netmutex server.
///
/// Request ids are random 16-bit values in `1..=65534`, matching the
/// original client's id space (0 and 65535 are avoided so the id never
/// collides with a sentinel value a server implementation might reserve).
pub struct Client {
    stream: BufReader<TcpStream>,
}

impl Client {
    /// Opens a connection with default configuration.
    pub fn open(addr: impl Into<String>) -> ClientResult<Self> {
        let mut config = ClientConfig::default();
        config.addr = addr.into();
        Self::with_config(config)
    }

    /// Opens a connection with a custom configuration.
    pub fn with_config(config: ClientConfig) -> ClientResult<Self> {
        let stream = TcpStream::connect(&config.addr)?;
        stream.set_read_timeout(config.read_timeout)?;
        stream.set_write_timeout(config.write_timeout)?;
        Ok(Client {
            stream: BufReader::new(stream),
        })
    }

    /// Closes the connection. Any mutex captured on this connection with
    /// `autorelease=true` and never explicitly released is released by the
    /// server once it observes the disconnect.
    pub fn close(self) -> ClientResult<()> {
        self.stream.into_inner().shutdown(std::net::Shutdown::Both)?;
        Ok(())
    }

    /// Pre-validates `1 <= resource.len() <= 512`, then attempts to capture
    /// `resource`. Fails immediately if another mutex already holds it.
    ///
    /// `timeout_seconds == 0` means the mutex has no lease deadline and
    /// must be released explicitly (or by disconnecting). `autorelease`
    /// marks the captured mutex for release when this connection closes.
    pub fn capture(
        &mut self,
        resource: &str,
        timeout_seconds: u64,
        autorelease: bool,
    ) -> ClientResult<String> {
        validate_resource_len(resource)?;
        let params = CommandParams {
            resource: resource.to_string(),
            timeout: timeout_seconds,
            autorelease,
            ..Default::default()
        };
        self.call(METHOD_CAPTURE, params)
    }

    /// Releases a previously captured mutex. Pre-validates `mutex_id` is
    /// non-empty.
    pub fn release(&mut self, mutex_id: &str) -> ClientResult<String> {
        if mutex_id.is_empty() {
            return Err(ClientError::Protocol("mutex must not be empty".to_string()));
        }
        let params = CommandParams {
            mutex: mutex_id.to_string(),
            ..Default::default()
        };
        self.call(METHOD_RELEASE, params)
    }

    fn call(&mut self, method: &str, params: CommandParams) -> ClientResult<String> {
        let id = new_request_id();
        let request = Request::new(id, method, params);
        let mut line = serde_json::to_string(&request)
            .map_err(|err| ClientError::Protocol(err.to_string()))?;
        line.push('\n');

        let stream = self.stream.get_mut();
        stream.write_all(line.as_bytes())?;
        stream.flush()?;

        let mut reply = String::new();
        let read = self.stream.read_line(&mut reply)?;
        if read == 0 {
            return Err(ClientError::ConnectionClosed);
        }

        let response: Response = serde_json::from_str(reply.trim_end())
            .map_err(|err| ClientError::Protocol(err.to_string()))?;

        if response.id() != id {
            return Err(ClientError::MismatchedId {
                expected: id,
                got: response.id(),
            });
        }

        match response {
            Response::Success(success) => Ok(success.result),
            Response::Error(error) => Err(ClientError::Server {
                code: error.error.code,
                message: error.error.message,
            }),
        }
    }
}

/// Draws a random request id in `1..=65534`, avoiding both `0` and the
/// `u16::MAX` sentinel value.
fn new_request_id() -> u32 {
    rand::thread_rng().gen_range(1..=65534u32)
}

/// Mirrors the server's own `1..=512` byte bound on `resource`, so a
/// doomed request never reaches the wire.
fn validate_resource_len(resource: &str) -> ClientResult<()> {
    let len = resource.len();
    if !(1..=512).contains(&len) {
        return Err(ClientError::Protocol(format!(
            "resource must be 1..=512 bytes, got {len}"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_ids_stay_in_bounds() {
        for _ in 0..1000 {
            let id = new_request_id();
            assert!(id >= 1 && id <= 65534);
        }
    }

    #[test]
    fn resource_length_validation_matches_wire_bounds() {
        assert!(validate_resource_len("").is_err());
        assert!(validate_resource_len(&"a".repeat(512)).is_ok());
        assert!(validate_resource_len(&"a".repeat(513)).is_err());
    }
}
