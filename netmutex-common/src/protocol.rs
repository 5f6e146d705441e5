//! # Wire Protocol
//!
//! Newline-delimited JSON-RPC 2.0-shaped request/response bodies. Only
//! `capture` and `release` are ever named in `method`; the shapes exist here
//! (rather than in netmutex-server) so the client can build and pre-validate
//! requests with the exact same types the server parses.

use serde::{Deserialize, Serialize};

use crate::error::NetMutexError;

/// JSON-RPC version string stamped on every request/response.
pub const PROTOCOL_VERSION: &str = "2.0";
/// The only two supported methods.
pub const METHOD_CAPTURE: &str = "capture";
pub const METHOD_RELEASE: &str = "release";
/// Inclusive bounds on `resource` length in bytes.
pub const RESOURCE_MIN_LEN: usize = 1;
pub const RESOURCE_MAX_LEN: usize = 512;

/// `params` object. Every field is optional on the wire; the unset value
/// defaults per field (empty string, zero, `false`) rather than rejecting
/// the request, mirroring the original's JSON decoding behavior.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CommandParams {
    #[serde(default)]
    pub resource: String,
    #[serde(default)]
    pub mutex: String,
    /// Auto-release lease, in whole seconds. Zero means no lease: the
    /// mutex lives until an explicit `release` or connection close.
    #[serde(default)]
    pub timeout: u64,
    /// If set on `capture`, the server tracks this mutex on the
    /// connection's auto-release set and releases it on disconnect.
    #[serde(default)]
    pub autorelease: bool,
}

/// A single request line.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Request {
    pub jsonrpc: String,
    pub id: u32,
    pub method: String,
    #[serde(default)]
    pub params: CommandParams,
}

impl Request {
    pub fn new(id: u32, method: &str, params: CommandParams) -> Self {
        Request {
            jsonrpc: PROTOCOL_VERSION.to_string(),
            id,
            method: method.to_string(),
            params,
        }
    }

    /// Structural validation shared by the client (before sending) and the
    /// server (before executing). Returns the first violation found.
    ///
    /// - `method` must be `capture` or `release`.
    /// - `capture` requires `1..=512` bytes of `resource`.
    /// - `release` requires a non-empty `mutex`.
    /// - `timeout` (seconds) has no upper bound; any value including zero
    ///   is valid (zero means "no lease, no auto-release by timeout").
    pub fn validate(&self) -> Result<(), NetMutexError> {
        match self.method.as_str() {
            METHOD_CAPTURE => {
                let len = self.params.resource.len();
                if len < RESOURCE_MIN_LEN || len > RESOURCE_MAX_LEN {
                    return Err(NetMutexError::ProtocolError(format!(
                        "resource must be {}..={} bytes, got {}",
                        RESOURCE_MIN_LEN, RESOURCE_MAX_LEN, len
                    )));
                }
                Ok(())
            }
            METHOD_RELEASE => {
                if self.params.mutex.is_empty() {
                    return Err(NetMutexError::ProtocolError(
                        "mutex must not be empty".to_string(),
                    ));
                }
                Ok(())
            }
            other => Err(NetMutexError::InvalidMethod(format!(
                "unsupported method '{other}'"
            ))),
        }
    }
}

/// `result` on success is the bare mutex id string: the new id for
/// `capture`, the id that was released for `release`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuccessResponse {
    pub jsonrpc: String,
    pub id: u32,
    pub result: String,
}

impl SuccessResponse {
    pub fn new(id: u32, result: impl Into<String>) -> Self {
        SuccessResponse {
            jsonrpc: PROTOCOL_VERSION.to_string(),
            id,
            result: result.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorInfo {
    pub code: i32,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub jsonrpc: String,
    pub id: u32,
    pub error: ErrorInfo,
}

impl ErrorResponse {
    pub fn new(id: u32, err: &NetMutexError) -> Self {
        ErrorResponse {
            jsonrpc: PROTOCOL_VERSION.to_string(),
            id,
            error: ErrorInfo {
                code: err.code(),
                message: err.to_string(),
            },
        }
    }
}

/// Either shape a response line can take; used when the client parses a
/// line back without knowing in advance whether the server succeeded.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Response {
    Success(SuccessResponse),
    Error(ErrorResponse),
}

impl Response {
    pub fn id(&self) -> u32 {
        match self {
            Response::Success(r) => r.id,
            Response::Error(r) => r.id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capture_requires_resource_in_range() {
        let mut req = Request::new(1, METHOD_CAPTURE, CommandParams::default());
        assert!(req.validate().is_err());
        req.params.resource = "a".repeat(512);
        assert!(req.validate().is_ok());
        req.params.resource = "a".repeat(513);
        assert!(req.validate().is_err());
    }

    #[test]
    fn release_requires_mutex() {
        let mut req = Request::new(2, METHOD_RELEASE, CommandParams::default());
        assert!(req.validate().is_err());
        req.params.mutex = "deadbeef".to_string();
        assert!(req.validate().is_ok());
    }

    #[test]
    fn unknown_method_rejected() {
        let req = Request::new(3, "destroy", CommandParams::default());
        match req.validate() {
            Err(NetMutexError::InvalidMethod(_)) => {}
            other => panic!("expected InvalidMethod, got {other:?}"),
        }
    }

    #[test]
    fn response_round_trips_through_json() {
        let resp = Response::Success(SuccessResponse::new(7, "abcd"));
        let line = serde_json::to_string(&resp).unwrap();
        assert!(line.contains("\"result\":\"abcd\""));
        let back: Response = serde_json::from_str(&line).unwrap();
        assert_eq!(back.id(), 7);
    }
}
