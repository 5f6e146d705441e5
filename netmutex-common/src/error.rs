//! # Error Taxonomy
//!
//! Mirrors the five error kinds from the original service one-for-one:
//! RngFailure, NetworkError, ProtocolError, ResourceLocked, UnknownMutex,
//! plus a dedicated InvalidMethod variant so unknown-method failures can
//! carry their own JSON-RPC code distinct from other parameter errors.

use thiserror::Error;

/// Method not found, mirrors the standard JSON-RPC 2.0 code.
pub const CODE_UNKNOWN_METHOD: i32 = -32601;
/// Invalid params, mirrors the standard JSON-RPC 2.0 code.
pub const CODE_INVALID_PARAMS: i32 = -32602;
/// Internal error, mirrors the standard JSON-RPC 2.0 code.
pub const CODE_INTERNAL_ERROR: i32 = -32603;
/// App-defined: requested resource is already held by another mutex.
pub const CODE_RESOURCE_LOCKED: i32 = -32000;
/// App-defined: `release` referenced a mutex id the registry doesn't know.
pub const CODE_UNKNOWN_MUTEX: i32 = -32001;

/// Errors surfaced by the registry, the codec, and the connection server.
///
/// Recovery scope: only `NetworkError` closes a connection (or, on bind,
/// terminates the server). Every other variant becomes an error response on
/// the same connection, which stays open for the next request.
#[derive(Debug, Error)]
pub enum NetMutexError {
    /// The CSPRNG returned fewer bytes than requested.
    #[error("rng failure generating mutex id")]
    RngFailure,

    /// Bind/accept/read/write failure.
    #[error("network error: {0}")]
    NetworkError(#[from] std::io::Error),

    /// JSON parse or parameter-shape validation failure.
    #[error("{0}")]
    ProtocolError(String),

    /// Request named a method other than `capture`/`release`.
    #[error("{0}")]
    InvalidMethod(String),

    /// `capture` target resource is already held by another mutex.
    #[error("Resource locked by '{0}'")]
    ResourceLocked(String),

    /// `release` of an id not present in the registry.
    #[error("Resource is free, unknown mutex '{0}'")]
    UnknownMutex(String),
}

impl NetMutexError {
    /// Numeric code to surface in a JSON-RPC error response.
    ///
    /// Callers must tolerate any integer here (the wire contract never
    /// mandated this taxonomy); it's populated because the spec allows it.
    pub fn code(&self) -> i32 {
        match self {
            NetMutexError::RngFailure => CODE_INTERNAL_ERROR,
            NetMutexError::NetworkError(_) => CODE_INTERNAL_ERROR,
            NetMutexError::ProtocolError(_) => CODE_INVALID_PARAMS,
            NetMutexError::InvalidMethod(_) => CODE_UNKNOWN_METHOD,
            NetMutexError::ResourceLocked(_) => CODE_RESOURCE_LOCKED,
            NetMutexError::UnknownMutex(_) => CODE_UNKNOWN_MUTEX,
        }
    }
}
