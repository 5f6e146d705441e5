//! Shared types for the netmutex workspace: the error taxonomy and the
//! JSON-RPC-shaped wire protocol, used by the core registry, the server,
//! and the client alike.

pub mod error;
pub mod protocol;

pub use error::NetMutexError;
pub use protocol::{
    CommandParams, ErrorInfo, ErrorResponse, Request, Response, SuccessResponse,
};
