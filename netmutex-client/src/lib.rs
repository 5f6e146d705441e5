//! Blocking client library for netmutex: one TCP connection, one request on
//! the wire at a time, no pooling or pipelining.

mod client;

pub use client::{Client, ClientConfig, ClientError, ClientResult};
