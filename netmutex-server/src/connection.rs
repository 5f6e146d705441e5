//! # Per-Connection Request Loop
//!
//! One task per accepted connection: read newline-delimited JSON-RPC
//! requests, validate, execute against the registry, and write back a
//! newline-delimited response. A mutex captured with `autorelease=true` is
//! tracked locally and released the moment the connection drops, whether
//! that's a clean close or a read/write error; mutexes captured without
//! that flag outlive the connection until an explicit `release` or lease
//! expiry.

use std::collections::HashSet;
use std::sync::Arc;

use bytes::BytesMut;
use netmutex_common::protocol::{Request, METHOD_CAPTURE, METHOD_RELEASE};
use netmutex_common::{ErrorResponse, NetMutexError, SuccessResponse};
use netmutex_core::Registry;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

use crate::metrics::Metrics;

/// Read buffer starting capacity. Requests are small JSON-RPC lines; this
/// just avoids a few early reallocations.
const READ_BUFFER_CAPACITY: usize = 4 * 1024;

/// Drives a single client connection until it disconnects or errors.
pub async fn handle_connection(
    mut stream: TcpStream,
    registry: Arc<Registry>,
    metrics: Arc<Metrics>,
) -> std::io::Result<()> {
    metrics.record_connection_opened();
    let mut owned_mutexes: HashSet<String> = HashSet::new();
    let mut buffer = BytesMut::with_capacity(READ_BUFFER_CAPACITY);

    let result = serve(&mut stream, &registry, &metrics, &mut buffer, &mut owned_mutexes).await;

    for mutex_id in &owned_mutexes {
        if let Err(err) = registry.release(mutex_id).await {
            tracing::debug!(mutex = %mutex_id, error = %err, "auto-release on disconnect skipped");
        } else {
            tracing::info!(mutex = %mutex_id, "auto-released on disconnect");
        }
    }
    metrics.record_connection_closed();

    result
}

async fn serve(
    stream: &mut TcpStream,
    registry: &Arc<Registry>,
    metrics: &Arc<Metrics>,
    buffer: &mut BytesMut,
    owned_mutexes: &mut HashSet<String>,
) -> std::io::Result<()> {
    loop {
        let bytes_read = stream.read_buf(buffer).await?;
        if bytes_read == 0 {
            return Ok(());
        }

        while let Some(pos) = buffer.iter().position(|b| *b == b'\n') {
            let line = buffer.split_to(pos + 1);
            let line = &line[..line.len() - 1];
            if line.iter().all(|b| b.is_ascii_whitespace()) {
                continue;
            }

            let response_line = handle_line(line, registry, metrics, owned_mutexes).await;
            stream.write_all(response_line.as_bytes()).await?;
            stream.write_all(b"\n").await?;
        }
    }
}

async fn handle_line(
    line: &[u8],
    registry: &Arc<Registry>,
    metrics: &Arc<Metrics>,
    owned_mutexes: &mut HashSet<String>,
) -> String {
    let parsed: Result<Request, _> = serde_json::from_slice(line);
    let request = match parsed {
        Ok(request) => request,
        Err(err) => {
            metrics.record_error();
            let err = NetMutexError::ProtocolError(format!("malformed request: {err}"));
            return serde_json::to_string(&ErrorResponse::new(0, &err))
                .unwrap_or_else(|_| FALLBACK_ERROR_LINE.to_string());
        }
    };

    let outcome = execute(&request, registry, metrics, owned_mutexes).await;
    let line = match outcome {
        Ok(result) => serde_json::to_string(&SuccessResponse::new(request.id, result)),
        Err(err) => {
            metrics.record_error();
            serde_json::to_string(&ErrorResponse::new(request.id, &err))
        }
    };
    line.unwrap_or_else(|_| FALLBACK_ERROR_LINE.to_string())
}

async fn execute(
    request: &Request,
    registry: &Arc<Registry>,
    metrics: &Arc<Metrics>,
    owned_mutexes: &mut HashSet<String>,
) -> Result<String, NetMutexError> {
    request.validate()?;

    match request.method.as_str() {
        METHOD_CAPTURE => {
            let mutex = registry
                .capture(&request.params.resource, request.params.timeout)
                .await?;
            if request.params.autorelease {
                owned_mutexes.insert(mutex.clone());
            }
            metrics.record_capture();
            Ok(mutex)
        }
        METHOD_RELEASE => {
            let mutex = registry.release(&request.params.mutex).await?;
            owned_mutexes.remove(&mutex);
            metrics.record_release();
            Ok(mutex)
        }
        other => Err(NetMutexError::InvalidMethod(format!(
            "unsupported method '{other}'"
        ))),
    }
}

const FALLBACK_ERROR_LINE: &str = r#"{"jsonrpc":"2.0","id":0,"error":{"code":-32603,"message":"internal error encoding response"}}"#;
