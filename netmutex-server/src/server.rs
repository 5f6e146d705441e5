//! # TCP Accept Loop
//!
//! Binds a listener, spawns one task per accepted connection, and runs the
//! lease reaper alongside it. Shutdown is signaled through a shared
//! [`tokio::sync::Notify`] rather than a polled flag: the accept loop reacts
//! to it immediately instead of waiting out a poll interval, a strictly
//! tighter bound than the original's periodic check.

use std::net::SocketAddr;
use std::sync::Arc;

use netmutex_core::{spawn_reaper, Registry};
use tokio::net::{TcpListener, ToSocketAddrs};
use tokio::sync::Notify;

use crate::connection::handle_connection;
use crate::metrics::Metrics;

/// An accepting netmutex server bound to one address.
pub struct Server {
    listener: TcpListener,
    registry: Arc<Registry>,
    metrics: Arc<Metrics>,
    shutdown: Arc<Notify>,
}

impl Server {
    /// Binds `addr` and constructs a fresh, empty registry.
    pub async fn bind<A: ToSocketAddrs>(addr: A) -> std::io::Result<Self> {
        let listener = TcpListener::bind(addr).await?;
        Ok(Server {
            listener,
            registry: Arc::new(Registry::new()),
            metrics: Arc::new(Metrics::new()),
            shutdown: Arc::new(Notify::new()),
        })
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    pub fn registry(&self) -> Arc<Registry> {
        self.registry.clone()
    }

    pub fn metrics(&self) -> Arc<Metrics> {
        self.metrics.clone()
    }

    /// A handle callers can use to request shutdown from elsewhere, e.g. a
    /// signal handler installed by the binary entrypoint.
    pub fn shutdown_handle(&self) -> Arc<Notify> {
        self.shutdown.clone()
    }

    /// Runs the accept loop and lease reaper until shutdown is requested.
    /// Per-connection errors are logged and do not stop the server; only a
    /// shutdown notification ends this loop.
    pub async fn run(self) -> std::io::Result<()> {
        let reaper = spawn_reaper(self.registry.clone(), {
            let metrics = self.metrics.clone();
            move |count| metrics.record_leases_expired(count as u64)
        });

        loop {
            tokio::select! {
                accepted = self.listener.accept() => {
                    match accepted {
                        Ok((stream, addr)) => {
                            tracing::debug!(%addr, "accepted connection");
                            let registry = self.registry.clone();
                            let metrics = self.metrics.clone();
                            tokio::spawn(async move {
                                if let Err(err) = handle_connection(stream, registry, metrics).await {
                                    tracing::debug!(error = %err, "connection ended with error");
                                }
                            });
                        }
                        Err(err) => {
                            tracing::warn!(error = %err, "accept failed");
                        }
                    }
                }
                _ = self.shutdown.notified() => {
                    tracing::info!("shutdown requested, stopping accept loop");
                    break;
                }
            }
        }

        reaper.abort();
        Ok(())
    }
}
