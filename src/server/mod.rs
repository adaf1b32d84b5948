//! Schedulers.
//!
//! Two interchangeable ways to drive the same protocol engine:
//!
//! - **`reactor`**: one thread, one `mio::Poll`, every connection
//!   multiplexed over non-blocking sockets.
//! - **`listener`**: a fixed pool of tokio worker threads, one task per
//!   accepted connection.
//!
//! Both hand bytes to [`Connection`](crate::http::connection::Connection)
//! and write back whatever it buffers; neither knows anything about HTTP.

pub mod listener;
pub mod reactor;
pub mod registry;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tracing::info;

use crate::config::{Config, Scheduler};
use crate::routing::Router;

pub use reactor::{Reactor, ShutdownHandle};

/// Per-server policy handed to a scheduler at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServerOptions {
    /// Connections held at once; further accepts are refused.
    pub max_connections: usize,
    /// Connections with no successful read or write for longer are closed.
    pub idle_timeout: Duration,
    /// Close every connection after its first response.
    pub force_close: bool,
}

impl Default for ServerOptions {
    fn default() -> Self {
        Self {
            max_connections: 10_000,
            idle_timeout: Duration::from_secs(30),
            force_close: false,
        }
    }
}

/// Starts the scheduler selected in `cfg` and blocks until ctrl-c.
pub fn run(cfg: &Config) -> anyhow::Result<()> {
    let addr = cfg.socket_addr()?;
    let options = cfg.server.options();
    let router = Router::from_config(&cfg.static_files);

    match cfg.server.scheduler {
        Scheduler::Reactor => run_reactor(addr, options, router),
        Scheduler::Pool => run_pool(addr, options, router, cfg.server.threads),
    }
}

fn run_reactor(addr: SocketAddr, options: ServerOptions, router: Router) -> anyhow::Result<()> {
    let mut reactor = Reactor::bind(addr, options, router)?;
    let handle = reactor.shutdown_handle();

    std::thread::Builder::new()
        .name("signal".into())
        .spawn(move || {
            let runtime = match tokio::runtime::Builder::new_current_thread()
                .enable_io()
                .build()
            {
                Ok(runtime) => runtime,
                Err(e) => {
                    tracing::error!(error = %e, "Failed to start signal watcher");
                    return;
                }
            };

            if runtime.block_on(tokio::signal::ctrl_c()).is_ok() {
                info!("Shutdown signal received");
                if let Err(e) = handle.shutdown() {
                    tracing::error!(error = %e, "Failed to wake reactor");
                }
            }
        })
        .context("failed to spawn signal watcher")?;

    reactor.run()
}

fn run_pool(
    addr: SocketAddr,
    options: ServerOptions,
    router: Router,
    threads: usize,
) -> anyhow::Result<()> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(threads)
        .thread_name("pool-worker")
        .enable_all()
        .build()
        .context("failed to build worker pool")?;

    runtime.block_on(async {
        let listener = listener::bind(addr).await?;
        let shutdown = async {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("Shutdown signal received");
            }
        };
        listener::run(listener, options, Arc::new(router), shutdown).await
    })
}
