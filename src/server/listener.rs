//! Worker-pool scheduler.
//!
//! Every accepted connection becomes a task that owns its socket and its
//! [`Connection`] end to end. The task count is bounded by a semaphore sized
//! to `max_connections`; the thread count by the runtime's worker pool.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use anyhow::Context;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Semaphore;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::http::connection::{Connection, FlushOutcome, ReadOutcome};
use crate::routing::Router;
use crate::server::ServerOptions;
use crate::server::reactor::READ_CHUNK;

pub async fn bind(addr: SocketAddr) -> anyhow::Result<TcpListener> {
    TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))
}

/// Accepts connections until `shutdown` resolves.
pub async fn run(
    listener: TcpListener,
    options: ServerOptions,
    router: Arc<Router>,
    shutdown: impl Future<Output = ()>,
) -> anyhow::Result<()> {
    let permits = Arc::new(Semaphore::new(options.max_connections));
    info!(
        addr = %listener.local_addr()?,
        max_connections = options.max_connections,
        "Worker pool listening"
    );

    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            accepted = listener.accept() => {
                let (socket, peer) = match accepted {
                    Ok(accepted) => accepted,
                    Err(e) => {
                        warn!(error = %e, "Accept failed");
                        continue;
                    }
                };

                let Ok(permit) = Arc::clone(&permits).try_acquire_owned() else {
                    warn!(peer = %peer, limit = options.max_connections, "Connection refused: pool full");
                    drop(socket);
                    continue;
                };

                debug!(peer = %peer, "Accepted connection");
                let router = Arc::clone(&router);
                tokio::spawn(async move {
                    let _permit = permit;
                    if let Err(e) = serve(socket, &router, options).await {
                        debug!(peer = %peer, error = %e, "Connection ended with error");
                    }
                });
            }

            _ = &mut shutdown => {
                info!("Worker pool stopped");
                return Ok(());
            }
        }
    }
}

/// Drives one connection until it closes, errors, or idles out.
pub async fn serve(
    mut stream: TcpStream,
    router: &Router,
    options: ServerOptions,
) -> anyhow::Result<()> {
    let mut conn = Connection::http(options.force_close, Instant::now());
    let mut chunk = [0u8; READ_CHUNK];

    let mut outcome = ReadOutcome::NeedMore;

    loop {
        if outcome == ReadOutcome::NeedMore {
            let n = timeout(options.idle_timeout, stream.read(&mut chunk))
                .await
                .context("idle timeout while reading")??;

            outcome = if n == 0 {
                conn.on_eof(router)
            } else {
                conn.on_read(&chunk[..n], Instant::now(), router)
            };
        }

        match outcome {
            ReadOutcome::NeedMore => continue,
            ReadOutcome::Close => return Ok(()),
            ReadOutcome::Respond => {}
        }

        loop {
            let written = timeout(options.idle_timeout, stream.write(conn.pending()))
                .await
                .context("idle timeout while writing")??;

            if written == 0 {
                anyhow::bail!("connection closed while writing");
            }

            match conn.on_written(written, Instant::now()) {
                FlushOutcome::Pending => continue,
                FlushOutcome::KeepAlive => {
                    outcome = conn.resume(Instant::now(), router);
                    break;
                }
                FlushOutcome::Close => {
                    stream.shutdown().await.ok();
                    return Ok(());
                }
            }
        }
    }
}
