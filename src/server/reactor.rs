//! Single-threaded readiness reactor.
//!
//! One [`mio::Poll`] drives the listening socket and every accepted
//! connection. Reads and writes are non-blocking; the thread only ever
//! blocks inside `Poll::poll`. Each connection's protocol state lives in a
//! [`Connection`] owned by the [`Registry`], so nothing here is shared across
//! threads except the shutdown handle.

use std::io::{self, Read};
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use anyhow::Context;
use mio::net::{TcpListener, TcpStream};
use mio::{Events, Interest, Poll, Token, Waker};
use tracing::{debug, info, warn};

use crate::http::connection::{Connection, ConnectionState, FlushOutcome, ReadOutcome};
use crate::routing::Router;
use crate::server::ServerOptions;
use crate::server::registry::{Entry, Registry};

const LISTENER: Token = Token(0);
const WAKER: Token = Token(1);
const FIRST_CONN: usize = 2;

/// Bytes taken from a socket per read call.
pub const READ_CHUNK: usize = 1024;

const EVENTS_CAPACITY: usize = 1024;
const MAX_SWEEP_INTERVAL: Duration = Duration::from_secs(1);

/// Stops a running [`Reactor`] from another thread.
#[derive(Clone)]
pub struct ShutdownHandle {
    waker: Arc<Waker>,
    requested: Arc<AtomicBool>,
}

impl ShutdownHandle {
    /// Asks the reactor to close every connection and return from
    /// [`Reactor::run`] after its current batch of events.
    pub fn shutdown(&self) -> io::Result<()> {
        self.requested.store(true, Ordering::Release);
        self.waker.wake()
    }
}

enum Next {
    Stay,
    Watch(Interest),
    Close,
}

pub struct Reactor {
    poll: Poll,
    listener: TcpListener,
    registry: Registry<TcpStream>,
    router: Router,
    options: ServerOptions,
    waker: Arc<Waker>,
    shutdown: Arc<AtomicBool>,
}

impl Reactor {
    /// Binds the listening socket and sets up the poller. Any failure here
    /// is fatal: no partially started reactor is returned.
    pub fn bind(addr: SocketAddr, options: ServerOptions, router: Router) -> anyhow::Result<Self> {
        let poll = Poll::new().context("failed to create poller")?;
        let mut listener =
            TcpListener::bind(addr).with_context(|| format!("failed to bind {addr}"))?;
        poll.registry()
            .register(&mut listener, LISTENER, Interest::READABLE)
            .context("failed to register listener")?;
        let waker = Waker::new(poll.registry(), WAKER).context("failed to create waker")?;

        Ok(Self {
            poll,
            listener,
            registry: Registry::new(options.max_connections, FIRST_CONN),
            router,
            options,
            waker: Arc::new(waker),
            shutdown: Arc::new(AtomicBool::new(false)),
        })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    pub fn shutdown_handle(&self) -> ShutdownHandle {
        ShutdownHandle {
            waker: Arc::clone(&self.waker),
            requested: Arc::clone(&self.shutdown),
        }
    }

    /// Runs the event loop until shutdown is requested.
    ///
    /// Per-connection failures never end the loop; only a failing poller
    /// does.
    pub fn run(&mut self) -> anyhow::Result<()> {
        let mut events = Events::with_capacity(EVENTS_CAPACITY);
        // Wake up at least this often so idle connections are swept even
        // when no socket is active.
        let tick = self.options.idle_timeout.min(MAX_SWEEP_INTERVAL);

        if let Ok(addr) = self.local_addr() {
            info!(
                addr = %addr,
                max_connections = self.options.max_connections,
                idle_timeout = ?self.options.idle_timeout,
                "Reactor listening"
            );
        }

        loop {
            if let Err(e) = self.poll.poll(&mut events, Some(tick)) {
                if e.kind() == io::ErrorKind::Interrupted {
                    continue;
                }
                return Err(e).context("poll failed");
            }

            for event in events.iter() {
                match event.token() {
                    LISTENER => self.accept(),
                    WAKER => {}
                    token => self.dispatch(
                        token,
                        event.is_readable() || event.is_read_closed(),
                        event.is_writable() || event.is_write_closed() || event.is_error(),
                    ),
                }
            }

            self.sweep(Instant::now());

            if self.shutdown.load(Ordering::Acquire) {
                self.close_all();
                info!("Reactor stopped");
                return Ok(());
            }
        }
    }

    fn accept(&mut self) {
        loop {
            let (stream, peer) = match self.listener.accept() {
                Ok(accepted) => accepted,
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => return,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    warn!(error = %e, "Accept failed");
                    return;
                }
            };

            let conn = Connection::http(self.options.force_close, Instant::now());
            let token = match self.registry.admit(stream, conn) {
                Ok(token) => token,
                Err(stream) => {
                    warn!(
                        peer = %peer,
                        limit = self.registry.capacity(),
                        "Connection refused: registry full"
                    );
                    drop(stream);
                    continue;
                }
            };

            let registered = match self.registry.get_mut(token) {
                Some(entry) => {
                    self.poll
                        .registry()
                        .register(&mut entry.stream, token, Interest::READABLE)
                }
                None => continue,
            };

            match registered {
                Ok(()) => debug!(peer = %peer, token = token.0, "Accepted connection"),
                Err(e) => {
                    warn!(peer = %peer, error = %e, "Failed to register connection");
                    self.registry.remove(token);
                }
            }
        }
    }

    fn dispatch(&mut self, token: Token, readable: bool, writable: bool) {
        let now = Instant::now();
        let router = &self.router;
        let Some(entry) = self.registry.get_mut(token) else {
            // Already closed earlier in this batch.
            return;
        };

        let mut next = Next::Stay;

        if readable && entry.conn.state() == ConnectionState::Reading {
            next = match read_ready(entry, router, now) {
                ReadOutcome::NeedMore => Next::Stay,
                ReadOutcome::Respond => Next::Watch(Interest::WRITABLE),
                ReadOutcome::Close => Next::Close,
            };
        } else if writable && entry.conn.state() == ConnectionState::Writing {
            next = match entry.conn.flush(&mut entry.stream, now) {
                Ok(FlushOutcome::Pending) => {
                    debug!(
                        token = token.0,
                        remaining = entry.conn.pending().len(),
                        "Send buffer full, waiting for writable"
                    );
                    // ENOBUFS can leave the socket writable with no new
                    // edge coming; re-arming makes the poller check again.
                    Next::Watch(Interest::WRITABLE)
                }
                // A request that arrived with the previous one is answered
                // before more bytes are read.
                Ok(FlushOutcome::KeepAlive) => match entry.conn.resume(now, router) {
                    ReadOutcome::NeedMore => Next::Watch(Interest::READABLE),
                    ReadOutcome::Respond => Next::Watch(Interest::WRITABLE),
                    ReadOutcome::Close => Next::Close,
                },
                Ok(FlushOutcome::Close) => Next::Close,
                Err(e) => {
                    debug!(token = token.0, error = %e, "Write failed");
                    Next::Close
                }
            };
        }

        match next {
            Next::Stay => {}
            Next::Watch(interest) => self.watch(token, interest),
            Next::Close => self.close(token),
        }
    }

    fn watch(&mut self, token: Token, interest: Interest) {
        let Some(entry) = self.registry.get_mut(token) else {
            return;
        };

        let result = self
            .poll
            .registry()
            .reregister(&mut entry.stream, token, interest);
        if let Err(e) = result {
            warn!(token = token.0, error = %e, "Failed to change interest");
            self.close(token);
        }
    }

    fn close(&mut self, token: Token) {
        if let Some(mut entry) = self.registry.remove(token) {
            let _ = self.poll.registry().deregister(&mut entry.stream);
            debug!(token = token.0, open = self.registry.len(), "Connection closed");
        }
    }

    /// Closes every connection idle for longer than the configured timeout,
    /// whatever state it is in.
    fn sweep(&mut self, now: Instant) {
        for token in self.registry.idle(now, self.options.idle_timeout) {
            info!(token = token.0, "Closing idle connection");
            self.close(token);
        }
    }

    fn close_all(&mut self) {
        let poller = self.poll.registry();
        for (_, mut entry) in self.registry.drain() {
            let _ = poller.deregister(&mut entry.stream);
        }
    }
}

/// Reads until the socket is drained, the request completes, or the peer
/// goes away. Stops at a complete request so a following request's bytes
/// stay in the kernel until this response is written.
fn read_ready(entry: &mut Entry<TcpStream>, router: &Router, now: Instant) -> ReadOutcome {
    let mut chunk = [0u8; READ_CHUNK];

    loop {
        match entry.stream.read(&mut chunk) {
            Ok(0) => return entry.conn.on_eof(router),
            Ok(n) => match entry.conn.on_read(&chunk[..n], now, router) {
                ReadOutcome::NeedMore => continue,
                outcome => return outcome,
            },
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => return ReadOutcome::NeedMore,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => {
                debug!(error = %e, "Read failed");
                return ReadOutcome::Close;
            }
        }
    }
}
