use std::io::{self, Write};
use std::time::{Duration, Instant};

use crate::http::codec::{Http11Codec, RequestCodec};
use crate::http::writer::{ResponseWriter, WriteProgress};
use crate::routing::Router;

/// Where a connection is in its request/response cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Accumulating request bytes.
    Reading,
    /// A response is buffered in `outbound` and being written.
    Writing,
    /// Done; the transport should be dropped.
    Closed,
}

/// What the scheduler should do after handing bytes (or EOF) to a
/// connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadOutcome {
    /// Keep reading.
    NeedMore,
    /// A response is buffered; switch to writing.
    Respond,
    /// Drop the transport without writing anything.
    Close,
}

/// What the scheduler should do after a write attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlushOutcome {
    /// Bytes remain; wait until the transport is writable again.
    Pending,
    /// Response sent; read the next request on the same transport.
    KeepAlive,
    /// Response sent; drop the transport.
    Close,
}

/// Protocol state of one TCP connection, without the socket.
///
/// Schedulers own the transport and call into this type with whatever they
/// read, the time it happened, and how much they managed to write. That
/// keeps every transition testable with plain byte slices and `Instant`s.
///
/// At most one request is in flight: bytes are only consumed in
/// [`ConnectionState::Reading`], and the outbound buffer is only filled once
/// the codec has a complete request.
#[derive(Debug)]
pub struct Connection<C: RequestCodec = Http11Codec> {
    codec: C,
    outbound: ResponseWriter,
    last_active: Instant,
    close_after_flush: bool,
    state: ConnectionState,
}

impl Connection<Http11Codec> {
    pub fn http(force_close: bool, now: Instant) -> Self {
        Self::new(Http11Codec::new(force_close), now)
    }
}

impl<C: RequestCodec> Connection<C> {
    pub fn new(codec: C, now: Instant) -> Self {
        Self {
            codec,
            outbound: ResponseWriter::default(),
            last_active: now,
            close_after_flush: false,
            state: ConnectionState::Reading,
        }
    }

    /// Handles a chunk of bytes read from the transport at `now`.
    pub fn on_read(&mut self, chunk: &[u8], now: Instant, router: &Router) -> ReadOutcome {
        match self.state {
            ConnectionState::Reading => {}
            ConnectionState::Writing => return ReadOutcome::Respond,
            ConnectionState::Closed => return ReadOutcome::Close,
        }

        self.last_active = now;

        match self.codec.feed(chunk) {
            Ok(true) => self.respond(router),
            Ok(false) => ReadOutcome::NeedMore,
            Err(e) => {
                tracing::warn!(error = %e, "Dropping connection on protocol error");
                self.state = ConnectionState::Closed;
                ReadOutcome::Close
            }
        }
    }

    /// Handles end-of-stream from the peer.
    ///
    /// If the request headers were complete, the request is answered with
    /// whatever body bytes arrived and the connection closes after the
    /// response. Otherwise there is nothing to answer.
    pub fn on_eof(&mut self, router: &Router) -> ReadOutcome {
        if self.state != ConnectionState::Reading {
            return match self.state {
                ConnectionState::Writing => ReadOutcome::Respond,
                _ => ReadOutcome::Close,
            };
        }

        if self.codec.finish() {
            self.close_after_flush = true;
            self.respond(router)
        } else {
            self.state = ConnectionState::Closed;
            ReadOutcome::Close
        }
    }

    /// Picks up a request whose bytes arrived together with the previous
    /// one. Call after [`FlushOutcome::KeepAlive`]; returns
    /// [`ReadOutcome::NeedMore`] when nothing is held.
    pub fn resume(&mut self, now: Instant, router: &Router) -> ReadOutcome {
        if self.state != ConnectionState::Reading || self.codec.buffered() == 0 {
            return ReadOutcome::NeedMore;
        }
        self.on_read(&[], now, router)
    }

    fn respond(&mut self, router: &Router) -> ReadOutcome {
        let Some(request) = self.codec.request() else {
            self.state = ConnectionState::Closed;
            return ReadOutcome::Close;
        };

        let response = router.respond(request);
        self.close_after_flush |= self.codec.wants_close();

        tracing::debug!(
            method = request.method.as_str(),
            path = %request.path,
            status = response.status.as_u16(),
            close = self.close_after_flush,
            "Request handled"
        );

        let bytes = self.codec.encode(&response, self.close_after_flush);
        self.outbound = ResponseWriter::from_bytes(bytes);
        self.state = ConnectionState::Writing;
        ReadOutcome::Respond
    }

    /// Writes buffered response bytes to a non-blocking sink.
    ///
    /// A refused or partial write is not an error: the remainder stays
    /// buffered and [`FlushOutcome::Pending`] is returned. Any other I/O
    /// error is returned and the caller should drop the transport.
    pub fn flush<W: Write>(&mut self, sink: &mut W, now: Instant) -> io::Result<FlushOutcome> {
        if self.state != ConnectionState::Writing {
            return Ok(FlushOutcome::Pending);
        }

        let last_active = &mut self.last_active;
        match self.outbound.write_nonblocking(sink, |_| *last_active = now)? {
            WriteProgress::Backpressure => Ok(FlushOutcome::Pending),
            WriteProgress::Drained => Ok(self.finish_response()),
        }
    }

    /// Records `n` bytes written by a scheduler that writes on its own.
    pub fn on_written(&mut self, n: usize, now: Instant) -> FlushOutcome {
        if self.state != ConnectionState::Writing {
            return FlushOutcome::Pending;
        }

        self.last_active = now;
        self.outbound.advance(n);
        if self.outbound.is_drained() {
            self.finish_response()
        } else {
            FlushOutcome::Pending
        }
    }

    fn finish_response(&mut self) -> FlushOutcome {
        if self.close_after_flush {
            self.state = ConnectionState::Closed;
            FlushOutcome::Close
        } else {
            self.codec.reset();
            self.state = ConnectionState::Reading;
            FlushOutcome::KeepAlive
        }
    }

    /// Response bytes not yet written.
    pub fn pending(&self) -> &[u8] {
        self.outbound.pending()
    }

    /// Whether nothing was read or written for longer than `timeout`.
    pub fn is_idle(&self, now: Instant, timeout: Duration) -> bool {
        now.saturating_duration_since(self.last_active) > timeout
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn close_after_flush(&self) -> bool {
        self.close_after_flush
    }

    pub fn last_active(&self) -> Instant {
        self.last_active
    }
}
