use std::io::{self, Write};
use std::time::{Duration, Instant};

use switchyard::http::connection::{Connection, ConnectionState, FlushOutcome, ReadOutcome};
use switchyard::http::request::Request;
use switchyard::http::response::Response;
use switchyard::routing::{HandlerError, Router};

fn echo_router() -> Router {
    Router::new().route("echo", |req: &Request| -> Result<Response, HandlerError> {
        Ok(Response::ok(req.body.clone()))
    })
}

fn big_router(size: usize) -> Router {
    Router::new().route("big", move |_: &Request| -> Result<Response, HandlerError> {
        let body: Vec<u8> = (0..size).map(|i| (i % 251) as u8).collect();
        Ok(Response::ok(body))
    })
}

/// Takes at most `budget` bytes between refills, `per_call` per write.
struct SlowSocket {
    received: Vec<u8>,
    per_call: usize,
    budget: usize,
}

impl Write for SlowSocket {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.budget == 0 {
            return Err(io::ErrorKind::WouldBlock.into());
        }
        let n = buf.len().min(self.per_call).min(self.budget);
        self.budget -= n;
        self.received.extend_from_slice(&buf[..n]);
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

struct BrokenSocket;

impl Write for BrokenSocket {
    fn write(&mut self, _: &[u8]) -> io::Result<usize> {
        Err(io::ErrorKind::BrokenPipe.into())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

fn drain(conn: &mut Connection) -> (Vec<u8>, FlushOutcome) {
    let mut wire = Vec::new();
    let outcome = conn.flush(&mut wire, Instant::now()).unwrap();
    (wire, outcome)
}

#[test]
fn test_keep_alive_by_default() {
    let router = echo_router();
    let mut conn = Connection::http(false, Instant::now());

    assert_eq!(
        conn.on_read(b"GET /echo HTTP/1.1\r\n\r\n", Instant::now(), &router),
        ReadOutcome::Respond
    );
    assert_eq!(conn.state(), ConnectionState::Writing);
    assert!(!conn.close_after_flush());

    let (wire, outcome) = drain(&mut conn);
    assert_eq!(outcome, FlushOutcome::KeepAlive);
    assert!(String::from_utf8(wire).unwrap().contains("Connection: keep-alive\r\n"));
    assert_eq!(conn.state(), ConnectionState::Reading);

    // Same connection, next request.
    assert_eq!(
        conn.on_read(
            b"POST /echo HTTP/1.1\r\nContent-Length: 3\r\n\r\nabc",
            Instant::now(),
            &router
        ),
        ReadOutcome::Respond
    );
    let (wire, outcome) = drain(&mut conn);
    assert_eq!(outcome, FlushOutcome::KeepAlive);
    assert!(wire.ends_with(b"\r\n\r\nabc"));
}

#[test]
fn test_connection_close_header_closes_after_flush() {
    let router = echo_router();
    let mut conn = Connection::http(false, Instant::now());

    conn.on_read(
        b"GET /echo HTTP/1.1\r\nConnection: close\r\n\r\n",
        Instant::now(),
        &router,
    );
    assert!(conn.close_after_flush());

    let (wire, outcome) = drain(&mut conn);
    assert_eq!(outcome, FlushOutcome::Close);
    assert_eq!(conn.state(), ConnectionState::Closed);
    assert!(String::from_utf8(wire).unwrap().contains("Connection: close\r\n"));
}

#[test]
fn test_force_close_policy_wins() {
    let router = echo_router();
    let mut conn = Connection::http(true, Instant::now());

    conn.on_read(b"GET /echo HTTP/1.1\r\n\r\n", Instant::now(), &router);

    let (wire, outcome) = drain(&mut conn);
    assert_eq!(outcome, FlushOutcome::Close);
    assert!(String::from_utf8(wire).unwrap().contains("Connection: close\r\n"));
}

#[test]
fn test_protocol_error_closes_without_response() {
    let router = echo_router();
    let mut conn = Connection::http(false, Instant::now());

    assert_eq!(
        conn.on_read(b"GET / HTTP/1.0\r\n\r\n", Instant::now(), &router),
        ReadOutcome::Close
    );
    assert_eq!(conn.state(), ConnectionState::Closed);
    assert!(conn.pending().is_empty());
}

#[test]
fn test_unknown_route_still_answers() {
    let router = echo_router();
    let mut conn = Connection::http(false, Instant::now());

    conn.on_read(b"GET /missing HTTP/1.1\r\n\r\n", Instant::now(), &router);

    let (wire, _) = drain(&mut conn);
    assert!(wire.starts_with(b"HTTP/1.1 404 Not Found\r\n"));
}

#[test]
fn test_eof_before_headers_drops_connection() {
    let router = echo_router();
    let mut conn = Connection::http(false, Instant::now());

    conn.on_read(b"GET /echo HTTP/1.1\r\nHost", Instant::now(), &router);
    assert_eq!(conn.on_eof(&router), ReadOutcome::Close);
    assert!(conn.pending().is_empty());
}

#[test]
fn test_eof_on_fresh_connection_drops_it() {
    let router = echo_router();
    let mut conn = Connection::http(false, Instant::now());

    assert_eq!(conn.on_eof(&router), ReadOutcome::Close);
}

#[test]
fn test_eof_after_headers_answers_and_closes() {
    let router = echo_router();
    let mut conn = Connection::http(false, Instant::now());

    conn.on_read(
        b"POST /echo HTTP/1.1\r\nContent-Length: 10\r\n\r\nabc",
        Instant::now(),
        &router,
    );
    assert_eq!(conn.on_eof(&router), ReadOutcome::Respond);
    assert!(conn.close_after_flush());

    let (wire, outcome) = drain(&mut conn);
    assert_eq!(outcome, FlushOutcome::Close);
    assert!(wire.ends_with(b"Content-Length: 3\r\n\r\nabc"));
}

#[test]
fn test_backpressure_delivers_every_byte_once() {
    let size = 64 * 1024;
    let router = big_router(size);
    let mut conn = Connection::http(false, Instant::now());
    conn.on_read(b"GET /big HTTP/1.1\r\n\r\n", Instant::now(), &router);

    let expected = conn.pending().to_vec();
    let mut socket = SlowSocket {
        received: Vec::new(),
        per_call: 1500,
        budget: 4096,
    };

    let mut events = 0;
    loop {
        let before = conn.pending().len();
        match conn.flush(&mut socket, Instant::now()).unwrap() {
            FlushOutcome::Pending => {
                assert!(conn.pending().len() < before, "no progress");
                assert_eq!(conn.state(), ConnectionState::Writing);
                socket.budget = 4096;
                events += 1;
            }
            FlushOutcome::KeepAlive => break,
            FlushOutcome::Close => panic!("unexpected close"),
        }
    }

    assert!(events > 10);
    assert_eq!(socket.received, expected);
    assert!(socket.received.ends_with(&[((size - 1) % 251) as u8]));
}

#[test]
fn test_on_written_tracks_partial_writes() {
    let router = echo_router();
    let mut conn = Connection::http(false, Instant::now());
    conn.on_read(b"GET /echo HTTP/1.1\r\n\r\n", Instant::now(), &router);

    let total = conn.pending().len();
    let tail = conn.pending()[10..].to_vec();

    assert_eq!(conn.on_written(10, Instant::now()), FlushOutcome::Pending);
    assert_eq!(conn.pending(), tail.as_slice());
    assert_eq!(
        conn.on_written(total - 10, Instant::now()),
        FlushOutcome::KeepAlive
    );
}

#[test]
fn test_hard_write_error_is_returned() {
    let router = echo_router();
    let mut conn = Connection::http(false, Instant::now());
    conn.on_read(b"GET /echo HTTP/1.1\r\n\r\n", Instant::now(), &router);

    let err = conn.flush(&mut BrokenSocket, Instant::now()).unwrap_err();
    assert_eq!(err.kind(), io::ErrorKind::BrokenPipe);
}

#[test]
fn test_activity_refreshes_idle_clock() {
    let router = echo_router();
    let start = Instant::now();
    let timeout = Duration::from_secs(30);
    let mut conn = Connection::http(false, start);

    let later = start + Duration::from_secs(25);
    conn.on_read(b"GET /ec", later, &router);
    assert_eq!(conn.last_active(), later);

    assert!(!conn.is_idle(start + Duration::from_secs(40), timeout));
    assert!(conn.is_idle(start + Duration::from_secs(56), timeout));
}
