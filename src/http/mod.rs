//! HTTP/1.1 protocol engine.
//!
//! Everything here is socket-free. Schedulers feed bytes in and take bytes
//! out; the types in this module decide what those bytes mean.
//!
//! # Architecture
//!
//! - **`request`** / **`response`**: plain values exchanged with handlers
//! - **`parser`**: incremental request parser, one request per instance
//! - **`writer`**: response serialization and the resumable outbound buffer
//! - **`codec`**: the [`RequestCodec`](codec::RequestCodec) contract both
//!   schedulers drive
//! - **`connection`**: one connection's request/response cycle
//!
//! # Connection State Machine
//!
//! ```text
//!        ┌─────────────┐
//!        │   Reading   │ ← Accumulate bytes until a request is complete
//!        └──────┬──────┘
//!               │ Request complete → route → serialize
//!               ▼
//!        ┌──────────────────┐
//!        │    Writing       │ ← Drain outbound, possibly over many writes
//!        └──────┬───────────┘
//!               │ Outbound drained
//!               ├─ Keep-Alive → Reading (fresh parser, same socket)
//!               └─ Close → Closed
//! ```
//!
//! A protocol error in `Reading` goes straight to `Closed`; nothing is
//! written back.
//!
//! # Example
//!
//! ```
//! use std::time::Instant;
//! use switchyard::http::connection::{Connection, FlushOutcome, ReadOutcome};
//! use switchyard::http::response::Response;
//! use switchyard::routing::{HandlerError, Router};
//!
//! let router = Router::new().route("hello", |_: &switchyard::http::request::Request| {
//!     Ok::<_, HandlerError>(Response::ok("hi"))
//! });
//!
//! let mut conn = Connection::http(false, Instant::now());
//! let outcome = conn.on_read(b"GET /hello HTTP/1.1\r\n\r\n", Instant::now(), &router);
//! assert_eq!(outcome, ReadOutcome::Respond);
//!
//! let mut wire = Vec::new();
//! assert_eq!(conn.flush(&mut wire, Instant::now()).unwrap(), FlushOutcome::KeepAlive);
//! assert!(wire.ends_with(b"\r\n\r\nhi"));
//! ```

pub mod codec;
pub mod connection;
pub mod parser;
pub mod request;
pub mod response;
pub mod writer;
