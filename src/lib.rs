//! Switchyard - a small HTTP/1.1 server with two schedulers
//!
//! The protocol engine (parser, serializer, per-connection state machine)
//! is shared; the reactor and the worker pool only differ in how they move
//! bytes between sockets and that engine.

pub mod config;
pub mod http;
pub mod routing;
pub mod server;
