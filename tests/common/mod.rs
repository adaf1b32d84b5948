//! Shared utilities for the end-to-end server tests.

#![allow(dead_code)]

use std::io::{self, Read, Write};
use std::net::{SocketAddr, TcpStream};
use std::time::Duration;

use switchyard::http::request::Request;
use switchyard::http::response::Response;
use switchyard::routing::{HandlerError, Router};

pub const CLIENT_TIMEOUT: Duration = Duration::from_secs(5);

/// A parsed response as seen by a client.
#[derive(Debug)]
pub struct Reply {
    pub head: String,
    pub body: Vec<u8>,
}

impl Reply {
    pub fn status_line(&self) -> &str {
        self.head.lines().next().unwrap_or_default()
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.head.lines().skip(1).find_map(|line| {
            let (key, value) = line.split_once(": ")?;
            key.eq_ignore_ascii_case(name).then_some(value)
        })
    }
}

/// Router with `/echo` (body back), `/big` (large body) and `/hello`.
pub fn test_router(big: usize) -> Router {
    Router::new()
        .route("echo", |req: &Request| -> Result<Response, HandlerError> {
            Ok(Response::ok(req.body.clone()))
        })
        .route("hello", |_: &Request| -> Result<Response, HandlerError> {
            Ok(Response::ok("hello"))
        })
        .route("big", move |_: &Request| -> Result<Response, HandlerError> {
            Ok(Response::ok(pattern(big)))
        })
}

pub fn pattern(len: usize) -> Vec<u8> {
    (0..len).map(|i| b'a' + (i % 26) as u8).collect()
}

pub fn connect(addr: SocketAddr) -> TcpStream {
    let stream = TcpStream::connect(addr).unwrap();
    stream.set_read_timeout(Some(CLIENT_TIMEOUT)).unwrap();
    stream.set_write_timeout(Some(CLIENT_TIMEOUT)).unwrap();
    stream
}

/// Reads one response framed by its Content-Length.
pub fn read_reply(stream: &mut TcpStream) -> io::Result<Reply> {
    let mut raw = Vec::new();
    let mut byte = [0u8; 1];

    while !raw.ends_with(b"\r\n\r\n") {
        if stream.read(&mut byte)? == 0 {
            return Err(io::ErrorKind::UnexpectedEof.into());
        }
        raw.push(byte[0]);
    }

    let head = String::from_utf8(raw).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    let mut reply = Reply {
        head,
        body: Vec::new(),
    };

    let length: usize = reply
        .header("Content-Length")
        .and_then(|v| v.parse().ok())
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidData, "no Content-Length"))?;

    reply.body = vec![0u8; length];
    stream.read_exact(&mut reply.body)?;
    Ok(reply)
}

pub fn exchange(stream: &mut TcpStream, request: &[u8]) -> Reply {
    stream.write_all(request).unwrap();
    read_reply(stream).unwrap()
}

/// True once the server has closed the stream: EOF or a reset, and no data.
pub fn is_closed_by_server(stream: &mut TcpStream) -> bool {
    let mut buf = [0u8; 64];
    match stream.read(&mut buf) {
        Ok(0) => true,
        Ok(_) => false,
        Err(e) => matches!(
            e.kind(),
            io::ErrorKind::ConnectionReset | io::ErrorKind::ConnectionAborted
        ),
    }
}
