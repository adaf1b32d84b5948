use bytes::{Buf, Bytes};
use std::io::{self, Write};

use crate::http::response::Response;

/// Renders `resp` into its exact wire form.
///
/// Header order is fixed: `Content-Type`, `Connection`, the caller's headers,
/// then `Content-Length`. Caller entries for `Content-Length` or `Connection`
/// are dropped since both are always computed here.
pub fn serialize_response(resp: &Response, close: bool) -> Vec<u8> {
    let mut buf = Vec::with_capacity(128 + resp.body.len());

    // Status line
    buf.extend_from_slice(resp.status.status_line().as_bytes());

    buf.extend_from_slice(b"Content-Type: text/plain\r\n");
    if close {
        buf.extend_from_slice(b"Connection: close\r\n");
    } else {
        buf.extend_from_slice(b"Connection: keep-alive\r\n");
    }

    for (k, v) in &resp.headers {
        if k.eq_ignore_ascii_case("content-length") || k.eq_ignore_ascii_case("connection") {
            continue;
        }
        buf.extend_from_slice(k.as_bytes());
        buf.extend_from_slice(b": ");
        buf.extend_from_slice(v.as_bytes());
        buf.extend_from_slice(b"\r\n");
    }

    buf.extend_from_slice(format!("Content-Length: {}\r\n", resp.body.len()).as_bytes());

    // Header/body separator
    buf.extend_from_slice(b"\r\n");

    // Body
    buf.extend_from_slice(&resp.body);

    buf
}

/// Outcome of one attempt to flush a [`ResponseWriter`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteProgress {
    /// Every byte has been handed to the kernel.
    Drained,
    /// The kernel took some or none of the bytes; wait for the next
    /// writable event and try again.
    Backpressure,
}

/// Serialized response bytes awaiting the socket.
///
/// The unwritten part only ever shrinks from the front, so a partially
/// written response resumes exactly where the last write stopped.
#[derive(Debug, Default)]
pub struct ResponseWriter {
    buffer: Bytes,
}

impl ResponseWriter {
    pub fn new(response: &Response, close: bool) -> Self {
        Self::from_bytes(serialize_response(response, close))
    }

    pub fn from_bytes(bytes: impl Into<Bytes>) -> Self {
        Self {
            buffer: bytes.into(),
        }
    }

    /// Bytes not yet written.
    pub fn pending(&self) -> &[u8] {
        &self.buffer
    }

    pub fn remaining(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_drained(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Marks `n` leading bytes as written.
    pub fn advance(&mut self, n: usize) {
        self.buffer.advance(n.min(self.buffer.len()));
    }

    /// Writes to a non-blocking sink until it is drained or the sink
    /// refuses more bytes.
    ///
    /// `on_progress` is called with the byte count of every successful
    /// write. Transient send-buffer exhaustion is reported as
    /// [`WriteProgress::Backpressure`]; every other error is returned.
    pub fn write_nonblocking<W: Write>(
        &mut self,
        sink: &mut W,
        mut on_progress: impl FnMut(usize),
    ) -> io::Result<WriteProgress> {
        while !self.is_drained() {
            match sink.write(&self.buffer) {
                Ok(0) => {
                    return Err(io::Error::new(
                        io::ErrorKind::WriteZero,
                        "connection closed while writing",
                    ));
                }
                Ok(n) => {
                    self.advance(n);
                    on_progress(n);
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) if is_transient(&e) => return Ok(WriteProgress::Backpressure),
                Err(e) => return Err(e),
            }
        }

        Ok(WriteProgress::Drained)
    }
}

/// Whether a write error means the kernel send buffer is full for now.
pub fn is_transient(err: &io::Error) -> bool {
    err.kind() == io::ErrorKind::WouldBlock || err.raw_os_error() == Some(libc::ENOBUFS)
}
