//! The protocol contract both schedulers drive.
//!
//! A scheduler only moves bytes: it feeds whatever it reads into a
//! [`RequestCodec`], asks it to encode the handler's response, and writes the
//! result back. Nothing about HTTP framing lives in the schedulers.

use crate::http::parser::{ParseError, RequestParser};
use crate::http::request::Request;
use crate::http::response::Response;
use crate::http::writer::serialize_response;

pub trait RequestCodec {
    /// Consumes a chunk of inbound bytes. `Ok(true)` means a full request is
    /// available from [`RequestCodec::request`].
    fn feed(&mut self, chunk: &[u8]) -> Result<bool, ParseError>;

    /// Called on end-of-stream. Returns `true` if a request can still be
    /// answered from what arrived.
    fn finish(&mut self) -> bool;

    fn request(&self) -> Option<&Request>;

    /// Whether the connection must close once the current response is sent.
    fn wants_close(&self) -> bool;

    /// Wire bytes for `response`.
    fn encode(&self, response: &Response, close: bool) -> Vec<u8>;

    /// Prepares for the next request on the same transport. Bytes already
    /// received for that request are kept.
    fn reset(&mut self);

    /// Inbound bytes held that are not part of a completed request.
    fn buffered(&self) -> usize;
}

/// HTTP/1.1 with `Content-Length` framing.
#[derive(Debug)]
pub struct Http11Codec {
    parser: RequestParser,
    force_close: bool,
}

impl Http11Codec {
    /// `force_close` closes every connection after its first response,
    /// whatever the client asked for.
    pub fn new(force_close: bool) -> Self {
        Self {
            parser: RequestParser::new(),
            force_close,
        }
    }
}

impl RequestCodec for Http11Codec {
    fn feed(&mut self, chunk: &[u8]) -> Result<bool, ParseError> {
        self.parser.feed(chunk)
    }

    fn finish(&mut self) -> bool {
        self.parser.finish_truncated()
    }

    fn request(&self) -> Option<&Request> {
        self.parser.request()
    }

    fn wants_close(&self) -> bool {
        self.force_close || self.parser.request().is_some_and(Request::wants_close)
    }

    fn encode(&self, response: &Response, close: bool) -> Vec<u8> {
        assert!(
            self.parser.is_complete(),
            "response encoded before the request was parsed"
        );
        serialize_response(response, close)
    }

    fn reset(&mut self) {
        self.parser.reset();
    }

    fn buffered(&self) -> usize {
        self.parser.buffered()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn close_header_is_literal() {
        let mut codec = Http11Codec::new(false);
        codec
            .feed(b"GET / HTTP/1.1\r\nConnection: Close\r\n\r\n")
            .unwrap();
        assert!(!codec.wants_close());

        codec.reset();
        codec
            .feed(b"GET / HTTP/1.1\r\nConnection: close\r\n\r\n")
            .unwrap();
        assert!(codec.wants_close());
    }

    #[test]
    #[should_panic(expected = "response encoded before the request was parsed")]
    fn encode_requires_complete_request() {
        let mut codec = Http11Codec::new(false);
        codec.feed(b"GET / HTTP/1.1\r\n").unwrap();
        codec.encode(&Response::ok("early"), false);
    }

    #[test]
    fn force_close_wins() {
        let mut codec = Http11Codec::new(true);
        codec
            .feed(b"GET / HTTP/1.1\r\nConnection: keep-alive\r\n\r\n")
            .unwrap();
        assert!(codec.wants_close());
    }
}
