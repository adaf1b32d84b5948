use crate::http::request::{Method, Request};
use bytes::{Buf, BytesMut};
use std::collections::HashMap;

const HEADER_TERMINATOR: &[u8] = b"\r\n\r\n";
const SUPPORTED_VERSION: &str = "HTTP/1.1";

/// Reasons a request is rejected. None of them is answered on the wire:
/// the connection is dropped.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("malformed request line: {0:?}")]
    MalformedRequestLine(String),
    #[error("unsupported method: {0}")]
    UnsupportedMethod(String),
    #[error("unsupported version: {0}")]
    UnsupportedVersion(String),
    #[error("malformed Content-Length: {0:?}")]
    MalformedContentLength(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseState {
    AwaitingHeaders,
    AwaitingBody { declared_length: usize },
    Complete(Request),
    Error(ParseError),
}

/// Incremental parser for a single HTTP/1.1 request.
///
/// Bytes are fed as they come off the socket, in chunks of any size. The
/// header terminator search resumes where the previous one stopped, so a
/// request trickling in one byte at a time is still scanned once.
///
/// A parser handles exactly one request. Once it reaches
/// [`ParseState::Complete`] further input is ignored. Bytes that arrived in
/// the same chunk after the request are held, and [`RequestParser::reset`]
/// keeps them as the start of the next request.
#[derive(Debug)]
pub struct RequestParser {
    inbound: BytesMut,
    state: ParseState,
    // Offset where the next terminator search starts.
    scan_from: usize,
    body_start: usize,
    // End of the completed request within `inbound`.
    consumed: usize,
    head: Option<Request>,
}

impl Default for RequestParser {
    fn default() -> Self {
        Self::new()
    }
}

impl RequestParser {
    pub fn new() -> Self {
        Self {
            inbound: BytesMut::with_capacity(1024),
            state: ParseState::AwaitingHeaders,
            scan_from: 0,
            body_start: 0,
            consumed: 0,
            head: None,
        }
    }

    /// Appends `chunk` and advances the state machine.
    ///
    /// Returns `Ok(true)` once the request is complete, `Ok(false)` while
    /// more bytes are needed. After an error every call returns that error.
    pub fn feed(&mut self, chunk: &[u8]) -> Result<bool, ParseError> {
        match &self.state {
            ParseState::Complete(_) => return Ok(true),
            ParseState::Error(err) => return Err(err.clone()),
            _ => {}
        }

        self.inbound.extend_from_slice(chunk);

        if self.state == ParseState::AwaitingHeaders {
            let Some(headers_end) = self.find_headers_end() else {
                return Ok(false);
            };

            match parse_head(&self.inbound[..headers_end]) {
                Ok((head, declared_length)) => {
                    self.body_start = headers_end + HEADER_TERMINATOR.len();
                    self.head = Some(head);
                    self.state = ParseState::AwaitingBody { declared_length };
                }
                Err(err) => {
                    self.state = ParseState::Error(err.clone());
                    return Err(err);
                }
            }
        }

        if let ParseState::AwaitingBody { declared_length } = self.state {
            let received = self.inbound.len() - self.body_start;
            if received < declared_length {
                return Ok(false);
            }

            let body_end = self.body_start + declared_length;
            if let Some(mut request) = self.head.take() {
                request.body = self.inbound[self.body_start..body_end].to_vec();
                self.consumed = body_end;
                if self.inbound.len() > body_end {
                    tracing::debug!(
                        held = self.inbound.len() - body_end,
                        "Holding bytes past the end of the request"
                    );
                }
                self.state = ParseState::Complete(request);
                return Ok(true);
            }
        }

        Ok(false)
    }

    pub fn state(&self) -> &ParseState {
        &self.state
    }

    pub fn is_complete(&self) -> bool {
        matches!(self.state, ParseState::Complete(_))
    }

    /// The parsed request, once complete.
    pub fn request(&self) -> Option<&Request> {
        match &self.state {
            ParseState::Complete(request) => Some(request),
            _ => None,
        }
    }

    /// Whether the header block has been parsed (the request line and
    /// headers are known, the body may still be short).
    pub fn headers_parsed(&self) -> bool {
        matches!(
            self.state,
            ParseState::AwaitingBody { .. } | ParseState::Complete(_)
        )
    }

    /// Completes a request whose body was cut short by end-of-stream,
    /// keeping whatever body bytes arrived.
    ///
    /// Returns `false` when the header block never finished, in which case
    /// there is nothing to answer.
    pub fn finish_truncated(&mut self) -> bool {
        match self.state {
            ParseState::Complete(_) => true,
            ParseState::AwaitingBody { .. } => match self.head.take() {
                Some(mut request) => {
                    request.body = self.inbound[self.body_start..].to_vec();
                    self.consumed = self.inbound.len();
                    self.state = ParseState::Complete(request);
                    true
                }
                None => false,
            },
            _ => false,
        }
    }

    /// Bytes held that do not belong to a completed request.
    pub fn buffered(&self) -> usize {
        self.inbound.len() - self.consumed
    }

    /// Drops the current request so the parser can take the next one.
    /// Bytes held past the end of a completed request are kept.
    pub fn reset(&mut self) {
        if self.is_complete() {
            self.inbound.advance(self.consumed);
        } else {
            self.inbound.clear();
        }
        self.consumed = 0;
        self.state = ParseState::AwaitingHeaders;
        self.scan_from = 0;
        self.body_start = 0;
        self.head = None;
    }

    fn find_headers_end(&mut self) -> Option<usize> {
        let found = self.inbound[self.scan_from..]
            .windows(HEADER_TERMINATOR.len())
            .position(|w| w == HEADER_TERMINATOR)
            .map(|pos| self.scan_from + pos);

        if found.is_none() {
            // A terminator may straddle this chunk and the next one.
            self.scan_from = self
                .inbound
                .len()
                .saturating_sub(HEADER_TERMINATOR.len() - 1);
        }

        found
    }
}

fn parse_head(head: &[u8]) -> Result<(Request, usize), ParseError> {
    let text = String::from_utf8_lossy(head);
    let mut lines = text.split("\r\n");

    let request_line = lines.next().unwrap_or_default();
    let parts: Vec<&str> = request_line.split(' ').collect();
    let [method, path, version] = parts.as_slice() else {
        return Err(ParseError::MalformedRequestLine(request_line.to_string()));
    };

    let method =
        Method::from_str(method).ok_or_else(|| ParseError::UnsupportedMethod(method.to_string()))?;

    if !version.eq_ignore_ascii_case(SUPPORTED_VERSION) {
        return Err(ParseError::UnsupportedVersion(version.to_string()));
    }

    let mut headers = HashMap::new();
    let mut declared_length = 0;

    for line in lines {
        // A line with nothing after the separator is not a header.
        let Some((key, value)) = line.split_once(": ").filter(|(_, v)| !v.is_empty()) else {
            continue;
        };

        if key.eq_ignore_ascii_case("content-length") {
            declared_length = value
                .parse::<usize>()
                .map_err(|_| ParseError::MalformedContentLength(value.to_string()))?;
        }

        headers.insert(key.to_string(), value.to_string());
    }

    let request = Request {
        method,
        path: path.to_string(),
        version: version.to_string(),
        headers,
        body: Vec::new(),
    };

    Ok((request, declared_length))
}
