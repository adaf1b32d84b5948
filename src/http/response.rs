/// Status codes a handler can answer with. The router itself only emits
/// `BadRequest`, `NotFound` and `InternalServerError`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusCode {
    Ok,
    Created,
    NoContent,
    BadRequest,
    NotFound,
    MethodNotAllowed,
    InternalServerError,
    /// Any other code with its reason phrase, e.g. `Custom(301, "Moved Permanently")`.
    Custom(u16, &'static str),
}

impl StatusCode {
    /// ```
    /// # use switchyard::http::response::StatusCode;
    /// assert_eq!(StatusCode::NotFound.as_u16(), 404);
    /// ```
    pub fn as_u16(&self) -> u16 {
        match self {
            Self::Ok => 200,
            Self::Created => 201,
            Self::NoContent => 204,
            Self::BadRequest => 400,
            Self::NotFound => 404,
            Self::MethodNotAllowed => 405,
            Self::InternalServerError => 500,
            Self::Custom(code, _) => *code,
        }
    }

    pub fn reason_phrase(&self) -> &'static str {
        match self {
            Self::Ok => "OK",
            Self::Created => "Created",
            Self::NoContent => "No Content",
            Self::BadRequest => "Bad Request",
            Self::NotFound => "Not Found",
            Self::MethodNotAllowed => "Method Not Allowed",
            Self::InternalServerError => "Internal Server Error",
            Self::Custom(_, reason) => reason,
        }
    }

    /// The full status line, CRLF included: `HTTP/1.1 404 Not Found\r\n`.
    pub fn status_line(&self) -> String {
        format!("HTTP/1.1 {} {}\r\n", self.as_u16(), self.reason_phrase())
    }
}

/// A response produced by a handler, not yet serialized.
///
/// `Content-Length` and `Connection` are always computed by the serializer;
/// entries for them in `headers` are ignored on the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub status: StatusCode,
    /// Caller headers, written in this order.
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

/// ```
/// # use switchyard::http::response::{ResponseBuilder, StatusCode};
/// let response = ResponseBuilder::new(StatusCode::Ok)
///     .header("Cache-Control", "no-cache")
///     .body(b"{}".to_vec())
///     .build();
/// assert_eq!(response.header("Cache-Control"), Some("no-cache"));
/// ```
pub struct ResponseBuilder {
    status: StatusCode,
    headers: Vec<(String, String)>,
    body: Vec<u8>,
}

impl ResponseBuilder {
    pub fn new(status: StatusCode) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body: Vec::new(),
        }
    }

    /// Appends a header. Order of calls is the order on the wire.
    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((key.into(), value.into()));
        self
    }

    pub fn body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self
    }

    pub fn build(self) -> Response {
        Response {
            status: self.status,
            headers: self.headers,
            body: self.body,
        }
    }
}

impl Response {
    /// `200 OK` with `body`.
    pub fn ok(body: impl Into<Vec<u8>>) -> Self {
        ResponseBuilder::new(StatusCode::Ok).body(body).build()
    }

    /// Error response whose body repeats the status, e.g. `404 Not Found`.
    pub fn error(status: StatusCode) -> Self {
        let body = format!("{} {}", status.as_u16(), status.reason_phrase());
        ResponseBuilder::new(status).body(body).build()
    }

    pub fn bad_request() -> Self {
        Self::error(StatusCode::BadRequest)
    }

    pub fn not_found() -> Self {
        Self::error(StatusCode::NotFound)
    }

    pub fn internal_error() -> Self {
        Self::error(StatusCode::InternalServerError)
    }

    /// First caller header named `key`, ignoring ASCII case.
    pub fn header(&self, key: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(key))
            .map(|(_, value)| value.as_str())
    }
}
