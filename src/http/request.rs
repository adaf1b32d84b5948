use std::collections::HashMap;

/// HTTP request methods accepted by the parser.
///
/// Anything outside this set is rejected with
/// [`ParseError::UnsupportedMethod`](crate::http::parser::ParseError::UnsupportedMethod).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    GET,
    POST,
    PUT,
    DELETE,
    HEAD,
    OPTIONS,
    PATCH,
}

/// A fully assembled HTTP request.
///
/// Produced by the parser once the header block and exactly
/// `Content-Length` body bytes have arrived.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub method: Method,
    /// Request target exactly as sent, e.g. `/site/index.html`.
    pub path: String,
    pub version: String,
    /// Request headers; a repeated key keeps the last value seen
    pub headers: HashMap<String, String>,
    /// Request body, empty when no Content-Length was sent
    pub body: Vec<u8>,
}

/// Assembles a [`Request`] by hand, mostly for handlers under test.
#[derive(Debug, Default)]
pub struct RequestBuilder {
    method: Option<Method>,
    path: Option<String>,
    version: Option<String>,
    headers: HashMap<String, String>,
    body: Vec<u8>,
}

impl Method {
    /// Parses an HTTP method, ignoring ASCII case.
    ///
    /// # Example
    ///
    /// ```
    /// # use switchyard::http::request::Method;
    /// assert_eq!(Method::from_str("GET"), Some(Method::GET));
    /// assert_eq!(Method::from_str("patch"), Some(Method::PATCH));
    /// assert_eq!(Method::from_str("TRACE"), None);
    /// ```
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        const METHODS: [(&str, Method); 7] = [
            ("GET", Method::GET),
            ("POST", Method::POST),
            ("PUT", Method::PUT),
            ("DELETE", Method::DELETE),
            ("HEAD", Method::HEAD),
            ("OPTIONS", Method::OPTIONS),
            ("PATCH", Method::PATCH),
        ];

        METHODS
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(s))
            .map(|(_, method)| *method)
    }

    /// Canonical upper-case name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::GET => "GET",
            Method::POST => "POST",
            Method::PUT => "PUT",
            Method::DELETE => "DELETE",
            Method::HEAD => "HEAD",
            Method::OPTIONS => "OPTIONS",
            Method::PATCH => "PATCH",
        }
    }
}

impl RequestBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn method(mut self, method: Method) -> Self {
        self.method = Some(method);
        self
    }

    pub fn path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    pub fn body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self
    }

    pub fn build(self) -> Result<Request, &'static str> {
        Ok(Request {
            method: self.method.ok_or("method missing")?,
            path: self.path.ok_or("path missing")?,
            version: self.version.unwrap_or_else(|| "HTTP/1.1".to_string()),
            headers: self.headers,
            body: self.body,
        })
    }
}

impl Request {
    /// Retrieves a header value by name.
    ///
    /// An exact key match wins; otherwise the first key equal to `key`
    /// ignoring ASCII case is returned.
    pub fn header(&self, key: &str) -> Option<&str> {
        if let Some(value) = self.headers.get(key) {
            return Some(value.as_str());
        }

        self.headers
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(key))
            .map(|(_, value)| value.as_str())
    }

    /// Whether the client asked for the connection to be closed.
    ///
    /// Only the literal value `close` counts; `Close` or `CLOSE` keep the
    /// connection open.
    pub fn wants_close(&self) -> bool {
        self.header("Connection") == Some("close")
    }

    /// First segment of the request target, used as the routing key.
    ///
    /// `/site/a/b` yields `site`; `/` and the empty target yield `""`.
    pub fn route_key(&self) -> &str {
        self.path
            .strip_prefix('/')
            .unwrap_or(&self.path)
            .split('/')
            .next()
            .unwrap_or("")
    }
}
