//! HTTP request type.

use std::collections::HashMap;
use std::error::Error;
use std::sync::Arc;

use crate::context::RequestContext;

/// HTTP request methods the router can register routes for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    /// OPTIONS method
    Options,
    /// HEAD method
    Head,
    /// GET method
    Get,
    /// POST method
    Post,
    /// PUT method
    Put,
    /// PATCH method
    Patch,
    /// DELETE method
    Delete,
}

impl Method {
    /// Parses a method token. Method names are case-sensitive.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "OPTIONS" => Some(Self::Options),
            "HEAD" => Some(Self::Head),
            "GET" => Some(Self::Get),
            "POST" => Some(Self::Post),
            "PUT" => Some(Self::Put),
            "PATCH" => Some(Self::Patch),
            "DELETE" => Some(Self::Delete),
            _ => None,
        }
    }

    /// Returns the method as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Options => "OPTIONS",
            Self::Head => "HEAD",
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Patch => "PATCH",
            Self::Delete => "DELETE",
        }
    }
}

impl std::fmt::Display for Method {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// URI parameters extracted from the request path.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PathParams {
    params: HashMap<String, String>,
}

impl PathParams {
    /// Creates new empty path params.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a parameter.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.params.insert(key.into(), value.into());
    }

    /// Gets a parameter value.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(String::as_str)
    }

    /// Parses a parameter as a specific type.
    pub fn parse<T: std::str::FromStr>(&self, key: &str) -> Option<T> {
        self.get(key).and_then(|v| v.parse().ok())
    }

    /// Number of extracted parameters.
    pub fn len(&self) -> usize {
        self.params.len()
    }

    /// Returns `true` when nothing was extracted.
    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    /// Returns an iterator over the parameters.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.params.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

/// An HTTP request as seen by handlers and middleware.
///
/// `method` is kept as the raw token so requests with methods outside
/// [`Method`] can still be dispatched (to the not-implemented handler).
/// `path` is the escaped path, without the query string.
#[derive(Debug, Clone)]
pub struct Request {
    /// HTTP method token.
    pub method: String,
    /// Escaped request path.
    pub path: String,
    /// Query string parameters.
    pub query: HashMap<String, String>,
    /// Request headers.
    pub headers: HashMap<String, String>,
    /// Request body.
    pub body: Vec<u8>,
    context: RequestContext,
}

impl Request {
    /// Creates a new request.
    pub fn new(method: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            path: path.into(),
            query: HashMap::new(),
            headers: HashMap::new(),
            body: Vec::new(),
            context: RequestContext::default(),
        }
    }

    /// Creates a GET request.
    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::Get.as_str(), path)
    }

    /// Creates a POST request.
    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::Post.as_str(), path)
    }

    /// Sets a header.
    #[must_use]
    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    /// Sets the body.
    #[must_use]
    pub fn body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self
    }

    /// Sets a query parameter.
    #[must_use]
    pub fn query_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.insert(key.into(), value.into());
        self
    }

    /// Gets a header value.
    pub fn get_header(&self, key: &str) -> Option<&str> {
        // Case-insensitive header lookup
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v.as_str())
    }

    /// Gets a query parameter.
    pub fn get_query(&self, key: &str) -> Option<&str> {
        self.query.get(key).map(String::as_str)
    }

    /// Returns the body as a string.
    pub fn body_string(&self) -> Option<String> {
        String::from_utf8(self.body.clone()).ok()
    }

    /// Parses the body as JSON.
    pub fn json<T: serde::de::DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_slice(&self.body)
    }

    /// The per-request routing context.
    pub fn context(&self) -> &RequestContext {
        &self.context
    }

    /// Mutable access to the per-request routing context.
    pub fn context_mut(&mut self) -> &mut RequestContext {
        &mut self.context
    }

    /// URI parameters of the matched route.
    pub fn params(&self) -> &PathParams {
        self.context.params()
    }

    /// Records an error for later middleware to act on.
    pub fn set_error(&mut self, err: impl Error + Send + Sync + 'static) {
        self.context.set_error(Arc::new(err));
    }

    /// The error recorded by a handler, if any.
    pub fn error(&self) -> Option<&(dyn Error + Send + Sync + 'static)> {
        self.context.error()
    }

    pub(crate) fn replace_context(&mut self, context: RequestContext) {
        self.context = context;
    }

    /// Parses query parameters from a query string.
    pub fn parse_query_string(query: &str) -> HashMap<String, String> {
        query
            .split('&')
            .filter(|pair| !pair.is_empty())
            .filter_map(|pair| {
                let mut parts = pair.splitn(2, '=');
                let key = parts.next()?;
                let value = parts.next().unwrap_or("");
                Some((urlencoding_decode(key), urlencoding_decode(value)))
            })
            .collect()
    }
}

/// Simple URL decoding.
fn urlencoding_decode(s: &str) -> String {
    let mut bytes = Vec::with_capacity(s.len());
    let mut rest = s.as_bytes();

    while let Some((&b, tail)) = rest.split_first() {
        match b {
            b'%' if tail.len() >= 2 => {
                let decoded = std::str::from_utf8(&tail[..2])
                    .ok()
                    .and_then(|hex| u8::from_str_radix(hex, 16).ok());
                match decoded {
                    Some(byte) => {
                        bytes.push(byte);
                        rest = &tail[2..];
                    }
                    None => {
                        bytes.push(b'%');
                        rest = tail;
                    }
                }
            }
            b'+' => {
                bytes.push(b' ');
                rest = tail;
            }
            _ => {
                bytes.push(b);
                rest = tail;
            }
        }
    }

    String::from_utf8_lossy(&bytes).into_owned()
}
