//! Response sinks.
//!
//! Handlers never build a response value; they write to a [`ResponseWriter`].
//! [`Response`] is the buffered sink used by the hosting server and by tests.

use std::collections::HashMap;
use std::io::{self, Read, Write};

/// Response headers.
pub type Headers = HashMap<String, String>;

/// Destination for a handler's response.
///
/// Wrappers around another writer should forward every method, including
/// [`is_written`](Self::is_written) and the capability probes, so that code
/// further down the chain sees the real state of the response.
pub trait ResponseWriter {
    /// Headers that will be sent with the response.
    fn headers(&self) -> &Headers;

    /// Mutable access to the headers. Changes after the status line has been
    /// sent have no effect on the client.
    fn headers_mut(&mut self) -> &mut Headers;

    /// Sends the status line and headers.
    fn write_header(&mut self, status: u16);

    /// Writes body bytes, sending a `200` status first if none was sent.
    fn write(&mut self, body: &[u8]) -> io::Result<usize>;

    /// Whether a response has already been committed through this writer.
    ///
    /// The handler chain stops on this flag, so wrappers must report the
    /// state of the writer they wrap.
    fn is_written(&self) -> bool;

    /// The flush capability, if the sink has one.
    fn flusher(&mut self) -> Option<&mut dyn Flush> {
        None
    }

    /// The connection-takeover capability, if the sink has one.
    fn hijacker(&mut self) -> Option<&mut dyn Hijack> {
        None
    }
}

/// Pushes buffered response data to the client.
pub trait Flush {
    fn flush(&mut self) -> io::Result<()>;
}

/// A raw connection taken over from the HTTP layer.
pub trait Connection: Read + Write + Send {}

impl<T: Read + Write + Send> Connection for T {}

/// Hands the underlying connection to the caller.
///
/// After a successful hijack the HTTP layer no longer writes to the
/// connection.
pub trait Hijack {
    fn hijack(&mut self) -> io::Result<Box<dyn Connection>>;
}

/// A buffered HTTP response.
#[derive(Debug, Clone)]
pub struct Response {
    /// HTTP status code.
    pub status: u16,
    /// Response headers.
    pub headers: Headers,
    /// Response body.
    pub body: Vec<u8>,
    header_sent: bool,
}

impl Response {
    /// Creates an empty response with status `200`.
    pub fn new() -> Self {
        Self {
            status: 200,
            headers: HashMap::new(),
            body: Vec::new(),
            header_sent: false,
        }
    }

    /// Gets a header value, ignoring ASCII case.
    pub fn get_header(&self, key: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v.as_str())
    }

    /// Returns the body as a string.
    pub fn body_string(&self) -> Option<String> {
        String::from_utf8(self.body.clone()).ok()
    }

    /// Returns `true` once a status has been sent.
    pub fn header_sent(&self) -> bool {
        self.header_sent
    }
}

impl Default for Response {
    fn default() -> Self {
        Self::new()
    }
}

impl ResponseWriter for Response {
    fn headers(&self) -> &Headers {
        &self.headers
    }

    fn headers_mut(&mut self) -> &mut Headers {
        &mut self.headers
    }

    fn write_header(&mut self, status: u16) {
        if !self.header_sent {
            self.status = status;
            self.header_sent = true;
        }
    }

    fn write(&mut self, body: &[u8]) -> io::Result<usize> {
        self.header_sent = true;
        self.body.extend_from_slice(body);
        Ok(body.len())
    }

    fn is_written(&self) -> bool {
        self.header_sent
    }
}
