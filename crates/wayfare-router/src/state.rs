//! Write-once response tracking.

use std::io;

use tracing::warn;

use crate::response::{Flush, Headers, Hijack, ResponseWriter};

/// Wraps the response sink for one request and turns repeated writes into
/// logged no-ops.
///
/// The first status write or successful body write marks the response as
/// written. After that, further status writes are dropped; the first body
/// write is still forwarded (it completes a response whose status was sent
/// explicitly), any later body write is dropped and reports `Ok(0)`.
///
/// Headers are frozen at the same point: once written, `headers_mut` hands
/// out an empty scratch map that never reaches the sink.
pub struct ResponseState<'a> {
    inner: &'a mut dyn ResponseWriter,
    written: bool,
    body_written: bool,
    status: Option<u16>,
    scratch: Headers,
}

impl<'a> ResponseState<'a> {
    /// Wraps `inner`.
    pub fn new(inner: &'a mut dyn ResponseWriter) -> Self {
        Self {
            inner,
            written: false,
            body_written: false,
            status: None,
            scratch: Headers::new(),
        }
    }

    /// The most recent status code sent through this wrapper.
    pub fn status(&self) -> Option<u16> {
        self.status
    }

    /// Whether a body write has been forwarded.
    pub fn body_written(&self) -> bool {
        self.body_written
    }
}

impl ResponseWriter for ResponseState<'_> {
    fn headers(&self) -> &Headers {
        self.inner.headers()
    }

    fn headers_mut(&mut self) -> &mut Headers {
        if self.written {
            warn!("header mutation after response was written, ignoring");
            self.scratch.clear();
            return &mut self.scratch;
        }
        self.inner.headers_mut()
    }

    fn write_header(&mut self, status: u16) {
        if self.written {
            warn!(status, "multiple response header writes, ignoring");
            return;
        }

        self.written = true;
        self.status = Some(status);
        self.inner.write_header(status);
    }

    fn write(&mut self, body: &[u8]) -> io::Result<usize> {
        if self.body_written {
            warn!(bytes = body.len(), "multiple response body writes, ignoring");
            return Ok(0);
        }

        let n = self.inner.write(body)?;
        if !self.written {
            self.status = Some(200);
        }
        self.written = true;
        self.body_written = true;
        Ok(n)
    }

    fn is_written(&self) -> bool {
        self.written
    }

    fn flusher(&mut self) -> Option<&mut dyn Flush> {
        self.inner.flusher()
    }

    fn hijacker(&mut self) -> Option<&mut dyn Hijack> {
        self.inner.hijacker()
    }
}

#[cfg(test)]
mod tests {
    use std::io::{Cursor, Read, Write};

    use super::*;
    use crate::response::{Connection, Response};

    #[test]
    fn test_first_header_is_authoritative() {
        let mut sink = Response::new();
        {
            let mut state = ResponseState::new(&mut sink);
            assert!(!state.is_written());
            state.write_header(201);
            state.write_header(500);
            assert!(state.is_written());
            assert_eq!(state.status(), Some(201));
        }

        assert_eq!(sink.status, 201);
    }

    #[test]
    fn test_header_then_body_is_forwarded() {
        let mut sink = Response::new();
        {
            let mut state = ResponseState::new(&mut sink);
            state.write_header(404);
            assert_eq!(state.write(b"missing").unwrap(), 7);
        }

        assert_eq!(sink.status, 404);
        assert_eq!(sink.body_string(), Some("missing".to_string()));
    }

    #[test]
    fn test_second_body_write_is_dropped() {
        let mut sink = Response::new();
        {
            let mut state = ResponseState::new(&mut sink);
            assert_eq!(state.write(b"first").unwrap(), 5);
            assert_eq!(state.write(b"second").unwrap(), 0);
            state.write_header(500);
            assert_eq!(state.status(), Some(200));
        }

        assert_eq!(sink.status, 200);
        assert_eq!(sink.body_string(), Some("first".to_string()));
    }

    struct StreamingSink {
        inner: Response,
        flushes: usize,
    }

    impl Flush for StreamingSink {
        fn flush(&mut self) -> io::Result<()> {
            self.flushes += 1;
            Ok(())
        }
    }

    impl Hijack for StreamingSink {
        fn hijack(&mut self) -> io::Result<Box<dyn Connection>> {
            Ok(Box::new(Cursor::new(b"raw".to_vec())))
        }
    }

    impl ResponseWriter for StreamingSink {
        fn headers(&self) -> &Headers {
            self.inner.headers()
        }

        fn headers_mut(&mut self) -> &mut Headers {
            self.inner.headers_mut()
        }

        fn write_header(&mut self, status: u16) {
            self.inner.write_header(status);
        }

        fn write(&mut self, body: &[u8]) -> io::Result<usize> {
            self.inner.write(body)
        }

        fn is_written(&self) -> bool {
            self.inner.is_written()
        }

        fn flusher(&mut self) -> Option<&mut dyn Flush> {
            Some(self)
        }

        fn hijacker(&mut self) -> Option<&mut dyn Hijack> {
            Some(self)
        }
    }

    #[test]
    fn test_capabilities_pass_through() {
        let mut sink = StreamingSink {
            inner: Response::new(),
            flushes: 0,
        };
        let mut raw = String::new();
        {
            let mut state = ResponseState::new(&mut sink);
            state.flusher().unwrap().flush().unwrap();
            let mut conn = state.hijacker().unwrap().hijack().unwrap();
            conn.read_to_string(&mut raw).unwrap();
            conn.write_all(b"!").unwrap();
        }

        assert_eq!(raw, "raw");
        assert_eq!(sink.flushes, 1);
    }

    #[test]
    fn test_headers_freeze_once_written() {
        let mut sink = Response::new();
        {
            let mut state = ResponseState::new(&mut sink);
            state
                .headers_mut()
                .insert("Content-Type".to_string(), "application/json".to_string());
            state.write_header(200);

            state
                .headers_mut()
                .insert("Content-Type".to_string(), "text/html".to_string());
            state.headers_mut().insert("X-Late".to_string(), "1".to_string());
            assert!(state.headers_mut().is_empty());
            assert_eq!(state.headers().len(), 1);
        }

        assert_eq!(sink.get_header("Content-Type"), Some("application/json"));
        assert_eq!(sink.get_header("X-Late"), None);
    }

    /// A sink whose first body write fails.
    struct FlakySink {
        inner: Response,
        fail_next: bool,
    }

    impl ResponseWriter for FlakySink {
        fn headers(&self) -> &Headers {
            self.inner.headers()
        }

        fn headers_mut(&mut self) -> &mut Headers {
            self.inner.headers_mut()
        }

        fn write_header(&mut self, status: u16) {
            self.inner.write_header(status);
        }

        fn write(&mut self, body: &[u8]) -> io::Result<usize> {
            if std::mem::take(&mut self.fail_next) {
                return Err(io::Error::new(io::ErrorKind::BrokenPipe, "sink unavailable"));
            }
            self.inner.write(body)
        }

        fn is_written(&self) -> bool {
            self.inner.is_written()
        }
    }

    #[test]
    fn test_failed_body_write_can_be_retried() {
        let mut sink = FlakySink {
            inner: Response::new(),
            fail_next: true,
        };
        {
            let mut state = ResponseState::new(&mut sink);
            assert!(state.write(b"lost").is_err());
            assert!(!state.is_written());
            assert!(!state.body_written());
            assert_eq!(state.status(), None);

            assert_eq!(state.write(b"kept").unwrap(), 4);
            assert!(state.body_written());
            assert_eq!(state.status(), Some(200));
        }

        assert_eq!(sink.inner.body_string(), Some("kept".to_string()));
    }

    #[test]
    fn test_missing_capabilities_are_none() {
        let mut sink = Response::new();
        let mut state = ResponseState::new(&mut sink);
        assert!(state.flusher().is_none());
        assert!(state.hijacker().is_none());
    }
}
