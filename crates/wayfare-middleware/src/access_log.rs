//! Request access logging.

use std::io;
use std::time::Instant;

use tracing::{error, info};
use wayfare_router::{Flush, Headers, Hijack, Middleware, Next, Request, ResponseWriter};

/// Logs every request once the rest of the chain has run.
///
/// The event is emitted at `INFO` on the `wayfare::access` target with the
/// method, path, status and elapsed time. If a handler stored an error on the
/// request, it is logged at `ERROR` as well.
#[derive(Debug, Clone, Copy, Default)]
pub struct AccessLog;

impl AccessLog {
    pub fn new() -> Self {
        Self
    }
}

impl Middleware for AccessLog {
    fn handle(&self, w: &mut dyn ResponseWriter, req: &mut Request, next: Next<'_>) {
        let start = Instant::now();
        let mut recorder = StatusRecorder::new(w);
        next(&mut recorder, req);
        let status = recorder.status;
        let elapsed = start.elapsed();

        info!(
            target: "wayfare::access",
            method = %req.method,
            path = %req.path,
            status = ?status,
            elapsed_us = u64::try_from(elapsed.as_micros()).unwrap_or(u64::MAX),
            "request served"
        );

        if let Some(err) = req.error() {
            error!(
                target: "wayfare::access",
                method = %req.method,
                path = %req.path,
                error = %err,
                "request failed"
            );
        }
    }
}

/// Remembers the status that reached the client.
struct StatusRecorder<'a> {
    inner: &'a mut dyn ResponseWriter,
    status: Option<u16>,
}

impl<'a> StatusRecorder<'a> {
    fn new(inner: &'a mut dyn ResponseWriter) -> Self {
        Self {
            inner,
            status: None,
        }
    }
}

impl ResponseWriter for StatusRecorder<'_> {
    fn headers(&self) -> &Headers {
        self.inner.headers()
    }

    fn headers_mut(&mut self) -> &mut Headers {
        self.inner.headers_mut()
    }

    fn write_header(&mut self, status: u16) {
        if !self.inner.is_written() {
            self.status = Some(status);
        }
        self.inner.write_header(status);
    }

    fn write(&mut self, body: &[u8]) -> io::Result<usize> {
        if !self.inner.is_written() {
            self.status = Some(200);
        }
        self.inner.write(body)
    }

    fn is_written(&self) -> bool {
        self.inner.is_written()
    }

    fn flusher(&mut self) -> Option<&mut dyn Flush> {
        self.inner.flusher()
    }

    fn hijacker(&mut self) -> Option<&mut dyn Hijack> {
        self.inner.hijacker()
    }
}
