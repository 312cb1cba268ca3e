//! Route definitions.

use std::fmt;
use std::sync::Arc;

use crate::error::{Result, RouterError};
use crate::pattern::PathPattern;
use crate::request::{Method, PathParams, Request};
use crate::response::ResponseWriter;

/// A request handler.
pub type Handler = Arc<dyn Fn(&mut dyn ResponseWriter, &mut Request) + Send + Sync>;

/// A route as registered by the application.
///
/// Nothing is validated here; [`Router::new`](crate::Router::new) compiles
/// and checks every route at once.
///
/// # Example
///
/// ```
/// use wayfare_router::{responses, Route};
///
/// let route = Route::new("user", "GET", "/users/:id")
///     .trailing_slash(true)
///     .handler(|w, req| {
///         let id = req.params().get("id").unwrap_or_default().to_string();
///         responses::ok(w, &id);
///     });
/// assert_eq!(route.pattern, "/users/:id");
/// ```
#[derive(Clone)]
pub struct Route {
    /// Label used in diagnostics; should be unique.
    pub name: String,
    /// HTTP method token.
    pub method: String,
    /// URI pattern.
    pub pattern: String,
    /// Also match the path with a trailing `/`.
    pub trailing_slash: bool,
    /// Keep running handlers after one of them has written a response.
    pub fall_through: bool,
    /// Exclude this route from router-wide middleware.
    pub skip_middleware: bool,
    /// Handlers, run in order.
    pub handlers: Vec<Handler>,
}

impl Route {
    /// Creates a route with no handlers.
    pub fn new(name: impl Into<String>, method: impl Into<String>, pattern: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            method: method.into(),
            pattern: pattern.into(),
            trailing_slash: false,
            fall_through: false,
            skip_middleware: false,
            handlers: Vec::new(),
        }
    }

    /// Appends a handler to the chain.
    #[must_use]
    pub fn handler<F>(mut self, handler: F) -> Self
    where
        F: Fn(&mut dyn ResponseWriter, &mut Request) + Send + Sync + 'static,
    {
        self.handlers.push(Arc::new(handler));
        self
    }

    /// Sets trailing-slash tolerance.
    #[must_use]
    pub fn trailing_slash(mut self, enabled: bool) -> Self {
        self.trailing_slash = enabled;
        self
    }

    /// Sets fallthrough after a response has been written.
    #[must_use]
    pub fn fall_through(mut self, enabled: bool) -> Self {
        self.fall_through = enabled;
        self
    }

    /// Sets whether router-wide middleware is skipped.
    #[must_use]
    pub fn skip_middleware(mut self, enabled: bool) -> Self {
        self.skip_middleware = enabled;
        self
    }

    /// Validates and compiles the route.
    pub(crate) fn compile(self) -> Result<CompiledRoute> {
        let Some(method) = Method::parse(&self.method) else {
            return Err(RouterError::UnsupportedMethod {
                name: self.name,
                method: self.method,
                pattern: self.pattern,
            });
        };

        if self.handlers.is_empty() {
            return Err(RouterError::NoHandlers {
                name: self.name,
                method: self.method,
                pattern: self.pattern,
            });
        }

        let pattern = PathPattern::compile(&self.pattern, self.trailing_slash)?;

        Ok(CompiledRoute {
            name: self.name,
            method,
            pattern,
            fall_through: self.fall_through,
            skip_middleware: self.skip_middleware,
            handlers: self.handlers,
        })
    }
}

impl fmt::Debug for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Route")
            .field("name", &self.name)
            .field("method", &self.method)
            .field("pattern", &self.pattern)
            .field("trailing_slash", &self.trailing_slash)
            .field("fall_through", &self.fall_through)
            .field("skip_middleware", &self.skip_middleware)
            .field("handlers", &self.handlers.len())
            .finish()
    }
}

/// A validated route with its compiled matcher. Immutable once built.
pub struct CompiledRoute {
    name: String,
    method: Method,
    pattern: PathPattern,
    fall_through: bool,
    skip_middleware: bool,
    handlers: Vec<Handler>,
}

impl CompiledRoute {
    /// The route's name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The route's method.
    pub fn method(&self) -> Method {
        self.method
    }

    /// The original pattern string.
    pub fn pattern(&self) -> &str {
        self.pattern.pattern()
    }

    /// The compiled pattern.
    pub fn path_pattern(&self) -> &PathPattern {
        &self.pattern
    }

    /// Whether handlers keep running after a response was written.
    pub fn fall_through(&self) -> bool {
        self.fall_through
    }

    /// Whether router-wide middleware is skipped.
    pub fn skip_middleware(&self) -> bool {
        self.skip_middleware
    }

    /// Matches an escaped request path, returning its parameters.
    pub fn match_path(&self, path: &str) -> Option<PathParams> {
        self.pattern.match_path(path)
    }

    /// Runs the handler chain.
    ///
    /// A handler runs only while nothing has been written, unless the route
    /// falls through, in which case every handler runs.
    pub fn serve(&self, w: &mut dyn ResponseWriter, req: &mut Request) {
        for handler in &self.handlers {
            if w.is_written() && !self.fall_through {
                break;
            }
            handler(&mut *w, &mut *req);
        }
    }
}

impl fmt::Debug for CompiledRoute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompiledRoute")
            .field("name", &self.name)
            .field("method", &self.method)
            .field("pattern", &self.pattern.pattern())
            .field("fall_through", &self.fall_through)
            .field("skip_middleware", &self.skip_middleware)
            .field("handlers", &self.handlers.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, Ordering};

    use super::*;
    use crate::response::Response;
    use crate::state::ResponseState;

    fn noop(_w: &mut dyn ResponseWriter, _req: &mut Request) {}

    #[test]
    fn test_compile_rejects_unsupported_method() {
        let err = Route::new("trace", "TRACE", "/").handler(noop).compile().unwrap_err();
        assert!(matches!(err, RouterError::UnsupportedMethod { ref method, .. } if method == "TRACE"));
        assert!(err.to_string().contains("TRACE"));
    }

    #[test]
    fn test_compile_rejects_empty_handlers() {
        let err = Route::new("empty", "GET", "/a").compile().unwrap_err();
        assert!(matches!(err, RouterError::NoHandlers { .. }));
        assert!(err.to_string().contains("/a"));
    }

    #[test]
    fn test_compile_propagates_pattern_errors() {
        let err = Route::new("dup", "GET", "/a/:x/:x")
            .handler(noop)
            .compile()
            .unwrap_err();
        assert!(matches!(err, RouterError::DuplicateParameterKey { .. }));
    }

    fn chain(fall_through: bool, ran_second: Arc<AtomicBool>) -> CompiledRoute {
        Route::new("chain", "GET", "/")
            .fall_through(fall_through)
            .handler(|w, _req| w.write_header(200))
            .handler(move |_w, _req| ran_second.store(true, Ordering::SeqCst))
            .compile()
            .unwrap()
    }

    #[test]
    fn test_chain_stops_after_write() {
        let ran_second = Arc::new(AtomicBool::new(false));
        let route = chain(false, Arc::clone(&ran_second));

        let mut sink = Response::new();
        route.serve(&mut ResponseState::new(&mut sink), &mut Request::get("/"));

        assert!(!ran_second.load(Ordering::SeqCst));
    }

    #[test]
    fn test_chain_falls_through() {
        let ran_second = Arc::new(AtomicBool::new(false));
        let route = chain(true, Arc::clone(&ran_second));

        let mut sink = Response::new();
        route.serve(&mut ResponseState::new(&mut sink), &mut Request::get("/"));

        assert!(ran_second.load(Ordering::SeqCst));
    }
}
