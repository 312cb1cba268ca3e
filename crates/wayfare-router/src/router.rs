//! Main router implementation.

use std::fmt;
use std::sync::Arc;

use tracing::{debug, trace};

use crate::context::{AppContext, RequestContext};
use crate::error::{Result, RouteWarning};
use crate::middleware::{wrap, Middleware};
use crate::request::{Method, Request};
use crate::response::ResponseWriter;
use crate::responses;
use crate::route::{Handler, Route};
use crate::state::ResponseState;
use crate::table::MethodTable;

/// The HTTP router.
///
/// Built once from the full route list, then configured with middleware
/// through `&mut self` methods, then shared (typically in an `Arc`) and
/// served through [`Router::serve`], which only needs `&self`.
///
/// # Example
///
/// ```
/// use wayfare_router::{middleware::from_fn, responses, Request, Response, Route, Router};
///
/// let mut router = Router::new(vec![
///     Route::new("hello", "GET", "/hello/:name").handler(|w, req| {
///         let name = req.params().get("name").unwrap_or("world").to_string();
///         responses::send(w, "text/plain", format!("Hello, {name}!"), 200);
///     }),
/// ])
/// .unwrap();
/// router.use_middleware(from_fn(|w, req, next| {
///     w.headers_mut().insert("X-Router".to_string(), "wayfare".to_string());
///     next(w, req);
/// }));
///
/// let mut res = Response::new();
/// router.serve(&mut res, &mut Request::get("/hello/ferris"));
/// assert_eq!(res.body_string(), Some("Hello, ferris!".to_string()));
/// assert_eq!(res.get_header("X-Router"), Some("wayfare"));
/// ```
pub struct Router {
    table: MethodTable,
    not_found: Handler,
    not_implemented: Handler,
    app: Arc<AppContext>,
    middleware_count: usize,
}

impl Router {
    /// Builds a router from `routes`.
    ///
    /// Fails if any route has an unsupported method, no handlers, or an
    /// invalid pattern.
    pub fn new(routes: Vec<Route>) -> Result<Self> {
        let table = MethodTable::build(routes)?;

        Ok(Self {
            table,
            not_found: Arc::new(default_not_found),
            not_implemented: Arc::new(default_not_implemented),
            app: Arc::new(AppContext::new()),
            middleware_count: 0,
        })
    }

    /// Sets the application state made available to every request.
    #[must_use]
    pub fn with_app_context(mut self, app: AppContext) -> Self {
        self.app = Arc::new(app);
        self
    }

    /// Replaces the handler for requests that match no route.
    ///
    /// Call this before [`use_on_special_handlers`](Self::use_on_special_handlers),
    /// which wraps the handler present at that time.
    pub fn set_not_found<F>(&mut self, handler: F)
    where
        F: Fn(&mut dyn ResponseWriter, &mut Request) + Send + Sync + 'static,
    {
        self.not_found = Arc::new(handler);
    }

    /// Replaces the handler for requests whose method has no routes.
    pub fn set_not_implemented<F>(&mut self, handler: F)
    where
        F: Fn(&mut dyn ResponseWriter, &mut Request) + Send + Sync + 'static,
    {
        self.not_implemented = Arc::new(handler);
    }

    /// Wraps every route (except those that skip middleware) in `mw`.
    ///
    /// The most recently added middleware runs first.
    pub fn use_middleware(&mut self, mw: impl Middleware + 'static) {
        let mw: Arc<dyn Middleware> = Arc::new(mw);
        for entry in self.table.entries_mut() {
            if entry.route.skip_middleware() {
                continue;
            }
            entry.serve = wrap(Arc::clone(&mw), Arc::clone(&entry.serve));
        }
        self.middleware_count += 1;
        debug!(layers = self.middleware_count, "middleware added to routes");
    }

    /// Wraps the not-found and not-implemented handlers in `mw`.
    ///
    /// The most recently added middleware runs first.
    pub fn use_on_special_handlers(&mut self, mw: impl Middleware + 'static) {
        let mw: Arc<dyn Middleware> = Arc::new(mw);
        self.not_found = wrap(Arc::clone(&mw), Arc::clone(&self.not_found));
        self.not_implemented = wrap(mw, Arc::clone(&self.not_implemented));
    }

    /// The compiled route table.
    pub fn table(&self) -> &MethodTable {
        &self.table
    }

    /// Warnings raised while the routes were registered.
    pub fn warnings(&self) -> &[RouteWarning] {
        self.table.warnings()
    }

    /// The shared application state.
    pub fn app_context(&self) -> &AppContext {
        &self.app
    }

    /// Dispatches a request.
    ///
    /// Selects the bucket for the request method, runs the first route whose
    /// pattern matches `req.path`, and falls back to the not-implemented or
    /// not-found handler. Everything written goes through a [`ResponseState`],
    /// so repeated writes are logged and dropped.
    pub fn serve(&self, w: &mut dyn ResponseWriter, req: &mut Request) {
        let mut state = ResponseState::new(w);
        req.replace_context(RequestContext::new(Arc::clone(&self.app)));

        let Some(bucket) = Method::parse(&req.method).and_then(|m| self.table.bucket(m)) else {
            trace!(method = %req.method, path = %req.path, "no routes for method");
            (self.not_implemented)(&mut state, req);
            return;
        };

        for entry in bucket {
            if let Some(params) = entry.route.match_path(&req.path) {
                trace!(route = entry.route.name(), path = %req.path, "route matched");
                req.context_mut().set_match(Arc::clone(&entry.route), params);
                (entry.serve)(&mut state, req);
                return;
            }
        }

        trace!(method = %req.method, path = %req.path, "no route matched");
        (self.not_found)(&mut state, req);
    }
}

impl fmt::Debug for Router {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Router")
            .field("routes", &self.table.len())
            .field("middleware", &self.middleware_count)
            .field("app", &self.app)
            .finish_non_exhaustive()
    }
}

fn default_not_found(w: &mut dyn ResponseWriter, _req: &mut Request) {
    responses::send(w, "text/plain; charset=utf-8", "404 page not found\n", 404);
}

fn default_not_implemented(w: &mut dyn ResponseWriter, _req: &mut Request) {
    responses::send(w, "", "501 Not Implemented", 501);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::response::Response;

    fn hello_handler(w: &mut dyn ResponseWriter, _req: &mut Request) {
        responses::send(w, "text/plain", "Hello, World!", 200);
    }

    fn user_handler(w: &mut dyn ResponseWriter, req: &mut Request) {
        let id = req.params().get("id").unwrap_or("unknown").to_string();
        responses::send(w, "text/plain", format!("User: {id}"), 200);
    }

    fn dispatch(router: &Router, mut req: Request) -> Response {
        let mut res = Response::new();
        router.serve(&mut res, &mut req);
        res
    }

    #[test]
    fn test_basic_routing() {
        let router = Router::new(vec![
            Route::new("root", "GET", "/").handler(hello_handler),
            Route::new("user", "GET", "/users/:id").handler(user_handler),
        ])
        .unwrap();

        let res = dispatch(&router, Request::get("/"));
        assert_eq!(res.status, 200);
        assert_eq!(res.body_string(), Some("Hello, World!".to_string()));
    }

    #[test]
    fn test_path_params() {
        let router =
            Router::new(vec![Route::new("user", "GET", "/users/:id").handler(user_handler)]).unwrap();

        let res = dispatch(&router, Request::get("/users/123"));
        assert_eq!(res.status, 200);
        assert_eq!(res.body_string(), Some("User: 123".to_string()));
    }

    #[test]
    fn test_not_found() {
        let router = Router::new(vec![Route::new("root", "GET", "/").handler(hello_handler)]).unwrap();

        let res = dispatch(&router, Request::get("/nonexistent"));
        assert_eq!(res.status, 404);
        assert_eq!(res.body_string(), Some("404 page not found\n".to_string()));
    }

    #[test]
    fn test_method_without_routes_is_not_implemented() {
        let router = Router::new(vec![Route::new("root", "GET", "/").handler(hello_handler)]).unwrap();

        let res = dispatch(&router, Request::post("/"));
        assert_eq!(res.status, 501);
        assert_eq!(res.body_string(), Some("501 Not Implemented".to_string()));
    }

    #[test]
    fn test_head_without_routes_is_not_found() {
        let router = Router::new(vec![Route::new("root", "GET", "/").handler(hello_handler)]).unwrap();

        let res = dispatch(&router, Request::new("HEAD", "/"));
        assert_eq!(res.status, 404);
    }

    #[test]
    fn test_custom_special_handlers() {
        let mut router = Router::new(Vec::new()).unwrap();
        router.set_not_found(|w, _req| responses::send(w, "text/plain", "nothing here", 404));
        router.set_not_implemented(|w, _req| w.write_header(405));

        assert_eq!(
            dispatch(&router, Request::get("/x")).body_string(),
            Some("nothing here".to_string())
        );
        assert_eq!(dispatch(&router, Request::new("TRACE", "/x")).status, 405);
    }

    #[test]
    fn test_app_context_reaches_handlers() {
        let router = Router::new(vec![Route::new("env", "GET", "/env").handler(|w, req| {
            let env = req
                .context()
                .app()
                .get::<String>("environment")
                .cloned()
                .unwrap_or_default();
            responses::send(w, "text/plain", env, 200);
        })])
        .unwrap()
        .with_app_context(AppContext::new().with("environment", "staging".to_string()));

        let res = dispatch(&router, Request::get("/env"));
        assert_eq!(res.body_string(), Some("staging".to_string()));
    }
}
