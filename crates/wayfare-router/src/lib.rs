//! # wayfare-router
//!
//! A small HTTP request multiplexer with middleware support.
//!
//! This crate provides:
//! - Path patterns with `:name` and `:name*` parameters, compiled to regexes
//! - Per-method route buckets, matched in registration order (first match wins)
//! - Ordered handler chains per route, with opt-in fallthrough
//! - Write-once response tracking
//! - LIFO middleware composition, for routes and for the not-found /
//!   not-implemented handlers separately
//! - Per-request context: matched route, URI parameters, error slot,
//!   shared application state
//!
//! ## Quick Start
//!
//! ```
//! use wayfare_router::{responses, Request, Response, Route, Router};
//!
//! let router = Router::new(vec![
//!     Route::new("home", "GET", "/").handler(|w, _req| responses::ok(w, "welcome")),
//!     Route::new("file", "GET", "/files/:path*").handler(|w, req| {
//!         let path = req.params().get("path").unwrap_or_default().to_string();
//!         responses::ok(w, &path);
//!     }),
//! ])
//! .unwrap();
//!
//! let mut res = Response::new();
//! router.serve(&mut res, &mut Request::get("/files/docs/readme.md"));
//! assert_eq!(res.status, 200);
//! assert_eq!(res.body_string().unwrap(), r#"{"data":"docs/readme.md","status":200}"#);
//! ```
//!
//! ## Handler chains
//!
//! A route holds several handlers. They run in order until one of them writes
//! a response; with [`Route::fall_through`] every handler runs regardless, and
//! writes after the first are logged and dropped.
//!
//! ## Middleware
//!
//! ```
//! use wayfare_router::{middleware::from_fn, Route, Router};
//!
//! let mut router = Router::new(vec![
//!     Route::new("home", "GET", "/").handler(|w, _req| w.write_header(204)),
//! ])
//! .unwrap();
//!
//! // Registered first, runs last (closest to the handlers).
//! router.use_middleware(from_fn(|w, req, next| next(w, req)));
//! // Registered last, runs first.
//! router.use_middleware(from_fn(|w, req, next| {
//!     if req.get_header("Authorization").is_some() {
//!         next(w, req);
//!     } else {
//!         w.write_header(401);
//!     }
//! }));
//! ```

mod context;
mod error;
mod group;
pub mod middleware;
mod pattern;
mod request;
mod response;
pub mod responses;
mod route;
mod router;
mod state;
mod table;

pub use context::{AppContext, BoxError, RequestContext};
pub use error::{Result, RouteWarning, RouterError};
pub use group::RouteGroup;
pub use middleware::{Middleware, Next};
pub use pattern::{PathPattern, PathSegment};
pub use request::{Method, PathParams, Request};
pub use response::{Connection, Flush, Headers, Hijack, Response, ResponseWriter};
pub use route::{CompiledRoute, Handler, Route};
pub use router::Router;
pub use state::ResponseState;
pub use table::MethodTable;
