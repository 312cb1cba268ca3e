//! # wayfare-middleware
//!
//! Ready-made middleware for `wayfare-router`:
//!
//! - [`AccessLog`]: one `tracing` event per request with method, path,
//!   status and elapsed time
//! - [`Cors`]: cross-origin response headers and preflight handling
//!
//! Both implement [`wayfare_router::Middleware`] and can be passed to
//! `Router::use_middleware` as well as `Router::use_on_special_handlers`.

mod access_log;
mod cors;

pub use access_log::AccessLog;
pub use cors::{preflight_routes, Cors, CorsConfig, DEFAULT_ALLOWED_HEADERS, DEFAULT_ALLOWED_METHODS};
