//! Middleware support for request/response processing.

use std::fmt;
use std::sync::Arc;

use crate::request::Request;
use crate::response::ResponseWriter;
use crate::route::Handler;

/// The rest of the chain, as seen from inside a middleware.
pub type Next<'a> = &'a dyn Fn(&mut dyn ResponseWriter, &mut Request);

/// Trait for middleware that wraps request handling.
///
/// A middleware receives the writer, the request and the rest of the chain.
/// It continues the chain by calling `next(w, req)`; returning without
/// calling it short-circuits everything registered inside it. Middleware is
/// shared by every in-flight request, so per-request state belongs in the
/// request or the writer, not in `self`.
///
/// # Example
///
/// ```
/// use wayfare_router::{Middleware, Next, Request, ResponseWriter};
///
/// struct RequireToken;
///
/// impl Middleware for RequireToken {
///     fn handle(&self, w: &mut dyn ResponseWriter, req: &mut Request, next: Next<'_>) {
///         if req.get_header("Authorization").is_none() {
///             w.write_header(401);
///             return;
///         }
///         next(w, req);
///     }
/// }
/// ```
pub trait Middleware: Send + Sync {
    fn handle(&self, w: &mut dyn ResponseWriter, req: &mut Request, next: Next<'_>);
}

impl<M: Middleware + ?Sized> Middleware for Arc<M> {
    fn handle(&self, w: &mut dyn ResponseWriter, req: &mut Request, next: Next<'_>) {
        (**self).handle(w, req, next);
    }
}

/// Middleware built from a closure, see [`from_fn`].
#[derive(Clone)]
pub struct FromFn<F> {
    f: F,
}

impl<F> fmt::Debug for FromFn<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FromFn").finish_non_exhaustive()
    }
}

/// Turns a closure into a [`Middleware`].
///
/// ```
/// use wayfare_router::middleware::from_fn;
///
/// let mw = from_fn(|w, req, next| {
///     w.headers_mut().insert("X-Served-By".to_string(), "wayfare".to_string());
///     next(w, req);
/// });
/// # let _ = mw;
/// ```
pub fn from_fn<F>(f: F) -> FromFn<F>
where
    F: Fn(&mut dyn ResponseWriter, &mut Request, Next<'_>) + Send + Sync,
{
    FromFn { f }
}

impl<F> Middleware for FromFn<F>
where
    F: Fn(&mut dyn ResponseWriter, &mut Request, Next<'_>) + Send + Sync,
{
    fn handle(&self, w: &mut dyn ResponseWriter, req: &mut Request, next: Next<'_>) {
        (self.f)(w, req, next);
    }
}

/// Wraps `inner` so that `mw` runs around it.
pub(crate) fn wrap(mw: Arc<dyn Middleware>, inner: Handler) -> Handler {
    Arc::new(move |w: &mut dyn ResponseWriter, req: &mut Request| {
        mw.handle(w, req, &*inner);
    })
}
