#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use wayfare_router::middleware::from_fn;
use wayfare_router::{
    responses, Middleware, Request, Response, ResponseWriter, Route, Router, RouterError,
};

/// Shared, ordered record of what ran during a request.
pub type Trace = Arc<Mutex<Vec<String>>>;

pub fn trace() -> Trace {
    Arc::new(Mutex::new(Vec::new()))
}

pub fn entries(trace: &Trace) -> Vec<String> {
    trace.lock().unwrap().clone()
}

pub fn router(routes: Vec<Route>) -> Router {
    Router::new(routes).unwrap_or_else(|e| panic!("Failed to build router: {e}"))
}

pub fn router_err(routes: Vec<Route>) -> RouterError {
    match Router::new(routes) {
        Ok(_) => panic!("Expected router construction to fail"),
        Err(e) => e,
    }
}

pub fn dispatch(router: &Router, mut req: Request) -> Response {
    let mut res = Response::new();
    router.serve(&mut res, &mut req);
    res
}

pub fn get(router: &Router, path: &str) -> Response {
    dispatch(router, Request::get(path))
}

/// A route whose single handler replies with its own name.
pub fn named(name: &str, method: &str, pattern: &str) -> Route {
    let label = name.to_string();
    Route::new(name, method, pattern).handler(move |w, _req| {
        responses::send(w, "text/plain", &label, 200);
    })
}

/// A handler that records `label` and writes nothing.
pub fn mark(trace: &Trace, label: &str) -> impl Fn(&mut dyn ResponseWriter, &mut Request) + Send + Sync + 'static {
    let trace = Arc::clone(trace);
    let label = label.to_string();
    move |_w: &mut dyn ResponseWriter, _req: &mut Request| trace.lock().unwrap().push(label.clone())
}

/// A handler that records `label` and writes `label` as the body.
pub fn respond(trace: &Trace, label: &str) -> impl Fn(&mut dyn ResponseWriter, &mut Request) + Send + Sync + 'static {
    let trace = Arc::clone(trace);
    let label = label.to_string();
    move |w: &mut dyn ResponseWriter, _req: &mut Request| {
        trace.lock().unwrap().push(label.clone());
        responses::send(w, "text/plain", &label, 200);
    }
}

/// A middleware that records `label` and continues the chain.
pub fn layer(trace: &Trace, label: &str) -> impl Middleware + 'static {
    let trace = Arc::clone(trace);
    let label = label.to_string();
    from_fn(move |w, req, next| {
        trace.lock().unwrap().push(label.clone());
        next(w, req);
    })
}
