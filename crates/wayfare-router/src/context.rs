//! Per-request routing context and process-wide application state.

use std::any::Any;
use std::collections::HashMap;
use std::error::Error;
use std::fmt;
use std::sync::Arc;

use crate::request::PathParams;
use crate::route::CompiledRoute;

/// Error value a handler can leave behind for middleware.
pub type BoxError = Arc<dyn Error + Send + Sync + 'static>;

/// Application state shared by every request.
///
/// Built once before the router starts serving and read-only afterwards.
/// Values are stored by key and retrieved by type.
///
/// # Example
///
/// ```
/// use wayfare_router::AppContext;
///
/// let app = AppContext::new()
///     .with("environment", "production".to_string())
///     .with("max_items", 50_usize);
///
/// assert_eq!(app.get::<String>("environment").map(String::as_str), Some("production"));
/// assert_eq!(app.get::<usize>("max_items"), Some(&50));
/// assert_eq!(app.get::<u32>("max_items"), None);
/// ```
#[derive(Clone, Default)]
pub struct AppContext {
    values: HashMap<String, Arc<dyn Any + Send + Sync>>,
}

impl AppContext {
    /// Creates an empty application context.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a value, replacing any previous value under `key`.
    #[must_use]
    pub fn with<T: Any + Send + Sync>(mut self, key: impl Into<String>, value: T) -> Self {
        self.insert(key, value);
        self
    }

    /// Adds a value, replacing any previous value under `key`.
    pub fn insert<T: Any + Send + Sync>(&mut self, key: impl Into<String>, value: T) {
        self.values.insert(key.into(), Arc::new(value));
    }

    /// Returns the value under `key` if it has type `T`.
    pub fn get<T: Any>(&self, key: &str) -> Option<&T> {
        self.values.get(key)?.downcast_ref::<T>()
    }

    /// Returns `true` if any value is stored under `key`.
    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    /// Iterates over the stored keys.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }
}

impl fmt::Debug for AppContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut keys: Vec<&str> = self.keys().collect();
        keys.sort_unstable();
        f.debug_struct("AppContext").field("keys", &keys).finish()
    }
}

/// Routing information attached to a single request.
///
/// A fresh value is installed by the router for every dispatched request.
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    route: Option<Arc<CompiledRoute>>,
    params: PathParams,
    error: Option<BoxError>,
    app: Arc<AppContext>,
}

impl RequestContext {
    /// Creates an empty context bound to the shared application state.
    pub fn new(app: Arc<AppContext>) -> Self {
        Self {
            route: None,
            params: PathParams::new(),
            error: None,
            app,
        }
    }

    /// The matched route, `None` for the not-found and not-implemented handlers.
    pub fn route(&self) -> Option<&CompiledRoute> {
        self.route.as_deref()
    }

    /// URI parameters extracted by the matched route.
    pub fn params(&self) -> &PathParams {
        &self.params
    }

    /// The error recorded by a handler, if any.
    pub fn error(&self) -> Option<&(dyn Error + Send + Sync + 'static)> {
        self.error.as_deref()
    }

    /// Records an error, replacing any earlier one.
    pub fn set_error(&mut self, err: BoxError) {
        self.error = Some(err);
    }

    /// Removes and returns the recorded error.
    pub fn take_error(&mut self) -> Option<BoxError> {
        self.error.take()
    }

    /// Process-wide application state.
    pub fn app(&self) -> &AppContext {
        &self.app
    }

    pub(crate) fn set_match(&mut self, route: Arc<CompiledRoute>, params: PathParams) {
        self.route = Some(route);
        self.params = params;
    }
}
