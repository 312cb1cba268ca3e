//! Route groups sharing a path prefix.

use crate::route::Route;

/// A set of routes with a common prefix.
///
/// # Example
///
/// ```
/// use wayfare_router::{responses, Route, RouteGroup, Router};
///
/// let api = RouteGroup::new("/api/v1", false)
///     .route(Route::new("list-users", "GET", "/users").handler(|w, _req| responses::ok(w, &[1, 2])))
///     .route(Route::new("get-user", "GET", "/users/:id").handler(|w, req| {
///         let id = req.params().get("id").unwrap_or_default().to_string();
///         responses::ok(w, &id);
///     }));
///
/// let router = Router::new(api.into_routes()).unwrap();
/// assert_eq!(router.table().len(), 2);
/// ```
#[derive(Debug, Clone)]
pub struct RouteGroup {
    /// URL prefix for all routes in this group.
    prefix: String,
    /// Whether the group's routes skip router-wide middleware.
    skip_middleware: bool,
    /// Routes in this group.
    routes: Vec<Route>,
}

impl RouteGroup {
    /// Creates a new route group with the given prefix.
    pub fn new(prefix: impl Into<String>, skip_middleware: bool) -> Self {
        Self {
            prefix: prefix.into(),
            skip_middleware,
            routes: Vec::new(),
        }
    }

    /// Adds a route; its pattern is prefixed when the group is turned into routes.
    #[must_use]
    pub fn route(mut self, route: Route) -> Self {
        self.routes.push(route);
        self
    }

    /// Adds several routes.
    #[must_use]
    pub fn routes(mut self, routes: impl IntoIterator<Item = Route>) -> Self {
        self.routes.extend(routes);
        self
    }

    /// Returns the group's prefix.
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Returns the routes with prefixed patterns and the group's
    /// middleware setting applied.
    pub fn into_routes(self) -> Vec<Route> {
        let prefix = self.prefix;
        let skip_middleware = self.skip_middleware;

        self.routes
            .into_iter()
            .map(|mut route| {
                route.pattern = format!("{prefix}{}", route.pattern);
                route.skip_middleware = skip_middleware;
                route
            })
            .collect()
    }
}
